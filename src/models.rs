use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub mobile_number: String,
    pub description: String,
    pub status: String,
}

impl Lead {
    pub fn fields(&self) -> LeadFields {
        LeadFields {
            name: self.name.clone(),
            mobile_number: self.mobile_number.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
        }
    }

    pub fn overwrite(&mut self, fields: &LeadFields) {
        self.name = fields.name.clone();
        self.mobile_number = fields.mobile_number.clone();
        self.description = fields.description.clone();
        self.status = fields.status.clone();
    }
}

/// The editable content of a lead. Shared by the form, the editor and the
/// gateway; values are carried verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFields {
    pub name: String,
    pub mobile_number: String,
    pub description: String,
    pub status: String,
}

impl LeadFields {
    pub fn new(
        name: impl Into<String>,
        mobile_number: impl Into<String>,
        description: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mobile_number: mobile_number.into(),
            description: description.into(),
            status: status.into(),
        }
    }

    /// Required fields that are empty. Description is optional.
    pub fn missing_required(&self) -> Vec<LeadField> {
        let mut missing = Vec::new();
        if self.name.is_empty() {
            missing.push(LeadField::Name);
        }
        if self.mobile_number.is_empty() {
            missing.push(LeadField::MobileNumber);
        }
        if self.status.is_empty() {
            missing.push(LeadField::Status);
        }
        missing
    }

    pub fn set(&mut self, field: LeadField, value: String) {
        match field {
            LeadField::Name => self.name = value,
            LeadField::MobileNumber => self.mobile_number = value,
            LeadField::Description => self.description = value,
            LeadField::Status => self.status = value,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeadField {
    Name,
    MobileNumber,
    Description,
    Status,
}

impl LeadField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::MobileNumber => "mobileNumber",
            Self::Description => "description",
            Self::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoticeKind {
    Success,
    Failure,
}

/// User-facing acknowledgment of an action. Never carries error detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: "Success".to_string(),
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Failure,
            title: "Error".to_string(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == NoticeKind::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeadChange {
    Created(i64),
    Updated(i64),
    Deleted(i64),
}

impl LeadChange {
    pub fn lead_id(self) -> i64 {
        match self {
            Self::Created(id) | Self::Updated(id) | Self::Deleted(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadEvent {
    pub event_id: String,
    pub source: String,
    pub change: LeadChange,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListPhase {
    Loading,
    Loaded,
    LoadFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSession {
    pub lead_id: i64,
    pub fields: LeadFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadListSnapshot {
    pub phase: ListPhase,
    pub leads: Vec<Lead>,
    pub error: Option<String>,
    pub editing: Option<EditSession>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Printer {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterListing {
    pub printers: Vec<Printer>,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub printer_id: String,
    pub title: String,
    pub content_type: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanResponse {
    pub success: bool,
}

/// Action outcome for the shell: the notice to show plus the refreshed view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse<T> {
    pub notice: Notice,
    pub view: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub print_api_base_url: String,
    pub print_api_username: Option<String>,
    pub print_title: String,
    pub pdf_converter_path: String,
    pub pdf_converter_args: Vec<String>,
    pub export_file_name: String,
    pub downloads_dir: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            print_api_base_url: "https://api.printnode.com".to_string(),
            print_api_username: None,
            print_title: "Lead List".to_string(),
            pdf_converter_path: "wkhtmltopdf".to_string(),
            pdf_converter_args: vec!["--quiet".to_string()],
            export_file_name: "LeadDocument.pdf".to_string(),
            downloads_dir: None,
        }
    }
}
