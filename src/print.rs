use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::export::ExportPipeline;
use crate::models::{PrintJob, Printer, PrinterListing};
use crate::redaction::Redactor;
use serde::Deserialize;

pub const PDF_BASE64_CONTENT_TYPE: &str = "pdf_base64";

#[derive(Clone)]
pub struct PrintCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for PrintCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintCredentials")
            .field("username", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl PrintCredentials {
    /// Key-as-username with an empty password unless a separate account name
    /// is configured.
    pub fn from_api_key(api_key: String, username: Option<&str>) -> Self {
        match username.filter(|name| !name.is_empty()) {
            Some(name) => Self {
                username: name.to_string(),
                password: api_key,
            },
            None => Self {
                username: api_key,
                password: String::new(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPrinter {
    id: serde_json::Value,
    name: String,
}

impl RawPrinter {
    fn into_printer(self) -> Printer {
        let id = match self.id {
            serde_json::Value::String(id) => id,
            other => other.to_string(),
        };
        Printer { id, name: self.name }
    }
}

/// Client for the cloud print API (basic auth).
#[derive(Debug, Clone)]
pub struct PrinterClient {
    http: reqwest::Client,
    base_url: String,
    credentials: PrintCredentials,
    redactor: Redactor,
}

impl PrinterClient {
    pub fn new(base_url: &str, credentials: PrintCredentials) -> Self {
        let redactor = Redactor::new()
            .with_secret(&credentials.username)
            .with_secret(&credentials.password);
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            redactor,
        }
    }

    pub async fn list_printers(&self) -> AppResult<Vec<Printer>> {
        let response = self
            .http
            .get(format!("{}/printers", self.base_url))
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(|error| AppError::PrinterDiscovery(self.redactor.redact(&error.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::PrinterDiscovery(format!(
                "printer listing returned {}: {}",
                status,
                self.redactor.redact(body.trim())
            )));
        }

        let printers = response
            .json::<Vec<RawPrinter>>()
            .await
            .map_err(|error| AppError::PrinterDiscovery(format!("unexpected printer listing: {}", error)))?;
        Ok(printers.into_iter().map(RawPrinter::into_printer).collect())
    }

    /// Submits a job and returns the API's job reference (the raw response
    /// body).
    pub async fn submit_job(&self, job: &PrintJob) -> AppResult<String> {
        let response = self
            .http
            .post(format!("{}/printjobs", self.base_url))
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(job)
            .send()
            .await
            .map_err(|error| AppError::PrintSubmission(self.redactor.redact(&error.to_string())))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AppError::PrintSubmission(format!(
                "print job returned {}: {}",
                status,
                self.redactor.redact(body.trim())
            )));
        }
        Ok(body.trim().to_string())
    }
}

pub fn require_printer(printer_id: &str) -> AppResult<()> {
    if printer_id.trim().is_empty() {
        return Err(AppError::Validation("Please select a printer".to_string()));
    }
    Ok(())
}

/// Printer discovery and selection state. Nothing here is persisted.
#[derive(Debug, Clone)]
pub struct PrintPipeline {
    printers: Vec<Printer>,
    selected: Option<String>,
    title: String,
}

impl PrintPipeline {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            printers: Vec::new(),
            selected: None,
            title: title.into(),
        }
    }

    pub fn printers(&self) -> &[Printer] {
        &self.printers
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn listing(&self) -> PrinterListing {
        PrinterListing {
            printers: self.printers.clone(),
            selected: self.selected.clone(),
        }
    }

    /// Replaces the printer list. On failure the previous list is kept.
    pub async fn refresh_printers(&mut self, client: &PrinterClient) -> AppResult<&[Printer]> {
        let printers = client.list_printers().await?;
        tracing::info!(count = printers.len(), "printers discovered");
        if let Some(selected) = &self.selected {
            if !printers.iter().any(|printer| &printer.id == selected) {
                self.selected = None;
            }
        }
        self.printers = printers;
        Ok(&self.printers)
    }

    pub fn select_printer(&mut self, printer_id: &str) -> AppResult<()> {
        require_printer(printer_id)?;
        if !self.printers.iter().any(|printer| printer.id == printer_id) {
            return Err(AppError::Validation(format!("Unknown printer {}", printer_id)));
        }
        self.selected = Some(printer_id.to_string());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub async fn print(
        &self,
        printer_id: &str,
        client: &PrinterClient,
        export: &ExportPipeline,
        db: &Database,
    ) -> AppResult<String> {
        require_printer(printer_id)?;

        let file = export.render_pdf(db, true).await?;
        let content = file
            .base64
            .ok_or_else(|| AppError::Export("renderer returned no base64 content".to_string()))?;

        let job = PrintJob {
            printer_id: printer_id.to_string(),
            title: self.title.clone(),
            content_type: PDF_BASE64_CONTENT_TYPE.to_string(),
            content,
        };
        let reference = client.submit_job(&job).await?;
        tracing::info!(printer_id, job = %reference, "print job submitted");
        Ok(reference)
    }
}
