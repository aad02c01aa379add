use crate::db::Database;
use crate::events::LeadEvents;
use crate::models::{LeadChange, LeadField, LeadFields, Notice};

pub const FORM_SOURCE: &str = "lead-form";

const MISSING_FIELDS_MESSAGE: &str = "Please fill in all required fields";

/// New-lead input. Fields stay populated after a failed submit so the user
/// can retry.
#[derive(Debug, Default, Clone)]
pub struct LeadForm {
    fields: LeadFields,
}

impl LeadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &LeadFields {
        &self.fields
    }

    pub fn set_field(&mut self, field: LeadField, value: impl Into<String>) {
        self.fields.set(field, value.into());
    }

    pub fn submit(&mut self, db: &Database, events: &LeadEvents) -> Notice {
        let missing = self.fields.missing_required();
        if !missing.is_empty() {
            let missing = missing.iter().map(|field| field.as_str()).collect::<Vec<_>>();
            tracing::debug!(missing = ?missing, "lead form rejected");
            return Notice::failure(MISSING_FIELDS_MESSAGE);
        }

        match db.create(&self.fields) {
            Ok(lead) => {
                self.fields.clear();
                events.publish(FORM_SOURCE, LeadChange::Created(lead.id));
                Notice::success("Lead added successfully")
            }
            Err(error) => {
                tracing::error!(error = %error, "failed to insert lead");
                Notice::failure("Error inserting lead")
            }
        }
    }
}
