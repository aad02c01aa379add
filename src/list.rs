use crate::db::Database;
use crate::events::LeadEvents;
use crate::models::{EditSession, Lead, LeadChange, LeadEvent, LeadField, LeadListSnapshot, ListPhase, Notice};
use uuid::Uuid;

const LOAD_FAILED_MESSAGE: &str = "Failed to load leads";

/// Cached view of the lead table plus the inline editor.
///
/// The cache is disposable: other publishers' change events trigger a full
/// re-read. The view's own edits and deletes patch the cache in place and
/// are ignored when they come back on the event hub. Between concurrent
/// writers the last completed write wins.
#[derive(Debug, Clone)]
pub struct LeadListView {
    view_id: String,
    phase: ListPhase,
    leads: Vec<Lead>,
    error: Option<String>,
    editing: Option<EditSession>,
}

impl Default for LeadListView {
    fn default() -> Self {
        Self::new()
    }
}

impl LeadListView {
    pub fn new() -> Self {
        Self {
            view_id: format!("lead-list-{}", Uuid::new_v4()),
            phase: ListPhase::Loading,
            leads: Vec::new(),
            error: None,
            editing: None,
        }
    }

    pub fn view_id(&self) -> &str {
        &self.view_id
    }

    pub fn phase(&self) -> ListPhase {
        self.phase
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn editing(&self) -> Option<&EditSession> {
        self.editing.as_ref()
    }

    pub fn snapshot(&self) -> LeadListSnapshot {
        LeadListSnapshot {
            phase: self.phase,
            leads: self.leads.clone(),
            error: self.error.clone(),
            editing: self.editing.clone(),
        }
    }

    pub fn load(&mut self, db: &Database) {
        self.phase = ListPhase::Loading;
        match db.read_all() {
            Ok(leads) => {
                self.leads = leads;
                self.error = None;
                self.phase = ListPhase::Loaded;
                let still_present = self
                    .editing
                    .as_ref()
                    .map_or(true, |session| self.leads.iter().any(|lead| lead.id == session.lead_id));
                if !still_present {
                    self.editing = None;
                }
            }
            Err(error) => {
                tracing::error!(error = %error, view = %self.view_id, "failed to load leads");
                self.leads.clear();
                self.editing = None;
                self.error = Some(LOAD_FAILED_MESSAGE.to_string());
                self.phase = ListPhase::LoadFailed;
            }
        }
    }

    /// Reloads for changes published by anyone else. Returns whether a reload
    /// happened.
    pub fn handle_event(&mut self, db: &Database, event: &LeadEvent) -> bool {
        if event.source == self.view_id {
            return false;
        }
        self.load(db);
        true
    }

    /// Selecting another lead while editing silently replaces the target.
    pub fn start_editing(&mut self, lead_id: i64) -> bool {
        if self.phase != ListPhase::Loaded {
            return false;
        }
        let Some(lead) = self.leads.iter().find(|lead| lead.id == lead_id) else {
            return false;
        };
        self.editing = Some(EditSession {
            lead_id,
            fields: lead.fields(),
        });
        true
    }

    pub fn set_edit_field(&mut self, field: LeadField, value: impl Into<String>) -> bool {
        match self.editing.as_mut() {
            Some(session) => {
                session.fields.set(field, value.into());
                true
            }
            None => false,
        }
    }

    pub fn cancel_editing(&mut self) {
        self.editing = None;
    }

    /// Writes the edit session back. `None` when nothing is being edited.
    pub fn save_edit(&mut self, db: &Database, events: &LeadEvents) -> Option<Notice> {
        let session = self.editing.as_ref()?;
        let lead_id = session.lead_id;

        match db.update(lead_id, &session.fields) {
            Ok(_) => {
                let fields = session.fields.clone();
                if let Some(lead) = self.leads.iter_mut().find(|lead| lead.id == lead_id) {
                    lead.overwrite(&fields);
                }
                self.editing = None;
                events.publish(&self.view_id, LeadChange::Updated(lead_id));
                Some(Notice::success("Lead updated successfully"))
            }
            Err(error) => {
                tracing::error!(error = %error, lead_id, "failed to update lead");
                Some(Notice::failure("Error updating lead"))
            }
        }
    }

    /// Deleting the lead under edit also ends the edit session.
    pub fn delete(&mut self, db: &Database, events: &LeadEvents, lead_id: i64) -> Notice {
        match db.delete(lead_id) {
            Ok(_) => {
                self.leads.retain(|lead| lead.id != lead_id);
                if self.editing.as_ref().is_some_and(|session| session.lead_id == lead_id) {
                    self.editing = None;
                }
                events.publish(&self.view_id, LeadChange::Deleted(lead_id));
                Notice::success("Lead deleted successfully")
            }
            Err(error) => {
                tracing::error!(error = %error, lead_id, "failed to delete lead");
                Notice::failure("Error deleting lead")
            }
        }
    }
}
