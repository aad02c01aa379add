use crate::credentials::CredentialStore;
use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::events::LeadEvents;
use crate::export::ExportPipeline;
use crate::form::LeadForm;
use crate::list::LeadListView;
use crate::models::{
    ActionResponse, AppSettings, LeadEvent, LeadField, LeadFields, LeadListSnapshot, Notice, PrinterListing,
};
use crate::pdf::command::CommandPdfRenderer;
use crate::pdf::PdfRenderer;
use crate::print::{require_printer, PrintCredentials, PrintPipeline, PrinterClient};
use crate::settings::{load_settings, resolve_downloads_dir};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub const DATABASE_FILE: &str = "leads.sqlite";

/// Composition root. Owns the database handle, the change-event hub, the view
/// models and both pipelines. Every user action lands here and comes back as
/// a `Notice`; error detail only goes to the log.
#[derive(Clone)]
pub struct LeadManager {
    db: Arc<Database>,
    events: LeadEvents,
    form: Arc<Mutex<LeadForm>>,
    list: Arc<Mutex<LeadListView>>,
    export: ExportPipeline,
    printing: Arc<Mutex<PrintPipeline>>,
    credentials: CredentialStore,
    settings: AppSettings,
}

impl LeadManager {
    pub fn new(app_data_dir: &Path, platform_downloads: Option<PathBuf>) -> AppResult<Arc<Self>> {
        let settings = load_settings(app_data_dir)?;
        let db = Database::open(&app_data_dir.join(DATABASE_FILE))?;
        if let Err(error) = db.ensure_schema() {
            tracing::error!(error = %error, "lead table could not be created");
            return Err(error);
        }

        let renderer = Arc::new(CommandPdfRenderer::new(
            settings.pdf_converter_path.clone(),
            settings.pdf_converter_args.clone(),
        ));
        let downloads_dir = resolve_downloads_dir(&settings, app_data_dir, platform_downloads);
        Ok(Arc::new(Self::assemble(
            db,
            settings,
            renderer,
            app_data_dir.join("documents"),
            downloads_dir,
        )))
    }

    pub fn assemble(
        db: Database,
        settings: AppSettings,
        renderer: Arc<dyn PdfRenderer>,
        documents_dir: PathBuf,
        downloads_dir: PathBuf,
    ) -> Self {
        let export = ExportPipeline::new(
            renderer,
            documents_dir,
            downloads_dir,
            settings.export_file_name.clone(),
        );
        let printing = PrintPipeline::new(settings.print_title.clone());
        Self {
            db: Arc::new(db),
            events: LeadEvents::new(),
            form: Arc::new(Mutex::new(LeadForm::new())),
            list: Arc::new(Mutex::new(LeadListView::new())),
            export,
            printing: Arc::new(Mutex::new(printing)),
            credentials: CredentialStore::new(),
            settings,
        }
    }

    pub fn with_credentials(mut self, credentials: CredentialStore) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn events(&self) -> &LeadEvents {
        &self.events
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Subscribes the list view to change events and reloads it for every
    /// foreign write. `on_change` sees each event with the resulting view.
    pub fn spawn_list_refresher<F>(&self, on_change: F) -> JoinHandle<()>
    where
        F: Fn(&LeadEvent, LeadListSnapshot) + Send + Sync + 'static,
    {
        let mut receiver = self.events.subscribe();
        let db = self.db.clone();
        let list = self.list.clone();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        let snapshot = {
                            let mut view = list.lock().await;
                            view.handle_event(&db, &event);
                            view.snapshot()
                        };
                        on_change(&event, snapshot);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "list refresher lagged, reloading");
                        list.lock().await.load(&db);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    pub fn shutdown(&self) {
        if let Err(error) = self.db.close() {
            tracing::warn!(error = %error, "failed to close lead database");
        }
    }

    // ─── Form ───────────────────────────────────────────────────────────────

    pub async fn form_get(&self) -> LeadFields {
        self.form.lock().await.fields().clone()
    }

    pub async fn form_update(&self, field: LeadField, value: String) -> LeadFields {
        let mut form = self.form.lock().await;
        form.set_field(field, value);
        form.fields().clone()
    }

    pub async fn form_submit(&self) -> ActionResponse<LeadFields> {
        let mut form = self.form.lock().await;
        let notice = form.submit(&self.db, &self.events);
        ActionResponse {
            notice,
            view: form.fields().clone(),
        }
    }

    // ─── List & editor ──────────────────────────────────────────────────────

    pub async fn list_get(&self) -> LeadListSnapshot {
        self.list.lock().await.snapshot()
    }

    pub async fn list_reload(&self) -> LeadListSnapshot {
        let mut list = self.list.lock().await;
        list.load(&self.db);
        list.snapshot()
    }

    pub async fn list_start_edit(&self, lead_id: i64) -> AppResult<LeadListSnapshot> {
        let mut list = self.list.lock().await;
        if !list.start_editing(lead_id) {
            return Err(AppError::Validation(format!("Lead {} is not available for editing", lead_id)));
        }
        Ok(list.snapshot())
    }

    pub async fn list_update_edit(&self, field: LeadField, value: String) -> AppResult<LeadListSnapshot> {
        let mut list = self.list.lock().await;
        if !list.set_edit_field(field, value) {
            return Err(AppError::Validation("No lead is being edited".to_string()));
        }
        Ok(list.snapshot())
    }

    pub async fn list_cancel_edit(&self) -> LeadListSnapshot {
        let mut list = self.list.lock().await;
        list.cancel_editing();
        list.snapshot()
    }

    pub async fn list_save_edit(&self) -> AppResult<ActionResponse<LeadListSnapshot>> {
        let mut list = self.list.lock().await;
        let notice = list
            .save_edit(&self.db, &self.events)
            .ok_or_else(|| AppError::Validation("No lead is being edited".to_string()))?;
        Ok(ActionResponse {
            notice,
            view: list.snapshot(),
        })
    }

    pub async fn list_delete(&self, lead_id: i64) -> ActionResponse<LeadListSnapshot> {
        let mut list = self.list.lock().await;
        let notice = list.delete(&self.db, &self.events, lead_id);
        ActionResponse {
            notice,
            view: list.snapshot(),
        }
    }

    // ─── Export & print ─────────────────────────────────────────────────────

    pub async fn export_pdf(&self) -> Notice {
        match self.export.export_pdf(&self.db).await {
            Ok(response) => Notice::success(format!("PDF downloaded successfully at {}", response.path)),
            Err(error) => {
                tracing::error!(error = %error, "lead export failed");
                Notice::failure("Could not generate PDF")
            }
        }
    }

    pub async fn printers_get(&self) -> PrinterListing {
        self.printing.lock().await.listing()
    }

    pub async fn printers_refresh(&self) -> ActionResponse<PrinterListing> {
        let notice = match self.printer_client().await {
            Ok(client) => {
                let mut printing = self.printing.lock().await;
                match printing.refresh_printers(&client).await {
                    Ok(printers) => Notice::success(format!("Found {} printers", printers.len())),
                    Err(error) => {
                        tracing::error!(error = %error, "printer discovery failed");
                        Notice::failure("Could not load printers")
                    }
                }
            }
            Err(error) => {
                tracing::error!(error = %error, "printer discovery not configured");
                Notice::failure("Could not load printers")
            }
        };
        ActionResponse {
            notice,
            view: self.printers_get().await,
        }
    }

    /// Selects `printer_id`; an empty id clears the selection.
    pub async fn printer_select(&self, printer_id: &str) -> AppResult<PrinterListing> {
        let mut printing = self.printing.lock().await;
        if printer_id.trim().is_empty() {
            printing.clear_selection();
        } else {
            printing.select_printer(printer_id)?;
        }
        Ok(printing.listing())
    }

    /// Prints to `printer_id`, or to the selected printer when none is given.
    /// An explicit empty id never falls back to the selection.
    pub async fn print_leads(&self, printer_id: Option<String>) -> Notice {
        let printing = self.printing.lock().await;
        let printer_id = match printer_id {
            Some(id) => id.trim().to_string(),
            None => printing.selected().map(ToString::to_string).unwrap_or_default(),
        };

        if let Err(error) = require_printer(&printer_id) {
            return Notice::failure(validation_message(&error));
        }

        let client = match self.printer_client().await {
            Ok(client) => client,
            Err(error) => {
                tracing::error!(error = %error, "printing not configured");
                return Notice::failure("Error printing leads");
            }
        };

        match printing.print(&printer_id, &client, &self.export, &self.db).await {
            Ok(_) => Notice::success("Print job submitted"),
            Err(error) => {
                tracing::error!(error = %error, printer_id = %printer_id, "print failed");
                Notice::failure("Error printing leads")
            }
        }
    }

    // ─── Credentials ────────────────────────────────────────────────────────

    pub async fn save_print_api_key(&self, api_key: String) -> AppResult<()> {
        self.credentials.save_api_key(&api_key).await
    }

    pub async fn clear_print_api_key(&self) -> AppResult<()> {
        self.credentials.clear_api_key().await
    }

    pub async fn has_print_api_key(&self) -> bool {
        self.credentials.has_api_key().await
    }

    async fn printer_client(&self) -> AppResult<PrinterClient> {
        let api_key = self
            .credentials
            .resolve_api_key()
            .await?
            .ok_or_else(|| AppError::Config("printer API key is not configured".to_string()))?;
        let credentials = PrintCredentials::from_api_key(api_key, self.settings.print_api_username.as_deref());
        Ok(PrinterClient::new(&self.settings.print_api_base_url, credentials))
    }
}

fn validation_message(error: &AppError) -> String {
    match error {
        AppError::Validation(message) => message.clone(),
        _ => "Invalid request".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::LeadManager;
    use crate::credentials::tests::memory_store;
    use crate::db::Database;
    use crate::events::EVENT_CAPACITY;
    use crate::export::tests::MarkupRenderer;
    use crate::models::{AppSettings, LeadChange, LeadField, LeadFields, ListPhase};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager(dir: &tempfile::TempDir) -> LeadManager {
        let db = Database::open(&dir.path().join("leads.sqlite")).expect("db");
        db.ensure_schema().expect("schema");
        LeadManager::assemble(
            db,
            AppSettings::default(),
            Arc::new(MarkupRenderer::default()),
            dir.path().join("documents"),
            dir.path().join("downloads"),
        )
    }

    async fn fill_form(manager: &LeadManager, name: &str, mobile: &str, status: &str) {
        manager.form_update(LeadField::Name, name.to_string()).await;
        manager.form_update(LeadField::MobileNumber, mobile.to_string()).await;
        manager.form_update(LeadField::Status, status.to_string()).await;
    }

    #[tokio::test]
    async fn form_submission_refreshes_the_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(&dir);
        assert_eq!(manager.list_reload().await.phase, ListPhase::Loaded);

        let (sender, mut receiver) = mpsc::unbounded_channel();
        let refresher = manager.spawn_list_refresher(move |event, snapshot| {
            let _ = sender.send((event.change, snapshot));
        });

        fill_form(&manager, "Alice", "555-0100", "new").await;
        let response = manager.form_submit().await;
        assert!(response.notice.is_success());
        assert!(response.view.name.is_empty());

        let (change, snapshot) = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
            .await
            .expect("refresh in time")
            .expect("refresh");
        assert!(matches!(change, LeadChange::Created(_)));
        assert_eq!(snapshot.leads.len(), 1);
        assert_eq!(manager.list_get().await.leads[0].name, "Alice");

        refresher.abort();
    }

    #[tokio::test]
    async fn edit_and_delete_round_trip_through_manager() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(&dir);
        fill_form(&manager, "Alice", "555-0100", "new").await;
        manager.form_submit().await;

        let snapshot = manager.list_reload().await;
        let id = snapshot.leads[0].id;

        manager.list_start_edit(id).await.expect("start edit");
        manager
            .list_update_edit(LeadField::Status, "contacted".to_string())
            .await
            .expect("update edit");
        let saved = manager.list_save_edit().await.expect("save edit");
        assert!(saved.notice.is_success());
        assert_eq!(saved.view.leads[0].status, "contacted");
        assert!(manager.list_save_edit().await.is_err());

        let deleted = manager.list_delete(id).await;
        assert!(deleted.notice.is_success());
        assert!(deleted.view.leads.is_empty());
        assert_eq!(manager.database().count().expect("count"), 0);
    }

    #[tokio::test]
    async fn export_reports_destination() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(&dir);

        let notice = manager.export_pdf().await;
        assert!(notice.is_success());
        assert!(notice.message.contains("LeadDocument.pdf"));
    }

    #[tokio::test]
    async fn print_without_selection_is_a_validation_notice() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(&dir);

        let notice = manager.print_leads(None).await;
        assert!(!notice.is_success());
        assert_eq!(notice.message, "Please select a printer");

        let notice = manager.print_leads(Some("  ".to_string())).await;
        assert_eq!(notice.message, "Please select a printer");
    }

    #[tokio::test]
    async fn deselected_printer_is_not_printed_to() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/printers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 1, "name": "Front Desk" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/printjobs"))
            .respond_with(ResponseTemplate::new(201).set_body_string("77"))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::open(&dir.path().join("leads.sqlite")).expect("db");
        db.ensure_schema().expect("schema");
        let settings = AppSettings {
            print_api_base_url: server.uri(),
            ..AppSettings::default()
        };
        let manager = LeadManager::assemble(
            db,
            settings,
            Arc::new(MarkupRenderer::default()),
            dir.path().join("documents"),
            dir.path().join("downloads"),
        )
        .with_credentials(memory_store());
        manager.save_print_api_key("key-123".to_string()).await.expect("save key");

        let refreshed = manager.printers_refresh().await;
        assert!(refreshed.notice.is_success());
        let listing = manager.printer_select("1").await.expect("select");
        assert_eq!(listing.selected.as_deref(), Some("1"));

        let listing = manager.printer_select("").await.expect("deselect");
        assert!(listing.selected.is_none());
        assert_eq!(listing.printers.len(), 1);

        let notice = manager.print_leads(None).await;
        assert!(!notice.is_success());
        assert_eq!(notice.message, "Please select a printer");

        manager.printer_select("1").await.expect("select again");
        let notice = manager.print_leads(Some(String::new())).await;
        assert_eq!(notice.message, "Please select a printer");
    }

    #[tokio::test]
    async fn lagging_refresher_reloads_and_stops_when_hub_closes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(&dir);
        for name in ["Alice", "Bob", "Carol"] {
            let fields = LeadFields::new(name, "555-0100", "", "new");
            manager.database().create(&fields).expect("create");
        }

        let list = manager.list.clone();
        let view_id = list.lock().await.view_id().to_string();
        let refresher = manager.spawn_list_refresher(|_, _| {});

        // Events from the view itself never trigger a reload, so only the
        // lag handler can bring the view to Loaded.
        for id in 0..(EVENT_CAPACITY as i64 + 10) {
            manager.events().publish(&view_id, LeadChange::Updated(id));
        }
        drop(manager);

        tokio::time::timeout(Duration::from_secs(5), refresher)
            .await
            .expect("refresher stops after the hub closes")
            .expect("refresher task");

        let view = list.lock().await;
        assert_eq!(view.phase(), ListPhase::Loaded);
        assert_eq!(view.leads().len(), 3);
    }

    #[tokio::test]
    async fn editing_unknown_lead_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(&dir);
        manager.list_reload().await;
        assert!(manager.list_start_edit(42).await.is_err());
    }
}
