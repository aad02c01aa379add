use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{ExportResponse, Lead};
use crate::pdf::{PdfFile, PdfRenderer, PdfRequest};
use std::path::PathBuf;
use std::sync::Arc;

pub const RENDER_FILE_NAME: &str = "LeadList";

pub fn render_leads_html(leads: &[Lead]) -> String {
    let mut html = String::from(
        "<h1>Lead List</h1>\n\
         <table border=\"1\" style=\"width:100%; border-collapse: collapse;\">\n\
         <thead>\n\
         <tr><th>Name</th><th>Mobile Number</th><th>Description</th><th>Status</th></tr>\n\
         </thead>\n\
         <tbody>\n",
    );
    for lead in leads {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&lead.name),
            escape_html(&lead.mobile_number),
            escape_html(&lead.description),
            escape_html(&lead.status),
        ));
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Renders the lead table to PDF in the app-private documents directory and
/// publishes it to the downloads directory under a fixed name.
#[derive(Clone)]
pub struct ExportPipeline {
    renderer: Arc<dyn PdfRenderer>,
    documents_dir: PathBuf,
    downloads_dir: PathBuf,
    export_file_name: String,
}

impl ExportPipeline {
    pub fn new(
        renderer: Arc<dyn PdfRenderer>,
        documents_dir: PathBuf,
        downloads_dir: PathBuf,
        export_file_name: impl Into<String>,
    ) -> Self {
        Self {
            renderer,
            documents_dir,
            downloads_dir,
            export_file_name: export_file_name.into(),
        }
    }

    pub fn destination(&self) -> PathBuf {
        self.downloads_dir.join(&self.export_file_name)
    }

    pub async fn render_pdf(&self, db: &Database, base64: bool) -> AppResult<PdfFile> {
        let leads = db.read_all()?;
        let request = PdfRequest {
            html: render_leads_html(&leads),
            file_name: RENDER_FILE_NAME.to_string(),
            directory: self.documents_dir.clone(),
            base64,
        };

        let file = self.renderer.convert(&request).await?;
        if file.file_path.is_none() {
            return Err(AppError::Export("renderer returned no file path".to_string()));
        }
        tracing::info!(lead_count = leads.len(), "lead table rendered");
        Ok(file)
    }

    pub async fn export_pdf(&self, db: &Database) -> AppResult<ExportResponse> {
        let file = self.render_pdf(db, false).await?;
        let source = file
            .file_path
            .ok_or_else(|| AppError::Export("renderer returned no file path".to_string()))?;

        tokio::fs::create_dir_all(&self.downloads_dir)
            .await
            .map_err(AppError::export)?;
        let destination = self.destination();
        tokio::fs::copy(&source, &destination)
            .await
            .map_err(|error| AppError::Export(format!("copy to {} failed: {}", destination.display(), error)))?;

        tracing::info!(path = %destination.display(), "lead export written");
        Ok(ExportResponse {
            path: destination.to_string_lossy().to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{render_leads_html, ExportPipeline};
    use crate::db::Database;
    use crate::errors::{AppError, AppResult};
    use crate::models::{Lead, LeadFields};
    use crate::pdf::{PdfFile, PdfRenderer, PdfRequest, RenderFuture};
    use base64::Engine;
    use std::sync::{Arc, Mutex};

    /// Writes the HTML itself as the "PDF" so tests can inspect it.
    #[derive(Default)]
    pub(crate) struct MarkupRenderer {
        pub(crate) requests: Mutex<Vec<PdfRequest>>,
        pub(crate) omit_path: bool,
    }

    impl MarkupRenderer {
        async fn render(&self, request: &PdfRequest) -> AppResult<PdfFile> {
            self.requests.lock().expect("requests lock").push(request.clone());
            if self.omit_path {
                return Ok(PdfFile::default());
            }
            std::fs::create_dir_all(&request.directory)?;
            let path = request.directory.join(format!("{}.pdf", request.file_name));
            std::fs::write(&path, request.html.as_bytes())?;
            let base64 = request
                .base64
                .then(|| base64::engine::general_purpose::STANDARD.encode(request.html.as_bytes()));
            Ok(PdfFile {
                file_path: Some(path),
                base64,
            })
        }
    }

    impl PdfRenderer for MarkupRenderer {
        fn convert<'a>(&'a self, request: &'a PdfRequest) -> RenderFuture<'a> {
            Box::pin(self.render(request))
        }
    }

    fn lead(id: i64, name: &str) -> Lead {
        Lead {
            id,
            name: name.to_string(),
            mobile_number: "555-0100".to_string(),
            description: "VIP lead".to_string(),
            status: "new".to_string(),
        }
    }

    #[test]
    fn empty_table_has_header_only() {
        let html = render_leads_html(&[]);
        assert!(html.contains("<th>Name</th><th>Mobile Number</th><th>Description</th><th>Status</th>"));
        assert!(!html.contains("<td>"));
    }

    #[test]
    fn rows_follow_input_order_and_escape_markup() {
        let html = render_leads_html(&[lead(1, "Zed"), lead(2, "<b>Amy & Co</b>")]);
        assert_eq!(html.matches("<tr><td>").count(), 2);
        let zed = html.find("Zed").expect("zed row");
        let amy = html.find("&lt;b&gt;Amy &amp; Co&lt;/b&gt;").expect("escaped row");
        assert!(zed < amy);
    }

    #[tokio::test]
    async fn export_copies_render_into_downloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::open(&dir.path().join("leads.sqlite")).expect("db");
        db.ensure_schema().expect("schema");
        db.create(&LeadFields::new("Alice", "555-0100", "VIP lead", "new")).expect("create");

        let renderer = Arc::new(MarkupRenderer::default());
        let pipeline = ExportPipeline::new(
            renderer.clone(),
            dir.path().join("documents"),
            dir.path().join("downloads"),
            "LeadDocument.pdf",
        );

        std::fs::create_dir_all(dir.path().join("downloads")).expect("downloads");
        std::fs::write(dir.path().join("downloads").join("LeadDocument.pdf"), b"old").expect("stale export");

        let response = pipeline.export_pdf(&db).await.expect("export");
        let expected = dir.path().join("downloads").join("LeadDocument.pdf");
        assert_eq!(response.path, expected.to_string_lossy());

        let exported = std::fs::read_to_string(&expected).expect("read export");
        assert!(exported.contains("<td>Alice</td>"));

        let requests = renderer.requests.lock().expect("requests lock");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].file_name, "LeadList");
        assert_eq!(requests[0].directory, dir.path().join("documents"));
    }

    #[tokio::test]
    async fn missing_render_path_is_an_export_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::open(&dir.path().join("leads.sqlite")).expect("db");
        db.ensure_schema().expect("schema");

        let renderer = Arc::new(MarkupRenderer {
            omit_path: true,
            ..MarkupRenderer::default()
        });
        let pipeline = ExportPipeline::new(
            renderer,
            dir.path().join("documents"),
            dir.path().join("downloads"),
            "LeadDocument.pdf",
        );

        let err = pipeline.export_pdf(&db).await.expect_err("export fails");
        assert!(matches!(err, AppError::Export(_)));
        assert!(!dir.path().join("downloads").join("LeadDocument.pdf").exists());
    }

    #[tokio::test]
    async fn copy_failure_is_an_export_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::open(&dir.path().join("leads.sqlite")).expect("db");
        db.ensure_schema().expect("schema");

        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").expect("blocker");
        let pipeline = ExportPipeline::new(
            Arc::new(MarkupRenderer::default()),
            dir.path().join("documents"),
            blocker.join("downloads"),
            "LeadDocument.pdf",
        );

        let err = pipeline.export_pdf(&db).await.expect_err("export fails");
        assert!(matches!(err, AppError::Export(_)));
    }
}
