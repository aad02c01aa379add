use super::{PdfFile, PdfRenderer, PdfRequest, RenderFuture};
use crate::errors::{AppError, AppResult};
use base64::Engine;
use tokio::process::Command;

/// Renders through an external converter invoked as
/// `<program> [args..] <input.html> <output.pdf>` (the wkhtmltopdf calling
/// convention).
#[derive(Debug, Clone)]
pub struct CommandPdfRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandPdfRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    async fn render(&self, request: &PdfRequest) -> AppResult<PdfFile> {
        tokio::fs::create_dir_all(&request.directory)
            .await
            .map_err(AppError::export)?;

        let html_path = request.directory.join(format!("{}.html", request.file_name));
        let pdf_path = request.directory.join(format!("{}.pdf", request.file_name));
        tokio::fs::write(&html_path, request.html.as_bytes())
            .await
            .map_err(AppError::export)?;

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&html_path)
            .arg(&pdf_path)
            .output()
            .await;

        if let Err(error) = tokio::fs::remove_file(&html_path).await {
            tracing::debug!(error = %error, path = %html_path.display(), "failed to remove staged html");
        }

        let output = output.map_err(|error| {
            AppError::Export(format!("failed to launch {}: {}", self.program, error))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Export(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let base64 = if request.base64 {
            let bytes = tokio::fs::read(&pdf_path).await.map_err(AppError::export)?;
            Some(base64::engine::general_purpose::STANDARD.encode(bytes))
        } else {
            None
        };

        tracing::info!(path = %pdf_path.display(), "pdf rendered");
        Ok(PdfFile {
            file_path: Some(pdf_path),
            base64,
        })
    }
}

impl PdfRenderer for CommandPdfRenderer {
    fn convert<'a>(&'a self, request: &'a PdfRequest) -> RenderFuture<'a> {
        Box::pin(self.render(request))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::CommandPdfRenderer;
    use crate::errors::AppError;
    use crate::pdf::{PdfRenderer, PdfRequest};
    use base64::Engine;

    fn request(dir: &tempfile::TempDir, base64: bool) -> PdfRequest {
        PdfRequest {
            html: "<h1>Lead List</h1>".to_string(),
            file_name: "LeadList".to_string(),
            directory: dir.path().join("documents"),
            base64,
        }
    }

    #[tokio::test]
    async fn converter_output_lands_in_requested_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        // `cp in out` stands in for a converter that copies the markup through.
        let renderer = CommandPdfRenderer::new("cp", Vec::new());

        let file = renderer.convert(&request(&dir, true)).await.expect("convert");
        let path = file.file_path.expect("file path");

        assert_eq!(path, dir.path().join("documents").join("LeadList.pdf"));
        assert_eq!(std::fs::read_to_string(&path).expect("read pdf"), "<h1>Lead List</h1>");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(file.base64.expect("base64"))
            .expect("decode");
        assert_eq!(decoded, b"<h1>Lead List</h1>");
        assert!(!dir.path().join("documents").join("LeadList.html").exists());
    }

    #[tokio::test]
    async fn failing_converter_is_an_export_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let renderer = CommandPdfRenderer::new("false", Vec::new());

        let err = renderer.convert(&request(&dir, false)).await.expect_err("convert fails");
        assert!(matches!(err, AppError::Export(_)));
    }

    #[tokio::test]
    async fn missing_converter_is_an_export_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let renderer = CommandPdfRenderer::new("lead-manager-no-such-converter", Vec::new());

        let err = renderer.convert(&request(&dir, false)).await.expect_err("convert fails");
        assert!(matches!(err, AppError::Export(message) if message.contains("failed to launch")));
    }
}
