pub mod command;

use crate::errors::AppResult;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

/// Input to an HTML to PDF conversion. The renderer writes
/// `<directory>/<file_name>.pdf`.
#[derive(Debug, Clone)]
pub struct PdfRequest {
    pub html: String,
    pub file_name: String,
    pub directory: PathBuf,
    pub base64: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PdfFile {
    pub file_path: Option<PathBuf>,
    pub base64: Option<String>,
}

pub type RenderFuture<'a> = Pin<Box<dyn Future<Output = AppResult<PdfFile>> + Send + 'a>>;

pub trait PdfRenderer: Send + Sync {
    fn convert<'a>(&'a self, request: &'a PdfRequest) -> RenderFuture<'a>;
}
