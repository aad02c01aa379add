use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("CONNECTION_FAILED: {0}")]
    Connection(String),
    #[error("READ_FAILED: {0}")]
    Read(String),
    #[error("WRITE_FAILED: {0}")]
    Write(String),
    #[error("EXPORT_FAILED: {0}")]
    Export(String),
    #[error("PRINTER_DISCOVERY_FAILED: {0}")]
    PrinterDiscovery(String),
    #[error("PRINT_SUBMISSION_FAILED: {0}")]
    PrintSubmission(String),
    #[error("VALIDATION: {0}")]
    Validation(String),
    #[error("CONFIG_INVALID: {0}")]
    Config(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    pub fn read(error: impl std::fmt::Display) -> Self {
        Self::Read(error.to_string())
    }

    pub fn write(error: impl std::fmt::Display) -> Self {
        Self::Write(error.to_string())
    }

    pub fn export(error: impl std::fmt::Display) -> Self {
        Self::Export(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
