use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    NotFound(String),
    ValidationError(String),
    ParseError(String),
    Unauthorized,
    PayloadTooLarge(usize),
    BatchExecution(String),
    SpreadsheetError(String),
    ArchiveError(String),
    ConfigError(String),
    IoError(String),
}

impl AppError {
    /// Text returned to HTTP clients. Input errors carry their bare message,
    /// everything else the full display form.
    pub fn message(&self) -> String {
        match self {
            AppError::NotFound(msg) | AppError::ValidationError(msg) => msg.clone(),
            AppError::Unauthorized => "Unauthorized".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::Unauthorized => write!(f, "Unauthorized"),
            AppError::PayloadTooLarge(limit) => {
                write!(f, "Upload exceeds the {} byte limit", limit)
            }
            AppError::BatchExecution(msg) => write!(f, "Batch execution error: {}", msg),
            AppError::SpreadsheetError(msg) => write!(f, "Spreadsheet error: {}", msg),
            AppError::ArchiveError(msg) => write!(f, "Archive error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        AppError::ArchiveError(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        AppError::SpreadsheetError(err.to_string())
    }
}

impl From<calamine::Error> for AppError {
    fn from(err: calamine::Error) -> Self {
        AppError::ParseError(format!("Unable to read excel file: {}", err))
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::ParseError(format!("Unable to read csv file: {}", err))
    }
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_expose_bare_message() {
        let err = AppError::NotFound("excel file is required".to_string());
        assert_eq!(err.message(), "excel file is required");

        let err = AppError::ValidationError("email is required".to_string());
        assert_eq!(err.message(), "email is required");
    }

    #[test]
    fn test_server_errors_expose_display_text() {
        let err = AppError::BatchExecution("worker panicked".to_string());
        assert_eq!(err.message(), "Batch execution error: worker panicked");
    }

    #[test]
    fn test_io_error_conversion() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert!(matches!(err, AppError::IoError(msg) if msg == "disk"));
    }
}
