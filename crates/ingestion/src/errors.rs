//! Ingestion error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Parse error for {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Missing required field '{field}' in {path}")]
    MissingField { path: PathBuf, field: String },

    #[error("Chunking error: {0}")]
    ChunkingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Provisioning error: {0}")]
    ProvisioningError(String),

    #[error("Data directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IngestionError {
    /// Whether the error comes from reading a single input file
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            IngestionError::ParseError { .. } | IngestionError::MissingField { .. }
        )
    }
}

impl From<zoomlog_common::errors::AppError> for IngestionError {
    fn from(e: zoomlog_common::errors::AppError) -> Self {
        use zoomlog_common::errors::AppError;
        match e {
            AppError::Provisioning { .. } => IngestionError::ProvisioningError(e.to_string()),
            other => IngestionError::ConfigError(other.to_string()),
        }
    }
}
