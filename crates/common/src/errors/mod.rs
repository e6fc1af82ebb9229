//! Error types for ZoomLog
//!
//! Provides the shared error type with:
//! - Distinct variants for configuration, provisioning and store failures
//! - Conversions from the HTTP client and config layers
//! - A fatal/recoverable split used by the ingestion loop

use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Missing required setting: {key}")]
    MissingSetting { key: String },

    // Collection provisioning
    #[error("Failed to provision collection '{collection}': {message}")]
    Provisioning { collection: String, message: String },

    // Vector store errors
    #[error("Data API error{}: {message}", code_suffix(.code))]
    DataApi {
        code: Option<String>,
        message: String,
    },

    #[error("Data API returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" [{}]", c))
        .unwrap_or_default()
}

impl AppError {
    /// Errors that must stop the run before any document is written
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Configuration { .. }
                | AppError::MissingSetting { .. }
                | AppError::Provisioning { .. }
        )
    }
}

impl From<::config::ConfigError> for AppError {
    fn from(err: ::config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
