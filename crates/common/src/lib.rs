//! ZoomLog Common Library
//!
//! Shared code for the ZoomLog loaders including:
//! - Configuration management
//! - Error types and handling
//! - Vector store abstraction (Astra DB Data API and in-memory)
//! - The persisted document model

pub mod config;
pub mod errors;
pub mod store;

// Re-export commonly used types
pub use crate::config::AppConfig;
pub use crate::errors::{AppError, Result};
pub use crate::store::{Collection, CollectionSpec, IngestedDocument, VectorStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default collection name
pub const DEFAULT_COLLECTION_NAME: &str = "user_logs";

/// Default embedding dimension, reused as the maximum chunk length
pub const DEFAULT_EMBEDDING_AND_CHUNK_SIZE: usize = 1024;

/// Default overlap between consecutive chunks, in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 128;
