//! Configuration management for ZoomLog
//!
//! Supports loading configuration from:
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Environment variables (prefixed with APP__)
//! - The well-known Astra DB and Langflow variables
//! - Default values

use crate::errors::{AppError, Result};
use crate::{DEFAULT_CHUNK_OVERLAP, DEFAULT_COLLECTION_NAME, DEFAULT_EMBEDDING_AND_CHUNK_SIZE};
use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Well-known environment variables and the config keys they populate
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("ASTRA_DB_APPLICATION_TOKEN", "astra.application_token"),
    ("ASTRA_DB_API_ENDPOINT", "astra.api_endpoint"),
    ("ASTRA_DB_KEYSPACE", "astra.keyspace"),
    ("LANGFLOW_BASE_API_URL", "langflow.base_api_url"),
    ("LANGFLOW_FLOW_ENDPOINT", "langflow.flow_endpoint"),
    ("LANGFLOW_FLOW_ID", "langflow.flow_id"),
    ("LANGFLOW_APPLICATION_TOKEN", "langflow.application_token"),
];

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Astra DB connectivity
    #[serde(default)]
    pub astra: AstraConfig,

    /// Target collection settings
    #[serde(default)]
    pub collection: CollectionConfig,

    /// Chunking parameters
    #[serde(default)]
    pub chunking: ChunkingSettings,

    /// Input and failure policy
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Langflow flow API (recognized, not used by ingestion)
    #[serde(default)]
    pub langflow: LangflowConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AstraConfig {
    /// Data API endpoint, e.g. https://<db-id>-<region>.apps.astra.datastax.com
    pub api_endpoint: Option<String>,

    /// Application token sent in the `Token` header
    pub application_token: Option<String>,

    /// Keyspace holding the collection
    #[serde(default = "default_keyspace")]
    pub keyspace: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollectionConfig {
    /// Collection name
    #[serde(default = "default_collection_name")]
    pub name: String,

    /// Server-side embedding provider
    #[serde(default = "default_vectorize_provider")]
    pub vectorize_provider: String,

    /// Server-side embedding model
    #[serde(default = "default_vectorize_model")]
    pub vectorize_model: String,
}

/// How flattened summaries are split into chunks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Fixed-size sliding window with exact overlap
    #[default]
    Window,
    /// Boundary-aware splitting (paragraphs, sentences, words)
    Semantic,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingSettings {
    /// Maximum chunk length in characters, also used as the embedding dimension
    #[serde(default = "default_chunk_size")]
    pub embedding_and_chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default)]
    pub strategy: ChunkStrategy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Directory containing the exported *.json files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Skip unparseable files instead of aborting the run
    #[serde(default)]
    pub continue_on_parse_error: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LangflowConfig {
    pub base_api_url: Option<String>,
    pub flow_endpoint: Option<String>,
    pub flow_id: Option<String>,
    pub application_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,
}

/// Validated Astra DB credentials
#[derive(Debug, Clone)]
pub struct AstraCredentials {
    pub api_endpoint: String,
    pub application_token: String,
}

// Default value functions
fn default_keyspace() -> String { "default_keyspace".to_string() }
fn default_request_timeout() -> u64 { 30 }
fn default_collection_name() -> String { DEFAULT_COLLECTION_NAME.to_string() }
fn default_vectorize_provider() -> String { "nvidia".to_string() }
fn default_vectorize_model() -> String { "NV-Embed-QA".to_string() }
fn default_chunk_size() -> usize { DEFAULT_EMBEDDING_AND_CHUNK_SIZE }
fn default_chunk_overlap() -> usize { DEFAULT_CHUNK_OVERLAP }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_log_level() -> String { "info".to_string() }

impl Default for AstraConfig {
    fn default() -> Self {
        Self {
            api_endpoint: None,
            application_token: None,
            keyspace: default_keyspace(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            name: default_collection_name(),
            vectorize_provider: default_vectorize_provider(),
            vectorize_model: default_vectorize_model(),
        }
    }
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            embedding_and_chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            strategy: ChunkStrategy::default(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            continue_on_parse_error: false,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false));

        Self::finish(builder)
    }

    /// Load from a specific configuration file
    pub fn from_file(path: &str) -> Result<Self> {
        let builder = Config::builder().add_source(File::with_name(path));
        Self::finish(builder)
    }

    /// Layer APP__ variables and the well-known variables on top of the file sources
    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        // e.g., APP__COLLECTION__NAME=meeting_logs
        let mut builder = builder.add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        );

        for (var, key) in ENV_OVERRIDES {
            let value = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
            builder = builder.set_override_option(*key, value)?;
        }

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check chunking parameters
    pub fn validate(&self) -> Result<()> {
        let chunking = &self.chunking;
        if chunking.embedding_and_chunk_size == 0 {
            return Err(AppError::Configuration {
                message: "chunking.embedding_and_chunk_size must be greater than zero".to_string(),
            });
        }
        if chunking.chunk_overlap >= chunking.embedding_and_chunk_size {
            return Err(AppError::Configuration {
                message: format!(
                    "chunking.chunk_overlap ({}) must be smaller than the chunk size ({})",
                    chunking.chunk_overlap, chunking.embedding_and_chunk_size
                ),
            });
        }
        Ok(())
    }

    /// Astra endpoint and token, failing when either is absent
    pub fn astra_credentials(&self) -> Result<AstraCredentials> {
        let api_endpoint = required(&self.astra.api_endpoint, "astra.api_endpoint")?;
        let application_token =
            required(&self.astra.application_token, "astra.application_token")?;
        Ok(AstraCredentials {
            api_endpoint,
            application_token,
        })
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.astra.timeout_secs)
    }
}

fn required(value: &Option<String>, key: &str) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::MissingSetting {
            key: key.to_string(),
        })
}
