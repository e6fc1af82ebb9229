//! Vector store abstraction
//!
//! Provides a unified interface over vector-enabled document collections:
//! - Astra DB Data API (server-side vectorization)
//! - In-memory store for tests and dry runs

pub mod astra;
pub mod memory;

use crate::config::AppConfig;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub use astra::{AstraClient, AstraCollection};
pub use memory::{MemoryCollection, MemoryStore};

/// Similarity metric of a vector collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorMetric {
    Cosine,
    DotProduct,
    Euclidean,
}

/// Embedding service the store uses to vectorize `$vectorize` fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorizeService {
    pub provider: String,
    #[serde(rename = "modelName")]
    pub model_name: String,
}

/// Settings a collection is provisioned with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: VectorMetric,
    pub service: VectorizeService,
}

impl CollectionSpec {
    /// Build the collection settings from configuration.
    /// The chunk size doubles as the embedding dimension.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            name: config.collection.name.clone(),
            dimension: config.chunking.embedding_and_chunk_size,
            metric: VectorMetric::Cosine,
            service: VectorizeService {
                provider: config.collection.vectorize_provider.clone(),
                model_name: config.collection.vectorize_model.clone(),
            },
        }
    }
}

/// Result of a single upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// One stored chunk of a meeting summary
#[derive(Debug, Clone)]
pub struct IngestedDocument {
    /// Recording id followed by the chunk index, no separator
    pub key: String,
    pub userid: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub topic: Option<String>,
    pub start_time: Option<String>,
    pub duration: Option<i64>,
    /// Chunk text, written to both `$vectorize` and `content`
    pub text: String,
    /// Set when the document is written
    pub ingested_at: DateTime<Utc>,
}

/// Build the stable document key for a chunk
pub fn document_key(recording_id: &str, chunk_index: usize) -> String {
    format!("{}{}", recording_id, chunk_index)
}

impl IngestedDocument {
    /// Fields written with `$set`; the key goes in the filter
    pub fn set_fields(&self) -> Value {
        json!({
            "userid": self.userid,
            "firstname": self.firstname,
            "lastname": self.lastname,
            "email": self.email,
            "topic": self.topic,
            "start_time": self.start_time,
            "duration": self.duration,
            "$vectorize": self.text,
            "content": self.text,
            "metadata": {
                "ingested": { "$date": self.ingested_at.timestamp_millis() }
            },
        })
    }
}

// The ingestion timestamp never takes part in equality.
impl PartialEq for IngestedDocument {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.userid == other.userid
            && self.firstname == other.firstname
            && self.lastname == other.lastname
            && self.email == other.email
            && self.topic == other.topic
            && self.start_time == other.start_time
            && self.duration == other.duration
            && self.text == other.text
    }
}

impl Eq for IngestedDocument {}

/// Handle to a provisioned collection
#[async_trait]
pub trait Collection: Send + Sync {
    /// Collection name
    fn name(&self) -> &str;

    /// Create the document if its key is absent, overwrite it otherwise
    async fn upsert(&self, document: &IngestedDocument) -> Result<UpsertOutcome>;
}

/// A database that can provision collections
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if needed and return a handle to it.
    /// An existing collection is not an error.
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<Arc<dyn Collection>>;
}

/// Create a store based on configuration
pub fn create_store(config: &AppConfig, dry_run: bool) -> Result<Arc<dyn VectorStore>> {
    if dry_run {
        tracing::warn!("Dry run: documents are kept in memory and discarded on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let credentials = config.astra_credentials()?;
    let client = AstraClient::new(
        &credentials,
        &config.astra.keyspace,
        config.request_timeout(),
    )?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn document(ingested_at: DateTime<Utc>) -> IngestedDocument {
        IngestedDocument {
            key: document_key("rec-1", 3),
            userid: "u-1".into(),
            firstname: "Ada".into(),
            lastname: "Lovelace".into(),
            email: "ada@example.com".into(),
            topic: Some("Weekly sync".into()),
            start_time: Some("2024-05-01T10:00:00Z".into()),
            duration: Some(45),
            text: "Title: Weekly sync".into(),
            ingested_at,
        }
    }

    #[test]
    fn test_document_key_has_no_separator() {
        assert_eq!(document_key("abc==", 0), "abc==0");
        assert_eq!(document_key("abc==", 12), "abc==12");
    }

    #[test]
    fn test_equality_ignores_timestamp() {
        let a = document(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let b = document(Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap());
        assert_eq!(a, b);

        let mut c = b.clone();
        c.text.push('!');
        assert_ne!(a, c);
    }

    #[test]
    fn test_set_fields_store_text_twice() {
        let ingested_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let fields = document(ingested_at).set_fields();

        assert_eq!(fields["$vectorize"], "Title: Weekly sync");
        assert_eq!(fields["content"], "Title: Weekly sync");
        assert_eq!(fields["duration"], 45);
        assert_eq!(
            fields["metadata"]["ingested"]["$date"],
            ingested_at.timestamp_millis()
        );
        assert!(fields.get("_id").is_none());
    }

    #[test]
    fn test_spec_from_config() {
        let spec = CollectionSpec::from_config(&AppConfig::default());
        assert_eq!(spec.name, "user_logs");
        assert_eq!(spec.dimension, 1024);
        assert_eq!(spec.metric, VectorMetric::Cosine);
        assert_eq!(spec.service.provider, "nvidia");
        assert_eq!(spec.service.model_name, "NV-Embed-QA");
    }

    #[test]
    fn test_create_store_requires_credentials() {
        let config = AppConfig::default();
        assert!(create_store(&config, false).is_err());
        assert!(create_store(&config, true).is_ok());
    }
}
