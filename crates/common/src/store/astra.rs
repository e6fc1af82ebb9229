//! Astra DB Data API client
//!
//! Speaks the JSON command protocol at `{endpoint}/api/json/v1/{keyspace}`.

use super::{Collection, CollectionSpec, IngestedDocument, UpsertOutcome, VectorStore};
use crate::config::AstraCredentials;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

const API_PATH: &str = "api/json/v1";

/// Data API client bound to one keyspace
#[derive(Clone)]
pub struct AstraClient {
    client: reqwest::Client,
    keyspace_url: String,
}

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    errors: Vec<CommandError>,
}

#[derive(Debug, Deserialize)]
struct CommandError {
    #[serde(default)]
    message: String,
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
}

impl AstraClient {
    /// Create a new Data API client
    pub fn new(credentials: &AstraCredentials, keyspace: &str, timeout: Duration) -> Result<Self> {
        let endpoint = credentials.api_endpoint.trim_end_matches('/');
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(AppError::Configuration {
                message: format!("Astra API endpoint must be an http(s) URL: {}", endpoint),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "token",
            HeaderValue::from_str(&credentials.application_token).map_err(|_| {
                AppError::Configuration {
                    message: "Astra application token contains invalid characters".to_string(),
                }
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            keyspace_url: format!("{}/{}/{}", endpoint, API_PATH, keyspace),
        })
    }

    /// Send one command and return its `status` object
    async fn command(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self.client.post(url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let payload: CommandResponse = response.json().await?;
        if !payload.errors.is_empty() {
            let code = payload.errors.iter().find_map(|e| e.error_code.clone());
            let message = payload
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AppError::DataApi { code, message });
        }

        Ok(payload.status.unwrap_or(Value::Null))
    }

    /// Names of the collections in the keyspace
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        let status = self
            .command(&self.keyspace_url, &json!({ "findCollections": {} }))
            .await?;

        let names = status
            .get("collections")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(name) => Some(name.clone()),
                        Value::Object(obj) => obj
                            .get("name")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(names)
    }

    /// Create a vector collection with server-side vectorization
    pub async fn create_collection(&self, spec: &CollectionSpec) -> Result<()> {
        let body = json!({
            "createCollection": {
                "name": spec.name,
                "options": {
                    "vector": {
                        "dimension": spec.dimension,
                        "metric": spec.metric,
                        "service": spec.service,
                    }
                }
            }
        });
        self.command(&self.keyspace_url, &body).await?;
        Ok(())
    }

    /// Handle to a collection, without checking that it exists
    pub fn collection(&self, name: &str) -> AstraCollection {
        AstraCollection {
            client: self.clone(),
            name: name.to_string(),
            url: format!("{}/{}", self.keyspace_url, name),
        }
    }
}

fn already_exists(err: &AppError) -> bool {
    matches!(
        err,
        AppError::DataApi { code: Some(code), .. } if code.contains("ALREADY_EXISTS")
    )
}

#[async_trait]
impl VectorStore for AstraClient {
    #[instrument(skip(self, spec), fields(collection = %spec.name))]
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<Arc<dyn Collection>> {
        let provisioning = |e: AppError| AppError::Provisioning {
            collection: spec.name.clone(),
            message: e.to_string(),
        };

        let existing = self.list_collections().await.map_err(provisioning)?;
        if existing.iter().any(|name| name == &spec.name) {
            info!("Astra database collection already exists, moving on...");
            return Ok(Arc::new(self.collection(&spec.name)));
        }

        info!(
            dimension = spec.dimension,
            provider = %spec.service.provider,
            model = %spec.service.model_name,
            "Creating Astra database collection..."
        );
        match self.create_collection(spec).await {
            Ok(()) => {}
            Err(e) if already_exists(&e) => {
                info!("Astra database collection already exists, moving on...");
            }
            Err(e) => return Err(provisioning(e)),
        }

        Ok(Arc::new(self.collection(&spec.name)))
    }
}

/// Collection handle on the Data API
#[derive(Clone)]
pub struct AstraCollection {
    client: AstraClient,
    name: String,
    url: String,
}

#[async_trait]
impl Collection for AstraCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, document: &IngestedDocument) -> Result<UpsertOutcome> {
        let body = json!({
            "updateOne": {
                "filter": { "_id": document.key },
                "update": { "$set": document.set_fields() },
                "options": { "upsert": true }
            }
        });

        let status = self.client.command(&self.url, &body).await?;
        let outcome = if status.get("upsertedId").is_some_and(|id| !id.is_null()) {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        };

        debug!(key = %document.key, outcome = ?outcome, "Document upserted");
        Ok(outcome)
    }
}
