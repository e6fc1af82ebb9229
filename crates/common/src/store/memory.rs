//! In-memory vector store for testing and dry runs

use super::{Collection, CollectionSpec, IngestedDocument, UpsertOutcome, VectorStore};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Store keeping collections in process memory
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a collection created earlier
    pub async fn get(&self, name: &str) -> Option<Arc<MemoryCollection>> {
        self.collections.lock().await.get(name).cloned()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<Arc<dyn Collection>> {
        let mut collections = self.collections.lock().await;
        let collection = collections
            .entry(spec.name.clone())
            .or_insert_with(|| Arc::new(MemoryCollection::new(&spec.name)))
            .clone();
        Ok(collection)
    }
}

/// Keyed document map with optional injected write failures
pub struct MemoryCollection {
    name: String,
    documents: Mutex<BTreeMap<String, IngestedDocument>>,
    failing_keys: Mutex<HashSet<String>>,
    attempts: AtomicUsize,
}

impl MemoryCollection {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            documents: Mutex::new(BTreeMap::new()),
            failing_keys: Mutex::new(HashSet::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Make every upsert of `key` fail
    pub async fn fail_on(&self, key: &str) {
        self.failing_keys.lock().await.insert(key.to_string());
    }

    /// Stored documents ordered by key
    pub async fn documents(&self) -> Vec<IngestedDocument> {
        self.documents.lock().await.values().cloned().collect()
    }

    pub async fn get(&self, key: &str) -> Option<IngestedDocument> {
        self.documents.lock().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.documents.lock().await.len()
    }

    /// Number of upserts attempted, failed ones included
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, document: &IngestedDocument) -> Result<UpsertOutcome> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.failing_keys.lock().await.contains(&document.key) {
            return Err(AppError::Store {
                message: format!("injected failure for {}", document.key),
            });
        }

        let previous = self
            .documents
            .lock()
            .await
            .insert(document.key.clone(), document.clone());

        Ok(match previous {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Inserted,
        })
    }
}
