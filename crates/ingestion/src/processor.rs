//! Ingestion processor
//!
//! Core logic for loading Zoom exports: summary flattening, chunking, and upserts.

use crate::chunker::{chunk_text, ChunkingConfig, TextChunk};
use crate::errors::IngestionError;
use crate::flatten::flatten_summary;
use crate::loader::{list_json_files, load_user, RecordingRecord, UserRecord};
use crate::report::{
    ChunkOutcome, ParseFailure, RecordingOutcome, RecordingReport, RunReport, UserReport,
    WriteFailure,
};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use zoomlog_common::store::{
    document_key, Collection, CollectionSpec, IngestedDocument, VectorStore,
};
use zoomlog_common::AppConfig;

/// Ingestion processor
pub struct IngestionProcessor {
    collection: Arc<dyn Collection>,
    chunking_config: ChunkingConfig,
    continue_on_parse_error: bool,
}

impl IngestionProcessor {
    pub fn new(
        collection: Arc<dyn Collection>,
        chunking_config: ChunkingConfig,
        continue_on_parse_error: bool,
    ) -> Result<Self, IngestionError> {
        chunking_config.validate()?;
        Ok(Self {
            collection,
            chunking_config,
            continue_on_parse_error,
        })
    }

    /// Ensure the target collection exists and build a processor writing to it
    pub async fn provision(
        store: &dyn VectorStore,
        config: &AppConfig,
    ) -> Result<Self, IngestionError> {
        let spec = CollectionSpec::from_config(config);
        let collection = store.ensure_collection(&spec).await?;

        Self::new(
            collection,
            ChunkingConfig::from(&config.chunking),
            config.ingest.continue_on_parse_error,
        )
    }

    /// Process every *.json file in a directory, in file name order
    #[instrument(skip(self), fields(dir = %dir.display(), collection = %self.collection.name()))]
    pub async fn process_directory(&self, dir: &Path) -> Result<RunReport, IngestionError> {
        let files = list_json_files(dir)?;
        info!(file_count = files.len(), "Processing data directory");

        let mut report = RunReport::default();

        for path in files {
            match self.process_file(&path).await {
                Ok(user_report) => report.users.push(user_report),
                Err(e) if e.is_parse_error() && self.continue_on_parse_error => {
                    error!(path = %path.display(), error = %e, "Skipping unreadable file");
                    report.parse_failures.push(ParseFailure {
                        path: path.clone(),
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            files = report.users.len(),
            chunks_written = report.chunks_written(),
            chunk_failures = report.write_failures().count(),
            "Directory processing complete"
        );

        Ok(report)
    }

    /// Load one export file and ingest its recordings
    pub async fn process_file(&self, path: &Path) -> Result<UserReport, IngestionError> {
        let user = load_user(path)?;

        info!(
            file = %path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
            name = %user.full_name(),
            email = %user.email,
            "User data loaded"
        );

        let mut report = UserReport {
            path: path.to_path_buf(),
            userid: user.userid.clone(),
            recordings: Vec::with_capacity(user.recordings.len()),
        };

        if user.recordings.is_empty() {
            warn!(userid = %user.userid, "No recordings found.");
            return Ok(report);
        }

        info!(count = user.recordings.len(), "Recordings found, chunking data...");
        for recording in &user.recordings {
            report.recordings.push(self.process_recording(&user, recording).await?);
        }

        Ok(report)
    }

    /// Chunk one recording's summary and upsert every chunk.
    /// A failed write is recorded and the remaining chunks are still attempted.
    #[instrument(skip(self, user, recording), fields(recording_id = %recording.uuid))]
    pub async fn process_recording(
        &self,
        user: &UserRecord,
        recording: &RecordingRecord,
    ) -> Result<RecordingOutcome, IngestionError> {
        let Some(summary) = &recording.summary else {
            info!("Recording has no summary, skipping");
            return Ok(RecordingOutcome::Skipped {
                recording_id: recording.uuid.clone(),
            });
        };

        let text = flatten_summary(summary);
        let chunks = chunk_text(&text, &self.chunking_config)?;
        let characters = text.chars().count();

        info!(
            characters,
            chunk_count = chunks.len(),
            "Recording {} has {} characters in {} chunks.",
            recording.uuid,
            characters,
            chunks.len()
        );

        let mut report = RecordingReport::new(
            &recording.uuid,
            recording.topic.clone(),
            characters,
            chunks.len(),
        );

        let total = chunks.len();
        for chunk in &chunks {
            let outcome = self.write_chunk(user, recording, chunk).await;
            if let ChunkOutcome::Written { .. } = outcome {
                info!(progress = %format!("{}/{}", chunk.index + 1, total), "Inserting chunks");
            }
            report.record(outcome);
        }

        Ok(report_outcome(report))
    }

    /// Upsert a single chunk, capturing any error instead of propagating it
    async fn write_chunk(
        &self,
        user: &UserRecord,
        recording: &RecordingRecord,
        chunk: &TextChunk,
    ) -> ChunkOutcome {
        let document = build_document(user, recording, chunk);

        match self.collection.upsert(&document).await {
            Ok(outcome) => {
                debug!(
                    key = %document.key,
                    chars = chunk.char_len(),
                    offset = chunk.start,
                    outcome = ?outcome,
                    "Chunk written"
                );
                ChunkOutcome::Written {
                    key: document.key,
                    outcome,
                }
            }
            Err(e) => {
                let failure = WriteFailure {
                    recording_id: recording.uuid.clone(),
                    chunk_index: chunk.index,
                    key: document.key,
                    cause: e.to_string(),
                };
                error!(
                    recording_id = %failure.recording_id,
                    chunk_index = failure.chunk_index,
                    key = %failure.key,
                    error = %e,
                    "{}",
                    failure
                );
                ChunkOutcome::Failed(failure)
            }
        }
    }
}

fn report_outcome(report: RecordingReport) -> RecordingOutcome {
    if !report.is_complete() {
        warn!(
            written = report.written.len(),
            failed = report.failures.len(),
            "Recording partially ingested"
        );
    }
    RecordingOutcome::Ingested(report)
}

/// Document for one chunk, stamped with the current time
pub fn build_document(
    user: &UserRecord,
    recording: &RecordingRecord,
    chunk: &TextChunk,
) -> IngestedDocument {
    IngestedDocument {
        key: document_key(&recording.uuid, chunk.index),
        userid: user.userid.clone(),
        firstname: user.firstname.clone(),
        lastname: user.lastname.clone(),
        email: user.email.clone(),
        topic: recording.topic.clone(),
        start_time: recording.start_time.clone(),
        duration: recording.duration,
        text: chunk.content.clone(),
        ingested_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tokio_test::assert_ok;
    use zoomlog_common::config::ChunkStrategy;
    use zoomlog_common::store::{MemoryCollection, MemoryStore};

    fn small_chunks() -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: 60,
            chunk_overlap: 10,
            strategy: ChunkStrategy::Window,
        }
    }

    fn user_json(userid: &str, recordings: serde_json::Value) -> String {
        json!({
            "userid": userid,
            "firstname": "Ada",
            "lastname": "Lovelace",
            "email": "ada@example.com",
            "recordings": recordings
        })
        .to_string()
    }

    fn summarized(uuid: &str) -> serde_json::Value {
        json!({
            "uuid": uuid,
            "topic": "Engine design",
            "start_time": "2024-02-02T09:00:00Z",
            "duration": 60,
            "summary": {
                "summary_title": "Analytical engine",
                "summary_overview": "Walked through the mill and the store in detail.",
                "summary_details": ["noted risk", {"owner": "alice", "task": "follow up"}],
                "next_steps": ["order brass gears", "write the notes on the engine"]
            }
        })
    }

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn processor(
        collection: &Arc<MemoryCollection>,
        continue_on_parse_error: bool,
    ) -> IngestionProcessor {
        IngestionProcessor::new(collection.clone(), small_chunks(), continue_on_parse_error)
            .unwrap()
    }

    fn expected_chunk_count() -> usize {
        let user: UserRecord =
            serde_json::from_str(&user_json("u-1", json!([summarized("rec")]))).unwrap();
        let text = flatten_summary(user.recordings[0].summary.as_ref().unwrap());
        chunk_text(&text, &small_chunks()).unwrap().len()
    }

    #[tokio::test]
    async fn test_keys_are_recording_id_and_index() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "ada.json", &user_json("u-1", json!([summarized("abc==")])));
        let collection = Arc::new(MemoryCollection::new("user_logs"));

        let report = assert_ok!(processor(&collection, false).process_file(&path).await);

        let n = expected_chunk_count();
        assert!(n > 2);
        let expected: Vec<String> = (0..n).map(|i| format!("abc=={}", i)).collect();

        let ingested: Vec<_> = report.ingested().collect();
        assert_eq!(ingested.len(), 1);
        assert_eq!(ingested[0].written, expected);
        assert_eq!(ingested[0].inserted, n);

        let mut stored: Vec<String> = collection
            .documents()
            .await
            .into_iter()
            .map(|d| d.key)
            .collect();
        stored.sort();
        let mut sorted_expected = expected.clone();
        sorted_expected.sort();
        assert_eq!(stored, sorted_expected);

        let first = collection.get("abc==0").await.unwrap();
        assert_eq!(first.userid, "u-1");
        assert_eq!(first.topic.as_deref(), Some("Engine design"));
        assert_eq!(first.duration, Some(60));
        assert!(first.text.starts_with("Title: Analytical engine"));
    }

    #[tokio::test]
    async fn test_reingestion_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "ada.json", &user_json("u-1", json!([summarized("rec")])));
        let collection = Arc::new(MemoryCollection::new("user_logs"));
        let processor = processor(&collection, false);

        processor.process_file(&path).await.unwrap();
        let first = collection.documents().await;

        let report = processor.process_file(&path).await.unwrap();
        let second = collection.documents().await;

        assert_eq!(first, second);
        assert_eq!(second.len(), expected_chunk_count());
        let recording = report.ingested().next().unwrap();
        assert_eq!(recording.inserted, 0);
        assert_eq!(recording.updated, expected_chunk_count());
    }

    #[tokio::test]
    async fn test_recording_without_summary_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "ada.json",
            &user_json("u-1", json!([{ "uuid": "bare", "topic": "No notes" }])),
        );
        let collection = Arc::new(MemoryCollection::new("user_logs"));

        let report = processor(&collection, false).process_file(&path).await.unwrap();

        assert_eq!(report.skipped(), 1);
        assert!(matches!(
            &report.recordings[0],
            RecordingOutcome::Skipped { recording_id } if recording_id == "bare"
        ));
        assert_eq!(collection.len().await, 0);
        assert_eq!(collection.attempts(), 0);
    }

    #[tokio::test]
    async fn test_failed_chunk_does_not_stop_the_rest() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "ada.json",
            &user_json("u-1", json!([summarized("rec"), summarized("next")])),
        );
        let collection = Arc::new(MemoryCollection::new("user_logs"));
        collection.fail_on("rec1").await;

        let report = processor(&collection, false).process_file(&path).await.unwrap();
        let n = expected_chunk_count();

        let recordings: Vec<_> = report.ingested().collect();
        assert_eq!(recordings.len(), 2);

        let first = recordings[0];
        assert_eq!(first.failures.len(), 1);
        assert_eq!(first.failures[0].chunk_index, 1);
        assert_eq!(first.failures[0].recording_id, "rec");
        assert_eq!(first.failures[0].key, "rec1");
        assert_eq!(first.written.len(), n - 1);
        assert!(first.written.contains(&format!("rec{}", n - 1)));

        assert!(recordings[1].is_complete());
        assert_eq!(collection.attempts(), 2 * n);
        assert_eq!(collection.len().await, 2 * n - 1);
        assert!(collection.get("rec1").await.is_none());
    }

    #[tokio::test]
    async fn test_user_without_recordings() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "ada.json", &user_json("u-1", json!([])));
        let collection = Arc::new(MemoryCollection::new("user_logs"));

        let report = processor(&collection, false).process_file(&path).await.unwrap();
        assert!(report.recordings.is_empty());
        assert_eq!(collection.len().await, 0);
    }

    #[tokio::test]
    async fn test_parse_error_aborts_by_default() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "a.json", &user_json("u-1", json!([summarized("rec")])));
        write_file(&dir, "b.json", "{ broken");
        write_file(&dir, "c.json", &user_json("u-3", json!([summarized("late")])));
        let collection = Arc::new(MemoryCollection::new("user_logs"));

        let err = processor(&collection, false)
            .process_directory(dir.path())
            .await
            .unwrap_err();

        assert!(err.is_parse_error());
        // a.json ran before the failure, c.json never did
        assert!(collection.get("rec0").await.is_some());
        assert!(collection.get("late0").await.is_none());
    }

    #[tokio::test]
    async fn test_parse_error_isolated_when_configured() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "a.json", &user_json("u-1", json!([summarized("rec")])));
        write_file(&dir, "b.json", r#"{"firstname": "no id"}"#);
        write_file(&dir, "c.json", &user_json("u-3", json!([summarized("late")])));
        write_file(&dir, "readme.txt", "not an export");
        let collection = Arc::new(MemoryCollection::new("user_logs"));

        let report = processor(&collection, true)
            .process_directory(dir.path())
            .await
            .unwrap();

        assert_eq!(report.users.len(), 2);
        assert_eq!(report.parse_failures.len(), 1);
        assert!(report.parse_failures[0].path.ends_with("b.json"));
        assert_eq!(report.chunks_written(), 2 * expected_chunk_count());
        assert!(collection.get("late0").await.is_some());
    }

    #[tokio::test]
    async fn test_invalid_utf8_file_isolated_when_configured() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.json"), b"{\"userid\": \"u\xff\"}").unwrap();
        write_file(&dir, "b.json", &user_json("u-2", json!([summarized("rec")])));
        let collection = Arc::new(MemoryCollection::new("user_logs"));

        let report = processor(&collection, true)
            .process_directory(dir.path())
            .await
            .unwrap();

        assert_eq!(report.parse_failures.len(), 1);
        assert!(report.parse_failures[0].path.ends_with("a.json"));
        assert_eq!(report.users.len(), 1);
        assert!(collection.get("rec0").await.is_some());
    }

    #[tokio::test]
    async fn test_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let collection = Arc::new(MemoryCollection::new("user_logs"));

        let result = processor(&collection, true)
            .process_directory(&dir.path().join("missing"))
            .await;
        assert!(matches!(result, Err(IngestionError::DirectoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_provision_uses_configured_collection() {
        let store = MemoryStore::new();
        let mut config = AppConfig::default();
        config.collection.name = "meeting_logs".into();

        let processor = IngestionProcessor::provision(&store, &config).await.unwrap();
        assert_eq!(processor.collection.name(), "meeting_logs");
        assert!(store.get("meeting_logs").await.is_some());
    }

    #[test]
    fn test_invalid_chunking_rejected() {
        let collection: Arc<dyn Collection> = Arc::new(MemoryCollection::new("user_logs"));
        let config = ChunkingConfig {
            chunk_size: 10,
            chunk_overlap: 20,
            strategy: ChunkStrategy::Window,
        };
        assert!(IngestionProcessor::new(collection, config, false).is_err());
    }
}
