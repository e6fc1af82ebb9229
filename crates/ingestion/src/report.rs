//! Per-chunk, per-recording and per-run ingestion results

use std::fmt;
use std::path::PathBuf;
use zoomlog_common::store::UpsertOutcome;

/// A chunk that could not be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub recording_id: String,
    pub chunk_index: usize,
    pub key: String,
    pub cause: String,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Iteration {}: Error inserting data for {}: {}",
            self.chunk_index, self.recording_id, self.cause
        )
    }
}

/// Result of writing one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Written { key: String, outcome: UpsertOutcome },
    Failed(WriteFailure),
}

/// Chunks written and lost for one recording
#[derive(Debug, Clone, Default)]
pub struct RecordingReport {
    pub recording_id: String,
    pub topic: Option<String>,
    /// Length of the flattened summary in characters
    pub characters: usize,
    pub chunk_count: usize,
    /// Keys written, in chunk order
    pub written: Vec<String>,
    pub inserted: usize,
    pub updated: usize,
    pub failures: Vec<WriteFailure>,
}

impl RecordingReport {
    pub fn new(
        recording_id: &str,
        topic: Option<String>,
        characters: usize,
        chunk_count: usize,
    ) -> Self {
        Self {
            recording_id: recording_id.to_string(),
            topic,
            characters,
            chunk_count,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: ChunkOutcome) {
        match outcome {
            ChunkOutcome::Written { key, outcome } => {
                match outcome {
                    UpsertOutcome::Inserted => self.inserted += 1,
                    UpsertOutcome::Updated => self.updated += 1,
                }
                self.written.push(key);
            }
            ChunkOutcome::Failed(failure) => self.failures.push(failure),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.written.len() == self.chunk_count
    }
}

/// What happened to one recording
#[derive(Debug, Clone)]
pub enum RecordingOutcome {
    /// No summary, nothing written
    Skipped { recording_id: String },
    Ingested(RecordingReport),
}

/// Results for one input file
#[derive(Debug, Clone)]
pub struct UserReport {
    pub path: PathBuf,
    pub userid: String,
    pub recordings: Vec<RecordingOutcome>,
}

impl UserReport {
    pub fn ingested(&self) -> impl Iterator<Item = &RecordingReport> {
        self.recordings.iter().filter_map(|r| match r {
            RecordingOutcome::Ingested(report) => Some(report),
            RecordingOutcome::Skipped { .. } => None,
        })
    }

    pub fn skipped(&self) -> usize {
        self.recordings
            .iter()
            .filter(|r| matches!(r, RecordingOutcome::Skipped { .. }))
            .count()
    }
}

/// An input file left out because it could not be parsed
#[derive(Debug, Clone)]
pub struct ParseFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Totals for a whole run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub users: Vec<UserReport>,
    pub parse_failures: Vec<ParseFailure>,
}

impl RunReport {
    pub fn recordings_ingested(&self) -> usize {
        self.users.iter().map(|u| u.ingested().count()).sum()
    }

    pub fn recordings_skipped(&self) -> usize {
        self.users.iter().map(UserReport::skipped).sum()
    }

    pub fn chunks_written(&self) -> usize {
        self.users
            .iter()
            .flat_map(UserReport::ingested)
            .map(|r| r.written.len())
            .sum()
    }

    pub fn write_failures(&self) -> impl Iterator<Item = &WriteFailure> {
        self.users
            .iter()
            .flat_map(UserReport::ingested)
            .flat_map(|r| r.failures.iter())
    }

    pub fn is_clean(&self) -> bool {
        self.parse_failures.is_empty() && self.write_failures().next().is_none()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ingestion summary")?;
        writeln!(f, "  Files processed:     {}", self.users.len())?;
        writeln!(f, "  Recordings ingested: {}", self.recordings_ingested())?;
        writeln!(f, "  Recordings skipped:  {}", self.recordings_skipped())?;
        writeln!(f, "  Chunks written:      {}", self.chunks_written())?;
        write!(f, "  Chunk failures:      {}", self.write_failures().count())?;
        for failure in self.write_failures() {
            write!(f, "\n    {}", failure)?;
        }
        for user in &self.users {
            for recording in user.ingested().filter(|r| !r.is_complete()) {
                write!(
                    f,
                    "\n  Partial: {} / {} ({}) {}/{} chunks",
                    user.userid,
                    recording.recording_id,
                    recording.topic.as_deref().unwrap_or("untitled"),
                    recording.written.len(),
                    recording.chunk_count
                )?;
            }
            for recording in &user.recordings {
                if let RecordingOutcome::Skipped { recording_id } = recording {
                    write!(f, "\n  No summary: {} / {}", user.userid, recording_id)?;
                }
            }
        }
        if !self.parse_failures.is_empty() {
            write!(f, "\n  Files skipped:       {}", self.parse_failures.len())?;
            for failure in &self.parse_failures {
                write!(f, "\n    {}: {}", failure.path.display(), failure.message)?;
            }
        }
        Ok(())
    }
}
