//! Zoom export loader
//!
//! Maps one exported JSON file onto a user with their recordings and summaries.

use crate::errors::IngestionError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// A Zoom user and their recordings
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserRecord {
    #[validate(length(min = 1))]
    pub userid: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    #[validate(nested)]
    pub recordings: Vec<RecordingRecord>,
}

/// One recorded meeting
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordingRecord {
    #[validate(length(min = 1))]
    pub uuid: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    /// Minutes
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub summary: Option<SummaryRecord>,
}

/// Meeting summary generated by Zoom
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryRecord {
    #[serde(default)]
    pub summary_title: String,
    #[serde(default)]
    pub summary_overview: String,
    #[serde(default)]
    pub summary_details: Vec<SummaryEntry>,
    #[serde(default)]
    pub next_steps: Vec<SummaryEntry>,
}

/// A detail or next-step entry: free text or labeled fields
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SummaryEntry {
    Text(String),
    Fields(Map<String, Value>),
    Other(Value),
}

impl UserRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname).trim().to_string()
    }
}

/// Load a user from a JSON file
pub fn load_user(path: &Path) -> Result<UserRecord, IngestionError> {
    // from_slice reports invalid UTF-8 as a parse error
    let raw = std::fs::read(path)?;

    let user: UserRecord =
        serde_json::from_slice(&raw).map_err(|e| IngestionError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    user.validate().map_err(|e| IngestionError::MissingField {
        path: path.to_path_buf(),
        field: first_invalid_field(&e),
    })?;

    debug!(
        path = %path.display(),
        userid = %user.userid,
        recordings = user.recordings.len(),
        "User loaded"
    );

    Ok(user)
}

/// Dotted path of the first field that failed validation, e.g. `recordings[1].uuid`
fn first_invalid_field(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by_key(|(name, _)| name.to_string());

    for (name, kind) in fields {
        match kind {
            ValidationErrorsKind::Field(_) => return name.to_string(),
            ValidationErrorsKind::Struct(inner) => {
                return format!("{}.{}", name, first_invalid_field(inner));
            }
            ValidationErrorsKind::List(items) => {
                if let Some((index, inner)) = items.iter().next() {
                    return format!("{}[{}].{}", name, index, first_invalid_field(inner));
                }
            }
        }
    }
    "unknown".to_string()
}

/// List the *.json files of a directory, sorted by file name
pub fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>, IngestionError> {
    if !dir.is_dir() {
        return Err(IngestionError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}
