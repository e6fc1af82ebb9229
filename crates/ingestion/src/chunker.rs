//! Text chunking module
//!
//! Splits flattened summaries into overlapping chunks for embedding.
//! Lengths and offsets are counted in characters, not bytes.

use crate::errors::IngestionError;
use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;
use zoomlog_common::config::{ChunkStrategy, ChunkingSettings};

/// Configuration for text chunking
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    pub strategy: ChunkStrategy,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::from(&ChunkingSettings::default())
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            chunk_size: settings.embedding_and_chunk_size,
            chunk_overlap: settings.chunk_overlap,
            strategy: settings.strategy,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestionError> {
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(IngestionError::ChunkingError(format!(
                "overlap {} must be smaller than chunk size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// A text chunk with its position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Index of this chunk in the document
    pub index: usize,
    /// The chunk content
    pub content: String,
    /// Start character position in original text
    pub start: usize,
}

impl TextChunk {
    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Split text with the configured strategy
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<TextChunk>, IngestionError> {
    config.validate()?;

    let chunks = match config.strategy {
        ChunkStrategy::Window => chunk_text_with_overlap(text, config),
        ChunkStrategy::Semantic => chunk_text_semantic(text, config)?,
    };

    debug!(
        input_chars = text.chars().count(),
        chunk_count = chunks.len(),
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        strategy = ?config.strategy,
        "Text chunked"
    );

    Ok(chunks)
}

/// Chunk text with overlap (sliding window).
/// Every chunk but the last holds exactly `chunk_size` characters and the
/// next one starts `chunk_overlap` characters before it ends.
pub fn chunk_text_with_overlap(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let total_len = chars.len();

    if total_len == 0 {
        return chunks;
    }

    let advance = config.chunk_size.saturating_sub(config.chunk_overlap).max(1);
    let mut start = 0;
    let mut index = 0;

    loop {
        let end = (start + config.chunk_size).min(total_len);
        chunks.push(TextChunk {
            index,
            content: chars[start..end].iter().collect(),
            start,
        });

        if end == total_len {
            break;
        }

        // Move forward with overlap
        start += advance;
        index += 1;
    }

    chunks
}

/// Boundary-aware splitting that prefers paragraph, sentence and word breaks.
/// Chunks never exceed `chunk_size`; the overlap is best effort.
pub fn chunk_text_semantic(
    text: &str,
    config: &ChunkingConfig,
) -> Result<Vec<TextChunk>, IngestionError> {
    let chunk_config = ChunkConfig::new(config.chunk_size)
        .with_overlap(config.chunk_overlap)
        .map_err(|e| IngestionError::ChunkingError(e.to_string()))?;
    let splitter = TextSplitter::new(chunk_config);

    let chunks = splitter
        .chunk_indices(text)
        .enumerate()
        .map(|(index, (byte_offset, content))| TextChunk {
            index,
            content: content.to_string(),
            start: text[..byte_offset].chars().count(),
        })
        .collect();

    Ok(chunks)
}
