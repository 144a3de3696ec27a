//! Core data models shared by the store, the controllers and the renderer.
//!
//! [`ChunkRecord`]s arrive from the remote store and are never modified
//! afterwards. [`AggregatedDocument`]s are derived from them on demand and
//! never persisted.

use serde::Serialize;

/// Source label used when the backend reports a chunk without any source.
pub const UNKNOWN_SOURCE: &str = "Unknown Document";

/// A single indexed chunk of a source document, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkRecord {
    /// Backend point id, when provided.
    pub id: Option<String>,
    /// Originating document or URL identity.
    pub source: String,
    /// Position of the chunk inside its document.
    pub chunk_index: Option<i64>,
    /// Total chunk count announced by the ingestion pipeline, if any.
    pub total_chunks: Option<i64>,
    /// Content length of the chunk.
    pub size_bytes: u64,
    /// Short text excerpt.
    pub preview: Option<String>,
    /// Unix timestamp (seconds) used for recency ordering.
    pub observed_at: f64,
}

impl ChunkRecord {
    /// Minimal record with only a source and a size; other fields defaulted.
    pub fn new(source: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            id: None,
            source: source.into(),
            chunk_index: None,
            total_chunks: None,
            size_bytes,
            preview: None,
            observed_at: 0.0,
        }
    }

    pub fn with_index(mut self, index: i64) -> Self {
        self.chunk_index = Some(index);
        self
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }

    pub fn observed(mut self, at: f64) -> Self {
        self.observed_at = at;
        self
    }

    /// Chunk index used for ordering; an absent index sorts as 0.
    pub fn effective_index(&self) -> i64 {
        self.chunk_index.unwrap_or(0)
    }
}

/// All chunks sharing one source, grouped for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedDocument {
    pub source: String,
    pub chunk_count: usize,
    pub total_size_bytes: u64,
    /// Maximum `observed_at` among the chunks.
    pub last_update: f64,
    /// Chunks ordered by [`ChunkRecord::effective_index`] ascending.
    pub chunks: Vec<ChunkRecord>,
}

impl AggregatedDocument {
    /// Mean chunk size, or `None` for a document without chunks.
    pub fn average_chunk_size(&self) -> Option<u64> {
        if self.chunk_count == 0 {
            None
        } else {
            Some(self.total_size_bytes / self.chunk_count as u64)
        }
    }
}

/// Kind of destructive action awaiting confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Delete,
    ClearAll,
}

/// A destructive action captured for confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingAction {
    pub kind: ActionKind,
    /// Source to delete; always `None` for [`ActionKind::ClearAll`].
    pub target: Option<String>,
}

impl PendingAction {
    pub fn delete(source: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Delete,
            target: Some(source.into()),
        }
    }

    pub fn clear_all() -> Self {
        Self {
            kind: ActionKind::ClearAll,
            target: None,
        }
    }

    /// Confirmation prompt text for this action.
    pub fn prompt(&self) -> String {
        match (&self.kind, &self.target) {
            (ActionKind::Delete, Some(source)) => {
                format!("Remove \"{}\" and all of its chunks?", source)
            }
            (ActionKind::Delete, None) => "Remove this document?".to_string(),
            (ActionKind::ClearAll, _) => {
                "Clear ALL documents from the Rabbit Hole? This cannot be undone.".to_string()
            }
        }
    }
}
