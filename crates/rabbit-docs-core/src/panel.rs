//! Info side-panel for a single document.
//!
//! The panel is independent of the action controller: it can be open while a
//! confirmation is pending. Each [`PanelController::open`] builds a fresh
//! [`PanelView`]; nothing from the previous selection survives.

use serde::Serialize;

use crate::models::AggregatedDocument;

/// Number of chunk previews shown before the "+N more" marker.
pub const DEFAULT_PREVIEW_LIMIT: usize = 5;

/// One chunk line in the panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkPreview {
    pub index: i64,
    pub size_bytes: u64,
    /// Excerpt text; empty when the backend sent none.
    pub text: String,
}

/// Content rendered inside the open panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub source: String,
    pub chunk_count: usize,
    pub total_size_bytes: u64,
    /// `None` when the document has no chunks.
    pub average_chunk_size: Option<u64>,
    pub last_update: f64,
    pub previews: Vec<ChunkPreview>,
    /// Chunks not shown in `previews`.
    pub more: usize,
}

impl PanelView {
    pub fn build(doc: &AggregatedDocument, limit: usize) -> Self {
        let previews = doc
            .chunks
            .iter()
            .take(limit)
            .map(|c| ChunkPreview {
                index: c.effective_index(),
                size_bytes: c.size_bytes,
                text: c.preview.clone().unwrap_or_default(),
            })
            .collect::<Vec<_>>();
        Self {
            source: doc.source.clone(),
            chunk_count: doc.chunk_count,
            total_size_bytes: doc.total_size_bytes,
            average_chunk_size: doc.average_chunk_size(),
            last_update: doc.last_update,
            more: doc.chunk_count.saturating_sub(previews.len()),
            previews,
        }
    }

    /// The "+N more" label, if any chunks were cut.
    pub fn more_label(&self) -> Option<String> {
        (self.more > 0).then(|| format!("+{} more", self.more))
    }
}

/// Visibility and content of the info panel.
#[derive(Debug)]
pub struct PanelController {
    limit: usize,
    view: Option<PanelView>,
}

impl PanelController {
    pub fn new(limit: usize) -> Self {
        Self { limit, view: None }
    }

    /// Open the panel for `source`, replacing any previous content.
    ///
    /// Returns `None` and leaves the panel closed if the source is unknown.
    pub fn open(&mut self, source: &str, docs: &[AggregatedDocument]) -> Option<&PanelView> {
        self.view = docs
            .iter()
            .find(|d| d.source == source)
            .map(|d| PanelView::build(d, self.limit));
        self.view.as_ref()
    }

    /// Hide the panel and drop its content.
    pub fn close(&mut self) {
        self.view = None;
    }

    /// Recompute the open panel against a new view; closes it if its
    /// document is gone.
    pub fn refresh(&mut self, docs: &[AggregatedDocument]) {
        if let Some(source) = self.view.as_ref().map(|v| v.source.clone()) {
            self.open(&source, docs);
        }
    }

    pub fn view(&self) -> Option<&PanelView> {
        self.view.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.view.is_some()
    }
}

impl Default for PanelController {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_LIMIT)
    }
}
