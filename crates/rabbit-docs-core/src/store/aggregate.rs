//! Grouping of chunk records into per-source documents.
//!
//! 1. Group records by `source`.
//! 2. Per group: count, sum sizes, take the max `observed_at`.
//! 3. Order chunks by index ascending (absent index = 0, stable).
//! 4. Order documents by `last_update` descending, then `source` ascending.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{AggregatedDocument, ChunkRecord};

/// Aggregate `records` into one [`AggregatedDocument`] per distinct source.
pub fn aggregate(records: &[ChunkRecord]) -> Vec<AggregatedDocument> {
    let mut groups: HashMap<&str, Vec<&ChunkRecord>> = HashMap::new();
    for record in records {
        groups.entry(record.source.as_str()).or_default().push(record);
    }

    let mut docs: Vec<AggregatedDocument> = groups
        .into_iter()
        .map(|(source, members)| {
            let mut chunks: Vec<ChunkRecord> = members.into_iter().cloned().collect();
            chunks.sort_by_key(|c| c.effective_index());
            AggregatedDocument {
                source: source.to_string(),
                chunk_count: chunks.len(),
                total_size_bytes: chunks.iter().map(|c| c.size_bytes).sum(),
                last_update: chunks
                    .iter()
                    .map(|c| c.observed_at)
                    .fold(f64::NEG_INFINITY, f64::max),
                chunks,
            }
        })
        .collect();

    docs.sort_by(by_recency);
    docs
}

fn by_recency(a: &AggregatedDocument, b: &AggregatedDocument) -> Ordering {
    b.last_update
        .total_cmp(&a.last_update)
        .then_with(|| a.source.cmp(&b.source))
}
