//! Whole-library summary computed from the chunk list.

use serde::{Deserialize, Serialize};

use crate::models::ChunkRecord;

/// Chunks shorter than this count as small.
pub const SMALL_CHUNK_LIMIT: u64 = 500;
/// Chunks shorter than this (and not small) count as medium.
pub const MEDIUM_CHUNK_LIMIT: u64 = 2000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeDistribution {
    pub small: usize,
    pub medium: usize,
    pub large: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryStats {
    pub total_documents: usize,
    pub total_chunks: usize,
    pub total_characters: u64,
    pub average_chunk_size: Option<u64>,
    pub chunk_size_distribution: SizeDistribution,
    /// Rough in-memory footprint: two bytes per character.
    pub estimated_memory_mb: f64,
    pub first_update: Option<f64>,
    pub last_update: Option<f64>,
}

impl LibraryStats {
    pub fn compute(records: &[ChunkRecord]) -> Self {
        let mut sources: Vec<&str> = records.iter().map(|r| r.source.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();

        let mut distribution = SizeDistribution::default();
        for r in records {
            if r.size_bytes < SMALL_CHUNK_LIMIT {
                distribution.small += 1;
            } else if r.size_bytes < MEDIUM_CHUNK_LIMIT {
                distribution.medium += 1;
            } else {
                distribution.large += 1;
            }
        }

        let total_characters: u64 = records.iter().map(|r| r.size_bytes).sum();
        let total_chunks = records.len();
        let mb = (total_characters as f64 * 2.0) / (1024.0 * 1024.0);

        Self {
            total_documents: sources.len(),
            total_chunks,
            total_characters,
            average_chunk_size: (total_chunks > 0).then(|| total_characters / total_chunks as u64),
            chunk_size_distribution: distribution,
            estimated_memory_mb: (mb * 100.0).round() / 100.0,
            first_update: records.iter().map(|r| r.observed_at).reduce(f64::min),
            last_update: records.iter().map(|r| r.observed_at).reduce(f64::max),
        }
    }
}
