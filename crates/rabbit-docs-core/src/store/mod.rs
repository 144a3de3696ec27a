//! The authoritative chunk list and its aggregated per-source view.
//!
//! [`DocumentStore`] owns every [`ChunkRecord`] received from the backend.
//! The list is only ever replaced wholesale ([`DocumentStore::ingest`]) or
//! cut down by the two optimistic mutations ([`DocumentStore::remove_source`]
//! and [`DocumentStore::reset`]). The per-source view is recomputed from the
//! full list on every call to [`DocumentStore::aggregate`]; nothing is
//! patched incrementally, so the view cannot drift from the list.
//!
//! # Fetch ordering
//!
//! Every refresh takes a [`FetchTicket`] before it goes to the network. A
//! response is applied only when its ticket is the most recently issued one
//! and no other replacement or optimistic mutation happened since it was
//! issued:
//!
//! | Sequence | Result |
//! |----------|--------|
//! | fetch A, fetch B, B resolves, A resolves | B applied, A dropped |
//! | fetch A, delete `x`, A resolves | A dropped (would resurrect `x`) |
//! | delete `x` fails, fetch C, C resolves | C applied |

mod aggregate;

pub use aggregate::aggregate;

use crate::models::{AggregatedDocument, ChunkRecord};

/// Proof that a fetch was issued at a given generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Holds the full chunk list. Single owner, single writer.
#[derive(Debug, Default)]
pub struct DocumentStore {
    records: Vec<ChunkRecord>,
    issued: u64,
    invalidated_through: u64,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire chunk list. Outstanding fetch tickets become stale.
    pub fn ingest(&mut self, records: Vec<ChunkRecord>) {
        self.records = records;
        self.invalidated_through = self.issued;
    }

    /// Issue a ticket for a fetch that is about to start.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        FetchTicket {
            generation: self.issued,
        }
    }

    /// Whether a response carrying `ticket` would still be applied.
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.generation == self.issued && ticket.generation > self.invalidated_through
    }

    /// Apply a fetched list if `ticket` is still current.
    ///
    /// Returns `false` (and leaves the store untouched) for stale responses.
    pub fn ingest_fetched(&mut self, ticket: FetchTicket, records: Vec<ChunkRecord>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.ingest(records);
        true
    }

    /// Optimistically excise every chunk of `source` and return the new view.
    ///
    /// Applied before the backend confirms the deletion; outstanding fetch
    /// tickets are invalidated so an older response cannot bring it back.
    pub fn remove_source(&mut self, source: &str) -> Vec<AggregatedDocument> {
        self.records.retain(|r| r.source != source);
        self.invalidated_through = self.issued;
        self.aggregate()
    }

    /// Empty the list.
    pub fn reset(&mut self) {
        self.records.clear();
        self.invalidated_through = self.issued;
    }

    /// Group the current list by source, most recently updated first.
    pub fn aggregate(&self) -> Vec<AggregatedDocument> {
        aggregate(&self.records)
    }

    /// Aggregated view of a single source.
    pub fn document(&self, source: &str) -> Option<AggregatedDocument> {
        let chunks: Vec<ChunkRecord> = self
            .records
            .iter()
            .filter(|r| r.source == source)
            .cloned()
            .collect();
        aggregate(&chunks).into_iter().next()
    }

    pub fn contains_source(&self, source: &str) -> bool {
        self.records.iter().any(|r| r.source == source)
    }

    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
