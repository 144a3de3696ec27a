//! # Rabbit Docs
//!
//! A client for managing the documents stored in a Rabbit Hole chunk store.
//!
//! The backend only knows about chunks. Rabbit Docs fetches the chunk list,
//! groups it into one entry per source document, lets the user search that
//! view, inspect a document's chunks, and delete one document or the whole
//! library. Deletes are applied locally first and reconciled with the
//! backend afterwards.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────────┐   ┌──────────────────┐
//! │ HttpGateway  │──▶│ DocumentManager │──▶│ render / rdocs   │
//! │  (reqwest)   │◀──│  (owned state)  │   │     CLI          │
//! └──────────────┘   └────────┬────────┘   └──────────────────┘
//!                             │
//!                             ▼
//!                  ┌──────────────────────┐
//!                  │  rabbit-docs-core    │
//!                  │ store, filter, panel │
//!                  │ actions, menu, notify│
//!                  └──────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rdocs list                      # aggregated documents, newest first
//! rdocs list --filter report      # case-insensitive source filter
//! rdocs info report.pdf           # chunk previews for one document
//! rdocs remove report.pdf         # asks for confirmation
//! rdocs clear --yes               # remove everything
//! rdocs upload notes.md plan.pdf  # batch ingest, then re-list
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`api`] | Remote store trait and HTTP gateway |
//! | [`manager`] | Owned view state and its async operations |
//! | [`theme`] | Light/dark theme resolution |
//! | [`render`] | Terminal output |

pub mod api;
pub mod config;
pub mod manager;
pub mod render;
pub mod theme;

pub use api::{ApiError, HttpGateway, RemoteStore};
pub use manager::{DocumentManager, RefreshOutcome};
