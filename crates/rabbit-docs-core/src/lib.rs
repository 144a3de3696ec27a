//! # Rabbit Docs Core
//!
//! Pure state for the rabbit-docs document manager: chunk models, the
//! document store and its aggregated view, the debounced search filter,
//! library statistics, and the notification, panel, action and floating-menu
//! state machines.
//!
//! This crate contains no tokio, HTTP client, filesystem I/O, or rendering.
//! Time is passed in explicitly as [`std::time::Instant`] values so every
//! state transition can be driven deterministically from tests.

pub mod action;
pub mod filter;
pub mod menu;
pub mod models;
pub mod notify;
pub mod panel;
pub mod stats;
pub mod store;

pub use action::{
    ActionController, ActionError, ActionState, Execution, MutationOutcome, Settlement,
};
pub use filter::{filter_documents, Debouncer};
pub use menu::MenuController;
pub use models::{ActionKind, AggregatedDocument, ChunkRecord, PendingAction};
pub use notify::{NotificationKind, NotificationQueue};
pub use panel::{PanelController, PanelView};
pub use stats::LibraryStats;
pub use store::{DocumentStore, FetchTicket};
