//! Confirmation and optimistic-mutation state machine for delete/clear.
//!
//! ```text
//!            request_*            confirm              finish
//!   Idle ───────────────▶ Pending ───────▶ Executing ───────▶ Idle
//!     ▲                     │
//!     └──── cancel ─────────┘
//! ```
//!
//! The state enum carries the [`PendingAction`], so there is never more than
//! one. Requests made while a confirmation is open or a mutation is in flight
//! are rejected with [`ActionError::Busy`] instead of being queued.
//!
//! `confirm` applies the optimistic mutation to the store before the caller
//! contacts the backend. `finish` either keeps that state (success) or asks
//! the caller for a full resync (failure); local edits are never undone by
//! hand.

use std::time::Instant;

use thiserror::Error;

use crate::models::{ActionKind, PendingAction};
use crate::notify::NotificationQueue;
use crate::store::DocumentStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionState {
    Idle,
    Pending(PendingAction),
    Executing(PendingAction),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("another action is already awaiting confirmation or running")]
    Busy,
    #[error("the current action is already running and can no longer be cancelled")]
    Executing,
    #[error("no action is awaiting confirmation")]
    NothingPending,
    #[error("no action is running")]
    NotExecuting,
    #[error("the pending delete has no document to remove")]
    MissingTarget,
}

/// The remote call a confirmed action requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    Delete { source: String },
    ClearAll,
}

/// Result of the remote call, as reported by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Backend confirmed; `message` is its optional response text.
    Succeeded { message: Option<String> },
    /// Backend rejected the mutation or could not be reached.
    Failed { message: Option<String> },
}

/// What the caller must do after [`ActionController::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Optimistic state stands.
    Retain,
    /// Discard local state and re-fetch the authoritative list.
    Resync,
}

#[derive(Debug)]
pub struct ActionController {
    state: ActionState,
}

impl ActionController {
    pub fn new() -> Self {
        Self {
            state: ActionState::Idle,
        }
    }

    pub fn state(&self) -> &ActionState {
        &self.state
    }

    /// The action awaiting confirmation, if any.
    pub fn pending(&self) -> Option<&PendingAction> {
        match &self.state {
            ActionState::Pending(action) => Some(action),
            _ => None,
        }
    }

    pub fn is_executing(&self) -> bool {
        matches!(self.state, ActionState::Executing(_))
    }

    pub fn is_busy(&self) -> bool {
        !matches!(self.state, ActionState::Idle)
    }

    pub fn request_delete(
        &mut self,
        source: impl Into<String>,
    ) -> Result<&PendingAction, ActionError> {
        self.request(PendingAction::delete(source))
    }

    pub fn request_clear(&mut self) -> Result<&PendingAction, ActionError> {
        self.request(PendingAction::clear_all())
    }

    fn request(&mut self, action: PendingAction) -> Result<&PendingAction, ActionError> {
        if self.is_busy() {
            return Err(ActionError::Busy);
        }
        self.state = ActionState::Pending(action);
        self.pending().ok_or(ActionError::NothingPending)
    }

    /// Discard the pending action (cancel button, outside click, escape).
    ///
    /// Returns `Ok(None)` when nothing was pending.
    pub fn cancel(&mut self) -> Result<Option<PendingAction>, ActionError> {
        match std::mem::replace(&mut self.state, ActionState::Idle) {
            ActionState::Pending(action) => Ok(Some(action)),
            ActionState::Idle => Ok(None),
            executing @ ActionState::Executing(_) => {
                self.state = executing;
                Err(ActionError::Executing)
            }
        }
    }

    /// Move the pending action to `Executing` and apply it optimistically.
    ///
    /// On error the state and the store are left as they were.
    pub fn confirm(&mut self, store: &mut DocumentStore) -> Result<Execution, ActionError> {
        let execution = match &self.state {
            ActionState::Pending(action) => match (action.kind, &action.target) {
                (ActionKind::Delete, Some(source)) => Execution::Delete {
                    source: source.clone(),
                },
                (ActionKind::Delete, None) => return Err(ActionError::MissingTarget),
                (ActionKind::ClearAll, _) => Execution::ClearAll,
            },
            ActionState::Idle => return Err(ActionError::NothingPending),
            ActionState::Executing(_) => return Err(ActionError::Busy),
        };

        match &execution {
            Execution::Delete { source } => {
                store.remove_source(source);
            }
            Execution::ClearAll => store.reset(),
        }

        let previous = std::mem::replace(&mut self.state, ActionState::Idle);
        if let ActionState::Pending(action) = previous {
            self.state = ActionState::Executing(action);
        }
        Ok(execution)
    }

    /// Settle the running action and enqueue the user-facing notification.
    pub fn finish(
        &mut self,
        outcome: MutationOutcome,
        notifications: &mut NotificationQueue,
        now: Instant,
    ) -> Result<Settlement, ActionError> {
        let action = match std::mem::replace(&mut self.state, ActionState::Idle) {
            ActionState::Executing(action) => action,
            other => {
                self.state = other;
                return Err(ActionError::NotExecuting);
            }
        };

        match outcome {
            MutationOutcome::Succeeded { message } => {
                let text = message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| success_text(&action));
                notifications.success(text, now);
                Ok(Settlement::Retain)
            }
            MutationOutcome::Failed { message } => {
                let text = match message.filter(|m| !m.trim().is_empty()) {
                    Some(m) => format!("{}: {}", failure_text(&action), m),
                    None => failure_text(&action),
                };
                notifications.error(text, now);
                Ok(Settlement::Resync)
            }
        }
    }
}

impl Default for ActionController {
    fn default() -> Self {
        Self::new()
    }
}

fn success_text(action: &PendingAction) -> String {
    match (&action.kind, &action.target) {
        (ActionKind::Delete, Some(source)) => format!("Removed \"{}\"", source),
        (ActionKind::Delete, None) => "Document removed".to_string(),
        (ActionKind::ClearAll, _) => "All documents cleared".to_string(),
    }
}

fn failure_text(action: &PendingAction) -> String {
    match (&action.kind, &action.target) {
        (ActionKind::Delete, Some(source)) => format!("Could not remove \"{}\"", source),
        (ActionKind::Delete, None) => "Could not remove document".to_string(),
        (ActionKind::ClearAll, _) => "Could not clear documents".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkRecord;
    use crate::notify::NotificationKind;

    fn store() -> DocumentStore {
        let mut store = DocumentStore::new();
        store.ingest(vec![
            ChunkRecord::new("a.pdf", 100),
            ChunkRecord::new("a.pdf", 200),
            ChunkRecord::new("b.txt", 50),
        ]);
        store
    }

    #[test]
    fn request_then_cancel_has_no_side_effect() {
        let mut store = store();
        let mut actions = ActionController::new();
        actions.request_delete("a.pdf").unwrap();
        assert!(actions.pending().is_some());

        let discarded = actions.cancel().unwrap();
        assert_eq!(discarded, Some(PendingAction::delete("a.pdf")));
        assert_eq!(actions.state(), &ActionState::Idle);
        assert_eq!(store.aggregate().len(), 2);
        assert_eq!(actions.confirm(&mut store), Err(ActionError::NothingPending));
    }

    #[test]
    fn cancel_when_idle_is_noop() {
        let mut actions = ActionController::new();
        assert_eq!(actions.cancel(), Ok(None));
    }

    #[test]
    fn confirm_delete_is_optimistic() {
        let mut store = store();
        let mut actions = ActionController::new();
        actions.request_delete("a.pdf").unwrap();

        let execution = actions.confirm(&mut store).unwrap();
        assert_eq!(
            execution,
            Execution::Delete {
                source: "a.pdf".into()
            }
        );
        assert!(actions.is_executing());
        let docs = store.aggregate();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "b.txt");
    }

    #[test]
    fn confirm_clear_empties_store() {
        let mut store = store();
        let mut actions = ActionController::new();
        actions.request_clear().unwrap();
        assert_eq!(actions.confirm(&mut store), Ok(Execution::ClearAll));
        assert!(store.is_empty());
    }

    #[test]
    fn success_retains_and_notifies() {
        let now = Instant::now();
        let mut store = store();
        let mut notes = NotificationQueue::default();
        let mut actions = ActionController::new();
        actions.request_delete("a.pdf").unwrap();
        actions.confirm(&mut store).unwrap();

        let settlement = actions
            .finish(
                MutationOutcome::Succeeded {
                    message: Some("Removed 2 chunks".into()),
                },
                &mut notes,
                now,
            )
            .unwrap();
        assert_eq!(settlement, Settlement::Retain);
        assert_eq!(actions.state(), &ActionState::Idle);
        assert_eq!(store.aggregate().len(), 1);

        let note = &notes.entries()[0];
        assert_eq!(note.kind, NotificationKind::Success);
        assert_eq!(note.message, "Removed 2 chunks");
    }

    #[test]
    fn failure_requests_resync_with_server_message() {
        let now = Instant::now();
        let mut store = store();
        let mut notes = NotificationQueue::default();
        let mut actions = ActionController::new();
        actions.request_delete("a.pdf").unwrap();
        actions.confirm(&mut store).unwrap();

        let settlement = actions
            .finish(
                MutationOutcome::Failed {
                    message: Some("Document 'a.pdf' not found".into()),
                },
                &mut notes,
                now,
            )
            .unwrap();
        assert_eq!(settlement, Settlement::Resync);
        let note = &notes.entries()[0];
        assert_eq!(note.kind, NotificationKind::Error);
        assert!(note.message.contains("Document 'a.pdf' not found"));
    }

    #[test]
    fn failure_without_message_uses_default_text() {
        let mut notes = NotificationQueue::default();
        let mut actions = ActionController::new();
        actions.request_clear().unwrap();
        actions.confirm(&mut DocumentStore::new()).unwrap();
        actions
            .finish(MutationOutcome::Failed { message: None }, &mut notes, Instant::now())
            .unwrap();
        assert_eq!(notes.entries()[0].message, "Could not clear documents");
    }

    #[test]
    fn second_request_while_pending_is_rejected() {
        let mut actions = ActionController::new();
        actions.request_delete("a.pdf").unwrap();
        assert_eq!(actions.request_clear().unwrap_err(), ActionError::Busy);
        assert_eq!(actions.pending(), Some(&PendingAction::delete("a.pdf")));
    }

    #[test]
    fn requests_while_executing_are_rejected() {
        let mut store = store();
        let mut actions = ActionController::new();
        actions.request_delete("a.pdf").unwrap();
        actions.confirm(&mut store).unwrap();

        assert_eq!(actions.request_delete("b.txt").unwrap_err(), ActionError::Busy);
        assert_eq!(actions.request_clear().unwrap_err(), ActionError::Busy);
        assert_eq!(actions.cancel(), Err(ActionError::Executing));
        assert_eq!(actions.confirm(&mut store), Err(ActionError::Busy));
        assert_eq!(
            actions.state(),
            &ActionState::Executing(PendingAction::delete("a.pdf"))
        );
        // Nothing else was removed by the rejected calls.
        assert!(store.contains_source("b.txt"));
    }

    #[test]
    fn delete_without_target_stays_pending() {
        let mut store = store();
        let orphan = PendingAction {
            kind: ActionKind::Delete,
            target: None,
        };
        let mut actions = ActionController {
            state: ActionState::Pending(orphan.clone()),
        };

        assert_eq!(actions.confirm(&mut store), Err(ActionError::MissingTarget));
        assert_eq!(actions.state(), &ActionState::Pending(orphan));
        assert_eq!(store.len(), 3);
        assert_eq!(actions.cancel().unwrap().map(|a| a.kind), Some(ActionKind::Delete));
    }

    #[test]
    fn finish_requires_execution() {
        let mut notes = NotificationQueue::default();
        let mut actions = ActionController::new();
        actions.request_clear().unwrap();
        let result = actions.finish(
            MutationOutcome::Succeeded { message: None },
            &mut notes,
            Instant::now(),
        );
        assert_eq!(result, Err(ActionError::NotExecuting));
        assert!(actions.pending().is_some());
        assert!(notes.is_empty());
    }

    #[test]
    fn controller_is_reusable_after_finish() {
        let mut store = store();
        let mut notes = NotificationQueue::default();
        let mut actions = ActionController::new();
        actions.request_delete("a.pdf").unwrap();
        actions.confirm(&mut store).unwrap();
        actions
            .finish(MutationOutcome::Succeeded { message: None }, &mut notes, Instant::now())
            .unwrap();
        assert!(actions.request_delete("b.txt").is_ok());
        assert_eq!(notes.entries()[0].message, "Removed \"a.pdf\"");
    }
}
