//! The document manager: one owned value holding every piece of view state.
//!
//! All mutations take `&mut self`, so there is exactly one writer and the
//! only suspension points are the awaits on the [`RemoteStore`]. Pure state
//! transitions are delegated to `rabbit_docs_core`; this module adds the
//! network calls and the notifications that report their outcome.
//!
//! Because [`refresh`](DocumentManager::refresh) holds the exclusive borrow
//! across its await, two list requests from one manager never overlap and
//! every response is applied as it arrives. The store's fetch tickets are
//! for drivers that issue reads concurrently.
//!
//! # Delete / clear flow
//!
//! ```text
//! request_delete ─▶ pending ─▶ confirm ─▶ store mutated locally
//!                                   │
//!                                   ▼
//!                            remote.remove()
//!                          ┌────────┴────────┐
//!                       success            failure
//!                     keep state     notify + refresh()
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant};

use rabbit_docs_core::action::{
    ActionController, ActionError, Execution, MutationOutcome, Settlement,
};
use rabbit_docs_core::filter::{filter_documents, Debouncer};
use rabbit_docs_core::menu::{MenuController, MenuEvent, Rect, Size};
use rabbit_docs_core::models::{AggregatedDocument, PendingAction};
use rabbit_docs_core::notify::{Notification, NotificationQueue};
use rabbit_docs_core::panel::{PanelController, PanelView};
use rabbit_docs_core::stats::LibraryStats;
use rabbit_docs_core::store::DocumentStore;
use serde_json::Value;

use crate::api::{ApiError, RemoteStore, ServerStats, UploadRequest, UploadResponse};
use crate::config::Config;

/// Text recorded when a read fails without a server-provided reason.
const LOAD_FAILED: &str = "Failed to load documents";

/// What a [`DocumentManager::refresh`] call did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The response replaced the store contents.
    Applied { chunks: usize },
    /// The backend answered with `success: false`; the view is now empty.
    Failed { message: String },
}

pub struct DocumentManager<R: RemoteStore> {
    remote: R,
    store: DocumentStore,
    debouncer: Debouncer,
    query: String,
    actions: ActionController,
    panel: PanelController,
    notifications: NotificationQueue,
    menu: MenuController,
    load_error: Option<String>,
    chunk_size: u32,
    chunk_overlap: u32,
    refetch_delay: Duration,
}

impl<R: RemoteStore> DocumentManager<R> {
    pub fn new(remote: R, config: &Config) -> Self {
        Self {
            remote,
            store: DocumentStore::new(),
            debouncer: Debouncer::new(config.ui.debounce()),
            query: String::new(),
            actions: ActionController::new(),
            panel: PanelController::new(config.ui.panel_preview_limit),
            notifications: NotificationQueue::new(config.ui.notification_ttl()),
            menu: MenuController::new(),
            load_error: None,
            chunk_size: config.upload.chunk_size,
            chunk_overlap: config.upload.chunk_overlap,
            refetch_delay: config.upload.refetch_delay(),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Fetch the full chunk list and replace the store with it.
    ///
    /// A transport or authorization failure keeps the previous contents and
    /// pushes an error notification. A `success: false` answer empties the
    /// view and records [`load_error`](Self::load_error).
    pub async fn refresh(&mut self) -> Result<RefreshOutcome, ApiError> {
        tracing::debug!("refresh started");

        let list = match self.remote.list_documents(None).await {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, "refresh failed");
                let text = if e.is_access_denied() {
                    e.user_message()
                } else {
                    format!("Could not load documents: {}", e)
                };
                self.notifications.error(text, Instant::now());
                return Err(e);
            }
        };

        if !list.success {
            let message = list
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| LOAD_FAILED.to_string());
            self.store.ingest(Vec::new());
            tracing::warn!(%message, "document list read was not successful");
            self.load_error = Some(message.clone());
            self.panel.close();
            return Ok(RefreshOutcome::Failed { message });
        }

        let chunks = list.documents.len();
        self.store.ingest(list.documents);
        self.load_error = None;
        self.panel.refresh(&self.store.aggregate());
        tracing::debug!(chunks, "refresh applied");
        Ok(RefreshOutcome::Applied { chunks })
    }

    /// The aggregated view with the settled search query applied.
    pub fn documents(&self) -> Vec<AggregatedDocument> {
        filter_documents(&self.store.aggregate(), &self.query)
    }

    /// Every document, ignoring the query.
    pub fn all_documents(&self) -> Vec<AggregatedDocument> {
        self.store.aggregate()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Local statistics over the chunks currently held.
    pub fn stats(&self) -> LibraryStats {
        LibraryStats::compute(self.store.records())
    }

    pub async fn server_stats(&mut self) -> Result<ServerStats, ApiError> {
        match self.remote.stats().await {
            Ok(stats) => Ok(stats),
            Err(e) => {
                tracing::warn!(error = %e, "server stats failed");
                self.notifications.error(e.user_message(), Instant::now());
                Err(e)
            }
        }
    }

    // ── Search ───────────────────────────────────────────────────────────

    /// Record a keystroke; the filter applies once input has been quiet for
    /// the debounce period.
    pub fn type_query(&mut self, text: impl Into<String>, now: Instant) {
        self.debouncer.input(text, now);
    }

    /// Apply the query immediately, bypassing the debounce.
    pub fn set_query(&mut self, text: impl Into<String>) {
        self.debouncer.cancel();
        self.query = text.into();
    }

    /// The query currently applied to [`documents`](Self::documents).
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Advance timers. Returns `true` when the visible state changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if let Some(query) = self.debouncer.poll(now) {
            if query != self.query {
                self.query = query;
                changed = true;
            }
        }
        if self.notifications.expire(now) > 0 {
            changed = true;
        }
        changed
    }

    /// Earliest instant at which [`tick`](Self::tick) has work to do.
    pub fn next_wakeup(&self) -> Option<Instant> {
        match (self.debouncer.deadline(), self.notifications.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ── Actions ──────────────────────────────────────────────────────────

    pub fn request_delete(&mut self, source: &str) -> Result<&PendingAction, ActionError> {
        self.menu.close();
        self.actions.request_delete(source)
    }

    pub fn request_clear(&mut self) -> Result<&PendingAction, ActionError> {
        self.menu.close();
        self.actions.request_clear()
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.actions.pending()
    }

    pub fn actions(&self) -> &ActionController {
        &self.actions
    }

    pub fn cancel(&mut self) -> Result<Option<PendingAction>, ActionError> {
        self.actions.cancel()
    }

    /// Execute the pending action: mutate locally, call the backend, then
    /// keep the local state or resync from the backend.
    pub async fn confirm(&mut self) -> Result<Settlement, ActionError> {
        let execution = self.actions.confirm(&mut self.store)?;
        self.panel.refresh(&self.store.aggregate());

        let result = match &execution {
            Execution::Delete { source } => self.remote.remove(source).await,
            Execution::ClearAll => self.remote.clear().await,
        };

        let outcome = match result {
            Ok(resp) if resp.success => {
                tracing::info!(
                    ?execution,
                    deleted_chunks = ?resp.deleted_chunks,
                    "mutation confirmed by backend"
                );
                MutationOutcome::Succeeded {
                    message: resp.message,
                }
            }
            Ok(resp) => {
                tracing::warn!(?execution, message = ?resp.message, "backend rejected mutation");
                MutationOutcome::Failed {
                    message: resp.message,
                }
            }
            Err(e) => {
                tracing::warn!(?execution, error = %e, "mutation request failed");
                MutationOutcome::Failed {
                    message: Some(e.user_message()),
                }
            }
        };

        let settlement = self
            .actions
            .finish(outcome, &mut self.notifications, Instant::now())?;

        if settlement == Settlement::Resync {
            // Failures are already reported as notifications by refresh.
            let _ = self.refresh().await;
        }
        Ok(settlement)
    }

    // ── Panel and menu ───────────────────────────────────────────────────

    pub fn open_info(&mut self, source: &str) -> Option<&PanelView> {
        self.menu.close();
        let docs = self.store.aggregate();
        self.panel.open(source, &docs)
    }

    pub fn close_info(&mut self) {
        self.panel.close();
    }

    pub fn panel(&self) -> Option<&PanelView> {
        self.panel.view()
    }

    pub fn toggle_menu(
        &mut self,
        source: &str,
        anchor: Rect,
        size: Size,
        viewport: Size,
    ) -> MenuEvent {
        self.menu.toggle(source, anchor, size, viewport)
    }

    pub fn dismiss_menu(&mut self) -> bool {
        self.menu.close()
    }

    pub fn menu(&self) -> &MenuController {
        &self.menu
    }

    pub fn menu_mut(&mut self) -> &mut MenuController {
        &mut self.menu
    }

    // ── Upload ───────────────────────────────────────────────────────────

    /// Send files to the batch ingestion endpoint, wait for the ingester to
    /// settle, then refresh.
    pub async fn upload(
        &mut self,
        files: Vec<PathBuf>,
        chunk_size: Option<u32>,
        chunk_overlap: Option<u32>,
        metadata: Value,
    ) -> Result<UploadResponse, ApiError> {
        let request = UploadRequest {
            files,
            chunk_size: chunk_size.unwrap_or(self.chunk_size),
            chunk_overlap: chunk_overlap.unwrap_or(self.chunk_overlap),
            metadata,
        };

        let response = match self.remote.upload(&request).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "upload failed");
                self.notifications
                    .error(format!("Upload failed: {}", e.user_message()), Instant::now());
                return Err(e);
            }
        };

        let count = request.files.len();
        tracing::info!(files = count, "upload accepted");
        self.notifications.success(
            format!("Uploaded {} file{}", count, if count == 1 { "" } else { "s" }),
            Instant::now(),
        );

        if !self.refetch_delay.is_zero() {
            tokio::time::sleep(self.refetch_delay).await;
        }
        let _ = self.refresh().await;
        Ok(response)
    }

    // ── Notifications ────────────────────────────────────────────────────

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn visible_notifications(&self, now: Instant) -> Vec<&Notification> {
        self.notifications.visible(now).collect()
    }
}
