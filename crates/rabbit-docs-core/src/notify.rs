//! Transient success/error notifications.
//!
//! Every pushed message gets its own entry, even when an identical one is
//! already visible. Entries expire a fixed time after insertion whether or
//! not anyone looked at them.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Lifetime of a notification.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

/// Opaque handle returned by [`NotificationQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
    pub expires_at: Instant,
}

/// Ordered stack of visible notifications.
#[derive(Debug)]
pub struct NotificationQueue {
    ttl: Duration,
    next_id: u64,
    entries: Vec<Notification>,
}

impl NotificationQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Append a message; it expires `ttl` after `now`.
    pub fn push(
        &mut self,
        message: impl Into<String>,
        kind: NotificationKind,
        now: Instant,
    ) -> NotificationId {
        let id = NotificationId(self.next_id);
        self.next_id += 1;
        self.entries.push(Notification {
            id,
            kind,
            message: message.into(),
            expires_at: now + self.ttl,
        });
        id
    }

    pub fn success(&mut self, message: impl Into<String>, now: Instant) -> NotificationId {
        self.push(message, NotificationKind::Success, now)
    }

    pub fn error(&mut self, message: impl Into<String>, now: Instant) -> NotificationId {
        self.push(message, NotificationKind::Error, now)
    }

    /// Remove expired entries. Returns how many were dropped.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|n| n.expires_at > now);
        before - self.entries.len()
    }

    /// Remove one entry ahead of its timeout.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        before != self.entries.len()
    }

    /// Entries still alive at `now`, oldest first.
    pub fn visible(&self, now: Instant) -> impl Iterator<Item = &Notification> {
        self.entries.iter().filter(move |n| n.expires_at > now)
    }

    /// Every entry not yet removed, oldest first.
    pub fn entries(&self) -> &[Notification] {
        &self.entries
    }

    /// Earliest pending expiry, for scheduling the next wakeup.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|n| n.expires_at).min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(NOTIFICATION_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_kept() {
        let now = Instant::now();
        let mut queue = NotificationQueue::default();
        queue.error("network down", now);
        queue.error("network down", now);
        assert_eq!(queue.visible(now).count(), 2);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let now = Instant::now();
        let mut queue = NotificationQueue::default();
        queue.success("first", now);
        queue.success("second", now + Duration::from_secs(3));

        assert_eq!(queue.expire(now + Duration::from_millis(4_999)), 0);
        assert_eq!(queue.expire(now + Duration::from_secs(5)), 1);
        let left: Vec<&str> = queue.entries().iter().map(|n| n.message.as_str()).collect();
        assert_eq!(left, vec!["second"]);

        assert_eq!(queue.expire(now + Duration::from_secs(8)), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn visible_hides_due_entries_before_expire_runs() {
        let now = Instant::now();
        let mut queue = NotificationQueue::new(Duration::from_secs(1));
        queue.success("ok", now);
        assert_eq!(queue.visible(now + Duration::from_secs(2)).count(), 0);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn dismiss_removes_one() {
        let now = Instant::now();
        let mut queue = NotificationQueue::default();
        let a = queue.success("a", now);
        queue.success("b", now);
        assert!(queue.dismiss(a));
        assert!(!queue.dismiss(a));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn next_deadline_is_oldest_expiry() {
        let now = Instant::now();
        let mut queue = NotificationQueue::default();
        assert_eq!(queue.next_deadline(), None);
        queue.error("x", now);
        queue.error("y", now + Duration::from_secs(1));
        assert_eq!(queue.next_deadline(), Some(now + NOTIFICATION_TTL));
    }
}
