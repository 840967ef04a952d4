// ── Request correlation ──
//
// Assigns request ids and remembers which method each outstanding id
// belongs to, so the dispatcher can route responses. One tracker lives
// for exactly one connection; a reconnect starts a fresh one.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::CoreError;

/// Channel an awaiting caller receives the result on.
pub(crate) type Reply = oneshot::Sender<Result<Value, CoreError>>;

/// An id that has been written but not yet answered.
#[derive(Debug)]
pub struct PendingRequest {
    pub id: u64,
    pub method: String,
    reply: Option<Reply>,
}

impl PendingRequest {
    /// Hand the outcome to the awaiting caller, if there is one.
    pub(crate) fn complete(self, result: Result<Value, CoreError>) {
        if let Some(reply) = self.reply {
            // Caller gave up waiting.
            let _ = reply.send(result);
        }
    }

    pub fn is_awaited(&self) -> bool {
        self.reply.is_some()
    }
}

/// Id allocation plus the pending map for one connection.
#[derive(Debug, Default)]
pub struct RequestTracker {
    last_id: u64,
    pending: HashMap<u64, PendingRequest>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker whose next id follows `last_id`, for when the first
    /// ids of a connection were spent before the tracker took over.
    pub fn starting_after(last_id: u64) -> Self {
        Self {
            last_id,
            pending: HashMap::new(),
        }
    }

    /// Next id for this connection, starting at 1.
    pub fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    /// Remember that `id` was sent for `method`.
    pub fn track(&mut self, id: u64, method: impl Into<String>) {
        self.insert(id, method.into(), None);
    }

    pub(crate) fn track_with_reply(&mut self, id: u64, method: impl Into<String>, reply: Reply) {
        self.insert(id, method.into(), Some(reply));
    }

    /// Remove and return the request for `id`. Unknown or already
    /// resolved ids yield `None`.
    pub fn resolve(&mut self, id: u64) -> Option<PendingRequest> {
        self.pending.remove(&id)
    }

    /// Discard every pending request, failing awaiting callers with
    /// `Disconnected`. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        for (_, request) in self.pending.drain() {
            request.complete(Err(CoreError::Disconnected));
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn insert(&mut self, id: u64, method: String, reply: Option<Reply>) {
        self.pending.insert(id, PendingRequest { id, method, reply });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut tracker = RequestTracker::new();
        assert_eq!(tracker.next_id(), 1);
        assert_eq!(tracker.next_id(), 2);
        assert_eq!(tracker.next_id(), 3);
    }

    #[test]
    fn starting_after_continues_the_sequence() {
        let mut tracker = RequestTracker::starting_after(1);
        assert_eq!(tracker.next_id(), 2);
    }

    #[test]
    fn resolve_removes_the_entry() {
        let mut tracker = RequestTracker::new();
        let id = tracker.next_id();
        tracker.track(id, "property.get");

        let request = tracker.resolve(id).unwrap();
        assert_eq!(request.method, "property.get");
        assert!(!request.is_awaited());
        assert!(tracker.resolve(id).is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn unknown_id_resolves_to_none() {
        let mut tracker = RequestTracker::new();
        assert!(tracker.resolve(42).is_none());
    }

    #[tokio::test]
    async fn clear_fails_awaiting_callers() {
        let mut tracker = RequestTracker::new();
        let (tx, rx) = oneshot::channel();
        tracker.track_with_reply(1, "system.poweron", tx);
        tracker.track(2, "property.get");

        assert_eq!(tracker.clear(), 2);
        assert!(tracker.is_empty());
        assert!(matches!(rx.await.unwrap(), Err(CoreError::Disconnected)));
    }

    #[tokio::test]
    async fn complete_delivers_result() {
        let mut tracker = RequestTracker::new();
        let (tx, rx) = oneshot::channel();
        tracker.track_with_reply(7, "property.get", tx);

        let request = tracker.resolve(7).unwrap();
        assert!(request.is_awaited());
        request.complete(Ok(serde_json::json!({"system.state": "on"})));
        assert_eq!(rx.await.unwrap().unwrap()["system.state"], "on");
    }
}
