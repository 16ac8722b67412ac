//! Request/response handoff between a caller and the synthesis stage.
//!
//! Dispatch never returns a value, so the caller that triggers retrieval
//! needs somewhere to receive the eventual answer. Each request registers
//! a rendezvous channel under its trace ID before dispatching; the
//! synthesis stage delivers the answer to that trace ID when it finishes.
//! Waiting is bounded: the handle resolves with the answer or a timeout
//! error, never with silent fallback text.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum AnswerError {
    #[error("no answer arrived within {0:?}")]
    Timeout(Duration),
}

/// Pending answer channels, keyed by trace ID.
#[derive(Default)]
pub struct AnswerMailbox {
    pending: Mutex<HashMap<String, SyncSender<String>>>,
}

impl AnswerMailbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `trace_id` and return its handle.
    ///
    /// A second registration under the same trace ID replaces the first;
    /// the abandoned handle will then time out.
    pub fn register(&self, trace_id: &str) -> AnswerHandle {
        // Buffer of one: delivery must not block even if the caller has
        // not started waiting yet.
        let (tx, rx) = sync_channel(1);
        self.pending
            .lock()
            .unwrap()
            .insert(trace_id.to_string(), tx);
        AnswerHandle { rx }
    }

    /// Deliver an answer to the waiter registered under `trace_id`.
    ///
    /// Delivery without a registered waiter, or to a handle the caller has
    /// already dropped, is logged and discarded.
    pub fn deliver(&self, trace_id: &str, answer: String) {
        let sender = self.pending.lock().unwrap().remove(trace_id);
        match sender {
            Some(tx) => {
                if tx.try_send(answer).is_err() {
                    debug!(trace_id, "Answer waiter gone, discarding answer");
                }
            }
            None => warn!(trace_id, "No waiter registered, discarding answer"),
        }
    }

    /// Discard a registration whose request failed before synthesis ran.
    pub fn forget(&self, trace_id: &str) {
        self.pending.lock().unwrap().remove(trace_id);
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

/// The receiving end of one answer channel.
pub struct AnswerHandle {
    rx: Receiver<String>,
}

impl AnswerHandle {
    /// Block until the answer arrives or `timeout` elapses.
    pub fn wait(self, timeout: Duration) -> Result<String, AnswerError> {
        self.rx
            .recv_timeout(timeout)
            .map_err(|_| AnswerError::Timeout(timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deliver_then_wait() {
        let mailbox = AnswerMailbox::new();
        let handle = mailbox.register("t-1");
        // Synchronous pipeline: delivery happens before the caller waits.
        mailbox.deliver("t-1", "forty-two".to_string());
        let answer = handle.wait(Duration::from_millis(10)).unwrap();
        assert_eq!(answer, "forty-two");
        assert_eq!(mailbox.pending_count(), 0);
    }

    #[test]
    fn test_wait_times_out() {
        let mailbox = AnswerMailbox::new();
        let handle = mailbox.register("t-2");
        let err = handle.wait(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, AnswerError::Timeout(_)));
    }

    #[test]
    fn test_deliver_without_waiter_is_dropped() {
        let mailbox = AnswerMailbox::new();
        // Must not panic or block.
        mailbox.deliver("unknown", "orphaned".to_string());
    }

    #[test]
    fn test_deliver_to_dropped_handle_is_dropped() {
        let mailbox = AnswerMailbox::new();
        let handle = mailbox.register("t-3");
        drop(handle);
        mailbox.deliver("t-3", "too late".to_string());
        assert_eq!(mailbox.pending_count(), 0);
    }

    #[test]
    fn test_forget_removes_registration() {
        let mailbox = AnswerMailbox::new();
        let _handle = mailbox.register("t-4");
        mailbox.forget("t-4");
        assert_eq!(mailbox.pending_count(), 0);
    }

    #[test]
    fn test_traces_are_independent() {
        let mailbox = AnswerMailbox::new();
        let h1 = mailbox.register("t-5");
        let h2 = mailbox.register("t-6");
        mailbox.deliver("t-6", "second".to_string());
        mailbox.deliver("t-5", "first".to_string());
        assert_eq!(h1.wait(Duration::from_millis(10)).unwrap(), "first");
        assert_eq!(h2.wait(Duration::from_millis(10)).unwrap(), "second");
    }
}
