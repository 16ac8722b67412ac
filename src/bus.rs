//! Message data model and the synchronous dispatch bus.
//!
//! Stages communicate through [`Message`]s delivered by [`MessageBus`]:
//! a named-handler registry with direct, same-stack dispatch. There is no
//! queue and no ordering guarantee beyond call-stack order; a handler may
//! itself dispatch, so the retrieval stage hands its results straight to
//! the synthesis stage within the caller's original dispatch call.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// The message kinds the pipeline sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    DocumentUpload,
    QueryRequest,
    RetrievalResult,
}

/// A single unit of communication between stages.
///
/// Immutable once constructed; consumed exactly once by the receiving
/// handler, then dropped. The `trace_id` is an opaque correlation token
/// carried unmodified through a request's whole message chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub receiver: String,
    pub kind: MessageKind,
    pub trace_id: String,
    pub payload: serde_json::Map<String, Value>,
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        kind: MessageKind,
        trace_id: impl Into<String>,
        payload: serde_json::Map<String, Value>,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            kind,
            trace_id: trace_id.into(),
            payload,
        }
    }

    /// Fetch a required string field from the payload.
    pub fn str_field(&self, key: &str) -> Result<&str> {
        self.payload
            .get(key)
            .and_then(Value::as_str)
            .with_context(|| format!("payload field {key:?} missing or not a string"))
    }

    /// Fetch a required string-array field from the payload.
    pub fn str_list_field(&self, key: &str) -> Result<Vec<String>> {
        let items = self
            .payload
            .get(key)
            .and_then(Value::as_array)
            .with_context(|| format!("payload field {key:?} missing or not an array"))?;
        items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .with_context(|| format!("payload field {key:?} contains a non-string entry"))
            })
            .collect()
    }
}

pub type Handler = Arc<dyn Fn(Message) -> Result<()> + Send + Sync>;

/// Named-handler registry with synchronous direct dispatch.
#[derive(Default)]
pub struct MessageBus {
    handlers: RwLock<HashMap<String, Handler>>,
}

impl MessageBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `handler`, silently replacing any prior binding.
    pub fn register(&self, name: impl Into<String>, handler: Handler) {
        let name = name.into();
        let mut handlers = self.handlers.write().unwrap();
        if handlers.insert(name.clone(), handler).is_some() {
            debug!(stage = %name, "Replaced existing handler registration");
        }
    }

    /// Deliver a message to its receiver's handler on the current stack.
    ///
    /// Handler errors propagate to the caller. A message addressed to an
    /// unregistered receiver is logged and dropped, the one delivery
    /// failure treated as non-fatal.
    pub fn dispatch(&self, message: Message) -> Result<()> {
        // Clone the handler out so the registry lock is released before it
        // runs; handlers may re-enter register or dispatch.
        let handler = {
            let handlers = self.handlers.read().unwrap();
            handlers.get(&message.receiver).cloned()
        };

        match handler {
            Some(handler) => {
                debug!(
                    receiver = %message.receiver,
                    kind = ?message.kind,
                    trace_id = %message.trace_id,
                    "Dispatching message"
                );
                handler(message)
            }
            None => {
                warn!(
                    receiver = %message.receiver,
                    trace_id = %message.trace_id,
                    "No handler registered, dropping message"
                );
                Ok(())
            }
        }
    }
}
