use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::bus::{Message, MessageBus, MessageKind};
use crate::embedder::Embedder;
use crate::index::VectorIndex;

/// Answers a `QueryRequest` by finding the nearest chunks and forwarding
/// them to the synthesis stage.
///
/// Payload contract: `{query}`. The query is embedded as its own
/// single-element batch, the index searched for the top-k chunks, and a
/// `RetrievalResult` carrying `{retrieved_context, query}` is dispatched
/// to the synthesis stage on the same bus, same stack, with the original
/// trace ID. Embedding and index errors (including a query against an
/// empty index) propagate to the dispatching caller.
pub struct RetrievalStage {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl RetrievalStage {
    pub fn register(
        bus: &Arc<MessageBus>,
        index: Arc<VectorIndex>,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
    ) {
        let stage = Self {
            index,
            embedder,
            top_k,
        };
        let bus_handle = Arc::clone(bus);
        bus.register(
            super::RETRIEVAL,
            Arc::new(move |msg| stage.handle(&bus_handle, msg)),
        );
    }

    fn handle(&self, bus: &MessageBus, message: Message) -> Result<()> {
        let query = message.str_field("query")?;

        let mut vectors = self.embedder.embed_batch(&[query])?;
        let query_vector = vectors
            .pop()
            .context("embedder returned no vector for the query")?;

        let hits = self.index.search(&query_vector, self.top_k)?;
        debug!(
            trace_id = %message.trace_id,
            hits = hits.len(),
            "Retrieved context for query"
        );

        let mut payload = serde_json::Map::new();
        payload.insert("retrieved_context".to_string(), serde_json::json!(hits));
        payload.insert("query".to_string(), Value::String(query.to_string()));

        let result = Message::new(
            super::RETRIEVAL,
            super::SYNTHESIS,
            MessageKind::RetrievalResult,
            message.trace_id.clone(),
            payload,
        );
        bus.dispatch(result)
    }
}
