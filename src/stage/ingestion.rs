use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::bus::{Message, MessageBus};
use crate::chunker;
use crate::embedder::Embedder;
use crate::index::VectorIndex;
use crate::parser::{ParserTable, UnsupportedFormat};

/// Turns an uploaded document into indexed chunks.
///
/// Payload contract: `{source_ref, source_kind}`. The source kind is
/// resolved against the parser table injected at construction; an unknown
/// kind is an error, never a silent no-op. Parse, embedding and index
/// errors all propagate to the dispatching caller.
pub struct IngestionStage {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    parsers: ParserTable,
    chunk_size: usize,
}

impl IngestionStage {
    pub fn register(
        bus: &MessageBus,
        index: Arc<VectorIndex>,
        embedder: Arc<dyn Embedder>,
        parsers: ParserTable,
        chunk_size: usize,
    ) {
        let stage = Self {
            index,
            embedder,
            parsers,
            chunk_size,
        };
        bus.register(super::INGESTION, Arc::new(move |msg| stage.handle(msg)));
    }

    fn handle(&self, message: Message) -> Result<()> {
        let source_ref = message.str_field("source_ref")?;
        let source_kind = message.str_field("source_kind")?;

        let parse = self
            .parsers
            .get(source_kind)
            .ok_or_else(|| UnsupportedFormat(source_kind.to_string()))?;
        let text = parse(Path::new(source_ref))?;

        let chunks = chunker::chunk_text(&text, self.chunk_size);
        if chunks.is_empty() {
            info!(source = source_ref, "Document contains no words, nothing to index");
            return Ok(());
        }

        let chunk_refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let vectors = self.embedder.embed_batch(&chunk_refs)?;

        let count = chunks.len();
        self.index.add(vectors, chunks)?;
        info!(
            source = source_ref,
            chunks = count,
            trace_id = %message.trace_id,
            "Ingested document"
        );
        Ok(())
    }
}
