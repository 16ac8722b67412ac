//! Wires the bus, index, embedder, parsers and completion provider into a
//! running pipeline and exposes the two entry points: ingest a document,
//! ask a question.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use uuid::Uuid;

use crate::answer::{AnswerHandle, AnswerMailbox};
use crate::bus::{Message, MessageBus, MessageKind};
use crate::config::Config;
use crate::embedder::{self, Embedder};
use crate::index::VectorIndex;
use crate::llm::CompletionProvider;
use crate::llm::cohere::CohereProvider;
use crate::parser::{self, ParserTable, UnsupportedFormat};
use crate::stage;
use crate::stage::ingestion::IngestionStage;
use crate::stage::retrieval::RetrievalStage;
use crate::stage::synthesis::SynthesisStage;

/// Sender name used on messages built by the entry points.
const CLIENT: &str = "client";

pub struct Pipeline {
    bus: Arc<MessageBus>,
    index: Arc<VectorIndex>,
    mailbox: Arc<AnswerMailbox>,
    answer_timeout: Duration,
}

impl Pipeline {
    /// Assemble a pipeline from explicit capabilities.
    ///
    /// The index dimension follows the embedder's. All three stages are
    /// registered on a fresh bus.
    pub fn new(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        parsers: ParserTable,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        let bus = Arc::new(MessageBus::new());
        let index = Arc::new(VectorIndex::new(embedder.dimensions()));
        let mailbox = Arc::new(AnswerMailbox::new());

        IngestionStage::register(
            &bus,
            Arc::clone(&index),
            Arc::clone(&embedder),
            parsers,
            config.chunk_size,
        );
        RetrievalStage::register(&bus, Arc::clone(&index), embedder, config.search_top_k);
        SynthesisStage::register(&bus, provider, Arc::clone(&mailbox));

        Self {
            bus,
            index,
            mailbox,
            answer_timeout: Duration::from_millis(config.answer_timeout_ms),
        }
    }

    /// Assemble a pipeline with the default capabilities: configured
    /// embedding backend, the five-format parser table, and the Cohere
    /// completion provider.
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = embedder::from_config(&config.embedding);
        let provider: Arc<dyn CompletionProvider> =
            Arc::new(CohereProvider::from_config(&config.llm)?);
        Ok(Self::new(
            config,
            embedder,
            parser::default_parsers(),
            provider,
        ))
    }

    /// Ingest a document, inferring its format from the file extension.
    pub fn ingest(&self, path: &Path) -> Result<()> {
        let kind = parser::kind_for_path(path)
            .ok_or_else(|| UnsupportedFormat(path.display().to_string()))?;
        self.ingest_as(path, &kind)
    }

    /// Ingest a document as an explicit format kind.
    pub fn ingest_as(&self, path: &Path, kind: &str) -> Result<()> {
        let mut payload = serde_json::Map::new();
        payload.insert(
            "source_ref".to_string(),
            Value::String(path.to_string_lossy().into_owned()),
        );
        payload.insert("source_kind".to_string(), Value::String(kind.to_string()));

        let message = Message::new(
            CLIENT,
            stage::INGESTION,
            MessageKind::DocumentUpload,
            Uuid::new_v4().to_string(),
            payload,
        );
        self.bus.dispatch(message)
    }

    /// Trigger retrieval + synthesis for `query` and return the handle the
    /// answer arrives on.
    ///
    /// Dispatch runs the whole chain on this stack, so on success the
    /// answer is normally already waiting in the handle. On failure the
    /// handle's registration is discarded before the error returns.
    pub fn ask(&self, query: &str) -> Result<AnswerHandle> {
        let trace_id = Uuid::new_v4().to_string();
        let handle = self.mailbox.register(&trace_id);

        let mut payload = serde_json::Map::new();
        payload.insert("query".to_string(), Value::String(query.to_string()));
        let message = Message::new(
            CLIENT,
            stage::RETRIEVAL,
            MessageKind::QueryRequest,
            trace_id.clone(),
            payload,
        );

        if let Err(e) = self.bus.dispatch(message) {
            self.mailbox.forget(&trace_id);
            return Err(e);
        }
        Ok(handle)
    }

    /// Ask and wait for the answer within the configured timeout.
    pub fn answer(&self, query: &str) -> Result<String> {
        let handle = self.ask(query)?;
        Ok(handle.wait(self.answer_timeout)?)
    }

    /// Number of chunks currently indexed.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    /// The bus the stages are registered on, for callers that construct
    /// their own messages.
    #[must_use]
    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }
}
