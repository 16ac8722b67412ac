/// End-to-end integration tests for the ragpipe pipeline.
///
/// Tests the complete flow:
///   Config → Parsers → Chunker → Embedder → VectorIndex → Bus → Answer
use std::fs;
use std::sync::{Arc, Mutex};

use ragpipe::bus::{Message, MessageKind};
use ragpipe::config::Config;
use ragpipe::embedder::tfidf::TfidfEmbedder;
use ragpipe::llm::{CompletionError, CompletionProvider};
use ragpipe::parser;
use ragpipe::pipeline::Pipeline;
use ragpipe::stage::synthesis::NO_GENERATION_FALLBACK;
use tempfile::tempdir;

/// Completion provider that records prompts and replies with a canned
/// answer, or simulates an empty generation.
struct CannedProvider {
    answer: Option<&'static str>,
    prompts: Mutex<Vec<String>>,
}

impl CannedProvider {
    fn answering(answer: &'static str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(answer),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn empty() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

impl CompletionProvider for CannedProvider {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.answer {
            Some(answer) => Ok(answer.to_string()),
            None => Err(CompletionError::NoGeneration),
        }
    }
}

fn small_config() -> Config {
    let mut config = Config::default();
    config.chunk_size = 2;
    config.search_top_k = 1;
    config.embedding.dimensions = 16;
    config
}

fn pipeline_with(config: &Config, provider: Arc<CannedProvider>) -> Pipeline {
    Pipeline::new(
        config,
        Arc::new(TfidfEmbedder::new(config.embedding.dimensions)),
        parser::default_parsers(),
        provider,
    )
}

/// Full flow: ingest a txt document at chunk size 2, ask about "alpha",
/// and check the nearest chunk fed the prompt.
#[test]
fn test_full_pipeline() {
    let temp_dir = tempdir().unwrap();
    let doc = temp_dir.path().join("letters.txt");
    fs::write(&doc, "alpha beta gamma delta").unwrap();

    let config = small_config();
    let provider = CannedProvider::answering("Alpha comes first.");
    let pipeline = pipeline_with(&config, Arc::clone(&provider));

    pipeline.ingest(&doc).unwrap();
    assert_eq!(
        pipeline.chunk_count(),
        2,
        "two words per chunk should yield two chunks"
    );

    let answer = pipeline.answer("alpha").unwrap();
    assert_eq!(answer, "Alpha comes first.");

    let prompts = provider.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(
        prompts[0].contains("alpha beta"),
        "nearest chunk should be in the prompt: {}",
        prompts[0]
    );
    assert!(
        !prompts[0].contains("gamma delta"),
        "with top_k=1 only the nearest chunk belongs in the prompt: {}",
        prompts[0]
    );
    assert!(prompts[0].ends_with("Question: alpha"));
}

/// Ingesting multiple formats accumulates chunks in insertion order.
#[test]
fn test_multi_document_ingest() {
    let temp_dir = tempdir().unwrap();

    let notes = temp_dir.path().join("notes.txt");
    fs::write(&notes, "rust is a systems programming language").unwrap();

    let table = temp_dir.path().join("table.csv");
    fs::write(&table, "name,role\nada,engineer\n").unwrap();

    let config = Config {
        chunk_size: 500,
        ..small_config()
    };
    let pipeline = pipeline_with(&config, CannedProvider::answering("ok"));

    pipeline.ingest(&notes).unwrap();
    pipeline.ingest(&table).unwrap();
    assert_eq!(pipeline.chunk_count(), 2);
}

/// Querying before any document was ingested surfaces the empty-index
/// error to the caller instead of answering.
#[test]
fn test_query_before_ingest_is_an_error() {
    let config = small_config();
    let provider = CannedProvider::answering("should never run");
    let pipeline = pipeline_with(&config, Arc::clone(&provider));

    assert!(pipeline.ask("anything there?").is_err());
    assert!(provider.prompts.lock().unwrap().is_empty());
}

/// An unknown ingestion format is an error, not a silent no-op.
#[test]
fn test_unsupported_format_is_an_error() {
    let temp_dir = tempdir().unwrap();
    let doc = temp_dir.path().join("image.png");
    fs::write(&doc, "binary-ish").unwrap();

    let config = small_config();
    let pipeline = pipeline_with(&config, CannedProvider::answering("ok"));

    let err = pipeline.ingest(&doc).unwrap_err();
    assert!(err.to_string().contains("unsupported document format"));
    assert_eq!(pipeline.chunk_count(), 0);
}

/// An empty model generation resolves to the deterministic fallback
/// answer rather than an error or a hang.
#[test]
fn test_no_generation_falls_back() {
    let temp_dir = tempdir().unwrap();
    let doc = temp_dir.path().join("doc.txt");
    fs::write(&doc, "some indexed words here").unwrap();

    let config = small_config();
    let pipeline = pipeline_with(&config, CannedProvider::empty());

    pipeline.ingest(&doc).unwrap();
    let answer = pipeline.answer("words?").unwrap();
    assert_eq!(answer, NO_GENERATION_FALLBACK);
}

/// A message addressed to an unregistered stage is dropped; the pipeline
/// keeps working afterwards.
#[test]
fn test_unknown_receiver_does_not_poison_the_pipeline() {
    let temp_dir = tempdir().unwrap();
    let doc = temp_dir.path().join("doc.txt");
    fs::write(&doc, "alpha beta gamma delta").unwrap();

    let config = small_config();
    let pipeline = pipeline_with(&config, CannedProvider::answering("still alive"));
    pipeline.ingest(&doc).unwrap();

    let mut payload = serde_json::Map::new();
    payload.insert("query".to_string(), "lost".into());
    let stray = Message::new(
        "test",
        "no-such-stage",
        MessageKind::QueryRequest,
        "trace-stray",
        payload,
    );
    pipeline.bus().dispatch(stray).unwrap();

    assert_eq!(pipeline.answer("alpha").unwrap(), "still alive");
}

/// Every supported format ingests through the same entry point.
#[test]
fn test_format_inference_from_extension() {
    let temp_dir = tempdir().unwrap();

    let config = Config {
        chunk_size: 500,
        ..small_config()
    };
    let pipeline = pipeline_with(&config, CannedProvider::answering("ok"));

    let txt = temp_dir.path().join("a.txt");
    fs::write(&txt, "plain words").unwrap();
    pipeline.ingest(&txt).unwrap();

    let csv = temp_dir.path().join("b.CSV");
    fs::write(&csv, "h1,h2\nv1,v2\n").unwrap();
    // Extension matching is case-insensitive.
    pipeline.ingest(&csv).unwrap();

    assert_eq!(pipeline.chunk_count(), 2);
}
