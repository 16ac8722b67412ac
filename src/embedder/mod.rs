/// Embedder trait and shared types for text embedding.
pub mod hashed;
pub mod tfidf;

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::config::EmbeddingConfig;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("embedding failed: {0}")]
    Failed(String),
}

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` to allow shared use behind
/// `Arc`. Vectors are always exactly `dimensions()` long.
///
/// `embed_batch` is the primary operation. Backends that derive their
/// vocabulary from the batch itself (see [`tfidf::TfidfEmbedder`]) produce
/// vectors that depend on which texts were embedded together, so
/// `embed(t)` is only equivalent to `embed_batch(&[t])[0]`, not to the
/// vector `t` received as part of a larger batch.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed multiple text strings into vectors, one per input, in order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;
}

/// Build the embedding backend selected by the configuration.
///
/// Unknown backend names fall back to TF-IDF with a warning.
pub fn from_config(cfg: &EmbeddingConfig) -> Arc<dyn Embedder> {
    match cfg.backend.as_str() {
        "tfidf" => Arc::new(tfidf::TfidfEmbedder::new(cfg.dimensions)),
        "hashed" => Arc::new(hashed::HashEmbedder::new(cfg.dimensions)),
        other => {
            warn!("Unknown embedding backend {other:?}, falling back to tfidf");
            Arc::new(tfidf::TfidfEmbedder::new(cfg.dimensions))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_backends() {
        let mut cfg = EmbeddingConfig::default();
        assert_eq!(from_config(&cfg).dimensions(), 384);

        cfg.backend = "hashed".to_string();
        cfg.dimensions = 64;
        assert_eq!(from_config(&cfg).dimensions(), 64);

        cfg.backend = "does-not-exist".to_string();
        assert_eq!(from_config(&cfg).dimensions(), 64);
    }
}
