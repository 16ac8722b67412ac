/// Language-model completion capability injected into the synthesis stage.
pub mod cohere;

use thiserror::Error;

/// Errors from a completion backend.
///
/// `NoGeneration` is the one case the synthesis stage handles itself (it
/// substitutes the user-visible fallback answer); everything else
/// propagates to the caller. Retry and backoff live with the backend, not
/// in the pipeline.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("model returned no usable generation")]
    NoGeneration,

    #[error("completion API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("completion request failed")]
    Http(#[from] reqwest::Error),
}

/// Trait for language-model completion backends.
pub trait CompletionProvider: Send + Sync {
    /// Produce a completion for `prompt`.
    fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}
