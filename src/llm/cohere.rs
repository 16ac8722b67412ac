/// Completion provider backed by the Cohere generate endpoint.
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{CompletionError, CompletionProvider};
use crate::config::LlmConfig;

/// Per-request wall-clock budget for the completion call.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    generations: Vec<Generation>,
}

#[derive(Deserialize)]
struct Generation {
    text: String,
}

pub struct CohereProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl CohereProvider {
    /// Build a provider from the configuration, reading the API key from
    /// the configured environment variable.
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env)
            .with_context(|| format!("environment variable {} is not set", cfg.api_key_env))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("ragpipe/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("HTTP client build failed")?;

        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
            api_key,
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
        })
    }
}

impl CompletionProvider for CohereProvider {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json()?;
        first_generation(parsed)
    }
}

/// Pull the first generation out of a response, trimmed. An empty
/// generations list or a whitespace-only text is `NoGeneration`.
fn first_generation(response: GenerateResponse) -> Result<String, CompletionError> {
    let text = response
        .generations
        .into_iter()
        .next()
        .map(|g| g.text.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(CompletionError::NoGeneration);
    }
    Ok(text)
}
