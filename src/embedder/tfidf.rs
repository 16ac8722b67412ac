/// Bag-of-words TF-IDF embedder fitted on each batch it receives.
///
/// The vocabulary is rebuilt from scratch on every call: term columns,
/// document frequencies and IDF weights all come from the current batch
/// alone. The same text therefore embeds to different vectors depending on
/// which texts accompany it, and across separate calls. Retrieval embeds
/// the query as its own single-element batch, and the index only ever
/// compares vectors by distance, never by identity, so the pipeline
/// tolerates this. Callers that need reproducible vectors should use
/// [`super::hashed::HashEmbedder`] instead.
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::{Embedder, EmbedderError};

/// Tokens are lowercased runs of two or more word characters; single-letter
/// words and punctuation never enter the vocabulary.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").unwrap());

pub struct TfidfEmbedder {
    dimensions: usize,
}

impl TfidfEmbedder {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn tokenize(text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        TOKEN_RE
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Fit a vocabulary on `texts` and transform them in one pass.
    ///
    /// When the batch yields more distinct terms than `dimensions`, the
    /// most frequent terms across the batch are kept (ties alphabetical).
    /// Kept terms are assigned columns in alphabetical order; unused
    /// trailing columns stay zero. Rows are L2-normalized; a row with no
    /// in-vocabulary tokens stays all-zero.
    fn fit_transform(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        let docs: Vec<Vec<String>> = texts.iter().map(|t| Self::tokenize(t)).collect();

        let mut corpus_counts: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for tokens in &docs {
            let mut seen: Vec<&str> = Vec::new();
            for tok in tokens {
                *corpus_counts.entry(tok.as_str()).or_insert(0) += 1;
                if !seen.contains(&tok.as_str()) {
                    seen.push(tok.as_str());
                }
            }
            for tok in seen {
                *doc_freq.entry(tok).or_insert(0) += 1;
            }
        }

        // Cap the vocabulary at `dimensions` terms by corpus frequency.
        let mut terms: Vec<&str> = corpus_counts.keys().copied().collect();
        if terms.len() > self.dimensions {
            terms.sort_by(|a, b| {
                corpus_counts[b]
                    .cmp(&corpus_counts[a])
                    .then_with(|| a.cmp(b))
            });
            terms.truncate(self.dimensions);
        }
        terms.sort_unstable();

        let columns: HashMap<&str, usize> =
            terms.iter().enumerate().map(|(i, t)| (*t, i)).collect();

        // Smoothed IDF: ln((1 + n) / (1 + df)) + 1.
        let n_docs = docs.len() as f32;
        let idf: Vec<f32> = terms
            .iter()
            .map(|t| ((1.0 + n_docs) / (1.0 + doc_freq[t] as f32)).ln() + 1.0)
            .collect();

        docs.iter()
            .map(|tokens| {
                let mut row = vec![0.0f32; self.dimensions];
                for tok in tokens {
                    if let Some(&col) = columns.get(tok.as_str()) {
                        row[col] += idf[col];
                    }
                }
                let norm: f32 = row.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for v in &mut row {
                        *v /= norm;
                    }
                }
                row
            })
            .collect()
    }
}

impl Embedder for TfidfEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        Ok(self.fit_transform(&[text]).remove(0))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        Ok(self.fit_transform(texts))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
