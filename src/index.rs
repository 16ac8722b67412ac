//! In-memory vector index with brute-force nearest-neighbor search.
//!
//! Vectors and their chunks are stored as parallel vectors behind one
//! `RwLock`; `vectors[i]` always corresponds to `chunks[i]` and insertion
//! order is the implicit chunk identity. Search scans every stored vector
//! and ranks by Euclidean distance, which is exact and entirely adequate
//! at the corpus sizes this pipeline handles.

use std::sync::RwLock;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IndexError {
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("mismatched batch: {vectors} vectors for {chunks} chunks")]
    LengthMismatch { vectors: usize, chunks: usize },

    #[error("index is empty: nothing has been ingested yet")]
    Empty,
}

#[derive(Default)]
struct Entries {
    vectors: Vec<Vec<f32>>,
    chunks: Vec<String>,
}

pub struct VectorIndex {
    dimensions: usize,
    entries: RwLock<Entries>,
}

impl VectorIndex {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: RwLock::new(Entries::default()),
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors and their chunks in lock-step.
    ///
    /// The whole batch is validated before anything is stored, so a failed
    /// add leaves the index untouched.
    pub fn add(&self, vectors: Vec<Vec<f32>>, chunks: Vec<String>) -> Result<(), IndexError> {
        if vectors.len() != chunks.len() {
            return Err(IndexError::LengthMismatch {
                vectors: vectors.len(),
                chunks: chunks.len(),
            });
        }
        for v in &vectors {
            if v.len() != self.dimensions {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: v.len(),
                });
            }
        }

        let mut entries = self.entries.write().unwrap();
        entries.vectors.extend(vectors);
        entries.chunks.extend(chunks);
        Ok(())
    }

    /// Return the chunks of the `top_k` vectors nearest to `query` by
    /// Euclidean distance, nearest first.
    ///
    /// Fewer than `top_k` stored chunks returns all of them. Distance ties
    /// go to the earlier-inserted chunk. Searching before anything has
    /// been added is an error ([`IndexError::Empty`]) rather than an empty
    /// result, so callers cannot mistake a cold index for a miss.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<String>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let entries = self.entries.read().unwrap();
        if entries.chunks.is_empty() {
            return Err(IndexError::Empty);
        }

        let mut ranked: Vec<(f32, usize)> = entries
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (l2_distance_sq(query, v), i))
            .collect();
        // Stable sort on distance alone keeps insertion order for ties.
        ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(top_k);

        Ok(ranked
            .into_iter()
            .map(|(_, i)| entries.chunks[i].clone())
            .collect())
    }
}

/// Squared Euclidean distance; monotone in the real distance, so ranking
/// never needs the square root.
fn l2_distance_sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}
