//! In-memory vector index over document chunks.
//!
//! Vector search is brute-force cosine similarity over every stored
//! vector, which is plenty for a handful of uploaded documents. The index
//! is persisted as a JSON side file next to the uploads so it survives
//! restarts without re-embedding.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::embedding::cosine_similarity;
use crate::models::Chunk;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// A chunk paired with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkIndex {
    /// Embedding model that produced the vectors.
    pub model: String,
    pub dims: usize,
    entries: Vec<IndexedChunk>,
}

impl ChunkIndex {
    pub fn new(model: impl Into<String>, dims: usize) -> Self {
        Self {
            model: model.into(),
            dims,
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, chunk: Chunk, vector: Vec<f32>) {
        self.entries.push(IndexedChunk { chunk, vector });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vectors keyed by chunk hash, for reuse when rebuilding.
    pub fn vectors_by_hash(&self) -> HashMap<&str, &[f32]> {
        self.entries
            .iter()
            .map(|e| (e.chunk.hash.as_str(), e.vector.as_slice()))
            .collect()
    }

    /// The `k` chunks most similar to `query`, best first.
    ///
    /// Ties keep insertion order, so results are deterministic.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<ScoredChunk<'_>> {
        let mut scored: Vec<ScoredChunk<'_>> = self
            .entries
            .iter()
            .map(|e| ScoredChunk {
                chunk: &e.chunk,
                score: cosine_similarity(query, &e.vector),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        scored
    }

    /// Take the nearest `candidates` chunks, then keep the first `keep`
    /// whose document name contains `filter` (case-insensitive).
    pub fn nearest_filtered(
        &self,
        query: &[f32],
        filter: &str,
        candidates: usize,
        keep: usize,
    ) -> Vec<ScoredChunk<'_>> {
        let needle = filter.to_lowercase();
        self.nearest(query, candidates)
            .into_iter()
            .filter(|s| s.chunk.document.to_lowercase().contains(&needle))
            .take(keep)
            .collect()
    }

    /// Load an index from disk. A missing file yields an empty index.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read index: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse index: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write index: {}", path.display()))
    }
}
