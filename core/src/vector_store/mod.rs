pub mod flat;

pub use flat::FlatL2Index;

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::{
    chunker::{Chunk, ChunkMetadata},
    embeddings::{EmbedderError, EmbeddingModel},
};

#[derive(Debug, Clone, Error)]
pub enum VectorStoreError {
    #[error("No chunks to index")]
    NoChunks,
    #[error("Failed to embed: {0}")]
    Embedding(#[from] EmbedderError),
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Squared L2 distance to the query; lower is more similar.
    pub distance: f32,
}

impl SearchResult {
    #[must_use]
    pub fn metadata(&self) -> &ChunkMetadata {
        &self.chunk.metadata
    }
}

/// Readiness of a [`VectorIndex`].
///
/// The flat index and the chunk list only ever exist together, so position `i` in the
/// index always names `chunks[i]`.
#[derive(Debug, Default)]
pub enum IndexState {
    #[default]
    NotReady,
    Ready {
        index: FlatL2Index,
        chunks: Vec<Chunk>,
    },
}

/// Chunks plus their embeddings, searchable by free-text query.
pub struct VectorIndex {
    model: Arc<dyn EmbeddingModel>,
    state: IndexState,
}

impl VectorIndex {
    pub fn new(model: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            model,
            state: IndexState::NotReady,
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, IndexState::Ready { .. })
    }

    #[must_use]
    pub fn state(&self) -> &IndexState {
        &self.state
    }

    /// Number of indexed chunks; zero when not ready.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.state {
            IndexState::Ready { chunks, .. } => chunks.len(),
            IndexState::NotReady => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embeds `chunks` and replaces the index with them. On failure the index is left
    /// not ready, even if it was ready before.
    ///
    /// # Errors
    /// Fails for an empty chunk list, an embedding failure, or vectors of inconsistent
    /// dimension.
    #[instrument(skip_all, fields(chunks = chunks.len()))]
    pub async fn build(&mut self, chunks: Vec<Chunk>) -> Result<usize, VectorStoreError> {
        self.state = IndexState::NotReady;
        if chunks.is_empty() {
            return Err(VectorStoreError::NoChunks);
        }

        info!("Creating embeddings for {} chunks", chunks.len());
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.model.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(VectorStoreError::CountMismatch {
                expected: chunks.len(),
                actual: embeddings.len(),
            });
        }

        let dimension = embeddings.first().map_or(0, Vec::len);
        let mut index = FlatL2Index::new(dimension);
        for embedding in &embeddings {
            index.add(embedding)?;
        }

        let count = chunks.len();
        self.state = IndexState::Ready { index, chunks };
        info!(dimension, "Vector index created with {count} chunks");
        Ok(count)
    }

    /// Top-`k` chunks for `query`, nearest first. Returns an empty list when the index
    /// isn't ready or the query can't be embedded.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, k: usize) -> Vec<SearchResult> {
        let IndexState::Ready { index, chunks } = &self.state else {
            debug!("Search on an index that is not ready");
            return vec![];
        };

        let query_embedding = match self.model.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "Error embedding query");
                return vec![];
            }
        };
        let hits = match index.search(&query_embedding, k) {
            Ok(hits) => hits,
            Err(e) => {
                error!(error = %e, "Error during search");
                return vec![];
            }
        };

        hits.into_iter()
            .filter_map(|(pos, distance)| {
                chunks.get(pos).map(|chunk| SearchResult {
                    chunk: chunk.clone(),
                    distance,
                })
            })
            .collect()
    }
}
