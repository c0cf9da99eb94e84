use crate::{
    chunker::ChunkError, completion::CompletionError, config::ConfigError,
    embeddings::EmbedderError, loader::LoaderError, stock::StockError,
    vector_store::VectorStoreError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Stock data error: {0}")]
    Stock(#[from] StockError),
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),
    #[error("Chunking error: {0}")]
    Chunk(#[from] ChunkError),
    #[error("Embedder error: {0}")]
    Embedder(#[from] EmbedderError),
    #[error("VectorStore error: {0}")]
    VectorStore(#[from] VectorStoreError),
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),
}
