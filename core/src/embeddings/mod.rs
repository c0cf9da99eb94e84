pub mod hashing;
pub mod model;

pub use hashing::HashingEmbedding;
pub use model::EmbeddingModel;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum EmbedderError {
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("RequestError: {0}")]
    RequestError(String),
    #[error("ParseError: {0}")]
    ParseError(String),
    #[error("Expected {expected} embeddings, provider returned {actual}")]
    CountMismatch { expected: usize, actual: usize },
}
