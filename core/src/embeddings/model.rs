use crate::embeddings::EmbedderError;
use async_trait::async_trait;

/// Turns text into fixed-dimension vectors.
///
/// Implementations must be deterministic: the same input and configuration always
/// yields the same vector, since chunk and query embeddings are compared directly.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, data: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embeds several inputs, returning one vector per input in the same order.
    async fn embed_batch(&self, data: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        let mut out = Vec::with_capacity(data.len());
        for d in data {
            out.push(self.embed(d).await?);
        }
        Ok(out)
    }
}
