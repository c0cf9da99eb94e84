use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{EmbedderError, EmbeddingModel};

pub const DEFAULT_DIMENSION: usize = 384;
const MIN_TOKEN_LEN: usize = 2;

/// Local bag-of-words embedding using signed feature hashing.
///
/// Each lowercased alphanumeric token is hashed into one of `dimension` buckets with a
/// hash-derived sign, and the result is L2-normalised. No network access and fully
/// deterministic, which makes it the default model and the one used in tests.
#[derive(Debug, Clone)]
pub struct HashingEmbedding {
    dimension: usize,
}

impl HashingEmbedding {
    /// `dimension` is clamped to at least 1.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];

        for token in text
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|token| token.chars().count() >= MIN_TOKEN_LEN)
        {
            let token = token.to_lowercase();
            let digest = Sha256::digest(token.as_bytes());
            let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
                % self.dimension;
            let sign = if digest[4] % 2 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedding {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingModel for HashingEmbedding {
    async fn embed(&self, data: &str) -> Result<Vec<f32>, EmbedderError> {
        Ok(self.embed_text(data))
    }
}
