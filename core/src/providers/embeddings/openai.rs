use crate::embeddings::{EmbedderError, EmbeddingModel};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

const API_KEY_ENV_VAR: &str = "FINSAGE_OPENAI_API_KEY";
const URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_MODEL: &str = "text-embedding-3-small";

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct ModelConfig {
    api_key_var: Option<String>,
    api_url: Option<String>,
    model: Option<String>,
}

/// Remote embeddings through the OpenAI `/v1/embeddings` endpoint.
pub struct OpenAIEmbeddingModel {
    api_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAIEmbeddingModel {
    /// # Errors
    /// `EmbedderError::ProviderError` for a malformed config or an unset API key variable.
    pub fn new(json_config: Option<&str>) -> Result<Self, EmbedderError> {
        let config = match json_config {
            Some(json) => serde_json::from_str::<ModelConfig>(json).map_err(|e| {
                EmbedderError::ProviderError(format!("Failed to deserialize json config: {e}"))
            })?,
            None => ModelConfig::default(),
        };
        let api_key_var = config.api_key_var.unwrap_or(API_KEY_ENV_VAR.to_string());
        let api_key = std::env::var(&api_key_var).map_err(|e| {
            EmbedderError::ProviderError(format!("Failed to fetch env var `{api_key_var}`!, {e}"))
        })?;
        Ok(Self::with_api_key(
            api_key,
            config.api_url.unwrap_or(URL.to_string()),
            config.model.unwrap_or(DEFAULT_MODEL.to_string()),
        ))
    }

    #[must_use]
    pub fn with_api_key(api_key: String, api_url: String, model: String) -> Self {
        Self {
            api_url,
            api_key,
            model,
            client: Client::new(),
        }
    }

    async fn request(&self, input: serde_json::Value) -> Result<Vec<Vec<f32>>, EmbedderError> {
        let request_body = json!({
                "input": input,
                "model": self.model,
        });
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| EmbedderError::RequestError(e.to_string()))?;

        if response.status().is_success() {
            let mut response = response
                .json::<OpenAIEmbeddingResponse>()
                .await
                .map_err(|e| EmbedderError::ParseError(e.to_string()))?;
            response.data.sort_by_key(|d| d.index);
            Ok(response.data.into_iter().map(|d| d.embedding).collect())
        } else {
            let error_message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            Err(EmbedderError::ProviderError(error_message))
        }
    }
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    pub data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub index: usize,
}

#[async_trait]
impl EmbeddingModel for OpenAIEmbeddingModel {
    async fn embed(&self, data: &str) -> Result<Vec<f32>, EmbedderError> {
        self.request(json!(data))
            .await?
            .into_iter()
            .next()
            .ok_or(EmbedderError::CountMismatch {
                expected: 1,
                actual: 0,
            })
    }

    #[instrument(skip_all, fields(inputs = data.len()))]
    async fn embed_batch(&self, data: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if data.is_empty() {
            return Ok(vec![]);
        }
        let embeddings = self.request(json!(data)).await?;
        debug!(returned = embeddings.len(), "Received embeddings");
        if embeddings.len() != data.len() {
            return Err(EmbedderError::CountMismatch {
                expected: data.len(),
                actual: embeddings.len(),
            });
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_for(server: &mockito::ServerGuard) -> OpenAIEmbeddingModel {
        OpenAIEmbeddingModel::with_api_key(
            "test-key".to_string(),
            format!("{}/v1/embeddings", server.url()),
            DEFAULT_MODEL.to_string(),
        )
    }

    #[tokio::test]
    async fn test_batch_is_ordered_by_index() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_body(
                r#"{"data":[{"embedding":[0.0,1.0],"index":1},{"embedding":[1.0,0.0],"index":0}]}"#,
            )
            .create_async()
            .await;

        let inputs = vec!["first".to_string(), "second".to_string()];
        let out = model_for(&server).embed_batch(&inputs).await.unwrap();
        assert_eq!(out, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_count_mismatch() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_body(r#"{"data":[{"embedding":[1.0],"index":0}]}"#)
            .create_async()
            .await;

        let inputs = vec!["a".to_string(), "b".to_string()];
        let result = model_for(&server).embed_batch(&inputs).await;
        assert!(matches!(
            result,
            Err(EmbedderError::CountMismatch { expected: 2, actual: 1 })
        ));
    }

    #[tokio::test]
    async fn test_provider_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(401)
            .with_body("bad key")
            .create_async()
            .await;

        let result = model_for(&server).embed("a").await;
        assert!(matches!(result, Err(EmbedderError::ProviderError(ref m)) if m == "bad key"));
    }

    #[tokio::test]
    #[ignore]
    async fn simple_openai_embed_request() {
        let model = OpenAIEmbeddingModel::new(None).unwrap();
        let response = model.embed("test").await;
        assert!(response.is_ok());
    }
}
