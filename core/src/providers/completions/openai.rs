use crate::completion::{CompletionError, CompletionModel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, instrument};

const API_KEY_ENV_VAR: &str = "FINSAGE_OPENAI_API_KEY";
const URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_TEMP: f64 = 1.0;
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TOKENS: usize = 2400;

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct ModelConfig {
    api_key_var: Option<String>,
    api_url: Option<String>,
    model: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<usize>,
}

/// Chat-completions client for OpenAI compatible endpoints.
///
/// # Supported Configuration
///
/// - `model`: model identifier, `gpt-4o-mini` by default
/// - `api_key_var`: environment variable holding the API key, `FINSAGE_OPENAI_API_KEY` by default
/// - `api_url`: endpoint URL
/// - `temperature`, `max_tokens`: sampling parameters
///
/// ```rust,no_run
/// use finsage::providers::completions::OpenAI;
///
/// let model = OpenAI::new(Some(r#"{"model": "gpt-4o-mini"}"#)).unwrap();
/// ```
pub struct OpenAICompletionModel {
    api_key: String,
    api_url: String,
    client: reqwest::Client,
    model: String,
    temperature: f64,
    max_tokens: usize,
}

impl OpenAICompletionModel {
    /// Creates a model from an optional JSON config, reading the API key from the environment.
    ///
    /// # Errors
    /// `CompletionError::ConfigError` if the JSON is malformed, contains unknown fields, or
    /// the API key variable is not set.
    #[instrument]
    pub fn new(json_config: Option<&str>) -> Result<Self, CompletionError> {
        let config = match json_config {
            Some(json) => serde_json::from_str::<ModelConfig>(json).map_err(|e| {
                let e = format!("Failed to deserialize json config: {e}");
                error!(e);
                CompletionError::ConfigError(e)
            })?,
            None => ModelConfig::default(),
        };
        let api_key_var = config.api_key_var.unwrap_or(API_KEY_ENV_VAR.to_string());
        let api_key = std::env::var(&api_key_var).map_err(|e| {
            let e = format!("Failed to fetch env var `{api_key_var}`!, {e}");
            error!(e);
            CompletionError::ConfigError(e)
        })?;
        let mut model = Self::with_api_key(
            api_key,
            config.api_url.unwrap_or(URL.to_string()),
            config.model.unwrap_or(DEFAULT_MODEL.to_string()),
        );
        if let Some(temperature) = config.temperature {
            model.temperature = temperature;
        }
        if let Some(max_tokens) = config.max_tokens {
            model.max_tokens = max_tokens;
        }
        Ok(model)
    }

    #[must_use]
    pub fn with_api_key(api_key: String, api_url: String, model: String) -> Self {
        Self {
            api_key,
            api_url,
            client: reqwest::Client::new(),
            model,
            temperature: DEFAULT_TEMP,
            max_tokens: DEFAULT_TOKENS,
        }
    }
}

#[async_trait]
impl CompletionModel for OpenAICompletionModel {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request_body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        debug!(request_body = ?request_body, "Sending request to OpenAI");

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Request failed");
                CompletionError::RequestError(e.to_string())
            })?;

        let status = response.status();
        debug!(%status, "Received API response");

        if status.is_success() {
            let response_json: serde_json::Value = response.json().await.map_err(|e| {
                error!(error = ?e, "Failed to parse response JSON");
                CompletionError::ParseError(e.to_string())
            })?;

            let content = response_json["choices"][0]["message"]["content"]
                .as_str()
                .ok_or(CompletionError::ParseError(
                    "Invalid response body".to_string(),
                ))?
                .to_string();

            if let Some(total) = response_json["usage"]["total_tokens"].as_u64() {
                info!(total_tokens = total, "Token usage recorded");
            }
            Ok(content)
        } else {
            let error_msg = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error (failed to read response body)".to_string());

            error!(
                status = %status,
                error = %error_msg,
                "API returned error response"
            );

            Err(CompletionError::ProviderError(status.into(), error_msg))
        }
    }
}
