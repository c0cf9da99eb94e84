use async_trait::async_trait;
use finsage::completion::{CompletionError, CompletionModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TEMP: f64 = 0.7;
const DEFAULT_TOKENS: usize = 1024;

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct ModelConfig {
    api_key_var: Option<String>,
    api_url: Option<String>,
    model: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<usize>,
}

/// Implementation of FinSage's `CompletionModel` trait for Google's
/// [Gemini](https://ai.google.dev) `generateContent` endpoint.
///
/// # Supported Configuration
///
/// - `model`: model identifier, `gemini-1.5-flash` by default
/// - `api_key_var`: environment variable holding the API key, `GEMINI_API_KEY` by default
/// - `api_url`: full endpoint URL, derived from `model` when left out
/// - `temperature`, `max_tokens`: generation parameters
///
/// All of them are optional.
///
/// ```rust,no_run
/// use finsage_gemini::GeminiCompletionModel;
///
/// let model = GeminiCompletionModel::new(Some(r#"{"model": "gemini-1.5-pro"}"#)).unwrap();
/// ```
pub struct GeminiCompletionModel {
    api_key: String,
    api_url: String,
    client: reqwest::Client,
    temperature: f64,
    max_tokens: usize,
}

impl GeminiCompletionModel {
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
        let model = config.model.unwrap_or(DEFAULT_MODEL.to_string());
        let api_url = config.api_url.unwrap_or_else(|| endpoint(&model));

        let mut gemini = Self::with_api_key(api_key, api_url);
        if let Some(temperature) = config.temperature {
            gemini.temperature = temperature;
        }
        if let Some(max_tokens) = config.max_tokens {
            gemini.max_tokens = max_tokens;
        }
        Ok(gemini)
    }

    #[must_use]
    pub fn with_api_key(api_key: String, api_url: String) -> Self {
        Self {
            api_key,
            api_url,
            client: reqwest::Client::new(),
            temperature: DEFAULT_TEMP,
            max_tokens: DEFAULT_TOKENS,
        }
    }
}

fn endpoint(model: &str) -> String {
    format!("{BASE_URL}/{model}:generateContent")
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize, Debug)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: usize,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u64>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        Some(text)
    }
}

#[async_trait]
impl CompletionModel for GeminiCompletionModel {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request_body = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };
        debug!(request_body = ?request_body, "Sending request to Gemini");

        let response = self
            .client
            .post(&self.api_url)
            .header("x-goog-api-key", &self.api_key)
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

        if !status.is_success() {
            let error_msg = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error (failed to read response body)".to_string());
            error!(status = %status, error = %error_msg, "API returned error response");
            return Err(CompletionError::ProviderError(status.into(), error_msg));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse response JSON");
            CompletionError::ParseError(e.to_string())
        })?;
        if let Some(total) = body.usage_metadata.as_ref().and_then(|u| u.total_token_count) {
            info!(total_tokens = total, "Token usage recorded");
        }
        body.into_text()
            .ok_or(CompletionError::ParseError("Response had no candidates".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

    fn model_for(server: &mockito::ServerGuard) -> GeminiCompletionModel {
        GeminiCompletionModel::with_api_key("test-key".to_string(), format!("{}{PATH}", server.url()))
    }

    #[test]
    fn test_default_endpoint() {
        assert_eq!(
            endpoint(DEFAULT_MODEL),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_complete_joins_candidate_parts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_header("x-goog-api-key", "test-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "contents": [{"parts": [{"text": "How did lending do?"}]}],
                "generationConfig": {"maxOutputTokens": DEFAULT_TOKENS}
            })))
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Lending "},{"text":"grew."}]}}],
                    "usageMetadata":{"totalTokenCount":12}}"#,
            )
            .create_async()
            .await;

        let answer = model_for(&server).complete("How did lending do?").await.unwrap();
        mock.assert_async().await;
        assert_eq!(answer, "Lending grew.");
    }

    #[tokio::test]
    async fn test_no_candidates_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let result = model_for(&server).complete("hi").await;
        assert!(matches!(result, Err(CompletionError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_provider_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", PATH)
            .with_status(403)
            .with_body("API key not valid")
            .create_async()
            .await;

        let result = model_for(&server).complete("hi").await;
        assert!(matches!(
            result,
            Err(CompletionError::ProviderError(403, ref body)) if body == "API key not valid"
        ));
    }

    #[test]
    fn test_config_errors() {
        let unknown = GeminiCompletionModel::new(Some(r#"{"modle": "gemini-pro"}"#));
        assert!(matches!(unknown, Err(CompletionError::ConfigError(_))));

        let unset =
            GeminiCompletionModel::new(Some(r#"{"api_key_var": "FINSAGE_TEST_UNSET_GEMINI_KEY"}"#));
        assert!(matches!(unset, Err(CompletionError::ConfigError(_))));
    }

    #[tokio::test]
    #[ignore]
    async fn simple_gemini_request() {
        let model = GeminiCompletionModel::new(None).unwrap();
        let response = model
            .complete(r#"This is a test. Reply with "okay" without the quotes, and NOTHING else."#)
            .await;
        assert!(response.is_ok_and(|v| v.trim() == "okay"));
    }
}
