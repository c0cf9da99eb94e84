use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("Provider error -> HTTP Status {0}: {1}")]
    ProviderError(u16, String),
    #[error("RequestError: {0}")]
    RequestError(String),
    #[error("ParseError: {0}")]
    ParseError(String),
    #[error("ConfigError: {0}")]
    ConfigError(String),
    #[error("Completion timed out after {0}s")]
    Timeout(u64),
    #[error("Model returned an empty response")]
    EmptyResponse,
}

/// A generative model answering a single, self-contained prompt.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Builds the grounded question-answering prompt sent to the completion model.
#[must_use]
pub fn answer_prompt(company: &str, context: &str, question: &str) -> String {
    format!(
        "Based on the following context about {company}, please answer the user's question.

Context:
{context}

Question: {question}

Instructions:
- Provide a clear, accurate answer based on the context
- If the context doesn't contain enough information, say so
- Focus on being helpful and informative
- Use specific numbers and facts when available"
    )
}
