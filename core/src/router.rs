//! Query classification and answer composition.

use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    completion::{answer_prompt, CompletionError, CompletionModel},
    config::Config,
    stock::{is_stock_query, StockData},
    vector_store::{SearchResult, VectorIndex},
};

pub const NOT_ENOUGH_INFORMATION: &str = "I don't have enough information to answer your question. Please try asking about stock prices or business performance.";
pub const GENERATION_FAILED: &str =
    "I apologize, but I encountered an error generating the response. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Answered from the price table.
    Numeric,
    /// Answered by retrieval plus generation.
    General,
}

#[must_use]
pub fn classify(query: &str) -> QueryKind {
    if is_stock_query(query) {
        QueryKind::Numeric
    } else {
        QueryKind::General
    }
}

/// What the caller renders: the answer text and the distinct sources behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerResult {
    pub answer: String,
    pub sources: Vec<String>,
}

impl AnswerResult {
    /// Duplicate sources are dropped, keeping first-seen order.
    pub fn new<I, S>(answer: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for source in sources {
            let source = source.into();
            if !unique.contains(&source) {
                unique.push(source);
            }
        }
        Self {
            answer: answer.into(),
            sources: unique,
        }
    }

    pub fn without_sources(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sources: vec![],
        }
    }
}

/// Dispatches queries to the price table or to retrieval + generation.
///
/// Holds the read-only price table and vector index; never returns an error.
pub struct Router {
    stock: StockData,
    index: VectorIndex,
    completion: Arc<dyn CompletionModel>,
    company: String,
    search_results: usize,
    generation_timeout: Option<Duration>,
}

impl Router {
    pub fn new(
        stock: StockData,
        index: VectorIndex,
        completion: Arc<dyn CompletionModel>,
        config: &Config,
    ) -> Self {
        Self {
            stock,
            index,
            completion,
            company: config.company.clone(),
            search_results: config.default_search_results,
            generation_timeout: config.generation_timeout_secs.map(Duration::from_secs),
        }
    }

    #[must_use]
    pub fn stock(&self) -> &StockData {
        &self.stock
    }

    #[must_use]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    #[instrument(skip(self))]
    pub async fn process_query(&self, query: &str) -> AnswerResult {
        match classify(query) {
            QueryKind::Numeric => {
                debug!("Routing to stock statistics");
                AnswerResult::new(self.stock.stats_response(query), [self.stock.source()])
            }
            QueryKind::General => self.answer_from_documents(query).await,
        }
    }

    async fn answer_from_documents(&self, query: &str) -> AnswerResult {
        let results = self.index.search(query, self.search_results).await;
        if results.is_empty() {
            info!("No relevant chunks found");
            return AnswerResult::without_sources(NOT_ENOUGH_INFORMATION);
        }

        let answer = self.generate_answer(query, &results).await;
        AnswerResult::new(answer, results.iter().map(|r| r.metadata().source.as_str()))
    }

    async fn generate_answer(&self, query: &str, results: &[SearchResult]) -> String {
        let context = results
            .iter()
            .map(|r| r.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = answer_prompt(&self.company, &context, query);

        let generation = self.completion.complete(&prompt);
        let response = match self.generation_timeout {
            Some(limit) => tokio::time::timeout(limit, generation)
                .await
                .unwrap_or_else(|_| Err(CompletionError::Timeout(limit.as_secs()))),
            None => generation.await,
        };

        match response {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(error = %CompletionError::EmptyResponse, "Error generating answer");
                GENERATION_FAILED.to_string()
            }
            Err(e) => {
                error!(error = %e, "Error generating answer");
                GENERATION_FAILED.to_string()
            }
        }
    }
}
