//! The entry point external callers (a web handler, a CLI) talk to.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info, instrument, warn};

use crate::{
    chunker,
    completion::CompletionModel,
    config::Config,
    embeddings::EmbeddingModel,
    error::Error,
    loader::DocumentLoader,
    router::{AnswerResult, Router},
    stock::StockData,
    vector_store::VectorIndex,
};

pub const EMPTY_QUERY_MESSAGE: &str = "Please provide a question.";
pub const NOT_READY_MESSAGE: &str = "Sorry, the system is not ready. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Uninitialized,
    Ready,
    Failed,
}

/// Body of a health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub rag_initialized: bool,
    pub index_ready: bool,
}

/// Lazily built question-answering service.
///
/// The price table and vector index are built once, on [`FinSage::initialize`] or on the
/// first non-empty query. Concurrent callers wait for that single build, and its outcome
/// (including a failure) is kept for the life of the service.
pub struct FinSage {
    config: Config,
    embedder: Arc<dyn EmbeddingModel>,
    completion: Arc<dyn CompletionModel>,
    router: OnceCell<Result<Router, Error>>,
}

impl FinSage {
    pub fn new(
        config: Config,
        embedder: Arc<dyn EmbeddingModel>,
        completion: Arc<dyn CompletionModel>,
    ) -> Self {
        Self {
            config,
            embedder,
            completion,
            router: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Builds the service if that hasn't happened yet and returns the outcome.
    ///
    /// # Errors
    /// Returns the error that made the (single) initialization fail.
    pub async fn initialize(&self) -> Result<&Router, &Error> {
        self.router
            .get_or_init(|| async {
                info!("Initializing RAG system");
                let router = build_router(&self.config, &self.embedder, &self.completion).await;
                match &router {
                    Ok(_) => info!("RAG system ready"),
                    Err(e) => error!(error = %e, "Error initializing RAG system"),
                }
                router
            })
            .await
            .as_ref()
    }

    #[must_use]
    pub fn state(&self) -> ServiceState {
        match self.router.get() {
            None => ServiceState::Uninitialized,
            Some(Ok(_)) => ServiceState::Ready,
            Some(Err(_)) => ServiceState::Failed,
        }
    }

    /// True once the retrieval index has been built from at least one chunk.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.router.get(), Some(Ok(router)) if router.index().is_ready())
    }

    #[must_use]
    pub fn health(&self) -> Health {
        Health {
            status: "healthy",
            rag_initialized: self.state() == ServiceState::Ready,
            index_ready: self.is_ready(),
        }
    }

    /// Answers `raw_query`. Always returns a non-empty answer.
    #[instrument(skip(self))]
    pub async fn handle_query(&self, raw_query: &str) -> AnswerResult {
        let query = raw_query.trim();
        if query.is_empty() {
            return AnswerResult::without_sources(EMPTY_QUERY_MESSAGE);
        }

        match self.initialize().await {
            Ok(router) => router.process_query(query).await,
            Err(_) => AnswerResult::without_sources(NOT_READY_MESSAGE),
        }
    }
}

async fn build_router(
    config: &Config,
    embedder: &Arc<dyn EmbeddingModel>,
    completion: &Arc<dyn CompletionModel>,
) -> Result<Router, Error> {
    config.validate()?;

    let stock = StockData::load(&config.stock_data_file);
    let report = DocumentLoader::from_config(config).load_all(&stock);
    let chunks = chunker::chunk(&report.documents, &config.chunk_config())?;

    let mut index = VectorIndex::new(Arc::clone(embedder));
    if let Err(e) = index.build(chunks).await {
        // numeric questions still work without the index
        warn!(error = %e, "Vector index not built");
    }

    Ok(Router::new(stock, index, Arc::clone(completion), config))
}
