//! # FinSage - Core API Documentation
//!
//! FinSage answers natural-language questions about a single listed company.
//!
//! ## Features
//!
//! - **Query routing** between two answer paths:
//!   - **Numeric**: statistics (highest, lowest, average, summary) computed directly over a
//!     dated closing-price table, optionally narrowed to a calendar year
//!   - **General**: retrieval of the most similar transcript chunks followed by a grounded
//!     generation call
//! - **Lazy, single initialization** of the price table and vector index, shared safely
//!   between concurrent callers
//! - **Pluggable models** through the `EmbeddingModel` and `CompletionModel` traits
//!
//! ## Examples
//!
//! The `core/examples` directory has a runnable command line demo.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use finsage::{Config, FinSage};
//! use finsage::embeddings::HashingEmbedding;
//! use finsage::providers::completions::OpenAI;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = FinSage::new(
//!         Config::from_path("finsage.json")?,
//!         Arc::new(HashingEmbedding::default()),
//!         Arc::new(OpenAI::new(None)?),
//!     );
//!
//!     let result = service.handle_query("What was the average share price in 2023?").await;
//!     println!("{}\n\nSources: {:?}", result.answer, result.sources);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature flags
//!
//! Name | Description | Default?
//! ---|---|---
//! `pdf` | lets transcript sources point at PDF files | No

/// Sliding-window text chunking
pub mod chunker;

/// Text generation models and the grounded answer prompt
pub mod completion;

/// Service configuration, loaded from JSON
pub mod config;

/// Documents fed to the retrieval index
pub mod document;

/// Text embeddings support
pub mod embeddings;

/// Error types for all library operations
pub mod error;

/// Transcript and fallback document loading
pub mod loader;

/// Builtin completion and embedding model providers
pub mod providers;

/// Query classification and answer composition
pub mod router;

/// The lazily initialized question-answering service
pub mod service;

/// Closing-price table and its statistics
pub mod stock;

/// Vector storage and retrieval
pub mod vector_store;

pub use config::Config;
pub use router::AnswerResult;
pub use service::{FinSage, Health, ServiceState};
