//! Runtime configuration.
//!
//! The configuration is a JSON document; every field is optional and falls back to the
//! defaults below. Unknown fields are rejected.
//!
//! ```json
//! {
//!     "company": "Bajaj Finserv",
//!     "stock_data_file": "BFS_Share_Price.csv",
//!     "transcript_files": ["transcripts/*.txt"],
//!     "chunk_size": 1000,
//!     "chunk_overlap": 200,
//!     "min_chunk_length": 50,
//!     "default_search_results": 3,
//!     "generation_timeout_secs": 30,
//!     "business_overview": "Bajaj Finserv Business Information: ..."
//! }
//! ```

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::chunker::ChunkConfig;

pub const DEFAULT_COMPANY: &str = "Bajaj Finserv";
pub const DEFAULT_STOCK_DATA_FILE: &str = "BFS_Share_Price.csv";
pub const DEFAULT_TRANSCRIPT_FILES: [&str; 4] = [
    "earnings_q1_fy25.txt",
    "earnings_q2_fy25.txt",
    "earnings_q3_fy25.txt",
    "earnings_q4_fy25.txt",
];
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_MIN_CHUNK_LENGTH: usize = 50;
pub const DEFAULT_SEARCH_RESULTS: usize = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to deserialize json config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Company name used in generated summaries and in the answer prompt.
    pub company: String,
    /// CSV file with at least `Date` and `Close Price` columns.
    pub stock_data_file: String,
    /// Transcript paths; each entry may be a glob pattern or a directory.
    pub transcript_files: Vec<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_chunk_length: usize,
    pub default_search_results: usize,
    /// No timeout is applied to generation when unset.
    pub generation_timeout_secs: Option<u64>,
    /// Fallback description indexed when almost nothing else loads. The builtin text only
    /// describes the default company.
    pub business_overview: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            company: DEFAULT_COMPANY.to_string(),
            stock_data_file: DEFAULT_STOCK_DATA_FILE.to_string(),
            transcript_files: DEFAULT_TRANSCRIPT_FILES.iter().map(ToString::to_string).collect(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            min_chunk_length: DEFAULT_MIN_CHUNK_LENGTH,
            default_search_results: DEFAULT_SEARCH_RESULTS,
            generation_timeout_secs: None,
            business_overview: None,
        }
    }
}

impl Config {
    /// Parses a JSON config, or returns the defaults when `json` is `None`.
    ///
    /// # Errors
    /// Fails on malformed JSON, unknown fields or invalid values.
    pub fn from_json(json: Option<&str>) -> Result<Self, ConfigError> {
        let config = match json {
            Some(json) => serde_json::from_str::<Self>(json)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    ///
    /// # Errors
    /// Fails if the file can't be read or its content is not a valid config.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(Some(&raw))
    }

    /// # Errors
    /// Returns `ConfigError::Invalid` for chunking parameters that can't advance the window
    /// a zero result count or a zero generation timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunk_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.default_search_results == 0 {
            return Err(ConfigError::Invalid(
                "default_search_results must be greater than zero".to_string(),
            ));
        }
        if self.generation_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "generation_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn chunk_config(&self) -> ChunkConfig {
        ChunkConfig {
            size: self.chunk_size,
            overlap: self.chunk_overlap,
            min_length: self.min_chunk_length,
        }
    }
}
