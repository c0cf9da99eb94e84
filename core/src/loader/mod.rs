//! Collects the documents the retrieval index is built from.

mod files;

use std::{collections::HashSet, path::PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::{Config, DEFAULT_COMPANY},
    document::{Document, DocumentKind},
    stock::StockData,
};
use files::{parse_file, resolve_input_to_files};

pub const BUSINESS_OVERVIEW_SOURCE: &str = "business_overview";

const BUSINESS_OVERVIEW: &str = "Bajaj Finserv Business Information:

Bajaj Finserv is a leading financial services company in India offering lending, insurance, and investment services.

Key Business Segments:
1. Bajaj Finance - Consumer and business lending
2. Bajaj Allianz General Insurance (BAGIC) - General insurance products
3. Bajaj Allianz Life Insurance - Life insurance products
4. Bajaj Markets - Digital platform for financial products

Recent Developments:
- Strong growth in lending business
- Digital transformation initiatives
- Expansion in insurance segments
- Partnership strategies for market expansion

Investment Highlights:
- Strong brand recognition in Indian market
- Diversified financial services portfolio
- Digital-first approach to customer acquisition
- Consistent financial performance track record";

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Invalid glob-pattern: {0}")]
    InvalidGlobPattern(#[from] glob::PatternError),
    #[error("No matching files found")]
    NotFound,
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("File is empty")]
    Empty,
}

/// A configured source that produced no document.
#[derive(Debug)]
pub struct SkippedSource {
    pub source: String,
    pub reason: LoaderError,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedSource>,
}

pub struct DocumentLoader {
    company: String,
    transcript_sources: Vec<String>,
    business_overview: Option<String>,
}

impl DocumentLoader {
    pub fn new(company: impl Into<String>, transcript_sources: Vec<String>) -> Self {
        Self {
            company: company.into(),
            transcript_sources,
            business_overview: None,
        }
    }

    /// Replaces the builtin fallback description.
    #[must_use]
    pub fn with_business_overview(mut self, overview: impl Into<String>) -> Self {
        self.business_overview = Some(overview.into());
        self
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let loader = Self::new(config.company.clone(), config.transcript_files.clone());
        match &config.business_overview {
            Some(overview) => loader.with_business_overview(overview.clone()),
            None => loader,
        }
    }

    /// Gathers the stock summary (when the price table is available), every readable
    /// non-empty transcript, and the business overview when there is at most one
    /// document otherwise. Unusable sources are reported in `skipped`, never raised.
    #[instrument(skip_all)]
    pub fn load_all(&self, stock: &StockData) -> LoadReport {
        let mut report = LoadReport::default();

        if let Some(doc) = stock.summary_document(&self.company) {
            report.documents.push(doc);
        }

        let mut seen = HashSet::new();
        for source in &self.transcript_sources {
            self.load_transcripts(source, &mut seen, &mut report);
        }

        if report.documents.len() <= 1 {
            info!("Limited data loaded, adding business overview");
            report.documents.push(self.business_overview());
        }

        for skipped in &report.skipped {
            warn!(source = %skipped.source, reason = %skipped.reason, "Skipped source");
        }
        info!(
            documents = report.documents.len(),
            skipped = report.skipped.len(),
            "Loaded documents"
        );
        report
    }

    /// Files already in `seen` (matched by an earlier source) are not loaded again.
    fn load_transcripts(&self, source: &str, seen: &mut HashSet<PathBuf>, report: &mut LoadReport) {
        let files = match resolve_input_to_files(source) {
            Ok(files) if files.is_empty() => {
                report.skipped.push(SkippedSource {
                    source: source.to_string(),
                    reason: LoaderError::NotFound,
                });
                return;
            }
            Ok(files) => files,
            Err(reason) => {
                report.skipped.push(SkippedSource {
                    source: source.to_string(),
                    reason,
                });
                return;
            }
        };

        for file in files {
            if !seen.insert(file.clone()) {
                debug!(file = %file.display(), "Already loaded by an earlier source");
                continue;
            }
            let id = file.to_string_lossy().to_string();
            match parse_file(&file) {
                Ok(content) if content.trim().is_empty() => report.skipped.push(SkippedSource {
                    source: id,
                    reason: LoaderError::Empty,
                }),
                Ok(content) => report
                    .documents
                    .push(Document::new(content, id, DocumentKind::Transcript)),
                Err(e) => report.skipped.push(SkippedSource {
                    source: id,
                    reason: e.into(),
                }),
            }
        }
    }

    fn business_overview(&self) -> Document {
        let content = match &self.business_overview {
            Some(overview) => overview.clone(),
            None if self.company == DEFAULT_COMPANY => BUSINESS_OVERVIEW.to_string(),
            None => format!(
                "{company} Business Information:\n\n\
                 No business overview has been configured for {company}. Answers about \
                 {company} rely on its earnings call transcripts and stock price data.",
                company = self.company
            ),
        };
        Document::new(content, BUSINESS_OVERVIEW_SOURCE, DocumentKind::BusinessInfo)
    }
}
