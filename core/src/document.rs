use serde::{Deserialize, Serialize};

/// Where a document's text came from.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Transcript,
    StockData,
    BusinessInfo,
}

impl DocumentKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transcript => "transcript",
            Self::StockData => "stock_data",
            Self::BusinessInfo => "business_info",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Document {
    pub content: String,
    pub source: String,
    pub kind: DocumentKind,
}

impl Document {
    pub fn new(content: impl Into<String>, source: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            kind,
        }
    }
}
