//! Daily closing-price table and the statistics answered from it.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Deserialize;
use std::{path::Path, sync::LazyLock};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::document::{Document, DocumentKind};

const STOCK_KEYWORDS: [&str; 7] = [
    "stock", "price", "highest", "lowest", "average", "trading", "share",
];

/// Day-first formats accepted in the `Date` column, tried in order.
const DATE_FORMATS: [&str; 8] = [
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
];

pub const DATA_UNAVAILABLE_MESSAGE: &str = "Sorry, I couldn't load the stock price data.";

// ASCII only: `\d` would also match other scripts' digits, which `i32::from_str` rejects
static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{4})").expect("year pattern is a valid regex"));

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StockError {
    #[error("Stock price data is unavailable")]
    Unavailable,
    #[error("No stock data available for {0}")]
    NoDataForYear(String),
    #[error("Failed to read price file: {0}")]
    Read(String),
    #[error("Malformed price row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
    #[error("Price file contains no records")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub close_price: f64,
}

impl PriceRecord {
    #[must_use]
    pub fn new(date: NaiveDate, close_price: f64) -> Self {
        Self { date, close_price }
    }
}

/// Aggregates over a run of price records.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceStats {
    pub count: usize,
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub high: f64,
    pub low: f64,
    pub mean: f64,
    pub latest_price: f64,
    pub latest_date: NaiveDate,
}

impl PriceStats {
    /// `records` must be sorted by date. Returns `None` for an empty slice.
    #[must_use]
    pub fn from_records(records: &[PriceRecord]) -> Option<Self> {
        let first = records.first()?;
        let latest = records.last()?;
        let (high, low, sum) = records.iter().fold(
            (f64::MIN, f64::MAX, 0.0),
            |(high, low, sum), r| (high.max(r.close_price), low.min(r.close_price), sum + r.close_price),
        );
        Some(Self {
            count: records.len(),
            min_date: first.date,
            max_date: latest.date,
            high,
            low,
            mean: sum / records.len() as f64,
            latest_price: latest.close_price,
            latest_date: latest.date,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Close Price")]
    close_price: String,
}

/// The in-memory price table.
///
/// A table that failed to load stays unavailable for the life of the process and every
/// numeric answer degrades to [`DATA_UNAVAILABLE_MESSAGE`].
#[derive(Debug, Clone)]
pub struct StockData {
    source: String,
    records: Option<Vec<PriceRecord>>,
}

impl StockData {
    /// Loads the CSV at `path`. Read and parse failures are logged and leave the store
    /// unavailable instead of being returned.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Self {
        let source = path.as_ref().to_string_lossy().to_string();
        match read_price_file(path.as_ref()) {
            Ok(records) => {
                info!(records = records.len(), "Loaded stock price records");
                Self::from_records(source, records)
            }
            Err(e) => {
                error!(error = %e, "Error loading stock data");
                Self::unavailable(source)
            }
        }
    }

    /// Builds a store from already parsed records. Records are sorted by date and
    /// repeated dates keep their first occurrence.
    pub fn from_records(source: impl Into<String>, mut records: Vec<PriceRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        let before = records.len();
        records.dedup_by_key(|r| r.date);
        if records.len() != before {
            warn!(dropped = before - records.len(), "Dropped rows with duplicate dates");
        }
        let records = if records.is_empty() { None } else { Some(records) };
        Self {
            source: source.into(),
            records,
        }
    }

    pub fn unavailable(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            records: None,
        }
    }

    /// Identifier cited as the source of numeric answers.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.records.is_some()
    }

    #[must_use]
    pub fn records(&self) -> Option<&[PriceRecord]> {
        self.records.as_deref()
    }

    /// # Errors
    /// `StockError::Unavailable` when the table failed to load.
    pub fn summary_statistics(&self) -> Result<PriceStats, StockError> {
        self.records()
            .and_then(PriceStats::from_records)
            .ok_or(StockError::Unavailable)
    }

    /// Restricts the table to the first four-digit year mentioned in `query`, or returns
    /// the whole table when the query names no year.
    ///
    /// # Errors
    /// `StockError::Unavailable` when the table failed to load, and
    /// `StockError::NoDataForYear` when the named year has no records.
    pub fn filter_by_year(&self, query: &str) -> Result<&[PriceRecord], StockError> {
        let records = self.records().ok_or(StockError::Unavailable)?;
        let Some(token) = extract_year(query) else {
            return Ok(records);
        };
        let year: i32 = token
            .parse()
            .map_err(|_| StockError::NoDataForYear(token.to_string()))?;
        // sorted by date, so a year is one contiguous run
        let start = records.partition_point(|r| r.date.year() < year);
        let end = records.partition_point(|r| r.date.year() <= year);
        if start == end {
            return Err(StockError::NoDataForYear(token.to_string()));
        }
        Ok(&records[start..end])
    }

    /// Renders the answer to a numeric stock question.
    #[must_use]
    pub fn stats_response(&self, query: &str) -> String {
        let records = match self.filter_by_year(query) {
            Ok(records) => records,
            Err(StockError::NoDataForYear(year)) => {
                return format!("No stock data available for {year}.");
            }
            Err(_) => return DATA_UNAVAILABLE_MESSAGE.to_string(),
        };
        let Some(stats) = PriceStats::from_records(records) else {
            return "No data available for the specified criteria.".to_string();
        };

        let start = stats.min_date.format("%d-%b-%Y");
        let end = stats.max_date.format("%d-%b-%Y");
        let query = query.to_lowercase();
        if query.contains("highest") {
            format!(
                "The highest stock price was ₹{:.2} during the period {start} to {end}.",
                stats.high
            )
        } else if query.contains("lowest") {
            format!(
                "The lowest stock price was ₹{:.2} during the period {start} to {end}.",
                stats.low
            )
        } else if query.contains("average") {
            format!(
                "The average stock price was ₹{:.2} during the period {start} to {end}.",
                stats.mean
            )
        } else {
            format!(
                "Stock Price Summary for the period {start} to {end}:\n\n\
                 • Highest Price: ₹{:.2}\n\
                 • Lowest Price: ₹{:.2}\n\
                 • Average Price: ₹{:.2}\n\
                 • Latest Price: ₹{:.2}\n\
                 • Total Records: {}",
                stats.high, stats.low, stats.mean, stats.latest_price, stats.count
            )
        }
    }

    /// Text summary of the whole table, indexed for retrieval alongside the transcripts.
    #[must_use]
    pub fn summary_document(&self, company: &str) -> Option<Document> {
        let stats = self.summary_statistics().ok()?;
        let content = format!(
            "{company} Stock Price Data Summary:\n\
             - Total records: {}\n\
             - Date range: {} to {}\n\
             - Highest price: ₹{:.2}\n\
             - Lowest price: ₹{:.2}\n\
             - Average price: ₹{:.2}\n\
             - Latest price: ₹{:.2} on {}\n\n\
             The stock price data covers daily closing prices for {company} shares.\n\
             This data can be used for price analysis, trend identification, and performance evaluation.",
            stats.count,
            stats.min_date.format("%Y-%m-%d"),
            stats.max_date.format("%Y-%m-%d"),
            stats.high,
            stats.low,
            stats.mean,
            stats.latest_price,
            stats.latest_date.format("%Y-%m-%d"),
        );
        Some(Document::new(content, self.source.clone(), DocumentKind::StockData))
    }
}

/// True if the query mentions any stock keyword.
#[must_use]
pub fn is_stock_query(query: &str) -> bool {
    let query = query.to_lowercase();
    STOCK_KEYWORDS.iter().any(|k| query.contains(k))
}

/// First run of four ASCII digits in the query.
#[must_use]
pub fn extract_year(query: &str) -> Option<&str> {
    YEAR_PATTERN.find(query).map(|m| m.as_str())
}

fn read_price_file(path: &Path) -> Result<Vec<PriceRecord>, StockError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| StockError::Read(e.to_string()))?;

    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<PriceRow>().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = row.map_err(|e| StockError::MalformedRow {
            row: line,
            reason: e.to_string(),
        })?;
        let date = parse_day_first(&row.date).ok_or_else(|| StockError::MalformedRow {
            row: line,
            reason: format!("unrecognised date `{}`", row.date),
        })?;
        let close_price = parse_price(&row.close_price).ok_or_else(|| StockError::MalformedRow {
            row: line,
            reason: format!("invalid close price `{}`", row.close_price),
        })?;
        records.push(PriceRecord::new(date, close_price));
    }

    if records.is_empty() {
        return Err(StockError::Empty);
    }
    Ok(records)
}

fn parse_day_first(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
}

fn parse_price(raw: &str) -> Option<f64> {
    let price: f64 = raw.replace(',', "").parse().ok()?;
    (price.is_finite() && price >= 0.0).then_some(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store(records: Vec<PriceRecord>) -> StockData {
        StockData::from_records("prices.csv", records)
    }

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_day_first_csv() {
        let file = write_csv(
            "Date,Open Price,Close Price\n\
             03-01-2024,1,1610.50\n\
             02-Jan-2024,1,\"1,600.00\"\n\
             01/01/2024,1,1590.25\n",
        );
        let data = StockData::load(file.path());
        assert!(data.is_available());
        let records = data.records().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], PriceRecord::new(date(2024, 1, 1), 1590.25));
        assert_eq!(records[1], PriceRecord::new(date(2024, 1, 2), 1600.0));
        assert_eq!(records[2].date, date(2024, 1, 3));
    }

    #[test]
    fn test_load_failures_leave_store_unavailable() {
        let missing = StockData::load("/definitely/not/here.csv");
        assert!(!missing.is_available());
        assert_eq!(missing.source(), "/definitely/not/here.csv");

        let bad_date = write_csv("Date,Close Price\n2024/31/31,10\n");
        assert!(!StockData::load(bad_date.path()).is_available());

        let negative = write_csv("Date,Close Price\n01-01-2024,-4\n");
        assert!(!StockData::load(negative.path()).is_available());

        let no_column = write_csv("Date,Open\n01-01-2024,4\n");
        assert!(!StockData::load(no_column.path()).is_available());

        let empty = write_csv("Date,Close Price\n");
        assert!(!StockData::load(empty.path()).is_available());
    }

    #[test]
    fn test_summary_statistics() {
        let data = store(vec![
            PriceRecord::new(date(2023, 1, 2), 20.0),
            PriceRecord::new(date(2023, 1, 1), 10.0),
            PriceRecord::new(date(2023, 1, 3), 30.0),
        ]);
        let stats = data.summary_statistics().unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min_date, date(2023, 1, 1));
        assert_eq!(stats.max_date, date(2023, 1, 3));
        assert_eq!(stats.high, 30.0);
        assert_eq!(stats.low, 10.0);
        assert!((stats.mean - 20.0).abs() < f64::EPSILON);
        assert_eq!(stats.latest_price, 30.0);
        assert_eq!(stats.latest_date, date(2023, 1, 3));

        assert_eq!(
            StockData::unavailable("x").summary_statistics(),
            Err(StockError::Unavailable)
        );
    }

    #[test]
    fn test_duplicate_dates_keep_first() {
        let data = store(vec![
            PriceRecord::new(date(2023, 1, 1), 10.0),
            PriceRecord::new(date(2023, 1, 1), 99.0),
        ]);
        assert_eq!(data.records().unwrap(), &[PriceRecord::new(date(2023, 1, 1), 10.0)]);
    }

    #[test]
    fn test_filter_by_year() {
        let data = store(vec![
            PriceRecord::new(date(2022, 12, 30), 5.0),
            PriceRecord::new(date(2023, 3, 1), 10.0),
            PriceRecord::new(date(2023, 9, 1), 12.0),
            PriceRecord::new(date(2024, 1, 1), 15.0),
        ]);

        let filtered = data.filter_by_year("prices in 2023 please").unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| r.date.year() == 2023));

        let all = data.filter_by_year("all prices").unwrap();
        assert_eq!(all, data.records().unwrap());

        assert_eq!(
            data.filter_by_year("prices in 2019"),
            Err(StockError::NoDataForYear("2019".to_string()))
        );
        assert_eq!(
            StockData::unavailable("x").filter_by_year("2023"),
            Err(StockError::Unavailable)
        );
    }

    #[test]
    fn test_stats_response_average_without_year() {
        let data = store(vec![
            PriceRecord::new(date(2023, 1, 1), 10.0),
            PriceRecord::new(date(2023, 1, 2), 20.0),
            PriceRecord::new(date(2023, 1, 3), 30.0),
        ]);
        assert_eq!(
            data.stats_response("average price"),
            "The average stock price was ₹20.00 during the period 01-Jan-2023 to 03-Jan-2023."
        );
    }

    #[test]
    fn test_stats_response_branches() {
        let data = store(vec![
            PriceRecord::new(date(2023, 5, 1), 100.0),
            PriceRecord::new(date(2023, 6, 1), 150.5),
            PriceRecord::new(date(2023, 7, 1), 120.0),
        ]);
        assert_eq!(
            data.stats_response("What was the HIGHEST price in 2023?"),
            "The highest stock price was ₹150.50 during the period 01-May-2023 to 01-Jul-2023."
        );
        assert_eq!(
            data.stats_response("lowest share price"),
            "The lowest stock price was ₹100.00 during the period 01-May-2023 to 01-Jul-2023."
        );
        assert_eq!(
            data.stats_response("What was the highest stock price in 2024?"),
            "No stock data available for 2024."
        );

        let summary = data.stats_response("stock trend");
        assert!(summary.starts_with("Stock Price Summary for the period 01-May-2023 to 01-Jul-2023:"));
        assert!(summary.contains("• Highest Price: ₹150.50"));
        assert!(summary.contains("• Lowest Price: ₹100.00"));
        assert!(summary.contains("• Average Price: ₹123.50"));
        assert!(summary.contains("• Latest Price: ₹120.00"));
        assert!(summary.contains("• Total Records: 3"));
    }

    #[test]
    fn test_stats_response_unavailable() {
        let data = StockData::unavailable("prices.csv");
        assert_eq!(data.stats_response("highest price 2024"), DATA_UNAVAILABLE_MESSAGE);
    }

    #[test]
    fn test_is_stock_query() {
        assert!(is_stock_query("What is the Average?"));
        assert!(is_stock_query("share performance"));
        assert!(is_stock_query("TRADING volume"));
        assert!(!is_stock_query("What are recent business developments?"));
        assert!(!is_stock_query(""));
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("in 2024?"), Some("2024"));
        assert_eq!(extract_year("fy25 results"), None);
        assert_eq!(extract_year("2023 vs 2024"), Some("2023"));
        assert_eq!(extract_year("highest price in २०२४"), None);
    }

    #[test]
    fn test_non_ascii_digits_are_not_a_year() {
        let data = store(vec![
            PriceRecord::new(date(2023, 1, 1), 10.0),
            PriceRecord::new(date(2024, 1, 1), 40.0),
        ]);
        assert_eq!(
            data.stats_response("highest price in २०२४"),
            "The highest stock price was ₹40.00 during the period 01-Jan-2023 to 01-Jan-2024."
        );
    }

    #[test]
    fn test_summary_document() {
        let data = store(vec![
            PriceRecord::new(date(2023, 1, 1), 10.0),
            PriceRecord::new(date(2023, 1, 2), 20.0),
        ]);
        let doc = data.summary_document("Acme").unwrap();
        assert_eq!(doc.kind, DocumentKind::StockData);
        assert_eq!(doc.source, "prices.csv");
        assert!(doc.content.starts_with("Acme Stock Price Data Summary:"));
        assert!(doc.content.contains("- Date range: 2023-01-01 to 2023-01-02"));
        assert!(doc.content.contains("- Latest price: ₹20.00 on 2023-01-02"));

        assert!(StockData::unavailable("x").summary_document("Acme").is_none());
    }
}
