//! Google Sheets loader
//!
//! Turns a sheet link into its CSV export address, downloads it with an
//! explicit timeout and parses it into a table whose headers are normalized
//! so that cosmetic differences ("AVWAP ( TRY )", non-breaking spaces) do not
//! break column lookups.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::services::cache::TtlCache;
use crate::services::number_parser::parse_localized_number;

const EXPORT_BASE_URL: &str = "https://docs.google.com/spreadsheets/d";

/// Build the CSV export URL for a sheet link
///
/// The document id is the path segment after `/d/`; a `gid=` parameter in
/// the query or fragment selects the tab.
pub fn export_url(reference: &str) -> Result<String> {
    export_url_with_base(EXPORT_BASE_URL, reference)
}

fn export_url_with_base(base_url: &str, reference: &str) -> Result<String> {
    let reference = reference.trim();
    let (_, tail) = reference
        .split_once("/d/")
        .ok_or_else(|| AppError::InvalidReference(format!("no '/d/<id>' segment in '{}'", reference)))?;

    let sheet_id: String = tail
        .chars()
        .take_while(|c| !matches!(c, '/' | '?' | '#'))
        .collect();

    if sheet_id.is_empty() || !sheet_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(AppError::InvalidReference(format!(
            "could not read a document id from '{}'",
            reference
        )));
    }

    let mut url = format!("{}/{}/export?format=csv", base_url, sheet_id);
    if let Some(gid) = extract_gid(tail) {
        url.push_str("&gid=");
        url.push_str(&gid);
    }
    Ok(url)
}

/// `gid` value of the query or fragment; only a whole `gid=` parameter counts
fn extract_gid(tail: &str) -> Option<String> {
    tail.split(['?', '&', '#'])
        .skip(1)
        .find_map(|param| param.strip_prefix("gid="))
        .map(|value| value.chars().take_while(|c| c.is_ascii_digit()).collect::<String>())
        .filter(|gid| !gid.is_empty())
}

/// Canonical form of a column header
///
/// NBSP and BOM become spaces, whitespace runs collapse to one space, spaces
/// directly inside parentheses are removed and the result is trimmed.
pub fn normalize_header(raw: &str) -> String {
    let mut collapsed = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.chars() {
        if c.is_whitespace() || c == '\u{00A0}' || c == '\u{FEFF}' {
            pending_space = true;
            continue;
        }
        if pending_space {
            // "( x" and "x )" lose their inner space
            if !collapsed.is_empty() && !collapsed.ends_with('(') && c != ')' {
                collapsed.push(' ');
            }
            pending_space = false;
        }
        collapsed.push(c);
    }

    collapsed
}

/// Parsed sheet with normalized headers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetTable {
    pub headers: Vec<String>,
    /// Every row padded to `headers.len()`
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    /// Index of a column; first match wins when normalized headers collide
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = normalize_header(name);
        self.headers.iter().position(|h| *h == wanted)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Required columns absent from the table, in the given order
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| normalize_header(c))
            .collect()
    }

    /// Raw cell value
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(|s| s.as_str())
    }

    /// Cell parsed with the locale-aware number parser
    pub fn number(&self, row: usize, column: usize) -> Option<f64> {
        self.cell(row, column).and_then(parse_localized_number)
    }

    /// Distinct non-empty tickers of a column, in sheet order
    pub fn tickers(&self, column: &str) -> Vec<String> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut tickers = Vec::new();
        for row in &self.rows {
            let ticker = row.get(idx).map(|s| s.trim()).unwrap_or("");
            if !ticker.is_empty() && seen.insert(ticker.to_string()) {
                tickers.push(ticker.to_string());
            }
        }
        tickers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse CSV text (header row first) into a `SheetTable`
pub fn parse_sheet_csv(text: &str) -> Result<SheetTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
    let width = headers.len();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let mut row: Vec<String> = record.iter().map(|f| f.to_string()).collect();
        row.resize(width.max(row.len()), String::new());
        row.truncate(width);
        rows.push(row);
    }

    debug!(columns = width, rows = rows.len(), headers = ?headers, "Parsed sheet CSV");
    Ok(SheetTable { headers, rows })
}

/// Downloads sheets and keeps them for a bounded time window
pub struct SheetLoader {
    client: reqwest::Client,
    base_url: String,
    cache: TtlCache<String, Arc<SheetTable>>,
}

impl SheetLoader {
    pub fn new(timeout: Duration, cache_ttl: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: EXPORT_BASE_URL.to_string(),
            cache: TtlCache::new(cache_ttl),
        })
    }

    /// Download exports from another host (mirrors, local test servers)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Load a sheet by reference, using the cache when the entry is still fresh
    pub async fn load(&self, reference: &str) -> Result<Arc<SheetTable>> {
        let key = reference.trim().to_string();
        if let Some(table) = self.cache.get(&key).await {
            debug!(reference = %key, "Sheet served from cache");
            return Ok(table);
        }

        let url = export_url_with_base(&self.base_url, &key)?;
        let text = self.download(&url).await?;
        let table = Arc::new(parse_sheet_csv(&text)?);

        info!(rows = table.len(), columns = table.headers.len(), "Sheet loaded");
        self.cache.insert(key, table.clone()).await;
        Ok(table)
    }

    /// Forget a cached sheet so the next `load` downloads it again
    pub async fn invalidate(&self, reference: &str) {
        self.cache.invalidate(&reference.trim().to_string()).await;
    }

    async fn download(&self, url: &str) -> Result<String> {
        debug!(url = url, "Downloading sheet");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("sheet request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Fetch(format!("sheet download returned status {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::Fetch(format!("failed to read sheet body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_server::TestServer;

    const SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/1AbC_d-9xyz/edit#gid=123456";

    #[test]
    fn test_export_url_with_gid() {
        assert_eq!(
            export_url(SHEET_URL).unwrap(),
            "https://docs.google.com/spreadsheets/d/1AbC_d-9xyz/export?format=csv&gid=123456"
        );
    }

    #[test]
    fn test_export_url_without_gid() {
        assert_eq!(
            export_url("https://docs.google.com/spreadsheets/d/1AbC/edit?usp=sharing").unwrap(),
            "https://docs.google.com/spreadsheets/d/1AbC/export?format=csv"
        );
    }

    #[test]
    fn test_export_url_ignores_gid_inside_other_parameters() {
        assert_eq!(
            export_url("https://docs.google.com/spreadsheets/d/1AbC/edit?xgid=5").unwrap(),
            "https://docs.google.com/spreadsheets/d/1AbC/export?format=csv"
        );
        assert_eq!(
            export_url("https://docs.google.com/spreadsheets/d/1AbC/edit?usp=sharing&gid=42").unwrap(),
            "https://docs.google.com/spreadsheets/d/1AbC/export?format=csv&gid=42"
        );
    }

    #[test]
    fn test_export_url_rejects_missing_id() {
        for reference in ["", "https://example.com/sheet", "https://docs.google.com/spreadsheets/d/", "https://docs.google.com/spreadsheets/d//edit"] {
            assert!(
                matches!(export_url(reference), Err(AppError::InvalidReference(_))),
                "reference {:?}",
                reference
            );
        }
    }

    #[test]
    fn test_normalize_header_equivalences() {
        let expected = "AVWAP (TRY)";
        assert_eq!(normalize_header("AVWAP (TRY)"), expected);
        assert_eq!(normalize_header("AVWAP ( TRY )"), expected);
        assert_eq!(normalize_header("AVWAP\u{00A0}(TRY)"), expected);
        assert_eq!(normalize_header("  AVWAP   (TRY)  "), expected);
        assert_eq!(normalize_header("\u{FEFF}Ticker"), "Ticker");
        assert_eq!(normalize_header("AVWAP HEDEF+4 ( EUR )"), "AVWAP HEDEF+4 (EUR)");
    }

    #[test]
    fn test_parse_sheet_csv() {
        let csv = "Ticker,AVWAP ( TRY ),AVWAP\u{00A0}(EUR)\nTHYAO,\"300,50\",\"7,10\"\n,,\nASELS,\"1.234,56\"\n";
        let table = parse_sheet_csv(csv).unwrap();

        assert_eq!(table.headers, vec!["Ticker", "AVWAP (TRY)", "AVWAP (EUR)"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1], vec!["ASELS", "1.234,56", ""]);

        let try_idx = table.column_index("AVWAP (TRY)").unwrap();
        assert_eq!(table.number(0, try_idx), Some(300.5));
        assert_eq!(table.number(1, try_idx), Some(1234.56));
        let eur_idx = table.column_index("AVWAP  ( EUR)").unwrap();
        assert_eq!(table.number(1, eur_idx), None);
    }

    #[test]
    fn test_missing_columns_lists_all() {
        let table = parse_sheet_csv("Symbol,AVWAP (TRY)\nA,1\n").unwrap();
        assert_eq!(
            table.missing_columns(&["Ticker", "AVWAP (TRY)", "AVWAP (EUR)"]),
            vec!["Ticker", "AVWAP (EUR)"]
        );
    }

    #[test]
    fn test_tickers_trimmed_and_deduplicated() {
        let table = parse_sheet_csv("Ticker,X\n THYAO ,1\nASELS,2\nTHYAO,3\n ,4\n").unwrap();
        assert_eq!(table.tickers("Ticker"), vec!["THYAO", "ASELS"]);
        assert!(table.tickers("Nope").is_empty());
    }

    #[tokio::test]
    async fn test_load_downloads_and_caches() {
        let server = TestServer::start(vec![(200, "Ticker,AVWAP (TRY)\nTHYAO,\"300,50\"\n".to_string())]).await;
        let loader = SheetLoader::new(Duration::from_secs(5), Duration::from_secs(60))
            .unwrap()
            .with_base_url(&server.url);

        let table = loader.load(SHEET_URL).await.unwrap();
        assert_eq!(table.tickers("Ticker"), vec!["THYAO"]);
        assert_eq!(server.requests(), vec!["/1AbC_d-9xyz/export?format=csv&gid=123456"]);

        loader.load(SHEET_URL).await.unwrap();
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_load_error_status_is_fetch_error() {
        let server = TestServer::start(vec![(500, "oops".to_string())]).await;
        let loader = SheetLoader::new(Duration::from_secs(5), Duration::from_secs(60))
            .unwrap()
            .with_base_url(&server.url);

        let err = loader.load(SHEET_URL).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)), "got {:?}", err);
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_load_timeout_is_fetch_error() {
        let server = TestServer::silent().await;
        let loader = SheetLoader::new(Duration::from_millis(200), Duration::from_secs(60))
            .unwrap()
            .with_base_url(&server.url);

        let err = loader.load(SHEET_URL).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_load_rejects_bad_reference_before_network() {
        let loader = SheetLoader::new(Duration::from_secs(1), Duration::from_secs(60)).unwrap();
        let err = loader.load("not a sheet link").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidReference(_)));
    }
}
