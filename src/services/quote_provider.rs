use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::models::{finite, Interval};

#[derive(Debug)]
pub enum ProviderError {
    Http(reqwest::Error),
    Serialization(serde_json::Error),
    InvalidResponse(String),
    RateLimit,
    NoData,
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        ProviderError::Http(error)
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(error: serde_json::Error) -> Self {
        ProviderError::Serialization(error)
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::Http(e) => write!(f, "HTTP error: {}", e),
            ProviderError::Serialization(e) => write!(f, "Serialization error: {}", e),
            ProviderError::InvalidResponse(s) => write!(f, "Invalid response: {}", s),
            ProviderError::RateLimit => write!(f, "Rate limit exceeded"),
            ProviderError::NoData => write!(f, "No data available"),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProviderError::Http(e) => Some(e),
            ProviderError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

/// One price bar; `close` is None when the provider left a gap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub time: DateTime<Utc>,
    pub close: Option<f64>,
}

/// Close of the most recent bar that carries a finite value
pub fn last_close(bars: &[Bar]) -> Option<f64> {
    bars.iter().rev().find_map(|bar| bar.close.and_then(finite))
}

/// Market-data source used by the price resolver and the batch fetcher
///
/// Symbols are already in provider format (see `symbol_mapper`).
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Cheap "latest known price" for a symbol, `Ok(None)` when the provider has none
    async fn snapshot(&self, symbol: &str) -> Result<Option<f64>, ProviderError>;

    /// Bars for one symbol covering the last `lookback_days` calendar days, oldest first
    async fn history(
        &self,
        symbol: &str,
        interval: Interval,
        lookback_days: i64,
    ) -> Result<Vec<Bar>, ProviderError>;

    /// Bars for many symbols in one request, keyed by upper-cased symbol
    ///
    /// Symbols the provider did not return are simply absent from the map.
    async fn bulk_history(
        &self,
        symbols: &[String],
        interval: Interval,
        lookback_days: i64,
    ) -> Result<HashMap<String, Vec<Bar>>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(minute: u32, close: Option<f64>) -> Bar {
        Bar {
            time: Utc.with_ymd_and_hms(2025, 3, 14, 10, minute, 0).unwrap(),
            close,
        }
    }

    #[test]
    fn test_last_close_skips_gaps_and_nan() {
        let bars = vec![bar(0, Some(10.0)), bar(1, Some(10.5)), bar(2, None), bar(3, Some(f64::NAN))];
        assert_eq!(last_close(&bars), Some(10.5));
    }

    #[test]
    fn test_last_close_empty() {
        assert_eq!(last_close(&[]), None);
        assert_eq!(last_close(&[bar(0, None)]), None);
    }
}
