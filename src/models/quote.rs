use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Which query produced a price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    /// Provider "fast" snapshot (regular market price)
    Snapshot,
    /// Last non-missing 1-minute close
    IntradayBar,
    /// Last non-missing daily close within the lookback window
    DailyBar,
    /// 1-minute close extracted from a multi-symbol query
    BulkIntraday,
    /// Daily close extracted from a multi-symbol query
    BulkDaily,
}

impl fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuoteSource::Snapshot => "snapshot",
            QuoteSource::IntradayBar => "1m",
            QuoteSource::DailyBar => "1d",
            QuoteSource::BulkIntraday => "bulk-1m",
            QuoteSource::BulkDaily => "bulk-1d",
        };
        write!(f, "{}", name)
    }
}

/// A resolved live price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: f64,
    pub source: QuoteSource,
}

impl PriceQuote {
    /// Build a quote, rejecting NaN and infinities
    pub fn new(price: f64, source: QuoteSource) -> Option<Self> {
        finite(price).map(|price| Self { price, source })
    }
}

/// Keep a value only if it is a finite number
pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// Ticker -> resolved quote (None = unknown)
///
/// Holds an entry for every requested ticker and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceMap {
    quotes: HashMap<String, Option<PriceQuote>>,
}

impl PriceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a map where every ticker is still unknown
    pub fn with_tickers<'a, I>(tickers: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let quotes = tickers.into_iter().map(|t| (t.clone(), None)).collect();
        Self { quotes }
    }

    pub fn insert(&mut self, ticker: impl Into<String>, quote: Option<PriceQuote>) {
        self.quotes.insert(ticker.into(), quote);
    }

    /// Live price for a ticker (None when unknown or never requested)
    pub fn price(&self, ticker: &str) -> Option<f64> {
        self.quote(ticker).map(|q| q.price)
    }

    pub fn quote(&self, ticker: &str) -> Option<PriceQuote> {
        self.quotes.get(ticker).copied().flatten()
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.quotes.contains_key(ticker)
    }

    /// Tickers whose price is still unknown, in the order given by `order`
    pub fn missing<'a>(&self, order: &'a [String]) -> Vec<&'a String> {
        order
            .iter()
            .filter(|t| self.contains(t) && self.quote(t).is_none())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn resolved_count(&self) -> usize {
        self.quotes.values().filter(|q| q.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Option<PriceQuote>)> {
        self.quotes.iter()
    }
}
