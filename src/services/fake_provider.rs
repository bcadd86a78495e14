//! In-memory `QuoteProvider` for tests

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::models::Interval;
use crate::services::quote_provider::{Bar, ProviderError, QuoteProvider};

/// Canned answers per symbol; anything not configured fails with `NoData`
#[derive(Default)]
pub struct FakeProvider {
    pub snapshots: HashMap<String, f64>,
    pub intraday: HashMap<String, f64>,
    pub daily: HashMap<String, f64>,
    pub bulk_fails: bool,
    pub calls: AtomicUsize,
    pub bulk_calls: AtomicUsize,
    pub single_lookups: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, symbol: &str, price: f64) -> Self {
        self.snapshots.insert(symbol.to_string(), price);
        self
    }

    pub fn with_intraday(mut self, symbol: &str, price: f64) -> Self {
        self.intraday.insert(symbol.to_string(), price);
        self
    }

    pub fn with_daily(mut self, symbol: &str, price: f64) -> Self {
        self.daily.insert(symbol.to_string(), price);
        self
    }

    pub fn failing_bulk(mut self) -> Self {
        self.bulk_fails = true;
        self
    }

    pub fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Symbols that went through `snapshot`, in call order
    pub fn looked_up(&self) -> Vec<String> {
        self.single_lookups.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn bars(&self, symbol: &str, interval: Interval) -> Option<Vec<Bar>> {
        let table = match interval {
            Interval::Minute => &self.intraday,
            Interval::Daily => &self.daily,
        };
        let close = *table.get(symbol)?;
        let time = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();
        Some(vec![
            Bar { time: time - chrono::Duration::minutes(1), close: Some(close - 1.0) },
            Bar { time, close: Some(close) },
        ])
    }
}

#[async_trait]
impl QuoteProvider for FakeProvider {
    async fn snapshot(&self, symbol: &str) -> Result<Option<f64>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut lookups) = self.single_lookups.lock() {
            lookups.push(symbol.to_string());
        }
        match self.snapshots.get(symbol) {
            Some(price) => Ok(Some(*price)),
            None => Err(ProviderError::NoData),
        }
    }

    async fn history(
        &self,
        symbol: &str,
        interval: Interval,
        _lookback_days: i64,
    ) -> Result<Vec<Bar>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bars(symbol, interval).ok_or(ProviderError::NoData)
    }

    async fn bulk_history(
        &self,
        symbols: &[String],
        interval: Interval,
        _lookback_days: i64,
    ) -> Result<HashMap<String, Vec<Bar>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        if self.bulk_fails {
            return Err(ProviderError::RateLimit);
        }
        Ok(symbols
            .iter()
            .filter_map(|s| self.bars(s, interval).map(|bars| (s.to_uppercase(), bars)))
            .collect())
    }
}
