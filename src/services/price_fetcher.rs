use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::models::{Exchange, FetchStrategy, Interval, PanelConfig, PriceMap, PriceQuote, QuoteSource};
use crate::services::price_resolver::PriceResolver;
use crate::services::quote_provider::{last_close, QuoteProvider};
use crate::services::symbol_mapper::map_symbol;

/// Progress callback: (tickers done, tickers total, current ticker)
pub type FetchProgressCallback = Box<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Fetches live prices for a list of sheet tickers
pub struct PriceFetcher {
    provider: Arc<dyn QuoteProvider>,
    resolver: PriceResolver,
    strategy: FetchStrategy,
    fetch_delay: Duration,
    batch_size: usize,
    concurrent_batches: usize,
    intraday_lookback_days: i64,
    daily_lookback_days: i64,
    progress: Option<FetchProgressCallback>,
}

impl PriceFetcher {
    pub fn from_config(provider: Arc<dyn QuoteProvider>, config: &PanelConfig) -> Self {
        Self {
            resolver: PriceResolver::from_config(provider.clone(), config),
            provider,
            strategy: config.strategy,
            fetch_delay: config.fetch_delay,
            batch_size: config.bulk_batch_size.max(1),
            concurrent_batches: config.bulk_concurrency.max(1),
            intraday_lookback_days: config.lookback_days(Interval::Minute),
            daily_lookback_days: config.lookback_days(Interval::Daily),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: FetchProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    fn report(&self, done: usize, total: usize, ticker: &str) {
        if let Some(ref progress) = self.progress {
            progress(done, total, ticker);
        }
    }

    /// Resolve a price for every distinct ticker
    ///
    /// The returned map holds one entry per requested ticker (None when no
    /// price could be found) and nothing else. Provider failures never abort
    /// the fetch.
    pub async fn fetch_all(&self, tickers: &[String], exchange: &Exchange) -> PriceMap {
        let mut unique: Vec<String> = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            if !unique.contains(ticker) {
                unique.push(ticker.clone());
            }
        }

        if unique.is_empty() {
            return PriceMap::new();
        }

        let started = Instant::now();
        info!(
            ticker_count = unique.len(),
            strategy = ?self.strategy,
            exchange = %exchange.code,
            "Fetching prices"
        );

        let prices = match self.strategy {
            FetchStrategy::Sequential => self.fetch_sequential(&unique, exchange).await,
            FetchStrategy::Bulk => self.fetch_bulk(&unique, exchange).await,
        };

        info!(
            resolved = prices.resolved_count(),
            total = prices.len(),
            duration_s = started.elapsed().as_secs_f64(),
            "Price fetch completed"
        );
        prices
    }

    async fn fetch_sequential(&self, tickers: &[String], exchange: &Exchange) -> PriceMap {
        let mut prices = PriceMap::with_tickers(tickers);
        let total = tickers.len();

        for (idx, ticker) in tickers.iter().enumerate() {
            let symbol = map_symbol(ticker, &exchange.suffix);
            prices.insert(ticker.clone(), self.resolver.resolve(&symbol).await);
            self.report(idx + 1, total, ticker);

            if idx + 1 < total && !self.fetch_delay.is_zero() {
                tokio::time::sleep(self.fetch_delay).await;
            }
        }

        prices
    }

    async fn fetch_bulk(&self, tickers: &[String], exchange: &Exchange) -> PriceMap {
        let mut prices = PriceMap::with_tickers(tickers);
        let total = tickers.len();

        // Several sheet tickers may share one provider symbol ("thyao" and "THYAO")
        let mut symbol_tickers: HashMap<String, Vec<String>> = HashMap::new();
        let mut symbols: Vec<String> = Vec::new();
        for ticker in tickers {
            let symbol = map_symbol(ticker, &exchange.suffix);
            if symbol.is_empty() {
                continue;
            }
            let entry = symbol_tickers.entry(symbol.clone()).or_default();
            if entry.is_empty() {
                symbols.push(symbol);
            }
            entry.push(ticker.clone());
        }

        let passes = [
            (Interval::Minute, QuoteSource::BulkIntraday, self.intraday_lookback_days),
            (Interval::Daily, QuoteSource::BulkDaily, self.daily_lookback_days),
        ];

        let mut pending = symbols;
        for (interval, source, lookback_days) in passes {
            if pending.is_empty() {
                break;
            }
            let found = self.bulk_pass(&pending, interval, source, lookback_days).await;
            for (symbol, quote) in &found {
                if let Some(owners) = symbol_tickers.get(symbol) {
                    for ticker in owners {
                        prices.insert(ticker.clone(), Some(*quote));
                    }
                }
            }
            pending.retain(|s| !found.contains_key(s));
            debug!(interval = %interval, still_missing = pending.len(), "Bulk pass finished");
            self.report(prices.resolved_count(), total, "");
        }

        if !pending.is_empty() {
            info!(count = pending.len(), "Resolving remaining symbols one by one");
        }

        for (idx, symbol) in pending.iter().enumerate() {
            let quote = self.resolver.resolve(symbol).await;
            if let Some(owners) = symbol_tickers.get(symbol) {
                for ticker in owners {
                    prices.insert(ticker.clone(), quote);
                }
                if let Some(first) = owners.first() {
                    self.report(prices.resolved_count(), total, first);
                }
            }

            if idx + 1 < pending.len() && !self.fetch_delay.is_zero() {
                tokio::time::sleep(self.fetch_delay).await;
            }
        }

        prices
    }

    /// One multi-symbol query per chunk, `concurrent_batches` chunks at a time
    ///
    /// Returns the symbols with an extractable price. A failing chunk simply
    /// contributes nothing.
    async fn bulk_pass(
        &self,
        symbols: &[String],
        interval: Interval,
        source: QuoteSource,
        lookback_days: i64,
    ) -> HashMap<String, PriceQuote> {
        let mut found = HashMap::new();

        let batches: Vec<Vec<String>> = symbols.chunks(self.batch_size).map(|c| c.to_vec()).collect();
        let total_batches = batches.len();

        for (group_idx, batch_group) in batches.chunks(self.concurrent_batches).enumerate() {
            let mut tasks = Vec::new();

            for (i, batch) in batch_group.iter().enumerate() {
                let batch_idx = group_idx * self.concurrent_batches + i;
                let batch = batch.clone();
                let provider = self.provider.clone();

                tasks.push(tokio::spawn(async move {
                    let api_start = Instant::now();
                    let result = provider.bulk_history(&batch, interval, lookback_days).await;
                    (batch_idx, batch, result, api_start.elapsed())
                }));
            }

            let results = futures::future::join_all(tasks).await;

            for task_result in results {
                let (batch_idx, batch, api_result, api_elapsed) = match task_result {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(error = %e, "Bulk task join error");
                        continue;
                    }
                };

                match api_result {
                    Ok(batch_data) => {
                        debug!(
                            batch_num = batch_idx + 1,
                            total_batches = total_batches,
                            returned = batch_data.len(),
                            requested = batch.len(),
                            duration_s = api_elapsed.as_secs_f64(),
                            "Bulk batch completed"
                        );
                        for symbol in &batch {
                            let quote = batch_data
                                .get(&symbol.to_uppercase())
                                .and_then(|bars| last_close(bars))
                                .and_then(|p| PriceQuote::new(p, source));
                            if let Some(quote) = quote {
                                found.insert(symbol.clone(), quote);
                            }
                        }
                    }
                    Err(e) => {
                        warn!(
                            batch_num = batch_idx + 1,
                            total_batches = total_batches,
                            interval = %interval,
                            error = %e,
                            "Bulk batch failed, symbols left for fallback"
                        );
                    }
                }
            }
        }

        found
    }
}
