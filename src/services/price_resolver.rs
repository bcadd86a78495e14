use std::sync::Arc;

use tracing::debug;

use crate::models::{finite, Interval, PanelConfig, PriceQuote, QuoteSource, ResolveStep};
use crate::services::quote_provider::{last_close, ProviderError, QuoteProvider};

/// Single-symbol price lookup through an ordered fallback chain
///
/// The first step that yields a finite price wins. Step failures are logged
/// and swallowed, so `resolve` only ever answers "price" or "unknown".
#[derive(Clone)]
pub struct PriceResolver {
    provider: Arc<dyn QuoteProvider>,
    chain: Vec<ResolveStep>,
    intraday_lookback_days: i64,
    daily_lookback_days: i64,
}

impl PriceResolver {
    pub fn new(provider: Arc<dyn QuoteProvider>, chain: Vec<ResolveStep>) -> Self {
        Self {
            provider,
            chain,
            intraday_lookback_days: Interval::Minute.default_lookback_days(),
            daily_lookback_days: Interval::Daily.default_lookback_days(),
        }
    }

    pub fn from_config(provider: Arc<dyn QuoteProvider>, config: &PanelConfig) -> Self {
        Self {
            provider,
            chain: config.resolve_chain.clone(),
            intraday_lookback_days: config.lookback_days(Interval::Minute),
            daily_lookback_days: config.lookback_days(Interval::Daily),
        }
    }

    /// Live price of a provider symbol, or None when every step failed
    pub async fn resolve(&self, symbol: &str) -> Option<PriceQuote> {
        if symbol.is_empty() {
            return None;
        }

        for step in &self.chain {
            match self.try_step(symbol, *step).await {
                Ok(Some(quote)) => {
                    debug!(symbol = symbol, source = %quote.source, price = quote.price, "Price resolved");
                    return Some(quote);
                }
                Ok(None) => {
                    debug!(symbol = symbol, step = ?step, "No usable price");
                }
                Err(e) => {
                    debug!(symbol = symbol, step = ?step, error = %e, "Price step failed");
                }
            }
        }

        debug!(symbol = symbol, "Price unavailable");
        None
    }

    async fn try_step(&self, symbol: &str, step: ResolveStep) -> Result<Option<PriceQuote>, ProviderError> {
        let quote = match step {
            ResolveStep::Snapshot => self
                .provider
                .snapshot(symbol)
                .await?
                .and_then(finite)
                .and_then(|p| PriceQuote::new(p, QuoteSource::Snapshot)),
            ResolveStep::Intraday => {
                let bars = self
                    .provider
                    .history(symbol, Interval::Minute, self.intraday_lookback_days)
                    .await?;
                last_close(&bars).and_then(|p| PriceQuote::new(p, QuoteSource::IntradayBar))
            }
            ResolveStep::Daily => {
                let bars = self
                    .provider
                    .history(symbol, Interval::Daily, self.daily_lookback_days)
                    .await?;
                last_close(&bars).and_then(|p| PriceQuote::new(p, QuoteSource::DailyBar))
            }
        };
        Ok(quote)
    }
}
