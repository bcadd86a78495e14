use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CurrencyPolicy, Exchange, SheetSchema};
use crate::constants::*;
use crate::utils::{env_or, env_string};

/// One step of the single-symbol price resolution chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveStep {
    /// Provider regular-market-price snapshot
    Snapshot,
    /// Last 1-minute bar close
    Intraday,
    /// Last daily bar close within the lookback window
    Daily,
}

impl ResolveStep {
    /// Snapshot first (cheapest), daily last (most reliable)
    pub fn default_chain() -> Vec<ResolveStep> {
        vec![ResolveStep::Snapshot, ResolveStep::Intraday, ResolveStep::Daily]
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "snapshot" | "fast" => Ok(ResolveStep::Snapshot),
            "intraday" | "1m" | "minute" => Ok(ResolveStep::Intraday),
            "daily" | "1d" => Ok(ResolveStep::Daily),
            _ => Err(format!("Invalid resolve step: '{}'. Valid values: snapshot, intraday, daily", s)),
        }
    }

    /// Parse a comma-separated chain ("snapshot,intraday,daily")
    pub fn parse_chain(s: &str) -> Result<Vec<Self>, String> {
        let mut chain = Vec::new();
        for part in s.split(',').filter(|p| !p.trim().is_empty()) {
            let step = ResolveStep::from_str(part)?;
            if !chain.contains(&step) {
                chain.push(step);
            }
        }
        if chain.is_empty() {
            return Err("resolve chain must contain at least one step".to_string());
        }
        Ok(chain)
    }
}

/// How the batch price fetcher talks to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// One symbol at a time, in input order, with progress after each
    Sequential,
    /// Multi-symbol queries first, single-symbol chain for the leftovers
    #[default]
    Bulk,
}

impl FetchStrategy {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "sequential" | "seq" => Ok(FetchStrategy::Sequential),
            "bulk" => Ok(FetchStrategy::Bulk),
            _ => Err(format!("Invalid strategy: '{}'. Valid values: sequential, bulk", s)),
        }
    }
}

/// Request-scoped panel configuration
#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub exchange: Exchange,
    pub schema: SheetSchema,
    pub currency_policy: CurrencyPolicy,
    pub strategy: FetchStrategy,
    pub resolve_chain: Vec<ResolveStep>,

    /// Timeout of every HTTP request (sheet and provider)
    pub http_timeout: Duration,
    /// Retries after the first attempt for retryable failures
    pub max_retries: u32,
    /// Pause between single-symbol lookups
    pub fetch_delay: Duration,

    pub bulk_batch_size: usize,
    pub bulk_concurrency: usize,

    pub intraday_lookback_days: i64,
    pub daily_lookback_days: i64,

    pub sheet_cache_ttl: Duration,
    pub price_cache_ttl: Duration,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            exchange: Exchange::default(),
            schema: SheetSchema::default(),
            currency_policy: CurrencyPolicy::default(),
            strategy: FetchStrategy::default(),
            resolve_chain: ResolveStep::default_chain(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            fetch_delay: Duration::from_millis(DEFAULT_FETCH_DELAY_MS),
            bulk_batch_size: DEFAULT_BULK_BATCH_SIZE,
            bulk_concurrency: DEFAULT_BULK_CONCURRENCY,
            intraday_lookback_days: DEFAULT_INTRADAY_LOOKBACK_DAYS,
            daily_lookback_days: DEFAULT_DAILY_LOOKBACK_DAYS,
            sheet_cache_ttl: Duration::from_secs(DEFAULT_SHEET_CACHE_TTL_SECS),
            price_cache_ttl: Duration::from_secs(DEFAULT_PRICE_CACHE_TTL_SECS),
        }
    }
}

impl PanelConfig {
    /// Defaults overlaid with `AVWAP_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let exchange = Exchange::new(
            env_string("AVWAP_EXCHANGE_CODE").unwrap_or(defaults.exchange.code.clone()),
            env_string("AVWAP_EXCHANGE_SUFFIX").unwrap_or(defaults.exchange.suffix.clone()),
            env_string("AVWAP_HOME_CURRENCY").unwrap_or(defaults.exchange.currency.clone()),
        );

        let resolve_chain = match env_string("AVWAP_RESOLVE_CHAIN") {
            Some(raw) => ResolveStep::parse_chain(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring AVWAP_RESOLVE_CHAIN");
                defaults.resolve_chain.clone()
            }),
            None => defaults.resolve_chain.clone(),
        };

        Self {
            exchange,
            resolve_chain,
            http_timeout: Duration::from_secs(env_or("AVWAP_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)),
            max_retries: env_or("AVWAP_MAX_RETRIES", DEFAULT_MAX_RETRIES),
            fetch_delay: Duration::from_millis(env_or("AVWAP_FETCH_DELAY_MS", DEFAULT_FETCH_DELAY_MS)),
            bulk_batch_size: env_or("AVWAP_BULK_BATCH_SIZE", DEFAULT_BULK_BATCH_SIZE).max(1),
            bulk_concurrency: env_or("AVWAP_BULK_CONCURRENCY", DEFAULT_BULK_CONCURRENCY).max(1),
            intraday_lookback_days: env_or("AVWAP_INTRADAY_LOOKBACK_DAYS", DEFAULT_INTRADAY_LOOKBACK_DAYS).max(1),
            daily_lookback_days: env_or("AVWAP_DAILY_LOOKBACK_DAYS", DEFAULT_DAILY_LOOKBACK_DAYS).max(1),
            sheet_cache_ttl: Duration::from_secs(env_or("AVWAP_SHEET_CACHE_TTL_SECS", DEFAULT_SHEET_CACHE_TTL_SECS)),
            price_cache_ttl: Duration::from_secs(env_or("AVWAP_PRICE_CACHE_TTL_SECS", DEFAULT_PRICE_CACHE_TTL_SECS)),
            ..defaults
        }
    }

    /// Calendar days of bars requested for an interval
    pub fn lookback_days(&self, interval: super::Interval) -> i64 {
        match interval {
            super::Interval::Minute => self.intraday_lookback_days,
            super::Interval::Daily => self.daily_lookback_days,
        }
    }
}
