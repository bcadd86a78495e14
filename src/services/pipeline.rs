//! Sheet -> prices -> evaluated rows
//!
//! `PanelContext` owns everything that lives longer than one refresh: the
//! provider client, the sheet cache and the price cache. Each call to `run`
//! is otherwise independent.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::models::{CurrencyPolicy, DisplayRow, FetchStrategy, PanelConfig, PriceMap};
use crate::services::cache::TtlCache;
use crate::services::price_fetcher::{FetchProgressCallback, PriceFetcher};
use crate::services::quote_provider::QuoteProvider;
use crate::services::sheet_loader::{SheetLoader, SheetTable};
use crate::services::target_evaluator::{check_schema, evaluate};
use crate::services::yahoo::YahooClient;

/// Which part of the sheet to show
#[derive(Debug, Clone, Default)]
pub struct PanelRequest {
    pub sheet_reference: String,
    /// Only these tickers (case-insensitive); all rows when None
    pub tickers: Option<Vec<String>>,
    /// At most this many tickers, in sheet order
    pub limit: Option<usize>,
}

impl PanelRequest {
    pub fn new(sheet_reference: impl Into<String>) -> Self {
        Self {
            sheet_reference: sheet_reference.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PanelReport {
    pub generated_at: DateTime<Utc>,
    pub strategy: FetchStrategy,
    pub currency_policy: CurrencyPolicy,
    /// Tickers whose prices were requested, in sheet order
    pub requested: Vec<String>,
    pub rows: Vec<DisplayRow>,
    pub prices: PriceMap,
    /// True when the price map came from the price cache
    pub from_cache: bool,
}

impl PanelReport {
    pub fn reached_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.reached_count() > 0).count()
    }

    pub fn unresolved(&self) -> Vec<&String> {
        self.prices.missing(&self.requested)
    }
}

type PriceCacheKey = (String, Vec<String>);

pub struct PanelContext {
    config: PanelConfig,
    provider: Arc<dyn QuoteProvider>,
    sheets: SheetLoader,
    price_cache: TtlCache<PriceCacheKey, PriceMap>,
}

impl PanelContext {
    /// Context backed by Yahoo Finance
    pub fn new(config: PanelConfig) -> Result<Self> {
        let client = YahooClient::new(config.http_timeout, config.max_retries)
            .map_err(|e| AppError::Config(format!("Failed to create Yahoo client: {}", e)))?;
        Self::with_provider(config, Arc::new(client))
    }

    pub fn with_provider(config: PanelConfig, provider: Arc<dyn QuoteProvider>) -> Result<Self> {
        let sheets = SheetLoader::new(config.http_timeout, config.sheet_cache_ttl)?;
        let price_cache = TtlCache::new(config.price_cache_ttl);
        Ok(Self {
            config,
            provider,
            sheets,
            price_cache,
        })
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Download (or reuse) the sheet
    pub async fn load_sheet(&self, reference: &str) -> Result<Arc<SheetTable>> {
        self.sheets.load(reference).await
    }

    /// Resolve prices for tickers outside of any sheet
    pub async fn fetch_prices(&self, tickers: &[String], progress: Option<FetchProgressCallback>) -> PriceMap {
        let mut fetcher = PriceFetcher::from_config(self.provider.clone(), &self.config);
        if let Some(progress) = progress {
            fetcher = fetcher.with_progress(progress);
        }
        fetcher.fetch_all(tickers, &self.config.exchange).await
    }

    /// Load the sheet and build the panel
    pub async fn run(&self, request: &PanelRequest, progress: Option<FetchProgressCallback>) -> Result<PanelReport> {
        let table = self.load_sheet(&request.sheet_reference).await?;
        self.run_with_table(&request.sheet_reference, &table, request, progress)
            .await
    }

    /// Build the panel from an already loaded table
    ///
    /// The schema is checked before any price is requested.
    pub async fn run_with_table(
        &self,
        reference: &str,
        table: &SheetTable,
        request: &PanelRequest,
        progress: Option<FetchProgressCallback>,
    ) -> Result<PanelReport> {
        let schema = &self.config.schema;
        check_schema(table, schema)?;

        let requested = select_tickers(table.tickers(&schema.ticker_column), request);

        let mut report = PanelReport {
            generated_at: Utc::now(),
            strategy: self.config.strategy,
            currency_policy: self.config.currency_policy,
            requested: Vec::new(),
            rows: Vec::new(),
            prices: PriceMap::new(),
            from_cache: false,
        };

        if requested.is_empty() {
            warn!(rows = table.len(), "No tickers to show after filtering");
            return Ok(report);
        }

        let cache_key = (reference.trim().to_string(), requested.clone());
        let prices = match self.price_cache.get(&cache_key).await {
            Some(prices) => {
                debug!(tickers = requested.len(), "Prices served from cache");
                report.from_cache = true;
                prices
            }
            None => {
                let prices = self.fetch_prices(&requested, progress).await;
                self.price_cache.insert(cache_key, prices.clone()).await;
                prices
            }
        };

        let wanted: HashSet<&str> = requested.iter().map(|t| t.as_str()).collect();
        let rows: Vec<DisplayRow> = evaluate(
            table,
            &prices,
            schema,
            &self.config.exchange,
            self.config.currency_policy,
        )?
        .into_iter()
        .filter(|row| wanted.contains(row.ticker.as_str()))
        .collect();

        info!(
            rows = rows.len(),
            priced = prices.resolved_count(),
            requested = requested.len(),
            "Panel built"
        );

        report.requested = requested;
        report.rows = rows;
        report.prices = prices;
        Ok(report)
    }

    /// Drop cached sheet and prices so the next run refetches everything
    pub async fn refresh(&self, reference: &str) {
        self.sheets.invalidate(reference).await;
        self.price_cache.clear().await;
    }
}

/// Apply the ticker selection and the row limit, keeping sheet order
fn select_tickers(sheet_tickers: Vec<String>, request: &PanelRequest) -> Vec<String> {
    let mut selected = match &request.tickers {
        Some(wanted) => {
            let wanted: HashSet<String> = wanted
                .iter()
                .map(|t| t.trim().to_uppercase())
                .filter(|t| !t.is_empty())
                .collect();

            let selected: Vec<String> = sheet_tickers
                .into_iter()
                .filter(|t| wanted.contains(&t.to_uppercase()))
                .collect();

            let found: HashSet<String> = selected.iter().map(|t| t.to_uppercase()).collect();
            let mut not_in_sheet: Vec<&String> = wanted.iter().filter(|t| !found.contains(*t)).collect();
            if !not_in_sheet.is_empty() {
                not_in_sheet.sort();
                warn!(tickers = ?not_in_sheet, "Selected tickers not present in the sheet");
            }
            selected
        }
        None => sheet_tickers,
    };

    if let Some(limit) = request.limit {
        selected.truncate(limit);
    }
    selected
}
