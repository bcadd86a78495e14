//! Defaults for the panel
//!
//! Every value here can be overridden through `PanelConfig` (environment
//! variables or CLI flags).

/// Yahoo Finance suffix for Borsa Istanbul listings (THYAO -> THYAO.IS)
pub const DEFAULT_EXCHANGE_SUFFIX: &str = ".IS";

/// Exchange code shown in logs and used as the exchange hint
pub const DEFAULT_EXCHANGE_CODE: &str = "BIST";

/// Currency live prices are quoted in
pub const DEFAULT_HOME_CURRENCY: &str = "TRY";

/// Timeout for the sheet download and every provider request
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

/// Retries after the first attempt for retryable HTTP failures (network, 429, 5xx)
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Pause between single-symbol lookups to stay under provider throttling
pub const DEFAULT_FETCH_DELAY_MS: u64 = 50;

/// Symbols per multi-symbol (spark) request
pub const DEFAULT_BULK_BATCH_SIZE: usize = 20;

/// Bulk chunks issued at the same time
pub const DEFAULT_BULK_CONCURRENCY: usize = 3;

/// Sheet content is reused for this long before it is downloaded again
pub const DEFAULT_SHEET_CACHE_TTL_SECS: u64 = 300;

/// Price maps are reused for this long (same sheet + same ticker list)
pub const DEFAULT_PRICE_CACHE_TTL_SECS: u64 = 60;

/// Calendar days of daily bars requested so weekends and holidays are skipped
pub const DEFAULT_DAILY_LOOKBACK_DAYS: i64 = 10;

/// Calendar days of minute bars requested
pub const DEFAULT_INTRADAY_LOOKBACK_DAYS: i64 = 1;

/// Derived target = first target / this divisor ("VWAP Yüzde 30 Hedef")
pub const DEFAULT_DERIVED_DIVISOR: f64 = 2.0;

/// Borsa Istanbul continuous session, local time
pub const BIST_SESSION_START_HOUR: u32 = 10;
pub const BIST_SESSION_END_HOUR: u32 = 18;
pub const BIST_TIMEZONE: &str = "Europe/Istanbul";

/// Output column labels
pub mod labels {
    pub const NAME: &str = "Hisse Adı";
    pub const PRICE: &str = "Hisse Fiyatı";
    pub const DERIVED: &str = "VWAP Yüzde 30 Hedef";
    pub const TARGET_TRY: &str = "VWAP TL Hedef";
    pub const TARGET_EUR: &str = "VWAP EURO HEDEF";
}
