pub mod cache;
pub mod number_parser;
pub mod pipeline;
pub mod price_fetcher;
pub mod price_resolver;
pub mod quote_provider;
pub mod renderer;
pub mod sheet_loader;
pub mod symbol_mapper;
pub mod target_evaluator;
pub mod trading_hours;
pub mod yahoo;

#[cfg(test)]
pub(crate) mod fake_provider;
#[cfg(test)]
pub(crate) mod test_server;

pub use cache::TtlCache;
pub use number_parser::parse_localized_number;
pub use pipeline::{PanelContext, PanelReport, PanelRequest};
pub use price_fetcher::{FetchProgressCallback, PriceFetcher};
pub use price_resolver::PriceResolver;
pub use quote_provider::{Bar, ProviderError, QuoteProvider};
pub use renderer::{OutputFormat, TableStyle};
pub use sheet_loader::{export_url, normalize_header, SheetLoader, SheetTable};
pub use symbol_mapper::map_symbol;
pub use target_evaluator::{check_schema, evaluate};
pub use trading_hours::{get_refresh_interval, is_trading_hours};
pub use yahoo::YahooClient;
