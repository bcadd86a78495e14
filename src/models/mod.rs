mod display_row;
mod exchange;
mod interval;
mod panel_config;
mod quote;
mod schema;

pub use display_row::{is_reached, CurrencyPolicy, DisplayRow, TargetCell};
pub use exchange::Exchange;
pub use interval::Interval;
pub use panel_config::{FetchStrategy, PanelConfig, ResolveStep};
pub use quote::{finite, PriceMap, PriceQuote, QuoteSource};
pub use schema::{DerivedTarget, SheetSchema, TargetColumn};
