use crate::error::{AppError, Result};
use crate::models::{FetchStrategy, PanelConfig};
use crate::services::renderer::{render_json, OutputFormat};
use crate::services::{map_symbol, PanelContext};
use crate::utils::format_price;

use super::{fetch_progress, runtime};

pub fn run(tickers: Vec<String>, strategy: String, format: String) {
    if let Err(e) = prices(tickers, &strategy, &format) {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

fn prices(tickers: Vec<String>, strategy: &str, format: &str) -> Result<()> {
    let format = OutputFormat::from_str(format).map_err(AppError::InvalidInput)?;
    let mut config = PanelConfig::from_env();
    config.strategy = FetchStrategy::from_str(strategy).map_err(AppError::InvalidInput)?;

    let tickers: Vec<String> = tickers
        .iter()
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect();
    if tickers.is_empty() {
        return Err(AppError::InvalidInput("no tickers given".to_string()));
    }

    let suffix = config.exchange.suffix.clone();
    let runtime = runtime()?;
    let prices = runtime.block_on(async {
        let ctx = PanelContext::new(config)?;
        let (pb, progress) = fetch_progress();
        let prices = ctx.fetch_prices(&tickers, Some(progress)).await;
        pb.finish_and_clear();
        Ok::<_, AppError>(prices)
    })?;

    match format {
        OutputFormat::Json => println!("{}", render_json(&prices)?),
        _ => {
            let width = tickers.iter().map(|t| t.chars().count()).max().unwrap_or(0);
            for ticker in &tickers {
                match prices.quote(ticker) {
                    Some(quote) => println!(
                        "{:<width$}  {:>12}  {} ({})",
                        ticker,
                        format_price(quote.price),
                        map_symbol(ticker, &suffix),
                        quote.source,
                        width = width
                    ),
                    None => println!("{:<width$}  {:>12}  ⚠️  no price", ticker, "-", width = width),
                }
            }
            println!("\n📊 {}/{} priced", prices.resolved_count(), prices.len());
        }
    }
    Ok(())
}
