pub mod prices;
pub mod sheet;
pub mod show;
pub mod watch;

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

use crate::cli::{PanelArgs, SheetArgs};
use crate::error::{AppError, Result};
use crate::models::{CurrencyPolicy, FetchStrategy, PanelConfig, SheetSchema};
use crate::services::renderer::{self, OutputFormat, TableStyle};
use crate::services::{FetchProgressCallback, PanelReport};

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| AppError::Config(format!("Failed to create runtime: {}", e)))
}

pub(crate) fn load_schema(args: &SheetArgs) -> Result<SheetSchema> {
    match &args.schema {
        Some(path) => SheetSchema::from_file(path),
        None => SheetSchema::preset(&args.preset),
    }
}

/// Environment defaults overlaid with command-line flags
pub(crate) fn build_config(args: &PanelArgs) -> Result<PanelConfig> {
    let mut config = PanelConfig::from_env();
    config.schema = load_schema(&args.sheet)?;
    config.strategy = FetchStrategy::from_str(&args.strategy).map_err(AppError::InvalidInput)?;
    config.currency_policy = CurrencyPolicy::from_str(&args.currency_policy).map_err(AppError::InvalidInput)?;
    Ok(config)
}

/// Progress bar on stderr fed by the price fetcher
pub(crate) fn fetch_progress() -> (ProgressBar, FetchProgressCallback) {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let bar = pb.clone();
    let callback: FetchProgressCallback = Box::new(move |done, total, ticker| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
        if !ticker.is_empty() {
            bar.set_message(ticker.to_string());
        }
    });
    (pb, callback)
}

pub(crate) fn print_report(report: &PanelReport, schema: &SheetSchema, args: &PanelArgs) -> Result<()> {
    let format = OutputFormat::from_str(&args.format).map_err(AppError::InvalidInput)?;

    match format {
        OutputFormat::Json => println!("{}", renderer::render_json(report)?),
        OutputFormat::Csv => print!("{}", renderer::render_csv(&report.rows, schema)?),
        OutputFormat::Table => {
            if report.rows.is_empty() {
                println!("⚠️  No rows to show");
                return Ok(());
            }
            let style = TableStyle {
                color: !args.no_color && std::io::stdout().is_terminal(),
                show_source: args.show_source,
            };
            print!("{}", renderer::render_table(&report.rows, schema, style));
            println!();
            println!("{}", renderer::legend(style));

            let unresolved = report.unresolved();
            if !unresolved.is_empty() {
                let names: Vec<&str> = unresolved.iter().map(|t| t.as_str()).collect();
                println!("⚠️  No price for {} ticker(s): {}", names.len(), names.join(", "));
            }
            println!(
                "📊 {} ticker(s), {} priced, {} with a reached target ({}, {})",
                report.rows.len(),
                report.prices.resolved_count(),
                report.reached_rows(),
                report.currency_policy,
                report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            );
        }
    }
    Ok(())
}
