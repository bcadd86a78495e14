use crate::cli::SheetArgs;
use crate::error::Result;
use crate::models::PanelConfig;
use crate::services::{check_schema, export_url, SheetLoader};

use super::{load_schema, runtime};

pub fn run(args: SheetArgs) {
    if let Err(e) = inspect(&args) {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

fn inspect(args: &SheetArgs) -> Result<()> {
    let schema = load_schema(args)?;
    let config = PanelConfig::from_env();
    let url = export_url(&args.sheet)?;
    println!("🔗 {}", url);

    let runtime = runtime()?;
    let table = runtime.block_on(async {
        let loader = SheetLoader::new(config.http_timeout, config.sheet_cache_ttl)?;
        loader.load(&args.sheet).await
    })?;

    println!("📄 {} rows, {} columns", table.len(), table.headers.len());
    for (idx, header) in table.headers.iter().enumerate() {
        let marker = if schema.required_columns().contains(&header.as_str()) { "✓" } else { " " };
        println!("   {} {:>2}. {}", marker, idx + 1, header);
    }

    check_schema(&table, &schema)?;
    let tickers = table.tickers(&schema.ticker_column);
    println!("\n✅ Schema OK: {} distinct tickers", tickers.len());
    Ok(())
}
