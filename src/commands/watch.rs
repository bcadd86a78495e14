use std::time::Duration;

use tracing::{info, warn};

use crate::cli::PanelArgs;
use crate::error::Result;
use crate::services::trading_hours::{get_refresh_interval, is_trading_hours};
use crate::services::{PanelContext, PanelRequest};

use super::{build_config, print_report, runtime};

pub fn run(args: PanelArgs, trading_interval: u64, idle_interval: u64, iterations: Option<usize>) {
    if let Err(e) = watch(&args, trading_interval, idle_interval, iterations) {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

fn watch(args: &PanelArgs, trading_interval: u64, idle_interval: u64, iterations: Option<usize>) -> Result<()> {
    let config = build_config(args)?;
    let schema = config.schema.clone();
    let trading_interval = Duration::from_secs(trading_interval.max(1));
    let idle_interval = Duration::from_secs(idle_interval.max(1));

    let request = PanelRequest {
        tickers: args.tickers.clone(),
        limit: args.limit,
        ..PanelRequest::new(args.sheet.sheet.clone())
    };

    let runtime = runtime()?;
    runtime.block_on(async {
        let ctx = PanelContext::new(config)?;
        let mut count = 0usize;

        loop {
            count += 1;
            println!(
                "\n🔄 Refresh #{} ({})",
                count,
                if is_trading_hours() { "market open" } else { "market closed" }
            );

            match ctx.run(&request, None).await {
                Ok(report) => print_report(&report, &schema, args)?,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Refresh failed, keeping previous state");
                    eprintln!("⚠️  Refresh failed: {}", e);
                }
            }

            if iterations.is_some_and(|max| count >= max) {
                break;
            }

            let wait = get_refresh_interval(trading_interval, idle_interval);
            info!(wait_s = wait.as_secs(), "Waiting for next refresh");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = tokio::signal::ctrl_c() => {
                    println!("\n👋 Stopped");
                    break;
                }
            }
        }

        Ok(())
    })
}
