use crate::cli::PanelArgs;
use crate::error::Result;
use crate::models::FetchStrategy;
use crate::services::{PanelContext, PanelRequest};

use super::{build_config, fetch_progress, print_report, runtime};

pub fn run(args: PanelArgs) {
    if let Err(e) = show(&args) {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

fn show(args: &PanelArgs) -> Result<()> {
    let config = build_config(args)?;
    let schema = config.schema.clone();
    let sequential = config.strategy == FetchStrategy::Sequential;

    let request = PanelRequest {
        tickers: args.tickers.clone(),
        limit: args.limit,
        ..PanelRequest::new(args.sheet.sheet.clone())
    };

    let runtime = runtime()?;
    let report = runtime.block_on(async {
        let ctx = PanelContext::new(config)?;
        if sequential {
            let (pb, progress) = fetch_progress();
            let report = ctx.run(&request, Some(progress)).await;
            pb.finish_and_clear();
            report
        } else {
            ctx.run(&request, None).await
        }
    })?;

    print_report(&report, &schema, args)
}
