use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;

#[derive(Parser)]
#[command(name = "avwap-panel")]
#[command(about = "Live prices against AVWAP targets from a Google Sheet", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that reads the sheet
#[derive(Args, Debug, Clone)]
pub struct SheetArgs {
    /// Google Sheets link (the document must be readable by link)
    #[arg(env = "AVWAP_SHEET_URL")]
    pub sheet: String,

    /// Built-in column layout: avwap, hedef4
    #[arg(long, default_value = "avwap", conflicts_with = "schema")]
    pub preset: String,

    /// JSON file describing the sheet columns
    #[arg(long)]
    pub schema: Option<PathBuf>,
}

/// Options controlling how prices are fetched and compared
#[derive(Args, Debug, Clone)]
pub struct PanelArgs {
    #[command(flatten)]
    pub sheet: SheetArgs,

    /// Only these tickers (comma-separated, case-insensitive)
    #[arg(short, long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Show at most this many tickers
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Price fetch strategy: sequential, bulk
    #[arg(long, default_value = "bulk")]
    pub strategy: String,

    /// Foreign-currency targets: match-only, assume-converted
    #[arg(long, default_value = "match-only")]
    pub currency_policy: String,

    /// Output format: table, json, csv
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Disable the highlight colour on reached targets
    #[arg(long)]
    pub no_color: bool,

    /// Show which query produced each price
    #[arg(long)]
    pub show_source: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the sheet, fetch prices and print the panel
    Show {
        #[command(flatten)]
        args: PanelArgs,
    },
    /// Refresh the panel periodically (faster while Borsa Istanbul is open)
    Watch {
        #[command(flatten)]
        args: PanelArgs,

        /// Seconds between refreshes during the trading session
        #[arg(long, default_value_t = 60)]
        trading_interval: u64,

        /// Seconds between refreshes outside the trading session
        #[arg(long, default_value_t = 900)]
        idle_interval: u64,

        /// Stop after this many refreshes
        #[arg(long)]
        iterations: Option<usize>,
    },
    /// Resolve live prices for tickers given on the command line
    Prices {
        /// Tickers as written in the sheet (THYAO, ASELS)
        #[arg(required = true, value_delimiter = ',')]
        tickers: Vec<String>,

        /// Price fetch strategy: sequential, bulk
        #[arg(long, default_value = "sequential")]
        strategy: String,

        /// Output format: table, json
        #[arg(short, long, default_value = "table")]
        format: String,
    },
    /// Print normalized headers and check the sheet against the schema
    Sheet {
        #[command(flatten)]
        args: SheetArgs,
    },
}

pub fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Show { args } => {
            commands::show::run(args);
        }
        Commands::Watch {
            args,
            trading_interval,
            idle_interval,
            iterations,
        } => {
            commands::watch::run(args, trading_interval, idle_interval, iterations);
        }
        Commands::Prices { tickers, strategy, format } => {
            commands::prices::run(tickers, strategy, format);
        }
        Commands::Sheet { args } => {
            commands::sheet::run(args);
        }
    }
}
