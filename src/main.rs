mod client;
mod config;
mod loader;
mod models;
mod pipeline;
mod report;
mod storage;
mod utils;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::client::transform::transform;
use crate::config::AppConfig;
use crate::loader::{load_csv, load_outputs, load_raw_response};
use crate::models::{parse_symbol, FetchPlan, OutputSize, Period};
use crate::pipeline::Pipeline;
use crate::storage::CsvStore;

#[derive(Parser)]
#[command(name = "alpha-markets", about = "Alpha Vantage OHLC series to CSV", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch series from the API and save one CSV per symbol and period
    Fetch {
        /// Ticker symbol (repeatable; default from config)
        #[arg(short, long = "symbol")]
        symbols: Vec<String>,

        /// Period to fetch (repeatable; default: daily, weekly, monthly)
        #[arg(short, long = "period", value_enum)]
        periods: Vec<Period>,

        /// Daily output size: compact (last 100 points) or full
        #[arg(long, value_enum)]
        outputsize: Option<OutputSize>,

        /// Output directory (default from config: current directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Transform a saved JSON response into a CSV without calling the API
    Transform {
        /// Path to the saved response
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        symbol: String,

        #[arg(short, long, value_enum)]
        period: Period,

        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Preview a saved series and print its recent performance
    Summary {
        #[arg(short, long)]
        symbol: String,

        #[arg(short, long, value_enum, default_value = "daily")]
        period: Period,

        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Number of preview rows
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },

    /// List saved series files
    List {
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "alpha_markets=info,warn",
        1 => "alpha_markets=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;

    match cli.command {
        Command::Fetch {
            symbols,
            periods,
            outputsize,
            out_dir,
        } => {
            let api_key = config.api_key()?;
            info!("Using API key: {}", utils::mask_key(&api_key));

            if let Some(dir) = out_dir {
                config.output.dir = dir;
            }
            let symbols = if symbols.is_empty() { config.fetch.symbols.clone() } else { symbols };
            let periods = if periods.is_empty() { config.fetch.periods.clone() } else { periods };
            let plan = FetchPlan::new(
                &symbols,
                &periods,
                outputsize.unwrap_or(config.fetch.outputsize),
            )?;
            if plan.task_count() == 0 {
                bail!("Nothing to fetch: no symbols or periods configured");
            }

            let _t = utils::Timer::start("Fetch");
            let stats = Pipeline::new(&config, &api_key)?.run(&plan).await;

            if stats.errors > 0 {
                bail!("{} of {} fetch task(s) failed", stats.errors, stats.tasks);
            }
        }

        Command::Transform {
            input,
            symbol,
            period,
            out_dir,
        } => {
            let symbol = parse_symbol(&symbol)?;
            let raw = load_raw_response(&input)?;
            let records =
                transform(&raw).with_context(|| format!("Failed to transform {:?}", input))?;

            let store = CsvStore::open(&out_dir.unwrap_or(config.output.dir))?;
            store.write_series(&symbol, period, &records)?;
        }

        Command::Summary {
            symbol,
            period,
            out_dir,
            rows,
        } => {
            let store = CsvStore::open(&out_dir.unwrap_or(config.output.dir))?;
            let path = store.path_for(&symbol, period)?;
            let records = load_csv(&path)?;

            println!("-------------------------------------------------------------------------");
            println!("  {}", path.display());
            println!("-------------------------------------------------------------------------");
            print!("{}", report::render_preview(&records, rows));
            println!("-------------------------------------------------------------------------");
            match report::summarize(&records, report::DEFAULT_WINDOW) {
                Some(summary) => print!("{}", report::render_summary(&summary)),
                None => println!("  (empty series)"),
            }
            println!("-------------------------------------------------------------------------");
        }

        Command::List { out_dir } => {
            let dir = out_dir.unwrap_or(config.output.dir);
            let series = load_outputs(&dir)?;
            print!("{}", report::render_listing(&dir, &series));
        }
    }

    Ok(())
}
