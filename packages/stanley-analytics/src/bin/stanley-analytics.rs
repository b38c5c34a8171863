//! Stanley Analytics CLI - run portfolio and instrument analyses from JSON.
//!
//! Requests are read from a file or stdin and the result is printed to stdout
//! as an `ApiResponse` envelope for the TypeScript bridge. Logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use stanley_analytics::{
    holdings_from_positions, AnalyticsConfig, AnalyticsOrchestrator, ApiResponse,
    InMemoryPriceSource, Lookback, PositionInput, PriceColumns,
};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "stanley-analytics")]
#[command(about = "Stanley analytics CLI - portfolio risk and performance from price histories")]
#[command(version)]
struct Cli {
    /// Config file (defaults to STANLEY_ANALYTICS_CONFIG or ~/.zee/stanley/analytics.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a weighted portfolio
    Portfolio {
        /// Request file ("-" for stdin)
        #[arg(default_value = "-")]
        input: PathBuf,
        /// Override the request's timeframe label
        #[arg(short, long)]
        timeframe: Option<String>,
    },
    /// Analyze a single instrument
    Instrument {
        /// Request file ("-" for stdin)
        #[arg(default_value = "-")]
        input: PathBuf,
        /// Override the request's symbol
        #[arg(short, long)]
        symbol: Option<String>,
        /// Override the request's timeframe label
        #[arg(short, long)]
        timeframe: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Deserialize)]
struct PortfolioRequest {
    positions: Vec<PositionInput>,
    #[serde(default)]
    timeframe: String,
    #[serde(default)]
    prices: BTreeMap<String, PriceColumns>,
}

#[derive(Deserialize)]
struct InstrumentRequest {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    timeframe: String,
    #[serde(default)]
    prices: BTreeMap<String, PriceColumns>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let output = match run(cli) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Request failed");
            serde_json::to_string_pretty(&ApiResponse::<()>::err(format!("{:#}", e)))?
        }
    };

    println!("{}", output);
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<String> {
    let config = match &cli.config {
        Some(path) => AnalyticsConfig::load_from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AnalyticsConfig::load().context("loading config")?,
    };

    match cli.command {
        Commands::Portfolio { input, timeframe } => {
            let request: PortfolioRequest = read_request(&input)?;
            let holdings = holdings_from_positions(&request.positions)?;
            let lookback = Lookback::from_label(timeframe.as_deref().unwrap_or(&request.timeframe));
            let source = InMemoryPriceSource::from_columns(request.prices)?;

            let metrics =
                AnalyticsOrchestrator::new(config, source).analyze_portfolio(&holdings, &lookback)?;
            Ok(serde_json::to_string_pretty(&ApiResponse::ok(metrics))?)
        }
        Commands::Instrument {
            input,
            symbol,
            timeframe,
        } => {
            let request: InstrumentRequest = read_request(&input)?;
            let symbol = symbol.unwrap_or(request.symbol);
            let lookback = Lookback::from_label(timeframe.as_deref().unwrap_or(&request.timeframe));
            let source = InMemoryPriceSource::from_columns(request.prices)?;

            let metrics =
                AnalyticsOrchestrator::new(config, source).analyze_instrument(&symbol, &lookback)?;
            Ok(serde_json::to_string_pretty(&ApiResponse::ok(metrics))?)
        }
        Commands::Config => Ok(serde_json::to_string_pretty(&ApiResponse::ok(config))?),
    }
}

fn read_request<T: for<'de> Deserialize<'de>>(input: &Path) -> anyhow::Result<T> {
    let raw = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("reading request from {}", input.display()))?
    };
    serde_json::from_str(&raw).context("parsing request JSON")
}
