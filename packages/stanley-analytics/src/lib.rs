//! Stanley Analytics - Price alignment and portfolio risk/performance library.
//!
//! This crate turns already-fetched daily price histories into the metrics the
//! Stanley persona reports on:
//!
//! - **Series alignment**: Reconcile irregular histories onto one anchor calendar
//! - **Return stats**: Cumulative/annualized return, benchmarks, attribution
//! - **Risk stats**: Volatility, beta, Sharpe, Sortino, drawdown, concentration
//! - **Technicals**: RSI, trailing SMAs, distance from 52-week extrema
//! - **Orchestration**: Fetch, align, blend and assemble `ComputedMetrics`
//!
//! Price fetching is delegated to a [`PriceHistorySource`] implementation.
//!
//! # Example
//!
//! ```rust
//! use stanley_analytics::{
//!     AnalyticsConfig, AnalyticsOrchestrator, Holding, InMemoryPriceSource, Lookback,
//! };
//!
//! let mut source = InMemoryPriceSource::new();
//! source
//!     .insert_columns(
//!         "AAPL",
//!         &["2024-01-02", "2024-01-03", "2024-01-04"],
//!         &[100.0, 101.0, 99.0],
//!     )
//!     .unwrap();
//!
//! let holdings = vec![Holding::new("aapl", 1.0).unwrap()];
//! let orchestrator = AnalyticsOrchestrator::new(AnalyticsConfig::default(), source);
//! let metrics = orchestrator
//!     .analyze_portfolio(&holdings, &Lookback::SixMonths)
//!     .unwrap();
//!
//! assert_eq!(metrics.periods, 2);
//! ```

pub mod analysis;
pub mod config;
pub mod indicators;
pub mod portfolio;
pub mod series;
pub mod timeframe;
pub mod types;

// Re-export commonly used types
pub use types::{
    ApiResponse, BenchmarkComparison, BenchmarkResult, ComputedMetrics, Concentration,
    Contribution, DrawdownStats, Holding, InstrumentMetrics, PositionAttribution, PricePoint,
    PriceSeries, SectorAttribution, Technicals,
};

// Re-export main functionality
pub use analysis::{
    AnalysisStage, AnalyticsOrchestrator, InMemoryPriceSource, PriceColumns, PriceHistorySource,
};
pub use config::AnalyticsConfig;
pub use portfolio::{
    annualized_return, attribution_by_position, attribution_by_sector, benchmark_comparison,
    beta, blend_returns, concentration, cumulative_return, drawdown_stats,
    holdings_from_positions, missing_sectors, sector_weights, sharpe, sortino, volatility,
    PositionInput, WeightMap,
};
pub use series::{
    simple_returns, AlignedReturns, ExclusionReason, ReconciliationReport, SeriesAligner,
    SymbolCoverage,
};
pub use timeframe::Lookback;

/// Error types for stanley-analytics operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid weight for {symbol}: {weight}")]
    InvalidWeight { symbol: String, weight: f64 },

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Invalid price series for {symbol}: {reason}")]
    InvalidSeries { symbol: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No holdings to analyze")]
    NoHoldings,

    #[error("None of the requested symbols could be aligned: {}", requested.join(", "))]
    NoAlignedSymbols {
        requested: Vec<String>,
        report: series::ReconciliationReport,
    },
}

/// Result type for stanley-analytics operations.
pub type Result<T> = std::result::Result<T, Error>;
