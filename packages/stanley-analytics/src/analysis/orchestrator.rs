//! End-to-end analysis: fetch, align, blend, compute.

use super::parallel::maybe_parallel_map;
use super::source::PriceHistorySource;
use crate::config::AnalyticsConfig;
use crate::indicators;
use crate::portfolio::{
    annualize_ratio, annualize_volatility, annualized_return, attribution_by_position,
    attribution_by_sector, benchmark_comparison, beta, blend_returns, concentration,
    cumulative_return, drawdown_stats, missing_sectors, sector_weights, sharpe, sortino,
    volatility, WeightMap,
};
use crate::series::{simple_returns, AlignedReturns, SeriesAligner};
use crate::timeframe::Lookback;
use crate::types::{BenchmarkComparison, ComputedMetrics, Holding, InstrumentMetrics, PriceSeries};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, info, warn};

/// Progress of a single analysis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Idle,
    FetchingPrices,
    Aligning,
    Blending,
    ComputingStats,
    Done,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisStage::Idle => "idle",
            AnalysisStage::FetchingPrices => "fetching_prices",
            AnalysisStage::Aligning => "aligning",
            AnalysisStage::Blending => "blending",
            AnalysisStage::ComputingStats => "computing_stats",
            AnalysisStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Tracks the current stage and reports each transition.
struct StageTracker<F: FnMut(AnalysisStage)> {
    current: AnalysisStage,
    on_stage: F,
}

impl<F: FnMut(AnalysisStage)> StageTracker<F> {
    fn new(on_stage: F) -> Self {
        Self {
            current: AnalysisStage::Idle,
            on_stage,
        }
    }

    fn advance(&mut self, next: AnalysisStage) {
        debug!(from = %self.current, to = %next, "Analysis stage");
        self.current = next;
        (self.on_stage)(next);
    }
}

/// Runs portfolio and single-instrument analyses against a price source.
///
/// Holds no per-request state; one orchestrator can serve many calls.
pub struct AnalyticsOrchestrator<S> {
    config: AnalyticsConfig,
    source: S,
}

impl<S: PriceHistorySource> AnalyticsOrchestrator<S> {
    pub fn new(config: AnalyticsConfig, source: S) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Analyze a weighted portfolio over `lookback`.
    ///
    /// Holdings that fail alignment are left out of the blended series (the
    /// remaining weights are renormalized) but still appear in attribution as
    /// weight proxies and in concentration.
    ///
    /// # Errors
    ///
    /// `Error::NoHoldings` for an empty portfolio and `Error::NoAlignedSymbols`
    /// when not a single holding could be aligned.
    pub fn analyze_portfolio(
        &self,
        holdings: &[Holding],
        lookback: &Lookback,
    ) -> Result<ComputedMetrics> {
        self.analyze_portfolio_with_progress(holdings, lookback, |_| {})
    }

    /// Same as [`analyze_portfolio`](Self::analyze_portfolio), calling
    /// `on_stage` as each stage begins.
    pub fn analyze_portfolio_with_progress(
        &self,
        holdings: &[Holding],
        lookback: &Lookback,
        on_stage: impl FnMut(AnalysisStage),
    ) -> Result<ComputedMetrics> {
        if holdings.is_empty() {
            return Err(Error::NoHoldings);
        }
        let mut stage = StageTracker::new(on_stage);

        stage.advance(AnalysisStage::FetchingPrices);
        let holding_symbols = unique_symbols(holdings.iter().map(|h| h.symbol.as_str()));
        let reference_symbols = self.reference_symbols();
        let to_fetch = unique_symbols(
            holding_symbols
                .iter()
                .chain(&reference_symbols)
                .map(String::as_str),
        );
        let histories = self.fetch_all(&to_fetch, lookback);

        // Holdings are aligned on their own so reference data never reshapes
        // the portfolio window
        stage.advance(AnalysisStage::Aligning);
        let aligned = SeriesAligner::from_config(&self.config)
            .align(&select(&histories, &holding_symbols));
        if aligned.is_empty() {
            warn!(symbols = ?holding_symbols, "No holding could be aligned");
            return Err(Error::NoAlignedSymbols {
                requested: holding_symbols,
                report: aligned.report,
            });
        }
        let references = self.align_references(&histories, &aligned, &reference_symbols);

        stage.advance(AnalysisStage::Blending);
        let all_weights = WeightMap::from_holdings(holdings)?;
        let active_weights = all_weights.renormalized_over(|s| aligned.contains(s));
        let portfolio_returns = blend_returns(&active_weights, &aligned.returns);

        stage.advance(AnalysisStage::ComputingStats);
        let metrics = self.portfolio_metrics(
            holdings,
            &all_weights,
            &aligned,
            &references,
            portfolio_returns,
        );

        stage.advance(AnalysisStage::Done);
        info!(
            holdings = holding_symbols.len(),
            aligned = metrics.alignment.included.len(),
            periods = metrics.periods,
            "Portfolio analysis complete"
        );
        Ok(metrics)
    }

    fn portfolio_metrics(
        &self,
        holdings: &[Holding],
        all_weights: &WeightMap,
        aligned: &AlignedReturns,
        references: &BTreeMap<String, Vec<f64>>,
        portfolio_returns: Vec<f64>,
    ) -> ComputedMetrics {
        let cfg = &self.config;

        let benchmarks = benchmark_comparison(&portfolio_returns, &self.benchmarks_in(references));
        let beta = self.market_beta(&portfolio_returns, references);

        // Attribution sees every holding at its normalized weight
        let normalized = normalized_holdings(holdings, all_weights);
        let per_symbol: HashMap<String, &[f64]> = normalized
            .iter()
            .filter_map(|h| aligned.get(&h.symbol).map(|r| (h.symbol.clone(), r)))
            .collect();
        let positions = attribution_by_position(&normalized, &per_symbol, cfg.top_k);
        let sectors = attribution_by_sector(&normalized, &per_symbol, cfg.top_k);
        let exposure = sector_weights(&normalized);

        let vol = volatility(&portfolio_returns);
        let sharpe_ratio = sharpe(&portfolio_returns, cfg.risk_free_rate);
        let sortino_ratio = sortino(&portfolio_returns, cfg.sortino_target);
        let drawdown = drawdown_stats(&portfolio_returns);

        ComputedMetrics {
            cum_return: cumulative_return(&portfolio_returns),
            annualized_return: annualized_return(&portfolio_returns, cfg.periods_per_year),
            benchmarks,
            by_symbol: positions.by_symbol,
            winners: positions.winners,
            losers: positions.losers,
            by_sector: sectors.by_sector,
            top_sectors: sectors.top,
            bottom_sectors: sectors.bottom,
            missing_sectors: missing_sectors(&exposure),
            sector_weights: exposure,
            volatility: vol,
            volatility_annual: annualize_volatility(vol, cfg.periods_per_year),
            beta,
            sharpe: sharpe_ratio,
            sharpe_annual: annualize_ratio(sharpe_ratio, cfg.periods_per_year),
            sortino: sortino_ratio,
            sortino_annual: annualize_ratio(sortino_ratio, cfg.periods_per_year),
            max_drawdown: drawdown.max_drawdown,
            calmar_like: drawdown.calmar_like,
            concentration: concentration(all_weights.as_map(), cfg.concentration_threshold),
            periods: portfolio_returns.len(),
            portfolio_returns,
            alignment: aligned.report.clone(),
        }
    }

    /// Analyze a single instrument over `lookback`.
    ///
    /// The symbol is aligned against the market symbol's calendar. If it
    /// cannot be aligned but has at least two closes, its own unaligned
    /// returns are used instead and `aligned` is false; beta and benchmarks
    /// are then left out since no period lines up with the market. Core
    /// metrics are `None` only when no returns exist at all. Technicals
    /// always come from the raw closes.
    pub fn analyze_instrument(
        &self,
        symbol: &str,
        lookback: &Lookback,
    ) -> Result<InstrumentMetrics> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(Error::InvalidSymbol(symbol));
        }

        let market = self.config.market_symbol.as_str();
        let core = unique_symbols([symbol.as_str(), market].into_iter());
        let reference_symbols = self.reference_symbols();
        let to_fetch = unique_symbols(core.iter().chain(&reference_symbols).map(String::as_str));
        let histories = self.fetch_all(&to_fetch, lookback);
        let aligned = SeriesAligner::from_config(&self.config).align(&select(&histories, &core));

        let closes = histories
            .get(&symbol)
            .map(PriceSeries::closes)
            .unwrap_or_default();

        let (returns, is_aligned) = match aligned.get(&symbol) {
            Some(r) => (r.to_vec(), true),
            None => {
                if closes.len() >= 2 {
                    debug!(symbol = %symbol, "Falling back to unaligned returns");
                }
                (simple_returns(&closes), false)
            }
        };

        let technicals = indicators::technicals(&closes);

        if returns.is_empty() {
            warn!(symbol = %symbol, "No returns available for instrument");
            return Ok(InstrumentMetrics {
                symbol,
                cum_return: None,
                volatility: None,
                beta: None,
                sharpe: None,
                sortino: None,
                max_drawdown: None,
                benchmarks: BenchmarkComparison::default(),
                technicals,
                aligned: false,
            });
        }

        let (beta, benchmarks) = if is_aligned {
            let references = self.align_references(&histories, &aligned, &reference_symbols);
            let benchmarks: BTreeMap<String, &[f64]> = self
                .benchmarks_in(&references)
                .into_iter()
                .filter(|(name, _)| *name != symbol)
                .collect();
            (
                Some(self.market_beta(&returns, &references)),
                benchmark_comparison(&returns, &benchmarks),
            )
        } else {
            warn!(symbol = %symbol, "Unaligned instrument, beta and benchmarks omitted");
            (None, BenchmarkComparison::default())
        };

        let cfg = &self.config;
        Ok(InstrumentMetrics {
            cum_return: Some(cumulative_return(&returns)),
            volatility: Some(volatility(&returns)),
            beta,
            sharpe: Some(sharpe(&returns, cfg.risk_free_rate)),
            sortino: Some(sortino(&returns, cfg.sortino_target)),
            max_drawdown: Some(drawdown_stats(&returns).max_drawdown),
            benchmarks,
            technicals,
            aligned: is_aligned,
            symbol,
        })
    }

    /// Benchmark symbols followed by the market symbol, without duplicates.
    fn reference_symbols(&self) -> Vec<String> {
        unique_symbols(
            self.config
                .benchmark_symbols
                .iter()
                .chain(std::iter::once(&self.config.market_symbol))
                .map(String::as_str),
        )
    }

    /// Returns of each reference symbol on the calendar of `aligned`.
    ///
    /// A symbol already in `aligned` is reused as is. Any other is aligned
    /// pairwise against the anchor alone, so one short reference history
    /// cannot clip another, and is then cut to at most `aligned.periods()`
    /// most recent values. Both end on the anchor's last date.
    fn align_references(
        &self,
        histories: &BTreeMap<String, PriceSeries>,
        aligned: &AlignedReturns,
        symbols: &[String],
    ) -> BTreeMap<String, Vec<f64>> {
        let Some((anchor, anchor_series)) = aligned
            .report
            .anchor
            .as_deref()
            .and_then(|a| histories.get_key_value(a))
        else {
            return BTreeMap::new();
        };
        let aligner = SeriesAligner::new(vec![anchor.clone()], self.config.max_missing_ratio);
        let periods = aligned.periods();

        let mut out = BTreeMap::new();
        for symbol in symbols {
            if let Some(returns) = aligned.get(symbol) {
                out.insert(symbol.clone(), returns.to_vec());
                continue;
            }
            let Some(series) = histories.get(symbol) else {
                continue;
            };

            let pair = BTreeMap::from([
                (anchor.clone(), anchor_series.clone()),
                (symbol.clone(), series.clone()),
            ]);
            let mut paired = aligner.align(&pair);
            match paired.returns.remove(symbol) {
                Some(mut returns) => {
                    let excess = returns.len().saturating_sub(periods);
                    returns.drain(..excess);
                    out.insert(symbol.clone(), returns);
                }
                None => {
                    warn!(
                        symbol = %symbol,
                        reason = ?paired.report.exclusion(symbol),
                        "Reference series not aligned"
                    );
                }
            }
        }
        out
    }

    fn fetch_all(&self, symbols: &[String], lookback: &Lookback) -> BTreeMap<String, PriceSeries> {
        debug!(count = symbols.len(), lookback = %lookback, "Fetching price histories");
        maybe_parallel_map(symbols, self.config.parallel_fetch, |symbol| {
            let series = match self.source.price_history(symbol, lookback) {
                Ok(series) => series,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Price fetch failed, treating as empty");
                    PriceSeries::empty()
                }
            };
            (symbol.clone(), series)
        })
        .into_iter()
        .collect()
    }

    fn benchmarks_in<'a>(
        &self,
        references: &'a BTreeMap<String, Vec<f64>>,
    ) -> BTreeMap<String, &'a [f64]> {
        self.config
            .benchmark_symbols
            .iter()
            .filter_map(|b| references.get(b).map(|r| (b.clone(), r.as_slice())))
            .collect()
    }

    fn market_beta(&self, returns: &[f64], references: &BTreeMap<String, Vec<f64>>) -> f64 {
        match references.get(&self.config.market_symbol) {
            Some(market) => beta(returns, market),
            None => {
                warn!(
                    market = %self.config.market_symbol,
                    "Market series not aligned, beta set to 0"
                );
                0.0
            }
        }
    }
}

/// Histories for `symbols` only; symbols never fetched are left out.
fn select(
    histories: &BTreeMap<String, PriceSeries>,
    symbols: &[String],
) -> BTreeMap<String, PriceSeries> {
    symbols
        .iter()
        .filter_map(|s| histories.get(s).map(|series| (s.clone(), series.clone())))
        .collect()
}

/// Upper-cased symbols in first-seen order without duplicates.
fn unique_symbols<'a>(symbols: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in symbols {
        let s = s.trim().to_uppercase();
        if !s.is_empty() && !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

/// One holding per symbol (first occurrence) carrying its normalized weight.
fn normalized_holdings(holdings: &[Holding], weights: &WeightMap) -> Vec<Holding> {
    let mut seen = Vec::new();
    holdings
        .iter()
        .filter(|h| {
            if seen.contains(&h.symbol) {
                false
            } else {
                seen.push(h.symbol.clone());
                true
            }
        })
        .map(|h| Holding {
            weight: weights.get(&h.symbol).unwrap_or(0.0),
            ..h.clone()
        })
        .collect()
}
