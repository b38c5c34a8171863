//! Core data types for Stanley analytics.

use crate::series::ReconciliationReport;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single daily close.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    /// Calendar day of the bar
    pub date: NaiveDate,
    /// Closing price (positive)
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Daily close history for one symbol, ascending by date with no duplicate dates.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(from = "Vec<PricePoint>", into = "Vec<PricePoint>")]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from arbitrary points.
    ///
    /// Points are sorted by date; for a duplicated date the last quote wins.
    /// Non-finite and non-positive closes are discarded.
    pub fn new(points: Vec<PricePoint>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for p in points {
            if p.close.is_finite() && p.close > 0.0 {
                by_date.insert(p.date, p.close);
            }
        }

        Self {
            points: by_date
                .into_iter()
                .map(|(date, close)| PricePoint { date, close })
                .collect(),
        }
    }

    /// Build a series from parallel `dates` / `closes` columns.
    pub fn from_columns(symbol: &str, dates: &[NaiveDate], closes: &[f64]) -> Result<Self> {
        if dates.len() != closes.len() {
            return Err(Error::InvalidSeries {
                symbol: symbol.to_uppercase(),
                reason: format!("{} dates but {} closes", dates.len(), closes.len()),
            });
        }

        Ok(Self::new(
            dates
                .iter()
                .zip(closes)
                .map(|(&date, &close)| PricePoint { date, close })
                .collect(),
        ))
    }

    /// Create an empty series (what a failed fetch degrades to).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Closing prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Dates in ascending order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Keep only points on or after `start`.
    pub fn since(&self, start: NaiveDate) -> Self {
        Self {
            points: self
                .points
                .iter()
                .filter(|p| p.date >= start)
                .copied()
                .collect(),
        }
    }
}

impl From<Vec<PricePoint>> for PriceSeries {
    fn from(points: Vec<PricePoint>) -> Self {
        Self::new(points)
    }
}

impl From<PriceSeries> for Vec<PricePoint> {
    fn from(series: PriceSeries) -> Self {
        series.points
    }
}

/// A weighted position handed to the analytics engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holding {
    /// Ticker symbol (uppercase)
    pub symbol: String,
    /// Fraction of the portfolio (not percent)
    pub weight: f64,
    /// Sector label, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// Display name, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Average buy price per share (metadata only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_buy_price: Option<f64>,
    /// Purchase date (metadata only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bought_at: Option<NaiveDate>,
}

impl Holding {
    /// Create a holding, normalizing the symbol and rejecting malformed weights.
    pub fn new(symbol: &str, weight: f64) -> Result<Self> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(Error::InvalidSymbol(symbol));
        }
        if !weight.is_finite() {
            return Err(Error::InvalidWeight { symbol, weight });
        }

        Ok(Self {
            symbol,
            weight,
            sector: None,
            name: None,
            avg_buy_price: None,
            bought_at: None,
        })
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_cost_basis(mut self, avg_buy_price: f64, bought_at: Option<NaiveDate>) -> Self {
        self.avg_buy_price = Some(avg_buy_price);
        self.bought_at = bought_at;
        self
    }

    /// Sector label used for attribution buckets.
    pub fn sector_or_unknown(&self) -> &str {
        match self.sector.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => UNKNOWN_SECTOR,
        }
    }
}

/// Bucket for holdings without a sector label.
pub const UNKNOWN_SECTOR: &str = "Unknown";

/// A position or sector contribution.
///
/// `WeightProxy` marks the degraded case where no return series was available
/// and the raw weight stands in for performance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Contribution {
    Actual(f64),
    WeightProxy(f64),
}

impl Contribution {
    /// Numeric value regardless of provenance.
    pub fn value(&self) -> f64 {
        match *self {
            Contribution::Actual(v) | Contribution::WeightProxy(v) => v,
        }
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, Contribution::WeightProxy(_))
    }
}

/// Per-symbol contribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionAttribution {
    /// Contributions sorted descending
    pub by_symbol: Vec<(String, Contribution)>,
    /// Top contributors
    pub winners: Vec<(String, Contribution)>,
    /// Bottom contributors, ascending
    pub losers: Vec<(String, Contribution)>,
}

/// Per-sector contribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectorAttribution {
    /// Contributions sorted descending
    pub by_sector: Vec<(String, Contribution)>,
    pub top: Vec<(String, Contribution)>,
    /// Ascending
    pub bottom: Vec<(String, Contribution)>,
}

/// Cumulative return of one benchmark versus the portfolio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkResult {
    pub cum_return: f64,
    /// Portfolio cumulative return minus the benchmark's
    pub relative_vs_portfolio: f64,
}

/// Portfolio versus benchmarks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BenchmarkComparison {
    pub portfolio_cum: f64,
    pub benchmarks: BTreeMap<String, BenchmarkResult>,
}

/// Drawdown of a compounded equity curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct DrawdownStats {
    /// Most negative `equity / peak - 1` (0.0 if never below a peak)
    pub max_drawdown: f64,
    /// Total return over `|max_drawdown|`, 0.0 without a drawdown
    pub calmar_like: f64,
}

/// Weight concentration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Concentration {
    /// Herfindahl-Hirschman index of normalized weights
    pub hhi: f64,
    /// `1 / hhi`, 0.0 when hhi is 0
    pub effective_n: f64,
    pub top_weight: f64,
    pub warnings: Vec<String>,
}

/// Portfolio analysis result.
///
/// Created once per analysis call and handed read-only to report builders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputedMetrics {
    /// Cumulative portfolio return over the window
    pub cum_return: f64,
    /// Geometric annualized return
    pub annualized_return: f64,
    pub benchmarks: BenchmarkComparison,
    pub by_symbol: Vec<(String, Contribution)>,
    pub winners: Vec<(String, Contribution)>,
    pub losers: Vec<(String, Contribution)>,
    pub by_sector: Vec<(String, Contribution)>,
    pub top_sectors: Vec<(String, Contribution)>,
    pub bottom_sectors: Vec<(String, Contribution)>,
    /// Normalized weight per sector label
    pub sector_weights: Vec<(String, f64)>,
    /// Major sectors with no exposure
    pub missing_sectors: Vec<String>,
    /// Per-period volatility
    pub volatility: f64,
    pub volatility_annual: f64,
    pub beta: f64,
    /// Per-period Sharpe ratio
    pub sharpe: f64,
    pub sharpe_annual: f64,
    /// Per-period Sortino ratio (may be +inf)
    pub sortino: f64,
    pub sortino_annual: f64,
    pub max_drawdown: f64,
    pub calmar_like: f64,
    pub concentration: Concentration,
    /// Number of return periods analyzed
    pub periods: usize,
    /// Blended portfolio return series
    pub portfolio_returns: Vec<f64>,
    /// Which symbols made it through alignment
    pub alignment: ReconciliationReport,
}

/// Price-based technical readings for a single instrument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Technicals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma20: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma50: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma200: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pct_from_52w_high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pct_from_52w_low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_price: Option<f64>,
}

/// Single-instrument analysis result. Core metrics are `None` when no returns exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentMetrics {
    pub symbol: String,
    pub cum_return: Option<f64>,
    pub volatility: Option<f64>,
    pub beta: Option<f64>,
    pub sharpe: Option<f64>,
    pub sortino: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub benchmarks: BenchmarkComparison,
    pub technicals: Technicals,
    /// Whether returns came from the aligned calendar or the raw history
    pub aligned: bool,
}

/// API response wrapper used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
