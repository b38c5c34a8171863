//! Portfolio risk metrics calculation.
//!
//! Provides volatility, beta, Sharpe ratio, Sortino ratio, drawdown and
//! concentration. All statistics use population moments over whatever
//! periodicity the returns have; nothing here annualizes implicitly.

use crate::types::{Concentration, DrawdownStats};
use std::collections::BTreeMap;

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population variance; 0.0 for fewer than two values.
///
/// A constant series is exactly 0.0 rather than rounding noise.
fn population_variance(xs: &[f64]) -> f64 {
    if xs.len() <= 1 || xs.windows(2).all(|w| w[0] == w[1]) {
        return 0.0;
    }
    let m = mean(xs);
    xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64
}

/// Population covariance of two equal-length slices.
fn covariance(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.is_empty() || xs.len() != ys.len() {
        return 0.0;
    }
    let mx = mean(xs);
    let my = mean(ys);
    xs.iter()
        .zip(ys)
        .map(|(x, y)| (x - mx) * (y - my))
        .sum::<f64>()
        / xs.len() as f64
}

/// Most recent `n` elements of each slice, where `n` is the shorter length.
fn common_tail<'a>(a: &'a [f64], b: &'a [f64]) -> (&'a [f64], &'a [f64]) {
    let n = a.len().min(b.len());
    (&a[a.len() - n..], &b[b.len() - n..])
}

/// Population standard deviation of periodic returns.
pub fn volatility(returns: &[f64]) -> f64 {
    population_variance(returns).sqrt()
}

/// Beta of `portfolio_returns` against `market_returns`.
///
/// Both series are compared over their common most recent window. Returns 0.0
/// when the market has no variance.
pub fn beta(portfolio_returns: &[f64], market_returns: &[f64]) -> f64 {
    let (port, market) = common_tail(portfolio_returns, market_returns);
    let var_market = population_variance(market);
    if var_market == 0.0 {
        return 0.0;
    }
    covariance(port, market) / var_market
}

/// Sharpe ratio: mean excess return over its standard deviation.
///
/// `risk_free_rate` must be in the same periodicity as `returns`. Returns 0.0
/// when the excess returns have no variance.
pub fn sharpe(returns: &[f64], risk_free_rate: f64) -> f64 {
    let excess: Vec<f64> = returns.iter().map(|r| r - risk_free_rate).collect();
    let vol = volatility(&excess);
    if vol == 0.0 {
        return 0.0;
    }
    mean(&excess) / vol
}

/// Sortino ratio relative to a per-period `target`.
///
/// The downside deviation is the root-mean-square of `min(0, r - target)`
/// over all periods. Without any period below target the ratio is `+inf` for
/// a positive mean excess and 0.0 otherwise.
pub fn sortino(returns: &[f64], target: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }

    let mean_excess = mean(returns) - target;
    let downside: Vec<f64> = returns.iter().map(|r| (r - target).min(0.0)).collect();

    if downside.iter().all(|d| *d == 0.0) {
        return if mean_excess > 0.0 { f64::INFINITY } else { 0.0 };
    }

    let downside_dev = (downside.iter().map(|d| d * d).sum::<f64>() / returns.len() as f64).sqrt();
    if downside_dev == 0.0 {
        return 0.0;
    }
    mean_excess / downside_dev
}

/// Maximum drawdown and Calmar-like ratio of the compounded equity curve.
///
/// The curve starts at 1.0. `max_drawdown` is the most negative
/// `equity / running_peak - 1` (0.0 if never under water) and `calmar_like`
/// is total return over `|max_drawdown|`.
pub fn drawdown_stats(returns: &[f64]) -> DrawdownStats {
    let mut equity = 1.0;
    let mut peak = 1.0;
    let mut max_drawdown = 0.0_f64;

    for r in returns {
        equity *= 1.0 + r;
        peak = f64::max(peak, equity);
        max_drawdown = max_drawdown.min(equity / peak - 1.0);
    }

    let total = equity - 1.0;
    let calmar_like = if max_drawdown < 0.0 {
        total / max_drawdown.abs()
    } else {
        0.0
    };

    DrawdownStats {
        max_drawdown,
        calmar_like,
    }
}

/// Herfindahl-Hirschman concentration of a weight map.
///
/// Weights are clamped at zero and normalized by their sum (by 1.0 if the sum
/// is zero, so an all-zero map has HHI 0). Every symbol whose normalized weight
/// exceeds `threshold` is listed in a warning.
pub fn concentration(weights: &BTreeMap<String, f64>, threshold: f64) -> Concentration {
    let clamped: Vec<(&str, f64)> = weights
        .iter()
        .map(|(s, w)| (s.as_str(), w.max(0.0)))
        .collect();

    let sum: f64 = clamped.iter().map(|(_, w)| w).sum();
    let total = if sum > 0.0 { sum } else { 1.0 };
    let normalized: Vec<(&str, f64)> = clamped.iter().map(|(s, w)| (*s, w / total)).collect();

    let hhi: f64 = normalized.iter().map(|(_, w)| w * w).sum();
    let effective_n = if hhi > 0.0 { 1.0 / hhi } else { 0.0 };
    let top_weight = normalized.iter().map(|(_, w)| *w).fold(0.0, f64::max);

    let offenders: Vec<&str> = normalized
        .iter()
        .filter(|(_, w)| *w > threshold)
        .map(|(s, _)| *s)
        .collect();

    let mut warnings = Vec::new();
    if !offenders.is_empty() {
        warnings.push(format!(
            "Positions over {:.0}%: {}",
            threshold * 100.0,
            offenders.join(", ")
        ));
    }

    Concentration {
        hhi,
        effective_n,
        top_weight,
        warnings,
    }
}

/// Scale a per-period volatility to annual terms.
pub fn annualize_volatility(volatility: f64, periods_per_year: f64) -> f64 {
    volatility * periods_per_year.sqrt()
}

/// Scale a per-period Sharpe or Sortino ratio to annual terms.
///
/// An infinite ratio stays infinite.
pub fn annualize_ratio(ratio: f64, periods_per_year: f64) -> f64 {
    ratio * periods_per_year.sqrt()
}
