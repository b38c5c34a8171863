//! Return, benchmark and attribution analytics.

use crate::types::{
    BenchmarkComparison, BenchmarkResult, Contribution, Holding, PositionAttribution,
    SectorAttribution,
};
use std::collections::{BTreeMap, HashMap};

/// Geometric compounding of simple returns: `prod(1 + r) - 1`.
///
/// Returns 0.0 for an empty series. Returns at or below -100% are not guarded.
pub fn cumulative_return(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

/// Annualize a return series given the number of periods per year.
///
/// Uses log-compounding; if any period lost 100% or more, falls back to the
/// plain geometric product and returns 0.0 when that is not positive.
pub fn annualized_return(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.is_empty() || periods_per_year <= 0.0 {
        return 0.0;
    }

    let years = returns.len() as f64 / periods_per_year;

    if returns.iter().all(|r| 1.0 + r > 0.0) {
        let log_growth: f64 = returns.iter().map(|r| r.ln_1p()).sum();
        return (log_growth / years).exp_m1();
    }

    let total = 1.0 + cumulative_return(returns);
    if total <= 0.0 {
        return 0.0;
    }
    total.powf(1.0 / years) - 1.0
}

/// Cumulative portfolio return against each benchmark's.
pub fn benchmark_comparison<S: AsRef<[f64]>>(
    portfolio_returns: &[f64],
    benchmarks: &BTreeMap<String, S>,
) -> BenchmarkComparison {
    let portfolio_cum = cumulative_return(portfolio_returns);

    let benchmarks = benchmarks
        .iter()
        .map(|(name, returns)| {
            let cum_return = cumulative_return(returns.as_ref());
            (
                name.clone(),
                BenchmarkResult {
                    cum_return,
                    relative_vs_portfolio: portfolio_cum - cum_return,
                },
            )
        })
        .collect();

    BenchmarkComparison {
        portfolio_cum,
        benchmarks,
    }
}

/// Contribution of one holding: `weight * cumulative_return` when the symbol has
/// returns, otherwise its weight as a proxy.
fn contribution<S: AsRef<[f64]>>(
    holding: &Holding,
    per_symbol_returns: &HashMap<String, S>,
) -> Contribution {
    match per_symbol_returns.get(&holding.symbol) {
        Some(returns) if !returns.as_ref().is_empty() => {
            Contribution::Actual(holding.weight * cumulative_return(returns.as_ref()))
        }
        _ => Contribution::WeightProxy(holding.weight),
    }
}

/// Sort descending, then split off the top `k` and the bottom `k` (ascending).
fn rank(
    mut items: Vec<(String, Contribution)>,
    top_k: usize,
) -> (
    Vec<(String, Contribution)>,
    Vec<(String, Contribution)>,
    Vec<(String, Contribution)>,
) {
    items.sort_by(|a, b| b.1.value().total_cmp(&a.1.value()));
    let top = items.iter().take(top_k).cloned().collect();

    let mut ascending = items.clone();
    ascending.sort_by(|a, b| a.1.value().total_cmp(&b.1.value()));
    ascending.truncate(top_k);

    (items, top, ascending)
}

/// Attribute performance to individual positions.
///
/// # Arguments
///
/// * `holdings` - Positions with normalized weights
/// * `per_symbol_returns` - Aligned returns keyed by upper-case symbol
/// * `top_k` - How many winners and losers to report
pub fn attribution_by_position<S: AsRef<[f64]>>(
    holdings: &[Holding],
    per_symbol_returns: &HashMap<String, S>,
    top_k: usize,
) -> PositionAttribution {
    let contributions = holdings
        .iter()
        .map(|h| (h.symbol.clone(), contribution(h, per_symbol_returns)))
        .collect();

    let (by_symbol, winners, losers) = rank(contributions, top_k);
    PositionAttribution {
        by_symbol,
        winners,
        losers,
    }
}

/// Attribute performance to sectors by summing position contributions.
///
/// Holdings without a sector land in `"Unknown"`. A sector total is only
/// `Actual` when every member had returns.
pub fn attribution_by_sector<S: AsRef<[f64]>>(
    holdings: &[Holding],
    per_symbol_returns: &HashMap<String, S>,
    top_k: usize,
) -> SectorAttribution {
    // Insertion order keeps ties stable in first-seen order
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, (f64, bool)> = HashMap::new();

    for h in holdings {
        let sector = h.sector_or_unknown().to_string();
        let c = contribution(h, per_symbol_returns);
        let entry = totals.entry(sector.clone()).or_insert_with(|| {
            order.push(sector);
            (0.0, false)
        });
        entry.0 += c.value();
        entry.1 |= c.is_proxy();
    }

    let sectors = order
        .into_iter()
        .map(|sector| {
            let (sum, any_proxy) = totals[&sector];
            let c = if any_proxy {
                Contribution::WeightProxy(sum)
            } else {
                Contribution::Actual(sum)
            };
            (sector, c)
        })
        .collect();

    let (by_sector, top, bottom) = rank(sectors, top_k);
    SectorAttribution {
        by_sector,
        top,
        bottom,
    }
}
