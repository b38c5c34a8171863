//! Portfolio analytics.
//!
//! Weight handling, return and attribution analytics, and risk metrics over
//! aligned periodic returns.

mod performance;
mod risk;
mod weights;

use std::collections::BTreeMap;

pub use performance::{
    annualized_return, attribution_by_position, attribution_by_sector, benchmark_comparison,
    cumulative_return,
};
pub use risk::{
    annualize_ratio, annualize_volatility, beta, concentration, drawdown_stats, sharpe, sortino,
    volatility,
};
pub use weights::{
    holdings_from_positions, missing_sectors, sector_weights, PositionInput, WeightMap,
    MAJOR_SECTORS,
};

/// Blend aligned per-symbol returns into one portfolio series.
///
/// `r_p[t] = sum(w_s * r_s[t])` over the symbols present in both maps. All
/// series must share a length; the result has that length.
pub fn blend_returns<S: AsRef<[f64]>>(
    weights: &WeightMap,
    per_symbol_returns: &BTreeMap<String, S>,
) -> Vec<f64> {
    let periods = per_symbol_returns
        .values()
        .map(|r| r.as_ref().len())
        .min()
        .unwrap_or(0);

    let mut blended = vec![0.0; periods];
    for (symbol, w) in weights.iter() {
        if let Some(returns) = per_symbol_returns.get(symbol) {
            let returns = returns.as_ref();
            for (acc, r) in blended.iter_mut().zip(&returns[returns.len() - periods..]) {
                *acc += w * r;
            }
        }
    }
    blended
}
