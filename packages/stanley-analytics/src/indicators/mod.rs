//! Technical indicators for single-instrument analysis.
//!
//! - **SMA**: Simple Moving Average of the latest window
//! - **RSI**: Relative Strength Index of the latest window
//! - **Extrema**: distance of the last close from the trailing high and low

mod rsi;
mod sma;

pub use rsi::rsi_last;
pub use sma::sma_last;

use crate::types::Technicals;

/// RSI window used by [`technicals`].
pub const RSI_PERIOD: usize = 14;

/// Trading days in the 52-week lookback.
pub const YEAR_LOOKBACK: usize = 252;

/// Distance of the last close from the trailing high and low.
///
/// Uses the last `lookback` closes (all of them if fewer). Returns
/// `(last / high - 1, last / low - 1)`; each side is `None` when its extreme
/// is zero, and both are `None` for empty input.
pub fn pct_from_extrema(closes: &[f64], lookback: usize) -> (Option<f64>, Option<f64>) {
    let Some(&last) = closes.last() else {
        return (None, None);
    };

    let window = closes.len().min(lookback.max(1));
    let recent = &closes[closes.len() - window..];
    let high = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let low = recent.iter().copied().fold(f64::INFINITY, f64::min);

    let from = |extreme: f64| (extreme != 0.0).then(|| last / extreme - 1.0);
    (from(high), from(low))
}

/// Compact technical snapshot of a close series.
pub fn technicals(closes: &[f64]) -> Technicals {
    let (pct_from_52w_high, pct_from_52w_low) = pct_from_extrema(closes, YEAR_LOOKBACK);

    Technicals {
        rsi: rsi_last(closes, RSI_PERIOD),
        sma20: sma_last(closes, 20),
        sma50: sma_last(closes, 50),
        sma200: sma_last(closes, 200),
        pct_from_52w_high,
        pct_from_52w_low,
        last_price: closes.last().copied(),
    }
}
