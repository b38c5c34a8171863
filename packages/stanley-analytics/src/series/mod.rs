//! Price series reconciliation.
//!
//! Aligns irregularly-dated histories onto a shared calendar and derives the
//! simple-return series every statistic downstream is computed from.

mod align;

pub use align::{
    AlignedReturns, ExclusionReason, ReconciliationReport, SeriesAligner, SymbolCoverage,
    DEFAULT_MAX_MISSING_RATIO,
};

/// Simple periodic returns `p[t] / p[t-1] - 1`.
///
/// The result is one element shorter than the input. A zero previous price
/// yields a 0.0 return for that period.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| {
            if w[0] != 0.0 && w[1] != 0.0 {
                w[1] / w[0] - 1.0
            } else {
                0.0
            }
        })
        .collect()
}
