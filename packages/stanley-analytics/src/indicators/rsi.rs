//! Relative Strength Index (RSI) indicator.

/// RSI from average gain and average loss.
/// No losses at all reads as 100, including a flat window.
#[inline]
fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// Relative Strength Index of the most recent `period` price changes.
///
/// Gains and losses are plain averages over the last `period` changes (no
/// Wilder smoothing), then `RSI = 100 - 100 / (1 + avg_gain / avg_loss)`.
///
/// # Arguments
///
/// * `prices` - Closing prices, oldest first
/// * `period` - Number of changes to average (typically 14)
///
/// # Returns
///
/// `None` when there are fewer than `period + 1` prices.
///
/// # Example
///
/// ```rust
/// use stanley_analytics::indicators::rsi_last;
///
/// let prices = vec![44.0, 44.25, 44.5, 43.75, 44.5, 44.25, 44.5, 44.0, 43.5, 44.0,
///                   44.25, 44.0, 43.5, 44.0, 44.5, 44.25, 44.0];
/// let value = rsi_last(&prices, 14).unwrap();
/// assert!(value >= 0.0 && value <= 100.0);
/// ```
pub fn rsi_last(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let recent = &prices[prices.len() - period - 1..];
    let (gain, loss) = recent.windows(2).fold((0.0, 0.0), |(g, l), w| {
        let change = w[1] - w[0];
        (g + change.max(0.0), l + (-change).max(0.0))
    });

    Some(rsi_value(gain / period as f64, loss / period as f64))
}
