//! Simple Moving Average (SMA).

/// Mean of the last `window` values.
///
/// Returns `None` when `window` is zero or longer than the data.
///
/// # Example
///
/// ```rust
/// use stanley_analytics::indicators::sma_last;
///
/// let prices = vec![10.0, 11.0, 12.0, 11.0, 10.0];
/// // (12 + 11 + 10) / 3
/// assert_eq!(sma_last(&prices, 3), Some(11.0));
/// assert_eq!(sma_last(&prices, 6), None);
/// ```
pub fn sma_last(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let sum: f64 = values[values.len() - window..].iter().sum();
    Some(sum / window as f64)
}
