//! Price history sources.

use crate::timeframe::Lookback;
use crate::types::PriceSeries;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Supplier of daily close histories.
///
/// Implementations wrap whatever actually fetches prices (an HTTP client, a
/// cache, a fixture file). A symbol with no data should yield an empty series
/// rather than an error; errors are reserved for failures of the source itself.
pub trait PriceHistorySource: Send + Sync {
    fn price_history(&self, symbol: &str, lookback: &Lookback) -> Result<PriceSeries>;
}

/// Column-oriented history as found in request payloads.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PriceColumns {
    pub dates: Vec<NaiveDate>,
    pub closes: Vec<f64>,
}

/// Price source backed by histories held in memory.
///
/// Histories are trimmed to the requested lookback, measured back from each
/// series' own last date.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceSource {
    histories: BTreeMap<String, PriceSeries>,
}

impl InMemoryPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a `symbol -> {dates, closes}` map, validating every entry.
    pub fn from_columns(columns: BTreeMap<String, PriceColumns>) -> Result<Self> {
        let mut source = Self::new();
        for (symbol, cols) in columns {
            let series = PriceSeries::from_columns(&symbol, &cols.dates, &cols.closes)?;
            source.insert(&symbol, series);
        }
        Ok(source)
    }

    /// Parse a JSON object of `symbol -> {dates, closes}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let columns: BTreeMap<String, PriceColumns> = serde_json::from_str(json)?;
        Self::from_columns(columns)
    }

    pub fn insert(&mut self, symbol: &str, series: PriceSeries) {
        self.histories.insert(symbol.trim().to_uppercase(), series);
    }

    /// Insert a history given as ISO `YYYY-MM-DD` date strings and closes.
    pub fn insert_columns(&mut self, symbol: &str, dates: &[&str], closes: &[f64]) -> Result<()> {
        let parsed = dates
            .iter()
            .map(|d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|e| Error::InvalidSeries {
                    symbol: symbol.to_uppercase(),
                    reason: format!("bad date {:?}: {}", d, e),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let series = PriceSeries::from_columns(symbol, &parsed, closes)?;
        self.insert(symbol, series);
        Ok(())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.histories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }
}

impl PriceHistorySource for InMemoryPriceSource {
    fn price_history(&self, symbol: &str, lookback: &Lookback) -> Result<PriceSeries> {
        let Some(series) = self.histories.get(&symbol.to_uppercase()) else {
            return Ok(PriceSeries::empty());
        };
        match series.last_date() {
            Some(last) => Ok(series.since(lookback.start_date(last))),
            None => Ok(PriceSeries::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_columns_and_fetch() {
        let mut source = InMemoryPriceSource::new();
        source
            .insert_columns("aapl", &["2024-01-03", "2024-01-02"], &[101.0, 100.0])
            .unwrap();

        let series = source.price_history("AAPL", &Lookback::OneYear).unwrap();
        assert_eq!(series.closes(), vec![100.0, 101.0]);
        assert_eq!(source.symbols().collect::<Vec<_>>(), vec!["AAPL"]);
    }

    #[test]
    fn test_unknown_symbol_is_empty() {
        let source = InMemoryPriceSource::new();
        let series = source.price_history("NOPE", &Lookback::OneYear).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_insert_columns_rejects_bad_input() {
        let mut source = InMemoryPriceSource::new();
        let bad_date = source.insert_columns("A", &["2024-13-01"], &[1.0]);
        assert!(matches!(bad_date, Err(Error::InvalidSeries { .. })));

        let mismatch = source.insert_columns("A", &["2024-01-01", "2024-01-02"], &[1.0]);
        assert!(matches!(mismatch, Err(Error::InvalidSeries { .. })));
        assert!(source.is_empty());
    }

    #[test]
    fn test_trims_to_lookback() {
        let mut source = InMemoryPriceSource::new();
        source
            .insert_columns(
                "SPY",
                &["2023-06-30", "2024-01-02", "2024-05-31", "2024-06-28"],
                &[430.0, 470.0, 520.0, 545.0],
            )
            .unwrap();

        let ytd = source.price_history("SPY", &Lookback::YearToDate).unwrap();
        assert_eq!(ytd.len(), 3);

        let month = source.price_history("SPY", &Lookback::OneMonth).unwrap();
        assert_eq!(month.closes(), vec![520.0, 545.0]);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "SPY": {"dates": ["2024-01-02", "2024-01-03"], "closes": [470.0, 468.5]},
            "qqq": {"dates": ["2024-01-02"], "closes": [400.0]}
        }"#;
        let source = InMemoryPriceSource::from_json(json).unwrap();
        assert_eq!(source.len(), 2);
        let qqq = source.price_history("QQQ", &Lookback::OneYear).unwrap();
        assert_eq!(qqq.len(), 1);
    }
}
