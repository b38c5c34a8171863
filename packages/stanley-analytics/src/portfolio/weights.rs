//! Holding weights: parsing user positions and normalizing weight maps.

use crate::types::Holding;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A position as supplied by a user or upstream request.
///
/// Either `weight` (fraction) or `weight_pct` (percent) may be given; `weight`
/// wins when both are present.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PositionInput {
    pub symbol: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub weight_pct: Option<f64>,
    #[serde(default)]
    pub avg_buy_price: Option<f64>,
    #[serde(default)]
    pub bought_at: Option<NaiveDate>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl PositionInput {
    fn raw_weight(&self) -> f64 {
        match (self.weight, self.weight_pct) {
            (Some(w), _) => w,
            (None, Some(pct)) => pct / 100.0,
            (None, None) => 0.0,
        }
    }
}

/// Convert user positions into holdings with normalized fractional weights.
///
/// Negative weights clamp to zero and the rest are scaled by their positive sum
/// (or left as-is when that sum is zero). Non-finite weights and empty symbols
/// are rejected.
pub fn holdings_from_positions(positions: &[PositionInput]) -> Result<Vec<Holding>> {
    let mut raw = Vec::with_capacity(positions.len());
    for p in positions {
        let w = p.raw_weight();
        if !w.is_finite() {
            return Err(Error::InvalidWeight {
                symbol: p.symbol.trim().to_uppercase(),
                weight: w,
            });
        }
        raw.push(w);
    }

    let total = positive_sum(raw.iter().copied());

    positions
        .iter()
        .zip(raw)
        .map(|(p, w)| {
            let mut holding = Holding::new(&p.symbol, w.max(0.0) / total)?;
            holding.sector = p.sector.clone();
            holding.name = p.name.clone();
            holding.avg_buy_price = p.avg_buy_price;
            holding.bought_at = p.bought_at;
            Ok(holding)
        })
        .collect()
}

/// Sum of the positive values, or 1.0 when there are none.
fn positive_sum(values: impl Iterator<Item = f64>) -> f64 {
    let sum: f64 = values.filter(|w| *w > 0.0).sum();
    if sum > 0.0 {
        sum
    } else {
        1.0
    }
}

/// Major market sectors checked for missing exposure.
pub const MAJOR_SECTORS: [&str; 11] = [
    "Technology",
    "Healthcare",
    "Financials",
    "Consumer Discretionary",
    "Communication Services",
    "Industrials",
    "Consumer Staples",
    "Energy",
    "Utilities",
    "Real Estate",
    "Materials",
];

/// Total weight per sector label in first-seen order.
///
/// Holdings without a sector are summed under `"Unknown"`. Weights are taken
/// as given, so pass normalized holdings for fractions of the portfolio.
pub fn sector_weights(holdings: &[Holding]) -> Vec<(String, f64)> {
    let mut out: Vec<(String, f64)> = Vec::new();
    for h in holdings {
        let sector = h.sector_or_unknown();
        match out.iter_mut().find(|(s, _)| s == sector) {
            Some((_, w)) => *w += h.weight,
            None => out.push((sector.to_string(), h.weight)),
        }
    }
    out
}

/// Major sectors with no positive exposure, in [`MAJOR_SECTORS`] order.
///
/// Labels are compared case-insensitively.
pub fn missing_sectors(sector_weights: &[(String, f64)]) -> Vec<String> {
    MAJOR_SECTORS
        .iter()
        .filter(|major| {
            !sector_weights
                .iter()
                .any(|(s, w)| *w > 0.0 && s.trim().eq_ignore_ascii_case(major))
        })
        .map(|major| major.to_string())
        .collect()
}

/// Symbol -> normalized weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WeightMap {
    weights: BTreeMap<String, f64>,
}

impl WeightMap {
    /// Normalize raw weights: clamp negatives to zero and divide by the positive sum.
    ///
    /// Duplicate symbols are summed. With no positive weight every entry is zero.
    /// A non-finite weight is rejected.
    pub fn from_raw<'a>(raw: impl IntoIterator<Item = (&'a str, f64)>) -> Result<Self> {
        let mut weights: BTreeMap<String, f64> = BTreeMap::new();
        for (symbol, w) in raw {
            let symbol = symbol.trim().to_uppercase();
            if !w.is_finite() {
                return Err(Error::InvalidWeight { symbol, weight: w });
            }
            *weights.entry(symbol).or_insert(0.0) += w.max(0.0);
        }
        Ok(Self::normalize(weights))
    }

    pub fn from_holdings(holdings: &[Holding]) -> Result<Self> {
        Self::from_raw(holdings.iter().map(|h| (h.symbol.as_str(), h.weight)))
    }

    /// Restrict to the symbols accepted by `keep` and normalize again.
    pub fn renormalized_over(&self, keep: impl Fn(&str) -> bool) -> Self {
        Self::normalize(
            self.weights
                .iter()
                .filter(|(s, _)| keep(s.as_str()))
                .map(|(s, w)| (s.clone(), *w))
                .collect(),
        )
    }

    /// Weights must already be finite and non-negative.
    fn normalize(mut weights: BTreeMap<String, f64>) -> Self {
        let total = positive_sum(weights.values().copied());
        for w in weights.values_mut() {
            *w /= total;
        }
        Self { weights }
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.weights.get(symbol).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(s, w)| (s.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }
}
