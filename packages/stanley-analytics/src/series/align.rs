//! Anchor-calendar alignment with limited forward-fill.

use super::simple_returns;
use crate::config::AnalyticsConfig;
use crate::types::PriceSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Default tolerance for forward-filled days (missing / aligned points).
pub const DEFAULT_MAX_MISSING_RATIO: f64 = 0.05;

/// Why a symbol was left out of the aligned result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Fewer than two raw or aligned price points
    InsufficientPoints { points: usize },
    /// Too many forward-filled days
    ExceededMissingRatio { ratio: f64 },
    /// No quote on any anchor calendar date
    NoAnchorOverlap,
}

/// Alignment outcome for an accepted symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolCoverage {
    pub symbol: String,
    /// Price points on the anchor calendar, forward-filled ones included
    pub aligned_points: usize,
    /// Forward-filled points
    pub missing_points: usize,
}

impl SymbolCoverage {
    pub fn missing_ratio(&self) -> f64 {
        if self.aligned_points == 0 {
            return 0.0;
        }
        self.missing_points as f64 / self.aligned_points as f64
    }
}

/// Which symbols were aligned and which were dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReconciliationReport {
    /// Symbol whose calendar was used
    pub anchor: Option<String>,
    pub included: Vec<SymbolCoverage>,
    pub excluded: Vec<(String, ExclusionReason)>,
}

impl ReconciliationReport {
    pub fn is_included(&self, symbol: &str) -> bool {
        self.included.iter().any(|c| c.symbol == symbol)
    }

    pub fn exclusion(&self, symbol: &str) -> Option<ExclusionReason> {
        self.excluded
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, reason)| *reason)
    }
}

/// Equal-length return series on one calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AlignedReturns {
    /// Symbol -> simple returns, all the same length
    pub returns: BTreeMap<String, Vec<f64>>,
    /// End date of each return period
    pub dates: Vec<NaiveDate>,
    pub report: ReconciliationReport,
}

impl AlignedReturns {
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Number of return periods shared by every series.
    pub fn periods(&self) -> usize {
        self.dates.len()
    }

    pub fn get(&self, symbol: &str) -> Option<&[f64]> {
        self.returns.get(symbol).map(Vec::as_slice)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.returns.contains_key(symbol)
    }
}

/// Reconciles many price histories onto the calendar of one anchor symbol.
#[derive(Debug, Clone)]
pub struct SeriesAligner {
    preferred_anchors: Vec<String>,
    max_missing_ratio: f64,
}

impl Default for SeriesAligner {
    fn default() -> Self {
        Self {
            preferred_anchors: vec!["SPY".to_string()],
            max_missing_ratio: DEFAULT_MAX_MISSING_RATIO,
        }
    }
}

impl SeriesAligner {
    /// Create an aligner.
    ///
    /// # Arguments
    ///
    /// * `preferred_anchors` - Symbols tried in order as the anchor calendar
    /// * `max_missing_ratio` - Largest tolerated share of forward-filled days
    pub fn new(preferred_anchors: Vec<String>, max_missing_ratio: f64) -> Self {
        Self {
            preferred_anchors: preferred_anchors
                .into_iter()
                .map(|s| s.trim().to_uppercase())
                .collect(),
            max_missing_ratio,
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(config.anchor_symbols.clone(), config.max_missing_ratio)
    }

    /// Align every series onto the anchor calendar and convert to returns.
    ///
    /// Symbols that cannot be aligned are dropped and listed in the report.
    /// The output is either empty or every series has the same length and
    /// ends on the anchor's last date.
    pub fn align(&self, series_map: &BTreeMap<String, PriceSeries>) -> AlignedReturns {
        let mut report = ReconciliationReport::default();

        let mut candidates: BTreeMap<&str, &PriceSeries> = BTreeMap::new();
        for (symbol, series) in series_map {
            if series.len() < 2 {
                tracing::debug!(symbol = %symbol, points = series.len(), "Too few points to align");
                report.excluded.push((
                    symbol.clone(),
                    ExclusionReason::InsufficientPoints {
                        points: series.len(),
                    },
                ));
            } else {
                candidates.insert(symbol.as_str(), series);
            }
        }

        let Some(anchor) = self.choose_anchor(&candidates) else {
            return AlignedReturns {
                report,
                ..Default::default()
            };
        };
        report.anchor = Some(anchor.to_string());

        // PriceSeries keeps dates ascending, so this is the reference calendar
        let calendar = candidates[anchor].dates();

        let mut accepted: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for (&symbol, series) in &candidates {
            let (prices, missing) = walk_calendar(&calendar, series);
            let coverage = SymbolCoverage {
                symbol: symbol.to_string(),
                aligned_points: prices.len(),
                missing_points: missing,
            };

            let verdict = if prices.is_empty() {
                Err(ExclusionReason::NoAnchorOverlap)
            } else if prices.len() < 2 {
                Err(ExclusionReason::InsufficientPoints {
                    points: prices.len(),
                })
            } else if symbol != anchor && coverage.missing_ratio() > self.max_missing_ratio {
                Err(ExclusionReason::ExceededMissingRatio {
                    ratio: coverage.missing_ratio(),
                })
            } else {
                Ok(())
            };

            match verdict {
                Ok(()) => {
                    accepted.insert(symbol.to_string(), simple_returns(&prices));
                    report.included.push(coverage);
                }
                Err(reason) => {
                    tracing::debug!(symbol = %symbol, ?reason, "Dropping symbol from alignment");
                    report.excluded.push((symbol.to_string(), reason));
                }
            }
        }

        let min_len = accepted.values().map(Vec::len).min().unwrap_or(0);
        if min_len == 0 {
            return AlignedReturns {
                report,
                ..Default::default()
            };
        }

        for returns in accepted.values_mut() {
            let excess = returns.len() - min_len;
            returns.drain(..excess);
        }

        let dates = calendar[calendar.len() - min_len..].to_vec();

        tracing::debug!(
            anchor = %anchor,
            included = accepted.len(),
            excluded = report.excluded.len(),
            periods = min_len,
            "Aligned price series"
        );

        AlignedReturns {
            returns: accepted,
            dates,
            report,
        }
    }

    /// First preferred anchor present, else the longest history.
    ///
    /// Ties on length go to the alphabetically first symbol.
    fn choose_anchor<'a>(&self, candidates: &BTreeMap<&'a str, &PriceSeries>) -> Option<&'a str> {
        if let Some(preferred) = self
            .preferred_anchors
            .iter()
            .find_map(|p| candidates.get_key_value(p.as_str()).map(|(k, _)| *k))
        {
            return Some(preferred);
        }

        let mut best: Option<(&str, usize)> = None;
        for (&symbol, series) in candidates {
            match best {
                Some((_, len)) if series.len() <= len => {}
                _ => best = Some((symbol, series.len())),
            }
        }
        best.map(|(symbol, _)| symbol)
    }
}

/// Walk the calendar, forward-filling gaps once the symbol has started quoting.
///
/// Returns the aligned prices and how many of them were forward-filled.
fn walk_calendar(calendar: &[NaiveDate], series: &PriceSeries) -> (Vec<f64>, usize) {
    let quotes: HashMap<NaiveDate, f64> =
        series.points().iter().map(|p| (p.date, p.close)).collect();

    let mut prices = Vec::with_capacity(calendar.len());
    let mut last_price: Option<f64> = None;
    let mut started = false;
    let mut missing = 0;

    for date in calendar {
        match quotes.get(date) {
            Some(&close) => {
                started = true;
                last_price = Some(close);
                prices.push(close);
            }
            None if !started => continue,
            None => {
                let Some(fill) = last_price else {
                    break;
                };
                missing += 1;
                prices.push(fill);
            }
        }
    }

    (prices, missing)
}
