//! Analysis configuration.
//!
//! Defaults can be overridden by a TOML file and then by environment variables:
//!
//! - `STANLEY_ANALYTICS_CONFIG`: path to the TOML file
//!   (default `~/.zee/stanley/analytics.toml`)
//! - `STANLEY_RISK_FREE_RATE`: per-period risk-free rate
//! - `STANLEY_PERIODS_PER_YEAR`: annualization factor
//! - `STANLEY_CONCENTRATION_THRESHOLD`: weight above which a position is flagged

use crate::series::DEFAULT_MAX_MISSING_RATIO;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Tunables for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Risk-free rate in the same periodicity as the returns (daily by default)
    pub risk_free_rate: f64,
    /// Return periods per year, used only for the `*_annual` fields
    pub periods_per_year: f64,
    /// Target return for the Sortino downside deviation
    pub sortino_target: f64,
    /// Normalized weight above which a concentration warning is raised
    pub concentration_threshold: f64,
    /// Number of winners/losers and top/bottom sectors to report
    pub top_k: usize,
    /// Largest tolerated share of forward-filled days per symbol
    pub max_missing_ratio: f64,
    /// Symbols preferred as the alignment anchor, in order
    pub anchor_symbols: Vec<String>,
    /// Benchmarks compared against the portfolio
    pub benchmark_symbols: Vec<String>,
    /// Market proxy used for beta
    pub market_symbol: String,
    /// Fetch price histories concurrently (requires the `parallel` feature)
    pub parallel_fetch: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            periods_per_year: 252.0,
            sortino_target: 0.0,
            concentration_threshold: 0.10,
            top_k: 5,
            max_missing_ratio: DEFAULT_MAX_MISSING_RATIO,
            anchor_symbols: vec!["SPY".to_string()],
            benchmark_symbols: vec!["SPY".to_string(), "QQQ".to_string()],
            market_symbol: "SPY".to_string(),
            parallel_fetch: true,
        }
    }
}

impl AnalyticsConfig {
    /// Get the default config file path.
    ///
    /// Default path: `~/.zee/stanley/analytics.toml`
    /// Can be overridden with `STANLEY_ANALYTICS_CONFIG` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("STANLEY_ANALYTICS_CONFIG") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".zee/stanley/analytics.toml"))
            .unwrap_or_else(|| PathBuf::from("analytics.toml"))
    }

    /// Load from the default path, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_path(&Self::default_path())?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No analytics config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded analytics config");
        Ok(config.normalized())
    }

    /// Set the risk-free rate from an annual figure.
    pub fn with_annual_risk_free_rate(mut self, annual_rate: f64) -> Self {
        self.risk_free_rate = annual_rate / self.periods_per_year;
        self
    }

    pub fn with_benchmarks(mut self, symbols: &[&str]) -> Self {
        self.benchmark_symbols = symbols.iter().map(|s| s.to_string()).collect();
        self.normalized()
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.periods_per_year.is_finite() && self.periods_per_year > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "periods_per_year must be positive, got {}",
                self.periods_per_year
            )));
        }
        if !(0.0..=1.0).contains(&self.max_missing_ratio) {
            return Err(Error::InvalidConfig(format!(
                "max_missing_ratio must be within [0, 1], got {}",
                self.max_missing_ratio
            )));
        }
        if !self.concentration_threshold.is_finite() {
            return Err(Error::InvalidConfig(
                "concentration_threshold must be finite".to_string(),
            ));
        }
        if !self.risk_free_rate.is_finite() || !self.sortino_target.is_finite() {
            return Err(Error::InvalidConfig(
                "risk_free_rate and sortino_target must be finite".to_string(),
            ));
        }
        if self.market_symbol.trim().is_empty() {
            return Err(Error::InvalidConfig("market_symbol is empty".to_string()));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(rate) = env_f64("STANLEY_RISK_FREE_RATE")? {
            self.risk_free_rate = rate;
        }
        if let Some(ppy) = env_f64("STANLEY_PERIODS_PER_YEAR")? {
            self.periods_per_year = ppy;
        }
        if let Some(threshold) = env_f64("STANLEY_CONCENTRATION_THRESHOLD")? {
            self.concentration_threshold = threshold;
        }
        Ok(())
    }

    /// Upper-case every symbol list.
    fn normalized(mut self) -> Self {
        let upper = |v: &[String]| -> Vec<String> {
            v.iter()
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        self.anchor_symbols = upper(&self.anchor_symbols);
        self.benchmark_symbols = upper(&self.benchmark_symbols);
        self.market_symbol = self.market_symbol.trim().to_uppercase();
        self
    }
}

fn env_f64(key: &str) -> Result<Option<f64>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| Error::InvalidConfig(format!("{} is not a number: {:?}", key, raw))),
        Err(_) => Ok(None),
    }
}
