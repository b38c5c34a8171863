//! Timeframe labels and the lookback windows they resolve to.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// History window requested from a price source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Lookback {
    OneMonth,
    ThreeMonths,
    SixMonths,
    #[default]
    YearToDate,
    OneYear,
    TwoYears,
    FiveYears,
}

impl Lookback {
    /// Resolve a free-form timeframe label.
    ///
    /// Accepts things like `"YTD"`, `"6m"`, `"1 year"`, `"last 9 months"`.
    /// Empty and "all time" labels map to one year; anything unrecognized maps
    /// to six months.
    pub fn from_label(label: &str) -> Self {
        let s = label.trim().to_lowercase();
        if s.is_empty() || matches!(s.as_str(), "all time" | "alltime" | "lifetime") {
            return Lookback::OneYear;
        }

        if let Some(months) = leading_month_count(&s) {
            return Self::from_months(months);
        }

        match s.as_str() {
            "ytd" | "year to date" | "year-to-date" => Lookback::YearToDate,
            "1m" | "1 month" | "1mo" => Lookback::OneMonth,
            "3m" | "3 months" | "3mo" => Lookback::ThreeMonths,
            "4m" | "four months" | "last four months" => Lookback::SixMonths,
            "6m" | "6 months" | "6mo" | "last six months" => Lookback::SixMonths,
            "1y" | "12m" | "12 months" | "1 year" | "last 12 months" => Lookback::OneYear,
            "2y" | "2 years" => Lookback::TwoYears,
            "5y" | "5 years" => Lookback::FiveYears,
            _ => Lookback::SixMonths,
        }
    }

    /// Smallest window covering `months` months.
    pub fn from_months(months: u32) -> Self {
        match months {
            0..=1 => Lookback::OneMonth,
            2..=3 => Lookback::ThreeMonths,
            4..=6 => Lookback::SixMonths,
            7..=12 => Lookback::OneYear,
            13..=24 => Lookback::TwoYears,
            _ => Lookback::FiveYears,
        }
    }

    /// First calendar day inside the window ending at `as_of`.
    pub fn start_date(&self, as_of: NaiveDate) -> NaiveDate {
        let months = match self {
            Lookback::YearToDate => {
                return NaiveDate::from_ymd_opt(as_of.year(), 1, 1).unwrap_or(as_of);
            }
            Lookback::OneMonth => 1,
            Lookback::ThreeMonths => 3,
            Lookback::SixMonths => 6,
            Lookback::OneYear => 12,
            Lookback::TwoYears => 24,
            Lookback::FiveYears => 60,
        };
        as_of
            .checked_sub_months(Months::new(months))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Short range code understood by common chart APIs (`"6mo"`, `"1y"`, ...).
    pub fn range_code(&self) -> &'static str {
        match self {
            Lookback::OneMonth => "1mo",
            Lookback::ThreeMonths => "3mo",
            Lookback::SixMonths => "6mo",
            Lookback::YearToDate => "ytd",
            Lookback::OneYear => "1y",
            Lookback::TwoYears => "2y",
            Lookback::FiveYears => "5y",
        }
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.range_code())
    }
}

/// Parse `"[last ]N month(s)"`, returning N.
fn leading_month_count(s: &str) -> Option<u32> {
    let rest = s.strip_prefix("last").map(str::trim_start).unwrap_or(s);
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    let unit = rest[digits.len()..].trim_start();
    if unit.starts_with("month") {
        digits.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_from_label_aliases() {
        assert_eq!(Lookback::from_label("YTD"), Lookback::YearToDate);
        assert_eq!(Lookback::from_label("year-to-date"), Lookback::YearToDate);
        assert_eq!(Lookback::from_label("1y"), Lookback::OneYear);
        assert_eq!(Lookback::from_label("3m"), Lookback::ThreeMonths);
        assert_eq!(Lookback::from_label("last four months"), Lookback::SixMonths);
        assert_eq!(Lookback::from_label("2y"), Lookback::TwoYears);
    }

    #[test]
    fn test_from_label_month_counts() {
        assert_eq!(Lookback::from_label("last 9 months"), Lookback::OneYear);
        assert_eq!(Lookback::from_label("2 months"), Lookback::ThreeMonths);
        assert_eq!(Lookback::from_label("Last 1 month"), Lookback::OneMonth);
        assert_eq!(Lookback::from_label("18 months"), Lookback::TwoYears);
        assert_eq!(Lookback::from_label("36 months"), Lookback::FiveYears);
    }

    #[test]
    fn test_from_label_fallbacks() {
        assert_eq!(Lookback::from_label(""), Lookback::OneYear);
        assert_eq!(Lookback::from_label("all time"), Lookback::OneYear);
        assert_eq!(Lookback::from_label("since the dawn of time"), Lookback::SixMonths);
    }

    #[test]
    fn test_start_date() {
        let as_of = d("2024-08-31");
        assert_eq!(Lookback::YearToDate.start_date(as_of), d("2024-01-01"));
        assert_eq!(Lookback::SixMonths.start_date(as_of), d("2024-02-29"));
        assert_eq!(Lookback::OneYear.start_date(as_of), d("2023-08-31"));
        assert_eq!(Lookback::FiveYears.start_date(as_of), d("2019-08-31"));
    }

    #[test]
    fn test_range_code() {
        assert_eq!(Lookback::SixMonths.range_code(), "6mo");
        assert_eq!(Lookback::YearToDate.to_string(), "ytd");
    }
}
