use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Top-level JSON object as returned by the `/query` endpoint.
pub type RawSeriesResponse = serde_json::Map<String, serde_json::Value>;

// ── Price record ──────────────────────────────────────────────────────────────

/// One OHLC bar for a trading period. Field order is the CSV column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

// ── Period ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Daily, Period::Weekly, Period::Monthly];

    /// Value of the `function` query parameter.
    pub fn api_function(self) -> &'static str {
        match self {
            Period::Daily => "TIME_SERIES_DAILY",
            Period::Weekly => "TIME_SERIES_WEEKLY",
            Period::Monthly => "TIME_SERIES_MONTHLY",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Output size ───────────────────────────────────────────────────────────────

/// `compact` returns the latest 100 points, `full` the whole history.
/// Only the daily function accepts it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derive(clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputSize {
    #[default]
    Compact,
    Full,
}

impl OutputSize {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        }
    }
}

// ── Fetch plan ────────────────────────────────────────────────────────────────

/// Everything one `fetch` run requests: every symbol × every period.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPlan {
    pub symbols: Vec<String>,
    pub periods: Vec<Period>,
    pub outputsize: OutputSize,
}

impl FetchPlan {
    /// Symbols are validated and upper-cased; duplicates are dropped.
    pub fn new(
        symbols: &[String],
        periods: &[Period],
        outputsize: OutputSize,
    ) -> Result<Self, InvalidSymbol> {
        let mut normalised: Vec<String> = Vec::with_capacity(symbols.len());
        for s in symbols {
            let s = parse_symbol(s)?;
            if !normalised.contains(&s) {
                normalised.push(s);
            }
        }

        let mut periods = periods.to_vec();
        periods.sort();
        periods.dedup();

        Ok(Self {
            symbols: normalised,
            periods,
            outputsize,
        })
    }

    pub fn task_count(&self) -> usize {
        self.symbols.len() * self.periods.len()
    }
}

// ── Symbol ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq)]
#[error("invalid symbol {0:?}: expected letters, digits, '.', '_' or '-', not starting with '.'")]
pub struct InvalidSymbol(pub String);

/// Trim and upper-case a ticker. The result is used as a file-name part, so
/// only `[A-Z0-9._-]` is accepted and a leading dot is rejected.
pub fn parse_symbol(s: &str) -> Result<String, InvalidSymbol> {
    let symbol = s.trim().to_uppercase();
    let valid = !symbol.is_empty()
        && !symbol.starts_with('.')
        && symbol
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));

    if valid { Ok(symbol) } else { Err(InvalidSymbol(s.to_string())) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_names() {
        assert_eq!(Period::Weekly.api_function(), "TIME_SERIES_WEEKLY");
        assert_eq!(Period::from_name("monthly"), Some(Period::Monthly));
        assert_eq!(Period::from_name("Monthly"), None);
        assert_eq!(Period::Daily.to_string(), "daily");
    }

    #[test]
    fn test_fetch_plan_normalises() {
        let symbols = vec![" aapl".to_string(), "AAPL".to_string(), "ibm".to_string()];
        let plan = FetchPlan::new(
            &symbols,
            &[Period::Monthly, Period::Daily, Period::Monthly],
            OutputSize::Full,
        )
        .unwrap();
        assert_eq!(plan.symbols, vec!["AAPL", "IBM"]);
        assert_eq!(plan.periods, vec![Period::Daily, Period::Monthly]);
        assert_eq!(plan.task_count(), 4);
    }

    #[test]
    fn test_fetch_plan_rejects_path_like_symbol() {
        let symbols = vec!["IBM".to_string(), "../x".to_string()];
        assert_eq!(
            FetchPlan::new(&symbols, &[Period::Daily], OutputSize::Compact),
            Err(InvalidSymbol("../x".to_string()))
        );
    }

    #[test]
    fn test_parse_symbol() {
        assert_eq!(parse_symbol(" brk.b "), Ok("BRK.B".to_string()));
        assert_eq!(parse_symbol("rds-a"), Ok("RDS-A".to_string()));
        assert_eq!(parse_symbol("7203_T"), Ok("7203_T".to_string()));
        for bad in ["", "   ", "../x", "a/b", "a\\b", ".hidden", "..", "AA PL", "É"] {
            assert!(parse_symbol(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
