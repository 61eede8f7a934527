//! Ticker lists: the set of symbols a job works through.
//!
//! Lists come from the built-in NSE default or from a plain text file with
//! one ticker per line (`#` comments and blank lines ignored).

use super::provider::DataError;
use crate::domain::normalize_nse;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The ten large-cap NSE tickers collected by default.
pub const DEFAULT_NSE_TICKERS: [&str; 10] = [
    "RELIANCE.NS",
    "TCS.NS",
    "HDFCBANK.NS",
    "ICICIBANK.NS",
    "INFY.NS",
    "ITC.NS",
    "LT.NS",
    "SBIN.NS",
    "BHARTIARTL.NS",
    "HINDUNILVR.NS",
];

/// An ordered list of tickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerList {
    pub tickers: Vec<String>,
}

impl TickerList {
    pub fn new(tickers: Vec<String>) -> Self {
        Self { tickers }
    }

    /// The default ten-ticker NSE universe.
    pub fn default_nse() -> Self {
        Self::new(DEFAULT_NSE_TICKERS.iter().map(|t| t.to_string()).collect())
    }

    /// Load a list from a text file.
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Parse one ticker per line.
    pub fn parse(content: &str) -> Self {
        let tickers = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(String::from)
            .collect();
        Self::new(tickers)
    }

    /// Parse a comma-separated list (CLI `--tickers a,b,c`).
    pub fn from_csv_arg(arg: &str) -> Self {
        let tickers = arg
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        Self::new(tickers)
    }

    /// Apply the `.NS` suffix rule and drop duplicates, keeping first occurrence.
    pub fn normalized(&self) -> Self {
        let mut seen = std::collections::HashSet::new();
        let tickers = self
            .tickers
            .iter()
            .map(|t| normalize_nse(t))
            .filter(|t| seen.insert(t.clone()))
            .collect();
        Self::new(tickers)
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tickers.iter().map(|t| t.as_str())
    }
}
