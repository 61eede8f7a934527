//! Synthetic data provider for offline runs.
//!
//! Produces a deterministic random walk per symbol (seeded from the BLAKE3
//! hash of the symbol name) on weekdays only. Output is clearly fake and is
//! tagged `DataSource::Synthetic`.

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::RawBar;
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Offline provider returning generated bars.
#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider {
    /// Symbols that should come back empty (to exercise "no data" paths).
    empty_symbols: Vec<String>,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `symbol` return zero bars.
    pub fn with_empty(mut self, symbol: impl Into<String>) -> Self {
        self.empty_symbols.push(symbol.into());
        self
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let bars = if self.empty_symbols.iter().any(|s| s == symbol) {
            Vec::new()
        } else {
            generate_bars(symbol, start, end)
        };
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::Synthetic,
        })
    }
}

/// Generate weekday bars over `[start, end)`.
pub fn generate_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<RawBar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut price = 100.0 + rng.gen_range(0.0..900.0);
    let mut bars = Vec::new();
    let mut current = start;

    while current < end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(RawBar {
            date: current,
            open,
            high,
            low,
            close,
            adj_close: close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}
