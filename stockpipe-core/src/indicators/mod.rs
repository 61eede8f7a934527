//! Technical indicators over a single numeric series.
//!
//! Every indicator is a pure function from a series (close prices, volume,
//! another indicator) to a series of the same length. Warm-up positions are
//! `f64::NAN`.
//!
//! Multi-output indicators (MACD, Bollinger) are exposed as separate named
//! instances per line, keeping the single-series `Indicator` trait unchanged.

pub mod bollinger;
pub mod ema;
pub mod lag;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use bollinger::{Bollinger, BollingerBand};
pub use ema::{ema_of_series, Ema};
pub use lag::Lag;
pub use macd::{Macd, MacdLine};
pub use rsi::{Rsi, Smoothing};
pub use sma::{rolling_mean, Sma};

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No output at index t may depend on input from index t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "rsi_14_wilder").
    fn name(&self) -> &str;

    /// Number of leading positions that are NaN on a clean input.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire series.
    ///
    /// Returns a `Vec<f64>` of the same length as `values`.
    fn compute(&self, values: &[f64]) -> Vec<f64>;
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Ascending series `start, start+1, ...` of length `n`.
#[cfg(test)]
pub fn ramp(start: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + i as f64).collect()
}
