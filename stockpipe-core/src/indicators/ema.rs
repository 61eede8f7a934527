//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2/(span+1).
//! Seed: EMA = first non-NaN value (no bias adjustment).
//! With `min_periods`, outputs stay NaN until that many valid values were seen.

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    min_periods: usize,
    name: String,
}

impl Ema {
    /// EMA that is valid from the first non-NaN input.
    pub fn new(span: usize) -> Self {
        assert!(span >= 1, "EMA span must be >= 1");
        Self {
            span,
            min_periods: 1,
            name: format!("ema_{span}"),
        }
    }

    /// EMA that needs `span` valid inputs before producing output.
    pub fn with_min_periods(span: usize) -> Self {
        Self {
            min_periods: span,
            ..Self::new(span)
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.min_periods.saturating_sub(1)
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        ema_of_series(values, 2.0 / (self.span as f64 + 1.0), self.min_periods)
    }
}

/// EMA of an arbitrary series with smoothing factor `alpha`.
///
/// Leading NaNs are skipped. An interior NaN carries the previous average
/// forward and is not counted towards `min_periods`.
///
/// This differs from pandas `ewm(adjust=False)`, which decays the old average
/// by `(1 - alpha)` for every NaN in the gap and renormalises: for span 3 over
/// `[4, NaN, 6]` pandas gives 5.333, this gives 5.0. Cleaned series are
/// forward-filled, so the gap case only arises on raw input.
pub fn ema_of_series(values: &[f64], alpha: f64, min_periods: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    let mut prev: Option<f64> = None;
    let mut seen = 0usize;

    for (i, &x) in values.iter().enumerate() {
        let current = match (prev, x.is_nan()) {
            (None, true) => continue,
            (None, false) => x,
            (Some(p), true) => p,
            (Some(p), false) => alpha * x + (1.0 - alpha) * p,
        };
        if !x.is_nan() {
            seen += 1;
        }
        prev = Some(current);
        if seen >= min_periods.max(1) {
            result[i] = current;
        }
    }

    result
}
