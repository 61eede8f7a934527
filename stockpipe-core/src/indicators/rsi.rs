//! Relative Strength Index (RSI).
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//!
//! The change at index 0 (and any change touching a NaN) counts as zero, so
//! the first valid value sits at index period-1. Two averaging schemes:
//! - `Simple`: rolling mean of gains and losses over `period` changes.
//!   avg_loss == 0 → 100 if there were gains, NaN on a flat window.
//! - `Wilder`: exponential mean with alpha = 1/period after `period` changes.
//!   avg_loss == 0 → 100.
//!
//! Lookback: period - 1.

use super::ema::ema_of_series;
use super::sma::rolling_mean;
use super::Indicator;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Smoothing {
    Simple,
    Wilder,
}

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    smoothing: Smoothing,
    name: String,
}

impl Rsi {
    pub fn new(period: usize, smoothing: Smoothing) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        let suffix = match smoothing {
            Smoothing::Simple => "simple",
            Smoothing::Wilder => "wilder",
        };
        Self {
            period,
            smoothing,
            name: format!("rsi_{period}_{suffix}"),
        }
    }

    pub fn wilder(period: usize) -> Self {
        Self::new(period, Smoothing::Wilder)
    }

    pub fn simple(period: usize) -> Self {
        Self::new(period, Smoothing::Simple)
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        let n = values.len();
        let mut gains = vec![0.0; n];
        let mut losses = vec![0.0; n];
        for i in 1..n {
            let change = values[i] - values[i - 1];
            if change > 0.0 {
                gains[i] = change;
            } else if change < 0.0 {
                losses[i] = -change;
            }
        }

        let (avg_gain, avg_loss) = match self.smoothing {
            Smoothing::Simple => (
                rolling_mean(&gains, self.period),
                rolling_mean(&losses, self.period),
            ),
            Smoothing::Wilder => {
                let alpha = 1.0 / self.period as f64;
                (
                    ema_of_series(&gains, alpha, self.period),
                    ema_of_series(&losses, alpha, self.period),
                )
            }
        };

        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&g, &l)| rsi_value(g, l, self.smoothing))
            .collect()
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64, smoothing: Smoothing) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        return f64::NAN;
    }
    if avg_loss == 0.0 {
        return match smoothing {
            Smoothing::Simple if avg_gain == 0.0 => f64::NAN,
            _ => 100.0,
        };
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}
