//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! Three bands (separate Indicator instances):
//! - Middle: SMA(x, period)
//! - Upper: middle + mult * stddev(x, period)
//! - Lower: middle - mult * stddev(x, period)
//!
//! Uses sample stddev (divide by N-1), so a period of 1 never produces a band.
//! Lookback: period - 1.

use super::sma::rolling_mean;
use super::Indicator;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn new(band: BollingerBand, period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        let label = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        };
        Self {
            period,
            multiplier,
            band,
            name: format!("bollinger_{label}_{period}_{multiplier}"),
        }
    }

    pub fn upper(period: usize, multiplier: f64) -> Self {
        Self::new(BollingerBand::Upper, period, multiplier)
    }

    pub fn middle(period: usize, multiplier: f64) -> Self {
        Self::new(BollingerBand::Middle, period, multiplier)
    }

    pub fn lower(period: usize, multiplier: f64) -> Self {
        Self::new(BollingerBand::Lower, period, multiplier)
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        let middle = rolling_mean(values, self.period);
        if self.band == BollingerBand::Middle {
            return middle;
        }

        let sign = if self.band == BollingerBand::Upper {
            1.0
        } else {
            -1.0
        };
        middle
            .iter()
            .enumerate()
            .map(|(i, &mean)| {
                if mean.is_nan() {
                    return f64::NAN;
                }
                let window = &values[i + 1 - self.period..=i];
                mean + sign * self.multiplier * sample_std(window, mean)
            })
            .collect()
    }
}

fn sample_std(window: &[f64], mean: f64) -> f64 {
    if window.len() < 2 {
        return f64::NAN;
    }
    let ss: f64 = window.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (window.len() - 1) as f64).sqrt()
}
