//! Moving Average Convergence Divergence (MACD).
//!
//! Two outputs, as separate instances:
//! - Line: EMA(fast) - EMA(slow)
//! - Signal: EMA(signal) of the line
//!
//! With `min_periods`, each EMA waits for its own span of valid inputs, so
//! the line starts at index slow-1 and the signal at slow+signal-2.

use super::ema::ema_of_series;
use super::Indicator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdLine {
    Line,
    Signal,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    min_periods: bool,
    output: MacdLine,
    name: String,
}

impl Macd {
    pub fn line(fast: usize, slow: usize) -> Self {
        assert!(fast >= 1 && slow >= 1, "MACD spans must be >= 1");
        Self {
            fast,
            slow,
            signal: 9,
            min_periods: false,
            output: MacdLine::Line,
            name: format!("macd_{fast}_{slow}"),
        }
    }

    pub fn signal_line(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(signal >= 1, "MACD signal span must be >= 1");
        Self {
            signal,
            output: MacdLine::Signal,
            name: format!("macd_signal_{fast}_{slow}_{signal}"),
            ..Self::line(fast, slow)
        }
    }

    /// Require a full span of valid inputs for every EMA involved.
    pub fn with_min_periods(mut self) -> Self {
        self.min_periods = true;
        self
    }

    fn periods(&self, span: usize) -> usize {
        if self.min_periods {
            span
        } else {
            1
        }
    }
}

fn alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        if !self.min_periods {
            return 0;
        }
        let line = self.fast.max(self.slow) - 1;
        match self.output {
            MacdLine::Line => line,
            MacdLine::Signal => line + self.signal - 1,
        }
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        let fast = ema_of_series(values, alpha(self.fast), self.periods(self.fast));
        let slow = ema_of_series(values, alpha(self.slow), self.periods(self.slow));
        let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();

        match self.output {
            MacdLine::Line => line,
            MacdLine::Signal => {
                ema_of_series(&line, alpha(self.signal), self.periods(self.signal))
            }
        }
    }
}
