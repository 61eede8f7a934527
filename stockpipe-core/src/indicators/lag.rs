//! Lagged copy of a series: output[t] = x[t - k].

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Lag {
    steps: usize,
    name: String,
}

impl Lag {
    pub fn new(steps: usize) -> Self {
        Self {
            steps,
            name: format!("lag_{steps}"),
        }
    }
}

impl Indicator for Lag {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.steps
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        (0..values.len())
            .map(|i| {
                i.checked_sub(self.steps)
                    .map(|j| values[j])
                    .unwrap_or(f64::NAN)
            })
            .collect()
    }
}
