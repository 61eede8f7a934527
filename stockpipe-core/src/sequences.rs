//! Sliding-window sequences for recurrent models.
//!
//! Each sample is the `length` rows before index i (all feature columns) and
//! its target is the `Close` value at i. Splits are chronological, never
//! shuffled: train first, then validation, then test.

use crate::data::provider::DataError;
use crate::features::FeatureFrame;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Column used as the prediction target.
pub const TARGET_COLUMN: &str = "Close";

/// A batch of windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceSet {
    pub features: Vec<String>,
    pub length: usize,
    /// `x[sample][step][feature]`
    pub x: Vec<Vec<Vec<f64>>>,
    pub y: Vec<f64>,
}

impl SequenceSet {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    fn slice(&self, from: usize, to: usize) -> Self {
        Self {
            features: self.features.clone(),
            length: self.length,
            x: self.x[from..to].to_vec(),
            y: self.y[from..to].to_vec(),
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<(), DataError> {
        let json = serde_json::to_string(self)
            .map_err(|e| DataError::ValidationError(format!("sequence serialization: {e}")))?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Train/validation/test partition of one stock's windows.
#[derive(Debug, Clone)]
pub struct SequenceSplit {
    pub train: SequenceSet,
    pub val: SequenceSet,
    pub test: SequenceSet,
}

impl SequenceSplit {
    /// Write `train.json`, `val.json` and `test.json` into `dir`.
    pub fn write_dir(&self, dir: &Path) -> Result<(), DataError> {
        fs::create_dir_all(dir)?;
        self.train.write_json(&dir.join("train.json"))?;
        self.val.write_json(&dir.join("val.json"))?;
        self.test.write_json(&dir.join("test.json"))?;
        Ok(())
    }
}

/// Build every window of `length` rows from `frame`.
pub fn build_windows(frame: &FeatureFrame, length: usize) -> Result<SequenceSet, DataError> {
    if length == 0 {
        return Err(DataError::ValidationError("sequence length must be > 0".into()));
    }
    let target = frame.column(TARGET_COLUMN).ok_or_else(|| {
        DataError::ValidationError(format!("{} has no {TARGET_COLUMN} column", frame.stock))
    })?;

    let rows: Vec<Vec<f64>> = (0..frame.len()).map(|i| frame.row(i)).collect();
    let mut x = Vec::new();
    let mut y = Vec::new();
    for i in length..frame.len() {
        x.push(rows[i - length..i].to_vec());
        y.push(target[i]);
    }

    Ok(SequenceSet {
        features: frame.names(),
        length,
        x,
        y,
    })
}

/// Sizes `(train, val, test)` for `n` samples.
///
/// The test share is `1 - train` of all samples, the validation share is
/// `val / (train + val)` of what remains; both round up with a plain
/// ceiling, so float excess counts (`(1 - 0.7) * 10` gives 4 test samples).
pub fn split_sizes(n: usize, train: f64, val: f64) -> (usize, usize, usize) {
    let n_test = (((1.0 - train) * n as f64).ceil() as usize).min(n);
    let rest = n - n_test;
    let n_val = ((val / (train + val) * rest as f64).ceil() as usize).min(rest);
    (rest - n_val, n_val, n_test)
}

/// Chronological split of a window set.
pub fn split_chronological(set: &SequenceSet, train: f64, val: f64) -> SequenceSplit {
    let (n_train, n_val, _) = split_sizes(set.len(), train, val);
    SequenceSplit {
        train: set.slice(0, n_train),
        val: set.slice(n_train, n_train + n_val),
        test: set.slice(n_train + n_val, set.len()),
    }
}
