//! Per-column rescaling of feature frames.
//!
//! A scaler is fitted on one stock's frame and stored next to the processed
//! CSV as `{STOCK}_scaler.json` so model outputs can be mapped back to
//! prices later.

use crate::data::provider::DataError;
use crate::features::FeatureFrame;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ScalerKind {
    #[default]
    MinMax,
    Standard,
    None,
}

impl fmt::Display for ScalerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalerKind::MinMax => write!(f, "min-max"),
            ScalerKind::Standard => write!(f, "standard"),
            ScalerKind::None => write!(f, "none"),
        }
    }
}

impl FromStr for ScalerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "min-max" | "minmax" | "min_max" => Ok(ScalerKind::MinMax),
            "standard" | "zscore" => Ok(ScalerKind::Standard),
            "none" | "identity" => Ok(ScalerKind::None),
            other => Err(format!(
                "unknown scaler '{other}' (expected min-max, standard or none)"
            )),
        }
    }
}

/// A fitted scaler. Parameters are stored per feature, in frame column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    MinMax {
        features: Vec<String>,
        #[serde(deserialize_with = "nullable_floats")]
        mins: Vec<f64>,
        #[serde(deserialize_with = "nullable_floats")]
        maxs: Vec<f64>,
    },
    Standard {
        features: Vec<String>,
        #[serde(deserialize_with = "nullable_floats")]
        means: Vec<f64>,
        #[serde(deserialize_with = "nullable_floats")]
        stds: Vec<f64>,
    },
    Identity {
        features: Vec<String>,
    },
}

impl Scaler {
    /// Fit every column of `frame`. NaN values are ignored.
    pub fn fit(kind: ScalerKind, frame: &FeatureFrame) -> Self {
        let features = frame.names();
        match kind {
            ScalerKind::MinMax => {
                let (mins, maxs) = frame
                    .columns
                    .iter()
                    .map(|c| min_max(&c.values))
                    .unzip();
                Scaler::MinMax {
                    features,
                    mins,
                    maxs,
                }
            }
            ScalerKind::Standard => {
                let (means, stds) = frame
                    .columns
                    .iter()
                    .map(|c| mean_std(&c.values))
                    .unzip();
                Scaler::Standard {
                    features,
                    means,
                    stds,
                }
            }
            ScalerKind::None => Scaler::Identity { features },
        }
    }

    pub fn kind(&self) -> ScalerKind {
        match self {
            Scaler::MinMax { .. } => ScalerKind::MinMax,
            Scaler::Standard { .. } => ScalerKind::Standard,
            Scaler::Identity { .. } => ScalerKind::None,
        }
    }

    pub fn features(&self) -> &[String] {
        match self {
            Scaler::MinMax { features, .. }
            | Scaler::Standard { features, .. }
            | Scaler::Identity { features } => features,
        }
    }

    /// Scale `frame` in place. Its columns must match the fitted features.
    pub fn transform(&self, frame: &mut FeatureFrame) -> Result<(), DataError> {
        self.apply(frame, |x, a, b| match self {
            Scaler::MinMax { .. } => {
                let range = b - a;
                if range == 0.0 {
                    0.0
                } else {
                    (x - a) / range
                }
            }
            Scaler::Standard { .. } => (x - a) / b,
            Scaler::Identity { .. } => x,
        })
    }

    /// Undo [`Scaler::transform`] in place.
    pub fn inverse_transform(&self, frame: &mut FeatureFrame) -> Result<(), DataError> {
        self.apply(frame, |x, a, b| match self {
            Scaler::MinMax { .. } => x * (b - a) + a,
            Scaler::Standard { .. } => x * b + a,
            Scaler::Identity { .. } => x,
        })
    }

    /// Map a single value of `feature` back to its original scale.
    pub fn inverse_value(&self, feature: &str, value: f64) -> Option<f64> {
        let j = self.features().iter().position(|f| f == feature)?;
        Some(match self {
            Scaler::MinMax { mins, maxs, .. } => value * (maxs[j] - mins[j]) + mins[j],
            Scaler::Standard { means, stds, .. } => value * stds[j] + means[j],
            Scaler::Identity { .. } => value,
        })
    }

    fn params(&self, j: usize) -> (f64, f64) {
        match self {
            Scaler::MinMax { mins, maxs, .. } => (mins[j], maxs[j]),
            Scaler::Standard { means, stds, .. } => (means[j], stds[j]),
            Scaler::Identity { .. } => (0.0, 1.0),
        }
    }

    fn apply(
        &self,
        frame: &mut FeatureFrame,
        f: impl Fn(f64, f64, f64) -> f64,
    ) -> Result<(), DataError> {
        if frame.names() != self.features() {
            return Err(DataError::ValidationError(format!(
                "scaler fitted on {:?}, frame has {:?}",
                self.features(),
                frame.names()
            )));
        }
        for (j, column) in frame.columns.iter_mut().enumerate() {
            let (a, b) = self.params(j);
            for v in column.values.iter_mut().filter(|v| !v.is_nan()) {
                *v = f(*v, a, b);
            }
        }
        Ok(())
    }

    /// Write the scaler as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), DataError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| DataError::ValidationError(format!("scaler serialization: {e}")))?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, DataError> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| {
            DataError::ValidationError(format!("invalid scaler file {}: {e}", path.display()))
        })
    }
}

/// serde_json writes NaN as `null`; read it back as NaN.
fn nullable_floats<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
    let raw: Vec<Option<f64>> = Vec::deserialize(d)?;
    Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn min_max(values: &[f64]) -> (f64, f64) {
    let valid = values.iter().copied().filter(|v| !v.is_nan());
    let (mut lo, mut hi, mut any) = (f64::INFINITY, f64::NEG_INFINITY, false);
    for v in valid {
        lo = lo.min(v);
        hi = hi.max(v);
        any = true;
    }
    if any {
        (lo, hi)
    } else {
        (f64::NAN, f64::NAN)
    }
}

/// Mean and population std. A zero std becomes 1 so constant columns map to 0.
fn mean_std(values: &[f64]) -> (f64, f64) {
    let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if valid.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = valid.len() as f64;
    let mean = valid.iter().sum::<f64>() / n;
    let var = valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    (mean, if std == 0.0 { 1.0 } else { std })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn frame(close: Vec<f64>, flat: Vec<f64>) -> FeatureFrame {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..close.len())
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        let mut f = FeatureFrame::new("TCS", dates);
        f.push_column("Close", close);
        f.push_column("Flat", flat);
        f
    }

    #[test]
    fn min_max_maps_to_unit_interval() {
        let mut f = frame(vec![10.0, 15.0, 20.0], vec![3.0, 3.0, 3.0]);
        let scaler = Scaler::fit(ScalerKind::MinMax, &f);
        scaler.transform(&mut f).unwrap();
        assert_eq!(f.column("Close").unwrap(), &[0.0, 0.5, 1.0]);
        // constant column maps to 0
        assert_eq!(f.column("Flat").unwrap(), &[0.0, 0.0, 0.0]);
        assert_eq!(scaler.inverse_value("Close", 0.5), Some(15.0));
    }

    #[test]
    fn standard_uses_population_std() {
        let mut f = frame(vec![1.0, 3.0], vec![5.0, 5.0]);
        let scaler = Scaler::fit(ScalerKind::Standard, &f);
        scaler.transform(&mut f).unwrap();
        assert_eq!(f.column("Close").unwrap(), &[-1.0, 1.0]);
        assert_eq!(f.column("Flat").unwrap(), &[0.0, 0.0]);
    }

    #[test]
    fn nan_ignored_in_fit_and_passed_through() {
        let mut f = frame(vec![f64::NAN, 0.0, 10.0], vec![1.0, 2.0, 3.0]);
        let scaler = Scaler::fit(ScalerKind::MinMax, &f);
        scaler.transform(&mut f).unwrap();
        let close = f.column("Close").unwrap();
        assert!(close[0].is_nan());
        assert_eq!(&close[1..], &[0.0, 1.0]);
    }

    #[test]
    fn inverse_restores_values() {
        let original = frame(vec![12.0, 7.5, 30.0], vec![1.0, 2.0, 4.0]);
        for kind in [ScalerKind::MinMax, ScalerKind::Standard, ScalerKind::None] {
            let mut f = original.clone();
            let scaler = Scaler::fit(kind, &f);
            scaler.transform(&mut f).unwrap();
            scaler.inverse_transform(&mut f).unwrap();
            for (a, b) in f.columns.iter().zip(&original.columns) {
                for (x, y) in a.values.iter().zip(&b.values) {
                    assert!((x - y).abs() < 1e-9, "{kind}: {x} != {y}");
                }
            }
        }
    }

    #[test]
    fn mismatched_columns_rejected() {
        let fitted = frame(vec![1.0], vec![1.0]);
        let scaler = Scaler::fit(ScalerKind::MinMax, &fitted);
        let mut other = FeatureFrame::new("TCS", fitted.dates.clone());
        other.push_column("Open", vec![1.0]);
        assert!(scaler.transform(&mut other).is_err());
    }

    #[test]
    fn json_sidecar_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("TCS_scaler.json");
        let scaler = Scaler::fit(ScalerKind::MinMax, &frame(vec![1.0, 2.0], vec![3.0, 4.0]));
        scaler.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"kind\": \"min_max\""));
        assert_eq!(Scaler::load(&path).unwrap(), scaler);
    }

    #[test]
    fn all_nan_column_survives_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("X_scaler.json");
        let scaler = Scaler::fit(ScalerKind::MinMax, &frame(vec![f64::NAN], vec![2.0]));
        scaler.save(&path).unwrap();

        match Scaler::load(&path).unwrap() {
            Scaler::MinMax { mins, maxs, .. } => {
                assert!(mins[0].is_nan() && maxs[0].is_nan());
                assert_eq!(mins[1], 2.0);
            }
            other => panic!("unexpected scaler {other:?}"),
        }
    }

    #[test]
    fn kind_parse() {
        assert_eq!("min-max".parse::<ScalerKind>().unwrap(), ScalerKind::MinMax);
        assert_eq!("none".parse::<ScalerKind>().unwrap(), ScalerKind::None);
        assert!("robust".parse::<ScalerKind>().is_err());
    }
}
