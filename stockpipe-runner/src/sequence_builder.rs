//! Sequences job: turn processed CSVs into train/val/test window sets.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use stockpipe_core::data::DataError;
use stockpipe_core::features::FeatureFrame;
use stockpipe_core::sequences::{build_windows, split_chronological};

use crate::error::JobError;
use crate::stats::RunStats;

/// Options for [`build_sequences`].
#[derive(Debug, Clone)]
pub struct SequenceOptions {
    pub processed_dir: PathBuf,
    pub sequence_dir: PathBuf,
    pub length: usize,
    pub train_fraction: f64,
    pub val_fraction: f64,
    /// Stocks with fewer windows than this are skipped.
    pub min_samples: usize,
}

/// Build windows for every processed stock under `processed_dir`.
pub fn build_sequences(opts: &SequenceOptions) -> Result<RunStats, JobError> {
    let started = Instant::now();
    let files = processed_files(&opts.processed_dir)?;
    let mut stats = RunStats::new(files.len());
    if files.is_empty() {
        tracing::warn!(dir = %opts.processed_dir.display(), "no processed files, run preprocess first");
    }

    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match build_one(path, opts) {
            Ok(Some((stock, windows))) => {
                tracing::info!(stock = stock.as_str(), windows, "sequences written");
                stats.record_success(windows);
            }
            Ok(None) => stats.skipped += 1,
            Err(e) => {
                tracing::error!(file = name.as_str(), error = %e, "sequence building failed");
                stats.record_failure(&name, &e);
            }
        }
    }

    stats.finish(started);
    Ok(stats)
}

/// `{STOCK}_scaler.json` beside a processed CSV.
fn scaler_sidecar(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_scaler.json"))
}

fn build_one(path: &Path, opts: &SequenceOptions) -> Result<Option<(String, usize)>, DataError> {
    let scaler = scaler_sidecar(path);
    if !scaler.exists() {
        tracing::warn!(
            file = %path.display(),
            scaler = %scaler.display(),
            "missing scaler file, skipping"
        );
        return Ok(None);
    }
    let frame = FeatureFrame::read_csv(path)?;
    let set = build_windows(&frame, opts.length)?;
    if set.len() < opts.min_samples {
        tracing::warn!(
            stock = frame.stock.as_str(),
            windows = set.len(),
            min = opts.min_samples,
            "not enough samples, skipping"
        );
        return Ok(None);
    }
    let split = split_chronological(&set, opts.train_fraction, opts.val_fraction);
    split.write_dir(&opts.sequence_dir.join(&frame.stock))?;
    tracing::debug!(
        stock = frame.stock.as_str(),
        train = split.train.len(),
        val = split.val.len(),
        test = split.test.len(),
        "split"
    );
    Ok(Some((frame.stock, set.len())))
}

/// Processed feature CSVs (`{STOCK}.csv`), excluding `*_clean.csv`.
fn processed_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path.extension().and_then(|e| e.to_str()) == Some("csv");
        let is_clean = path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.ends_with("_clean"));
        if path.is_file() && is_csv && !is_clean {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
