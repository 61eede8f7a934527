//! Preprocess job: clean every raw CSV, build features, scale and write the
//! processed sinks.
//!
//! Per file: `{STOCK}_clean.csv` + rows in `stocks_cleaned`, then
//! `{STOCK}.csv`, `{STOCK}_scaler.json`, table `processed_{stock}` and
//! optionally `{STOCK}.parquet`. `stocks_cleaned` is dropped once at the start
//! of every run.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use stockpipe_core::clean::clean_file;
use stockpipe_core::data::{write_frame_parquet, DataError, Database};
use stockpipe_core::features::{build_features, FeatureOptions};
use stockpipe_core::scaling::{Scaler, ScalerKind};

use crate::error::JobError;
use crate::stats::RunStats;

/// Options for [`preprocess`].
#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub features: FeatureOptions,
    pub scaler: ScalerKind,
    pub write_parquet: bool,
}

/// Clean, featurise and scale every CSV in `raw_dir`.
pub fn preprocess(db: &mut Database, opts: &PreprocessOptions) -> Result<RunStats, JobError> {
    let started = Instant::now();
    db.reset_cleaned()?;

    let entries = list_dir(&opts.raw_dir)?;
    let mut stats = RunStats::new(entries.len());
    if entries.is_empty() {
        tracing::warn!(dir = %opts.raw_dir.display(), "no raw files to process");
    }
    fs::create_dir_all(&opts.processed_dir)?;

    tracing::info!(
        files = entries.len(),
        feature_set = %opts.features.feature_set,
        scaler = %opts.scaler,
        "preprocess starting"
    );

    for path in &entries {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            tracing::warn!("skipping non-CSV file {name}");
            stats.skipped += 1;
            continue;
        }

        match process_file(db, path, opts) {
            Ok(Some(rows)) => {
                tracing::info!(file = name.as_str(), rows, "processed");
                stats.record_success(rows);
            }
            Ok(None) => {
                tracing::warn!(file = name.as_str(), "no rows left after feature building");
                stats.empty += 1;
            }
            Err(e) => {
                tracing::error!(file = name.as_str(), error = %e, "processing failed");
                stats.record_failure(&name, &e);
            }
        }
    }

    stats.finish(started);
    Ok(stats)
}

/// Returns the processed row count, or `None` when the feature frame is empty.
fn process_file(
    db: &mut Database,
    path: &Path,
    opts: &PreprocessOptions,
) -> Result<Option<usize>, DataError> {
    let series = clean_file(path)?;
    let clean_path = series.write_csv(&opts.processed_dir)?;
    tracing::debug!(stock = series.stock.as_str(), rows = series.len(), path = %clean_path.display(), "cleaned");
    db.append_cleaned(&series.bars)?;
    let insane = series.bars.iter().filter(|b| !b.is_sane()).count();
    if insane > 0 {
        tracing::warn!(stock = series.stock.as_str(), rows = insane, "rows fail the OHLC sanity check");
    }

    let mut frame = build_features(&series.stock, &series.bars, &opts.features);
    if frame.is_empty() {
        return Ok(None);
    }

    let scaler = Scaler::fit(opts.scaler, &frame);
    scaler.transform(&mut frame)?;

    let stock = &series.stock;
    frame.write_csv(&opts.processed_dir.join(format!("{stock}.csv")))?;
    scaler.save(&opts.processed_dir.join(format!("{stock}_scaler.json")))?;
    db.replace_processed(&frame)?;
    if opts.write_parquet {
        write_frame_parquet(&frame, &opts.processed_dir.join(format!("{stock}.parquet")))?;
    }
    Ok(Some(frame.len()))
}

/// Regular files in `dir`, sorted. A missing directory is empty.
fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
