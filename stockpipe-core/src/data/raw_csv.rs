//! Flat-file store for raw collector output.
//!
//! Layout: `{raw_dir}/{file_stem}.csv`, one file per ticker, header
//! `Date,Open,High,Low,Close,Adj Close,Volume,Ticker`.
//!
//! - Full writes are atomic (write to .tmp, rename into place)
//! - Appends add rows without a header (incremental updates)
//! - NaN prices are written as empty fields

use super::provider::DataError;
use crate::clean::parse_date;
use crate::domain::{file_stem, RawBar};
use chrono::NaiveDate;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub const RAW_HEADER: [&str; 8] = [
    "Date", "Open", "High", "Low", "Close", "Adj Close", "Volume", "Ticker",
];

/// Raw CSV store rooted at a directory.
#[derive(Debug, Clone)]
pub struct RawCsvStore {
    dir: PathBuf,
}

impl RawCsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the CSV file for a ticker.
    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", file_stem(ticker)))
    }

    /// Overwrite the ticker's file with `bars`.
    pub fn write(&self, ticker: &str, bars: &[RawBar]) -> Result<PathBuf, DataError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(ticker);
        let tmp_path = path.with_extension("csv.tmp");

        {
            let mut wtr = csv::Writer::from_path(&tmp_path)?;
            wtr.write_record(RAW_HEADER)?;
            for bar in bars {
                wtr.write_record(raw_record(bar, ticker))?;
            }
            wtr.flush()?;
        }

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            e
        })?;
        Ok(path)
    }

    /// Append `bars` to an existing file, without a header.
    pub fn append(&self, ticker: &str, bars: &[RawBar]) -> Result<usize, DataError> {
        let path = self.path_for(ticker);
        let file = OpenOptions::new().append(true).open(&path)?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        for bar in bars {
            wtr.write_record(raw_record(bar, ticker))?;
        }
        wtr.flush()?;
        Ok(bars.len())
    }

    /// Last parseable date in the ticker's file.
    ///
    /// `None` when the file is missing, empty, has no `Date` column, or no
    /// row carries a parseable date.
    pub fn last_date(&self, ticker: &str) -> Result<Option<NaiveDate>, DataError> {
        let path = self.path_for(ticker);
        if !path.exists() {
            return Ok(None);
        }
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(&path)?;
        let headers = rdr.headers()?.clone();
        let Some(date_idx) = column_index(&headers, "date") else {
            return Ok(None);
        };

        let mut last = None;
        for record in rdr.records() {
            let record = record?;
            if let Some(date) = record.get(date_idx).and_then(parse_date) {
                last = Some(date);
            }
        }
        Ok(last)
    }

    /// Read a ticker's raw bars back.
    pub fn read(&self, ticker: &str) -> Result<Vec<RawBar>, DataError> {
        read_raw_csv(&self.path_for(ticker))
    }

    /// CSV files in the store, sorted by name. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<PathBuf>, DataError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("csv") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Read a raw CSV file. Rows without a parseable date are skipped.
pub fn read_raw_csv(path: &Path) -> Result<Vec<RawBar>, DataError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    let date_idx = column_index(&headers, "date")
        .ok_or_else(|| DataError::ValidationError(format!("no Date column in {}", path.display())))?;
    let idx = |name: &str| column_index(&headers, name);
    let (open, high, low, close, adj, vol) = (
        idx("open"),
        idx("high"),
        idx("low"),
        idx("close"),
        idx("adj close"),
        idx("volume"),
    );

    let mut bars = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let Some(date) = record.get(date_idx).and_then(parse_date) else {
            continue;
        };
        let num = |i: Option<usize>| {
            i.and_then(|i| record.get(i))
                .and_then(|v| v.trim().parse::<f64>().ok())
                .unwrap_or(f64::NAN)
        };
        let close_v = num(close);
        let adj_v = num(adj);
        bars.push(RawBar {
            date,
            open: num(open),
            high: num(high),
            low: num(low),
            close: close_v,
            adj_close: if adj_v.is_nan() { close_v } else { adj_v },
            volume: vol
                .and_then(|i| record.get(i))
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v as u64)
                .unwrap_or(0),
        });
    }
    Ok(bars)
}

/// Case-insensitive header lookup.
fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn raw_record(bar: &RawBar, ticker: &str) -> [String; 8] {
    [
        bar.date.format("%Y-%m-%d").to_string(),
        fmt_price(bar.open),
        fmt_price(bar.high),
        fmt_price(bar.low),
        fmt_price(bar.close),
        fmt_price(bar.adj_close),
        bar.volume.to_string(),
        ticker.to_string(),
    ]
}

/// NaN becomes an empty field.
pub fn fmt_price(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}
