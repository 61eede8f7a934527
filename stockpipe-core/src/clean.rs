//! Cleaning of raw OHLCV files.
//!
//! Any CSV with a date column is accepted. Headers are normalised, dates
//! parsed leniently, rows sorted and deduplicated by date, the OHLCV columns
//! extracted, and gaps forward-filled then back-filled.

use crate::data::raw_csv::fmt_price;
use crate::domain::Bar;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Numeric columns kept by the cleaner, in output order.
pub const KEEP_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

pub const CLEAN_HEADER: [&str; 7] = ["date", "open", "high", "low", "close", "volume", "stock"];

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("'date' column missing in {source_name}")]
    MissingDateColumn { source_name: String },

    #[error("no rows with a parseable date in {source_name}")]
    NoRows { source_name: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A cleaned, date-ordered series for one stock.
#[derive(Debug, Clone)]
pub struct CleanSeries {
    pub stock: String,
    pub bars: Vec<Bar>,
}

impl CleanSeries {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// `{dir}/{STOCK}_clean.csv`
    pub fn clean_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_clean.csv", self.stock))
    }

    /// Write the cleaned series as CSV (`date,open,high,low,close,volume,stock`).
    pub fn write_csv(&self, dir: &Path) -> Result<PathBuf, CleanError> {
        fs::create_dir_all(dir)?;
        let path = self.clean_path(dir);
        let mut wtr = csv::Writer::from_path(&path)?;
        wtr.write_record(CLEAN_HEADER)?;
        for bar in &self.bars {
            wtr.write_record([
                bar.date.format("%Y-%m-%d").to_string(),
                fmt_price(bar.open),
                fmt_price(bar.high),
                fmt_price(bar.low),
                fmt_price(bar.close),
                fmt_price(bar.volume),
                bar.symbol.clone(),
            ])?;
        }
        wtr.flush()?;
        Ok(path)
    }
}

/// Stock name for a raw file: the file stem, uppercased.
pub fn stock_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_default()
}

/// Read and clean a raw CSV file.
pub fn clean_file(path: &Path) -> Result<CleanSeries, CleanError> {
    let stock = stock_name(path);
    let file = fs::File::open(path)?;
    let bars = clean_reader(file, &stock, &path.display().to_string())?;
    Ok(CleanSeries { stock, bars })
}

/// Clean CSV content from any reader. `source_name` is only used in errors.
pub fn clean_reader<R: Read>(
    reader: R,
    stock: &str,
    source_name: &str,
) -> Result<Vec<Bar>, CleanError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let date_idx = headers
        .iter()
        .position(|h| h == "date")
        .ok_or_else(|| CleanError::MissingDateColumn {
            source_name: source_name.to_string(),
        })?;
    let col_idx: Vec<Option<usize>> = KEEP_COLUMNS
        .iter()
        .map(|name| headers.iter().position(|h| h == name))
        .collect();

    let mut rows: Vec<(NaiveDate, [f64; 5])> = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let Some(date) = record.get(date_idx).and_then(parse_date) else {
            continue;
        };
        let mut values = [f64::NAN; 5];
        for (slot, idx) in values.iter_mut().zip(&col_idx) {
            *slot = idx
                .and_then(|i| record.get(i))
                .map(parse_number)
                .unwrap_or(f64::NAN);
        }
        rows.push((date, values));
    }

    if rows.is_empty() {
        return Err(CleanError::NoRows {
            source_name: source_name.to_string(),
        });
    }

    rows.sort_by_key(|(date, _)| *date);
    rows.dedup_by_key(|(date, _)| *date);

    let mut columns: Vec<Vec<f64>> = (0..KEEP_COLUMNS.len())
        .map(|c| rows.iter().map(|(_, v)| v[c]).collect())
        .collect();
    for column in &mut columns {
        fill_missing(column);
    }

    let bars = rows
        .iter()
        .enumerate()
        .map(|(i, (date, _))| Bar {
            symbol: stock.to_string(),
            date: *date,
            open: columns[0][i],
            high: columns[1][i],
            low: columns[2][i],
            close: columns[3][i],
            volume: columns[4][i],
        })
        .collect();

    Ok(bars)
}

/// Forward-fill, then back-fill NaN gaps in place.
///
/// A column that is entirely NaN stays NaN.
pub fn fill_missing(values: &mut [f64]) {
    let mut last = f64::NAN;
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = last;
        } else {
            last = *v;
        }
    }
    let mut next = f64::NAN;
    for v in values.iter_mut().rev() {
        if v.is_nan() {
            *v = next;
        } else {
            next = *v;
        }
    }
}

/// Lenient number parsing; anything unparseable or non-finite is NaN.
pub fn parse_number(raw: &str) -> f64 {
    let trimmed = raw.trim().replace(',', "");
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => f64::NAN,
    }
}

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse a date in any of the formats seen in provider exports.
///
/// Timestamps with an offset keep the calendar date as written.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.date_naive());
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parse_date_variants() {
        assert_eq!(parse_date("2024-01-02"), Some(d("2024-01-02")));
        assert_eq!(parse_date(" 2024-01-02 00:00:00 "), Some(d("2024-01-02")));
        assert_eq!(parse_date("2024-01-02 00:00:00+05:30"), Some(d("2024-01-02")));
        assert_eq!(parse_date("2024-01-02T09:15:00+05:30"), Some(d("2024-01-02")));
        assert_eq!(parse_date("02-01-2024"), Some(d("2024-01-02")));
        assert_eq!(parse_date("01/02/2024"), Some(d("2024-01-02")));
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn fill_forward_then_backward() {
        let mut v = vec![f64::NAN, 1.0, f64::NAN, f64::NAN, 4.0, f64::NAN];
        fill_missing(&mut v);
        assert_eq!(v, vec![1.0, 1.0, 1.0, 1.0, 4.0, 4.0]);

        let mut all_nan = vec![f64::NAN, f64::NAN];
        fill_missing(&mut all_nan);
        assert!(all_nan.iter().all(|x| x.is_nan()));
    }

    #[test]
    fn headers_are_normalised_and_rows_sorted() {
        let csv = " Date ,OPEN,High,Low, Close ,Adj Close,Volume,Ticker\n\
                   2024-01-03,2,3,1,2.5,2.5,200,TCS.NS\n\
                   2024-01-02,1,2,0.5,1.5,1.5,100,TCS.NS\n";
        let bars = clean_reader(csv.as_bytes(), "TCS", "test").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, d("2024-01-02"));
        assert_eq!(bars[0].close, 1.5);
        assert_eq!(bars[1].volume, 200.0);
        assert_eq!(bars[1].symbol, "TCS");
    }

    #[test]
    fn bad_dates_dropped_and_gaps_filled() {
        let csv = "date,open,high,low,close,volume\n\
                   garbage,9,9,9,9,9\n\
                   2024-01-02,,2,0.5,1.5,100\n\
                   2024-01-03,2,3,1,abc,200\n\
                   2024-01-04,3,4,2,3.5,\n";
        let bars = clean_reader(csv.as_bytes(), "X", "test").unwrap();
        assert_eq!(bars.len(), 3);
        // open back-filled from the next row
        assert_eq!(bars[0].open, 2.0);
        // close forward-filled over the non-numeric cell
        assert_eq!(bars[1].close, 1.5);
        assert_eq!(bars[2].volume, 200.0);
    }

    #[test]
    fn duplicate_dates_keep_first() {
        let csv = "date,close\n2024-01-02,1\n2024-01-02,2\n2024-01-03,3\n";
        let bars = clean_reader(csv.as_bytes(), "X", "test").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 1.0);
        // absent columns stay NaN
        assert!(bars[0].open.is_nan());
    }

    #[test]
    fn missing_date_column_is_error() {
        let csv = "open,close\n1,2\n";
        let err = clean_reader(csv.as_bytes(), "X", "foo.csv").unwrap_err();
        assert!(matches!(err, CleanError::MissingDateColumn { .. }));
        assert!(err.to_string().contains("foo.csv"));
    }

    #[test]
    fn no_parseable_rows_is_error() {
        let csv = "date,close\nxx,1\n";
        let err = clean_reader(csv.as_bytes(), "X", "t").unwrap_err();
        assert!(matches!(err, CleanError::NoRows { .. }));
    }

    #[test]
    fn clean_file_uses_uppercased_stem_and_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("infy.csv");
        fs::write(&raw, "Date,Close\n2024-01-02,10\n").unwrap();

        let series = clean_file(&raw).unwrap();
        assert_eq!(series.stock, "INFY");

        let out = series.write_csv(dir.path()).unwrap();
        assert!(out.ends_with("INFY_clean.csv"));
        let text = fs::read_to_string(out).unwrap();
        assert_eq!(text.lines().next().unwrap(), "date,open,high,low,close,volume,stock");
        assert_eq!(text.lines().nth(1).unwrap(), "2024-01-02,,,,10,,INFY");
    }
}
