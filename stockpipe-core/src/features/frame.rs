//! Column-oriented feature table for a single stock.

use crate::clean::{parse_date, parse_number};
use crate::data::provider::DataError;
use crate::data::raw_csv::fmt_price;
use crate::domain::Bar;
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

/// One named numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Date-indexed feature table. Every column has one value per date.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    pub stock: String,
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<FeatureColumn>,
}

impl FeatureFrame {
    pub fn new(stock: impl Into<String>, dates: Vec<NaiveDate>) -> Self {
        Self {
            stock: stock.into(),
            dates,
            columns: Vec::new(),
        }
    }

    /// Base frame with `Open High Low Close Volume` from cleaned bars.
    pub fn from_bars(stock: &str, bars: &[Bar]) -> Self {
        let mut frame = Self::new(stock, bars.iter().map(|b| b.date).collect());
        frame.push_column("Open", bars.iter().map(|b| b.open).collect());
        frame.push_column("High", bars.iter().map(|b| b.high).collect());
        frame.push_column("Low", bars.iter().map(|b| b.low).collect());
        frame.push_column("Close", bars.iter().map(|b| b.close).collect());
        frame.push_column("Volume", bars.iter().map(|b| b.volume).collect());
        frame
    }

    /// Append a column. Panics if the length differs from the date index.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) {
        let name = name.into();
        assert_eq!(
            values.len(),
            self.dates.len(),
            "column {name} length does not match the date index"
        );
        self.columns.push(FeatureColumn { name, values });
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of feature columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Values of row `i` across all columns, in column order.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c.values[i]).collect()
    }

    /// Keep only the rows matching `keep(i)`.
    fn retain_rows(&self, keep: impl Fn(usize) -> bool) -> Self {
        let idx: Vec<usize> = (0..self.len()).filter(|&i| keep(i)).collect();
        Self {
            stock: self.stock.clone(),
            dates: idx.iter().map(|&i| self.dates[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| FeatureColumn {
                    name: c.name.clone(),
                    values: idx.iter().map(|&i| c.values[i]).collect(),
                })
                .collect(),
        }
    }

    /// Rows dated on or after `date`.
    pub fn filter_from(&self, date: NaiveDate) -> Self {
        self.retain_rows(|i| self.dates[i] >= date)
    }

    /// Rows without any NaN.
    pub fn drop_incomplete(&self) -> Self {
        self.retain_rows(|i| self.columns.iter().all(|c| !c.values[i].is_nan()))
    }

    /// Write as CSV: `Date,Stock,` then one column per feature.
    pub fn write_csv(&self, path: &Path) -> Result<(), DataError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut wtr = csv::Writer::from_path(path)?;
        let mut header = vec!["Date".to_string(), "Stock".to_string()];
        header.extend(self.names());
        wtr.write_record(&header)?;

        for i in 0..self.len() {
            let mut record = vec![self.dates[i].format("%Y-%m-%d").to_string(), self.stock.clone()];
            record.extend(self.columns.iter().map(|c| fmt_price(c.values[i])));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Read a frame written by [`FeatureFrame::write_csv`].
    ///
    /// The stock name comes from the `Stock` column, falling back to the file
    /// stem for an empty file.
    pub fn read_csv(path: &Path) -> Result<Self, DataError> {
        let mut rdr = csv::Reader::from_path(path)?;
        let headers = rdr.headers()?.clone();
        if headers.get(0) != Some("Date") || headers.get(1) != Some("Stock") {
            return Err(DataError::ValidationError(format!(
                "{} does not start with Date,Stock",
                path.display()
            )));
        }

        let names: Vec<String> = headers.iter().skip(2).map(String::from).collect();
        let mut stock = None;
        let mut dates = Vec::new();
        let mut values: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

        for record in rdr.records() {
            let record = record?;
            let date = record.get(0).and_then(parse_date).ok_or_else(|| {
                DataError::ValidationError(format!(
                    "unparseable date {:?} in {}",
                    record.get(0).unwrap_or_default(),
                    path.display()
                ))
            })?;
            if stock.is_none() {
                stock = record.get(1).map(String::from);
            }
            dates.push(date);
            for (j, column) in values.iter_mut().enumerate() {
                column.push(record.get(j + 2).map(parse_number).unwrap_or(f64::NAN));
            }
        }

        let stock = stock.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default()
        });
        let mut frame = Self::new(stock, dates);
        for (name, column) in names.into_iter().zip(values) {
            frame.push_column(name, column);
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample() -> FeatureFrame {
        let mut frame = FeatureFrame::new("TCS", vec![d(2), d(3), d(4)]);
        frame.push_column("Close", vec![1.0, 2.0, 3.0]);
        frame.push_column("MA_2", vec![f64::NAN, 1.5, 2.5]);
        frame
    }

    #[test]
    fn column_lookup_and_row() {
        let frame = sample();
        assert_eq!(frame.column("Close"), Some(&[1.0, 2.0, 3.0][..]));
        assert!(frame.column("Nope").is_none());
        assert_eq!(frame.row(2), vec![3.0, 2.5]);
        assert_eq!(frame.width(), 2);
    }

    #[test]
    fn drop_incomplete_removes_nan_rows() {
        let frame = sample().drop_incomplete();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.dates[0], d(3));
        assert_eq!(frame.column("MA_2").unwrap(), &[1.5, 2.5]);
    }

    #[test]
    fn filter_from_is_inclusive() {
        let frame = sample().filter_from(d(3));
        assert_eq!(frame.dates, vec![d(3), d(4)]);
    }

    #[test]
    #[should_panic(expected = "length does not match")]
    fn push_column_rejects_wrong_length() {
        let mut frame = FeatureFrame::new("X", vec![d(2)]);
        frame.push_column("Close", vec![1.0, 2.0]);
    }

    #[test]
    fn csv_round_trip_keeps_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("TCS.csv");
        sample().write_csv(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next().unwrap(), "Date,Stock,Close,MA_2");
        assert_eq!(text.lines().nth(1).unwrap(), "2024-01-02,TCS,1,");

        let back = FeatureFrame::read_csv(&path).unwrap();
        assert_eq!(back.stock, "TCS");
        assert_eq!(back.names(), vec!["Close", "MA_2"]);
        assert!(back.column("MA_2").unwrap()[0].is_nan());
        assert_eq!(back.column("Close").unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn read_csv_rejects_foreign_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.csv");
        fs::write(&path, "date,open\n2024-01-02,1\n").unwrap();
        assert!(FeatureFrame::read_csv(&path).is_err());
    }
}
