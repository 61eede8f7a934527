//! Parquet export of processed feature frames.
//!
//! Layout: `Date` (Date32), `Stock` (String), then one Float64 column per
//! feature in frame order. Writes are atomic (write to .tmp, rename into
//! place).

use super::provider::DataError;
use crate::features::FeatureFrame;
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::path::Path;

/// 1970-01-01, the Date32 origin.
fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn frame_to_dataframe(frame: &FeatureFrame) -> Result<DataFrame, DataError> {
    let days: Vec<i32> = frame
        .dates
        .iter()
        .map(|d| (*d - epoch()).num_days() as i32)
        .collect();
    let stocks: Vec<String> = vec![frame.stock.clone(); frame.len()];

    let mut columns = vec![
        Column::new("Date".into(), days)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("Stock".into(), stocks),
    ];
    for c in &frame.columns {
        columns.push(Column::new(c.name.as_str().into(), c.values.clone()));
    }

    DataFrame::new(columns).map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

/// Write `frame` to `path` atomically.
pub fn write_frame_parquet(frame: &FeatureFrame, path: &Path) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut df = frame_to_dataframe(frame)?;
    let tmp_path = path.with_extension("parquet.tmp");

    let file = fs::File::create(&tmp_path)
        .map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::ParquetError(format!("atomic rename failed: {e}"))
    })?;
    Ok(())
}

/// Read a frame written by [`write_frame_parquet`].
pub fn read_frame_parquet(path: &Path) -> Result<FeatureFrame, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;
    let map_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));

    let date_ca = df
        .column("Date")
        .map_err(map_err)?
        .date()
        .map_err(|e| DataError::ParquetError(format!("Date column type: {e}")))?;
    let mut dates = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
        dates.push(epoch() + chrono::Duration::days(days as i64));
    }

    let stock = df
        .column("Stock")
        .map_err(map_err)?
        .str()
        .map_err(|e| DataError::ParquetError(format!("Stock column type: {e}")))?
        .get(0)
        .map(String::from)
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default()
        });

    let mut frame = FeatureFrame::new(stock, dates);
    for column in df.get_columns() {
        let name = column.name().as_str();
        if name == "Date" || name == "Stock" {
            continue;
        }
        let ca = column
            .f64()
            .map_err(|e| DataError::ParquetError(format!("{name} column type: {e}")))?;
        let values = (0..df.height())
            .map(|i| ca.get(i).unwrap_or(f64::NAN))
            .collect();
        frame.push_column(name, values);
    }
    Ok(frame)
}
