//! Status report: what the raw store and the database currently hold.

use chrono::NaiveDate;
use std::path::Path;

use stockpipe_core::data::{read_raw_csv, Database, RawCsvStore};

use crate::error::JobError;

/// One raw CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFileStatus {
    pub file: String,
    pub rows: usize,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusReport {
    pub raw_files: Vec<RawFileStatus>,
    /// `(table, rows)`; empty when the database file does not exist yet.
    pub tables: Vec<(String, i64)>,
}

/// Inspect the raw store and, if it exists, the database at `db_path`.
///
/// The database is never created here.
pub fn gather_status(store: &RawCsvStore, db_path: &Path) -> Result<StatusReport, JobError> {
    let mut raw_files = Vec::new();
    for path in store.list()? {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match read_raw_csv(&path) {
            Ok(bars) => raw_files.push(RawFileStatus {
                file,
                rows: bars.len(),
                first: bars.iter().map(|b| b.date).min(),
                last: bars.iter().map(|b| b.date).max(),
            }),
            Err(e) => tracing::warn!(file = file.as_str(), error = %e, "unreadable raw file"),
        }
    }

    let tables = if db_path.exists() {
        Database::open(db_path)?.table_counts()?
    } else {
        Vec::new()
    };

    Ok(StatusReport { raw_files, tables })
}

impl StatusReport {
    /// Plain-text table for the terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.raw_files.is_empty() {
            out.push_str("Raw files: none\n");
        } else {
            out.push_str(&format!("Raw files: {}\n", self.raw_files.len()));
            out.push_str(&format!("{:<24} {:>8} {:<12} {:<12}\n", "File", "Rows", "First", "Last"));
            out.push_str(&format!("{}\n", "-".repeat(59)));
            for f in &self.raw_files {
                out.push_str(&format!(
                    "{:<24} {:>8} {:<12} {:<12}\n",
                    f.file,
                    f.rows,
                    fmt_date(f.first),
                    fmt_date(f.last)
                ));
            }
        }
        out.push('\n');
        if self.tables.is_empty() {
            out.push_str("Database: no tables\n");
        } else {
            out.push_str(&format!("Database tables: {}\n", self.tables.len()));
            out.push_str(&format!("{:<32} {:>10}\n", "Table", "Rows"));
            out.push_str(&format!("{}\n", "-".repeat(43)));
            for (table, rows) in &self.tables {
                out.push_str(&format!("{table:<32} {rows:>10}\n"));
            }
        }
        out
    }
}

fn fmt_date(d: Option<NaiveDate>) -> String {
    d.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
}
