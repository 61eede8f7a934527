//! SQLite sink for raw, cleaned and processed data.
//!
//! Tables:
//! - `daily_{ticker}`: raw bars for one ticker, replaced on every collect
//! - `daily_all`: raw bars for all tickers of the last collect
//! - `stocks_cleaned`: cleaned bars, dropped once per preprocess run then appended
//! - `processed_{stock}`: scaled features for one stock
//!
//! NaN values are stored as NULL. Table names are always quoted.

use crate::domain::{sql_ident, Bar, RawBar};
use crate::features::FeatureFrame;
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use thiserror::Error;

pub const DAILY_ALL_TABLE: &str = "daily_all";
pub const CLEANED_TABLE: &str = "stocks_cleaned";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cannot create database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid table name '{0}'")]
    InvalidTable(String),
}

const DAILY_COLUMNS: &str = "date TEXT NOT NULL, open REAL, high REAL, low REAL, \
                             close REAL, adj_close REAL, volume INTEGER, ticker TEXT NOT NULL";

/// Quote an identifier for interpolation into SQL.
fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn real(v: f64) -> Option<f64> {
    if v.is_nan() {
        None
    } else {
        Some(v)
    }
}

fn check_table(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.starts_with("sqlite_") {
        return Err(StoreError::InvalidTable(name.to_string()));
    }
    Ok(())
}

/// Table holding processed features for `stock`.
pub fn processed_table(stock: &str) -> String {
    format!("processed_{}", sql_ident(stock))
}

/// Handle to the pipeline database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database file, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Replace `table` with the bars of one ticker.
    pub fn replace_daily(
        &mut self,
        table: &str,
        ticker: &str,
        bars: &[RawBar],
    ) -> Result<usize, StoreError> {
        check_table(table)?;
        let tx = self.conn.transaction()?;
        recreate(&tx, table, DAILY_COLUMNS)?;
        insert_daily(&tx, table, bars.iter().map(|b| (ticker, b)))?;
        tx.commit()?;
        Ok(bars.len())
    }

    /// Replace `daily_all` with `(ticker, bar)` rows in the given order.
    pub fn replace_daily_all(&mut self, rows: &[(String, RawBar)]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        recreate(&tx, DAILY_ALL_TABLE, DAILY_COLUMNS)?;
        insert_daily(&tx, DAILY_ALL_TABLE, rows.iter().map(|(t, b)| (t.as_str(), b)))?;
        tx.commit()?;
        Ok(rows.len())
    }

    /// Drop `stocks_cleaned` so a new preprocess run starts empty.
    pub fn reset_cleaned(&self) -> Result<(), StoreError> {
        self.conn
            .execute(&format!("DROP TABLE IF EXISTS {}", quote(CLEANED_TABLE)), [])?;
        Ok(())
    }

    /// Append cleaned bars to `stocks_cleaned`, creating it on first use.
    pub fn append_cleaned(&mut self, bars: &[Bar]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (date TEXT NOT NULL, open REAL, high REAL, \
                 low REAL, close REAL, volume REAL, stock TEXT NOT NULL)",
                quote(CLEANED_TABLE)
            ),
            [],
        )?;
        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO {} (date, open, high, low, close, volume, stock) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                quote(CLEANED_TABLE)
            ))?;
            for bar in bars {
                stmt.execute(params![
                    bar.date.format("%Y-%m-%d").to_string(),
                    real(bar.open),
                    real(bar.high),
                    real(bar.low),
                    real(bar.close),
                    real(bar.volume),
                    bar.symbol.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(bars.len())
    }

    /// Replace `processed_{stock}` with the rows of `frame`.
    pub fn replace_processed(&mut self, frame: &FeatureFrame) -> Result<usize, StoreError> {
        let table = processed_table(&frame.stock);
        let mut columns = vec!["date TEXT NOT NULL".to_string(), "stock TEXT NOT NULL".to_string()];
        columns.extend(frame.columns.iter().map(|c| format!("{} REAL", quote(&c.name))));

        let names: Vec<String> = frame.columns.iter().map(|c| quote(&c.name)).collect();
        let placeholders: Vec<String> = (1..=frame.width() + 2).map(|i| format!("?{i}")).collect();
        let insert = format!(
            "INSERT INTO {} (date, stock{}{}) VALUES ({})",
            quote(&table),
            if names.is_empty() { "" } else { ", " },
            names.join(", "),
            placeholders.join(", ")
        );

        let tx = self.conn.transaction()?;
        recreate(&tx, &table, &columns.join(", "))?;
        {
            let mut stmt = tx.prepare(&insert)?;
            for i in 0..frame.len() {
                let mut values: Vec<rusqlite::types::Value> = vec![
                    frame.dates[i].format("%Y-%m-%d").to_string().into(),
                    frame.stock.clone().into(),
                ];
                values.extend(frame.columns.iter().map(|c| match real(c.values[i]) {
                    Some(v) => rusqlite::types::Value::Real(v),
                    None => rusqlite::types::Value::Null,
                }));
                stmt.execute(rusqlite::params_from_iter(values))?;
            }
        }
        tx.commit()?;
        Ok(frame.len())
    }

    /// Row count of every user table, sorted by name.
    pub fn table_counts(&self) -> Result<Vec<(String, i64)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )?;
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<_, _>>()?;

        let mut counts = Vec::with_capacity(tables.len());
        for table in tables {
            let n: i64 = self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", quote(&table)),
                [],
                |row| row.get(0),
            )?;
            counts.push((table, n));
        }
        Ok(counts)
    }

    /// Number of rows in `table`, or `None` if it does not exist.
    pub fn row_count(&self, table: &str) -> Result<Option<i64>, StoreError> {
        let exists: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Ok(None);
        }
        let n = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(Some(n))
    }
}

fn recreate(tx: &Transaction<'_>, table: &str, columns: &str) -> Result<(), StoreError> {
    tx.execute(&format!("DROP TABLE IF EXISTS {}", quote(table)), [])?;
    tx.execute(&format!("CREATE TABLE {} ({columns})", quote(table)), [])?;
    Ok(())
}

fn insert_daily<'a>(
    tx: &Transaction<'_>,
    table: &str,
    rows: impl Iterator<Item = (&'a str, &'a RawBar)>,
) -> Result<(), StoreError> {
    let mut stmt = tx.prepare_cached(&format!(
        "INSERT INTO {} (date, open, high, low, close, adj_close, volume, ticker) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        quote(table)
    ))?;
    for (ticker, bar) in rows {
        stmt.execute(params![
            bar.date.format("%Y-%m-%d").to_string(),
            real(bar.open),
            real(bar.high),
            real(bar.low),
            real(bar.close),
            real(bar.adj_close),
            i64::try_from(bar.volume).unwrap_or(i64::MAX),
            ticker,
        ])?;
    }
    Ok(())
}
