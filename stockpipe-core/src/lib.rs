//! StockPipe Core: domain types, data providers, stores, cleaning,
//! indicators, features, scaling and sequence windows.
//!
//! This crate holds everything the batch jobs are built from:
//! - Domain types (raw and cleaned bars, ticker naming rules)
//! - Data providers behind the `DataProvider` trait (Yahoo, synthetic)
//! - Sinks: per-ticker raw CSV files, SQLite tables, Parquet export
//! - Cleaning of arbitrary OHLCV CSV files
//! - Indicators and the two fixed feature sets
//! - Column scalers and sliding-window sequence building

pub mod clean;
pub mod data;
pub mod domain;
pub mod features;
pub mod indicators;
pub mod scaling;
pub mod sequences;
