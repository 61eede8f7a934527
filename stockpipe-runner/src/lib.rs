//! StockPipe Runner: pipeline configuration and the batch jobs.
//!
//! This crate builds on `stockpipe-core` to provide:
//! - `PipelineConfig` loaded from TOML with per-section defaults
//! - Collect: full download into raw CSV files and SQLite tables
//! - Update: incremental append to existing raw CSV files
//! - Preprocess: cleaning, features, scaling and the processed sinks
//! - Sequences: sliding-window train/val/test sets
//! - Resolve: free-form names to Yahoo symbols
//! - Status: what the stores currently hold
//!
//! Jobs run strictly one after another. Each returns `RunStats`; a failing
//! symbol or file never aborts its batch.

pub mod collector;
pub mod config;
pub mod error;
pub mod preprocessor;
pub mod resolver;
pub mod sequence_builder;
pub mod stats;
pub mod status;
pub mod updater;

pub use collector::{collect, CollectOptions};
pub use config::{ConfigError, PipelineConfig, DEFAULT_CONFIG_FILE};
pub use error::JobError;
pub use preprocessor::{preprocess, PreprocessOptions};
pub use resolver::{
    read_input, resolve_all, resolve_line, write_report, write_ticker_list, Resolution,
    ResolveOptions,
};
pub use sequence_builder::{build_sequences, SequenceOptions};
pub use stats::RunStats;
pub use status::{gather_status, RawFileStatus, StatusReport};
pub use updater::{update, UpdateOptions};
