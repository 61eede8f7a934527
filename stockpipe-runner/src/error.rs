//! Fatal job errors. Per-symbol problems are counted in `RunStats` instead.

use thiserror::Error;

use stockpipe_core::data::{DataError, StoreError};

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] StoreError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
