//! Pipeline configuration loaded from TOML.
//!
//! Every section carries `#[serde(default)]`, so an empty file (or no file at
//! all) yields the built-in defaults. CLI flags override individual values
//! after loading; `validate()` runs last.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use stockpipe_core::data::{Exchange, TickerList, DEFAULT_NSE_TICKERS};
use stockpipe_core::features::{FeatureOptions, FeatureSet};
use stockpipe_core::scaling::ScalerKind;

use crate::collector::CollectOptions;
use crate::preprocessor::PreprocessOptions;
use crate::resolver::ResolveOptions;
use crate::sequence_builder::SequenceOptions;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "stockpipe.toml";

/// Errors from loading or validating a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub collect: CollectConfig,
    pub paths: PathsConfig,
    pub features: FeaturesConfig,
    pub sequences: SequencesConfig,
    pub resolve: ResolveConfig,
}

/// `[collect]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    pub tickers: Vec<String>,
    /// One ticker per line; replaces `tickers` when set.
    pub tickers_file: Option<PathBuf>,
    pub start_date: NaiveDate,
    /// Exclusive. `None` means today.
    pub end_date: Option<NaiveDate>,
    pub request_delay_ms: u64,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            tickers: DEFAULT_NSE_TICKERS.iter().map(|t| t.to_string()).collect(),
            tickers_file: None,
            start_date: default_start(),
            end_date: None,
            request_delay_ms: 1000,
        }
    }
}

/// `[paths]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub sequence_dir: PathBuf,
    pub db_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            sequence_dir: PathBuf::from("data/sequences"),
            db_path: PathBuf::from("data/stocks.db"),
        }
    }
}

/// `[features]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub feature_set: FeatureSet,
    pub min_date: Option<NaiveDate>,
    pub scaler: ScalerKind,
    pub drop_incomplete: bool,
    pub write_parquet: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            feature_set: FeatureSet::Model,
            min_date: Some(default_start()),
            scaler: ScalerKind::MinMax,
            drop_incomplete: true,
            write_parquet: false,
        }
    }
}

/// `[sequences]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencesConfig {
    pub length: usize,
    pub train_fraction: f64,
    pub val_fraction: f64,
    pub min_samples: usize,
}

impl Default for SequencesConfig {
    fn default() -> Self {
        Self {
            length: 60,
            train_fraction: 0.7,
            val_fraction: 0.15,
            min_samples: 10,
        }
    }
}

/// `[resolve]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    pub pause_ms: u64,
    pub prefer_exchange: Exchange,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            pause_ms: 600,
            prefer_exchange: Exchange::Bse,
        }
    }
}

fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default()
}

impl PipelineConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load `path` if given, else `stockpipe.toml` if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    tracing::debug!("using {DEFAULT_CONFIG_FILE}");
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Reject configurations no job can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collect.tickers.is_empty() && self.collect.tickers_file.is_none() {
            return Err(ConfigError::Invalid("ticker list is empty".into()));
        }
        if let Some(end) = self.collect.end_date {
            if self.collect.start_date > end {
                return Err(ConfigError::Invalid(format!(
                    "start_date {} is after end_date {end}",
                    self.collect.start_date
                )));
            }
        }
        let s = &self.sequences;
        if s.length == 0 {
            return Err(ConfigError::Invalid("sequence length must be > 0".into()));
        }
        for (name, v) in [("train_fraction", s.train_fraction), ("val_fraction", s.val_fraction)] {
            if !(v > 0.0 && v < 1.0) {
                return Err(ConfigError::Invalid(format!("{name} must be in (0, 1), got {v}")));
            }
        }
        if s.train_fraction + s.val_fraction >= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "train_fraction + val_fraction must be < 1, got {}",
                s.train_fraction + s.val_fraction
            )));
        }
        Ok(())
    }

    /// The configured tickers, normalised to exchange-suffixed symbols.
    pub fn tickers(&self) -> Result<TickerList, ConfigError> {
        let list = match &self.collect.tickers_file {
            Some(path) => TickerList::from_file(path)
                .map_err(|e| ConfigError::Invalid(format!("tickers_file {}: {e}", path.display())))?,
            None => TickerList::new(self.collect.tickers.clone()),
        };
        let list = list.normalized();
        if list.is_empty() {
            return Err(ConfigError::Invalid("ticker list is empty".into()));
        }
        Ok(list)
    }

    pub fn collect_options(&self, today: NaiveDate) -> CollectOptions {
        CollectOptions {
            start: self.collect.start_date,
            end: self.collect.end_date.unwrap_or(today),
            request_delay: Duration::from_millis(self.collect.request_delay_ms),
        }
    }

    pub fn preprocess_options(&self) -> PreprocessOptions {
        PreprocessOptions {
            raw_dir: self.paths.raw_dir.clone(),
            processed_dir: self.paths.processed_dir.clone(),
            features: FeatureOptions {
                feature_set: self.features.feature_set,
                min_date: self.features.min_date,
                drop_incomplete: self.features.drop_incomplete,
            },
            scaler: self.features.scaler,
            write_parquet: self.features.write_parquet,
        }
    }

    pub fn sequence_options(&self) -> SequenceOptions {
        SequenceOptions {
            processed_dir: self.paths.processed_dir.clone(),
            sequence_dir: self.paths.sequence_dir.clone(),
            length: self.sequences.length,
            train_fraction: self.sequences.train_fraction,
            val_fraction: self.sequences.val_fraction,
            min_samples: self.sequences.min_samples,
        }
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            pause: Duration::from_millis(self.resolve.pause_ms),
            prefer: self.resolve.prefer_exchange,
        }
    }
}
