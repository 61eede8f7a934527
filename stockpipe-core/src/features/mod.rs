//! Feature engineering on cleaned bars.
//!
//! Two fixed feature sets are supported:
//! - `Model`: the inputs of the sequence model (moving averages, Wilder RSI,
//!   MACD line and close lags).
//! - `Technical`: the broader indicator set used for charting and screening.

pub mod frame;

pub use frame::{FeatureColumn, FeatureFrame};

use crate::domain::Bar;
use crate::indicators::{Bollinger, Ema, Indicator, Lag, Macd, Rsi, Sma};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    #[default]
    Model,
    Technical,
}

impl FeatureSet {
    /// Output columns in order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            FeatureSet::Model => &[
                "Open", "High", "Low", "Close", "Volume", "MA_5", "MA_10", "MA_20", "RSI", "MACD",
                "Close_Lag1", "Close_Lag2", "Close_Lag3",
            ],
            FeatureSet::Technical => &[
                "Open",
                "High",
                "Low",
                "Close",
                "Volume",
                "RSI",
                "SMA20",
                "SMA50",
                "EMA20",
                "EMA50",
                "EMA12",
                "EMA26",
                "MACD",
                "Signal_Line",
                "Bollinger_Upper",
                "Bollinger_Lower",
                "Volume_MA20",
            ],
        }
    }

    /// Indicators computed on close prices, paired with their column name.
    fn close_indicators(&self) -> Vec<(&'static str, Box<dyn Indicator>)> {
        match self {
            FeatureSet::Model => vec![
                ("MA_5", Box::new(Sma::new(5))),
                ("MA_10", Box::new(Sma::new(10))),
                ("MA_20", Box::new(Sma::new(20))),
                ("RSI", Box::new(Rsi::wilder(14))),
                ("MACD", Box::new(Macd::line(12, 26).with_min_periods())),
                ("Close_Lag1", Box::new(Lag::new(1))),
                ("Close_Lag2", Box::new(Lag::new(2))),
                ("Close_Lag3", Box::new(Lag::new(3))),
            ],
            FeatureSet::Technical => vec![
                ("RSI", Box::new(Rsi::simple(14))),
                ("SMA20", Box::new(Sma::new(20))),
                ("SMA50", Box::new(Sma::new(50))),
                ("EMA20", Box::new(Ema::new(20))),
                ("EMA50", Box::new(Ema::new(50))),
                ("EMA12", Box::new(Ema::new(12))),
                ("EMA26", Box::new(Ema::new(26))),
                ("MACD", Box::new(Macd::line(12, 26))),
                ("Signal_Line", Box::new(Macd::signal_line(12, 26, 9))),
                ("Bollinger_Upper", Box::new(Bollinger::upper(20, 2.0))),
                ("Bollinger_Lower", Box::new(Bollinger::lower(20, 2.0))),
            ],
        }
    }

    /// Leading rows that are incomplete on a gap-free series.
    pub fn warmup(&self) -> usize {
        let close_max = self
            .close_indicators()
            .iter()
            .map(|(_, ind)| ind.lookback())
            .max()
            .unwrap_or(0);
        match self {
            FeatureSet::Model => close_max,
            FeatureSet::Technical => close_max.max(Sma::new(20).lookback()),
        }
    }

    /// Compute every column of the set over `bars`.
    pub fn build(&self, stock: &str, bars: &[Bar]) -> FeatureFrame {
        let mut frame = FeatureFrame::from_bars(stock, bars);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        for (name, indicator) in self.close_indicators() {
            frame.push_column(name, indicator.compute(&closes));
        }
        if *self == FeatureSet::Technical {
            let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
            frame.push_column("Volume_MA20", Sma::new(20).compute(&volumes));
        }
        frame
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureSet::Model => write!(f, "model"),
            FeatureSet::Technical => write!(f, "technical"),
        }
    }
}

impl FromStr for FeatureSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "model" => Ok(FeatureSet::Model),
            "technical" => Ok(FeatureSet::Technical),
            other => Err(format!("unknown feature set '{other}' (expected model or technical)")),
        }
    }
}

/// Options for [`build_features`].
#[derive(Debug, Clone)]
pub struct FeatureOptions {
    pub feature_set: FeatureSet,
    /// Bars dated before this are discarded before any indicator runs.
    pub min_date: Option<NaiveDate>,
    pub drop_incomplete: bool,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            feature_set: FeatureSet::Model,
            min_date: NaiveDate::from_ymd_opt(2015, 1, 1),
            drop_incomplete: true,
        }
    }
}

/// Date filter → indicators → optional removal of incomplete rows.
pub fn build_features(stock: &str, bars: &[Bar], opts: &FeatureOptions) -> FeatureFrame {
    let kept: Vec<Bar> = match opts.min_date {
        Some(min) => bars.iter().filter(|b| b.date >= min).cloned().collect(),
        None => bars.to_vec(),
    };
    let frame = opts.feature_set.build(stock, &kept);
    if opts.drop_incomplete {
        frame.drop_incomplete()
    } else {
        frame
    }
}
