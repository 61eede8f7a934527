//! Collect job: full download of every ticker into the raw CSV store and
//! the database.
//!
//! Tickers are processed strictly in order. A failing ticker is logged and
//! counted; the batch carries on. The combined `daily_all` table is written
//! once at the end from every ticker that produced data.

use chrono::NaiveDate;
use std::time::{Duration, Instant};

use stockpipe_core::data::{
    DataError, DataProvider, Database, DownloadProgress, RawCsvStore, TickerList,
};
use stockpipe_core::domain::{table_name, RawBar};

use crate::error::JobError;
use crate::stats::RunStats;

/// Options for [`collect`].
#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub start: NaiveDate,
    /// Exclusive.
    pub end: NaiveDate,
    /// Pause between consecutive tickers.
    pub request_delay: Duration,
}

/// Fetch `[start, end)` for every ticker and write the raw sinks.
pub fn collect(
    provider: &dyn DataProvider,
    tickers: &TickerList,
    store: &RawCsvStore,
    db: &mut Database,
    opts: &CollectOptions,
    progress: &dyn DownloadProgress,
) -> Result<RunStats, JobError> {
    let started = Instant::now();
    let total = tickers.len();
    let mut stats = RunStats::new(total);
    let mut combined: Vec<(String, RawBar)> = Vec::new();

    tracing::info!(
        provider = provider.name(),
        start = %opts.start,
        end = %opts.end,
        tickers = total,
        "collect starting"
    );

    for (i, ticker) in tickers.iter().enumerate() {
        progress.on_start(ticker, i, total);

        match fetch_and_store(provider, store, db, ticker, opts) {
            Ok(None) => {
                tracing::warn!("No data for {ticker}");
                stats.empty += 1;
            }
            Ok(Some(bars)) => {
                progress.on_complete(ticker, &Ok(bars.len()));
                stats.record_success(bars.len());
                combined.extend(bars.into_iter().map(|b| (ticker.to_string(), b)));
            }
            Err(e) => {
                stats.record_failure(ticker, &e);
                progress.on_complete(ticker, &Err(e));
            }
        }

        if i + 1 < total && !opts.request_delay.is_zero() {
            std::thread::sleep(opts.request_delay);
        }
    }

    if !combined.is_empty() {
        let rows = db.replace_daily_all(&combined)?;
        tracing::info!(rows, "wrote daily_all");
    }

    progress.on_batch_complete(stats.succeeded, stats.failed, total);
    stats.finish(started);
    Ok(stats)
}

/// Fetch one ticker and write the raw CSV, then its table. `None` when the
/// provider returned no rows.
fn fetch_and_store(
    provider: &dyn DataProvider,
    store: &RawCsvStore,
    db: &mut Database,
    ticker: &str,
    opts: &CollectOptions,
) -> Result<Option<Vec<RawBar>>, DataError> {
    let fetched = provider.fetch(ticker, opts.start, opts.end)?;
    if fetched.bars.is_empty() {
        return Ok(None);
    }
    let path = store.write(ticker, &fetched.bars)?;
    tracing::debug!(ticker, path = %path.display(), "raw csv written");
    db.replace_daily(&table_name(ticker), ticker, &fetched.bars)?;
    Ok(Some(fetched.bars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpipe_core::data::{NoProgress, SyntheticProvider};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn opts() -> CollectOptions {
        CollectOptions {
            start: d(2024, 1, 1),
            end: d(2024, 2, 1),
            request_delay: Duration::ZERO,
        }
    }

    #[test]
    fn writes_csv_and_tables_per_ticker() {
        let dir = tempfile::tempdir().unwrap();
        let store = RawCsvStore::new(dir.path());
        let mut db = Database::open_in_memory().unwrap();
        let tickers = TickerList::new(vec!["TCS.NS".into(), "INFY.NS".into()]);

        let stats = collect(&SyntheticProvider::new(), &tickers, &store, &mut db, &opts(), &NoProgress)
            .unwrap();

        assert_eq!(stats.succeeded, 2);
        assert!(store.path_for("TCS.NS").exists());
        let per_ticker = db.row_count("daily_tcs_ns").unwrap().unwrap();
        let all = db.row_count("daily_all").unwrap().unwrap();
        assert_eq!(all, 2 * per_ticker);
        assert_eq!(stats.rows as i64, all);
    }

    #[test]
    fn empty_ticker_is_skipped_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = RawCsvStore::new(dir.path());
        let mut db = Database::open_in_memory().unwrap();
        let provider = SyntheticProvider::new().with_empty("DEAD.NS");
        let tickers = TickerList::new(vec!["DEAD.NS".into()]);

        let stats = collect(&provider, &tickers, &store, &mut db, &opts(), &NoProgress).unwrap();

        assert_eq!(stats.empty, 1);
        assert!(!store.path_for("DEAD.NS").exists());
        assert_eq!(db.row_count("daily_all").unwrap(), None);
    }
}
