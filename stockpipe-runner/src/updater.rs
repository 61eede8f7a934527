//! Update job: append the days since the last collect to each raw CSV.
//!
//! Only tickers that already have a raw file are touched. Rows on or before
//! the file's last date are dropped before appending, so re-running on the
//! same day never duplicates a date.

use chrono::NaiveDate;
use std::time::{Duration, Instant};

use stockpipe_core::data::{DataError, DataProvider, DownloadProgress, RawCsvStore, TickerList};

use crate::stats::RunStats;

/// Options for [`update`].
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Fetch window ends here (exclusive). Injected so tests are date-independent.
    pub today: NaiveDate,
    pub request_delay: Duration,
}

enum Outcome {
    Appended(usize),
    NoNewRows,
}

/// Bring every existing raw CSV up to `today`.
pub fn update(
    provider: &dyn DataProvider,
    tickers: &TickerList,
    store: &RawCsvStore,
    opts: &UpdateOptions,
    progress: &dyn DownloadProgress,
) -> RunStats {
    let started = Instant::now();
    let total = tickers.len();
    let mut stats = RunStats::new(total);

    for (i, ticker) in tickers.iter().enumerate() {
        let last = match store.last_date(ticker) {
            Ok(Some(last)) => last,
            Ok(None) => {
                tracing::warn!("{ticker}: no existing data, run collect first");
                stats.skipped += 1;
                continue;
            }
            Err(e) => {
                tracing::error!(ticker, error = %e, "cannot read existing data");
                stats.record_failure(ticker, &e);
                continue;
            }
        };

        if last >= opts.today - chrono::Duration::days(1) {
            tracing::info!(ticker, last = %last, "already up to date");
            stats.skipped += 1;
            continue;
        }

        progress.on_start(ticker, i, total);
        match update_one(provider, store, ticker, last, opts.today) {
            Ok(Outcome::Appended(rows)) => {
                progress.on_complete(ticker, &Ok(rows));
                stats.record_success(rows);
            }
            Ok(Outcome::NoNewRows) => {
                tracing::info!(ticker, "no new rows (market holiday or weekend)");
                stats.skipped += 1;
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

    progress.on_batch_complete(stats.succeeded, stats.failed, total);
    stats.finish(started);
    stats
}

fn update_one(
    provider: &dyn DataProvider,
    store: &RawCsvStore,
    ticker: &str,
    last: NaiveDate,
    today: NaiveDate,
) -> Result<Outcome, DataError> {
    let fetched = provider.fetch(ticker, last + chrono::Duration::days(1), today)?;
    let fresh: Vec<_> = fetched.bars.into_iter().filter(|b| b.date > last).collect();
    if fresh.is_empty() {
        return Ok(Outcome::NoNewRows);
    }
    let rows = store.append(ticker, &fresh)?;
    Ok(Outcome::Appended(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpipe_core::data::synthetic::generate_bars;
    use stockpipe_core::data::{NoProgress, SyntheticProvider};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn opts(today: NaiveDate) -> UpdateOptions {
        UpdateOptions {
            today,
            request_delay: Duration::ZERO,
        }
    }

    #[test]
    fn missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = RawCsvStore::new(dir.path());
        let tickers = TickerList::new(vec!["TCS.NS".into()]);
        let stats = update(&SyntheticProvider::new(), &tickers, &store, &opts(d(2024, 3, 1)), &NoProgress);
        assert_eq!(stats.skipped, 1);
        assert!(!store.path_for("TCS.NS").exists());
    }

    #[test]
    fn up_to_date_when_last_is_yesterday() {
        let dir = tempfile::tempdir().unwrap();
        let store = RawCsvStore::new(dir.path());
        // Thursday 2024-02-29 is the last weekday before 2024-03-01.
        store
            .write("TCS.NS", &generate_bars("TCS.NS", d(2024, 2, 1), d(2024, 3, 1)))
            .unwrap();

        let tickers = TickerList::new(vec!["TCS.NS".into()]);
        let stats = update(&SyntheticProvider::new(), &tickers, &store, &opts(d(2024, 3, 1)), &NoProgress);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.succeeded, 0);
    }

    #[test]
    fn appends_only_new_dates() {
        let dir = tempfile::tempdir().unwrap();
        let store = RawCsvStore::new(dir.path());
        store
            .write("TCS.NS", &generate_bars("TCS.NS", d(2024, 2, 1), d(2024, 2, 15)))
            .unwrap();
        let before = store.read("TCS.NS").unwrap().len();

        let tickers = TickerList::new(vec!["TCS.NS".into()]);
        let today = d(2024, 3, 1);
        let stats = update(&SyntheticProvider::new(), &tickers, &store, &opts(today), &NoProgress);
        assert_eq!(stats.succeeded, 1);

        let after = store.read("TCS.NS").unwrap();
        assert_eq!(after.len(), before + stats.rows);
        assert!(after.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(store.last_date("TCS.NS").unwrap(), Some(d(2024, 2, 29)));

        // second run the same day changes nothing
        let again = update(&SyntheticProvider::new(), &tickers, &store, &opts(today), &NoProgress);
        assert_eq!(again.skipped, 1);
        assert_eq!(store.read("TCS.NS").unwrap().len(), after.len());
    }
}
