//! End-to-end runs of the batch jobs against temp directories.
//!
//! The synthetic provider and an in-test mock stand in for Yahoo; nothing
//! here touches the network.

use chrono::NaiveDate;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use stockpipe_core::data::{
    DataError, DataProvider, DataSource, Database, FetchResult, NoProgress, RawCsvStore,
    SyntheticProvider, TickerList,
};
use stockpipe_core::features::FeatureFrame;
use stockpipe_core::scaling::Scaler;
use stockpipe_runner::{
    build_sequences, collect, preprocess, update, CollectOptions, PipelineConfig, UpdateOptions,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn config_in(root: &Path) -> PipelineConfig {
    let toml = format!(
        r#"
[collect]
tickers = ["TCS", "INFY", "SBIN"]
start_date = "2015-01-01"
end_date = "2016-01-01"
request_delay_ms = 0

[paths]
raw_dir = '{root}/raw'
processed_dir = '{root}/processed'
sequence_dir = '{root}/sequences'
db_path = '{root}/stocks.db'

[sequences]
length = 20
"#,
        root = root.display()
    );
    let config = PipelineConfig::from_toml(&toml).unwrap();
    config.validate().unwrap();
    config
}

/// Fails for listed symbols, otherwise delegates to the synthetic provider.
/// Records every request.
struct FlakyProvider {
    failing: Vec<String>,
    calls: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl FlakyProvider {
    fn new(failing: &[&str]) -> Self {
        Self {
            failing: failing.iter().map(|s| s.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl DataProvider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, DataError> {
        self.calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), start, end));
        if self.failing.iter().any(|s| s == symbol) {
            return Err(DataError::HttpStatus {
                status: 500,
                symbol: symbol.to_string(),
            });
        }
        let mut result = SyntheticProvider::new().fetch(symbol, start, end)?;
        result.source = DataSource::YahooFinance;
        Ok(result)
    }
}

#[test]
fn collect_preprocess_sequences_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let tickers = config.tickers().unwrap();
    assert_eq!(tickers.tickers, vec!["TCS.NS", "INFY.NS", "SBIN.NS"]);

    let store = RawCsvStore::new(&config.paths.raw_dir);
    let mut db = Database::open(&config.paths.db_path).unwrap();

    let collected = collect(
        &SyntheticProvider::new(),
        &tickers,
        &store,
        &mut db,
        &config.collect_options(d(2030, 1, 1)),
        &NoProgress,
    )
    .unwrap();
    assert_eq!(collected.succeeded, 3);
    assert_eq!(
        db.row_count("daily_all").unwrap(),
        Some(collected.rows as i64)
    );

    let processed = preprocess(&mut db, &config.preprocess_options()).unwrap();
    assert_eq!(processed.succeeded, 3);
    assert_eq!(processed.failed, 0);

    let processed_dir = &config.paths.processed_dir;
    let frame = FeatureFrame::read_csv(&processed_dir.join("TCS.csv")).unwrap();
    assert_eq!(frame.stock, "TCS");
    assert!(frame
        .columns
        .iter()
        .all(|c| c.values.iter().all(|v| (0.0..=1.0).contains(v))));

    // The sidecar maps scaled closes back to the cleaned prices.
    let scaler = Scaler::load(&processed_dir.join("TCS_scaler.json")).unwrap();
    let raw = store.read("TCS.NS").unwrap();
    let first_close = scaler
        .inverse_value("Close", frame.column("Close").unwrap()[0])
        .unwrap();
    let source = raw.iter().find(|b| b.date == frame.dates[0]).unwrap();
    assert!((first_close - source.close).abs() < 1e-6);

    let sequences = build_sequences(&config.sequence_options()).unwrap();
    assert_eq!(sequences.succeeded, 3);
    for stock in ["TCS", "INFY", "SBIN"] {
        assert!(config.paths.sequence_dir.join(stock).join("train.json").exists());
    }
}

#[test]
fn failing_ticker_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let tickers = config.tickers().unwrap();
    let store = RawCsvStore::new(&config.paths.raw_dir);
    let mut db = Database::open_in_memory().unwrap();
    let provider = FlakyProvider::new(&["INFY.NS"]);

    let stats = collect(
        &provider,
        &tickers,
        &store,
        &mut db,
        &config.collect_options(d(2030, 1, 1)),
        &NoProgress,
    )
    .unwrap();

    assert_eq!(stats.succeeded, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.failures[0].0, "INFY.NS");
    assert!(!stats.all_failed());

    let order: Vec<String> = provider
        .calls
        .lock()
        .unwrap()
        .iter()
        .map(|c| c.0.clone())
        .collect();
    assert_eq!(order, vec!["TCS.NS", "INFY.NS", "SBIN.NS"]);

    assert!(!store.path_for("INFY.NS").exists());
    assert_eq!(db.row_count("daily_infy_ns").unwrap(), None);
    let tcs = db.row_count("daily_tcs_ns").unwrap().unwrap();
    let sbin = db.row_count("daily_sbin_ns").unwrap().unwrap();
    assert_eq!(db.row_count("daily_all").unwrap(), Some(tcs + sbin));
}

#[test]
fn every_ticker_failing_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = RawCsvStore::new(dir.path());
    let mut db = Database::open_in_memory().unwrap();
    let provider = FlakyProvider::new(&["A.NS", "B.NS"]);
    let tickers = TickerList::new(vec!["A.NS".into(), "B.NS".into()]);
    let opts = CollectOptions {
        start: d(2024, 1, 1),
        end: d(2024, 2, 1),
        request_delay: Duration::ZERO,
    };

    let stats = collect(&provider, &tickers, &store, &mut db, &opts, &NoProgress).unwrap();

    assert!(stats.all_failed());
    assert_eq!(db.row_count("daily_all").unwrap(), None);
}

#[test]
fn update_fetches_from_day_after_last_date() {
    let dir = tempfile::tempdir().unwrap();
    let store = RawCsvStore::new(dir.path());
    let mut db = Database::open_in_memory().unwrap();
    let tickers = TickerList::new(vec!["TCS.NS".into(), "NEW.NS".into()]);

    collect(
        &SyntheticProvider::new().with_empty("NEW.NS"),
        &tickers,
        &store,
        &mut db,
        &CollectOptions {
            start: d(2024, 1, 1),
            end: d(2024, 2, 1),
            request_delay: Duration::ZERO,
        },
        &NoProgress,
    )
    .unwrap();
    // 2024-01-31 is a Wednesday.
    assert_eq!(store.last_date("TCS.NS").unwrap(), Some(d(2024, 1, 31)));

    let provider = FlakyProvider::new(&[]);
    let stats = update(
        &provider,
        &tickers,
        &store,
        &UpdateOptions {
            today: d(2024, 2, 10),
            request_delay: Duration::ZERO,
        },
        &NoProgress,
    );

    // NEW.NS has no file, so only TCS.NS is requested.
    let calls = provider.calls.lock().unwrap().clone();
    assert_eq!(calls, vec![("TCS.NS".to_string(), d(2024, 2, 1), d(2024, 2, 10))]);
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(store.last_date("TCS.NS").unwrap(), Some(d(2024, 2, 9)));
}
