//! Data layer: providers, symbol search and the three sinks (raw CSV files,
//! SQLite, Parquet).

pub mod database;
pub mod parquet;
pub mod provider;
pub mod raw_csv;
pub mod search;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use database::{processed_table, Database, StoreError, CLEANED_TABLE, DAILY_ALL_TABLE};
pub use parquet::{read_frame_parquet, write_frame_parquet};
pub use provider::{
    DataError, DataProvider, DataSource, DownloadProgress, FetchResult, LogProgress, NoProgress,
};
pub use raw_csv::{read_raw_csv, RawCsvStore, RAW_HEADER};
pub use search::{
    best_pick, candidate_queries, normalize_query, Exchange, Pick, SearchQuote, SymbolSearch,
    YahooSearch,
};
pub use synthetic::SyntheticProvider;
pub use universe::{TickerList, DEFAULT_NSE_TICKERS};
pub use yahoo::YahooProvider;
