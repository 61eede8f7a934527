//! Domain types for StockPipe

pub mod bar;
pub mod ticker;

pub use bar::{Bar, RawBar};
pub use ticker::{file_stem, normalize_nse, sql_ident, table_name};
