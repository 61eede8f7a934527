//! Ticker naming rules shared by the stores.
//!
//! A ticker such as `RELIANCE.NS` maps to the raw file stem `RELIANCE` and
//! to the SQLite table `daily_reliance_ns`.

/// Suffixes that already identify an Indian exchange listing.
const EXCHANGE_SUFFIXES: [&str; 2] = [".NS", ".BO"];

/// Trim, uppercase and append `.NS` unless the ticker already carries an
/// exchange suffix.
pub fn normalize_nse(ticker: &str) -> String {
    let t = ticker.trim().to_uppercase();
    if EXCHANGE_SUFFIXES.iter().any(|s| t.ends_with(s)) {
        t
    } else {
        format!("{t}.NS")
    }
}

/// File stem for a ticker: drop a trailing `.NS`, then replace any other
/// `.` with `_`.
pub fn file_stem(ticker: &str) -> String {
    let t = ticker.trim();
    let base = if t.to_ascii_uppercase().ends_with(".NS") {
        &t[..t.len() - 3]
    } else {
        t
    };
    base.replace('.', "_")
}

/// Per-ticker daily table name, safe to interpolate as an SQL identifier.
pub fn table_name(ticker: &str) -> String {
    format!("daily_{}", sql_ident(&ticker.trim().replace('.', "_")))
}

/// Lowercase and map everything outside `[a-z0-9_]` to `_`.
pub fn sql_ident(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
