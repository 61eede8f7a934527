//! Resolve job: map free-form company/ticker lines to Yahoo symbols.
//!
//! Each line is normalised, then up to five search queries are tried in
//! order. A confident pick stops the search; otherwise the best-scoring pick
//! seen so far is kept. Unresolved lines are written as `# NEED_MANUAL:`
//! comments so the output can be fed back into `--tickers-file` after review.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use stockpipe_core::data::{
    best_pick, candidate_queries, normalize_query, DataError, Exchange, Pick, SymbolSearch,
};

use crate::stats::RunStats;

pub const REPORT_HEADER: [&str; 7] = [
    "original",
    "query_term",
    "resolved_symbol",
    "exchange",
    "name",
    "score",
    "yahoo_url",
];

/// Options for [`resolve_all`].
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Slept after every search request.
    pub pause: Duration,
    pub prefer: Exchange,
}

/// Outcome for one input line.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub original: String,
    pub query: String,
    pub pick: Option<Pick>,
}

impl Resolution {
    /// Line for the corrected ticker list.
    pub fn ticker_line(&self) -> String {
        match &self.pick {
            Some(pick) => pick.symbol.clone(),
            None => format!("# NEED_MANUAL: {}", self.original),
        }
    }
}

/// Resolve a single input line.
pub fn resolve_line(search: &dyn SymbolSearch, line: &str, opts: &ResolveOptions) -> Resolution {
    let (original, query) = normalize_query(line);
    let mut best: Option<Pick> = None;

    for candidate in candidate_queries(&original, &query) {
        let result = search.search(&candidate);
        if !opts.pause.is_zero() {
            std::thread::sleep(opts.pause);
        }
        let quotes = match result {
            Ok(quotes) => quotes,
            Err(e) => {
                tracing::warn!(query = candidate.as_str(), error = %e, "search failed");
                continue;
            }
        };
        let Some(pick) = best_pick(&quotes, opts.prefer) else {
            continue;
        };
        if pick.is_confident(opts.prefer) {
            best = Some(pick);
            break;
        }
        if best.as_ref().map_or(true, |b| pick.score > b.score) {
            best = Some(pick);
        }
    }

    Resolution {
        original,
        query,
        pick: best,
    }
}

/// Resolve every line in order.
pub fn resolve_all(
    search: &dyn SymbolSearch,
    lines: &[String],
    opts: &ResolveOptions,
) -> (Vec<Resolution>, RunStats) {
    let started = Instant::now();
    let mut stats = RunStats::new(lines.len());
    let mut resolutions = Vec::with_capacity(lines.len());

    for (i, line) in lines.iter().enumerate() {
        let resolution = resolve_line(search, line, opts);
        match &resolution.pick {
            Some(pick) => {
                tracing::info!(
                    "[{}/{}] {} -> {} ({}, score {:.1})",
                    i + 1,
                    lines.len(),
                    resolution.original,
                    pick.symbol,
                    pick.exchange,
                    pick.score
                );
                stats.record_success(1);
            }
            None => {
                tracing::warn!("[{}/{}] {} -> NEED_MANUAL", i + 1, lines.len(), resolution.original);
                stats.record_failure(&resolution.original, "no search result");
            }
        }
        resolutions.push(resolution);
    }

    stats.finish(started);
    (resolutions, stats)
}

/// Non-blank, trimmed input lines.
pub fn read_input(path: &Path) -> Result<Vec<String>, DataError> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

/// One symbol (or `# NEED_MANUAL:` comment) per line.
pub fn write_ticker_list(resolutions: &[Resolution], path: &Path) -> Result<(), DataError> {
    let mut out = String::new();
    for r in resolutions {
        out.push_str(&r.ticker_line());
        out.push('\n');
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, out)?;
    Ok(())
}

/// CSV report with one row per input line; unresolved rows leave the pick
/// columns empty.
pub fn write_report(resolutions: &[Resolution], path: &Path) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(REPORT_HEADER)?;
    for r in resolutions {
        match &r.pick {
            Some(p) => wtr.write_record([
                r.original.as_str(),
                r.query.as_str(),
                p.symbol.as_str(),
                p.exchange.as_str(),
                p.name.as_str(),
                &p.score.to_string(),
                &p.yahoo_url(),
            ])?,
            None => wtr.write_record([r.original.as_str(), r.query.as_str(), "", "", "", "", ""])?,
        }
    }
    wtr.flush()?;
    Ok(())
}
