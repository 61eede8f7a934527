//! Symbol search: turning company-name-like entries into Yahoo tickers.
//!
//! The scoring and query-normalisation helpers are pure; the HTTP client is
//! behind the `SymbolSearch` trait so the resolve job can be tested offline.

use super::provider::DataError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const SEARCH_URL: &str = "https://query1.finance.yahoo.com/v1/finance/search";

/// Exchange a resolution should prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    #[default]
    Bse,
    Nse,
}

impl Exchange {
    /// Exchange codes as they appear in search results.
    pub fn codes(&self) -> &'static [&'static str] {
        match self {
            Exchange::Bse => &["BOM", "BSE", "BOM:XBOM"],
            Exchange::Nse => &["NSI", "NSE"],
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Exchange::Bse => ".BO",
            Exchange::Nse => ".NS",
        }
    }

    fn matches_exchange(&self, exchange: &str) -> bool {
        let upper = exchange.to_uppercase();
        self.codes().iter().any(|c| upper.contains(c))
    }

    fn matches_symbol(&self, symbol: &str) -> bool {
        symbol.to_uppercase().ends_with(self.suffix())
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::Bse => write!(f, "bse"),
            Exchange::Nse => write!(f, "nse"),
        }
    }
}

impl FromStr for Exchange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bse" | "bom" => Ok(Exchange::Bse),
            "nse" | "nsi" => Ok(Exchange::Nse),
            other => Err(format!("unknown exchange '{other}' (expected bse or nse)")),
        }
    }
}

/// One entry of the search response's `quotes` array.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchQuote {
    pub symbol: Option<String>,
    #[serde(rename = "exchDisp")]
    pub exch_disp: Option<String>,
    pub exchange: Option<String>,
    pub shortname: Option<String>,
    pub longname: Option<String>,
    pub score: Option<f64>,
}

impl SearchQuote {
    fn exchange_label(&self) -> Option<&str> {
        self.exch_disp.as_deref().or(self.exchange.as_deref())
    }

    fn display_name(&self) -> &str {
        self.shortname
            .as_deref()
            .or(self.longname.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
}

/// The chosen quote with its adjusted score.
#[derive(Debug, Clone, PartialEq)]
pub struct Pick {
    pub symbol: String,
    pub exchange: String,
    pub name: String,
    pub score: f64,
}

impl Pick {
    /// Accept without trying further queries.
    pub fn is_confident(&self, prefer: Exchange) -> bool {
        prefer.matches_exchange(&self.exchange) || prefer.matches_symbol(&self.symbol) || self.score > 20.0
    }

    pub fn yahoo_url(&self) -> String {
        format!("https://finance.yahoo.com/quote/{}", self.symbol)
    }
}

/// Score quotes and return the best one that carries a symbol.
///
/// Score = provider relevance + 50 for a preferred exchange + 20 for the
/// preferred suffix. Ties keep the earlier quote.
pub fn best_pick(quotes: &[SearchQuote], prefer: Exchange) -> Option<Pick> {
    let mut best: Option<Pick> = None;
    for quote in quotes {
        let Some(symbol) = quote.symbol.as_deref().filter(|s| !s.is_empty()) else {
            continue;
        };
        let mut score = quote.score.unwrap_or(0.0);
        if quote.exchange_label().is_some_and(|e| prefer.matches_exchange(e)) {
            score += 50.0;
        }
        if prefer.matches_symbol(symbol) {
            score += 20.0;
        }
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(Pick {
                symbol: symbol.to_string(),
                exchange: quote.exchange_label().unwrap_or("").to_string(),
                name: quote.display_name().to_string(),
                score,
            });
        }
    }
    best
}

const STRIP_SUFFIXES: [&str; 6] = [".BO", ".NS", ".NASDAQ", ".NYSE", ".LS", ".L"];
const SPACED_TOKENS: [(&str, &str); 4] = [
    ("INDIALTD", "INDIA LTD"),
    ("LTD", "LTD"),
    ("INDIA", "INDIA"),
    ("LIMITED", "LIMITED"),
];

/// Split an input line into `(original, query)`.
///
/// The query drops one exchange suffix and pads glued-together corporate
/// tokens (`RELIANCEINDIALTD` → `RELIANCE INDIA LTD`).
pub fn normalize_query(line: &str) -> (String, String) {
    let original = line.trim().to_string();
    let mut query = original.clone();
    for suffix in STRIP_SUFFIXES {
        let cut = query.len().saturating_sub(suffix.len());
        if query.get(cut..).is_some_and(|tail| tail.eq_ignore_ascii_case(suffix)) {
            query.truncate(cut);
            break;
        }
    }
    for (token, spaced) in SPACED_TOKENS {
        let padded = format!(" {spaced} ");
        query = query
            .replace(token, &padded)
            .replace(&token.to_lowercase(), &padded);
    }
    let query = query.split_whitespace().collect::<Vec<_>>().join(" ");
    (original, query)
}

/// Queries to try, in order, for one input line.
pub fn candidate_queries(original: &str, query: &str) -> Vec<String> {
    vec![
        query.to_string(),
        original.to_string(),
        format!("{query} bse"),
        format!("{query} bombay stock exchange"),
        format!("{query} company"),
    ]
}

/// A symbol search backend.
pub trait SymbolSearch {
    fn search(&self, query: &str) -> Result<Vec<SearchQuote>, DataError>;
}

/// Yahoo Finance v1 search endpoint.
pub struct YahooSearch {
    client: reqwest::blocking::Client,
}

impl YahooSearch {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl SymbolSearch for YahooSearch {
    fn search(&self, query: &str) -> Result<Vec<SearchQuote>, DataError> {
        let resp = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", query)])
            .header("Accept", "application/json")
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                symbol: query.to_string(),
            });
        }
        let body: SearchResponse = resp
            .json()
            .map_err(|e| DataError::ResponseFormatChanged(format!("search response: {e}")))?;
        Ok(body.quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(symbol: &str, exch: &str, score: f64) -> SearchQuote {
        SearchQuote {
            symbol: Some(symbol.into()),
            exch_disp: Some(exch.into()),
            shortname: Some(format!("{symbol} Ltd")),
            score: Some(score),
            ..Default::default()
        }
    }

    #[test]
    fn normalize_strips_suffix_and_spaces_tokens() {
        assert_eq!(
            normalize_query("  RELIANCEINDIALTD.BO "),
            ("RELIANCEINDIALTD.BO".to_string(), "RELIANCE INDIA LTD".to_string())
        );
        assert_eq!(normalize_query("acc.ns").1, "acc");
        assert_eq!(normalize_query("tatasteellimited").1, "tatasteel LIMITED");
    }

    #[test]
    fn only_first_suffix_is_stripped() {
        assert_eq!(normalize_query("FOO.NS.BO").1, "FOO.NS");
    }

    #[test]
    fn candidates_in_order() {
        let c = candidate_queries("ACC.BO", "ACC");
        assert_eq!(c[0], "ACC");
        assert_eq!(c[1], "ACC.BO");
        assert_eq!(c[4], "ACC company");
    }

    #[test]
    fn preferred_exchange_outscores_relevance() {
        let quotes = vec![quote("ACC.NS", "NSE", 30.0), quote("ACC.BO", "Bombay BOM", 10.0)];
        let pick = best_pick(&quotes, Exchange::Bse).unwrap();
        assert_eq!(pick.symbol, "ACC.BO");
        assert_eq!(pick.score, 80.0);
        assert!(pick.is_confident(Exchange::Bse));

        let nse = best_pick(&quotes, Exchange::Nse).unwrap();
        assert_eq!(nse.symbol, "ACC.NS");
        assert_eq!(nse.score, 100.0);
    }

    #[test]
    fn ties_keep_first_and_symbolless_skipped() {
        let mut blank = quote("", "NYQ", 99.0);
        blank.symbol = None;
        let quotes = vec![blank, quote("A", "NYQ", 5.0), quote("B", "NYQ", 5.0)];
        let pick = best_pick(&quotes, Exchange::Bse).unwrap();
        assert_eq!(pick.symbol, "A");
        assert!(!pick.is_confident(Exchange::Bse));
    }

    #[test]
    fn empty_results_no_pick() {
        assert!(best_pick(&[], Exchange::Bse).is_none());
    }

    #[test]
    fn parses_search_payload() {
        let json = r#"{"quotes":[{"symbol":"TCS.BO","exchDisp":"Bombay","exchange":"BSE",
            "shortname":"TATA CONSULTANCY","score":20004.0,"quoteType":"EQUITY"}],"news":[]}"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        let pick = best_pick(&resp.quotes, Exchange::Bse).unwrap();
        assert_eq!(pick.name, "TATA CONSULTANCY");
        assert_eq!(pick.yahoo_url(), "https://finance.yahoo.com/quote/TCS.BO");
    }
}
