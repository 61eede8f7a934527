//! StockPipe CLI: collect, update, preprocess, sequences, resolve, status.
//!
//! Commands:
//! - `collect`: full download of every ticker into raw CSV files and SQLite
//! - `update`: append the days since the last collect to each raw CSV
//! - `preprocess`: clean, build features, scale, write processed outputs
//! - `run`: collect, then preprocess
//! - `sequences`: sliding-window train/val/test sets from processed CSVs
//! - `resolve`: map company names to Yahoo symbols
//! - `status`: what the raw store and the database hold

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stockpipe_core::data::{
    DataProvider, Database, Exchange, LogProgress, RawCsvStore, SyntheticProvider, TickerList,
    YahooProvider, YahooSearch,
};
use stockpipe_core::features::FeatureSet;
use stockpipe_core::scaling::ScalerKind;
use stockpipe_runner::{
    build_sequences, collect, gather_status, preprocess, read_input, resolve_all, update,
    write_report, write_ticker_list, PipelineConfig, RunStats, UpdateOptions,
};

#[derive(Parser)]
#[command(
    name = "stockpipe",
    version,
    about = "StockPipe: daily OHLCV collector and ML preprocessor"
)]
struct Cli {
    /// Pipeline config (TOML). Defaults to ./stockpipe.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Also write logs to this file (no colours).
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct TickerArgs {
    /// Comma-separated tickers (e.g. TCS,INFY.NS). `.NS` is added when no suffix is given.
    #[arg(long)]
    tickers: Option<String>,

    /// File with one ticker per line (`#` comments allowed).
    #[arg(long, conflicts_with = "tickers")]
    tickers_file: Option<PathBuf>,
}

#[derive(Args, Clone, Default)]
struct CollectArgs {
    #[command(flatten)]
    tickers: TickerArgs,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date, exclusive (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Pause between tickers in milliseconds.
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Use generated data instead of Yahoo Finance.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

#[derive(Args, Clone, Default)]
struct PreprocessArgs {
    /// Feature set: model or technical.
    #[arg(long)]
    feature_set: Option<FeatureSet>,

    /// Scaler: min-max, standard or none.
    #[arg(long)]
    scaler: Option<ScalerKind>,

    /// Keep rows that still contain NaN after feature building.
    #[arg(long, default_value_t = false)]
    keep_incomplete: bool,

    /// Also write {STOCK}.parquet next to each processed CSV.
    #[arg(long, default_value_t = false)]
    parquet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download full history for every ticker.
    Collect(CollectArgs),
    /// Append new days to existing raw CSV files.
    Update {
        #[command(flatten)]
        tickers: TickerArgs,

        /// Use generated data instead of Yahoo Finance.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Clean raw files, build features, scale and write processed outputs.
    Preprocess(PreprocessArgs),
    /// Collect, then preprocess.
    Run {
        #[command(flatten)]
        collect: CollectArgs,

        #[command(flatten)]
        preprocess: PreprocessArgs,
    },
    /// Build train/val/test window sets from processed CSVs.
    Sequences {
        /// Window length in rows.
        #[arg(long)]
        length: Option<usize>,
    },
    /// Resolve company names or loose tickers to Yahoo symbols.
    Resolve {
        /// Input file, one name or ticker per line.
        #[arg(long)]
        input: PathBuf,

        /// Corrected ticker list.
        #[arg(long, default_value = "resolved_tickers.txt")]
        out_txt: PathBuf,

        /// Resolution report.
        #[arg(long, default_value = "ticker_resolution_report.csv")]
        out_csv: PathBuf,

        /// Pause after each search request in milliseconds.
        #[arg(long)]
        pause_ms: Option<u64>,

        /// Preferred exchange: bse or nse.
        #[arg(long)]
        prefer: Option<Exchange>,
    },
    /// Report raw files and database tables.
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_file.as_deref())?;

    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Collect(args) => {
            apply_collect_args(&mut config, &args);
            config.validate()?;
            let stats = run_collect(&config, args.synthetic)?;
            ensure_not_all_failed("collect", &stats)
        }
        Commands::Update { tickers, synthetic } => {
            apply_ticker_args(&mut config, &tickers);
            config.validate()?;
            run_update(&config, synthetic)
        }
        Commands::Preprocess(args) => {
            apply_preprocess_args(&mut config, &args);
            config.validate()?;
            let stats = run_preprocess(&config)?;
            ensure_not_all_failed("preprocess", &stats)
        }
        Commands::Run {
            collect,
            preprocess,
        } => {
            apply_collect_args(&mut config, &collect);
            apply_preprocess_args(&mut config, &preprocess);
            config.validate()?;
            let collected = run_collect(&config, collect.synthetic)?;
            ensure_not_all_failed("collect", &collected)?;
            let processed = run_preprocess(&config)?;
            ensure_not_all_failed("preprocess", &processed)
        }
        Commands::Sequences { length } => {
            if let Some(length) = length {
                config.sequences.length = length;
            }
            config.validate()?;
            let stats = build_sequences(&config.sequence_options())?;
            stats.log_summary("sequences");
            ensure_not_all_failed("sequences", &stats)
        }
        Commands::Resolve {
            input,
            out_txt,
            out_csv,
            pause_ms,
            prefer,
        } => {
            if let Some(pause_ms) = pause_ms {
                config.resolve.pause_ms = pause_ms;
            }
            if let Some(prefer) = prefer {
                config.resolve.prefer_exchange = prefer;
            }
            run_resolve(&config, &input, &out_txt, &out_csv)
        }
        Commands::Status => {
            let store = RawCsvStore::new(&config.paths.raw_dir);
            let report = gather_status(&store, &config.paths.db_path)?;
            println!("Raw dir:  {}", config.paths.raw_dir.display());
            println!("Database: {}", config.paths.db_path.display());
            println!();
            print!("{}", report.render());
            Ok(())
        }
    }
}

/// Console logs go to stderr; `--log-file` adds an uncoloured copy.
fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()?;
    Ok(())
}

fn apply_ticker_args(config: &mut PipelineConfig, args: &TickerArgs) {
    if let Some(list) = &args.tickers {
        config.collect.tickers = TickerList::from_csv_arg(list).tickers;
        config.collect.tickers_file = None;
    }
    if let Some(path) = &args.tickers_file {
        config.collect.tickers_file = Some(path.clone());
    }
}

fn apply_collect_args(config: &mut PipelineConfig, args: &CollectArgs) {
    apply_ticker_args(config, &args.tickers);
    if let Some(start) = args.start {
        config.collect.start_date = start;
    }
    if let Some(end) = args.end {
        config.collect.end_date = Some(end);
    }
    if let Some(delay) = args.delay_ms {
        config.collect.request_delay_ms = delay;
    }
}

fn apply_preprocess_args(config: &mut PipelineConfig, args: &PreprocessArgs) {
    if let Some(set) = args.feature_set {
        config.features.feature_set = set;
    }
    if let Some(scaler) = args.scaler {
        config.features.scaler = scaler;
    }
    if args.keep_incomplete {
        config.features.drop_incomplete = false;
    }
    if args.parquet {
        config.features.write_parquet = true;
    }
}

fn make_provider(synthetic: bool) -> Result<Box<dyn DataProvider>> {
    if synthetic {
        tracing::warn!("using SYNTHETIC data, output is not real market data");
        Ok(Box::new(SyntheticProvider::new()))
    } else {
        Ok(Box::new(YahooProvider::new()?))
    }
}

fn open_database(path: &Path) -> Result<Database> {
    Database::open(path).with_context(|| format!("cannot open database {}", path.display()))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn run_collect(config: &PipelineConfig, synthetic: bool) -> Result<RunStats> {
    let tickers = config.tickers()?;
    let provider = make_provider(synthetic)?;
    let store = RawCsvStore::new(&config.paths.raw_dir);
    let mut db = open_database(&config.paths.db_path)?;

    let stats = collect(
        provider.as_ref(),
        &tickers,
        &store,
        &mut db,
        &config.collect_options(today()),
        &LogProgress,
    )?;
    stats.log_summary("collect");
    Ok(stats)
}

fn run_update(config: &PipelineConfig, synthetic: bool) -> Result<()> {
    let tickers = config.tickers()?;
    let provider = make_provider(synthetic)?;
    let store = RawCsvStore::new(&config.paths.raw_dir);
    let opts = UpdateOptions {
        today: today(),
        request_delay: config.collect_options(today()).request_delay,
    };

    let stats = update(provider.as_ref(), &tickers, &store, &opts, &LogProgress);
    stats.log_summary("update");
    ensure_not_all_failed("update", &stats)
}

fn run_preprocess(config: &PipelineConfig) -> Result<RunStats> {
    let mut db = open_database(&config.paths.db_path)?;
    let stats = preprocess(&mut db, &config.preprocess_options())?;
    stats.log_summary("preprocess");
    Ok(stats)
}

fn run_resolve(config: &PipelineConfig, input: &Path, out_txt: &Path, out_csv: &Path) -> Result<()> {
    let lines =
        read_input(input).with_context(|| format!("cannot read input {}", input.display()))?;
    if lines.is_empty() {
        bail!("no entries in {}", input.display());
    }

    let search = YahooSearch::new()?;
    let (resolutions, stats) = resolve_all(&search, &lines, &config.resolve_options());
    write_ticker_list(&resolutions, out_txt)?;
    write_report(&resolutions, out_csv)?;

    stats.log_summary("resolve");
    tracing::info!(
        tickers = %out_txt.display(),
        report = %out_csv.display(),
        "resolution written"
    );
    ensure_not_all_failed("resolve", &stats)
}

fn ensure_not_all_failed(job: &str, stats: &RunStats) -> Result<()> {
    if stats.all_failed() {
        bail!("{job}: all {} item(s) failed", stats.total);
    }
    Ok(())
}
