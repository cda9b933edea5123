mod config;
mod error;
mod indicator;
mod model;
mod notifier;
mod scan;
mod source;
mod strategy;
mod summarizer;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{AppConfig, SourceKind};
use indicator::engine::IndicatorEngine;
use model::Instrument;
use notifier::Notifier;
use notifier::terminal::TerminalNotifier;
use scan::Scanner;
use source::PriceSource;
use source::file::FileSource;
use source::yahoo::YahooSource;
use strategy::ScoringEngine;
use strategy::rank::Ranker;
use summarizer::{
    CommandSummarizer, Summarizer, compare_prompt, digest, scan_prompt, snapshot_digest,
};

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("price source error")]
    Source,
    #[display("indicator setup error")]
    Indicators,
}

#[derive(Parser)]
#[command(name = "stock-radar", about = "Technical signal scanner for stock watchlists")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Score the configured watchlist and report ranked signals
    Scan,
    /// Ask the summarizer to pick the best of two or three instruments
    Compare {
        #[arg(num_args = 2..=3, required = true)]
        ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = config::load(Path::new(&cli.config)).change_context(AppError::Config)?;

    init_tracing(&config);

    let scanner = build_scanner(&config)?;
    let notifier = TerminalNotifier::new(config.ranking.watch_preview);

    match cli.command.unwrap_or(Command::Scan) {
        Command::Scan => run_scan(&config, &scanner, &notifier).await,
        Command::Compare { ids } => run_compare(&config, &scanner, &notifier, &ids).await,
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

fn build_source(config: &AppConfig) -> Result<Arc<dyn PriceSource>, Report<AppError>> {
    let source: Arc<dyn PriceSource> = match config.source.kind {
        SourceKind::Yahoo => {
            Arc::new(YahooSource::new(&config.source).change_context(AppError::Source)?)
        }
        SourceKind::File => Arc::new(FileSource::new(&config.source.data_dir)),
    };
    info!(source = source.name(), "price source ready");
    Ok(source)
}

fn build_scanner(config: &AppConfig) -> Result<Scanner, Report<AppError>> {
    let indicators =
        IndicatorEngine::new(&config.indicators).change_context(AppError::Indicators)?;
    info!(
        min_history = indicators.min_history(),
        trend_min_history = indicators.trend_min_history(),
        "indicator engine ready"
    );
    let scorer = ScoringEngine::new(config.scoring.clone());
    Ok(Scanner::new(build_source(config)?, indicators, scorer).with_retry(
        config.source.fetch_attempts,
        Duration::from_millis(config.source.fetch_retry_delay_ms),
    ))
}

async fn run_scan(
    config: &AppConfig,
    scanner: &Scanner,
    notifier: &dyn Notifier,
) -> Result<(), Report<AppError>> {
    if config.instruments.is_empty() {
        tracing::warn!("watchlist is empty; nothing to scan");
        return Ok(());
    }

    let outcome = scanner.scan(&config.instruments).await;
    let ranking = Ranker::from_config(&config.ranking).rank(outcome.signals.clone());
    notifier.notify_scan(&config.instruments, &outcome, &ranking);

    if config.summarizer.enabled && config.summarizer.summarize_scan && !ranking.is_empty() {
        let summarizer = CommandSummarizer::from_config(&config.summarizer);
        // A failing summarizer never fails the scan.
        match summarizer.summarize(scan_prompt(&digest(&ranking.flat()))).await {
            Ok(text) => notifier.notify_summary("scan", &text),
            Err(e) => tracing::warn!(error = ?e, "scan summary unavailable"),
        }
    }

    Ok(())
}

async fn run_compare(
    config: &AppConfig,
    scanner: &Scanner,
    notifier: &dyn Notifier,
    ids: &[String],
) -> Result<(), Report<AppError>> {
    let instruments: Vec<Instrument> = ids
        .iter()
        .map(|id| {
            config
                .instruments
                .iter()
                .find(|i| &i.id == id)
                .cloned()
                .unwrap_or_else(|| Instrument::from_id(id))
        })
        .collect();

    let snapshots = scanner.snapshots(&instruments).await;
    if snapshots.len() < 2 {
        tracing::warn!(
            requested = instruments.len(),
            analysed = snapshots.len(),
            "not enough data to compare"
        );
        return Ok(());
    }

    let entries: Vec<_> = snapshots
        .iter()
        .map(|(instrument, snapshot)| (instrument.id.as_str(), snapshot))
        .collect();
    let summarizer = CommandSummarizer::from_config(&config.summarizer);
    match summarizer.summarize(compare_prompt(&snapshot_digest(&entries))).await {
        Ok(text) => notifier.notify_summary("compare", &text),
        Err(e) => tracing::warn!(error = ?e, "comparison unavailable"),
    }
    Ok(())
}
