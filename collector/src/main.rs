use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use collector::sample::sample_snapshot;
use collector::source::{DEFAULT_API_BASE, MAX_PAGE_SIZE};
use collector::{Collector, CollectorConfig, RetryPolicy, YouTubeSource};
use std::path::PathBuf;
use std::time::Duration;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};
use trendwatch_core::persist::save_snapshot;
use trendwatch_core::Error;

#[derive(Parser)]
#[command(name = "collector")]
#[command(about = "Collect trending short-video metadata into a dataset file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one ingestion and atomically replace the dataset file
    Collect {
        /// Search query
        #[arg(long, default_value = "YouTube Shorts")]
        query: String,
        /// Only videos published within the last N days
        #[arg(long, default_value_t = 10)]
        days: u32,
        /// Dataset file to write
        #[arg(long, env = "DATA_PATH", default_value = "./data/trendwatch.twds")]
        out: PathBuf,
        /// Upper bound on pages requested from the source
        #[arg(long, default_value_t = 20)]
        max_pages: u32,
        /// Results per page (1-50)
        #[arg(long, default_value_t = MAX_PAGE_SIZE)]
        page_size: u32,
        /// Stop after this many distinct videos
        #[arg(long)]
        max_results: Option<usize>,
        /// Drop videos with fewer views than this
        #[arg(long, default_value_t = 0)]
        min_views: u64,
        /// Attempts per page, including the first
        #[arg(long, default_value_t = 4)]
        max_attempts: u32,
        #[arg(long, default_value_t = 500)]
        base_delay_ms: u64,
        #[arg(long, default_value_t = 8_000)]
        max_delay_ms: u64,
        /// Per-request timeout
        #[arg(long, default_value_t = 12)]
        timeout_secs: u64,
        #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
        api_key: String,
        #[arg(long, default_value = DEFAULT_API_BASE)]
        api_base: String,
    },
    /// Write the built-in demonstration dataset
    Sample {
        #[arg(long, env = "DATA_PATH", default_value = "./data/trendwatch.twds")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Collect {
            query,
            days,
            out,
            max_pages,
            page_size,
            max_results,
            min_views,
            max_attempts,
            base_delay_ms,
            max_delay_ms,
            timeout_secs,
            api_key,
            api_base,
        } => {
            if days == 0 {
                bail!("--days must be greater than zero");
            }
            if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
                bail!("--page-size must be between 1 and {MAX_PAGE_SIZE}");
            }
            if max_attempts == 0 {
                bail!("--max-attempts must be at least 1");
            }
            if api_key.trim().is_empty() {
                bail!("an API key is required (--api-key or YOUTUBE_API_KEY)");
            }
            let config = CollectorConfig {
                max_pages,
                page_size,
                max_results,
                min_views,
                retry: RetryPolicy {
                    max_attempts,
                    base_delay: Duration::from_millis(base_delay_ms),
                    max_delay: Duration::from_millis(max_delay_ms.max(base_delay_ms)),
                },
            };
            let source = YouTubeSource::new(api_key, &api_base, Duration::from_secs(timeout_secs))?;
            let collector = Collector::new(source, config);

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupt received, stopping after the current page");
                    on_signal.cancel();
                }
            });

            match collector.ingest(&query, days, &out, &cancel).await {
                Ok(report) => {
                    tracing::info!(
                        path = %report.path.display(),
                        records = report.records,
                        source_count = report.source_count,
                        fingerprint = %report.fingerprint,
                        "ingestion complete"
                    );
                    Ok(())
                }
                Err(e @ Error::EmptyResult { .. }) => {
                    tracing::warn!(error = %e, "nothing collected, dataset left unchanged");
                    Err(e.into())
                }
                Err(e) => {
                    tracing::error!(error = %e, retryable = e.is_retryable(), "ingestion failed, dataset left unchanged");
                    Err(e.into())
                }
            }
        }
        Commands::Sample { out } => {
            let snapshot = sample_snapshot(OffsetDateTime::now_utc())?;
            save_snapshot(&out, &snapshot)?;
            tracing::info!(path = %out.display(), records = snapshot.len(), "sample dataset written");
            Ok(())
        }
    }
}
