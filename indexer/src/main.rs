use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{fmt, EnvFilter};
use trendwatch_core::persist::load_snapshot;
use trendwatch_core::search::{fetch_pair, search_pair};
use trendwatch_core::{DatasetStore, InvertedIndex};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Inspect, index and query dataset files offline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a dataset, build its index and print a summary
    Inspect {
        #[arg(long)]
        dataset: PathBuf,
        /// How many of the most viewed records to list
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Run a keyword search against a dataset file
    Query {
        #[arg(long)]
        dataset: PathBuf,
        #[arg(long)]
        q: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print one record by id
    Fetch {
        #[arg(long)]
        dataset: PathBuf,
        #[arg(long)]
        id: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { dataset, top } => inspect(&dataset, top),
        Commands::Query { dataset, q, limit } => {
            let store = DatasetStore::open(&dataset)?;
            let result = search_pair(&store.current(), &q, limit)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Commands::Fetch { dataset, id } => {
            let store = DatasetStore::open(&dataset)?;
            let record = fetch_pair(&store.current(), &id)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    }
}

fn inspect(dataset: &Path, top: usize) -> Result<()> {
    let start = Instant::now();
    let snapshot = load_snapshot(dataset)?;
    let loaded = start.elapsed();
    let index = InvertedIndex::build(&snapshot);
    let built = start.elapsed() - loaded;
    tracing::info!(
        records = snapshot.len(),
        terms = index.num_terms(),
        load_s = loaded.as_secs_f64(),
        index_s = built.as_secs_f64(),
        "dataset indexed"
    );

    let meta = snapshot.meta();
    let created = meta.created_at.format(&Rfc3339).map_err(|e| anyhow!("bad creation time: {e}"))?;
    let popular: Vec<_> = index
        .most_popular(top)
        .iter()
        .filter_map(|&d| snapshot.get(d))
        .map(|r| serde_json::json!({ "id": r.id, "title": r.title, "views": r.view_count }))
        .collect();
    let newest = snapshot.records().first().map(|r| r.published_at.format(&Rfc3339)).transpose()?;
    let oldest = snapshot.records().last().map(|r| r.published_at.format(&Rfc3339)).transpose()?;
    let summary = serde_json::json!({
        "path": dataset.display().to_string(),
        "fingerprint": snapshot.fingerprint(),
        "query": meta.query,
        "days": meta.days,
        "created_at": created,
        "source_count": meta.source_count,
        "final_count": meta.final_count,
        "terms": index.num_terms(),
        "newest": newest,
        "oldest": oldest,
        "most_viewed": popular,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
