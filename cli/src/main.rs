//! VAALoader CLI: load a dump of signed VAAs into a VAA store.
//!
//! ```text
//! vaaloader --file signed-vaas.csv [--worker-count 100] [--mongo-uri <uri>]
//! vaaloader --file signed-vaas.csv --sqlite-path vaas.db
//! vaaloader --file signed-vaas.csv --dry-run
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing::{info, warn};
use vaaloader_batch::{BackfillConfig, Backfiller, RunStats};
use vaaloader_core::{VaaDecoder, VaaRepository};
use vaaloader_observability::{init_tracing, LogConfig};
use vaaloader_storage::{InMemoryRepository, MongoRepository, SqliteRepository};

const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017/";

#[derive(Parser)]
#[command(
    name = "vaaloader",
    about = "Backfill signed VAAs from a CSV dump into a VAA store",
    long_about = "
Reads a newline-delimited file where each line is `id,<hex VAA>[,...]`,
decodes every VAA and upserts it keyed by `chain/emitter/sequence`.
Malformed lines are logged and skipped; re-running over the same file is safe.

ENVIRONMENT VARIABLES:
  FILENAME           Input file (same as --file)
  MONGODB_URI        MongoDB connection string (default mongodb://localhost:27017/)
  MONGODB_DATABASE   MongoDB database name (default wormhole)
  WORKER_COUNT       Number of concurrent workers (default 100)
",
    version
)]
struct Cli {
    /// Input file of `id,hexvaa` lines
    #[arg(long, visible_alias = "filename", env = "FILENAME")]
    file: Option<PathBuf>,

    /// MongoDB connection string
    #[arg(long, env = "MONGODB_URI")]
    mongo_uri: Option<String>,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DATABASE", default_value = "wormhole")]
    mongo_database: String,

    /// Number of concurrent workers
    #[arg(long, env = "WORKER_COUNT", default_value_t = 100)]
    worker_count: usize,

    /// Queue slots per worker
    #[arg(long, default_value_t = 1_000)]
    queue_factor: usize,

    /// Write into this SQLite file instead of MongoDB
    #[arg(long, conflicts_with = "dry_run")]
    sqlite_path: Option<PathBuf>,

    /// Decode and count without writing anywhere
    #[arg(long)]
    dry_run: bool,

    /// Skip the line pre-count (progress shows a spinner)
    #[arg(long)]
    no_count: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Global log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit JSON logs
    #[arg(long)]
    log_json: bool,

    /// Debug logs for the pipeline crates
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let Some(file) = cli.file.clone() else {
        eprintln!("error: an input file is required (--file or FILENAME)\n");
        Cli::command().print_help()?;
        return Ok(ExitCode::FAILURE);
    };

    let mut log = LogConfig {
        level: cli.log_level.clone(),
        json: cli.log_json,
        ..LogConfig::default()
    };
    if cli.verbose {
        log = log
            .with_component("vaaloader-batch", "debug")
            .with_component("vaaloader-storage", "debug");
    }
    init_tracing(&log);

    let repository = open_repository(&cli).await?;
    let config = BackfillConfig::default()
        .worker_count(cli.worker_count)
        .queue_factor(cli.queue_factor)
        .count_lines(!cli.no_count)
        .show_progress(!cli.no_progress);

    let stats = Backfiller::new(config, Arc::new(VaaDecoder), repository)
        .run(&file)
        .await
        .with_context(|| format!("backfill of {} failed", file.display()))?;

    print_summary(&stats);
    println!("done!");
    Ok(ExitCode::SUCCESS)
}

async fn open_repository(cli: &Cli) -> Result<Arc<dyn VaaRepository>> {
    if cli.dry_run {
        info!("dry run: nothing will be written");
        return Ok(Arc::new(InMemoryRepository::new()));
    }

    if let Some(path) = &cli.sqlite_path {
        let repo = SqliteRepository::open(path)
            .with_context(|| format!("cannot open SQLite database {}", path.display()))?;
        info!(path = %path.display(), "using SQLite store");
        return Ok(Arc::new(repo));
    }

    let uri = match &cli.mongo_uri {
        Some(uri) => uri.clone(),
        None => {
            warn!(uri = DEFAULT_MONGODB_URI, "MONGODB_URI not set, using default");
            DEFAULT_MONGODB_URI.to_string()
        }
    };
    let repo = MongoRepository::connect(&uri, &cli.mongo_database)
        .await
        .context("cannot connect to MongoDB")?;
    info!(database = %cli.mongo_database, "connected to MongoDB");
    Ok(Arc::new(repo))
}

fn print_summary(stats: &RunStats) {
    println!("processed {} lines", stats.lines_read);
    println!("  persisted:       {}", stats.persisted);
    println!("  bad fields:      {}", stats.field_parse_errors);
    println!("  bad hex:         {}", stats.hex_decode_errors);
    println!("  undecodable:     {}", stats.message_decode_errors);
    println!("  upsert failures: {}", stats.upsert_errors);
    println!("  elapsed:         {} ms", stats.elapsed_ms);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn filename_alias_and_defaults() {
        let cli = Cli::try_parse_from(["vaaloader", "--filename", "vaas.csv"]).unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("vaas.csv")));
        assert_eq!(cli.mongo_database, "wormhole");
        assert!(!cli.dry_run);
    }

    #[test]
    fn sqlite_and_dry_run_conflict() {
        let res = Cli::try_parse_from([
            "vaaloader",
            "--file",
            "v.csv",
            "--dry-run",
            "--sqlite-path",
            "v.db",
        ]);
        assert!(res.is_err());
    }
}
