use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use feedprep::app::ports::{ObjectStore, TableSink};
use feedprep::config::{FeedSpec, PipelineConfig};
use feedprep::infra::{HttpObjectStore, LocalDirStore};
use feedprep::logging;
use feedprep::pipeline::processing::RowPolicy;
use feedprep::pipeline::storage::{CsvFileSink, InMemorySink};
use feedprep::pipeline::{FeedOrchestrator, FeedStatus};
use feedprep::types::Feed;

#[derive(Parser)]
#[command(name = "feedprep")]
#[command(about = "Repairs and types malformed domain-intelligence CSV feeds")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    /// Read raw files from the configured raw directory
    Local,
    /// Fetch raw files from the object store over HTTP
    Http,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, repair and persist the registered feeds
    Run {
        /// Specific feeds to run (comma-separated). Available: malware, phishing, spam, benign
        #[arg(long)]
        feeds: Option<String>,
        #[arg(long, value_enum, default_value = "local")]
        source: Source,
        /// TOML configuration file (defaults to ./feedprep.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Pad or truncate ragged rows instead of failing the feed
        #[arg(long)]
        legacy_rows: bool,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Process one local raw file and print the resulting column types
    Inspect {
        file: PathBuf,
        #[arg(long)]
        feed: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            feeds,
            source,
            config,
            legacy_rows,
            json,
        } => {
            let mut config = PipelineConfig::load(config.as_deref()).context("loading configuration")?;
            if let Some(list) = feeds {
                let names: Vec<String> = list.split(',').map(|s| s.trim().to_string()).collect();
                config.select_feeds(&names)?;
            }
            if legacy_rows {
                config.row_policy = RowPolicy::Legacy;
            }
            config.ensure_directories()?;

            let store: Arc<dyn ObjectStore> = match source {
                Source::Local => Arc::new(LocalDirStore::new(config.raw_dir.clone())),
                Source::Http => Arc::new(HttpObjectStore::new(config.storage.clone())?),
            };
            let sink: Arc<dyn TableSink> = Arc::new(CsvFileSink::new(config.processed_dir.clone()));

            println!("🔄 Preparing {} feed(s)...", config.feeds.len());
            let report = FeedOrchestrator::new(config, store, sink).run().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!("\n📊 Run {}:", report.run_id);
            for outcome in &report.outcomes {
                match &outcome.status {
                    FeedStatus::Written {
                        destination,
                        rows,
                        columns,
                        ..
                    } => println!(
                        "   ✅ {}: {} rows x {} columns -> {}",
                        outcome.feed, rows, columns, destination
                    ),
                    FeedStatus::Failed { stage, error } => {
                        println!("   ⚠️  {} failed at {}: {}", outcome.feed, stage.as_str(), error)
                    }
                }
            }
            if report.failed() > 0 {
                warn!(failed = report.failed(), "some feeds were not processed");
            }
            info!(run_id = %report.run_id, "run complete");
        }
        Commands::Inspect { file, feed } => {
            let feed: Feed = feed.parse()?;
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .context("input path has no file name")?
                .to_string();
            let root = file.parent().map(PathBuf::from).unwrap_or_default();

            let mut config = PipelineConfig::default();
            config.feeds = vec![FeedSpec::new(feed, file_name)];
            let orchestrator = FeedOrchestrator::new(
                config,
                Arc::new(LocalDirStore::new(root)),
                Arc::new(InMemorySink::new()),
            );
            let report = orchestrator.run().await;

            for outcome in &report.outcomes {
                match &outcome.status {
                    FeedStatus::Written {
                        rows, column_types, ..
                    } => {
                        println!("{} ({} rows)", outcome.file_name, rows);
                        for (name, kind) in column_types {
                            println!("   {:<24} {}", name, kind);
                        }
                    }
                    FeedStatus::Failed { stage, error } => {
                        anyhow::bail!("{} failed at {}: {}", outcome.file_name, stage.as_str(), error)
                    }
                }
            }
        }
    }

    Ok(())
}
