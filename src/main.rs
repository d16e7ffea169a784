//! starling: a standalone tool for transforming music-streaming event
//! logs into a star schema of partitioned Parquet tables.
//!
//! Reads raw song-metadata records and listening-session log events from
//! S3 or the local filesystem, derives the dimension and fact tables,
//! and writes each table as Hive-partitioned Parquet files.

mod config;
mod error;
mod metrics;
mod model;
mod pipeline;
mod sink;
mod source;
mod storage;
mod transform;

use clap::Parser;
use snafu::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{AddressParseSnafu, ConfigSnafu, MetricsSnafu, PipelineError};
use pipeline::run_pipeline;

/// Music-streaming logs to star-schema Parquet tables.
#[derive(Parser, Debug)]
#[command(name = "starling")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Dry run - validate configuration without processing.
    #[arg(long)]
    dry_run: bool,
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("starling starting");

    let config = Config::from_file(&args.config).context(ConfigSnafu)?;

    // Initialize metrics if enabled
    if config.metrics.enabled {
        let addr = config.metrics.address.parse().context(AddressParseSnafu)?;
        metrics::init(addr).await.context(MetricsSnafu)?;
        debug!(
            "Metrics endpoint listening on http://{}/metrics",
            config.metrics.address
        );
    }

    if args.dry_run {
        info!("Dry run mode - validating configuration");
        info!("Song data: {}", config.source.song_data.path);
        info!("Log data: {}", config.source.log_data.path);
        info!("Sink: {}", config.sink.path);
        info!("Users reduction: {:?}", config.users.reduction);
        info!("Configuration is valid");
        return Ok(());
    }

    let stats = run_pipeline(config).await?;

    info!("Pipeline completed successfully");
    info!("  Song records: {}", stats.song_records);
    info!("  Log events: {}", stats.log_records);
    info!("  Play events: {}", stats.play_events);
    info!("  Rows written: {}", stats.rows_written);
    info!("  Parquet files written: {}", stats.parquet_files_written);
    info!("  Bytes written: {}", stats.bytes_written);

    Ok(())
}
