//! starling: a library for transforming music-streaming event logs into a
//! star schema of partitioned Parquet tables.
//!
//! This library reads raw song-metadata records and listening-session log
//! events, derives the `songs`, `artists`, `users` and `time` dimension
//! tables plus the `songplays` fact table, and writes each table as
//! Hive-partitioned Parquet files.
//!
//! # Example
//!
//! ```ignore
//! use starling::{Config, run_pipeline, error::PipelineError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), PipelineError> {
//!     let config = Config::from_file("config.yaml")?;
//!     let stats = run_pipeline(config).await?;
//!     println!("Wrote {} rows", stats.rows_written);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod storage;
pub mod transform;

// Re-export main types
pub use config::Config;
pub use pipeline::{Pipeline, PipelineStats, run_pipeline};
pub use storage::{StorageProvider, StorageProviderRef};
