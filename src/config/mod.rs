//! Configuration parsing and validation.
//!
//! Handles loading configuration from YAML files with environment
//! variable interpolation. The configuration names two input roots
//! (song metadata and event logs), one output root, and the policy
//! knobs the transforms expose.

mod vars;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{
    ConfigError, EmptyLogDataPathSnafu, EmptySinkPathSnafu, EmptySongDataPathSnafu,
    EnvInterpolationSnafu, ReadFileSnafu, YamlParseSnafu,
};

/// Main configuration structure for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub sink: SinkConfig,
    /// Users dimension policy (optional).
    #[serde(default)]
    pub users: UsersConfig,
    /// Metrics configuration (optional, disabled by default).
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Source configuration naming the two input roots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root location of song-metadata records.
    pub song_data: TableSourceConfig,

    /// Root location of listening-session log events.
    pub log_data: TableSourceConfig,

    /// Maximum number of files to fetch and parse concurrently (default: 4).
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,
}

/// Configuration for a single record source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSourceConfig {
    /// Root path of the source files.
    /// Examples: "s3://bucket/song_data", "/local/path/log_data"
    pub path: String,

    /// Physical layout of records in each file.
    #[serde(default)]
    pub format: RecordFormat,

    /// Compression format of input files.
    #[serde(default)]
    pub compression: CompressionFormat,

    /// Storage options (credentials, region, etc.)
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

/// Physical layout of records within a source file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    /// One JSON record per line (also covers one-record-per-file sources
    /// whose files hold a single compact line).
    #[default]
    Ndjson,
    /// One JSON document per file, possibly spanning multiple lines.
    Json,
}

/// Compression format for source files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompressionFormat {
    #[default]
    None,
    Gzip,
    Zstd,
}

/// Sink configuration for the partitioned Parquet output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Output root. Each table is written under `<path>/<table>/`.
    /// Examples: "s3://bucket/analytics", "/local/path/analytics"
    pub path: String,

    /// Parquet compression codec.
    #[serde(default)]
    pub compression: ParquetCompression,

    /// Storage options (credentials, region, etc.)
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

/// Parquet compression codec.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    Uncompressed,
    #[default]
    Snappy,
    Gzip,
    Zstd,
    Lz4,
}

/// Policy knobs for the `users` dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersConfig {
    /// How rows are reduced per user.
    #[serde(default)]
    pub reduction: UserReduction,
}

/// Reduction strategy for the `users` dimension.
///
/// A user's `level` can change between events, so full-row dedup can
/// legitimately keep several rows for one user id. Which behavior the
/// dimension should have is an open modelling question, so both are
/// offered; the default preserves the source behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UserReduction {
    /// Keep every distinct (user_id, first_name, last_name, gender, level)
    /// combination observed.
    #[default]
    DistinctRows,
    /// Keep exactly one row per user id, taken from that user's most
    /// recent event.
    LatestLevel,
}

/// Metrics configuration for the Prometheus endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled (default: false).
    #[serde(default)]
    pub enabled: bool,
    /// Address to bind the metrics HTTP server (default: "0.0.0.0:9090").
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: default_metrics_address(),
        }
    }
}

fn default_metrics_address() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_max_concurrent_files() -> usize {
    4
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_file_with_options(path, true)
    }

    /// Load configuration from a YAML file with optional environment
    /// variable interpolation.
    pub fn from_file_with_options(
        path: impl AsRef<Path>,
        interpolate_env: bool,
    ) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).context(ReadFileSnafu)?;

        let content = if interpolate_env {
            let result = vars::interpolate(&content);
            if !result.is_ok() {
                let message = result.errors.join("\n");
                return EnvInterpolationSnafu { message }.fail();
            }
            result.text
        } else {
            content
        };

        let config: Config = serde_yaml::from_str(&content).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.source.song_data.path.is_empty(), EmptySongDataPathSnafu);
        ensure!(!self.source.log_data.path.is_empty(), EmptyLogDataPathSnafu);
        ensure!(!self.sink.path.is_empty(), EmptySinkPathSnafu);
        Ok(())
    }
}
