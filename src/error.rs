//! Error types for starling using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed"))]
    ObjectStore { source: object_store::Error },

    /// Unrecognized S3 storage option.
    #[snafu(display("Invalid S3 storage option '{key}'"))]
    S3Option {
        key: String,
        source: object_store::Error,
    },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error"))]
    S3Config { source: object_store::Error },

    /// Local filesystem root could not be opened.
    #[snafu(display("Local storage root error: {path}"))]
    LocalRoot {
        path: String,
        source: object_store::Error,
    },

    /// IO error during storage operations.
    #[snafu(display("IO error"))]
    Io { source: std::io::Error },
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Song-metadata source path is empty.
    #[snafu(display("Song data path cannot be empty"))]
    EmptySongDataPath,

    /// Event-log source path is empty.
    #[snafu(display("Log data path cannot be empty"))]
    EmptyLogDataPath,

    /// Output root path is empty.
    #[snafu(display("Sink path cannot be empty"))]
    EmptySinkPath,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file"))]
    ReadFile { source: std::io::Error },
}

// ============ Source Errors ============

/// Errors that can occur while reading raw source records.
///
/// A parse failure is fatal for the whole source: the pipeline never
/// skips past records it cannot understand.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    /// Gzip decompression failed.
    #[snafu(display("Gzip decompression failed for {path}"))]
    GzipDecompression {
        source: std::io::Error,
        path: String,
    },

    /// Zstd decompression failed.
    #[snafu(display("Zstd decompression failed for {path}"))]
    ZstdDecompression {
        source: std::io::Error,
        path: String,
    },

    /// A line of a record-per-line file failed to parse.
    #[snafu(display("Failed to parse record at {path}:{line}"))]
    RecordParse {
        path: String,
        line: usize,
        source: serde_json::Error,
    },

    /// A record-per-file document failed to parse.
    #[snafu(display("Failed to parse record file {path}"))]
    FileParse {
        path: String,
        source: serde_json::Error,
    },

    /// Storage error while listing or fetching source files.
    #[snafu(display("Source storage error"))]
    SourceStorage { source: StorageError },
}

// ============ Transform Errors ============

/// Errors that can occur during table derivation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransformError {
    /// A row could not be serialized for duplicate detection.
    #[snafu(display("Failed to build dedup key"))]
    DedupKey { source: serde_json::Error },

    /// Event timestamp is outside the representable range.
    #[snafu(display("Event timestamp out of range: {ts}"))]
    TimestampRange { ts: i64 },
}

// ============ Sink Errors ============

/// Errors that can occur while writing partitioned Parquet tables.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// Arrow record batch construction failed.
    #[snafu(display("Failed to build record batch for table {table}"))]
    BatchBuild {
        table: String,
        source: arrow::error::ArrowError,
    },

    /// Parquet write error.
    #[snafu(display("Parquet write error"))]
    ParquetWrite {
        source: parquet::errors::ParquetError,
    },

    /// Failed to create Parquet writer.
    #[snafu(display("Failed to create Parquet writer"))]
    WriterCreate {
        source: parquet::errors::ParquetError,
    },

    /// Upload of a finished file failed.
    #[snafu(display("Failed to upload {path}"))]
    Upload { path: String, source: StorageError },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },

    /// Failed to bind the metrics HTTP listener.
    #[snafu(display("Failed to bind metrics server to {addr}"))]
    Bind {
        addr: String,
        source: std::io::Error,
    },
}

// ============ Pipeline Error (top-level) ============

/// Top-level pipeline errors that aggregate all error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Storage error.
    #[snafu(display("Storage error"))]
    PipelineStorage { source: StorageError },

    /// Configuration error.
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },

    /// Source error.
    #[snafu(display("Source error"))]
    Source { source: SourceError },

    /// Transform error.
    #[snafu(display("Transform error"))]
    Transform { source: TransformError },

    /// Sink error.
    #[snafu(display("Sink error"))]
    Sink { source: SinkError },

    /// Address parsing error.
    #[snafu(display("Failed to parse address"))]
    AddressParse { source: std::net::AddrParseError },

    /// Metrics error.
    #[snafu(display("Metrics error"))]
    Metrics { source: MetricsError },
}
