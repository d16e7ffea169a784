//! Partitioned Parquet sink.
//!
//! Groups a table's rows by its declared partition columns and writes
//! one Parquet file per distinct partition-key combination, under
//! `<table>/<col>=<value>/.../<uuid>.parquet`. Files are encoded into an
//! in-memory buffer and uploaded whole; any write or upload failure is
//! fatal for the run.

use bytes::Bytes;
use object_store::path::Path;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use snafu::prelude::*;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{ParquetCompression, SinkConfig};
use crate::emit;
use crate::error::{BatchBuildSnafu, ParquetWriteSnafu, SinkError, UploadSnafu, WriterCreateSnafu};
use crate::metrics::events::{BytesWritten, TableWritten};
use crate::storage::{StorageProvider, StorageProviderRef};

use super::{PartitionedSink, TableRow, TableWrite};

/// Parquet sink writing through a storage provider.
pub struct ParquetSink {
    storage: StorageProviderRef,
    compression: ParquetCompression,
}

impl ParquetSink {
    /// Create a sink from its configuration.
    pub fn from_config(config: &SinkConfig) -> Result<Self, crate::error::StorageError> {
        let storage = StorageProvider::for_url_with_options(&config.path, &config.storage_options)?;
        Ok(Self {
            storage: std::sync::Arc::new(storage),
            compression: config.compression,
        })
    }

    /// Create a sink over an existing storage provider.
    pub fn new(storage: StorageProviderRef, compression: ParquetCompression) -> Self {
        Self {
            storage,
            compression,
        }
    }

    fn writer_properties(&self) -> WriterProperties {
        let compression = match self.compression {
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
            ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ParquetCompression::Lz4 => Compression::LZ4,
        };
        WriterProperties::builder()
            .set_compression(compression)
            .build()
    }

    /// Encode one partition's rows into Parquet bytes.
    fn encode<R: TableRow>(&self, rows: &[R]) -> Result<Bytes, SinkError> {
        let batch = R::to_batch(rows).context(BatchBuildSnafu { table: R::TABLE })?;
        let mut writer =
            ArrowWriter::try_new(Vec::new(), R::schema(), Some(self.writer_properties()))
                .context(WriterCreateSnafu)?;
        writer.write(&batch).context(ParquetWriteSnafu)?;
        let buffer = writer.into_inner().context(ParquetWriteSnafu)?;
        Ok(Bytes::from(buffer))
    }

    /// File path for one partition, e.g. `songs/year=1994/artist_id=ARAA/<uuid>.parquet`.
    fn partition_path<R: TableRow>(row: &R) -> String {
        let uuid = Uuid::now_v7();
        let mut segments: Vec<String> = vec![R::TABLE.to_string()];
        segments.extend(
            R::PARTITION_COLUMNS
                .iter()
                .map(|col| format!("{}={}", col, row.partition_value(col))),
        );
        segments.push(format!("{uuid}.parquet"));
        segments.join("/")
    }

    /// Group rows by their partition-key values, preserving row order
    /// within each group. BTreeMap keeps partition output deterministic.
    fn group_rows<R: TableRow>(rows: Vec<R>) -> BTreeMap<Vec<String>, Vec<R>> {
        let mut groups: BTreeMap<Vec<String>, Vec<R>> = BTreeMap::new();
        for row in rows {
            let key = R::PARTITION_COLUMNS
                .iter()
                .map(|col| row.partition_value(col))
                .collect();
            groups.entry(key).or_default().push(row);
        }
        groups
    }
}

impl PartitionedSink for ParquetSink {
    async fn write_table<R: TableRow>(&self, rows: Vec<R>) -> Result<TableWrite, SinkError> {
        let start = Instant::now();
        let total_rows = rows.len();
        let groups = Self::group_rows(rows);

        let mut files = 0usize;
        let mut bytes_written = 0usize;
        for (key, group) in &groups {
            let path = Self::partition_path(&group[0]);
            let bytes = self.encode(group)?;
            bytes_written += bytes.len();
            debug!(
                "Writing {} ({} rows, {} bytes, partition {:?})",
                path,
                group.len(),
                bytes.len(),
                key
            );
            emit!(BytesWritten {
                bytes: bytes.len() as u64
            });
            self.storage
                .put(&Path::from(path.as_str()), bytes)
                .await
                .context(UploadSnafu { path })?;
            files += 1;
        }

        emit!(TableWritten {
            table: R::TABLE,
            rows: total_rows as u64,
            files: files as u64,
            duration: start.elapsed(),
        });
        info!(
            "Wrote table {}: {} rows in {} files ({} bytes)",
            R::TABLE,
            total_rows,
            files,
            bytes_written
        );

        Ok(TableWrite {
            table: R::TABLE,
            rows: total_rows,
            files,
            bytes: bytes_written,
        })
    }
}
