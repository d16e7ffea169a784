//! Partitioned table sink.
//!
//! A [`PartitionedSink`] accepts a table's rows plus its declared
//! partition columns and materializes one physical unit per distinct
//! partition-key combination under a table-named root. The shipped
//! implementation writes Parquet through the storage provider.

pub mod parquet;
pub mod tables;

pub use parquet::ParquetSink;

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use serde::Serialize;

use crate::error::SinkError;

/// Value used for a null partition column in the output path, following
/// the Hive convention.
pub const NULL_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// A row type belonging to one star-schema table.
pub trait TableRow: Serialize + Send + Sync {
    /// Table name; also the directory under the output root.
    const TABLE: &'static str;

    /// Partition columns, in path order. Empty for unpartitioned tables.
    const PARTITION_COLUMNS: &'static [&'static str];

    /// Arrow schema of the table.
    fn schema() -> SchemaRef;

    /// Convert a slice of rows into a record batch.
    fn to_batch(rows: &[Self]) -> Result<RecordBatch, arrow::error::ArrowError>
    where
        Self: Sized;

    /// Render this row's value for a partition column.
    fn partition_value(&self, column: &str) -> String;
}

/// Outcome of writing one table.
#[derive(Debug, Clone)]
pub struct TableWrite {
    /// The table that was written.
    pub table: &'static str,
    /// Rows written across all files.
    pub rows: usize,
    /// Number of Parquet files written (one per partition-key combination).
    pub files: usize,
    /// Total Parquet bytes uploaded.
    pub bytes: usize,
}

/// Capability of persisting partitioned tables.
pub trait PartitionedSink {
    /// Write all rows of one table, grouped by its partition columns.
    fn write_table<R: TableRow>(
        &self,
        rows: Vec<R>,
    ) -> impl Future<Output = Result<TableWrite, SinkError>> + Send;
}
