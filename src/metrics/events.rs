//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence in the pipeline.
//! Events implement the `InternalEvent` trait which emits the
//! corresponding Prometheus metric.

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted when raw records are parsed from a source.
pub struct RecordsRead {
    pub source: &'static str,
    pub count: u64,
}

impl InternalEvent for RecordsRead {
    fn emit(self) {
        trace!(source = self.source, count = self.count, "Records read");
        counter!("starling_records_read_total", "source" => self.source).increment(self.count);
    }
}

/// Event emitted when play events are extracted from the log stream.
pub struct PlayEventsExtracted {
    pub count: u64,
}

impl InternalEvent for PlayEventsExtracted {
    fn emit(self) {
        trace!(count = self.count, "Play events extracted");
        counter!("starling_play_events_total").increment(self.count);
    }
}

/// Event emitted when a table has been fully written.
pub struct TableWritten {
    pub table: &'static str,
    pub rows: u64,
    pub files: u64,
    pub duration: Duration,
}

impl InternalEvent for TableWritten {
    fn emit(self) {
        trace!(table = self.table, rows = self.rows, "Table written");
        counter!("starling_rows_written_total", "table" => self.table).increment(self.rows);
        counter!("starling_parquet_files_written_total", "table" => self.table)
            .increment(self.files);
        histogram!("starling_table_write_duration_seconds", "table" => self.table)
            .record(self.duration.as_secs_f64());
    }
}

/// Event emitted when Parquet bytes are written to storage.
pub struct BytesWritten {
    pub bytes: u64,
}

impl InternalEvent for BytesWritten {
    fn emit(self) {
        trace!(bytes = self.bytes, "Bytes written");
        counter!("starling_bytes_written_total").increment(self.bytes);
    }
}
