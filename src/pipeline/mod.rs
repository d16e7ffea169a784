//! Main processing pipeline.
//!
//! Sequences the star-schema derivation: load both raw sources, extract
//! the dimension tables, assemble the fact table, and write every table
//! through the partitioned sink.
//!
//! All reads happen before any transform and all writes happen after;
//! the transforms themselves are pure set operations. The dimension
//! tables are independent of each other, so their writes proceed
//! concurrently; only `songplays` depends on the catalog and the
//! cleaned event stream. A run either completes every table or fails as
//! a whole — there is no partial-completion resume.

use snafu::prelude::*;
use tracing::{debug, info};

use crate::config::Config;
use crate::emit;
use crate::error::{PipelineError, PipelineStorageSnafu, SinkSnafu, SourceSnafu, TransformSnafu};
use crate::metrics::events::{PlayEventsExtracted, RecordsRead};
use crate::model::{LogRecord, SongRecord};
use crate::sink::{ParquetSink, PartitionedSink, TableWrite};
use crate::source::{RecordSource, StorageRecordSource};
use crate::transform::fact::TitleArtistIndex;
use crate::transform::{catalog, events, fact, time};

/// Statistics about the pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Raw song-metadata records parsed.
    pub song_records: usize,
    /// Raw log events parsed.
    pub log_records: usize,
    /// Log events that passed the play filter.
    pub play_events: usize,
    /// Rows written across all tables.
    pub rows_written: usize,
    /// Parquet files written across all tables.
    pub parquet_files_written: usize,
    /// Parquet bytes written across all tables.
    pub bytes_written: usize,
}

impl PipelineStats {
    fn record(&mut self, write: &TableWrite) {
        self.rows_written += write.rows;
        self.parquet_files_written += write.files;
        self.bytes_written += write.bytes;
    }
}

/// Main processing pipeline.
pub struct Pipeline {
    config: Config,
    song_source: StorageRecordSource,
    log_source: StorageRecordSource,
    sink: ParquetSink,
}

impl Pipeline {
    /// Create a new pipeline from configuration.
    pub fn new(config: Config) -> Result<Self, PipelineError> {
        let song_source = StorageRecordSource::from_config(
            &config.source.song_data,
            config.source.max_concurrent_files,
        )
        .context(PipelineStorageSnafu)?;
        let log_source = StorageRecordSource::from_config(
            &config.source.log_data,
            config.source.max_concurrent_files,
        )
        .context(PipelineStorageSnafu)?;
        let sink = ParquetSink::from_config(&config.sink).context(PipelineStorageSnafu)?;

        Ok(Self {
            config,
            song_source,
            log_source,
            sink,
        })
    }

    /// Run the pipeline to completion.
    pub async fn run(&self) -> Result<PipelineStats, PipelineError> {
        info!("Starting pipeline");
        let mut stats = PipelineStats::default();

        // All reads up front; a malformed file aborts its whole source.
        let (song_records, log_records): (Vec<SongRecord>, Vec<LogRecord>) = tokio::try_join!(
            async { self.song_source.load().await.context(SourceSnafu) },
            async { self.log_source.load().await.context(SourceSnafu) },
        )?;
        stats.song_records = song_records.len();
        stats.log_records = log_records.len();
        emit!(RecordsRead {
            source: "song_data",
            count: song_records.len() as u64,
        });
        emit!(RecordsRead {
            source: "log_data",
            count: log_records.len() as u64,
        });
        info!(
            "Loaded {} song records, {} log events",
            stats.song_records, stats.log_records
        );

        // Dimension derivation. The catalog index is built from the raw
        // records before projection so the join still sees artist names.
        let songs = catalog::songs_table(&song_records).context(TransformSnafu)?;
        let artists = catalog::artists_table(&song_records).context(TransformSnafu)?;
        let catalog_index = TitleArtistIndex::build(&song_records);

        let play_events = events::play_events(log_records).context(TransformSnafu)?;
        stats.play_events = play_events.len();
        emit!(PlayEventsExtracted {
            count: play_events.len() as u64,
        });
        debug!(
            "{} play events, catalog index holds {} keys",
            play_events.len(),
            catalog_index.len()
        );

        let users = events::users_table(&play_events, self.config.users.reduction)
            .context(TransformSnafu)?;
        let time = time::time_table(&play_events);
        let songplays = fact::songplays_table(&play_events, &catalog_index);

        // Every table or nothing: the first sink failure aborts the run.
        let writes = tokio::try_join!(
            self.sink.write_table(songs),
            self.sink.write_table(artists),
            self.sink.write_table(users),
            self.sink.write_table(time),
            self.sink.write_table(songplays),
        )
        .context(SinkSnafu)?;

        let (songs_w, artists_w, users_w, time_w, songplays_w) = writes;
        for write in [&songs_w, &artists_w, &users_w, &time_w, &songplays_w] {
            stats.record(write);
        }

        info!("Pipeline completed: {:?}", stats);
        Ok(stats)
    }
}

/// Run the pipeline with the given configuration.
pub async fn run_pipeline(config: Config) -> Result<PipelineStats, PipelineError> {
    let pipeline = Pipeline::new(config)?;
    pipeline.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_stats_default() {
        let stats = PipelineStats::default();
        assert_eq!(stats.play_events, 0);
        assert_eq!(stats.rows_written, 0);
    }

    #[test]
    fn test_stats_accumulate_writes() {
        let mut stats = PipelineStats::default();
        stats.record(&TableWrite {
            table: "songs",
            rows: 3,
            files: 2,
            bytes: 100,
        });
        stats.record(&TableWrite {
            table: "artists",
            rows: 1,
            files: 1,
            bytes: 50,
        });
        assert_eq!(stats.rows_written, 4);
        assert_eq!(stats.parquet_files_written, 3);
        assert_eq!(stats.bytes_written, 150);
    }
}
