//! Record source: file discovery plus parsing.
//!
//! A [`RecordSource`] produces the full sequence of typed records for
//! one input root. The shipped implementation lists files under a
//! storage provider, fetches them concurrently, and decodes them with
//! [`RecordReader`].

pub mod reader;

pub use reader::RecordReader;

use futures::{StreamExt, TryStreamExt, stream};
use serde::de::DeserializeOwned;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::config::{CompressionFormat, TableSourceConfig};
use crate::error::{SourceError, SourceStorageSnafu, StorageError};
use crate::storage::{StorageProvider, StorageProviderRef};

/// Capability of producing a sequence of structured records.
pub trait RecordSource {
    /// Load every record under this source's root.
    fn load<T>(&self) -> impl Future<Output = Result<Vec<T>, SourceError>> + Send
    where
        T: DeserializeOwned + Send;
}

/// Record source backed by a storage provider.
pub struct StorageRecordSource {
    storage: StorageProviderRef,
    reader: RecordReader,
    compression: CompressionFormat,
    max_concurrent: usize,
}

impl StorageRecordSource {
    /// Create a record source from its configuration.
    pub fn from_config(
        config: &TableSourceConfig,
        max_concurrent: usize,
    ) -> Result<Self, StorageError> {
        let storage = StorageProvider::for_url_with_options(&config.path, &config.storage_options)?;
        Ok(Self {
            storage: std::sync::Arc::new(storage),
            reader: RecordReader::new(config.format, config.compression),
            compression: config.compression,
            max_concurrent,
        })
    }

    /// Whether a listed object looks like a record file for this source.
    fn is_record_file(&self, path: &str) -> bool {
        match self.compression {
            CompressionFormat::None => path.ends_with(".json") || path.ends_with(".ndjson"),
            CompressionFormat::Gzip => path.ends_with(".json.gz") || path.ends_with(".ndjson.gz"),
            CompressionFormat::Zstd => path.ends_with(".json.zst") || path.ends_with(".ndjson.zst"),
        }
    }
}

impl RecordSource for StorageRecordSource {
    async fn load<T>(&self) -> Result<Vec<T>, SourceError>
    where
        T: DeserializeOwned + Send,
    {
        let mut files: Vec<_> = self
            .storage
            .list()
            .await
            .context(SourceStorageSnafu)?
            .into_iter()
            .filter(|p| self.is_record_file(p.as_ref()))
            .collect();
        // Deterministic processing order regardless of listing order
        files.sort_unstable();

        info!(
            "Found {} record files under {}",
            files.len(),
            self.storage.url()
        );

        let file_records: Vec<Vec<T>> = stream::iter(files)
            .map(|path| async move {
                let raw = self
                    .storage
                    .get(&path)
                    .await
                    .context(SourceStorageSnafu)?;
                debug!("Fetched {} ({} bytes)", path, raw.len());
                self.reader.read(raw, path.as_ref())
            })
            .buffered(self.max_concurrent)
            .try_collect()
            .await?;

        Ok(file_records.into_iter().flatten().collect())
    }
}
