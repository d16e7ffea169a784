//! Raw record parsing.
//!
//! Decodes possibly-compressed source files into typed records. Two
//! physical layouts exist in the wild: song metadata arrives as one JSON
//! document per file, log events as one JSON document per line.
//!
//! Parsing is strict: a record the decoder cannot understand fails the
//! whole source rather than being skipped.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use snafu::prelude::*;
use std::io::Read;
use tracing::debug;

use crate::config::{CompressionFormat, RecordFormat};
use crate::error::{
    FileParseSnafu, GzipDecompressionSnafu, RecordParseSnafu, SourceError, ZstdDecompressionSnafu,
};

/// Decoder for a single source's files.
#[derive(Debug, Clone)]
pub struct RecordReader {
    format: RecordFormat,
    compression: CompressionFormat,
}

impl RecordReader {
    /// Create a reader for the given layout and compression.
    pub fn new(format: RecordFormat, compression: CompressionFormat) -> Self {
        Self {
            format,
            compression,
        }
    }

    /// Decode one file's bytes into typed records.
    pub fn read<T: DeserializeOwned>(&self, raw: Bytes, path: &str) -> Result<Vec<T>, SourceError> {
        let data = self.decompress(raw, path)?;

        let records = match self.format {
            RecordFormat::Json => {
                let record = serde_json::from_slice(&data).context(FileParseSnafu {
                    path: path.to_string(),
                })?;
                vec![record]
            }
            RecordFormat::Ndjson => {
                let text = String::from_utf8_lossy(&data);
                let mut records = Vec::new();
                for (idx, line) in text.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let record = serde_json::from_str(line).context(RecordParseSnafu {
                        path: path.to_string(),
                        line: idx + 1,
                    })?;
                    records.push(record);
                }
                records
            }
        };

        debug!("Parsed {} records from {}", records.len(), path);
        Ok(records)
    }

    fn decompress(&self, raw: Bytes, path: &str) -> Result<Vec<u8>, SourceError> {
        match self.compression {
            CompressionFormat::None => Ok(raw.to_vec()),
            CompressionFormat::Gzip => {
                let mut decoder = flate2::read::GzDecoder::new(&raw[..]);
                let mut buf = Vec::new();
                decoder
                    .read_to_end(&mut buf)
                    .context(GzipDecompressionSnafu {
                        path: path.to_string(),
                    })?;
                Ok(buf)
            }
            CompressionFormat::Zstd => {
                zstd::decode_all(&raw[..]).context(ZstdDecompressionSnafu {
                    path: path.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LogRecord, SongRecord};
    use std::io::Write;

    #[test]
    fn test_ndjson_lines() {
        let reader = RecordReader::new(RecordFormat::Ndjson, CompressionFormat::None);
        let data = Bytes::from_static(
            b"{\"page\":\"NextSong\",\"ts\":1}\n\n{\"page\":\"Home\",\"ts\":2}\n",
        );
        let records: Vec<LogRecord> = reader.read(data, "events.json").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].page, "NextSong");
        assert_eq!(records[1].ts, 2);
    }

    #[test]
    fn test_single_record_file() {
        let reader = RecordReader::new(RecordFormat::Json, CompressionFormat::None);
        let data = Bytes::from_static(b"{\n  \"song_id\": \"SOAAA\",\n  \"title\": \"X\"\n}");
        let records: Vec<SongRecord> = reader.read(data, "song.json").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].song_id.as_deref(), Some("SOAAA"));
    }

    #[test]
    fn test_gzip_roundtrip() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(b"{\"page\":\"NextSong\",\"ts\":1541121934796}\n")
            .unwrap();
        let compressed = encoder.finish().unwrap();

        let reader = RecordReader::new(RecordFormat::Ndjson, CompressionFormat::Gzip);
        let records: Vec<LogRecord> = reader
            .read(Bytes::from(compressed), "events.json.gz")
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ts, 1541121934796);
    }

    #[test]
    fn test_malformed_line_is_fatal() {
        let reader = RecordReader::new(RecordFormat::Ndjson, CompressionFormat::None);
        let data = Bytes::from_static(b"{\"page\":\"NextSong\",\"ts\":1}\nnot json\n");
        let result: Result<Vec<LogRecord>, _> = reader.read(data, "events.json");
        let err = result.unwrap_err();
        assert!(matches!(err, SourceError::RecordParse { line: 2, .. }));
    }
}
