//! Arrow bindings for the star-schema tables.
//!
//! Implements [`TableRow`] for each row type: the Arrow schema, the
//! row-to-batch conversion, and the partition-column rendering the sink
//! uses to build `key=value/` path segments.

use arrow::array::{
    ArrayRef, Float64Array, Int32Array, Int64Array, RecordBatch, StringArray,
    TimestampSecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::error::ArrowError;
use std::sync::Arc;

use crate::model::{ArtistRow, SongRow, SongplayRow, TimeRow, UserRow};

use super::{NULL_PARTITION, TableRow};

fn utc_timestamp() -> DataType {
    DataType::Timestamp(TimeUnit::Second, Some("UTC".into()))
}

fn opt_string_array<'a>(values: impl Iterator<Item = Option<&'a str>>) -> ArrayRef {
    Arc::new(StringArray::from_iter(values))
}

impl TableRow for SongRow {
    const TABLE: &'static str = "songs";
    const PARTITION_COLUMNS: &'static [&'static str] = &["year", "artist_id"];

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("song_id", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, true),
            Field::new("artist_id", DataType::Utf8, true),
            Field::new("year", DataType::Int64, true),
            Field::new("duration", DataType::Float64, true),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(StringArray::from_iter_values(
                    rows.iter().map(|r| r.song_id.as_str()),
                )),
                opt_string_array(rows.iter().map(|r| r.title.as_deref())),
                opt_string_array(rows.iter().map(|r| r.artist_id.as_deref())),
                Arc::new(Int64Array::from_iter(rows.iter().map(|r| r.year))),
                Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.duration))),
            ],
        )
    }

    fn partition_value(&self, column: &str) -> String {
        match column {
            "year" => self
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| NULL_PARTITION.to_string()),
            "artist_id" => self
                .artist_id
                .clone()
                .unwrap_or_else(|| NULL_PARTITION.to_string()),
            _ => NULL_PARTITION.to_string(),
        }
    }
}

impl TableRow for ArtistRow {
    const TABLE: &'static str = "artists";
    const PARTITION_COLUMNS: &'static [&'static str] = &[];

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("artist_id", DataType::Utf8, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("location", DataType::Utf8, true),
            Field::new("latitude", DataType::Float64, true),
            Field::new("longitude", DataType::Float64, true),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(StringArray::from_iter_values(
                    rows.iter().map(|r| r.artist_id.as_str()),
                )),
                opt_string_array(rows.iter().map(|r| r.name.as_deref())),
                opt_string_array(rows.iter().map(|r| r.location.as_deref())),
                Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.latitude))),
                Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.longitude))),
            ],
        )
    }

    fn partition_value(&self, _column: &str) -> String {
        NULL_PARTITION.to_string()
    }
}

impl TableRow for UserRow {
    const TABLE: &'static str = "users";
    const PARTITION_COLUMNS: &'static [&'static str] = &[];

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("user_id", DataType::Utf8, false),
            Field::new("first_name", DataType::Utf8, true),
            Field::new("last_name", DataType::Utf8, true),
            Field::new("gender", DataType::Utf8, true),
            Field::new("level", DataType::Utf8, true),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(StringArray::from_iter_values(
                    rows.iter().map(|r| r.user_id.as_str()),
                )),
                opt_string_array(rows.iter().map(|r| r.first_name.as_deref())),
                opt_string_array(rows.iter().map(|r| r.last_name.as_deref())),
                opt_string_array(rows.iter().map(|r| r.gender.as_deref())),
                opt_string_array(rows.iter().map(|r| r.level.as_deref())),
            ],
        )
    }

    fn partition_value(&self, _column: &str) -> String {
        NULL_PARTITION.to_string()
    }
}

impl TableRow for TimeRow {
    const TABLE: &'static str = "time";
    const PARTITION_COLUMNS: &'static [&'static str] = &["year", "month"];

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("start_time", utc_timestamp(), false),
            Field::new("hour", DataType::Int32, false),
            Field::new("day", DataType::Int32, false),
            Field::new("week", DataType::Int32, false),
            Field::new("month", DataType::Int32, false),
            Field::new("year", DataType::Int32, false),
            Field::new("weekday", DataType::Utf8, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(
                    TimestampSecondArray::from_iter_values(
                        rows.iter().map(|r| r.start_time.timestamp()),
                    )
                    .with_timezone("UTC"),
                ),
                Arc::new(Int32Array::from_iter_values(
                    rows.iter().map(|r| r.hour as i32),
                )),
                Arc::new(Int32Array::from_iter_values(
                    rows.iter().map(|r| r.day as i32),
                )),
                Arc::new(Int32Array::from_iter_values(
                    rows.iter().map(|r| r.week as i32),
                )),
                Arc::new(Int32Array::from_iter_values(
                    rows.iter().map(|r| r.month as i32),
                )),
                Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.year))),
                Arc::new(StringArray::from_iter_values(
                    rows.iter().map(|r| r.weekday.as_str()),
                )),
            ],
        )
    }

    fn partition_value(&self, column: &str) -> String {
        match column {
            "year" => self.year.to_string(),
            "month" => self.month.to_string(),
            _ => NULL_PARTITION.to_string(),
        }
    }
}

impl TableRow for SongplayRow {
    const TABLE: &'static str = "songplays";
    const PARTITION_COLUMNS: &'static [&'static str] = &["year", "month"];

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("songplay_id", DataType::Int64, false),
            Field::new("start_time", utc_timestamp(), false),
            Field::new("user_id", DataType::Utf8, true),
            Field::new("level", DataType::Utf8, true),
            Field::new("song_id", DataType::Utf8, true),
            Field::new("artist_id", DataType::Utf8, true),
            Field::new("session_id", DataType::Int64, false),
            Field::new("location", DataType::Utf8, true),
            Field::new("user_agent", DataType::Utf8, true),
            Field::new("year", DataType::Int32, false),
            Field::new("month", DataType::Int32, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(Int64Array::from_iter_values(
                    rows.iter().map(|r| r.songplay_id),
                )),
                Arc::new(
                    TimestampSecondArray::from_iter_values(
                        rows.iter().map(|r| r.start_time.timestamp()),
                    )
                    .with_timezone("UTC"),
                ),
                opt_string_array(rows.iter().map(|r| r.user_id.as_deref())),
                opt_string_array(rows.iter().map(|r| r.level.as_deref())),
                opt_string_array(rows.iter().map(|r| r.song_id.as_deref())),
                opt_string_array(rows.iter().map(|r| r.artist_id.as_deref())),
                Arc::new(Int64Array::from_iter_values(
                    rows.iter().map(|r| r.session_id),
                )),
                opt_string_array(rows.iter().map(|r| r.location.as_deref())),
                opt_string_array(rows.iter().map(|r| r.user_agent.as_deref())),
                Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.year))),
                Arc::new(Int32Array::from_iter_values(
                    rows.iter().map(|r| r.month as i32),
                )),
            ],
        )
    }

    fn partition_value(&self, column: &str) -> String {
        match column {
            "year" => self.year.to_string(),
            "month" => self.month.to_string(),
            _ => NULL_PARTITION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_song_batch_nullability() {
        let rows = vec![
            SongRow {
                song_id: "SOAAA".to_string(),
                title: Some("X".to_string()),
                artist_id: Some("ARAA".to_string()),
                year: Some(1994),
                duration: Some(1.0),
            },
            SongRow {
                song_id: "SOBBB".to_string(),
                title: None,
                artist_id: None,
                year: None,
                duration: None,
            },
        ];
        let batch = SongRow::to_batch(&rows).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 5);
        assert_eq!(batch.column(3).null_count(), 1);
    }

    #[test]
    fn test_song_partition_values() {
        let row = SongRow {
            song_id: "SOAAA".to_string(),
            title: None,
            artist_id: None,
            year: Some(1994),
            duration: None,
        };
        assert_eq!(row.partition_value("year"), "1994");
        assert_eq!(row.partition_value("artist_id"), NULL_PARTITION);
    }

    #[test]
    fn test_songplay_batch_start_time_seconds() {
        let row = SongplayRow {
            songplay_id: 1,
            start_time: DateTime::from_timestamp(1_541_121_934, 0).unwrap(),
            user_id: Some("10".to_string()),
            level: Some("free".to_string()),
            song_id: None,
            artist_id: None,
            session_id: 5,
            location: None,
            user_agent: None,
            year: 2018,
            month: 11,
        };
        let batch = SongplayRow::to_batch(std::slice::from_ref(&row)).unwrap();
        let times = batch
            .column(1)
            .as_any()
            .downcast_ref::<TimestampSecondArray>()
            .unwrap();
        assert_eq!(times.value(0), 1_541_121_934);
    }
}
