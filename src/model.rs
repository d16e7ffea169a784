//! Record and row types for the star schema.
//!
//! Raw input records (`SongRecord`, `LogRecord`) mirror the source data
//! as-is; row types (`SongRow` through `SongplayRow`) are the projected
//! table rows the sink persists. Every table is an immutable projection:
//! a run recomputes each table in full, nothing is updated in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Raw song-metadata record, one per source file.
#[derive(Debug, Clone, Deserialize)]
pub struct SongRecord {
    #[serde(default)]
    pub song_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist_id: Option<String>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub artist_location: Option<String>,
    #[serde(default)]
    pub artist_latitude: Option<f64>,
    #[serde(default)]
    pub artist_longitude: Option<f64>,
}

/// Raw listening-session log event, one per source line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// The source encodes user ids inconsistently as strings or numbers.
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub page: String,
    /// Event time in epoch milliseconds.
    pub ts: i64,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub session_id: i64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Accept a JSON string or number and normalize it to `Option<String>`.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    })
}

/// A play event: a log record that passed the `page == "NextSong"` filter,
/// annotated with its derived wall-clock timestamp.
#[derive(Debug, Clone)]
pub struct PlayEvent {
    /// Second-truncated UTC timestamp derived from `ts`.
    pub start_time: DateTime<Utc>,
    /// Original epoch-millisecond timestamp.
    pub ts: i64,
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// Row of the `songs` dimension table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongRow {
    pub song_id: String,
    pub title: Option<String>,
    pub artist_id: Option<String>,
    pub year: Option<i64>,
    pub duration: Option<f64>,
}

/// Row of the `artists` dimension table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Row of the `users` dimension table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRow {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
}

/// Row of the `time` dimension table, one per distinct event timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeRow {
    pub start_time: DateTime<Utc>,
    pub hour: u32,
    pub day: u32,
    /// ISO week of year.
    pub week: u32,
    pub month: u32,
    pub year: i32,
    /// Weekday label, e.g. "Friday".
    pub weekday: String,
}

/// Row of the `songplays` fact table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongplayRow {
    /// 1-based rank within the row's (year, month) partition. Not
    /// globally unique: two partitions may reuse the same value.
    pub songplay_id: i64,
    pub start_time: DateTime<Utc>,
    pub user_id: Option<String>,
    pub level: Option<String>,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
    pub year: i32,
    pub month: u32,
}
