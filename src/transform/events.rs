//! Event log extraction.
//!
//! Filters the raw log stream down to play events, derives the
//! second-truncated wall-clock timestamp, and builds the `users`
//! dimension table.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::config::UserReduction;
use crate::error::{TimestampRangeSnafu, TransformError};
use crate::model::{LogRecord, PlayEvent, UserRow};

use super::dedup_rows;

/// The page value that marks a listening event.
const PLAY_PAGE: &str = "NextSong";

/// Convert an epoch-millisecond timestamp to a UTC wall-clock timestamp
/// with second precision. The sub-second component is truncated, not
/// rounded.
pub fn start_time_from_millis(ts: i64) -> Result<DateTime<Utc>, TransformError> {
    let secs = ts / 1000;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| TimestampRangeSnafu { ts }.build())
}

/// Filter the raw log stream to play events and annotate each with its
/// derived `start_time`.
pub fn play_events(records: Vec<LogRecord>) -> Result<Vec<PlayEvent>, TransformError> {
    records
        .into_iter()
        .filter(|r| r.page == PLAY_PAGE)
        .map(|r| {
            Ok(PlayEvent {
                start_time: start_time_from_millis(r.ts)?,
                ts: r.ts,
                user_id: r.user_id,
                first_name: r.first_name,
                last_name: r.last_name,
                gender: r.gender,
                level: r.level,
                song: r.song,
                artist: r.artist,
                session_id: r.session_id,
                location: r.location,
                user_agent: r.user_agent,
            })
        })
        .collect()
}

/// Derive the `users` dimension table from the play-event stream.
///
/// Keeps events with a non-empty user id and reduces rows according to
/// the configured strategy.
pub fn users_table(
    events: &[PlayEvent],
    reduction: UserReduction,
) -> Result<Vec<UserRow>, TransformError> {
    let rows = events.iter().filter_map(|e| {
        let user_id = e.user_id.as_ref().filter(|s| !s.is_empty())?.clone();
        Some((
            e.ts,
            UserRow {
                user_id,
                first_name: e.first_name.clone(),
                last_name: e.last_name.clone(),
                gender: e.gender.clone(),
                level: e.level.clone(),
            },
        ))
    });

    match reduction {
        UserReduction::DistinctRows => dedup_rows(rows.map(|(_, row)| row).collect()),
        UserReduction::LatestLevel => {
            let mut latest: HashMap<String, (i64, UserRow)> = HashMap::new();
            for (ts, row) in rows {
                match latest.get(&row.user_id) {
                    Some((seen_ts, _)) if *seen_ts >= ts => {}
                    _ => {
                        latest.insert(row.user_id.clone(), (ts, row));
                    }
                }
            }
            let mut out: Vec<UserRow> = latest.into_values().map(|(_, row)| row).collect();
            out.sort_unstable_by(|a, b| a.user_id.cmp(&b.user_id));
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(page: &str, user_id: Option<&str>, level: &str, ts: i64) -> LogRecord {
        LogRecord {
            user_id: user_id.map(String::from),
            first_name: Some("Sylvie".to_string()),
            last_name: Some("Cruz".to_string()),
            gender: Some("F".to_string()),
            level: Some(level.to_string()),
            page: page.to_string(),
            ts,
            song: Some("X".to_string()),
            artist: Some("Y".to_string()),
            session_id: 5,
            location: None,
            user_agent: None,
        }
    }

    #[test]
    fn test_only_next_song_pages_survive() {
        let records = vec![
            log("NextSong", Some("10"), "free", 1_541_121_934_796),
            log("Home", Some("10"), "free", 1_541_121_935_000),
            log("Login", Some("11"), "paid", 1_541_121_936_000),
        ];
        let events = play_events(records).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id.as_deref(), Some("10"));
    }

    #[test]
    fn test_start_time_truncates_sub_second() {
        let start = start_time_from_millis(1_541_121_934_796).unwrap();
        assert_eq!(start.timestamp(), 1_541_121_934);
        // Round-trips to ts // 1000 regardless of the dropped millis
        assert_eq!(start.timestamp(), 1_541_121_934_796 / 1000);
    }

    #[test]
    fn test_users_distinct_rows_keeps_level_transitions() {
        let records = vec![
            log("NextSong", Some("10"), "free", 1),
            log("NextSong", Some("10"), "free", 2),
            log("NextSong", Some("10"), "paid", 3),
        ];
        let events = play_events(records).unwrap();
        let users = users_table(&events, UserReduction::DistinctRows).unwrap();
        // One row per observed (user, level) state
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.user_id == "10"));
    }

    #[test]
    fn test_users_latest_level_keeps_one_row_per_user() {
        let records = vec![
            log("NextSong", Some("10"), "free", 1),
            log("NextSong", Some("10"), "paid", 3),
            log("NextSong", Some("10"), "free", 2),
            log("NextSong", Some("11"), "free", 9),
        ];
        let events = play_events(records).unwrap();
        let users = users_table(&events, UserReduction::LatestLevel).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].user_id, "10");
        // Row comes from the greatest ts, not the last observed
        assert_eq!(users[0].level.as_deref(), Some("paid"));
    }

    #[test]
    fn test_empty_user_ids_are_dropped() {
        let records = vec![
            log("NextSong", Some(""), "free", 1),
            log("NextSong", None, "free", 2),
            log("NextSong", Some("10"), "free", 3),
        ];
        let events = play_events(records).unwrap();
        let users = users_table(&events, UserReduction::DistinctRows).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].user_id, "10");
    }
}
