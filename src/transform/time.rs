//! Time dimension derivation.
//!
//! Expands each distinct event timestamp into its calendar fields. The
//! table has one row per distinct `start_time` observed in the play
//! stream, not one row per calendar second in a range.

use chrono::{Datelike, Timelike};
use std::collections::BTreeMap;

use crate::model::{PlayEvent, TimeRow};

/// Derive the `time` dimension table from the play-event stream.
pub fn time_table(events: &[PlayEvent]) -> Vec<TimeRow> {
    // Keyed by epoch second for distinctness and deterministic output order
    let mut rows: BTreeMap<i64, TimeRow> = BTreeMap::new();
    for event in events {
        rows.entry(event.start_time.timestamp()).or_insert_with(|| {
            let t = event.start_time;
            TimeRow {
                start_time: t,
                hour: t.hour(),
                day: t.day(),
                week: t.iso_week().week(),
                month: t.month(),
                year: t.year(),
                weekday: t.format("%A").to_string(),
            }
        });
    }
    rows.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::events::start_time_from_millis;

    fn event(ts: i64) -> PlayEvent {
        PlayEvent {
            start_time: start_time_from_millis(ts).unwrap(),
            ts,
            user_id: Some("10".to_string()),
            first_name: None,
            last_name: None,
            gender: None,
            level: Some("free".to_string()),
            song: None,
            artist: None,
            session_id: 5,
            location: None,
            user_agent: None,
        }
    }

    #[test]
    fn test_calendar_fields() {
        // 1541121934796 ms -> 2018-11-02 01:25:34 UTC, a Friday in ISO week 44
        let rows = time_table(&[event(1_541_121_934_796)]);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.hour, 1);
        assert_eq!(row.day, 2);
        assert_eq!(row.week, 44);
        assert_eq!(row.month, 11);
        assert_eq!(row.year, 2018);
        assert_eq!(row.weekday, "Friday");
    }

    #[test]
    fn test_one_row_per_distinct_start_time() {
        // Same second with different millis collapses; a new second does not
        let rows = time_table(&[
            event(1_541_121_934_796),
            event(1_541_121_934_100),
            event(1_541_121_935_000),
        ]);
        assert_eq!(rows.len(), 2);
    }
}
