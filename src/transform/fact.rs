//! Fact table assembly.
//!
//! Joins the cleaned play-event stream against the song catalog and
//! assigns partition-scoped surrogate keys.
//!
//! The join predicate is deliberately pluggable: the source data only
//! carries denormalized text keys (song title, artist name), which is a
//! known fragility. Swapping in an identifier-based matcher later must
//! not touch the surrounding assembly logic.

use chrono::Datelike;
use std::collections::HashMap;

use crate::model::{PlayEvent, SongRecord, SongplayRow};

/// Catalog columns resolved by a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
}

/// Strategy for resolving a play event against the song catalog.
pub trait CatalogMatcher {
    /// Find the catalog entry this event refers to, if any.
    fn lookup(&self, event: &PlayEvent) -> Option<&CatalogEntry>;
}

/// The shipped matcher: exact string equality on (title, artist name).
///
/// Built from raw catalog records prior to dimension-table projection, so
/// the denormalized artist name is still available. When two catalog rows
/// share a key the first observed row wins; there is no disambiguation
/// beyond exact equality.
pub struct TitleArtistIndex {
    index: HashMap<(String, String), CatalogEntry>,
}

impl TitleArtistIndex {
    /// Index the raw song catalog by (title, artist_name).
    pub fn build(records: &[SongRecord]) -> Self {
        let mut index = HashMap::new();
        for record in records {
            let (Some(title), Some(artist_name)) = (&record.title, &record.artist_name) else {
                continue;
            };
            index
                .entry((title.clone(), artist_name.clone()))
                .or_insert_with(|| CatalogEntry {
                    song_id: record.song_id.clone(),
                    artist_id: record.artist_id.clone(),
                });
        }
        Self { index }
    }

    /// Number of distinct (title, artist name) keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl CatalogMatcher for TitleArtistIndex {
    fn lookup(&self, event: &PlayEvent) -> Option<&CatalogEntry> {
        let (Some(song), Some(artist)) = (&event.song, &event.artist) else {
            return None;
        };
        self.index.get(&(song.clone(), artist.clone()))
    }
}

/// Assemble the `songplays` fact table.
///
/// Left outer join: every play event produces exactly one fact row, with
/// null `song_id`/`artist_id` when the catalog has no match.
///
/// `songplay_id` is a 1-based rank within each (year, month) partition,
/// ordered by start_time descending then user_id descending. Ranking per
/// partition is what permits parallel, non-globally-coordinated key
/// assignment; the id is NOT unique across partitions.
pub fn songplays_table(events: &[PlayEvent], matcher: &impl CatalogMatcher) -> Vec<SongplayRow> {
    // Bucket rows by partition key first; rank orders are per-partition.
    let mut partitions: HashMap<(i32, u32), Vec<SongplayRow>> = HashMap::new();

    for event in events {
        let matched = matcher.lookup(event);
        let row = SongplayRow {
            songplay_id: 0, // assigned after the partition sort
            start_time: event.start_time,
            user_id: event.user_id.clone(),
            level: event.level.clone(),
            song_id: matched.and_then(|m| m.song_id.clone()),
            artist_id: matched.and_then(|m| m.artist_id.clone()),
            session_id: event.session_id,
            location: event.location.clone(),
            user_agent: event.user_agent.clone(),
            year: event.start_time.year(),
            month: event.start_time.month(),
        };
        partitions.entry((row.year, row.month)).or_default().push(row);
    }

    let mut keys: Vec<_> = partitions.keys().copied().collect();
    keys.sort_unstable();

    let mut out = Vec::with_capacity(events.len());
    for key in keys {
        let mut rows = partitions.remove(&key).unwrap_or_default();
        // start_time desc, then user_id desc; absent user ids sort last.
        // The sort is stable, so remaining ties keep input order.
        rows.sort_by(|a, b| {
            b.start_time
                .cmp(&a.start_time)
                .then_with(|| b.user_id.cmp(&a.user_id))
        });
        for (rank, row) in rows.iter_mut().enumerate() {
            row.songplay_id = rank as i64 + 1;
        }
        out.extend(rows);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogRecord;
    use crate::transform::events::play_events;
    use std::collections::HashSet;

    fn catalog_record() -> SongRecord {
        SongRecord {
            song_id: Some("SOAAA".to_string()),
            title: Some("X".to_string()),
            artist_id: Some("ARAA".to_string()),
            year: Some(0),
            duration: Some(1.0),
            artist_name: Some("Y".to_string()),
            artist_location: None,
            artist_latitude: None,
            artist_longitude: None,
        }
    }

    fn play(user_id: &str, song: Option<&str>, artist: Option<&str>, ts: i64) -> PlayEvent {
        let record = LogRecord {
            user_id: Some(user_id.to_string()),
            first_name: None,
            last_name: None,
            gender: None,
            level: Some("free".to_string()),
            page: "NextSong".to_string(),
            ts,
            song: song.map(String::from),
            artist: artist.map(String::from),
            session_id: 5,
            location: None,
            user_agent: None,
        };
        play_events(vec![record]).unwrap().remove(0)
    }

    #[test]
    fn test_matched_event_resolves_catalog_ids() {
        let index = TitleArtistIndex::build(&[catalog_record()]);
        let events = vec![play("10", Some("X"), Some("Y"), 1_541_121_934_796)];
        let rows = songplays_table(&events, &index);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.song_id.as_deref(), Some("SOAAA"));
        assert_eq!(row.artist_id.as_deref(), Some("ARAA"));
        assert_eq!(row.user_id.as_deref(), Some("10"));
        assert_eq!(row.start_time.timestamp(), 1_541_121_934);
        assert_eq!((row.year, row.month), (2018, 11));
        assert_eq!(row.songplay_id, 1);
    }

    #[test]
    fn test_left_outer_join_keeps_unmatched_events() {
        let index = TitleArtistIndex::build(&[catalog_record()]);
        let events = vec![
            play("10", Some("X"), Some("Y"), 1_541_121_934_796),
            play("11", Some("No Match"), Some("Nobody"), 1_541_121_935_000),
            play("12", None, None, 1_541_121_936_000),
        ];
        let rows = songplays_table(&events, &index);

        // Row count equals play-event count regardless of match rate
        assert_eq!(rows.len(), events.len());
        assert_eq!(rows.iter().filter(|r| r.song_id.is_none()).count(), 2);
    }

    #[test]
    fn test_rank_is_unique_within_partition_only() {
        let index = TitleArtistIndex::build(&[]);
        // Two events in 2018-11, one in 2018-12
        let events = vec![
            play("10", None, None, 1_541_121_934_796),
            play("11", None, None, 1_541_121_935_000),
            play("12", None, None, 1_543_800_000_000),
        ];
        let rows = songplays_table(&events, &index);

        for (year, month) in [(2018, 11), (2018, 12)] {
            let ids: Vec<i64> = rows
                .iter()
                .filter(|r| (r.year, r.month) == (year, month))
                .map(|r| r.songplay_id)
                .collect();
            let distinct: HashSet<i64> = ids.iter().copied().collect();
            assert_eq!(ids.len(), distinct.len());
        }
        // Ids repeat across partitions: both partitions start at 1
        assert_eq!(
            rows.iter().filter(|r| r.songplay_id == 1).count(),
            2
        );
    }

    #[test]
    fn test_rank_order_desc_by_start_time_then_user_id() {
        let index = TitleArtistIndex::build(&[]);
        let events = vec![
            play("10", None, None, 1_541_121_934_000),
            play("20", None, None, 1_541_121_935_000),
            play("30", None, None, 1_541_121_935_000),
        ];
        let rows = songplays_table(&events, &index);

        // Latest timestamp first; equal timestamps break by user_id desc
        assert_eq!(rows[0].user_id.as_deref(), Some("30"));
        assert_eq!(rows[0].songplay_id, 1);
        assert_eq!(rows[1].user_id.as_deref(), Some("20"));
        assert_eq!(rows[1].songplay_id, 2);
        assert_eq!(rows[2].user_id.as_deref(), Some("10"));
        assert_eq!(rows[2].songplay_id, 3);
    }

    #[test]
    fn test_ambiguous_catalog_key_first_row_wins() {
        let mut second = catalog_record();
        second.song_id = Some("SOBBB".to_string());
        let index = TitleArtistIndex::build(&[catalog_record(), second]);
        assert_eq!(index.len(), 1);

        let events = vec![play("10", Some("X"), Some("Y"), 1_541_121_934_796)];
        let rows = songplays_table(&events, &index);
        assert_eq!(rows[0].song_id.as_deref(), Some("SOAAA"));
    }
}
