//! Song catalog extraction.
//!
//! Derives the `songs` and `artists` dimension tables from raw
//! song-metadata records. Records failing a filter rule are silently
//! excluded; that is row-level policy, not a fault.

use crate::error::TransformError;
use crate::model::{ArtistRow, SongRecord, SongRow};

use super::dedup_rows;

/// Non-empty string filter shared by every identifier rule.
fn non_empty(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|s| !s.is_empty())
}

/// Derive the `songs` dimension table.
///
/// Keeps records with a non-empty `song_id`, projects
/// {song_id, title, artist_id, year, duration}, and drops full-row
/// duplicates.
pub fn songs_table(records: &[SongRecord]) -> Result<Vec<SongRow>, TransformError> {
    let rows = records
        .iter()
        .filter_map(|r| {
            let song_id = non_empty(&r.song_id)?.clone();
            Some(SongRow {
                song_id,
                title: r.title.clone(),
                artist_id: r.artist_id.clone(),
                year: r.year,
                duration: r.duration,
            })
        })
        .collect();
    dedup_rows(rows)
}

/// Derive the `artists` dimension table.
///
/// Keeps records with a non-empty `artist_id`, projects+renames the
/// artist_* columns, and drops full-row duplicates.
pub fn artists_table(records: &[SongRecord]) -> Result<Vec<ArtistRow>, TransformError> {
    let rows = records
        .iter()
        .filter_map(|r| {
            let artist_id = non_empty(&r.artist_id)?.clone();
            Some(ArtistRow {
                artist_id,
                name: r.artist_name.clone(),
                location: r.artist_location.clone(),
                latitude: r.artist_latitude,
                longitude: r.artist_longitude,
            })
        })
        .collect();
    dedup_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(song_id: Option<&str>, artist_id: Option<&str>) -> SongRecord {
        SongRecord {
            song_id: song_id.map(String::from),
            title: Some("X".to_string()),
            artist_id: artist_id.map(String::from),
            year: Some(0),
            duration: Some(1.0),
            artist_name: Some("Y".to_string()),
            artist_location: Some("SF".to_string()),
            artist_latitude: Some(37.7),
            artist_longitude: Some(-122.4),
        }
    }

    #[test]
    fn test_songs_drop_missing_and_empty_ids() {
        let records = vec![
            record(Some("SOAAA"), Some("ARAA")),
            record(None, Some("ARAA")),
            record(Some(""), Some("ARAA")),
        ];
        let songs = songs_table(&records).unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].song_id, "SOAAA");
        assert!(songs.iter().all(|s| !s.song_id.is_empty()));
    }

    #[test]
    fn test_artists_projection_renames_columns() {
        let records = vec![record(Some("SOAAA"), Some("ARAA"))];
        let artists = artists_table(&records).unwrap();
        assert_eq!(artists.len(), 1);
        let artist = &artists[0];
        assert_eq!(artist.artist_id, "ARAA");
        assert_eq!(artist.name.as_deref(), Some("Y"));
        assert_eq!(artist.location.as_deref(), Some("SF"));
        assert_eq!(artist.latitude, Some(37.7));
        assert_eq!(artist.longitude, Some(-122.4));
    }

    #[test]
    fn test_duplicate_song_records_collapse() {
        let records = vec![
            record(Some("SOAAA"), Some("ARAA")),
            record(Some("SOAAA"), Some("ARAA")),
        ];
        let songs = songs_table(&records).unwrap();
        assert_eq!(songs.len(), 1);
        // Same duplicate collapse applies to artists
        let artists = artists_table(&records).unwrap();
        assert_eq!(artists.len(), 1);
    }

    #[test]
    fn test_song_rows_with_differing_duration_both_kept() {
        let mut a = record(Some("SOAAA"), Some("ARAA"));
        let mut b = record(Some("SOAAA"), Some("ARAA"));
        a.duration = Some(1.0);
        b.duration = Some(2.0);
        let songs = songs_table(&[a, b]).unwrap();
        assert_eq!(songs.len(), 2);
    }
}
