//! Projection of raw records onto warehouse rows.
//!
//! Pure functions: nothing here touches the database. Log records are
//! filtered to song plays before any field is required.

mod records;

pub use records::{LogRecord, RawUserId, SongRecord};

use crate::warehouse::{Artist, Level, Song, SongMatch, Songplay, TimeBucket, User};
use chrono::{DateTime, Datelike, Timelike};
use std::collections::HashMap;
use thiserror::Error;

/// `page` value of a log record describing a song play.
pub const NEXT_SONG_PAGE: &str = "NextSong";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("timestamp {0} ms is out of range")]
    TimestampOutOfRange(i64),
}

pub fn song_from_record(record: &SongRecord) -> Song {
    Song {
        song_id: record.song_id.clone(),
        title: record.title.clone(),
        artist_id: record.artist_id.clone(),
        year: record.year,
        duration: record.duration,
    }
}

pub fn artist_from_record(record: &SongRecord) -> Artist {
    Artist {
        artist_id: record.artist_id.clone(),
        name: record.artist_name.clone(),
        location: record.artist_location.clone(),
        latitude: record.artist_latitude,
        longitude: record.artist_longitude,
    }
}

/// Break an epoch-millisecond timestamp down in UTC.
///
/// Week is the ISO 8601 week and weekday counts from Monday = 0, so both use
/// the same Monday-first convention. Year is the calendar year, not the ISO
/// week-year.
pub fn time_bucket_from_millis(start_time: i64) -> Result<TimeBucket, ExtractError> {
    let at = DateTime::from_timestamp_millis(start_time)
        .ok_or(ExtractError::TimestampOutOfRange(start_time))?;
    Ok(TimeBucket {
        start_time,
        hour: at.hour(),
        day: at.day(),
        week: at.iso_week().week(),
        month: at.month(),
        year: at.year(),
        weekday: at.weekday().num_days_from_monday(),
    })
}

pub fn is_song_play(record: &LogRecord) -> bool {
    record.page.as_deref() == Some(NEXT_SONG_PAGE)
}

/// Keys used to find the played song in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SongLookup {
    pub title: String,
    pub artist_name: String,
    pub duration: f64,
}

/// A song play whose song/artist references are not resolved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayEvent {
    pub start_time: i64,
    pub user_id: i64,
    pub level: Level,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
    /// `None` when the record lacks song, artist or length.
    pub lookup: Option<SongLookup>,
}

impl PlayEvent {
    pub fn into_songplay(self, resolved: Option<SongMatch>) -> Songplay {
        let (song_id, artist_id) = match resolved {
            Some(found) => (Some(found.song_id), Some(found.artist_id)),
            None => (None, None),
        };
        Songplay {
            start_time: self.start_time,
            user_id: self.user_id,
            level: self.level,
            song_id,
            artist_id,
            session_id: self.session_id,
            location: self.location,
            user_agent: self.user_agent,
        }
    }
}

/// Everything one song-play record contributes to the warehouse.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRows {
    pub time: TimeBucket,
    pub user: User,
    pub event: PlayEvent,
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ExtractError> {
    value.ok_or(ExtractError::MissingField(field))
}

fn parse_user_id(raw: Option<&RawUserId>) -> Result<i64, ExtractError> {
    match raw {
        None => Err(ExtractError::MissingField("userId")),
        Some(RawUserId::Number(id)) => Ok(*id),
        Some(RawUserId::Text(text)) if text.trim().is_empty() => {
            Err(ExtractError::MissingField("userId"))
        }
        Some(RawUserId::Text(text)) => {
            text.trim()
                .parse()
                .map_err(|_| ExtractError::InvalidField {
                    field: "userId",
                    reason: format!("'{}' is not an integer", text),
                })
        }
    }
}

fn parse_gender(raw: Option<&str>) -> Result<Option<char>, ExtractError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Ok(None),
        (Some(c), None) => Ok(Some(c)),
        _ => Err(ExtractError::InvalidField {
            field: "gender",
            reason: format!("'{}' is not a single character", raw),
        }),
    }
}

/// Project a log record onto time, user and play rows.
///
/// Returns `Ok(None)` for records that are not song plays; those are dropped
/// on purpose and never count as errors.
pub fn extract_play(record: &LogRecord) -> Result<Option<PlayRows>, ExtractError> {
    if !is_song_play(record) {
        return Ok(None);
    }

    let start_time = required(record.ts, "ts")?;
    let time = time_bucket_from_millis(start_time)?;
    let user_id = parse_user_id(record.user_id.as_ref())?;
    let level: Level = required(record.level.as_deref(), "level")?
        .parse()
        .map_err(|reason| ExtractError::InvalidField {
            field: "level",
            reason,
        })?;
    let session_id = required(record.session_id, "sessionId")?;

    let user = User {
        user_id,
        first_name: record.first_name.clone(),
        last_name: record.last_name.clone(),
        gender: parse_gender(record.gender.as_deref())?,
        level,
    };

    let lookup = match (&record.song, &record.artist, record.length) {
        (Some(title), Some(artist_name), Some(duration)) => Some(SongLookup {
            title: title.clone(),
            artist_name: artist_name.clone(),
            duration,
        }),
        _ => None,
    };

    let event = PlayEvent {
        start_time,
        user_id,
        level,
        session_id,
        location: record.location.clone(),
        user_agent: record.user_agent.clone(),
        lookup,
    };

    Ok(Some(PlayRows { time, user, event }))
}

/// Keep one user row per `user_id`.
///
/// The last sighting in the batch wins, placed where the id was first seen.
pub fn dedupe_users<I: IntoIterator<Item = User>>(users: I) -> Vec<User> {
    let mut positions: HashMap<i64, usize> = HashMap::new();
    let mut out: Vec<User> = Vec::new();
    for user in users {
        match positions.get(&user.user_id) {
            Some(&position) => out[position] = user,
            None => {
                positions.insert(user.user_id, out.len());
                out.push(user);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play_record() -> LogRecord {
        LogRecord {
            page: Some("NextSong".to_string()),
            ts: Some(1541990258796),
            user_id: Some(RawUserId::Text("7".to_string())),
            first_name: Some("Adelyn".to_string()),
            last_name: Some("Jordan".to_string()),
            gender: Some("F".to_string()),
            level: Some("free".to_string()),
            song: Some("Song A".to_string()),
            artist: Some("Artist X".to_string()),
            length: Some(210.5),
            session_id: Some(259),
            location: Some("Chicago-Naperville-Elgin, IL-IN-WI".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        }
    }

    #[test]
    fn derives_time_bucket() {
        let bucket = time_bucket_from_millis(1541990258796).unwrap();
        assert_eq!(
            bucket,
            TimeBucket {
                start_time: 1541990258796,
                hour: 2,
                day: 12,
                week: 46,
                month: 11,
                year: 2018,
                weekday: 0,
            }
        );
        assert_eq!(time_bucket_from_millis(1541990258796).unwrap(), bucket);
    }

    #[test]
    fn time_bucket_at_epoch() {
        let bucket = time_bucket_from_millis(0).unwrap();
        assert_eq!((bucket.year, bucket.month, bucket.day), (1970, 1, 1));
        // 1970-01-01 was a Thursday.
        assert_eq!(bucket.weekday, 3);
        assert_eq!(bucket.week, 1);
    }

    #[test]
    fn iso_week_can_belong_to_previous_year() {
        // 2021-01-01 (Friday) is in ISO week 53 of 2020.
        let bucket = time_bucket_from_millis(1609459200000).unwrap();
        assert_eq!((bucket.year, bucket.week, bucket.weekday), (2021, 53, 4));
    }

    #[test]
    fn rejects_out_of_range_timestamp() {
        assert_eq!(
            time_bucket_from_millis(i64::MAX),
            Err(ExtractError::TimestampOutOfRange(i64::MAX))
        );
    }

    #[test]
    fn projects_song_record() {
        let record = SongRecord {
            song_id: "S1".to_string(),
            title: "Song A".to_string(),
            artist_id: "AR1".to_string(),
            year: 1999,
            duration: 210.5,
            artist_name: "Artist X".to_string(),
            artist_location: None,
            artist_latitude: Some(1.5),
            artist_longitude: None,
        };
        let song = song_from_record(&record);
        let artist = artist_from_record(&record);
        assert_eq!(song.artist_id, artist.artist_id);
        assert_eq!(song.duration, 210.5);
        assert_eq!(artist.name, "Artist X");
        assert_eq!(artist.latitude, Some(1.5));
    }

    #[test]
    fn non_play_records_are_filtered() {
        let record = LogRecord {
            page: Some("Home".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_play(&record), Ok(None));
        assert_eq!(extract_play(&LogRecord::default()), Ok(None));
    }

    #[test]
    fn extracts_play_rows() {
        let rows = extract_play(&play_record()).unwrap().unwrap();
        assert_eq!(rows.time.start_time, 1541990258796);
        assert_eq!(rows.user.user_id, 7);
        assert_eq!(rows.user.gender, Some('F'));
        assert_eq!(rows.user.level, Level::Free);
        assert_eq!(rows.event.session_id, 259);
        assert_eq!(
            rows.event.lookup,
            Some(SongLookup {
                title: "Song A".to_string(),
                artist_name: "Artist X".to_string(),
                duration: 210.5,
            })
        );
    }

    #[test]
    fn play_without_song_has_no_lookup() {
        let record = LogRecord {
            song: None,
            ..play_record()
        };
        let rows = extract_play(&record).unwrap().unwrap();
        assert_eq!(rows.event.lookup, None);
    }

    #[test]
    fn malformed_play_records_are_errors() {
        let record = LogRecord {
            user_id: Some(RawUserId::Text(String::new())),
            ..play_record()
        };
        assert_eq!(
            extract_play(&record),
            Err(ExtractError::MissingField("userId"))
        );

        let record = LogRecord {
            level: Some("gold".to_string()),
            ..play_record()
        };
        assert!(matches!(
            extract_play(&record),
            Err(ExtractError::InvalidField { field: "level", .. })
        ));

        let record = LogRecord {
            ts: None,
            ..play_record()
        };
        assert_eq!(extract_play(&record), Err(ExtractError::MissingField("ts")));
    }

    #[test]
    fn numeric_user_id_is_accepted() {
        let record = LogRecord {
            user_id: Some(RawUserId::Number(42)),
            ..play_record()
        };
        assert_eq!(extract_play(&record).unwrap().unwrap().user.user_id, 42);
    }

    #[test]
    fn songplay_carries_resolution() {
        let event = extract_play(&play_record()).unwrap().unwrap().event;
        let unresolved = event.clone().into_songplay(None);
        assert_eq!((unresolved.song_id, unresolved.artist_id), (None, None));

        let resolved = event.into_songplay(Some(SongMatch {
            song_id: "S1".to_string(),
            artist_id: "AR1".to_string(),
        }));
        assert_eq!(resolved.song_id.as_deref(), Some("S1"));
        assert_eq!(resolved.artist_id.as_deref(), Some("AR1"));
    }

    #[test]
    fn dedupe_keeps_last_sighting() {
        let user = |id: i64, level: Level| User {
            user_id: id,
            first_name: Some("A".to_string()),
            last_name: None,
            gender: None,
            level,
        };
        let users = dedupe_users(vec![
            user(7, Level::Free),
            user(8, Level::Free),
            user(7, Level::Paid),
        ]);
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].user_id, 7);
        assert_eq!(users[0].level, Level::Paid);
        assert_eq!(users[1].user_id, 8);
    }
}
