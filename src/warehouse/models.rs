//! Typed rows of the warehouse tables.

use std::fmt;
use std::str::FromStr;

/// A playable item from the song catalog (`songs` table).
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub song_id: String,
    pub title: String,
    /// Relaxed reference: the artist may not be present in `artists`.
    pub artist_id: String,
    pub year: i32,
    pub duration: f64,
}

/// A song creator (`artists` table).
#[derive(Debug, Clone, PartialEq)]
pub struct Artist {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Free,
    Paid,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Free => "free",
            Level::Paid => "paid",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Level::Free),
            "paid" => Ok(Level::Paid),
            other => Err(format!("unknown subscription level '{}'", other)),
        }
    }
}

/// A listener (`users` table). Only `level` changes after the first load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<char>,
    pub level: Level,
}

/// Calendar breakdown of a play timestamp (`time` table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeBucket {
    /// Epoch milliseconds, UTC.
    pub start_time: i64,
    pub hour: u32,
    pub day: u32,
    /// ISO 8601 week number.
    pub week: u32,
    pub month: u32,
    pub year: i32,
    /// Days since Monday (Monday = 0).
    pub weekday: u32,
}

/// One play event (`songplays` table) before it receives its surrogate id.
#[derive(Debug, Clone, PartialEq)]
pub struct Songplay {
    pub start_time: i64,
    pub user_id: i64,
    pub level: Level,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// Result of looking up a played song in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongMatch {
    pub song_id: String,
    pub artist_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub songs: usize,
    pub artists: usize,
    pub users: usize,
    pub time: usize,
    pub songplays: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels() {
        assert_eq!("free".parse::<Level>(), Ok(Level::Free));
        assert_eq!("paid".parse::<Level>(), Ok(Level::Paid));
        assert!("Paid".parse::<Level>().is_err());
        assert_eq!(Level::Paid.to_string(), "paid");
    }
}
