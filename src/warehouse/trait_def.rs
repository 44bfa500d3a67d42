//! EntityLoader trait definition.
//!
//! One write operation per warehouse entity, each with its own conflict
//! policy, plus the catalog lookup used to fill a songplay's soft references.

use super::models::{Artist, Song, SongMatch, Songplay, TimeBucket, User};
use rusqlite::ErrorCode;
use thiserror::Error;

/// Whether a write changed the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The key already existed and the conflict policy was a no-op.
    Unchanged,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("constraint violation on {table}: {source}")]
    Constraint {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database error on {table}: {source}")]
    Database {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl LoadError {
    pub fn from_sqlite(table: &'static str, source: rusqlite::Error) -> Self {
        match source.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => LoadError::Constraint { table, source },
            _ => LoadError::Database { table, source },
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            LoadError::Constraint { table, .. } | LoadError::Database { table, .. } => table,
        }
    }

    /// True when the failure concerns the session rather than the row being
    /// written, meaning later writes on the same connection will fail as well.
    pub fn is_fatal(&self) -> bool {
        let LoadError::Database { source, .. } = self else {
            return false;
        };
        matches!(
            source.sqlite_error_code(),
            Some(
                ErrorCode::CannotOpen
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::NotADatabase
                    | ErrorCode::DiskFull
                    | ErrorCode::ReadOnly
                    | ErrorCode::PermissionDenied
            )
        )
    }
}

/// Outcome of a bulk songplay append. Rows are attempted independently.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub inserted: usize,
    /// Index into the appended slice, with the failure for that row.
    pub failures: Vec<(usize, LoadError)>,
}

pub trait EntityLoader {
    /// Insert a song; an existing `song_id` is left untouched.
    fn load_song(&self, song: &Song) -> Result<WriteOutcome, LoadError>;

    /// Insert an artist; an existing `artist_id` is left untouched.
    fn load_artist(&self, artist: &Artist) -> Result<WriteOutcome, LoadError>;

    /// Insert a user, or overwrite only the subscription level of an existing one.
    fn load_user(&self, user: &User) -> Result<WriteOutcome, LoadError>;

    /// Insert a time bucket; an existing `start_time` is left untouched.
    fn load_time(&self, bucket: &TimeBucket) -> Result<WriteOutcome, LoadError>;

    /// Find the song and artist ids for a play.
    ///
    /// Matches on exact title, exact artist name and exact duration. The
    /// duration comparison is floating-point equality, so a duration that went
    /// through any lossy formatting upstream will not match. Returns `None`
    /// when nothing or more than one song matches.
    fn resolve_song(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<SongMatch>, LoadError>;

    /// Insert a songplay, returning its generated `songplay_id`.
    fn load_songplay(&self, songplay: &Songplay) -> Result<i64, LoadError>;

    /// Append many songplays. Failed rows are reported and do not stop the
    /// rest; only a session-level failure ends the batch early.
    fn append_songplays(&self, songplays: &[Songplay]) -> Result<BatchOutcome, LoadError>;
}
