use super::models::{Artist, Song, SongMatch, Songplay, TimeBucket, User};
use super::trait_def::{BatchOutcome, EntityLoader, LoadError, WriteOutcome};
use rusqlite::{params, Connection, Statement};

const INSERT_SONG: &str = "INSERT INTO songs (song_id, title, artist_id, year, duration) \
     VALUES (?1, ?2, ?3, ?4, ?5) \
     ON CONFLICT(song_id) DO NOTHING";

const INSERT_ARTIST: &str = "INSERT INTO artists (artist_id, name, location, latitude, longitude) \
     VALUES (?1, ?2, ?3, ?4, ?5) \
     ON CONFLICT(artist_id) DO NOTHING";

const UPSERT_USER: &str = "INSERT INTO users (user_id, first_name, last_name, gender, level) \
     VALUES (?1, ?2, ?3, ?4, ?5) \
     ON CONFLICT(user_id) DO UPDATE SET level = excluded.level";

const INSERT_TIME: &str = "INSERT INTO time (start_time, hour, day, week, month, year, weekday) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
     ON CONFLICT(start_time) DO NOTHING";

const INSERT_SONGPLAY: &str = "INSERT INTO songplays \
     (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

// At most two rows are read: a second one makes the match ambiguous.
const SELECT_SONG_MATCH: &str = "SELECT s.song_id, a.artist_id \
     FROM songs s \
     INNER JOIN artists a ON s.artist_id = a.artist_id \
     WHERE s.title = ?1 AND a.name = ?2 AND s.duration = ?3 \
     LIMIT 2";

fn outcome(changed: usize) -> WriteOutcome {
    if changed > 0 {
        WriteOutcome::Written
    } else {
        WriteOutcome::Unchanged
    }
}

/// Runs entity writes on a borrowed connection, normally a file transaction.
pub struct SqliteLoader<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteLoader<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn execute_songplay(stmt: &mut Statement<'_>, songplay: &Songplay) -> rusqlite::Result<()> {
        stmt.execute(params![
            songplay.start_time,
            songplay.user_id,
            songplay.level.as_str(),
            songplay.song_id,
            songplay.artist_id,
            songplay.session_id,
            songplay.location,
            songplay.user_agent,
        ])?;
        Ok(())
    }
}

impl EntityLoader for SqliteLoader<'_> {
    fn load_song(&self, song: &Song) -> Result<WriteOutcome, LoadError> {
        self.conn
            .prepare_cached(INSERT_SONG)
            .and_then(|mut stmt| {
                stmt.execute(params![
                    song.song_id,
                    song.title,
                    song.artist_id,
                    song.year,
                    song.duration
                ])
            })
            .map(outcome)
            .map_err(|e| LoadError::from_sqlite("songs", e))
    }

    fn load_artist(&self, artist: &Artist) -> Result<WriteOutcome, LoadError> {
        self.conn
            .prepare_cached(INSERT_ARTIST)
            .and_then(|mut stmt| {
                stmt.execute(params![
                    artist.artist_id,
                    artist.name,
                    artist.location,
                    artist.latitude,
                    artist.longitude
                ])
            })
            .map(outcome)
            .map_err(|e| LoadError::from_sqlite("artists", e))
    }

    fn load_user(&self, user: &User) -> Result<WriteOutcome, LoadError> {
        let gender = user.gender.map(String::from);
        self.conn
            .prepare_cached(UPSERT_USER)
            .and_then(|mut stmt| {
                stmt.execute(params![
                    user.user_id,
                    user.first_name,
                    user.last_name,
                    gender,
                    user.level.as_str()
                ])
            })
            .map(outcome)
            .map_err(|e| LoadError::from_sqlite("users", e))
    }

    fn load_time(&self, bucket: &TimeBucket) -> Result<WriteOutcome, LoadError> {
        self.conn
            .prepare_cached(INSERT_TIME)
            .and_then(|mut stmt| {
                stmt.execute(params![
                    bucket.start_time,
                    bucket.hour,
                    bucket.day,
                    bucket.week,
                    bucket.month,
                    bucket.year,
                    bucket.weekday
                ])
            })
            .map(outcome)
            .map_err(|e| LoadError::from_sqlite("time", e))
    }

    fn resolve_song(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<SongMatch>, LoadError> {
        let matches = self
            .conn
            .prepare_cached(SELECT_SONG_MATCH)
            .and_then(|mut stmt| {
                let rows = stmt
                    .query_map(params![title, artist_name, duration], |row| {
                        Ok(SongMatch {
                            song_id: row.get(0)?,
                            artist_id: row.get(1)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>();
                rows
            })
            .map_err(|e| LoadError::from_sqlite("songs", e))?;

        let mut matches = matches.into_iter();
        match (matches.next(), matches.next()) {
            (Some(found), None) => Ok(Some(found)),
            _ => Ok(None),
        }
    }

    fn load_songplay(&self, songplay: &Songplay) -> Result<i64, LoadError> {
        let mut stmt = self
            .conn
            .prepare_cached(INSERT_SONGPLAY)
            .map_err(|e| LoadError::from_sqlite("songplays", e))?;
        Self::execute_songplay(&mut stmt, songplay)
            .map_err(|e| LoadError::from_sqlite("songplays", e))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn append_songplays(&self, songplays: &[Songplay]) -> Result<BatchOutcome, LoadError> {
        let mut stmt = self
            .conn
            .prepare_cached(INSERT_SONGPLAY)
            .map_err(|e| LoadError::from_sqlite("songplays", e))?;

        let mut batch = BatchOutcome::default();
        for (index, songplay) in songplays.iter().enumerate() {
            match Self::execute_songplay(&mut stmt, songplay) {
                Ok(()) => batch.inserted += 1,
                Err(e) => {
                    let error = LoadError::from_sqlite("songplays", e);
                    if error.is_fatal() {
                        return Err(error);
                    }
                    batch.failures.push((index, error));
                }
            }
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::models::Level;
    use crate::warehouse::schema::WAREHOUSE_VERSIONED_SCHEMAS;

    fn create_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        WAREHOUSE_VERSIONED_SCHEMAS[0].create(&conn).unwrap();
        conn
    }

    fn song(id: &str, title: &str, artist_id: &str, duration: f64) -> Song {
        Song {
            song_id: id.to_string(),
            title: title.to_string(),
            artist_id: artist_id.to_string(),
            year: 2004,
            duration,
        }
    }

    fn artist(id: &str, name: &str) -> Artist {
        Artist {
            artist_id: id.to_string(),
            name: name.to_string(),
            location: None,
            latitude: None,
            longitude: None,
        }
    }

    fn user(id: i64, first_name: &str, level: Level) -> User {
        User {
            user_id: id,
            first_name: Some(first_name.to_string()),
            last_name: Some("Doe".to_string()),
            gender: Some('F'),
            level,
        }
    }

    fn bucket(start_time: i64) -> TimeBucket {
        TimeBucket {
            start_time,
            hour: 0,
            day: 1,
            week: 1,
            month: 1,
            year: 1970,
            weekday: 3,
        }
    }

    fn songplay(start_time: i64, user_id: i64) -> Songplay {
        Songplay {
            start_time,
            user_id,
            level: Level::Free,
            song_id: None,
            artist_id: None,
            session_id: 139,
            location: Some("Bakersfield, CA".to_string()),
            user_agent: None,
        }
    }

    #[test]
    fn song_is_write_once() {
        let conn = create_conn();
        let loader = SqliteLoader::new(&conn);

        let first = song("S1", "Original", "AR1", 100.0);
        assert_eq!(loader.load_song(&first).unwrap(), WriteOutcome::Written);
        let second = song("S1", "Changed", "AR1", 200.0);
        assert_eq!(loader.load_song(&second).unwrap(), WriteOutcome::Unchanged);

        let title: String = conn
            .query_row("SELECT title FROM songs WHERE song_id = 'S1'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(title, "Original");
    }

    #[test]
    fn artist_is_write_once() {
        let conn = create_conn();
        let loader = SqliteLoader::new(&conn);

        assert_eq!(
            loader.load_artist(&artist("AR1", "First")).unwrap(),
            WriteOutcome::Written
        );
        assert_eq!(
            loader.load_artist(&artist("AR1", "Second")).unwrap(),
            WriteOutcome::Unchanged
        );
        let name: String = conn
            .query_row("SELECT name FROM artists", [], |r| r.get(0))
            .unwrap();
        assert_eq!(name, "First");
    }

    #[test]
    fn user_upsert_only_updates_level() {
        let conn = create_conn();
        let loader = SqliteLoader::new(&conn);

        loader.load_user(&user(7, "Lily", Level::Free)).unwrap();
        loader.load_user(&user(7, "Renamed", Level::Paid)).unwrap();

        let (first_name, level): (String, String) = conn
            .query_row(
                "SELECT first_name, level FROM users WHERE user_id = 7",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(first_name, "Lily");
        assert_eq!(level, "paid");
    }

    #[test]
    fn time_bucket_is_write_once() {
        let conn = create_conn();
        let loader = SqliteLoader::new(&conn);

        assert_eq!(loader.load_time(&bucket(5)).unwrap(), WriteOutcome::Written);
        assert_eq!(loader.load_time(&bucket(5)).unwrap(), WriteOutcome::Unchanged);
    }

    #[test]
    fn resolves_exact_match() {
        let conn = create_conn();
        let loader = SqliteLoader::new(&conn);
        loader.load_artist(&artist("AR1", "Artist X")).unwrap();
        loader.load_song(&song("S1", "Song A", "AR1", 210.5)).unwrap();

        let found = loader.resolve_song("Song A", "Artist X", 210.5).unwrap();
        assert_eq!(
            found,
            Some(SongMatch {
                song_id: "S1".to_string(),
                artist_id: "AR1".to_string()
            })
        );

        assert_eq!(loader.resolve_song("Song A", "Artist X", 210.50001).unwrap(), None);
        assert_eq!(loader.resolve_song("Unknown", "Artist X", 210.5).unwrap(), None);
    }

    #[test]
    fn ambiguous_match_resolves_to_none() {
        let conn = create_conn();
        let loader = SqliteLoader::new(&conn);
        loader.load_artist(&artist("AR1", "Artist X")).unwrap();
        loader.load_song(&song("S1", "Song A", "AR1", 210.5)).unwrap();
        loader.load_song(&song("S2", "Song A", "AR1", 210.5)).unwrap();

        assert_eq!(loader.resolve_song("Song A", "Artist X", 210.5).unwrap(), None);
    }

    #[test]
    fn songplay_hard_references_are_enforced() {
        let conn = create_conn();
        let loader = SqliteLoader::new(&conn);

        let err = loader.load_songplay(&songplay(1, 7)).unwrap_err();
        assert!(matches!(err, LoadError::Constraint { table: "songplays", .. }));
        assert!(!err.is_fatal());

        loader.load_time(&bucket(1)).unwrap();
        loader.load_user(&user(7, "Lily", Level::Free)).unwrap();
        let first_id = loader.load_songplay(&songplay(1, 7)).unwrap();
        let second_id = loader.load_songplay(&songplay(1, 7)).unwrap();
        assert_ne!(first_id, second_id);
    }

    #[test]
    fn append_reports_failed_rows_and_keeps_going() {
        let conn = create_conn();
        let loader = SqliteLoader::new(&conn);
        loader.load_time(&bucket(1)).unwrap();
        loader.load_user(&user(7, "Lily", Level::Free)).unwrap();

        let batch = loader
            .append_songplays(&[songplay(1, 7), songplay(1, 99), songplay(1, 7)])
            .unwrap();
        assert_eq!(batch.inserted, 2);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].0, 1);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM songplays", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }
}
