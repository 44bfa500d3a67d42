//! SQLite schema of the play-analytics warehouse.
//!
//! Star layout: `songplays` is the fact table, the other four are dimensions.
//! `songplays` hard-references `time` and `users`; its song/artist columns are
//! soft references and carry no constraint. `songs.artist_id` is indexed but
//! not constrained either, since the song feed mentions artists that never
//! appear as artist rows.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};

const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("artist_id", SqlType::Text, is_primary_key = true),
        sqlite_column!("name", SqlType::Text, non_null = true),
        sqlite_column!("location", SqlType::Text),
        sqlite_column!("latitude", SqlType::Real),
        sqlite_column!("longitude", SqlType::Real),
    ],
    indices: &[("idx_artists_name", "name")],
};

const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("song_id", SqlType::Text, is_primary_key = true),
        sqlite_column!("title", SqlType::Text, non_null = true),
        sqlite_column!("artist_id", SqlType::Text, non_null = true),
        sqlite_column!("year", SqlType::Integer, non_null = true),
        sqlite_column!("duration", SqlType::Real, non_null = true),
    ],
    indices: &[
        ("idx_songs_artist_id", "artist_id"),
        ("idx_songs_title", "title"),
    ],
};

const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("user_id", SqlType::Integer, is_primary_key = true),
        sqlite_column!("first_name", SqlType::Text),
        sqlite_column!("last_name", SqlType::Text),
        sqlite_column!("gender", SqlType::Text),
        sqlite_column!("level", SqlType::Text, non_null = true), // 'free', 'paid'
    ],
    indices: &[],
};

const TIME_TABLE: Table = Table {
    name: "time",
    columns: &[
        sqlite_column!("start_time", SqlType::Integer, is_primary_key = true), // epoch ms
        sqlite_column!("hour", SqlType::Integer, non_null = true),
        sqlite_column!("day", SqlType::Integer, non_null = true),
        sqlite_column!("week", SqlType::Integer, non_null = true),
        sqlite_column!("month", SqlType::Integer, non_null = true),
        sqlite_column!("year", SqlType::Integer, non_null = true),
        sqlite_column!("weekday", SqlType::Integer, non_null = true), // Monday = 0
    ],
    indices: &[],
};

const TIME_FK: ForeignKey = ForeignKey {
    foreign_table: "time",
    foreign_column: "start_time",
    on_delete: ForeignKeyOnChange::Restrict,
};

const USERS_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "user_id",
    on_delete: ForeignKeyOnChange::Restrict,
};

const SONGPLAYS_TABLE: Table = Table {
    name: "songplays",
    columns: &[
        sqlite_column!("songplay_id", SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "start_time",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TIME_FK)
        ),
        sqlite_column!(
            "user_id",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USERS_FK)
        ),
        sqlite_column!("level", SqlType::Text, non_null = true),
        sqlite_column!("song_id", SqlType::Text),
        sqlite_column!("artist_id", SqlType::Text),
        sqlite_column!("session_id", SqlType::Integer, non_null = true),
        sqlite_column!("location", SqlType::Text),
        sqlite_column!("user_agent", SqlType::Text),
    ],
    indices: &[
        ("idx_songplays_start_time", "start_time"),
        ("idx_songplays_user_id", "user_id"),
    ],
};

pub const WAREHOUSE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        ARTISTS_TABLE,
        SONGS_TABLE,
        USERS_TABLE,
        TIME_TABLE,
        SONGPLAYS_TABLE,
    ],
}];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{params, Connection};

    fn create_schema() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        WAREHOUSE_VERSIONED_SCHEMAS[0].create(&conn).unwrap();
        conn
    }

    #[test]
    fn test_schema_creates_successfully() {
        let conn = create_schema();
        WAREHOUSE_VERSIONED_SCHEMAS[0].validate(&conn).unwrap();
    }

    #[test]
    fn song_without_artist_row_is_accepted() {
        let conn = create_schema();
        conn.execute(
            "INSERT INTO songs VALUES ('S1', 'Song', 'AR_MISSING', 2001, 201.5)",
            params![],
        )
        .unwrap();
    }

    #[test]
    fn songplay_requires_time_and_user() {
        let conn = create_schema();
        let orphan = conn.execute(
            "INSERT INTO songplays (start_time, user_id, level, session_id) VALUES (1, 7, 'free', 3)",
            params![],
        );
        assert!(orphan.is_err());

        conn.execute(
            "INSERT INTO time VALUES (1, 0, 1, 1, 1, 1970, 3)",
            params![],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO users VALUES (7, 'Ada', 'Byron', 'F', 'free')",
            params![],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO songplays (start_time, user_id, level, session_id) VALUES (1, 7, 'free', 3)",
            params![],
        )
        .unwrap();
    }
}
