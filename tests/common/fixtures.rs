#![allow(dead_code)]

use super::constants::*;
use serde_json::{json, Value};
use sparkify_etl::warehouse::{Level, SqliteWarehouse};
use sparkify_etl::SourceRoots;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary `song_data` / `log_data` trees.
pub struct TestSources {
    pub dir: TempDir,
    pub roots: SourceRoots,
}

impl TestSources {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let roots = SourceRoots {
            song_data: dir.path().join("song_data"),
            log_data: dir.path().join("log_data"),
        };
        fs::create_dir_all(&roots.song_data).unwrap();
        fs::create_dir_all(&roots.log_data).unwrap();
        Self { dir, roots }
    }

    /// Write `records` as NDJSON to `relative` under the song root.
    pub fn add_song_file(&self, relative: &str, records: &[Value]) -> PathBuf {
        write_ndjson(&self.roots.song_data.join(relative), records)
    }

    /// Write `records` as NDJSON to `relative` under the log root.
    pub fn add_log_file(&self, relative: &str, records: &[Value]) -> PathBuf {
        write_ndjson(&self.roots.log_data.join(relative), records)
    }

    pub fn add_raw_log_file(&self, relative: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.roots.log_data.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }
}

pub fn write_ndjson(path: &Path, records: &[Value]) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let body = records
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    fs::write(path, body).unwrap();
    path.to_path_buf()
}

pub fn song_record(song_id: &str, title: &str, artist_id: &str, artist_name: &str, duration: f64) -> Value {
    json!({
        "num_songs": 1,
        "artist_id": artist_id,
        "artist_latitude": 35.14968,
        "artist_longitude": -90.04892,
        "artist_location": "Memphis, TN",
        "artist_name": artist_name,
        "song_id": song_id,
        "title": title,
        "duration": duration,
        "year": 2004
    })
}

/// The one song of the standard catalog fixture.
pub fn default_song_record() -> Value {
    song_record(SONG_ID, SONG_TITLE, ARTIST_ID, ARTIST_NAME, SONG_DURATION)
}

pub fn play_record(ts: i64, user_id: i64, first_name: &str, level: Level, song: &str) -> Value {
    json!({
        "artist": ARTIST_NAME,
        "auth": "Logged In",
        "firstName": first_name,
        "gender": "F",
        "itemInSession": 0,
        "lastName": "Lopez",
        "length": SONG_DURATION,
        "level": level.as_str(),
        "location": "San Jose-Sunnyvale-Santa Clara, CA",
        "method": "PUT",
        "page": "NextSong",
        "registration": 1540976016796.0,
        "sessionId": SESSION_ID,
        "song": song,
        "status": 200,
        "ts": ts,
        "userAgent": "Mozilla/5.0 (X11; Linux x86_64)",
        "userId": user_id.to_string()
    })
}

pub fn page_record(ts: i64, page: &str) -> Value {
    json!({
        "artist": null,
        "auth": "Logged Out",
        "firstName": null,
        "gender": null,
        "itemInSession": 0,
        "lastName": null,
        "length": null,
        "level": "free",
        "location": null,
        "method": "GET",
        "page": page,
        "registration": null,
        "sessionId": SESSION_ID,
        "song": null,
        "status": 200,
        "ts": ts,
        "userAgent": null,
        "userId": ""
    })
}

pub fn count(warehouse: &SqliteWarehouse, table: &str) -> i64 {
    warehouse
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}
