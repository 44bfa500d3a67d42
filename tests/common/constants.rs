#![allow(dead_code)]

pub const SONG_ID: &str = "SOUDSGM12AC9618304";
pub const SONG_TITLE: &str = "Song A";
pub const SONG_DURATION: f64 = 210.5;
pub const ARTIST_ID: &str = "ARNTLGG11E2835DDB9";
pub const ARTIST_NAME: &str = "Artist X";

pub const SESSION_ID: i64 = 583;
pub const TS_1: i64 = 1541990217796;
pub const TS_2: i64 = 1541990258796;
pub const TS_3: i64 = 1541990264796;
