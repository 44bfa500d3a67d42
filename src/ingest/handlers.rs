//! Per-file handlers: parse each line, extract rows, load them.

use super::context::FileContext;
use super::error::IngestError;
use super::report::{Entity, FailureStage};
use crate::extract::{
    artist_from_record, dedupe_users, extract_play, song_from_record, LogRecord, PlayRows,
    SongRecord,
};
use crate::warehouse::{EntityLoader, Songplay};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::debug;

/// Loads every record of one file's contents through `loader`.
pub type FileHandler =
    fn(&dyn EntityLoader, &[u8], &mut FileContext<'_>) -> Result<(), IngestError>;

/// Non-blank lines paired with their 1-based line number.
///
/// Lines stay raw bytes: a line that is not valid UTF-8 fails on its own
/// when parsed instead of taking the whole file down.
fn records(contents: &[u8]) -> impl Iterator<Item = (usize, &[u8])> {
    contents
        .split(|byte| *byte == b'\n')
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim_ascii()))
        .filter(|(_, line)| !line.is_empty())
}

fn parse_line<T: DeserializeOwned>(
    ctx: &mut FileContext<'_>,
    line_number: usize,
    line: &[u8],
) -> Result<Option<T>, IngestError> {
    ctx.report_mut().records += 1;
    match serde_json::from_slice(line) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            ctx.fail(Some(line_number), FailureStage::Parse, None, e.to_string())?;
            Ok(None)
        }
    }
}

/// Song-catalog file: one artist row and one song row per record.
///
/// The artist goes first so that, when the feed does mention it, the song's
/// artist reference is already satisfied.
pub fn process_song_file(
    loader: &dyn EntityLoader,
    contents: &[u8],
    ctx: &mut FileContext<'_>,
) -> Result<(), IngestError> {
    for (line_number, line) in records(contents) {
        let Some(record) = parse_line::<SongRecord>(ctx, line_number, line)? else {
            continue;
        };
        let line = Some(line_number);
        ctx.track_write(
            line,
            Entity::Artist,
            loader.load_artist(&artist_from_record(&record)),
        )?;
        ctx.track_write(
            line,
            Entity::Song,
            loader.load_song(&song_from_record(&record)),
        )?;
    }
    Ok(())
}

/// Activity log file: time buckets, then users, then songplays.
///
/// Only song plays are kept. Users are de-duplicated within the file so each
/// one is written once with its latest level. Songplays are resolved against
/// the catalog one by one and appended in a single batch.
pub fn process_log_file(
    loader: &dyn EntityLoader,
    contents: &[u8],
    ctx: &mut FileContext<'_>,
) -> Result<(), IngestError> {
    let mut plays: Vec<(usize, PlayRows)> = Vec::new();
    for (line_number, line) in records(contents) {
        let Some(record) = parse_line::<LogRecord>(ctx, line_number, line)? else {
            continue;
        };
        match extract_play(&record) {
            Ok(Some(rows)) => plays.push((line_number, rows)),
            Ok(None) => ctx.report_mut().filtered += 1,
            Err(e) => ctx.fail(Some(line_number), FailureStage::Extract, None, e.to_string())?,
        }
    }
    debug!("{} song plays in {:?}", plays.len(), ctx.path());

    for (line_number, rows) in &plays {
        ctx.track_write(Some(*line_number), Entity::Time, loader.load_time(&rows.time))?;
    }

    let last_seen: HashMap<i64, usize> = plays
        .iter()
        .map(|(line_number, rows)| (rows.user.user_id, *line_number))
        .collect();
    for user in dedupe_users(plays.iter().map(|(_, rows)| rows.user.clone())) {
        let line = last_seen.get(&user.user_id).copied();
        ctx.track_write(line, Entity::User, loader.load_user(&user))?;
    }

    let mut lines = Vec::with_capacity(plays.len());
    let mut songplays: Vec<Songplay> = Vec::with_capacity(plays.len());
    for (line_number, rows) in plays {
        let resolved = match &rows.event.lookup {
            None => None,
            Some(lookup) => {
                match loader.resolve_song(&lookup.title, &lookup.artist_name, lookup.duration) {
                    Ok(found) => found,
                    // The play is still stored, with its song left unresolved.
                    Err(e) => {
                        ctx.fail_load(Some(line_number), e)?;
                        None
                    }
                }
            }
        };
        if resolved.is_some() {
            ctx.report_mut().resolved += 1;
        }
        lines.push(line_number);
        songplays.push(rows.event.into_songplay(resolved));
    }

    let batch = loader
        .append_songplays(&songplays)
        .map_err(|e| IngestError::FatalLoad {
            file: ctx.path().to_path_buf(),
            source: e,
        })?;
    ctx.report_mut().written.songplays += batch.inserted;
    for (index, error) in batch.failures {
        ctx.fail_load(Some(lines[index]), error)?;
    }
    Ok(())
}
