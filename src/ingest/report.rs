//! Counters and per-record failures collected while ingesting.

use std::fmt;
use std::path::PathBuf;

/// Where in the per-record pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The file could not be read at all.
    Read,
    /// The line is not a valid record.
    Parse,
    /// The record parsed but a required field is missing or invalid.
    Extract,
    /// The database rejected a write.
    Load,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureStage::Read => "read",
            FailureStage::Parse => "parse",
            FailureStage::Extract => "extract",
            FailureStage::Load => "load",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    pub file: PathBuf,
    /// 1-based line of the record; `None` for file-level failures.
    pub line: Option<usize>,
    pub stage: FailureStage,
    /// Target table, for load failures.
    pub table: Option<&'static str>,
    pub message: String,
}

impl fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        write!(f, " [{}", self.stage)?;
        if let Some(table) = self.table {
            write!(f, " {}", table)?;
        }
        write!(f, "] {}", self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Song,
    Artist,
    User,
    Time,
    Songplay,
}

/// Rows actually written per table (no-op conflicts are not counted).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub songs: usize,
    pub artists: usize,
    pub users: usize,
    pub time: usize,
    pub songplays: usize,
}

impl WriteCounts {
    pub fn increment(&mut self, entity: Entity) {
        match entity {
            Entity::Song => self.songs += 1,
            Entity::Artist => self.artists += 1,
            Entity::User => self.users += 1,
            Entity::Time => self.time += 1,
            Entity::Songplay => self.songplays += 1,
        }
    }

    pub fn add(&mut self, other: &WriteCounts) {
        self.songs += other.songs;
        self.artists += other.artists;
        self.users += other.users;
        self.time += other.time;
        self.songplays += other.songplays;
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileReport {
    pub path: PathBuf,
    /// Non-blank lines seen.
    pub records: usize,
    /// Records dropped on purpose (non-play log events).
    pub filtered: usize,
    pub written: WriteCounts,
    /// Writes that hit an existing key and changed nothing.
    pub unchanged: usize,
    /// Songplays whose song and artist were found in the catalog.
    pub resolved: usize,
    pub failures: Vec<RecordFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 1-based index of the file just processed.
    pub index: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SourceReport {
    pub root: PathBuf,
    pub files_found: usize,
    /// Files whose transaction was committed.
    pub files_committed: usize,
    pub records: usize,
    pub filtered: usize,
    pub written: WriteCounts,
    pub unchanged: usize,
    pub resolved: usize,
    pub failures: Vec<RecordFailure>,
}

impl SourceReport {
    pub fn new(root: PathBuf, files_found: usize) -> Self {
        Self {
            root,
            files_found,
            ..Default::default()
        }
    }

    pub fn absorb(&mut self, file: FileReport) {
        self.records += file.records;
        self.filtered += file.filtered;
        self.written.add(&file.written);
        self.unchanged += file.unchanged;
        self.resolved += file.resolved;
        self.failures.extend(file.failures);
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub songs: SourceReport,
    pub logs: SourceReport,
}

impl PipelineReport {
    pub fn failure_count(&self) -> usize {
        self.songs.failures.len() + self.logs.failures.len()
    }
}
