use crate::warehouse::LoadError;
use std::path::PathBuf;
use thiserror::Error;

/// Conditions that stop an ingestion run.
///
/// Per-record problems are not errors: they are collected as
/// `RecordFailure`s and the run goes on, unless the run was configured to
/// stop on the first one.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Source directory {0:?} does not exist")]
    MissingSource(PathBuf),

    #[error("Stopped on first failure: {0}")]
    Aborted(String),

    #[error("Database failure while loading {file:?}: {source}")]
    FatalLoad {
        file: PathBuf,
        #[source]
        source: LoadError,
    },
}
