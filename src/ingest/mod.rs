//! Ingestion driver: discovers record files and loads them one transaction
//! per file.

mod context;
mod discovery;
mod driver;
mod error;
mod handlers;
mod observer;
mod report;

pub use context::FileContext;
pub use discovery::{find_record_files, RECORD_FILE_EXTENSION};
pub use driver::{run, run_pipeline, IngestOptions, SourceRoots};
pub use error::IngestError;
pub use handlers::{process_log_file, process_song_file, FileHandler};
pub use observer::{IngestObserver, LoggingObserver};
pub use report::{
    Entity, FailureStage, FileReport, PipelineReport, Progress, RecordFailure, SourceReport,
    WriteCounts,
};
