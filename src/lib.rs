//! Sparkify ETL Library
//!
//! Loads song-catalog and activity-log NDJSON files into a SQLite star schema
//! (songs, artists, users, time, songplays) with idempotent writes.

pub mod config;
pub mod extract;
pub mod ingest;
pub mod sqlite_persistence;
pub mod warehouse;

// Re-export commonly used types for convenience
pub use ingest::{run_pipeline, IngestOptions, LoggingObserver, PipelineReport, SourceRoots};
pub use warehouse::{EntityLoader, SqliteWarehouse};
