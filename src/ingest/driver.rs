//! Source-level ingestion loop.
//!
//! One file at a time, one transaction per file. Record-level failures are
//! collected and the loop moves on; anything that breaks the session (begin
//! or commit failing, fatal database errors) ends the run.

use super::context::FileContext;
use super::discovery::find_record_files;
use super::handlers::{process_log_file, process_song_file, FileHandler};
use super::observer::IngestObserver;
use super::report::{FailureStage, PipelineReport, Progress, SourceReport};
use crate::warehouse::SqliteWarehouse;
use anyhow::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Keep going after a record fails. When false, the first failure stops
    /// the run and the file being processed is rolled back.
    pub continue_on_error: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            continue_on_error: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceRoots {
    pub song_data: PathBuf,
    pub log_data: PathBuf,
}

/// Ingest every record file under `root` with `handler`.
pub fn run(
    warehouse: &mut SqliteWarehouse,
    root: &Path,
    handler: FileHandler,
    options: &IngestOptions,
    observer: &mut dyn IngestObserver,
) -> Result<SourceReport> {
    let files = find_record_files(root)?;
    let total = files.len();
    let mut report = SourceReport::new(root.to_path_buf(), total);
    observer.on_source_started(root, total);

    for (index, path) in files.iter().enumerate() {
        let progress = Progress {
            index: index + 1,
            total,
        };

        let mut ctx = FileContext::new(path, options.continue_on_error, &mut *observer);
        match std::fs::read(path) {
            Ok(contents) => {
                let file = warehouse.begin_file()?;
                handler(&file.loader(), &contents, &mut ctx)?;
                file.commit()?;
                report.files_committed += 1;
            }
            Err(e) => {
                ctx.fail(None, FailureStage::Read, None, e.to_string())?;
            }
        }
        let file_report = ctx.finish();

        observer.on_file_processed(progress, &file_report);
        report.absorb(file_report);
    }

    observer.on_source_finished(&report);
    Ok(report)
}

/// Load the song catalog to completion, then the activity logs, so that
/// song plays can be resolved against every song known to this run.
pub fn run_pipeline(
    warehouse: &mut SqliteWarehouse,
    roots: &SourceRoots,
    options: &IngestOptions,
    observer: &mut dyn IngestObserver,
) -> Result<PipelineReport> {
    let songs = run(
        warehouse,
        &roots.song_data,
        process_song_file,
        options,
        observer,
    )?;
    let logs = run(
        warehouse,
        &roots.log_data,
        process_log_file,
        options,
        observer,
    )?;
    Ok(PipelineReport { songs, logs })
}
