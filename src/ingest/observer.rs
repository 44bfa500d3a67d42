use super::report::{FileReport, Progress, RecordFailure, SourceReport};
use std::path::Path;
use tracing::{info, warn};

/// Receives ingestion events as they happen.
///
/// Every method has a no-op default, so implementors only pick what they need.
pub trait IngestObserver {
    fn on_source_started(&mut self, _root: &Path, _files_found: usize) {}

    fn on_record_failed(&mut self, _failure: &RecordFailure) {}

    fn on_file_processed(&mut self, _progress: Progress, _report: &FileReport) {}

    fn on_source_finished(&mut self, _report: &SourceReport) {}
}

/// Reports everything through `tracing`.
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl IngestObserver for LoggingObserver {
    fn on_source_started(&mut self, root: &Path, files_found: usize) {
        info!("{} files found in {}", files_found, root.display());
    }

    fn on_record_failed(&mut self, failure: &RecordFailure) {
        warn!("Skipped record: {}", failure);
    }

    fn on_file_processed(&mut self, progress: Progress, _report: &FileReport) {
        info!("{}/{} files processed.", progress.index, progress.total);
    }

    fn on_source_finished(&mut self, report: &SourceReport) {
        info!(
            "Finished {}: {} records, {} filtered, {} skipped",
            report.root.display(),
            report.records,
            report.filtered,
            report.failures.len()
        );
    }
}
