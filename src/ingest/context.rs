use super::error::IngestError;
use super::observer::IngestObserver;
use super::report::{Entity, FailureStage, FileReport, RecordFailure};
use crate::warehouse::{LoadError, WriteOutcome};
use std::path::Path;

/// Per-file state handed to a file handler: the report being built and the
/// failure policy of the run.
pub struct FileContext<'a> {
    continue_on_error: bool,
    observer: &'a mut dyn IngestObserver,
    report: FileReport,
}

impl<'a> FileContext<'a> {
    pub fn new(
        path: &Path,
        continue_on_error: bool,
        observer: &'a mut dyn IngestObserver,
    ) -> Self {
        Self {
            continue_on_error,
            observer,
            report: FileReport {
                path: path.to_path_buf(),
                ..Default::default()
            },
        }
    }

    pub fn path(&self) -> &Path {
        &self.report.path
    }

    pub fn report_mut(&mut self) -> &mut FileReport {
        &mut self.report
    }

    /// Record a skipped record. Errors only when the run stops on first failure.
    pub fn fail(
        &mut self,
        line: Option<usize>,
        stage: FailureStage,
        table: Option<&'static str>,
        message: String,
    ) -> Result<(), IngestError> {
        let failure = RecordFailure {
            file: self.report.path.clone(),
            line,
            stage,
            table,
            message,
        };
        self.observer.on_record_failed(&failure);
        let summary = failure.to_string();
        self.report.failures.push(failure);
        if self.continue_on_error {
            Ok(())
        } else {
            Err(IngestError::Aborted(summary))
        }
    }

    /// Record a failed write. Session-level database errors always stop the run.
    pub fn fail_load(&mut self, line: Option<usize>, error: LoadError) -> Result<(), IngestError> {
        if error.is_fatal() {
            return Err(IngestError::FatalLoad {
                file: self.report.path.clone(),
                source: error,
            });
        }
        let table = error.table();
        self.fail(line, FailureStage::Load, Some(table), error.to_string())
    }

    pub fn track_write(
        &mut self,
        line: Option<usize>,
        entity: Entity,
        result: Result<WriteOutcome, LoadError>,
    ) -> Result<(), IngestError> {
        match result {
            Ok(WriteOutcome::Written) => {
                self.report.written.increment(entity);
                Ok(())
            }
            Ok(WriteOutcome::Unchanged) => {
                self.report.unchanged += 1;
                Ok(())
            }
            Err(error) => self.fail_load(line, error),
        }
    }

    pub fn finish(self) -> FileReport {
        self.report
    }
}
