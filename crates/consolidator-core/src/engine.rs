use crate::access::{FolderAccess, UnrestrictedAccess};
use crate::archive::{self, ArchiveRequest, ArchiveSummary};
use crate::config::AppConfig;
use crate::error::Error;
use crate::history::{ConsolidationOperation, OperationLog};
use crate::merge::{self, MergeRequest, MergeSummary};
use crate::progress::ProgressReporter;
use crate::scanner;
use glob::Pattern;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

pub struct ConsolidationEngine {
    config: AppConfig,
    access: Arc<dyn FolderAccess>,
    history: OperationLog,
    ignore_patterns: Vec<Pattern>,
}

impl ConsolidationEngine {
    pub fn new(config: AppConfig) -> Self {
        let history = OperationLog::new(config.history_path.clone());
        let ignore_patterns = scanner::compile_ignore_patterns(&config.ignore_patterns);
        Self {
            config,
            access: Arc::new(UnrestrictedAccess),
            history,
            ignore_patterns,
        }
    }

    pub fn with_access(mut self, access: Arc<dyn FolderAccess>) -> Self {
        self.access = access;
        self
    }

    pub fn with_history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history = OperationLog::new(path);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn history(&self) -> &OperationLog {
        &self.history
    }

    /// Merge the request's sources and record the run in the operation log.
    ///
    /// A failed merge is never logged. A log write failure after a successful
    /// merge is reported but does not fail the run.
    pub fn merge(
        &self,
        request: &MergeRequest,
        reporter: &dyn ProgressReporter,
    ) -> Result<MergeSummary, Error> {
        let start = Instant::now();
        let summary = merge::merge_folders(
            request,
            self.access.as_ref(),
            &self.ignore_patterns,
            reporter,
        )?;
        info!(
            "Consolidated {} items into {} in {:.2}s",
            summary.items_copied,
            summary.consolidated_path.display(),
            start.elapsed().as_secs_f64()
        );

        let sources: Vec<PathBuf> = request.sources.iter().map(|s| merge::normalize(s)).collect();
        let operation = ConsolidationOperation::new(
            &sources,
            &summary.consolidated_path,
            summary.items_copied,
            summary.total_bytes,
        );
        if let Err(err) = self.history.append(operation) {
            error!(
                "Could not record operation in {}: {}",
                self.history.path().display(),
                err
            );
        }

        Ok(summary)
    }

    pub fn compress(
        &self,
        request: &ArchiveRequest,
        reporter: &dyn ProgressReporter,
    ) -> Result<ArchiveSummary, Error> {
        let start = Instant::now();
        let summary = archive::compress_folders(
            request,
            self.access.as_ref(),
            &self.ignore_patterns,
            reporter,
        )?;
        info!(
            "Compressed {} items into {} ({} bytes) in {:.2}s",
            summary.entries_written,
            summary.archive_path.display(),
            summary.archive_size,
            start.elapsed().as_secs_f64()
        );
        Ok(summary)
    }
}
