use crate::archive::ArchiveRequest;
use crate::config::AppConfig;
use crate::error::Error;
use crate::folder::FolderInfo;
use crate::merge::MergeRequest;
use crate::progress::{self, ProgressEvent};
use crate::worker::RunOutcome;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Merge,
    Compress,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Idle,
    Scanning,
    Copying(f64),
    Compressing(f64),
    Completed,
    Failed(String),
}

/// The working set plus the state of the current run.
///
/// Run state changes only through [`Session::begin`] and [`Session::apply`].
#[derive(Debug)]
pub struct Session {
    folders: Vec<FolderInfo>,
    total_source_size: u64,
    pub destination: Option<PathBuf>,
    pub output_name: Option<String>,
    pub delete_originals: bool,
    state: RunState,
    kind: Option<RunKind>,
    status_message: String,
    last_output_bytes: u64,
    cleanup_failures: Vec<(PathBuf, String)>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            folders: Vec::new(),
            total_source_size: 0,
            destination: None,
            output_name: None,
            delete_originals: false,
            state: RunState::Idle,
            kind: None,
            status_message: String::new(),
            last_output_bytes: 0,
            cleanup_failures: Vec::new(),
        }
    }

    pub fn folders(&self) -> &[FolderInfo] {
        &self.folders
    }

    pub fn total_source_size(&self) -> u64 {
        self.total_source_size
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Consolidated folder size or archive size of the last completed run.
    pub fn last_output_bytes(&self) -> u64 {
        self.last_output_bytes
    }

    pub fn cleanup_failures(&self) -> &[(PathBuf, String)] {
        &self.cleanup_failures
    }

    pub fn is_working(&self) -> bool {
        matches!(
            self.state,
            RunState::Scanning | RunState::Copying(_) | RunState::Compressing(_)
        )
    }

    pub fn progress(&self) -> f64 {
        match self.state {
            RunState::Copying(f) | RunState::Compressing(f) => f,
            RunState::Completed => 1.0,
            _ => 0.0,
        }
    }

    fn recompute_total(&mut self) {
        self.total_source_size = self.folders.iter().map(|f| f.size).sum();
    }

    /// Adds a folder unless its path is already selected. Returns whether it was added.
    pub fn add_folder(&mut self, folder: FolderInfo) -> bool {
        if self.folders.iter().any(|f| f.path == folder.path) {
            return false;
        }
        self.folders.push(folder);
        self.recompute_total();
        true
    }

    pub fn remove_folder(&mut self, id: Uuid) -> Option<FolderInfo> {
        let index = self.folders.iter().position(|f| f.id == id)?;
        let removed = self.folders.remove(index);
        self.recompute_total();
        Some(removed)
    }

    fn source_paths(&self) -> Vec<PathBuf> {
        self.folders.iter().map(|f| f.path.clone()).collect()
    }

    fn require_ready(&self) -> Result<PathBuf, Error> {
        if self.is_working() {
            return Err(Error::InvalidRequest("a run is already in progress".to_string()));
        }
        if self.folders.is_empty() {
            return Err(Error::InvalidRequest("no source folders selected".to_string()));
        }
        self.destination
            .clone()
            .ok_or_else(|| Error::InvalidRequest("no destination selected".to_string()))
    }

    pub fn merge_request(&self, config: &AppConfig) -> Result<MergeRequest, Error> {
        let destination = self.require_ready()?;
        Ok(MergeRequest {
            sources: self.source_paths(),
            destination,
            folder_name: self
                .output_name
                .clone()
                .unwrap_or_else(|| config.default_folder_name.clone()),
            delete_originals: self.delete_originals,
        })
    }

    pub fn archive_request(&self, config: &AppConfig) -> Result<ArchiveRequest, Error> {
        let destination = self.require_ready()?;
        Ok(ArchiveRequest {
            sources: self.source_paths(),
            destination,
            archive_name: self
                .output_name
                .clone()
                .unwrap_or_else(|| config.default_archive_name.clone()),
            delete_originals: self.delete_originals,
        })
    }

    /// Moves to `Scanning`. Allowed from `Idle`, `Completed` or `Failed`.
    pub fn begin(&mut self, kind: RunKind) -> Result<(), Error> {
        if self.is_working() {
            return Err(Error::InvalidRequest("a run is already in progress".to_string()));
        }
        self.kind = Some(kind);
        self.state = RunState::Scanning;
        self.status_message = "Working...".to_string();
        self.last_output_bytes = 0;
        self.cleanup_failures.clear();
        Ok(())
    }

    fn running(&self, fraction: f64) -> RunState {
        match self.kind {
            Some(RunKind::Compress) => RunState::Compressing(fraction),
            _ => RunState::Copying(fraction),
        }
    }

    /// Applies one worker event. The progress fraction never decreases.
    pub fn apply(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::ScanStarted => {
                self.state = RunState::Scanning;
            }
            ProgressEvent::ScanCompleted { .. } => {
                self.state = self.running(0.0);
            }
            ProgressEvent::Progress {
                processed, total, ..
            } => {
                let fraction = progress::fraction(*processed, *total).max(self.progress());
                self.state = self.running(fraction);
                self.status_message = match self.kind {
                    Some(RunKind::Compress) => format!("Compressed {} of {} items", processed, total),
                    _ => format!("Processed {} of {} items", processed, total),
                };
            }
            ProgressEvent::CleanupFailed { path, message } => {
                self.cleanup_failures.push((path.clone(), message.clone()));
            }
            ProgressEvent::Finished(outcome) => self.complete(outcome),
            ProgressEvent::Failed { message } => {
                self.state = RunState::Failed(message.clone());
                self.status_message = format!("Error: {}", message);
            }
        }
    }

    fn complete(&mut self, outcome: &RunOutcome) {
        let mut message = match outcome {
            RunOutcome::Merged(summary) => {
                format!("Completed! Consolidated {} items.", summary.items_copied)
            }
            RunOutcome::Compressed(summary) => format!(
                "Completed! Compressed {} items into {}",
                summary.entries_written,
                summary
                    .archive_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            ),
        };
        if let Some(report) = outcome.cleanup() {
            if report.is_clean() {
                message.push_str(" Original folders deleted.");
            } else {
                message.push_str(&format!(
                    " Original folders deleted ({} could not be deleted).",
                    report.failed.len()
                ));
            }
        }

        self.state = RunState::Completed;
        self.status_message = message;
        self.last_output_bytes = outcome.output_bytes();
        self.folders.clear();
        self.destination = None;
        self.output_name = None;
        self.recompute_total();
    }
}
