use crate::worker::RunOutcome;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

/// Trait for reporting merge/compress progress.
///
/// The CLI consumes events from a [`ChannelReporter`]; tests use [`SilentReporter`]
/// or their own recorders. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_complete(&self, _total_files: usize) {}
    fn on_item_progress(&self, _processed: usize, _total: usize, _current_path: &Path) {}
    fn on_cleanup_failed(&self, _path: &Path, _message: &str) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// `processed / total`, clamped to `[0, 1]`. An empty run counts as complete.
pub fn fraction(processed: usize, total: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (processed as f64 / total as f64).min(1.0)
}

/// Events published by the worker thread, in order.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    ScanStarted,
    ScanCompleted {
        total: usize,
    },
    Progress {
        processed: usize,
        total: usize,
        path: PathBuf,
    },
    CleanupFailed {
        path: PathBuf,
        message: String,
    },
    Finished(RunOutcome),
    Failed {
        message: String,
    },
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Finished(_) | ProgressEvent::Failed { .. })
    }
}

/// Forwards every callback as a [`ProgressEvent`]. A dropped receiver is ignored.
pub struct ChannelReporter {
    tx: Sender<ProgressEvent>,
}

impl ChannelReporter {
    pub fn new(tx: Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    pub fn send(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

impl ProgressReporter for ChannelReporter {
    fn on_scan_start(&self) {
        self.send(ProgressEvent::ScanStarted);
    }

    fn on_scan_complete(&self, total_files: usize) {
        self.send(ProgressEvent::ScanCompleted { total: total_files });
    }

    fn on_item_progress(&self, processed: usize, total: usize, current_path: &Path) {
        self.send(ProgressEvent::Progress {
            processed,
            total,
            path: current_path.to_path_buf(),
        });
    }

    fn on_cleanup_failed(&self, path: &Path, message: &str) {
        self.send(ProgressEvent::CleanupFailed {
            path: path.to_path_buf(),
            message: message.to_string(),
        });
    }
}
