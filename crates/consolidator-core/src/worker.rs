use crate::archive::{ArchiveRequest, ArchiveSummary};
use crate::cleanup::CleanupReport;
use crate::engine::ConsolidationEngine;
use crate::error::Error;
use crate::merge::{MergeRequest, MergeSummary};
use crate::progress::{ChannelReporter, ProgressEvent};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

#[derive(Debug, Clone)]
pub enum Job {
    Merge(MergeRequest),
    Compress(ArchiveRequest),
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Merged(MergeSummary),
    Compressed(ArchiveSummary),
}

impl RunOutcome {
    pub fn items(&self) -> usize {
        match self {
            RunOutcome::Merged(summary) => summary.items_copied,
            RunOutcome::Compressed(summary) => summary.entries_written,
        }
    }

    /// Consolidated folder size or archive size on disk.
    pub fn output_bytes(&self) -> u64 {
        match self {
            RunOutcome::Merged(summary) => summary.total_bytes,
            RunOutcome::Compressed(summary) => summary.archive_size,
        }
    }

    pub fn cleanup(&self) -> Option<&CleanupReport> {
        match self {
            RunOutcome::Merged(summary) => summary.cleanup.as_ref(),
            RunOutcome::Compressed(summary) => summary.cleanup.as_ref(),
        }
    }
}

/// A run executing on its background thread.
pub struct RunHandle {
    events: Receiver<ProgressEvent>,
    handle: JoinHandle<Result<RunOutcome, Error>>,
}

impl RunHandle {
    pub fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    /// Waits for the worker thread and returns its result.
    pub fn join(self) -> Result<RunOutcome, Error> {
        self.handle
            .join()
            .map_err(|_| Error::Worker("worker thread panicked".to_string()))?
    }

    /// Feeds every event to `on_event` until the worker is done, then joins it.
    ///
    /// `on_event` always sees exactly one terminal event. A worker that panicked
    /// before sending one gets a `Failed` event carrying the join error.
    pub fn drain(self, mut on_event: impl FnMut(&ProgressEvent)) -> Result<RunOutcome, Error> {
        let mut terminated = false;
        for event in self.events.iter() {
            terminated |= event.is_terminal();
            on_event(&event);
        }

        let result = self.join();
        if let (false, Err(err)) = (terminated, &result) {
            on_event(&ProgressEvent::Failed {
                message: err.to_string(),
            });
        }
        result
    }
}

fn run(engine: &ConsolidationEngine, job: &Job, reporter: &ChannelReporter) -> Result<RunOutcome, Error> {
    match job {
        Job::Merge(request) => engine.merge(request, reporter).map(RunOutcome::Merged),
        Job::Compress(request) => engine.compress(request, reporter).map(RunOutcome::Compressed),
    }
}

/// Starts `job` on a single background thread. Progress flows one way, worker to caller,
/// ending with exactly one `Finished` or `Failed` event.
pub fn spawn(engine: Arc<ConsolidationEngine>, job: Job) -> Result<RunHandle, Error> {
    let (tx, rx) = mpsc::channel();

    let handle = thread::Builder::new()
        .name("consolidator-worker".to_string())
        .spawn(move || {
            let reporter = ChannelReporter::new(tx);
            let result = run(&engine, &job, &reporter);
            match &result {
                Ok(outcome) => reporter.send(ProgressEvent::Finished(outcome.clone())),
                Err(err) => reporter.send(ProgressEvent::Failed {
                    message: err.to_string(),
                }),
            }
            debug!("Worker finished");
            result
        })
        .map_err(|e| Error::Worker(e.to_string()))?;

    Ok(RunHandle { events: rx, handle })
}
