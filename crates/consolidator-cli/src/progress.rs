use consolidator_core::{format_size, ProgressEvent, RunKind, RunOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Renders worker events with indicatif.
///
/// - Scan phase: spinner (file count unknown until the pre-pass ends)
/// - Copy/compress phase: progress bar over the pre-pass total
pub struct CliProgress {
    kind: RunKind,
    bar: Option<ProgressBar>,
    started: Instant,
}

impl CliProgress {
    pub fn new(kind: RunKind) -> Self {
        Self {
            kind,
            bar: None,
            started: Instant::now(),
        }
    }

    fn set_bar(&mut self, pb: ProgressBar) {
        if let Some(old) = self.bar.replace(pb) {
            old.finish_and_clear();
        }
    }

    fn finish_bar(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }

    fn verb(&self) -> &'static str {
        match self.kind {
            RunKind::Merge => "Copying",
            RunKind::Compress => "Compressing",
        }
    }

    pub fn handle(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::ScanStarted => {
                self.started = Instant::now();
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::with_template("{spinner:.cyan} {msg}")
                        .unwrap()
                        .tick_chars(TICK_CHARS),
                );
                pb.set_message("Scanning source folders...");
                pb.enable_steady_tick(Duration::from_millis(80));
                self.set_bar(pb);
            }
            ProgressEvent::ScanCompleted { total } => {
                self.finish_bar();
                eprintln!(
                    "  \x1b[32m✓\x1b[0m Scan complete: {} files in {:.2}s",
                    total,
                    self.started.elapsed().as_secs_f64()
                );
                let pb = ProgressBar::new(*total as u64);
                pb.set_style(
                    ProgressStyle::with_template(&format!(
                        "  {{spinner:.cyan}} {} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} files ({{eta}} remaining)",
                        self.verb()
                    ))
                    .unwrap()
                    .progress_chars("━╸─")
                    .tick_chars(TICK_CHARS),
                );
                pb.enable_steady_tick(Duration::from_millis(80));
                self.set_bar(pb);
            }
            ProgressEvent::Progress {
                processed, total, ..
            } => {
                if let Some(pb) = self.bar.as_ref() {
                    if pb.length() != Some(*total as u64) {
                        pb.set_length(*total as u64);
                    }
                    pb.set_position(*processed as u64);
                }
            }
            ProgressEvent::CleanupFailed { path, message } => {
                if let Some(pb) = self.bar.as_ref() {
                    pb.println(format!(
                        "  \x1b[33m!\x1b[0m Could not delete {}: {}",
                        path.display(),
                        message
                    ));
                } else {
                    eprintln!(
                        "  \x1b[33m!\x1b[0m Could not delete {}: {}",
                        path.display(),
                        message
                    );
                }
            }
            ProgressEvent::Finished(outcome) => {
                self.finish_bar();
                let what = match outcome {
                    RunOutcome::Merged(_) => "Merge",
                    RunOutcome::Compressed(_) => "Compress",
                };
                eprintln!(
                    "  \x1b[32m✓\x1b[0m {} complete: {} items, {} in {:.2}s",
                    what,
                    outcome.items(),
                    format_size(outcome.output_bytes()),
                    self.started.elapsed().as_secs_f64()
                );
            }
            ProgressEvent::Failed { .. } => {
                self.finish_bar();
            }
        }
    }
}
