pub mod access;
pub mod archive;
pub mod cleanup;
pub mod config;
pub mod engine;
pub mod error;
pub mod folder;
pub mod history;
pub mod merge;
pub mod naming;
pub mod progress;
pub mod scanner;
pub mod session;
pub mod worker;

pub use access::{AccessGrants, AccessMode, AccessScope, FolderAccess, UnrestrictedAccess};
pub use archive::{ArchiveRequest, ArchiveSummary};
pub use cleanup::CleanupReport;
pub use config::AppConfig;
pub use engine::ConsolidationEngine;
pub use error::Error;
pub use folder::{format_size, FolderInfo};
pub use history::{ConsolidationOperation, OperationLog};
pub use merge::{MergeRequest, MergeSummary};
pub use progress::{ChannelReporter, ProgressEvent, ProgressReporter, SilentReporter};
pub use session::{RunKind, RunState, Session};
pub use worker::{Job, RunHandle, RunOutcome};
