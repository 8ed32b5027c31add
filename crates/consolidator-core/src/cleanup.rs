use crate::access::{AccessMode, AccessScope, FolderAccess};
use crate::error::Error;
use crate::progress::ProgressReporter;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of deleting the original source folders after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

fn delete_folder(access: &dyn FolderAccess, folder: &Path) -> Result<(), Error> {
    let _scope = AccessScope::acquire(access, folder, AccessMode::Write)?;
    fs::remove_dir_all(folder).map_err(|e| Error::io_at(folder, e))
}

/// Recursively deletes each folder, best-effort.
///
/// A failure on one folder is recorded and reported but never stops the rest.
pub fn delete_originals(
    folders: &[PathBuf],
    access: &dyn FolderAccess,
    reporter: &dyn ProgressReporter,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    for folder in folders {
        match delete_folder(access, folder) {
            Ok(()) => {
                info!("Deleted original folder {}", folder.display());
                report.deleted.push(folder.clone());
            }
            Err(err) => {
                let message = err.to_string();
                warn!("Could not delete {}: {}", folder.display(), message);
                reporter.on_cleanup_failed(folder, &message);
                report.failed.push((folder.clone(), message));
            }
        }
    }

    report
}
