use crate::error::Error;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// Grants access to folders for the duration of a scope.
///
/// Every `acquire` that returns `Ok` is paired with exactly one `release`,
/// which [`AccessScope`] guarantees by releasing on drop.
pub trait FolderAccess: Send + Sync {
    fn acquire(&self, path: &Path, mode: AccessMode) -> Result<(), Error>;
    fn release(&self, path: &Path);
}

/// RAII access token: acquired on construction, released when dropped.
pub struct AccessScope<'a> {
    access: &'a dyn FolderAccess,
    path: PathBuf,
}

impl<'a> AccessScope<'a> {
    pub fn acquire(
        access: &'a dyn FolderAccess,
        path: &Path,
        mode: AccessMode,
    ) -> Result<Self, Error> {
        access.acquire(path, mode)?;
        trace!("Acquired {:?} access to {}", mode, path.display());
        Ok(Self {
            access,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for AccessScope<'_> {
    fn drop(&mut self) {
        self.access.release(&self.path);
        trace!("Released access to {}", self.path.display());
    }
}

/// Grants everything. Used when the OS enforces permissions on its own.
pub struct UnrestrictedAccess;

impl FolderAccess for UnrestrictedAccess {
    fn acquire(&self, _path: &Path, _mode: AccessMode) -> Result<(), Error> {
        Ok(())
    }

    fn release(&self, _path: &Path) {}
}

/// Explicit registry of granted folders. A grant covers the folder and everything below it.
#[derive(Default)]
pub struct AccessGrants {
    grants: Mutex<HashMap<PathBuf, AccessMode>>,
    active: AtomicUsize,
}

impl AccessGrants {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, AccessMode>> {
        self.grants.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a grant. Granting write also allows reads.
    pub fn grant(&self, path: impl Into<PathBuf>, mode: AccessMode) {
        self.lock().insert(path.into(), mode);
    }

    pub fn revoke(&self, path: &Path) {
        self.lock().remove(path);
    }

    /// Number of scopes currently acquired and not yet released.
    pub fn active_scopes(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn allows(&self, path: &Path, mode: AccessMode) -> bool {
        self.lock().iter().any(|(granted, granted_mode)| {
            path.starts_with(granted) && (mode == AccessMode::Read || *granted_mode == AccessMode::Write)
        })
    }
}

impl FolderAccess for AccessGrants {
    fn acquire(&self, path: &Path, mode: AccessMode) -> Result<(), Error> {
        if !self.allows(path, mode) {
            return Err(Error::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self, _path: &Path) {
        let _ = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}
