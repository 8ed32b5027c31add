use crate::error::Error;
use crate::scanner;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// A selected source folder with its size computed eagerly at selection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderInfo {
    pub id: Uuid,
    pub path: PathBuf,
    pub size: u64,
    pub file_count: usize,
}

impl FolderInfo {
    /// Scans `path` recursively. The path is made absolute; it must be a directory.
    pub fn scan(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = std::path::absolute(path.as_ref()).map_err(|e| Error::io_at(path.as_ref(), e))?;
        let metadata = std::fs::metadata(&path).map_err(|e| Error::io_at(&path, e))?;
        if !metadata.is_dir() {
            return Err(Error::InvalidRequest(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let (size, file_count) = scanner::folder_stats(&path);
        debug!(
            "Scanned {}: {} files, {} bytes",
            path.display(),
            file_count,
            size
        );

        Ok(Self {
            id: Uuid::new_v4(),
            path,
            size,
            file_count,
        })
    }

    /// Last path component, used as the archive entry prefix.
    pub fn name(&self) -> String {
        folder_name(&self.path)
    }
}

pub(crate) fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Formats a byte count the way file browsers do (KB/MB/GB, base 1000).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1000 {
        return format!("{} bytes", bytes);
    }
    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
