use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// One completed merge. Records are append-only and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationOperation {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub source_folders: Vec<String>,
    pub destination_folder: String,
    pub item_count: usize,
    pub total_size: u64,
}

impl ConsolidationOperation {
    pub fn new(
        source_folders: &[PathBuf],
        destination_folder: &Path,
        item_count: usize,
        total_size: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: Utc::now(),
            source_folders: source_folders
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            destination_folder: destination_folder.to_string_lossy().into_owned(),
            item_count,
            total_size,
        }
    }
}

/// JSON file holding every [`ConsolidationOperation`] in append order.
#[derive(Debug, Clone)]
pub struct OperationLog {
    path: PathBuf,
}

impl OperationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, oldest first. A missing, unreadable or corrupt log reads as empty.
    pub fn load(&self) -> Vec<ConsolidationOperation> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!("Could not read history {}: {}", self.path.display(), err);
                return Vec::new();
            }
        };

        match serde_json::from_slice(&data) {
            Ok(operations) => operations,
            Err(err) => {
                warn!(
                    "History {} is corrupt, starting a new one: {}",
                    self.path.display(),
                    err
                );
                Vec::new()
            }
        }
    }

    /// Records, newest first.
    pub fn recent_first(&self) -> Vec<ConsolidationOperation> {
        let mut operations = self.load();
        operations.reverse();
        operations
    }

    /// Appends `operation` and rewrites the log through a temp file + rename.
    pub fn append(&self, operation: ConsolidationOperation) -> Result<(), Error> {
        let mut operations = self.load();
        operations.push(operation);
        let json = serde_json::to_vec_pretty(&operations)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
        }
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        fs::write(&tmp_path, json).map_err(|e| Error::io_at(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| Error::io_at(&self.path, e))?;

        debug!(
            "History {} now holds {} operations",
            self.path.display(),
            operations.len()
        );
        Ok(())
    }
}
