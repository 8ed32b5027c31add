use crate::access::{AccessMode, AccessScope, FolderAccess};
use crate::cleanup::{self, CleanupReport};
use crate::config;
use crate::error::Error;
use crate::naming;
use crate::progress::ProgressReporter;
use crate::scanner;
use glob::Pattern;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Copy every file of `sources` into `destination/folder_name`.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub sources: Vec<PathBuf>,
    pub destination: PathBuf,
    pub folder_name: String,
    pub delete_originals: bool,
}

#[derive(Debug, Clone)]
pub struct MergeSummary {
    pub consolidated_path: PathBuf,
    pub items_copied: usize,
    pub renamed: usize,
    /// Size of the consolidated folder after the run, pre-existing content included.
    pub total_bytes: u64,
    pub cleanup: Option<CleanupReport>,
}

/// Absolute, symlink-resolved form of `path` when it exists; absolute otherwise.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// A name usable as a single new entry inside a directory.
pub(crate) fn validate_entry_name(name: &str, what: &str) -> Result<(), Error> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(Error::InvalidRequest(format!(
            "{} must be a single folder or file name, got '{}'",
            what, name
        ))),
    }
}

pub(crate) fn validate_sources(sources: &[PathBuf]) -> Result<Vec<PathBuf>, Error> {
    if sources.is_empty() {
        return Err(Error::InvalidRequest("no source folders selected".to_string()));
    }

    let normalized: Vec<PathBuf> = sources.iter().map(|s| normalize(s)).collect();
    for source in &normalized {
        if !source.is_dir() {
            return Err(Error::InvalidRequest(format!(
                "source {} is not a directory",
                source.display()
            )));
        }
    }

    let outermost = config::non_overlapping_directories(normalized.clone());
    let mut kept: Vec<PathBuf> = Vec::with_capacity(outermost.len());
    for source in normalized {
        if !outermost.contains(&source) || kept.contains(&source) {
            warn!(
                "Skipping {}: already covered by another source folder",
                source.display()
            );
            continue;
        }
        kept.push(source);
    }

    Ok(kept)
}

impl MergeRequest {
    pub fn consolidated_path(&self) -> PathBuf {
        self.destination.join(&self.folder_name)
    }

    /// Checks the request before any I/O and returns normalized source paths.
    pub fn validate(&self) -> Result<Vec<PathBuf>, Error> {
        validate_entry_name(&self.folder_name, "folder name")?;
        let sources = validate_sources(&self.sources)?;

        let consolidated = normalize(&self.destination).join(&self.folder_name);
        if let Some(source) = config::find_overlap(&sources, &consolidated) {
            return Err(Error::InvalidRequest(format!(
                "destination {} overlaps source {}",
                consolidated.display(),
                source.display()
            )));
        }

        Ok(sources)
    }
}

/// Maps directories relative to one source onto directories in the consolidated folder.
///
/// A directory whose name is held by a file or symlink in the consolidated folder
/// is created under the next free `_N` name and the rest of its subtree follows it.
struct TargetDirs<'a> {
    root: &'a Path,
    dirs: HashMap<PathBuf, PathBuf>,
    renamed: usize,
}

impl<'a> TargetDirs<'a> {
    fn new(root: &'a Path) -> Self {
        Self {
            root,
            dirs: HashMap::new(),
            renamed: 0,
        }
    }

    fn resolve(&mut self, relative: &Path) -> Result<PathBuf, Error> {
        if relative.as_os_str().is_empty() {
            return Ok(self.root.to_path_buf());
        }
        if let Some(dir) = self.dirs.get(relative) {
            return Ok(dir.clone());
        }

        let parent = self.resolve(relative.parent().unwrap_or_else(|| Path::new("")))?;
        let name = relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut dir = parent.join(&name);
        match fs::symlink_metadata(&dir) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => {
                let unique = naming::unique_file_name(&parent, &name);
                debug!("{} is not a directory, using {} instead", dir.display(), unique);
                dir = parent.join(unique);
                self.renamed += 1;
                fs::create_dir(&dir).map_err(|e| Error::io_at(&dir, e))?;
            }
            Err(_) => fs::create_dir(&dir).map_err(|e| Error::io_at(&dir, e))?,
        }

        self.dirs.insert(relative.to_path_buf(), dir.clone());
        Ok(dir)
    }
}

fn copy_source(
    source: &Path,
    consolidated: &Path,
    ignore_patterns: &[Pattern],
    progress: &mut MergeProgress<'_>,
) -> Result<(), Error> {
    let mut target_dirs = TargetDirs::new(consolidated);
    for file in scanner::walk_files(source, ignore_patterns) {
        let relative = file.strip_prefix(source).unwrap_or(&file);
        let parent = target_dirs.resolve(relative.parent().unwrap_or_else(|| Path::new("")))?;
        let file_name = relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut target = parent.join(&file_name);
        if naming::occupied(&target) {
            let unique = naming::unique_file_name(&parent, &file_name);
            debug!("{} exists, writing {} instead", target.display(), unique);
            target = parent.join(unique);
            progress.renamed += 1;
        }

        fs::copy(&file, &target).map_err(|e| Error::io_at(&file, e))?;
        progress.advance(&file);
    }
    progress.renamed += target_dirs.renamed;
    Ok(())
}

struct MergeProgress<'a> {
    processed: usize,
    total: usize,
    renamed: usize,
    reporter: &'a dyn ProgressReporter,
}

impl MergeProgress<'_> {
    fn advance(&mut self, path: &Path) {
        self.processed += 1;
        // Files created after the pre-pass must not push the fraction past 1.
        self.total = self.total.max(self.processed);
        self.reporter
            .on_item_progress(self.processed, self.total, path);
    }
}

/// Runs a merge: validate, pre-pass count, copy with collision renames, optional cleanup.
///
/// The first copy failure aborts the run. Files already copied stay where they are.
pub fn merge_folders(
    request: &MergeRequest,
    access: &dyn FolderAccess,
    ignore_patterns: &[Pattern],
    reporter: &dyn ProgressReporter,
) -> Result<MergeSummary, Error> {
    let sources = request.validate()?;
    let destination = normalize(&request.destination);
    let consolidated = destination.join(&request.folder_name);

    let _destination_scope = AccessScope::acquire(access, &destination, AccessMode::Write)?;
    fs::create_dir_all(&consolidated).map_err(|e| Error::io_at(&consolidated, e))?;

    info!("Scanning {} source folders...", sources.len());
    reporter.on_scan_start();
    let mut total = 0;
    for source in &sources {
        let _scope = AccessScope::acquire(access, source, AccessMode::Read)?;
        total += scanner::walk_files(source, ignore_patterns).count();
    }
    reporter.on_scan_complete(total);

    info!("Copying {} files into {}", total, consolidated.display());
    let copy_start = Instant::now();
    let mut progress = MergeProgress {
        processed: 0,
        total,
        renamed: 0,
        reporter,
    };
    for source in &sources {
        let _scope = AccessScope::acquire(access, source, AccessMode::Read)?;
        copy_source(source, &consolidated, ignore_patterns, &mut progress)?;
    }
    debug!(
        "Copy completed in {:.2}s, {} files, {} renamed",
        copy_start.elapsed().as_secs_f64(),
        progress.processed,
        progress.renamed
    );

    let cleanup = request
        .delete_originals
        .then(|| cleanup::delete_originals(&sources, access, reporter));

    let (total_bytes, _) = scanner::folder_stats(&consolidated);

    Ok(MergeSummary {
        consolidated_path: consolidated,
        items_copied: progress.processed,
        renamed: progress.renamed,
        total_bytes,
        cleanup,
    })
}
