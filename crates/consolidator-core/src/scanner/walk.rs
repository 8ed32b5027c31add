use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use walkdir::{DirEntry, WalkDir};

/// Compiles glob ignore patterns, logging and dropping invalid ones.
pub fn compile_ignore_patterns(ignore_globs: &[String]) -> Vec<Pattern> {
    ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Lazily yields every regular, non-hidden file under `root`.
///
/// Hidden directories are not descended into, symlinks are not followed and
/// unreadable entries are skipped with a warning. The root itself is never
/// treated as hidden, so a source folder named `.photos` is still walked.
pub fn walk_files<'a>(
    root: &'a Path,
    ignore_patterns: &'a [Pattern],
) -> impl Iterator<Item = PathBuf> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            !is_hidden(entry)
                && !ignore_patterns
                    .iter()
                    .any(|pattern| pattern.matches_path(entry.path()))
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
}

/// Pre-pass: number of files [`walk_files`] will yield across all roots.
pub fn count_files(roots: &[PathBuf], ignore_patterns: &[Pattern]) -> usize {
    roots
        .iter()
        .map(|root| walk_files(root, ignore_patterns).count())
        .sum()
}

/// Total byte size and count of all regular files under `root`, hidden ones included.
pub fn folder_stats(root: &Path) -> (u64, usize) {
    let mut total_size = 0u64;
    let mut file_count = 0usize;

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(metadata) => {
                total_size += metadata.len();
                file_count += 1;
            }
            Err(err) => warn!("Error reading metadata for {}: {}", entry.path().display(), err),
        }
    }

    (total_size, file_count)
}
