use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

use consolidator_core::{
    AccessGrants, AccessMode, AppConfig, ConsolidationEngine, Error, MergeRequest,
    ProgressReporter, SilentReporter,
};

fn count_files_recursive(dir: &Path) -> usize {
    let mut count = 0;
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                count += count_files_recursive(&path);
            } else if path.is_file() {
                count += 1;
            }
        }
    }
    count
}

#[derive(Default)]
struct RecordingReporter {
    scans: Mutex<Vec<usize>>,
    progress: Mutex<Vec<(usize, usize)>>,
    cleanup_failures: Mutex<Vec<PathBuf>>,
}

impl ProgressReporter for RecordingReporter {
    fn on_scan_complete(&self, total_files: usize) {
        self.scans.lock().unwrap().push(total_files);
    }

    fn on_item_progress(&self, processed: usize, total: usize, _current_path: &Path) {
        self.progress.lock().unwrap().push((processed, total));
    }

    fn on_cleanup_failed(&self, path: &Path, _message: &str) {
        self.cleanup_failures.lock().unwrap().push(path.to_path_buf());
    }
}

fn engine_in(tmp: &Path) -> ConsolidationEngine {
    ConsolidationEngine::new(AppConfig::default()).with_history_path(tmp.join("history.json"))
}

fn merge_request(sources: Vec<PathBuf>, destination: PathBuf, name: &str) -> MergeRequest {
    MergeRequest {
        sources,
        destination,
        folder_name: name.to_string(),
        delete_originals: false,
    }
}

/// Layout:
///   root/
///     A/
///       x.png
///       docs/readme.md
///       .hidden          (skipped)
///     B/
///       x.png            (collides with A/x.png)
///       docs/readme.md   (collides with A/docs/readme.md)
///       .cache/blob      (skipped)
///       notes
fn create_sources(root: &Path) -> (PathBuf, PathBuf) {
    let a = root.join("A");
    let b = root.join("B");
    fs::create_dir_all(a.join("docs")).unwrap();
    fs::create_dir_all(b.join("docs")).unwrap();
    fs::create_dir_all(b.join(".cache")).unwrap();

    fs::write(a.join("x.png"), "png from A").unwrap();
    fs::write(a.join("docs/readme.md"), "readme A").unwrap();
    fs::write(a.join(".hidden"), "h").unwrap();
    fs::write(b.join("x.png"), "png from B").unwrap();
    fs::write(b.join("docs/readme.md"), "readme B").unwrap();
    fs::write(b.join(".cache/blob"), "blob").unwrap();
    fs::write(b.join("notes"), "notes").unwrap();
    (a, b)
}

#[test]
fn test_collisions_are_renamed_not_overwritten() {
    let tmp = tempdir().unwrap();
    let a = tmp.path().join("A");
    let b = tmp.path().join("B");
    fs::create_dir_all(&a).unwrap();
    fs::create_dir_all(&b).unwrap();
    fs::write(a.join("x.png"), "first").unwrap();
    fs::write(b.join("x.png"), "second").unwrap();

    let engine = engine_in(tmp.path());
    let summary = engine
        .merge(
            &merge_request(vec![a, b], tmp.path().join("Dest"), "Out"),
            &SilentReporter,
        )
        .unwrap();

    let out = tmp.path().join("Dest/Out");
    assert_eq!(summary.items_copied, 2);
    assert_eq!(summary.renamed, 1);
    assert_eq!(fs::read_to_string(out.join("x.png")).unwrap(), "first");
    assert_eq!(fs::read_to_string(out.join("x_1.png")).unwrap(), "second");
    assert_eq!(count_files_recursive(&out), 2);
}

#[test]
fn test_every_visible_file_lands_in_destination() {
    let tmp = tempdir().unwrap();
    let (a, b) = create_sources(tmp.path());

    let engine = engine_in(tmp.path());
    let summary = engine
        .merge(
            &merge_request(vec![a, b], tmp.path().join("Dest"), "Merged"),
            &SilentReporter,
        )
        .unwrap();

    let out = tmp.path().join("Dest/Merged");
    assert_eq!(summary.items_copied, 5);
    assert_eq!(count_files_recursive(&out), 5);
    assert!(out.join("docs/readme.md").is_file());
    assert!(out.join("docs/readme_1.md").is_file());
    assert!(out.join("notes").is_file());
    assert!(!out.join(".hidden").exists());
    assert!(!out.join(".cache").exists());
    assert_eq!(summary.total_bytes, 10 + 10 + 8 + 8 + 5);
}

#[test]
fn test_progress_is_monotonic_and_reaches_one() {
    let tmp = tempdir().unwrap();
    let (a, b) = create_sources(tmp.path());

    let reporter = RecordingReporter::default();
    engine_in(tmp.path())
        .merge(
            &merge_request(vec![a, b], tmp.path().join("Dest"), "Out"),
            &reporter,
        )
        .unwrap();

    assert_eq!(*reporter.scans.lock().unwrap(), vec![5]);
    let progress = reporter.progress.lock().unwrap();
    assert_eq!(progress.len(), 5);
    let fractions: Vec<f64> = progress
        .iter()
        .map(|(p, t)| consolidator_core::progress::fraction(*p, *t))
        .collect();
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*fractions.last().unwrap(), 1.0);
}

#[test]
fn test_empty_sources_complete_immediately() {
    let tmp = tempdir().unwrap();
    let empty = tmp.path().join("Empty");
    fs::create_dir_all(empty.join("nested")).unwrap();

    let reporter = RecordingReporter::default();
    let summary = engine_in(tmp.path())
        .merge(
            &merge_request(vec![empty], tmp.path().join("Dest"), "Out"),
            &reporter,
        )
        .unwrap();

    assert_eq!(summary.items_copied, 0);
    assert_eq!(*reporter.scans.lock().unwrap(), vec![0]);
    assert!(reporter.progress.lock().unwrap().is_empty());
    assert!(tmp.path().join("Dest/Out").is_dir());
}

#[test]
fn test_successful_merge_is_logged() {
    let tmp = tempdir().unwrap();
    let (a, b) = create_sources(tmp.path());
    let engine = engine_in(tmp.path());

    engine
        .merge(
            &merge_request(vec![a.clone(), b], tmp.path().join("Dest"), "Out"),
            &SilentReporter,
        )
        .unwrap();
    engine
        .merge(
            &merge_request(vec![a], tmp.path().join("Dest"), "Second"),
            &SilentReporter,
        )
        .unwrap();

    let history = engine.history().recent_first();
    assert_eq!(history.len(), 2);
    assert!(history[0].destination_folder.ends_with("Second"));
    assert_eq!(history[0].item_count, 2);
    assert_eq!(history[1].item_count, 5);
    assert_eq!(history[1].source_folders.len(), 2);
}

/// Removes `victim` once the first file has been copied.
struct VanishingFileReporter {
    victim: PathBuf,
}

impl ProgressReporter for VanishingFileReporter {
    fn on_item_progress(&self, processed: usize, _total: usize, _current_path: &Path) {
        if processed == 1 {
            let _ = fs::remove_file(&self.victim);
        }
    }
}

#[test]
fn test_copy_failure_aborts_without_logging() {
    let tmp = tempdir().unwrap();
    let a = tmp.path().join("A");
    fs::create_dir_all(&a).unwrap();
    fs::write(a.join("first.txt"), "1").unwrap();
    fs::write(a.join("second.txt"), "2").unwrap();

    let engine = engine_in(tmp.path());
    let reporter = VanishingFileReporter {
        victim: a.join("second.txt"),
    };
    let err = engine
        .merge(
            &merge_request(vec![a], tmp.path().join("Dest"), "Out"),
            &reporter,
        )
        .unwrap_err();

    assert!(matches!(err, Error::IoAt { .. }));
    assert!(err.to_string().contains("second.txt"));
    // No rollback: the file copied before the failure stays.
    let out = tmp.path().join("Dest/Out");
    assert!(out.join("first.txt").is_file());
    assert_eq!(count_files_recursive(&out), 1);
    assert!(engine.history().load().is_empty());
}

#[test]
fn test_file_and_directory_with_same_name_both_survive() {
    let tmp = tempdir().unwrap();
    let a = tmp.path().join("A");
    let b = tmp.path().join("B");
    fs::create_dir_all(&a).unwrap();
    fs::create_dir_all(b.join("sub/deeper")).unwrap();
    fs::write(a.join("sub"), "plain file").unwrap();
    fs::write(b.join("sub/f.txt"), "f").unwrap();
    fs::write(b.join("sub/deeper/g.txt"), "g").unwrap();

    let summary = engine_in(tmp.path())
        .merge(
            &merge_request(vec![a, b], tmp.path().join("Dest"), "Out"),
            &SilentReporter,
        )
        .unwrap();

    let out = tmp.path().join("Dest/Out");
    assert_eq!(summary.items_copied, 3);
    assert_eq!(summary.renamed, 1);
    assert_eq!(count_files_recursive(&out), 3);
    assert_eq!(fs::read_to_string(out.join("sub")).unwrap(), "plain file");
    assert_eq!(fs::read_to_string(out.join("sub_1/f.txt")).unwrap(), "f");
    assert_eq!(fs::read_to_string(out.join("sub_1/deeper/g.txt")).unwrap(), "g");
}

#[test]
fn test_directory_then_file_with_same_name() {
    let tmp = tempdir().unwrap();
    let a = tmp.path().join("A");
    let b = tmp.path().join("B");
    fs::create_dir_all(a.join("sub")).unwrap();
    fs::create_dir_all(&b).unwrap();
    fs::write(a.join("sub/f.txt"), "f").unwrap();
    fs::write(b.join("sub"), "plain file").unwrap();

    let summary = engine_in(tmp.path())
        .merge(
            &merge_request(vec![a, b], tmp.path().join("Dest"), "Out"),
            &SilentReporter,
        )
        .unwrap();

    let out = tmp.path().join("Dest/Out");
    assert_eq!(summary.items_copied, 2);
    assert!(out.join("sub/f.txt").is_file());
    assert_eq!(fs::read_to_string(out.join("sub_1")).unwrap(), "plain file");
}

#[cfg(unix)]
#[test]
fn test_dangling_symlink_in_destination_is_not_written_through() {
    let tmp = tempdir().unwrap();
    let a = tmp.path().join("A");
    fs::create_dir_all(&a).unwrap();
    fs::write(a.join("x.png"), "png").unwrap();

    let out = tmp.path().join("Dest/Out");
    fs::create_dir_all(&out).unwrap();
    let outside = tmp.path().join("outside.png");
    std::os::unix::fs::symlink(&outside, out.join("x.png")).unwrap();

    let summary = engine_in(tmp.path())
        .merge(
            &merge_request(vec![a], tmp.path().join("Dest"), "Out"),
            &SilentReporter,
        )
        .unwrap();

    assert_eq!(summary.renamed, 1);
    assert!(!outside.exists());
    assert_eq!(fs::read_to_string(out.join("x_1.png")).unwrap(), "png");
}

#[test]
fn test_nested_sources_are_copied_once() {
    let tmp = tempdir().unwrap();
    let (a, b) = create_sources(tmp.path());

    let mut request = merge_request(
        vec![a.join("docs"), a.clone(), b.clone(), a.clone()],
        tmp.path().join("Dest"),
        "Out",
    );
    request.delete_originals = true;

    let reporter = RecordingReporter::default();
    let summary = engine_in(tmp.path()).merge(&request, &reporter).unwrap();

    assert_eq!(summary.items_copied, 5);
    assert_eq!(count_files_recursive(&tmp.path().join("Dest/Out")), 5);
    let cleanup = summary.cleanup.unwrap();
    assert!(cleanup.is_clean());
    assert_eq!(cleanup.deleted.len(), 2);
    assert!(!a.exists());
    assert!(!b.exists());
    assert!(reporter.cleanup_failures.lock().unwrap().is_empty());
}

#[test]
fn test_delete_originals_is_best_effort() {
    let tmp = tempdir().unwrap();
    let root = fs::canonicalize(tmp.path()).unwrap();
    let (a, b) = create_sources(&root);
    let dest = root.join("Dest");
    fs::create_dir_all(&dest).unwrap();

    // A is readable but not writable, so it cannot be deleted.
    let grants = Arc::new(AccessGrants::new());
    grants.grant(&a, AccessMode::Read);
    grants.grant(&b, AccessMode::Write);
    grants.grant(&dest, AccessMode::Write);

    let engine = engine_in(&root).with_access(grants.clone());
    let mut request = merge_request(vec![a.clone(), b.clone()], dest.clone(), "Out");
    request.delete_originals = true;

    let reporter = RecordingReporter::default();
    let summary = engine.merge(&request, &reporter).unwrap();

    let cleanup = summary.cleanup.unwrap();
    assert_eq!(cleanup.failed.len(), 1);
    assert_eq!(cleanup.deleted.len(), 1);
    assert!(a.exists());
    assert!(!b.exists());
    assert_eq!(count_files_recursive(&dest.join("Out")), 5);
    assert_eq!(reporter.cleanup_failures.lock().unwrap().len(), 1);
    assert_eq!(grants.active_scopes(), 0);
    assert_eq!(engine.history().load().len(), 1);
}

#[test]
fn test_missing_grant_is_permission_denied() {
    let tmp = tempdir().unwrap();
    let root = fs::canonicalize(tmp.path()).unwrap();
    let (a, _) = create_sources(&root);
    let dest = root.join("Dest");
    fs::create_dir_all(&dest).unwrap();

    let grants = Arc::new(AccessGrants::new());
    grants.grant(&dest, AccessMode::Write);

    let engine = engine_in(&root).with_access(grants.clone());
    let err = engine
        .merge(&merge_request(vec![a], dest, "Out"), &SilentReporter)
        .unwrap_err();

    assert!(matches!(err, Error::PermissionDenied { .. }));
    assert_eq!(grants.active_scopes(), 0);
}

#[test]
fn test_destination_inside_source_is_rejected_before_io() {
    let tmp = tempdir().unwrap();
    let (a, b) = create_sources(tmp.path());

    let err = engine_in(tmp.path())
        .merge(&merge_request(vec![a.clone(), b], a.clone(), "Out"), &SilentReporter)
        .unwrap_err();

    assert!(matches!(err, Error::InvalidRequest(_)));
    assert!(!a.join("Out").exists());
}
