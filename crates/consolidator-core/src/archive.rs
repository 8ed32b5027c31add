use crate::access::{AccessMode, AccessScope, FolderAccess};
use crate::cleanup::{self, CleanupReport};
use crate::error::Error;
use crate::folder::folder_name;
use crate::merge::{normalize, validate_entry_name, validate_sources};
use crate::naming;
use crate::progress::ProgressReporter;
use crate::scanner;
use glob::Pattern;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write every file of `sources` into one new zip at `destination/archive_name`.
#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    pub sources: Vec<PathBuf>,
    pub destination: PathBuf,
    pub archive_name: String,
    pub delete_originals: bool,
}

#[derive(Debug, Clone)]
pub struct ArchiveSummary {
    pub archive_path: PathBuf,
    pub entries_written: usize,
    /// Entries stored under a `_N` name because the plain name was already written.
    pub renamed: usize,
    pub archive_size: u64,
    pub cleanup: Option<CleanupReport>,
}

impl ArchiveRequest {
    pub fn archive_path(&self) -> PathBuf {
        self.destination.join(&self.archive_name)
    }

    /// Checks the request before any I/O and returns normalized source paths.
    pub fn validate(&self) -> Result<Vec<PathBuf>, Error> {
        validate_entry_name(&self.archive_name, "archive name")?;
        let sources = validate_sources(&self.sources)?;

        let archive_path = normalize(&self.destination).join(&self.archive_name);
        if let Some(source) = sources.iter().find(|s| archive_path.starts_with(s)) {
            return Err(Error::InvalidRequest(format!(
                "archive {} would be written inside source {}",
                archive_path.display(),
                source.display()
            )));
        }

        Ok(sources)
    }
}

/// `<folder>/<relative path>` with `/` separators regardless of platform.
pub fn entry_name(source: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(source).unwrap_or(file);
    let mut name = folder_name(source);
    for component in relative.components() {
        if let Component::Normal(part) = component {
            name.push('/');
            name.push_str(&part.to_string_lossy());
        }
    }
    name
}

/// Same-named source folders share a prefix; a clashing file name gets the next `_N`.
fn unique_entry_name(name: String, written: &HashSet<String>) -> String {
    if !written.contains(&name) {
        return name;
    }
    match name.rsplit_once('/') {
        Some((dir, file)) => {
            let file = naming::unique_name(file, |candidate| {
                written.contains(&format!("{}/{}", dir, candidate))
            });
            format!("{}/{}", dir, file)
        }
        None => naming::unique_name(&name, |candidate| written.contains(candidate)),
    }
}

fn create_archive(path: &Path) -> Result<ZipWriter<File>, Error> {
    let file = File::create_new(path).map_err(|e| Error::ArchiveCreate {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(ZipWriter::new(file))
}

fn add_entry(writer: &mut ZipWriter<File>, name: String, file: &Path) -> Result<(), Error> {
    let metadata = fs::metadata(file).map_err(|e| Error::io_at(file, e))?;
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(metadata.len() >= u32::MAX as u64);

    writer.start_file(name, options)?;
    let mut reader = BufReader::new(File::open(file).map_err(|e| Error::io_at(file, e))?);
    io::copy(&mut reader, writer).map_err(|e| Error::io_at(file, e))?;
    Ok(())
}

/// Runs a compress: validate, create the archive, pre-pass count, write entries,
/// optional cleanup. The archive is created before anything else is written and
/// a partially written archive is left in place on failure.
pub fn compress_folders(
    request: &ArchiveRequest,
    access: &dyn FolderAccess,
    ignore_patterns: &[Pattern],
    reporter: &dyn ProgressReporter,
) -> Result<ArchiveSummary, Error> {
    let sources = request.validate()?;
    let destination = normalize(&request.destination);
    let archive_path = destination.join(&request.archive_name);

    let _destination_scope = AccessScope::acquire(access, &destination, AccessMode::Write)?;
    let mut writer = create_archive(&archive_path)?;

    reporter.on_scan_start();
    let mut total = 0;
    for source in &sources {
        let _scope = AccessScope::acquire(access, source, AccessMode::Read)?;
        total += scanner::walk_files(source, ignore_patterns).count();
    }
    reporter.on_scan_complete(total);

    info!("Compressing {} files into {}", total, archive_path.display());
    let mut processed = 0;
    let mut renamed = 0;
    let mut written = HashSet::new();
    for source in &sources {
        let _scope = AccessScope::acquire(access, source, AccessMode::Read)?;
        for file in scanner::walk_files(source, ignore_patterns) {
            let plain = entry_name(source, &file);
            let name = unique_entry_name(plain.clone(), &written);
            if name != plain {
                debug!("Entry {} already written, storing {} instead", plain, name);
                renamed += 1;
            }
            add_entry(&mut writer, name.clone(), &file)?;
            written.insert(name);
            processed += 1;
            total = total.max(processed);
            debug!("Added {}", file.display());
            reporter.on_item_progress(processed, total, &file);
        }
    }
    writer.finish()?;

    let cleanup = request
        .delete_originals
        .then(|| cleanup::delete_originals(&sources, access, reporter));

    let archive_size = fs::metadata(&archive_path)
        .map(|m| m.len())
        .map_err(|e| Error::io_at(&archive_path, e))?;

    Ok(ArchiveSummary {
        archive_path,
        entries_written: processed,
        renamed,
        archive_size,
        cleanup,
    })
}
