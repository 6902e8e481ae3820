use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// Every regular file under `source`, depth-first, siblings in file name
/// order. Symlinks are not followed. If `exclude` is a directory inside
/// `source` (the destination nested in the source), its subtree is skipped.
pub fn collect_files(source: &Path, exclude: &Path) -> Vec<PathBuf> {
    let exclude = exclude.canonicalize().ok();
    let excluded = |e: &DirEntry| {
        e.depth() > 0
            && e.file_type().is_dir()
            && exclude.is_some()
            && e.path().canonicalize().ok() == exclude
    };

    let mut files = Vec::new();
    for entry in WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !excluded(e))
    {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(entry) => {
                log::trace!("{}: not a regular file, skipped", entry.path().display());
            }
            Err(e) => log::warn!("cannot read entry while scanning: {}", e),
        }
    }
    log::info!("Found {} file(s) under {}", files.len(), source.display());
    files
}
