use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ProcessError, Result};
use crate::media::{failure_bucket, MediaKind};
use crate::metadata::MetadataRecord;

/// Subfolder of the destination that receives videos.
pub const VIDEOS_DIR: &str = "videos";
/// Subfolder of the destination holding the per-extension failure buckets.
pub const FAILED_DIR: &str = "failed_renames";

/// Where a file ended up.
#[derive(Debug)]
pub enum Outcome {
    /// Moved to its intended place.
    Placed(PathBuf),
    /// The intended disposition failed and the file went to its failure bucket.
    Rerouted { path: PathBuf, cause: ProcessError },
    /// Nothing worked; the file is still at its original location.
    Stranded {
        cause: ProcessError,
        fallback: Option<ProcessError>,
    },
}

impl Outcome {
    pub fn final_path(&self) -> Option<&Path> {
        match self {
            Outcome::Placed(path) | Outcome::Rerouted { path, .. } => Some(path),
            Outcome::Stranded { .. } => None,
        }
    }
}

/// Next action after a failed attempt.
#[derive(Debug)]
pub enum Fallback {
    FailureBucket { cause: ProcessError },
    GiveUp {
        cause: ProcessError,
        fallback: Option<ProcessError>,
    },
}

/// After the intended disposition failed. Unsupported files were already
/// headed for the failure bucket, so there is nothing left to try.
pub fn on_primary_failure(kind: MediaKind, error: ProcessError) -> Fallback {
    match kind {
        MediaKind::Image | MediaKind::Video => Fallback::FailureBucket { cause: error },
        MediaKind::Other => Fallback::GiveUp {
            cause: error,
            fallback: None,
        },
    }
}

/// After the failure-bucket move failed too.
pub fn on_bucket_failure(cause: ProcessError, error: ProcessError) -> Fallback {
    Fallback::GiveUp {
        cause,
        fallback: Some(error),
    }
}

/// Run `primary`, then walk the fallback chain until the file has a home or
/// there is nothing left to try.
pub fn dispose<F>(source: &Path, kind: MediaKind, dest_root: &Path, primary: F) -> Outcome
where
    F: FnOnce() -> Result<PathBuf>,
{
    let mut next = match primary() {
        Ok(path) => return Outcome::Placed(path),
        Err(e) => on_primary_failure(kind, e),
    };
    loop {
        next = match next {
            Fallback::FailureBucket { cause } => match place_in_failure_bucket(source, dest_root) {
                Ok(path) => return Outcome::Rerouted { path, cause },
                Err(e) => on_bucket_failure(cause, e),
            },
            Fallback::GiveUp { cause, fallback } => return Outcome::Stranded { cause, fallback },
        };
    }
}

/// Move an image to `<dest>/<YYYYMMDD>/<YYYYMMDD>_<location>_<model><ext>`,
/// or straight into `dest` when the date is unknown.
pub fn place_image(source: &Path, record: &MetadataRecord, dest_root: &Path) -> Result<PathBuf> {
    let dir = if record.has_date() {
        dest_root.join(&record.timestamp)
    } else {
        dest_root.to_path_buf()
    };
    move_into(source, &dir, OsStr::new(&record.file_stem()), &dotted_extension(source))
}

/// Move a video to `<dest>/videos/` under its original name.
pub fn place_video(source: &Path, dest_root: &Path) -> Result<PathBuf> {
    let dir = dest_root.join(VIDEOS_DIR);
    move_into(source, &dir, file_stem(source), &dotted_extension(source))
}

/// Move a file, unmodified and under its original name, to
/// `<dest>/failed_renames/<ext or "other">/`.
pub fn place_in_failure_bucket(source: &Path, dest_root: &Path) -> Result<PathBuf> {
    let dir = dest_root.join(FAILED_DIR).join(failure_bucket(source));
    move_into(source, &dir, file_stem(source), &dotted_extension(source))
}

fn move_into(source: &Path, dir: &Path, stem: &OsStr, ext: &OsStr) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| ProcessError::filesystem(dir, e))?;
    let target = unique_destination(dir, stem, ext);
    move_file(source, &target)?;
    Ok(target)
}

fn file_stem(path: &Path) -> &OsStr {
    path.file_stem().unwrap_or_else(|| OsStr::new("file"))
}

fn dotted_extension(path: &Path) -> OsString {
    let mut ext = OsString::new();
    if let Some(e) = path.extension() {
        ext.push(".");
        ext.push(e);
    }
    ext
}

/// `dir/<stem><ext>`, or the first free `dir/<stem>_<n><ext>` for n = 1, 2, ...
pub fn unique_destination(dir: &Path, stem: &OsStr, ext: &OsStr) -> PathBuf {
    let mut name = stem.to_os_string();
    name.push(ext);
    let base = dir.join(&name);
    if !occupied(&base) {
        return base;
    }

    let mut counter = 0u32;
    loop {
        counter += 1;
        let mut name = stem.to_os_string();
        name.push(format!("_{}", counter));
        name.push(ext);
        let candidate = dir.join(&name);
        if !occupied(&candidate) {
            break candidate;
        }
    }
}

/// True for anything at `path`, including a dangling symlink.
fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Rename `source` to `target`. Across filesystems the file is copied to a
/// hidden temporary name next to `target`, renamed into place, and only then
/// is the source removed.
pub fn move_file(source: &Path, target: &Path) -> Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(source, target),
        Err(e) => Err(ProcessError::filesystem(source, e)),
    }
}

fn copy_then_remove(source: &Path, target: &Path) -> Result<()> {
    let mut partial_name = OsString::from(".");
    partial_name.push(target.file_name().unwrap_or_else(|| OsStr::new("file")));
    partial_name.push(".partial");
    let partial = target.with_file_name(partial_name);

    if let Err(e) = fs::copy(source, &partial).and_then(|_| fs::rename(&partial, target)) {
        // only the temporary copy is removed
        let _ = fs::remove_file(&partial);
        return Err(ProcessError::filesystem(target, e));
    }
    if let Err(e) = fs::remove_file(source) {
        log::warn!(
            "copied {} to {} but could not remove the original: {}",
            source.display(),
            target.display(),
            e
        );
    }
    Ok(())
}
