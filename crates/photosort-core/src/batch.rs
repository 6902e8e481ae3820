use std::path::{Path, PathBuf};

use crate::error::{ProcessError, Result};
use crate::geocode::GeocodeResolver;
use crate::media::MediaKind;
use crate::metadata;
use crate::scan;
use crate::writer::{self, Outcome};
use crate::ProcessOptions;

/// What happened to one file.
#[derive(Debug)]
pub struct FileReport {
    /// 1-based position in the batch.
    pub current: u64,
    pub total: u64,
    pub source: PathBuf,
    pub kind: MediaKind,
    pub outcome: Outcome,
    /// Human-readable summary for the log panel.
    pub status: String,
}

/// One pass over a source tree. Each call to `next` processes exactly one
/// file; the file list is fixed when the batch is created.
pub struct Batch {
    destination: PathBuf,
    files: std::vec::IntoIter<PathBuf>,
    current: u64,
    total: u64,
    resolver: GeocodeResolver,
}

impl Batch {
    /// Validate both roots and enumerate the source. No file is touched if
    /// either root is unusable.
    pub fn new(options: &ProcessOptions, resolver: GeocodeResolver) -> Result<Self> {
        check_root("source", &options.source)?;
        check_root("destination", &options.destination)?;

        let files = scan::collect_files(&options.source, &options.destination);
        Ok(Self {
            destination: options.destination.clone(),
            total: files.len() as u64,
            files: files.into_iter(),
            current: 0,
            resolver,
        })
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn resolver(&self) -> &GeocodeResolver {
        &self.resolver
    }

    fn process_file(&mut self, source: &Path, kind: MediaKind) -> Outcome {
        let dest = self.destination.as_path();
        let resolver = &mut self.resolver;
        writer::dispose(source, kind, dest, || match kind {
            MediaKind::Image => {
                let record = metadata::extract(source, resolver)?;
                writer::place_image(source, &record, dest)
            }
            MediaKind::Video => writer::place_video(source, dest),
            MediaKind::Other => writer::place_in_failure_bucket(source, dest),
        })
    }
}

impl Iterator for Batch {
    type Item = FileReport;

    fn next(&mut self) -> Option<FileReport> {
        let source = self.files.next()?;
        self.current += 1;
        let kind = MediaKind::from_path(&source);
        let outcome = self.process_file(&source, kind);
        let status = status_line(&source, kind, &outcome, &self.destination);

        log::debug!("[{}/{}] {}", self.current, self.total, status);

        Some(FileReport {
            current: self.current,
            total: self.total,
            source,
            kind,
            outcome,
            status,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.files.size_hint()
    }
}

fn check_root(role: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() || !path.is_dir() {
        return Err(ProcessError::configuration(format!(
            "Please select a valid {} folder: {} is not a directory",
            role,
            path.display()
        )));
    }
    Ok(())
}

/// Path relative to the destination root for display.
fn display_path(path: &Path, dest_root: &Path) -> String {
    pathdiff::diff_paths(path, dest_root)
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

fn status_line(source: &Path, kind: MediaKind, outcome: &Outcome, dest_root: &Path) -> String {
    match outcome {
        Outcome::Placed(path) => match kind {
            MediaKind::Image => format!("Renamed and moved to: {}", display_path(path, dest_root)),
            MediaKind::Video => format!("Moved video to: {}", display_path(path, dest_root)),
            MediaKind::Other => format!(
                "Moved unsupported file {} to {}",
                source.display(),
                display_path(path, dest_root)
            ),
        },
        Outcome::Rerouted { path, cause } => format!(
            "{}: error processing {} {} ({}); moved to {}",
            cause.kind(),
            kind.label(),
            source.display(),
            cause,
            display_path(path, dest_root)
        ),
        Outcome::Stranded { cause, fallback } => match fallback {
            Some(fallback) => format!(
                "{}: failed to move {} {} to the failure folder ({}) after: {}; left in place",
                fallback.kind(),
                kind.label(),
                source.display(),
                fallback,
                cause
            ),
            None => format!(
                "{}: failed to move {} {} ({}); left in place",
                cause.kind(),
                kind.label(),
                source.display(),
                cause
            ),
        },
    }
}
