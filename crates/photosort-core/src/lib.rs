pub mod batch;
pub mod error;
pub mod geocode;
pub mod media;
pub mod metadata;
pub mod sanitize;
pub mod scan;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use media::MediaKind;

pub use batch::{Batch, FileReport};
pub use error::ProcessError;
pub use geocode::{GeocodeOptions, GeocodeResolver};
pub use metadata::MetadataRecord;
pub use writer::Outcome;

/// Value of every metadata field the file does not provide.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Folder scanned recursively for photos and videos.
    pub source: PathBuf,
    /// Folder that receives the dated tree, `videos/` and `failed_renames/`.
    pub destination: PathBuf,
    #[serde(default)]
    pub geocode: GeocodeOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessResult {
    pub total_files: u64,
    /// Photos and videos that reached their intended place.
    pub placed: u64,
    /// Files that ended in a failure bucket: unsupported files and those
    /// whose processing failed.
    pub rerouted: u64,
    /// Files left at their original location.
    pub stranded: u64,
    /// Remote reverse-geocoding requests made.
    pub geocode_lookups: u64,
}

/// Type alias for progress callback
pub type ProgressCallback<'a> = dyn Fn(&Progress) + Send + Sync + 'a;

/// Run a whole batch, reporting one progress step per file.
pub fn process(
    options: &ProcessOptions,
    progress_callback: &ProgressCallback<'_>,
) -> Result<ProcessResult, ProcessError> {
    let resolver = GeocodeResolver::from_options(&options.geocode)?;
    process_with_resolver(options, resolver, progress_callback)
}

/// Same as [`process`] with a caller-supplied geocode resolver.
pub fn process_with_resolver(
    options: &ProcessOptions,
    resolver: GeocodeResolver,
    progress_callback: &ProgressCallback<'_>,
) -> Result<ProcessResult, ProcessError> {
    let mut batch = Batch::new(options, resolver)?;
    let mut result = ProcessResult {
        total_files: batch.total(),
        ..ProcessResult::default()
    };

    for report in batch.by_ref() {
        match report.outcome {
            Outcome::Placed(_) if report.kind == MediaKind::Other => result.rerouted += 1,
            Outcome::Placed(_) => result.placed += 1,
            Outcome::Rerouted { .. } => result.rerouted += 1,
            Outcome::Stranded { .. } => result.stranded += 1,
        }
        progress_callback(&Progress {
            current: report.current,
            total: report.total,
            message: report.status,
        });
    }

    result.geocode_lookups = batch.resolver().remote_calls();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use std::path::Path;
    use std::sync::Mutex;

    #[test]
    fn test_process_reports_every_file() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write_file(
            src.path(),
            "a.jpg",
            &jpeg_with_exif(&canon_paris_fields("2024:01:02 09:00:00")),
        );
        write_file(src.path(), "b.mp4", b"video");
        write_file(src.path(), "c.jpg", b"corrupt");
        write_file(src.path(), "d.docx", b"doc");

        let options = ProcessOptions {
            source: src.path().to_path_buf(),
            destination: dest.path().to_path_buf(),
            geocode: GeocodeOptions::default(),
        };
        let seen: Mutex<Vec<Progress>> = Mutex::new(Vec::new());
        let lookup = RecordingLookup::answering(Ok("Le Marais".to_string()));

        let resolver = GeocodeResolver::new(Box::new(lookup));
        let result =
            process_with_resolver(&options, resolver, &|p| seen.lock().unwrap().push(p.clone()))
                .unwrap();

        assert_eq!(result.total_files, 4);
        assert_eq!(result.placed, 2);
        assert_eq!(result.rerouted, 2);
        assert_eq!(result.stranded, 0);
        assert_eq!(result.geocode_lookups, 1);

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.iter().map(|p| p.current).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert!(seen.iter().all(|p| p.total == 4));
        assert_eq!(
            seen[1].message,
            format!("Moved video to: {}", Path::new("videos").join("b.mp4").display())
        );
    }

    #[test]
    fn test_process_rejects_missing_source() {
        let dest = tempfile::tempdir().unwrap();
        let options = ProcessOptions {
            source: dest.path().join("missing"),
            destination: dest.path().to_path_buf(),
            geocode: GeocodeOptions {
                enabled: false,
                ..GeocodeOptions::default()
            },
        };
        let err = process(&options, &|_| {}).unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn test_options_json() {
        let options: ProcessOptions =
            serde_json::from_str(r#"{"source":"/in","destination":"/out"}"#).unwrap();
        assert_eq!(options.source, PathBuf::from("/in"));
        assert!(options.geocode.enabled);
        assert_eq!(options.geocode.endpoint, geocode::DEFAULT_ENDPOINT);
    }
}
