use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Everything that can go wrong while processing a batch.
///
/// Only `Configuration` aborts a run. The other kinds are per-file: the
/// driver reports them and moves on to the next file.
#[derive(Debug)]
pub enum ProcessError {
    /// Source or destination root is unusable. Raised before any file is touched.
    Configuration { message: String },
    /// The image container or its tag metadata could not be decoded.
    Decode { path: PathBuf, message: String },
    /// A directory could not be created or a file could not be moved.
    Filesystem { path: PathBuf, source: io::Error },
}

impl ProcessError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ProcessError::Configuration {
            message: message.into(),
        }
    }

    pub fn decode(path: &Path, message: impl fmt::Display) -> Self {
        ProcessError::Decode {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn filesystem(path: &Path, source: io::Error) -> Self {
        ProcessError::Filesystem {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Stable name of the error kind, used as the prefix of failure status lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessError::Configuration { .. } => "ConfigurationError",
            ProcessError::Decode { .. } => "DecodeError",
            ProcessError::Filesystem { .. } => "FilesystemError",
        }
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::Configuration { message } => write!(f, "{}", message),
            ProcessError::Decode { path, message } => {
                write!(f, "cannot decode {}: {}", path.display(), message)
            }
            ProcessError::Filesystem { path, source } => {
                write!(f, "{}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProcessError::Filesystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProcessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(ProcessError::configuration("x").kind(), "ConfigurationError");
        assert_eq!(ProcessError::decode(Path::new("a.jpg"), "bad").kind(), "DecodeError");
        let err = ProcessError::filesystem(Path::new("a.jpg"), io::Error::other("denied"));
        assert_eq!(err.kind(), "FilesystemError");
        assert_eq!(err.to_string(), "a.jpg: denied");
    }
}
