use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv"];

/// What the driver does with a file, decided by extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Metadata is extracted and the file is renamed into a dated folder.
    Image,
    /// Moved to `videos/` under its original name.
    Video,
    /// Routed straight to the failure bucket.
    Other,
}

impl MediaKind {
    /// Classify by extension, case-insensitively.
    pub fn from_path(path: &Path) -> Self {
        let ext = lowercase_extension(path);
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Other => "unsupported file",
        }
    }
}

/// Extension without the dot, lower-cased; empty if there is none.
pub fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Name of the failure bucket a file belongs to: its extension, or `other`.
pub fn failure_bucket(path: &Path) -> String {
    let ext = lowercase_extension(path);
    if ext.is_empty() {
        "other".to_string()
    } else {
        ext
    }
}
