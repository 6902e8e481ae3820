pub mod exif;
pub mod png;

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use image::{ImageFormat, ImageReader};

use crate::error::{ProcessError, Result};
use crate::geocode::GeocodeResolver;
use crate::sanitize::sanitize;
use crate::UNKNOWN;

/// Normalized capture metadata of one image. Every field is "Unknown" when
/// the image does not say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub make: String,
    pub model: String,
    /// `YYYYMMDD`, or "Unknown".
    pub timestamp: String,
    pub location: String,
}

impl MetadataRecord {
    fn new(
        make: Option<String>,
        model: Option<String>,
        timestamp: Option<String>,
        location: Option<String>,
    ) -> Self {
        let or_unknown = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_string());
        let timestamp = timestamp
            .map(|t| sanitize(&t))
            .filter(|t| is_folder_name(t));
        Self {
            make: or_unknown(make),
            model: sanitize(&or_unknown(model)),
            timestamp: or_unknown(timestamp),
            location: sanitize(&or_unknown(location)),
        }
    }

    pub fn has_date(&self) -> bool {
        self.timestamp != UNKNOWN
    }

    /// `<timestamp>_<location>_<model>`, the new file name without extension.
    pub fn file_stem(&self) -> String {
        format!("{}_{}_{}", self.timestamp, self.location, self.model)
    }
}

/// The date token names a folder directly under the destination, so it must
/// be a single normal path component.
fn is_folder_name(token: &str) -> bool {
    !token.is_empty() && !token.chars().all(|c| c == '.')
}

/// Decode the metadata of the image at `path`, resolving its GPS position
/// through `resolver`. Any decode failure is returned as a single error.
pub fn extract(path: &Path, resolver: &mut GeocodeResolver) -> Result<MetadataRecord> {
    let format = open_container(path)?;

    let record = match exif::read_tags(path)? {
        Some(tags) => {
            let location = match exif::gps_coordinate(&tags) {
                Some(at) => resolver.resolve(at),
                None => UNKNOWN.to_string(),
            };
            MetadataRecord::new(
                exif::ascii(&tags, ::exif::Tag::Make),
                exif::ascii(&tags, ::exif::Tag::Model),
                exif::capture_time(&tags).and_then(|raw| normalize_timestamp(&raw)),
                Some(location),
            )
        }
        None => {
            let generic = container_fields(path, format)?;
            let field = |key: &str| {
                generic
                    .get(key)
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };
            MetadataRecord::new(
                field("Software"),
                field("Description"),
                field("date:create")
                    .or_else(|| field("date:modify"))
                    .and_then(|raw| normalize_timestamp(&raw)),
                None,
            )
        }
    };

    log::debug!("{}: {:?}", path.display(), record);
    Ok(record)
}

/// Check the container header decodes and report the detected format.
fn open_container(path: &Path) -> Result<Option<ImageFormat>> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| ProcessError::decode(path, e))?;
    let format = reader.format();
    reader
        .into_dimensions()
        .map_err(|e| ProcessError::decode(path, e))?;
    Ok(format)
}

/// Generic key/value metadata of containers without tags. Only PNG has any.
fn container_fields(path: &Path, format: Option<ImageFormat>) -> Result<HashMap<String, String>> {
    match format {
        Some(ImageFormat::Png) => {
            png::read_text_chunks(path).map_err(|e| ProcessError::decode(path, e))
        }
        _ => Ok(HashMap::new()),
    }
}

/// Reduce a timestamp to its `YYYYMMDD` date token.
///
/// EXIF (`2023:07:04 10:15:22`) and RFC 3339 (`2023-07-04T10:15:22+00:00`)
/// values are parsed; anything else has colons and whitespace stripped and is
/// cut to 8 characters. `None` if nothing is left.
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y:%m:%d %H:%M:%S") {
        return Some(dt.format("%Y%m%d").to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.format("%Y%m%d").to_string());
    }
    let token: String = raw
        .chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .take(8)
        .collect();
    (!token.is_empty()).then_some(token)
}
