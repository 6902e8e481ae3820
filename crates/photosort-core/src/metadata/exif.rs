use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use exif::{Exif, In, Reader, Tag, Value};

use crate::error::{ProcessError, Result};
use crate::geocode::Coordinate;

/// Read embedded tag metadata. `Ok(None)` means the container carries none.
pub fn read_tags(path: &Path) -> Result<Option<Exif>> {
    let file = File::open(path).map_err(|e| ProcessError::decode(path, e))?;
    let mut reader = BufReader::new(file);

    let mut exif_reader = Reader::new();
    exif_reader.continue_on_error(true);
    match exif_reader.read_from_container(&mut reader) {
        Ok(exif) => Ok(Some(exif)),
        Err(exif::Error::NotFound(_)) => Ok(None),
        Err(exif::Error::PartialResult(partial)) => {
            let (exif, errors) = partial.into_inner();
            log::warn!(
                "{}: {} malformed tag(s) ignored, first: {}",
                path.display(),
                errors.len(),
                errors.first().map(|e| e.to_string()).unwrap_or_default()
            );
            Ok(Some(exif))
        }
        Err(e) => Err(ProcessError::decode(path, e)),
    }
}

/// An ASCII tag as text, with NUL padding and whitespace trimmed.
/// Blank values count as absent.
pub fn ascii(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Ascii(ref parts) = field.value else {
        return None;
    };
    let raw = String::from_utf8_lossy(parts.first()?);
    let text = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    log::trace!("{}: {:?}", tag, text);
    (!text.is_empty()).then(|| text.to_string())
}

/// Original capture time, falling back to the generic modification time.
pub fn capture_time(exif: &Exif) -> Option<String> {
    ascii(exif, Tag::DateTimeOriginal).or_else(|| ascii(exif, Tag::DateTime))
}

/// GPS position when latitude, longitude and both hemisphere references
/// are present and well formed.
pub fn gps_coordinate(exif: &Exif) -> Option<Coordinate> {
    let latitude = exif.get_field(Tag::GPSLatitude, In::PRIMARY)?;
    let latitude_ref = hemisphere(exif, Tag::GPSLatitudeRef)?;
    let longitude = exif.get_field(Tag::GPSLongitude, In::PRIMARY)?;
    let longitude_ref = hemisphere(exif, Tag::GPSLongitudeRef)?;

    let mut lat = to_degrees(&latitude.value)?;
    if latitude_ref != 'N' {
        lat = -lat;
    }
    let mut lon = to_degrees(&longitude.value)?;
    if longitude_ref != 'E' {
        lon = -lon;
    }

    let coordinate = Coordinate::new(lat, lon);
    coordinate.is_finite().then_some(coordinate)
}

fn hemisphere(exif: &Exif, tag: Tag) -> Option<char> {
    ascii(exif, tag)?.chars().next()
}

/// Degrees + minutes/60 + seconds/3600.
fn to_degrees(value: &Value) -> Option<f64> {
    let degrees = component(value, 0)?;
    let minutes = component(value, 1)?;
    let seconds = component(value, 2)?;
    Some(degrees + minutes / 60.0 + seconds / 3600.0)
}

/// One element of a numeric tag value, whether stored as a rational or a plain number.
fn component(value: &Value, index: usize) -> Option<f64> {
    match value {
        Value::Rational(v) => v.get(index).map(|r| r.to_f64()),
        Value::SRational(v) => v.get(index).map(|r| r.to_f64()),
        Value::Byte(v) => v.get(index).map(|&n| f64::from(n)),
        Value::Short(v) => v.get(index).map(|&n| f64::from(n)),
        Value::Long(v) => v.get(index).map(|&n| f64::from(n)),
        Value::Float(v) => v.get(index).map(|&n| f64::from(n)),
        Value::Double(v) => v.get(index).copied(),
        _ => None,
    }
}
