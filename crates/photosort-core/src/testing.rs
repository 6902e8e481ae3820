//! Fixtures shared by the unit tests: real JPEG/PNG bytes with embedded
//! metadata, a recording geocode backend, and a canned HTTP server.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use exif::{Field, In, Rational, Tag, Value};

use crate::geocode::{Coordinate, LookupFailure, ReverseLookup};

/// 48°51'29.52"N 2°20'52.08"E, near Les Halles.
pub const PARIS: Coordinate = Coordinate {
    latitude: 48.0 + 51.0 / 60.0 + 29.52 / 3600.0,
    longitude: 2.0 + 20.0 / 60.0 + 52.08 / 3600.0,
};

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn sample_image() -> image::RgbImage {
    image::RgbImage::from_fn(16, 16, |x, y| image::Rgb([x as u8 * 16, y as u8 * 16, 128]))
}

pub fn jpeg_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    sample_image()
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .unwrap();
    bytes
}

pub fn png_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    sample_image()
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// A JPEG carrying `fields` in an APP1 Exif segment right after SOI.
pub fn jpeg_with_exif(fields: &[Field]) -> Vec<u8> {
    let mut writer = exif::experimental::Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let jpeg = jpeg_bytes();
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((tiff.len() + 8) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// A PNG with extra chunks inserted right after IHDR.
pub fn png_with_chunks(chunks: &[([u8; 4], Vec<u8>)]) -> Vec<u8> {
    let png = png_bytes();
    // signature (8) + IHDR (4 length + 4 type + 13 data + 4 crc)
    let ihdr_end = 33;
    let mut out = png[..ihdr_end].to_vec();
    for (kind, data) in chunks {
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(data);
        let mut crc_input = kind.to_vec();
        crc_input.extend_from_slice(data);
        out.extend_from_slice(&crc32(&crc_input).to_be_bytes());
    }
    out.extend_from_slice(&png[ihdr_end..]);
    out
}

/// A 16x16 PNG carrying each `(keyword, text)` pair in a `zTXt` chunk.
pub fn png_with_compressed_text(texts: &[(&str, &str)]) -> Vec<u8> {
    let image = sample_image();
    let mut out = Vec::new();
    let mut encoder = png::Encoder::new(&mut out, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    for (keyword, text) in texts {
        encoder
            .add_ztxt_chunk(keyword.to_string(), text.to_string())
            .unwrap();
    }
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(image.as_raw()).unwrap();
    writer.finish().unwrap();
    out
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &b in bytes {
        crc ^= u32::from(b);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

pub fn ascii_field(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

pub fn rational_triple(degrees: u32, minutes: u32, seconds: u32) -> Value {
    Value::Rational(vec![
        Rational::from((degrees, 1)),
        Rational::from((minutes, 1)),
        Rational::from((seconds, 1)),
    ])
}

/// Canon EOS R5 shot taken at [`PARIS`] at `taken`.
pub fn canon_paris_fields(taken: &str) -> Vec<Field> {
    let gps = |tag, d, m, s_hundredths| Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(vec![
            Rational::from((d, 1)),
            Rational::from((m, 1)),
            Rational::from((s_hundredths, 100)),
        ]),
    };
    vec![
        ascii_field(Tag::Make, "Canon"),
        ascii_field(Tag::Model, "EOS R5"),
        ascii_field(Tag::DateTimeOriginal, taken),
        ascii_field(Tag::GPSLatitudeRef, "N"),
        gps(Tag::GPSLatitude, 48, 51, 2952),
        ascii_field(Tag::GPSLongitudeRef, "E"),
        gps(Tag::GPSLongitude, 2, 20, 5208),
    ]
}

pub type Calls = Arc<Mutex<Vec<Coordinate>>>;

/// Backend that gives the same answer every time and records what it was asked.
pub struct RecordingLookup {
    answer: Result<String, LookupFailure>,
    calls: Calls,
}

impl RecordingLookup {
    pub fn answering(answer: Result<String, LookupFailure>) -> Self {
        Self {
            answer,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Calls {
        Arc::clone(&self.calls)
    }
}

impl ReverseLookup for RecordingLookup {
    fn reverse(&mut self, at: Coordinate) -> Result<String, LookupFailure> {
        self.calls.lock().unwrap().push(at);
        self.answer.clone()
    }
}

#[derive(Debug)]
pub struct SeenRequest {
    pub url: String,
    pub user_agent: String,
}

/// Serve one canned `(status, body)` response per request, in order, on a
/// local port. Returns the `/reverse` endpoint URL and a handle yielding the
/// requests seen once all responses are used (or the server goes idle).
pub fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<SeenRequest>>) {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();

    let handle = std::thread::spawn(move || {
        let mut seen = Vec::new();
        for (status, body) in responses {
            let request = match server.recv_timeout(Duration::from_secs(10)) {
                Ok(Some(request)) => request,
                _ => break,
            };
            let user_agent = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("User-Agent"))
                .map(|h| h.value.to_string())
                .unwrap_or_default();
            seen.push(SeenRequest {
                url: request.url().to_string(),
                user_agent,
            });
            request
                .respond(tiny_http::Response::from_string(body).with_status_code(status))
                .unwrap();
        }
        seen
    });

    (format!("http://{}/reverse", addr), handle)
}
