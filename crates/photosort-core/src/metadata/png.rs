//! Textual chunks of a PNG file (`tEXt`, `zTXt`, `iTXt`).
//!
//! These carry the generic container metadata image tools write when there is
//! no EXIF block: `date:create`, `date:modify`, `Software`, `Description`, ...

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use png::{Decoder, DecodingError};

/// Collect keyword -> text for every text chunk before the image data,
/// decompressing `zTXt` and compressed `iTXt`. The first occurrence of a
/// keyword wins, looking at `tEXt`, then `zTXt`, then `iTXt`. Chunks whose
/// text cannot be decompressed are skipped.
pub fn read_text_chunks(path: &Path) -> Result<HashMap<String, String>, DecodingError> {
    let file = File::open(path)?;
    let reader = Decoder::new(BufReader::new(file)).read_info()?;
    let info = reader.info();

    let mut texts = HashMap::new();
    for chunk in &info.uncompressed_latin1_text {
        texts
            .entry(chunk.keyword.clone())
            .or_insert_with(|| chunk.text.clone());
    }
    for chunk in &info.compressed_latin1_text {
        match chunk.get_text() {
            Ok(text) => {
                texts.entry(chunk.keyword.clone()).or_insert(text);
            }
            Err(e) => log::debug!("{}: zTXt {:?} skipped: {}", path.display(), chunk.keyword, e),
        }
    }
    for chunk in &info.utf8_text {
        match chunk.get_text() {
            Ok(text) => {
                texts.entry(chunk.keyword.clone()).or_insert(text);
            }
            Err(e) => log::debug!("{}: iTXt {:?} skipped: {}", path.display(), chunk.keyword, e),
        }
    }
    Ok(texts)
}
