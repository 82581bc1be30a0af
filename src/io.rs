//! PNG encoding and the bincode state file.

use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::compositor::StateEntry;
use crate::error::{EditorError, Result};

// ============================================================================
// PNG
// ============================================================================

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(Cursor::new(&mut buf))
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(|e| EditorError::Encode(e.to_string()))?;
    Ok(buf)
}

pub fn decode_png(data: &[u8]) -> Result<RgbaImage> {
    image::load_from_memory_with_format(data, ImageFormat::Png)
        .map(|img| img.into_rgba8())
        .map_err(|e| EditorError::Decode(e.to_string()))
}

// ============================================================================
// STATE FILE FORMAT
// ============================================================================

/// Magic header of a saved editor state.
const STATE_MAGIC: &str = "RPS1";

/// Largest accepted drawing area per axis.
const MAX_CANVAS_DIM: u32 = 32_768;
/// Largest accepted number of entries (composite + background + layers).
const MAX_ENTRIES: usize = 258;

#[derive(Serialize, Deserialize)]
struct StateFile {
    magic: String,
    width: u32,
    height: u32,
    entries: Vec<StateEntry>,
}

/// A state read back from disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedState {
    pub width: u32,
    pub height: u32,
    pub entries: Vec<StateEntry>,
}

/// Write an exported state sequence to `path`.
pub fn save_state(path: &Path, width: u32, height: u32, entries: &[StateEntry]) -> Result<()> {
    let file = StateFile {
        magic: STATE_MAGIC.to_string(),
        width,
        height,
        entries: entries.to_vec(),
    };
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, &file)?;
    Ok(())
}

pub fn load_state(path: &Path) -> Result<LoadedState> {
    let raw = std::fs::read(path)?;
    if raw.len() < 12 {
        return Err(EditorError::InvalidFormat("file too small".into()));
    }

    // bincode writes the magic String as an 8-byte length then its bytes
    let magic = std::str::from_utf8(&raw[8..12]).unwrap_or("");
    if magic != STATE_MAGIC {
        return Err(EditorError::InvalidFormat(format!("unknown magic '{}'", magic)));
    }

    let file: StateFile = bincode::deserialize(&raw)?;
    if file.width == 0 || file.height == 0 || file.width > MAX_CANVAS_DIM || file.height > MAX_CANVAS_DIM {
        return Err(EditorError::InvalidFormat(format!(
            "canvas {}x{} out of range",
            file.width, file.height
        )));
    }
    if file.entries.len() > MAX_ENTRIES {
        return Err(EditorError::InvalidFormat(format!("{} entries", file.entries.len())));
    }

    Ok(LoadedState { width: file.width, height: file.height, entries: file.entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn png_keeps_pixels() {
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(2, 1, Rgba([10, 20, 30, 40]));
        let back = decode_png(&encode_png(&img).unwrap()).unwrap();
        assert_eq!(back.dimensions(), (3, 2));
        assert_eq!(*back.get_pixel(2, 1), Rgba([10, 20, 30, 40]));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(decode_png(b"not a png"), Err(EditorError::Decode(_))));
    }

    #[test]
    fn state_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.rps");
        let entries = vec![
            StateEntry::Composite { data: vec![1, 2, 3] },
            StateEntry::Background { color: "#FFFFFF".into() },
            StateEntry::Raster { data: vec![4, 5] },
        ];
        save_state(&path, 64, 32, &entries).unwrap();
        let loaded = load_state(&path).unwrap();
        assert_eq!(loaded, LoadedState { width: 64, height: 32, entries });
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.rps");
        std::fs::write(&path, [0u8; 32]).unwrap();
        assert!(matches!(load_state(&path), Err(EditorError::InvalidFormat(_))));

        std::fs::write(&path, [0u8; 4]).unwrap();
        assert!(matches!(load_state(&path), Err(EditorError::InvalidFormat(_))));
    }
}
