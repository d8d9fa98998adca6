//! Tile artifact paths and output compression.
//!
//! Tile coordinates map to nested directories by splitting the decimal
//! digits of each coordinate: the path starts a new segment after every
//! digit, keeping directory fan-out bounded no matter how far the map
//! grows. Tile (123, -5) lands at `x1/2/3/z-5<ext>`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;

use flate2::write::GzEncoder;

use crate::map::{MapError, Result};
use crate::util::write_atomic;

// ─── Compression ────────────────────────────────────────────────────────────

/// Output compression applied to written tile artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

static BROTLI_FALLBACK: Once = Once::new();

impl Compression {
    /// Parse a configuration value. `"true"`/`"false"` are accepted aliases
    /// kept for older configurations that used a boolean switch.
    pub fn from_config(value: &str) -> Result<Compression> {
        if value.eq_ignore_ascii_case("none") || value.eq_ignore_ascii_case("false") {
            return Ok(Compression::None);
        }
        if value.eq_ignore_ascii_case("gzip") || value.eq_ignore_ascii_case("true") {
            return Ok(Compression::Gzip);
        }
        if value.eq_ignore_ascii_case("brotli") {
            BROTLI_FALLBACK.call_once(|| {
                log::warn!("No brotli backend is linked, tile compression falls back to gzip");
            });
            return Ok(Compression::Gzip);
        }
        Err(MapError::Settings(format!(
            "Unknown tile compression \"{}\" (expected none, gzip or brotli)",
            value
        )))
    }

    /// Suffix appended to tile file names, after the artifact extension.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => ".gz",
        }
    }

    pub fn compress(&self, bytes: &[u8]) -> std::io::Result<Vec<u8>> {
        match self {
            Compression::None => Ok(bytes.to_vec()),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(bytes)?;
                encoder.finish()
            }
        }
    }
}

// ─── Paths ──────────────────────────────────────────────────────────────────

/// Path of a tile artifact below `root`. `suffix` is the full trailing file
/// name part, extension plus compression suffix.
pub fn tile_path(root: &Path, tile: (i32, i32), suffix: &str) -> PathBuf {
    let coords = format!("x{}z{}", tile.0, tile.1);
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    for c in coords.chars() {
        current.push(c);
        if c.is_ascii_digit() {
            segments.push(std::mem::take(&mut current));
        }
    }
    // decimal numbers end in a digit, so nothing is left over
    let mut path = root.to_path_buf();
    for segment in &segments[..segments.len() - 1] {
        path.push(segment);
    }
    path.push(format!("{}{}", segments[segments.len() - 1], suffix));
    path
}

/// Compress and atomically write one tile artifact, creating parent
/// directories as needed.
pub fn write_tile(
    root: &Path,
    tile: (i32, i32),
    extension: &str,
    compression: Compression,
    bytes: &[u8],
) -> std::io::Result<()> {
    let suffix = format!("{}{}", extension, compression.file_suffix());
    let path = tile_path(root, tile, &suffix);
    let compressed = compression.compress(bytes)?;
    write_atomic(&path, &compressed)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
