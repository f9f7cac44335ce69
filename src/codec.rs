//! Content-sniffing image decoder
//!
//! Every ingestion path (directory scan, socket frame, viewport rescale)
//! funnels bytes through [`decode`]. The format is picked from the bytes
//! themselves, never from a file extension, so a `.png` that actually holds
//! a JPEG still decodes and a `.png` holding garbage is rejected.
//!
//! Raster formats go through the `image` crate; SVG documents are
//! rasterized at their intrinsic size with `resvg`.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbaImage};
use resvg::{tiny_skia, usvg};

use crate::error::{DecodeError, IntakeError, Result};

/// Canonical decoded bitmap (8-bit RGBA, straight alpha)
pub type Bitmap = RgbaImage;

/// How many leading bytes are searched for an `<svg` tag
const SVG_SNIFF_WINDOW: usize = 4096;

/// Largest SVG raster side we are willing to allocate
const MAX_SVG_SIDE: u32 = 16_384;

/// Formats the sniffer can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffedFormat {
    Raster(ImageFormat),
    Svg,
}

impl SniffedFormat {
    /// Short lowercase name for logs and error messages
    pub fn name(&self) -> String {
        match self {
            SniffedFormat::Raster(format) => format!("{:?}", format).to_lowercase(),
            SniffedFormat::Svg => "svg".to_string(),
        }
    }
}

/// Identify the encoding of `bytes` by looking at its content
pub fn sniff(bytes: &[u8]) -> Option<SniffedFormat> {
    if let Ok(format) = image::guess_format(bytes) {
        return Some(SniffedFormat::Raster(format));
    }
    if looks_like_svg(bytes) {
        return Some(SniffedFormat::Svg);
    }
    None
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let head = &bytes[start..bytes.len().min(start + SVG_SNIFF_WINDOW)];
    head.first() == Some(&b'<') && head.windows(4).any(|w| w == b"<svg")
}

/// Decode arbitrary encoded bytes into a [`Bitmap`]
///
/// Identical input always yields the identical bitmap or the identical error.
pub fn decode(bytes: &[u8]) -> std::result::Result<Bitmap, DecodeError> {
    match sniff(bytes).ok_or(DecodeError::UnsupportedFormat)? {
        SniffedFormat::Raster(format) => image::load_from_memory_with_format(bytes, format)
            .map(|img| img.to_rgba8())
            .map_err(|e| DecodeError::CorruptData {
                format: SniffedFormat::Raster(format).name(),
                message: e.to_string(),
            }),
        SniffedFormat::Svg => rasterize_svg(bytes),
    }
}

fn rasterize_svg(bytes: &[u8]) -> std::result::Result<Bitmap, DecodeError> {
    let corrupt = |message: String| DecodeError::CorruptData {
        format: "svg".to_string(),
        message,
    };

    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|e| corrupt(e.to_string()))?;
    let size = tree.size().to_int_size();
    if size.width() > MAX_SVG_SIDE || size.height() > MAX_SVG_SIDE {
        return Err(corrupt(format!(
            "intrinsic size {}x{} exceeds {} pixels per side",
            size.width(),
            size.height(),
            MAX_SVG_SIDE
        )));
    }

    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| corrupt("document has an empty canvas".to_string()))?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha
    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    RgbaImage::from_raw(size.width(), size.height(), rgba)
        .ok_or_else(|| corrupt("raster buffer size mismatch".to_string()))
}

/// Read a file and decode it
pub fn decode_file(path: &Path) -> Result<Bitmap> {
    let bytes = std::fs::read(path).map_err(|e| IntakeError::io(path, e))?;
    Ok(decode(&bytes)?)
}

/// Encode a bitmap as PNG bytes
pub fn encode_png(bitmap: &Bitmap) -> std::io::Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(bitmap.clone())
        .write_to(&mut out, ImageFormat::Png)
        .map_err(std::io::Error::other)?;
    Ok(out.into_inner())
}

// ============================================================================
// Tests
// ============================================================================
