//! Shared frame types used between pipeline stages.
//!
//! `RawFrame` is the **internal** uncompressed representation produced by
//! a [`CaptureSource`](crate::capture::CaptureSource) and by JPEG decode.
//! The *wire* unit is just the compressed payload plus its length prefix
//! (see [`crate::wire`]); it never crosses module boundaries as a struct.

use crate::error::CastError;

/// Bytes per pixel for packed RGB8.
pub const BYTES_PER_PIXEL: usize = 3;

// ── RawFrame ─────────────────────────────────────────────────────

/// An uncompressed image: `height` rows of `width` packed RGB8 pixels.
///
/// Unlike GPU captures there is no stride padding — `data` is always
/// exactly `width * height * 3` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Packed RGB8 pixel data.
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Wrap a pixel buffer, validating its size against the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CastError> {
        if width == 0 || height == 0 {
            return Err(CastError::Decode("zero frame dimension".into()));
        }
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(CastError::Decode(format!(
                "pixel buffer is {} bytes, expected {expected}",
                data.len(),
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Total byte size of the pixel buffer.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Returns the RGB bytes of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        &self.data[offset..offset + BYTES_PER_PIXEL]
    }
}

// ── Tests ────────────────────────────────────────────────────────
