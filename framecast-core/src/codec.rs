//! JPEG still-image codec for captured frames.
//!
//! The pipeline is latency-sensitive, so the default quality favours a
//! small payload over fidelity. Decode works from the payload bytes
//! alone — the wire carries no external metadata — and never retains
//! the input buffer.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};

use crate::error::CastError;
use crate::frame::RawFrame;

/// Default JPEG quality (1..=100). Low on purpose: smaller frames keep
/// the capture cadence ahead of the network.
pub const DEFAULT_JPEG_QUALITY: u8 = 50;

// ── JpegCodec ────────────────────────────────────────────────────

/// Encodes raw frames to JPEG and decodes JPEG payloads back to
/// packed RGB8.
#[derive(Debug, Clone, Copy)]
pub struct JpegCodec {
    quality: u8,
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl JpegCodec {
    /// Create a codec with an explicit quality (clamped to 1..=100).
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    /// Current quality setting.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Compress a raw frame into a JPEG payload.
    pub fn encode(&self, frame: &RawFrame) -> Result<Vec<u8>, CastError> {
        let mut buf = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut buf, self.quality)
            .write_image(
                &frame.data,
                frame.width,
                frame.height,
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| CastError::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    }

    /// Decode a JPEG payload into pixel dimensions plus packed RGB8.
    pub fn decode(&self, payload: &[u8]) -> Result<RawFrame, CastError> {
        let decoded = image::load_from_memory_with_format(payload, ImageFormat::Jpeg)
            .map_err(|e| CastError::Decode(e.to_string()))?;
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        RawFrame::new(width, height, rgb.into_raw())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(w: u32, h: u32) -> RawFrame {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                data.push((x % 256) as u8);
                data.push((y % 256) as u8);
                data.push(((x + y) % 256) as u8);
            }
        }
        RawFrame::new(w, h, data).unwrap()
    }

    #[test]
    fn encode_decode_preserves_dimensions() {
        let codec = JpegCodec::default();
        let frame = gradient_frame(64, 48);

        let jpeg = codec.encode(&frame).unwrap();
        assert!(!jpeg.is_empty());

        let decoded = codec.decode(&jpeg).unwrap();
        assert_eq!(decoded.width, 64);
        assert_eq!(decoded.height, 48);
        assert_eq!(decoded.byte_len(), 64 * 48 * 3);
    }

    #[test]
    fn lower_quality_is_smaller() {
        let frame = gradient_frame(128, 128);
        let small = JpegCodec::new(10).encode(&frame).unwrap();
        let large = JpegCodec::new(95).encode(&frame).unwrap();
        assert!(small.len() < large.len());
    }

    #[test]
    fn decode_rejects_garbage() {
        let codec = JpegCodec::default();
        assert!(matches!(
            codec.decode(&[0xDE, 0xAD, 0xBE, 0xEF]),
            Err(CastError::Decode(_))
        ));
    }

    #[test]
    fn decode_rejects_empty_payload() {
        let codec = JpegCodec::default();
        assert!(codec.decode(&[]).is_err());
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(JpegCodec::new(0).quality(), 1);
        assert_eq!(JpegCodec::new(255).quality(), 100);
    }
}
