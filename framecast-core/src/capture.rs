//! Capture sources polled by the send loop.
//!
//! The OS screen-capture device is an external collaborator; the
//! pipeline only consumes the [`CaptureSource`] trait. A synthetic
//! implementation is provided for headless senders and tests.

use crate::error::CastError;
use crate::frame::RawFrame;

// ── CaptureSource ────────────────────────────────────────────────

/// Produces one raw image per tick.
///
/// Implementations must return well within the capture interval in
/// steady state — a source that blocks longer than one tick starves
/// the send loop.
pub trait CaptureSource: Send + 'static {
    /// Capture the next frame.
    fn capture_frame(&mut self) -> Result<RawFrame, CastError>;
}

// ── SyntheticCapture ─────────────────────────────────────────────

/// Generates a moving RGB test pattern at a fixed resolution.
///
/// Each call advances the pattern, so consecutive frames differ and a
/// viewer can confirm frames are actually flowing.
#[derive(Debug)]
pub struct SyntheticCapture {
    width: u32,
    height: u32,
    tick: u64,
}

impl SyntheticCapture {
    /// Create a source emitting `width` × `height` frames.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            tick: 0,
        }
    }
}

impl CaptureSource for SyntheticCapture {
    fn capture_frame(&mut self) -> Result<RawFrame, CastError> {
        let shift = self.tick.wrapping_mul(4);
        let mut data =
            Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height as u64 {
            for x in 0..self.width as u64 {
                data.push((x.wrapping_add(shift) % 256) as u8);
                data.push((y.wrapping_add(shift) % 256) as u8);
                data.push(((x + y) % 256) as u8);
            }
        }
        self.tick = self.tick.wrapping_add(1);
        RawFrame::new(self.width, self.height, data)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_have_declared_geometry() {
        let mut source = SyntheticCapture::new(32, 16);
        let frame = source.capture_frame().unwrap();
        assert_eq!(frame.width, 32);
        assert_eq!(frame.height, 16);
        assert_eq!(frame.byte_len(), 32 * 16 * 3);
    }

    #[test]
    fn consecutive_frames_differ() {
        let mut source = SyntheticCapture::new(16, 16);
        let a = source.capture_frame().unwrap();
        let b = source.capture_frame().unwrap();
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn zero_dimensions_are_clamped() {
        let mut source = SyntheticCapture::new(0, 0);
        let frame = source.capture_frame().unwrap();
        assert_eq!(frame.width, 1);
        assert_eq!(frame.height, 1);
    }
}
