//! Collaborator seams consumed by the pipeline.
//!
//! The display widget and the status-text surface live outside this
//! crate; the receive loop only calls these traits. Both must be safe
//! to invoke from a background task — implementations that need a UI
//! thread dispatch internally.

use crate::frame::RawFrame;

// ── Renderer ─────────────────────────────────────────────────────

/// Consumes decoded frames for on-screen display.
///
/// Called from the receive session's fan-out task, fire-and-forget:
/// the pipeline does not wait for the frame to reach the screen.
pub trait Renderer: Send + Sync {
    /// Present one decoded frame.
    fn present(&self, frame: RawFrame);
}

/// Discards every frame. For headless receivers and tests.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn present(&self, _frame: RawFrame) {}
}

// ── StatusSink ───────────────────────────────────────────────────

/// Receives user-visible status text (connects, disconnects, recording
/// state). Terminal session transitions report here exactly once.
pub trait StatusSink: Send + Sync {
    /// Report a human-readable status message.
    fn report(&self, message: &str);
}

/// Routes status text to the `tracing` subscriber.
#[derive(Debug, Default)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn report(&self, message: &str) {
        tracing::info!("{message}");
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::RawFrame;

    #[test]
    fn null_renderer_accepts_frames() {
        let renderer = NullRenderer;
        let frame = RawFrame::new(1, 1, vec![0, 0, 0]).unwrap();
        renderer.present(frame);
    }
}
