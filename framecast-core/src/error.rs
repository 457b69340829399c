//! Domain-specific error types for the framecast pipeline.
//!
//! All fallible operations return `Result<T, CastError>`.
//! No panics on invalid input — every error is typed and recoverable
//! at the session boundary.

use thiserror::Error;

/// The canonical error type for the streaming pipeline.
#[derive(Debug, Error)]
pub enum CastError {
    // ── Connection Errors ────────────────────────────────────────
    /// A connection could not be established or accepted.
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    /// The TCP/IO layer reported an error mid-session.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    // ── Protocol Errors ──────────────────────────────────────────
    /// The peer violated the wire framing rules.
    #[error("protocol violation: {0}")]
    Protocol(&'static str),

    /// A declared frame length exceeds the configured maximum.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // ── Codec Errors ─────────────────────────────────────────────
    /// A raw frame could not be compressed.
    #[error("encode failed: {0}")]
    Encode(String),

    /// A payload was not a valid compressed image.
    #[error("decode failed: {0}")]
    Decode(String),

    // ── Recorder Errors ──────────────────────────────────────────
    /// The recording output file could not be opened or written.
    #[error("recorder error: {0}")]
    Recorder(String),

    // ── Session Errors ───────────────────────────────────────────
    /// A session phase transition was requested from the wrong phase.
    #[error("invalid session phase: {0}")]
    Phase(&'static str),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for CastError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        CastError::ChannelClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = CastError::Protocol("negative frame length");
        assert!(e.to_string().contains("negative"));

        let e = CastError::FrameTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: CastError = io_err.into();
        assert!(matches!(e, CastError::Io(_)));
    }

    #[test]
    fn from_send_error() {
        let e: CastError = tokio::sync::mpsc::error::SendError(1u8).into();
        assert!(matches!(e, CastError::ChannelClosed));
    }
}
