//! # framecast-core
//!
//! Frame streaming pipeline: periodic screen-capture frames travel from
//! a producer to one or more consumers over a persistent TCP connection,
//! with an optional consumer-side path that muxes the stream into a
//! video file.
//!
//! ## Architecture
//!
//! ```text
//! SENDER                                      VIEWER
//! ┌─────────────────────────┐                ┌──────────────────────────┐
//! │ CaptureSource           │                │ ViewerServer (accept)    │
//! │   ↓                     │    TCP         │   ↓ per connection       │
//! │ JpegCodec::encode       │ ──────────►    │ ViewSession              │
//! │   ↓                     │  len + JPEG    │   ↓ JpegCodec::decode    │
//! │ Connection (CastService)│                │ Renderer + Recording     │
//! └─────────────────────────┘                └──────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module       | Purpose                                            |
//! |------------- |----------------------------------------------------|
//! | `wire`       | Length-prefixed frame codec for `Framed` TCP I/O   |
//! | `connection` | Managed connection with serialized writes          |
//! | `codec`      | JPEG compression of raw frames                     |
//! | `frame`      | Shared raw-frame type                              |
//! | `capture`    | Capture source trait + synthetic test pattern      |
//! | `sender`     | Capture→encode→send loop with phase machine        |
//! | `receiver`   | Read→decode→fan-out session                        |
//! | `recorder`   | Recording gate and lifecycle                       |
//! | `avi`        | MJPEG-in-AVI container writer                      |
//! | `acceptor`   | Listener spawning one session per peer             |
//! | `sink`       | Renderer / status collaborator seams               |
//! | `error`      | `CastError` — typed, `thiserror`-based hierarchy   |

pub mod acceptor;
pub mod avi;
pub mod capture;
pub mod codec;
pub mod connection;
pub mod error;
pub mod frame;
pub mod receiver;
pub mod recorder;
pub mod sender;
pub mod sink;
pub mod wire;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use acceptor::ViewerServer;
pub use capture::{CaptureSource, SyntheticCapture};
pub use codec::{DEFAULT_JPEG_QUALITY, JpegCodec};
pub use connection::{Connection, ConnectionInfo, DEFAULT_PORT, FrameSender};
pub use error::CastError;
pub use frame::RawFrame;
pub use receiver::{FrameStats, ViewSession};
pub use recorder::{RecordingConfig, RecordingController};
pub use sender::{CastConfig, CastPhase, CastService};
pub use sink::{NullRenderer, Renderer, StatusSink, TracingStatus};
pub use wire::{MAX_FRAME_BYTES, WireCodec};
