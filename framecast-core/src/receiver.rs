//! Receiver-side session: read → decode → fan out.
//!
//! One `ViewSession` runs per inbound connection until explicit stop,
//! graceful peer close, or a protocol/decoder error. Each decoded frame
//! goes to the [`RecordingController`] and to the [`Renderer`]; the
//! render path is decoupled through a channel drained by its own task,
//! so a stalled display cannot cost the recording any frames. Both
//! consumers observe every decodable frame in arrival order.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::codec::JpegCodec;
use crate::connection::Connection;
use crate::error::CastError;
use crate::recorder::RecordingController;
use crate::sink::{Renderer, StatusSink};

// ── FrameStats ───────────────────────────────────────────────────

/// Rolling per-session statistics published to observers.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    /// Frames decoded and fanned out since the session started.
    pub total_frames: u64,
    /// Compressed bytes received off the wire.
    pub total_bytes: u64,
    /// Frames dropped because they failed to decode.
    pub dropped_frames: u64,
    /// Most recent frame width.
    pub width: u32,
    /// Most recent frame height.
    pub height: u32,
}

// ── ViewSession ──────────────────────────────────────────────────

/// One inbound streaming session.
pub struct ViewSession {
    conn: Connection,
    codec: JpegCodec,
    recorder: Arc<RecordingController>,
    renderer: Arc<dyn Renderer>,
    status: Arc<dyn StatusSink>,
    cancel: CancellationToken,
    stats_tx: watch::Sender<FrameStats>,
}

impl ViewSession {
    pub fn new(
        conn: Connection,
        recorder: Arc<RecordingController>,
        renderer: Arc<dyn Renderer>,
        status: Arc<dyn StatusSink>,
        cancel: CancellationToken,
    ) -> Self {
        let (stats_tx, _) = watch::channel(FrameStats::default());
        Self {
            conn,
            codec: JpegCodec::default(),
            recorder,
            renderer,
            status,
            cancel,
            stats_tx,
        }
    }

    /// Observe this session's statistics.
    pub fn stats(&self) -> watch::Receiver<FrameStats> {
        self.stats_tx.subscribe()
    }

    /// Token that stops this session when cancelled.
    pub fn stop_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until stop, peer close, or a terminal connection error.
    ///
    /// Every terminal transition reports exactly one status message;
    /// the returned error is for the supervisor, not the user.
    pub async fn run(mut self) -> Result<(), CastError> {
        let peer = self.conn.peer();

        // Render fan-out: frames queue here in arrival order and a
        // dedicated task feeds the renderer, keeping display hiccups
        // out of the receive/record path.
        let (render_tx, mut render_rx) = mpsc::unbounded_channel();
        let renderer = Arc::clone(&self.renderer);
        let forwarder = tokio::spawn(async move {
            while let Some(frame) = render_rx.recv().await {
                renderer.present(frame);
            }
        });

        let result = loop {
            let item = tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.conn.shutdown();
                    self.status.report(&format!("viewer session for {peer} stopped"));
                    break Ok(());
                }
                item = self.conn.recv() => item,
            };

            match item {
                None => {
                    self.status.report(&format!("{peer} disconnected"));
                    break Ok(());
                }
                Some(Err(e)) => {
                    self.status
                        .report(&format!("connection to {peer} failed: {e}"));
                    break Err(e);
                }
                Some(Ok(payload)) => {
                    let frame = match self.codec.decode(&payload) {
                        Ok(frame) => frame,
                        Err(e) => {
                            // One bad frame is dropped; the stream goes on.
                            tracing::warn!("dropping undecodable frame from {peer}: {e}");
                            self.stats_tx.send_modify(|s| {
                                s.total_bytes += payload.len() as u64;
                                s.dropped_frames += 1;
                            });
                            continue;
                        }
                    };

                    self.recorder
                        .write_frame(&payload, frame.width, frame.height);

                    self.stats_tx.send_modify(|s| {
                        s.total_frames += 1;
                        s.total_bytes += payload.len() as u64;
                        s.width = frame.width;
                        s.height = frame.height;
                    });

                    // Fire-and-forget; the forwarder task may already be
                    // gone during teardown.
                    let _ = render_tx.send(frame);
                }
            }
        };

        // Let the forwarder drain whatever the renderer still owes.
        drop(render_tx);
        let _ = forwarder.await;
        result
    }
}

// ── Tests ────────────────────────────────────────────────────────
