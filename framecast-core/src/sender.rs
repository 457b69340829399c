//! Sender-side streaming service.
//!
//! Drives the capture → encode → send pipeline on a fixed cadence:
//!
//! 1. A [`CaptureSource`] produces one raw frame per tick.
//! 2. [`JpegCodec`] compresses it.
//! 3. The [`Connection`] writes one length-prefixed frame.
//!
//! The session moves through `Idle → Connecting → Streaming → Stopping
//! → Idle`. User stop and I/O failure converge on a single teardown
//! routine guarded by one mutex, so the connection is released exactly
//! once no matter which trigger fires first.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::capture::CaptureSource;
use crate::codec::{DEFAULT_JPEG_QUALITY, JpegCodec};
use crate::connection::{Connection, ConnectionInfo};
use crate::error::CastError;
use crate::sink::StatusSink;

// ── CastPhase ────────────────────────────────────────────────────

/// The current phase of a send session.
///
/// ```text
///  Idle ──► Connecting ──► Streaming
///   ▲            │             │
///   └── Stopping ◄─────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CastPhase {
    /// No active session. Initial / terminal state.
    #[default]
    Idle,

    /// TCP connection initiated but not yet established.
    Connecting,

    /// Frames are being captured and sent on the tick timer.
    Streaming,

    /// Teardown in progress.
    Stopping,
}

impl std::fmt::Display for CastPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Streaming => write!(f, "Streaming"),
            Self::Stopping => write!(f, "Stopping"),
        }
    }
}

impl CastPhase {
    /// Whether a session is currently underway (connecting or streaming).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Streaming)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    // ── Transitions ──────────────────────────────────────────────

    /// `Idle → Connecting`.
    pub fn begin_connect(&mut self) -> Result<(), CastError> {
        match self {
            Self::Idle => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(CastError::Phase("cannot connect: session not idle")),
        }
    }

    /// `Connecting → Streaming`.
    pub fn begin_stream(&mut self) -> Result<(), CastError> {
        match self {
            Self::Connecting => {
                *self = Self::Streaming;
                Ok(())
            }
            _ => Err(CastError::Phase("cannot stream: not connecting")),
        }
    }

    /// `Connecting | Streaming → Stopping`.
    pub fn begin_stop(&mut self) -> Result<(), CastError> {
        match self {
            Self::Connecting | Self::Streaming => {
                *self = Self::Stopping;
                Ok(())
            }
            _ => Err(CastError::Phase("cannot stop: no active session")),
        }
    }

    /// `Stopping → Idle`.
    pub fn finish_stop(&mut self) -> Result<(), CastError> {
        match self {
            Self::Stopping => {
                *self = Self::Idle;
                Ok(())
            }
            _ => Err(CastError::Phase("cannot finish stop: not stopping")),
        }
    }

    /// Force back to `Idle` (connect failure).
    pub fn reset(&mut self) {
        *self = Self::Idle;
    }
}

// ── CastConfig ───────────────────────────────────────────────────

/// Configuration for [`CastService`].
#[derive(Debug, Clone)]
pub struct CastConfig {
    /// Target frames per second (1..=60). ~30 gives the classic 33 ms
    /// tick.
    pub target_fps: u8,
    /// JPEG quality for outbound frames.
    pub jpeg_quality: u8,
}

impl Default for CastConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl CastConfig {
    fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.target_fps.clamp(1, 60)))
    }
}

// ── CastService ──────────────────────────────────────────────────

#[derive(Debug, Default)]
struct SessionState {
    phase: CastPhase,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

/// Sender-side streaming session manager.
///
/// One instance manages at most one outbound session at a time.
/// `start` while a session is active is a no-op reported through the
/// status sink, not an error.
pub struct CastService {
    config: CastConfig,
    status: Arc<dyn StatusSink>,
    session: Arc<Mutex<SessionState>>,
}

impl CastService {
    pub fn new(config: CastConfig, status: Arc<dyn StatusSink>) -> Self {
        Self {
            config,
            status,
            session: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// Current session phase.
    pub fn phase(&self) -> CastPhase {
        lock(&self.session).phase
    }

    /// Connect to `info` and start streaming frames from `capture`.
    ///
    /// Re-entrant starts while a session is active are rejected as a
    /// no-op with a status report. A connect failure is reported and
    /// returned, leaving the session `Idle`.
    pub async fn start<C: CaptureSource>(
        &self,
        info: &ConnectionInfo,
        capture: C,
    ) -> Result<(), CastError> {
        {
            let mut state = lock(&self.session);
            if !state.phase.is_idle() {
                drop(state);
                self.status.report("already streaming");
                return Ok(());
            }
            state.phase.begin_connect()?;
        }

        let conn = match Connection::connect(info).await {
            Ok(conn) => conn,
            Err(e) => {
                lock(&self.session).phase.reset();
                self.status.report(&format!("could not connect: {e}"));
                return Err(e);
            }
        };

        {
            let mut state = lock(&self.session);
            if state.phase.begin_stream().is_err() {
                // A stop arrived while we were connecting; the stopping
                // side owns the status report.
                let _ = state.phase.finish_stop();
                drop(state);
                drop(conn);
                return Ok(());
            }

            let cancel = CancellationToken::new();
            let task = tokio::spawn(stream_loop(
                conn,
                Box::new(capture),
                JpegCodec::new(self.config.jpeg_quality),
                self.config.tick_period(),
                cancel.clone(),
                Arc::clone(&self.session),
                Arc::clone(&self.status),
            ));
            state.cancel = Some(cancel);
            state.task = Some(task);
        }

        self.status.report(&format!("streaming to {info}"));
        Ok(())
    }

    /// Stop the session and wait for the streaming task to finish.
    ///
    /// Idempotent: only one caller wins the teardown; everyone else is
    /// a no-op. The stop is observed before the next capture tick, and
    /// an in-flight write is aborted rather than waited for.
    pub async fn stop(&self) {
        let taken = {
            let mut state = lock(&self.session);
            if state.phase.begin_stop().is_err() {
                return;
            }
            (state.cancel.take(), state.task.take())
        };

        let (cancel, task) = taken;
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(task) = task {
            let _ = task.await;
        }

        let _ = lock(&self.session).phase.finish_stop();
        self.status.report("streaming stopped");
    }
}

fn lock(session: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Streaming loop ───────────────────────────────────────────────

/// Capture/encode/send until cancelled or a step fails.
///
/// The connection is owned here and therefore released exactly when
/// the loop exits, on every path.
async fn stream_loop(
    conn: Connection,
    mut capture: Box<dyn CaptureSource>,
    codec: JpegCodec,
    period: Duration,
    cancel: CancellationToken,
    session: Arc<Mutex<SessionState>>,
    status: Arc<dyn StatusSink>,
) {
    let mut ticker = tokio::time::interval(period);
    // Best effort cadence: a missed tick is skipped, never replayed.
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let frame = match capture.capture_frame() {
            Ok(frame) => frame,
            Err(e) => {
                fail_session(&session, &status, &e);
                break;
            }
        };

        let payload = match codec.encode(&frame) {
            Ok(payload) => payload,
            Err(e) => {
                fail_session(&session, &status, &e);
                break;
            }
        };

        let sent = tokio::select! {
            _ = cancel.cancelled() => break,
            res = conn.send(Bytes::from(payload)) => res,
        };
        if let Err(e) = sent {
            fail_session(&session, &status, &e);
            break;
        }
    }

    // Abort rather than drain: a stop must release the connection even
    // if a write is currently blocked on a dead peer.
    conn.shutdown();
}

/// Error-path half of the teardown convergence. If a user stop already
/// holds the session, this is a no-op; otherwise it wins the phase
/// transition, detaches the loop's own handle, and reports once.
fn fail_session(
    session: &Mutex<SessionState>,
    status: &Arc<dyn StatusSink>,
    error: &CastError,
) {
    {
        let mut state = lock(session);
        if state.phase.begin_stop().is_err() {
            return;
        }
        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }
        state.task.take();
        let _ = state.phase.finish_stop();
    }
    status.report(&format!("streaming error: {error}"));
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_happy_path() {
        let mut phase = CastPhase::default();
        assert!(phase.is_idle());

        phase.begin_connect().unwrap();
        assert_eq!(phase, CastPhase::Connecting);
        assert!(phase.is_active());

        phase.begin_stream().unwrap();
        assert_eq!(phase, CastPhase::Streaming);

        phase.begin_stop().unwrap();
        assert_eq!(phase, CastPhase::Stopping);
        assert!(!phase.is_active());

        phase.finish_stop().unwrap();
        assert!(phase.is_idle());
    }

    #[test]
    fn phase_rejects_double_stop() {
        let mut phase = CastPhase::Streaming;
        phase.begin_stop().unwrap();
        assert!(phase.begin_stop().is_err());
    }

    #[test]
    fn phase_rejects_connect_while_active() {
        let mut phase = CastPhase::Streaming;
        assert!(phase.begin_connect().is_err());
    }

    #[test]
    fn phase_stop_from_connecting() {
        let mut phase = CastPhase::Connecting;
        phase.begin_stop().unwrap();
        phase.finish_stop().unwrap();
        assert!(phase.is_idle());
    }

    #[test]
    fn phase_reset_from_any_state() {
        let mut phase = CastPhase::Connecting;
        phase.reset();
        assert!(phase.is_idle());
    }

    #[test]
    fn phase_display() {
        assert_eq!(CastPhase::Idle.to_string(), "Idle");
        assert_eq!(CastPhase::Streaming.to_string(), "Streaming");
    }

    #[test]
    fn tick_period_matches_fps() {
        let config = CastConfig {
            target_fps: 30,
            ..Default::default()
        };
        let period = config.tick_period();
        assert!(period > Duration::from_millis(32));
        assert!(period < Duration::from_millis(35));
    }

    #[test]
    fn tick_period_clamps_zero_fps() {
        let config = CastConfig {
            target_fps: 0,
            ..Default::default()
        };
        assert_eq!(config.tick_period(), Duration::from_secs(1));
    }
}
