//! Recording controller gating the decode→mux path.
//!
//! Recording is requested and released independently of any connection:
//! the request only raises a flag, and the output file is opened lazily
//! on the first frame that arrives afterwards, bound to that frame's
//! dimensions. One mutex guards the request flag and the writer handle
//! together, so a stop racing an in-flight write can never leave writes
//! landing on a closed file.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Local;

use crate::avi::AviWriter;
use crate::sink::StatusSink;

// ── RecordingConfig ──────────────────────────────────────────────

/// Configuration for [`RecordingController`].
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Directory recordings are written to.
    pub output_dir: PathBuf,
    /// Nominal playback rate stamped into the container.
    pub fps: u32,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            fps: 30,
        }
    }
}

// ── RecordingController ──────────────────────────────────────────

#[derive(Debug, Default)]
struct RecorderState {
    requested: bool,
    writer: Option<AviWriter>,
}

/// Gates whether decoded frames are muxed into a video file.
pub struct RecordingController {
    state: Mutex<RecorderState>,
    config: RecordingConfig,
    status: Arc<dyn StatusSink>,
}

impl RecordingController {
    pub fn new(config: RecordingConfig, status: Arc<dyn StatusSink>) -> Self {
        Self {
            state: Mutex::new(RecorderState::default()),
            config,
            status,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Request that subsequent frames be recorded. Idempotent; does not
    /// open a file — that happens on the first frame delivered.
    pub fn request_start(&self) {
        let mut state = self.lock();
        if state.requested {
            return;
        }
        state.requested = true;
        drop(state);
        self.status.report("recording requested, waiting for frames");
    }

    /// Stop recording. If a file is open it is finalized and released
    /// exactly once; calling this again is a no-op.
    pub fn request_stop(&self) {
        let mut state = self.lock();
        let was_requested = state.requested;
        state.requested = false;
        let writer = state.writer.take();
        drop(state);

        match writer {
            Some(writer) => match writer.finalize() {
                Ok(path) => self
                    .status
                    .report(&format!("recording saved: {}", path.display())),
                Err(e) => self
                    .status
                    .report(&format!("failed to finalize recording: {e}")),
            },
            None if was_requested => self.status.report("recording stopped"),
            None => {}
        }
    }

    /// Whether a recording file is currently open.
    pub fn is_recording(&self) -> bool {
        self.lock().writer.is_some()
    }

    /// Whether recording has been requested.
    pub fn is_requested(&self) -> bool {
        self.lock().requested
    }

    /// Frames written to the currently open file, if any.
    pub fn frames_written(&self) -> usize {
        self.lock().writer.as_ref().map_or(0, AviWriter::frames)
    }

    /// Offer one frame to the recorder: the compressed payload plus its
    /// decoded dimensions.
    ///
    /// No-op unless recording is requested. The first frame after a
    /// request opens the output file with that frame's geometry; frames
    /// with different dimensions are skipped rather than corrupting the
    /// file. An open or write failure disables recording for the rest
    /// of the session and leaves the receive path untouched.
    pub fn write_frame(&self, payload: &[u8], width: u32, height: u32) {
        if payload.is_empty() {
            return;
        }

        // Status sinks may call back into this controller, so reports
        // are deferred until the lock is released.
        let mut report = None;
        {
            let mut state = self.lock();
            // Re-check under the lock: a concurrent stop may have
            // drained the recorder since the caller decoded this frame.
            if !state.requested {
                return;
            }

            if state.writer.is_none() {
                let path = self.next_output_path();
                match AviWriter::create(&path, width, height, self.config.fps) {
                    Ok(writer) => {
                        report = Some(format!("recording to {}", path.display()));
                        state.writer = Some(writer);
                    }
                    Err(e) => {
                        state.requested = false;
                        report = Some(format!("could not start recording: {e}"));
                    }
                }
            }

            if let Some(writer) = state.writer.as_mut() {
                if writer.width() != width || writer.height() != height {
                    tracing::warn!(
                        "skipping {width}x{height} frame: recording is {}x{}",
                        writer.width(),
                        writer.height(),
                    );
                } else if let Err(e) = writer.write_frame(payload) {
                    state.writer = None;
                    state.requested = false;
                    report = Some(format!("recording failed: {e}"));
                }
            }
        }
        if let Some(message) = report {
            self.status.report(&message);
        }
    }

    /// Timestamp-named output path, suffixed if a file already exists.
    fn next_output_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let base = self.config.output_dir.join(format!("record_{stamp}.avi"));
        if !base.exists() {
            return base;
        }
        let mut n = 1u32;
        loop {
            let candidate = self
                .config
                .output_dir
                .join(format!("record_{stamp}_{n}.avi"));
            if !candidate.exists() {
                return candidate;
            }
            n += 1;
        }
    }
}

impl std::fmt::Debug for RecordingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("RecordingController")
            .field("requested", &state.requested)
            .field("recording", &state.writer.is_some())
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JpegCodec;
    use crate::frame::RawFrame;
    use std::sync::Mutex as StdMutex;

    struct TestStatus(StdMutex<Vec<String>>);

    impl TestStatus {
        fn new() -> Arc<Self> {
            Arc::new(Self(StdMutex::new(Vec::new())))
        }

        fn messages(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl StatusSink for TestStatus {
        fn report(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    fn controller(dir: &std::path::Path) -> (RecordingController, Arc<TestStatus>) {
        let status = TestStatus::new();
        let config = RecordingConfig {
            output_dir: dir.to_path_buf(),
            fps: 30,
        };
        (RecordingController::new(config, status.clone()), status)
    }

    fn sample_jpeg() -> (Vec<u8>, u32, u32) {
        let frame = RawFrame::new(8, 8, vec![0x40; 8 * 8 * 3]).unwrap();
        (JpegCodec::default().encode(&frame).unwrap(), 8, 8)
    }

    #[test]
    fn start_then_stop_before_frames_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let (rec, _) = controller(dir.path());

        rec.request_start();
        rec.request_stop();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn request_start_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (rec, status) = controller(dir.path());

        rec.request_start();
        rec.request_start();
        rec.request_start();

        assert!(rec.is_requested());
        assert_eq!(status.messages().len(), 1);
    }

    #[test]
    fn frames_are_ignored_unless_requested() {
        let dir = tempfile::tempdir().unwrap();
        let (rec, _) = controller(dir.path());
        let (jpeg, w, h) = sample_jpeg();

        rec.write_frame(&jpeg, w, h);
        assert!(!rec.is_recording());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn first_frame_opens_file_with_its_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let (rec, _) = controller(dir.path());
        let (jpeg, w, h) = sample_jpeg();

        rec.request_start();
        rec.write_frame(&jpeg, w, h);
        assert!(rec.is_recording());
        assert_eq!(rec.frames_written(), 1);

        rec.write_frame(&jpeg, w, h);
        assert_eq!(rec.frames_written(), 2);

        rec.request_stop();
        assert!(!rec.is_recording());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn dimension_change_is_skipped_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let (rec, _) = controller(dir.path());
        let (jpeg, w, h) = sample_jpeg();

        rec.request_start();
        rec.write_frame(&jpeg, w, h);
        rec.write_frame(&jpeg, w * 2, h * 2);
        assert_eq!(rec.frames_written(), 1);
        rec.request_stop();
    }

    #[test]
    fn empty_payload_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let (rec, _) = controller(dir.path());

        rec.request_start();
        rec.write_frame(&[], 8, 8);
        assert!(!rec.is_recording());
    }

    #[test]
    fn stop_is_idempotent_and_silent_when_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let (rec, status) = controller(dir.path());

        rec.request_stop();
        rec.request_stop();
        assert!(status.messages().is_empty());
    }

    #[test]
    fn open_failure_disables_recording() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let status = TestStatus::new();
        let rec = RecordingController::new(
            RecordingConfig {
                output_dir: missing,
                fps: 30,
            },
            status.clone(),
        );
        let (jpeg, w, h) = sample_jpeg();

        rec.request_start();
        rec.write_frame(&jpeg, w, h);

        assert!(!rec.is_requested());
        assert!(!rec.is_recording());
        assert!(
            status
                .messages()
                .iter()
                .any(|m| m.contains("could not start recording"))
        );

        // Later frames stay no-ops.
        rec.write_frame(&jpeg, w, h);
        assert!(!rec.is_recording());
    }
}
