use std::sync::Arc;

use crate::models::camera_models::{CaptureMode, FlashMode, VideoOrientation};
use crate::models::config::CameraConfiguration;
use crate::models::configuration_result::ConfigurationResult;
use crate::models::error::{CameraSwitchError, CaptureError};
use crate::models::state::SessionPhase;
use crate::permission::gate::PermissionGate;
use crate::session::completion::Completion;
use crate::session::engine::Engine;
use crate::session::observers::Subscription;
use crate::session::queue::SerialQueue;
use crate::session::snapshot::{SessionSnapshot, StatusBoard};
use crate::traits::capture_control::CaptureControl;
use crate::traits::capture_hardware::CaptureHardware;

/// Owns one capture session and serializes everything done to it.
///
/// Every operation is submitted to a private configuration queue and runs
/// there in submission order, so the hardware is never touched from two
/// threads. Calls return immediately; results arrive through a
/// [`Completion`], events through [`subscribe`](Self::subscribe), and the
/// current state through [`snapshot`](Self::snapshot).
///
/// ```text
/// caller thread            configuration queue          OS permission layer
/// ─────────────            ───────────────────          ───────────────────
/// start() ───────────────▶ camera permission ─────────▶ prompt
///                          configure (transaction)  ◀── answer
///                          microphone permission ─────▶ prompt
///                          commit, start running    ◀── answer
/// Completion ◀──────────── ConfigurationResult
/// ```
///
/// Dropping the orchestrator tears the session down on the queue (everything
/// detached, hardware released) and waits for the queue to drain. A setup
/// step blocked on an unanswered prompt holds the drop until the prompt
/// resolves or `permission_timeout_secs` expires.
pub struct CaptureSessionOrchestrator {
    queue: SerialQueue<Engine>,
    board: Arc<StatusBoard>,
    gate: PermissionGate,
    capture_mode: CaptureMode,
}

impl CaptureSessionOrchestrator {
    pub fn new<H: CaptureHardware + 'static>(
        config: CameraConfiguration,
        hardware: H,
        gate: PermissionGate,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;

        let board = Arc::new(StatusBoard::new(SessionSnapshot::new(&config)));
        let capture_mode = config.capture_mode;
        let engine = Engine::new(Box::new(hardware), gate.clone(), config, Arc::clone(&board));
        let queue = SerialQueue::spawn("capture-session-queue", engine)?;

        log::info!(
            "Capture session {} created ({:?})",
            board.snapshot().session_id,
            capture_mode
        );
        Ok(Self {
            queue,
            board,
            gate,
            capture_mode,
        })
    }

    /// Request permissions, configure, and start running.
    ///
    /// From `Running` the previous result is returned unchanged. From
    /// `Stopped` the existing configuration is restarted after checking the
    /// cached camera permission. From `Failed` setup is retried.
    pub fn start(&self) -> Completion<ConfigurationResult> {
        self.queue.submit_with_reply(Engine::start)
    }

    /// Stop frame delivery. The configuration is kept for `resume`/`start`.
    pub fn stop(&self) {
        self.fire("stop", Engine::stop);
    }

    /// Restart a configured, stopped session without asking for permissions.
    pub fn resume(&self) {
        self.fire("resume", Engine::resume);
    }

    /// Re-add required outputs the hardware dropped while backgrounded.
    pub fn reattach_outputs(&self) {
        self.fire("reattach_outputs", Engine::reattach_outputs);
    }

    /// Swap the video input to the opposite camera.
    ///
    /// On failure the session keeps running on the previous camera.
    pub fn switch_active_camera(&self) -> Completion<Result<(), CameraSwitchError>> {
        self.queue.submit_with_reply(Engine::switch_camera)
    }

    /// Apply `mode` if the active camera supports it.
    ///
    /// Waits for operations queued before it. Returns `false`, changing
    /// nothing, when the mode is unsupported or the session is not running.
    /// While setup is in progress (possibly waiting on a permission prompt)
    /// it answers `false` from the published snapshot instead of waiting.
    pub fn set_flash_mode(&self, mode: FlashMode) -> bool {
        let phase = self.phase();
        if phase.is_setting_up() {
            log::debug!("set_flash_mode() during {:?}, not waiting for setup", phase);
            return false;
        }
        self.queue
            .submit_with_reply(move |engine| engine.set_flash_mode(mode))
            .wait()
            .unwrap_or(false)
    }

    /// Set the zoom, clamped into `[1.0, max]` for the active camera.
    pub fn set_zoom_factor(&self, factor: f64) {
        self.fire("set_zoom_factor", move |engine| engine.set_zoom_factor(factor));
    }

    pub fn set_video_orientation(&self, orientation: VideoOrientation) {
        self.fire("set_video_orientation", move |engine| {
            engine.set_video_orientation(orientation)
        });
    }

    /// Register for session events. Drop the subscription to unregister.
    pub fn subscribe(&self) -> Subscription {
        self.board.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.board.observer_count()
    }

    /// State as of the last completed queue step.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.board.snapshot()
    }

    pub fn phase(&self) -> SessionPhase {
        self.board.snapshot().phase
    }

    pub fn is_configured(&self) -> bool {
        self.board.snapshot().configured
    }

    pub fn flash_mode(&self) -> FlashMode {
        self.board.snapshot().device.flash_mode
    }

    pub fn capture_mode(&self) -> CaptureMode {
        self.capture_mode
    }

    pub fn permission_gate(&self) -> &PermissionGate {
        &self.gate
    }

    /// Completes once every operation submitted before it has run.
    pub fn flush(&self) -> Completion<()> {
        self.queue.submit_with_reply(|_| ())
    }

    /// Tear the session down and wait for the queue to finish.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn fire(&self, operation: &str, job: impl FnOnce(&mut Engine) + Send + 'static) {
        if let Err(e) = self.queue.submit(job) {
            log::warn!("{}() dropped: {}", operation, e);
        }
    }

    fn close(&mut self) {
        if !self.queue.is_open() {
            return;
        }
        self.fire("teardown", Engine::teardown);
        self.queue.shutdown();
    }
}

impl Drop for CaptureSessionOrchestrator {
    fn drop(&mut self) {
        self.close();
    }
}

impl CaptureControl for CaptureSessionOrchestrator {
    fn start(&self) -> Completion<ConfigurationResult> {
        CaptureSessionOrchestrator::start(self)
    }

    fn stop(&self) {
        CaptureSessionOrchestrator::stop(self)
    }

    fn resume(&self) {
        CaptureSessionOrchestrator::resume(self)
    }

    fn reattach_outputs(&self) {
        CaptureSessionOrchestrator::reattach_outputs(self)
    }

    fn set_video_orientation(&self, orientation: VideoOrientation) {
        CaptureSessionOrchestrator::set_video_orientation(self, orientation)
    }
}
