//! The orchestrator's state, owned by its configuration queue.
//!
//! Every method here runs on the queue thread. Nothing else touches the
//! hardware or the `DeviceSessionState`; other threads read what
//! `Core::publish` posts to the status board.

use std::sync::Arc;

use crate::models::camera_models::{
    AuthorizationState, CameraDescriptor, CameraPosition, Capability, FlashMode, OutputKind,
    VideoOrientation,
};
use crate::models::config::CameraConfiguration;
use crate::models::configuration_result::{ConfigurationResult, DegradedCapability, MicrophoneIssue};
use crate::models::error::{CameraSwitchError, CaptureError};
use crate::models::state::SessionPhase;
use crate::permission::gate::PermissionGate;
use crate::session::device_state::{clamp_zoom, DeviceSessionState, MIN_ZOOM_FACTOR};
use crate::session::observers::SessionEvent;
use crate::session::snapshot::StatusBoard;
use crate::session::transaction::Transaction;
use crate::traits::capture_hardware::CaptureHardware;

/// Everything but the hardware, so a transaction can hold the hardware
/// while the phase is updated and permissions are awaited.
pub(crate) struct Core {
    gate: PermissionGate,
    config: CameraConfiguration,
    state: DeviceSessionState,
    phase: SessionPhase,
    configured: bool,
    last_result: Option<ConfigurationResult>,
    active_camera: Option<CameraDescriptor>,
    board: Arc<StatusBoard>,
}

impl Core {
    fn enter(&mut self, phase: SessionPhase) {
        if self.phase == phase {
            self.publish();
            return;
        }
        log::info!("Capture session: {:?} -> {:?}", self.phase, phase);
        self.phase = phase.clone();
        self.publish();
        self.board.emit(SessionEvent::PhaseChanged(phase));
    }

    fn publish(&self) {
        self.board.update(|s| {
            s.phase = self.phase.clone();
            s.device = self.state.clone();
            s.configured = self.configured;
            s.last_result = self.last_result.clone();
            s.active_camera = self.active_camera.clone();
        });
    }

    /// Suspend the current step until `capability` resolves.
    fn await_permission(&self, capability: Capability) -> Result<AuthorizationState, CaptureError> {
        let pending = self.gate.request_authorization(capability);
        match self.config.permission_timeout() {
            Some(timeout) => pending.wait_timeout(timeout),
            None => pending.wait(),
        }
    }

    fn max_zoom(&self) -> f64 {
        let device_max = self
            .active_camera
            .as_ref()
            .map_or(MIN_ZOOM_FACTOR, |c| c.max_zoom_factor);
        match self.config.zoom_limit {
            Some(limit) => limit.min(device_max),
            None => device_max,
        }
    }
}

pub(crate) struct Engine {
    hardware: Box<dyn CaptureHardware>,
    core: Core,
}

impl Engine {
    pub(crate) fn new(
        hardware: Box<dyn CaptureHardware>,
        gate: PermissionGate,
        config: CameraConfiguration,
        board: Arc<StatusBoard>,
    ) -> Self {
        let state = DeviceSessionState::new(config.default_camera_position);
        Self {
            hardware,
            core: Core {
                gate,
                config,
                state,
                phase: SessionPhase::Idle,
                configured: false,
                last_result: None,
                active_camera: None,
                board,
            },
        }
    }

    // --- Setup ---

    pub(crate) fn start(&mut self) -> ConfigurationResult {
        if self.core.phase.is_running() {
            log::debug!("start() while running, keeping the current session");
            return self
                .core
                .last_result
                .clone()
                .unwrap_or(ConfigurationResult::Success);
        }

        self.core.enter(SessionPhase::RequestingCameraPermission);
        match self.core.await_permission(Capability::Camera) {
            Ok(AuthorizationState::Granted) => {}
            Ok(_) => return self.fail(CaptureError::PermissionDenied(Capability::Camera)),
            Err(e) => return self.fail(e),
        }

        if self.core.configured {
            return self.run_configured();
        }
        self.configure()
    }

    fn configure(&mut self) -> ConfigurationResult {
        let mode = self.core.config.capture_mode;
        let camera = match self.pick_camera() {
            Ok(camera) => camera,
            Err(e) => return self.fail(e),
        };

        self.core.state.is_configuring = true;
        self.core.enter(SessionPhase::ConfiguringSession);
        let mut tx = Transaction::begin(self.hardware.as_mut(), &self.core.state, mode);

        let attached = tx.attach_video(camera.position).and_then(|()| {
            mode.required_outputs()
                .iter()
                .try_for_each(|output| tx.attach_output(*output))
        });
        if let Err(e) = attached {
            tx.rollback();
            self.core.state.is_configuring = false;
            return self.fail(e);
        }

        let mut audio_issue = None;
        if mode.records_video() {
            self.core.enter(SessionPhase::RequestingMicrophonePermission);
            audio_issue = match self.core.await_permission(Capability::Microphone) {
                Ok(AuthorizationState::Granted) => tx
                    .attach_audio()
                    .err()
                    .map(|e| MicrophoneIssue::AttachFailed(e.to_string())),
                Ok(_) => Some(MicrophoneIssue::PermissionDenied),
                Err(e) => Some(MicrophoneIssue::Unresolved(e.to_string())),
            };
            self.core.enter(SessionPhase::ConfiguringSession);
        }

        match tx.commit() {
            Ok(committed) => self.core.state = committed,
            Err(e) => {
                self.core.state.is_configuring = false;
                return self.fail(e);
            }
        }

        let flash = self.core.config.default_flash_mode;
        self.core.state.flash_mode = if camera.supports_flash(flash) {
            flash
        } else {
            FlashMode::Off
        };
        self.core.active_camera = Some(camera);
        self.core.configured = true;

        let result = match audio_issue {
            Some(issue) => {
                log::warn!("Continuing without audio: {:?}", issue);
                self.core.board.emit(SessionEvent::AudioUnavailable(issue.clone()));
                ConfigurationResult::PartialSuccess(DegradedCapability::AudioUnavailable(issue))
            }
            None => ConfigurationResult::Success,
        };
        self.core.last_result = Some(result);
        self.run_configured()
    }

    /// Start frame delivery on an already configured session.
    fn run_configured(&mut self) -> ConfigurationResult {
        if let Err(e) = self.hardware.start_running() {
            return self.fail(e);
        }
        self.core.state.is_running = true;
        self.apply_parameters();
        self.core.enter(SessionPhase::Running);
        self.core
            .last_result
            .clone()
            .unwrap_or(ConfigurationResult::Success)
    }

    fn pick_camera(&self) -> Result<CameraDescriptor, CaptureError> {
        let preferred = self.core.state.active_camera_position;
        if let Some(camera) = self.hardware.camera(preferred) {
            return Ok(camera);
        }
        if self.core.config.fall_back_to_available_camera {
            if let Some(camera) = self.hardware.camera(preferred.opposite()) {
                log::warn!(
                    "No {:?} camera, falling back to {:?}",
                    preferred,
                    camera.position
                );
                return Ok(camera);
            }
        }
        Err(CaptureError::HardwareUnavailable(format!(
            "no {:?} camera available",
            preferred
        )))
    }

    fn apply_parameters(&mut self) {
        let position = self.core.state.active_camera_position;
        self.hardware
            .set_video_orientation(self.core.state.video_orientation);
        if let Err(e) = self
            .hardware
            .set_zoom_factor(position, self.core.state.zoom_factor)
        {
            log::warn!("Could not restore zoom factor: {}", e);
        }
    }

    fn fail(&mut self, error: CaptureError) -> ConfigurationResult {
        log::error!("Capture session setup failed: {}", error);
        self.release_hardware();
        let result = ConfigurationResult::Failure(error.clone());
        self.core.last_result = Some(result.clone());
        self.core.enter(SessionPhase::Failed(error));
        result
    }

    /// Stop the hardware and detach everything the session holds.
    fn release_hardware(&mut self) {
        if self.core.state.is_running {
            self.hardware.stop_running();
        }
        if !self.core.state.is_empty() {
            let mode = self.core.config.capture_mode;
            let mut tx = Transaction::begin(self.hardware.as_mut(), &self.core.state, mode);
            tx.detach_all();
            if let Err(e) = tx.commit_release() {
                log::error!("Hardware rejected the release batch: {}", e);
            }
        }
        self.core.state.clear();
        self.core.configured = false;
        self.core.active_camera = None;
    }

    // --- Lifecycle ---

    pub(crate) fn stop(&mut self) {
        if !self.core.phase.is_running() {
            log::debug!("stop() ignored in {:?}", self.core.phase);
            return;
        }
        self.hardware.stop_running();
        self.core.state.is_running = false;
        self.core.enter(SessionPhase::Stopped);
    }

    pub(crate) fn resume(&mut self) {
        if !(self.core.phase.is_stopped() && self.core.configured) {
            log::debug!("resume() ignored in {:?}", self.core.phase);
            return;
        }
        if let ConfigurationResult::Failure(e) = self.run_configured() {
            log::warn!("Resume failed: {}", e);
        }
    }

    pub(crate) fn teardown(&mut self) {
        log::info!("Tearing down capture session");
        self.release_hardware();
        self.core.last_result = None;
        self.core.enter(SessionPhase::Stopped);
    }

    pub(crate) fn reattach_outputs(&mut self) {
        if !self.core.configured {
            log::debug!("Skipping output reattachment, setup never completed");
            return;
        }
        let mode = self.core.config.capture_mode;
        let missing: Vec<OutputKind> = mode
            .required_outputs()
            .iter()
            .copied()
            .filter(|output| !self.hardware.has_output(*output))
            .collect();
        if missing.is_empty() {
            return;
        }

        log::info!("Reattaching outputs {:?}", missing);
        let mut tx = Transaction::begin(self.hardware.as_mut(), &self.core.state, mode);
        let mut reattached = Ok(());
        for output in &missing {
            tx.forget_output(*output);
            reattached = tx.attach_output(*output);
            if reattached.is_err() {
                break;
            }
        }
        let committed = match reattached {
            Ok(()) => tx.commit(),
            Err(e) => {
                tx.rollback();
                Err(e)
            }
        };
        match committed {
            Ok(state) => self.core.state = state,
            Err(e) => {
                log::warn!("Could not reattach outputs: {}", e);
                for output in &missing {
                    self.core.state.attached_outputs.remove(output);
                }
            }
        }
        self.core.publish();
    }

    // --- Runtime mutations ---

    pub(crate) fn switch_camera(&mut self) -> Result<(), CameraSwitchError> {
        if !self.core.phase.is_running() {
            return Err(CameraSwitchError::NotRunning);
        }
        let target = self.core.state.active_camera_position.opposite();
        match self.swap_video_input(target) {
            Ok(camera) => {
                self.after_switch(camera);
                log::info!("Switched to {:?} camera", target);
                self.core.board.emit(SessionEvent::CameraSwitched(target));
                Ok(())
            }
            Err(e) => {
                log::warn!("Camera switch failed, staying on {:?}: {}", target.opposite(), e);
                self.core.board.emit(SessionEvent::CameraSwitchFailed(e.clone()));
                Err(e)
            }
        }
    }

    fn swap_video_input(&mut self, target: CameraPosition) -> Result<CameraDescriptor, CameraSwitchError> {
        let camera = self
            .hardware
            .camera(target)
            .ok_or(CameraSwitchError::CameraUnavailable(target))?;

        let mode = self.core.config.capture_mode;
        let mut tx = Transaction::begin(self.hardware.as_mut(), &self.core.state, mode);
        tx.detach_video();
        if let Err(e) = tx.attach_video(target) {
            tx.rollback();
            return Err(switch_error(e));
        }
        self.core.state = tx.commit().map_err(switch_error)?;
        Ok(camera)
    }

    /// Reset zoom and revalidate flash for the camera just switched to.
    fn after_switch(&mut self, camera: CameraDescriptor) {
        if let Err(e) = self.hardware.set_zoom_factor(camera.position, MIN_ZOOM_FACTOR) {
            log::warn!("Could not reset zoom: {}", e);
        }
        self.core.state.zoom_factor = MIN_ZOOM_FACTOR;

        let current = self.core.state.flash_mode;
        if !camera.supports_flash(current) {
            let default = self.core.config.default_flash_mode;
            let fallback = if camera.supports_flash(default) {
                default
            } else {
                FlashMode::Off
            };
            self.core.state.flash_mode = fallback;
            if fallback != current {
                self.core.board.emit(SessionEvent::FlashModeDidChange(fallback));
            }
        }
        self.core.active_camera = Some(camera);
        self.core.publish();
    }

    pub(crate) fn set_flash_mode(&mut self, mode: FlashMode) -> bool {
        if !self.core.phase.is_running() {
            log::debug!("set_flash_mode() ignored in {:?}", self.core.phase);
            return false;
        }
        let supported = self
            .core
            .active_camera
            .as_ref()
            .is_some_and(|c| c.supports_flash(mode));
        if !supported {
            log::debug!("{:?} flash not supported by the active camera", mode);
            return false;
        }
        if self.core.state.flash_mode != mode {
            self.core.state.flash_mode = mode;
            self.core.publish();
            self.core.board.emit(SessionEvent::FlashModeDidChange(mode));
        }
        true
    }

    pub(crate) fn set_zoom_factor(&mut self, factor: f64) {
        if !self.core.phase.is_running() {
            log::debug!("set_zoom_factor() ignored in {:?}", self.core.phase);
            return;
        }
        let zoom = clamp_zoom(factor, self.core.max_zoom());
        let position = self.core.state.active_camera_position;
        match self.hardware.set_zoom_factor(position, zoom) {
            Ok(()) => {
                self.core.state.zoom_factor = zoom;
                self.core.publish();
            }
            Err(e) => log::warn!("Could not apply zoom {}: {}", zoom, e),
        }
    }

    pub(crate) fn set_video_orientation(&mut self, orientation: VideoOrientation) {
        if self.core.state.video_orientation == orientation {
            return;
        }
        self.core.state.video_orientation = orientation;
        if self.core.configured {
            self.hardware.set_video_orientation(orientation);
        }
        self.core.publish();
        self.core.board.emit(SessionEvent::OrientationChanged(orientation));
    }
}

fn switch_error(error: CaptureError) -> CameraSwitchError {
    match error {
        CaptureError::HardwareUnavailable(reason) | CaptureError::ConfigurationFailed(reason) => {
            CameraSwitchError::DeviceBusy(reason)
        }
        CaptureError::SessionClosed => CameraSwitchError::SessionClosed,
        other => CameraSwitchError::DeviceBusy(other.to_string()),
    }
}
