//! In-process capture hardware with fault injection.
//!
//! Models the pieces of a platform capture session the orchestrator relies on:
//! batched configuration, one video input at a time, optional audio input,
//! photo/movie outputs, and exclusive ownership of the camera hardware across
//! sessions.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::camera_models::{
    CameraDescriptor, CameraPosition, FlashMode, OutputKind, VideoOrientation,
};
use crate::models::error::CaptureError;
use crate::traits::capture_hardware::CaptureHardware;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Failures to inject into the next hardware calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaultPlan {
    /// Outputs the session refuses to add.
    pub reject_outputs: Vec<OutputKind>,
    /// Camera positions whose input cannot be opened.
    pub busy_cameras: Vec<CameraPosition>,
    pub reject_audio_input: bool,
    pub reject_commit: bool,
    pub reject_start: bool,
    pub reject_zoom: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    video_input: Option<CameraPosition>,
    audio_input: bool,
    outputs: BTreeSet<OutputKind>,
    configuring: bool,
    commits: usize,
    running: bool,
    zoom: HashMap<CameraPosition, f64>,
    orientation: VideoOrientation,
    faults: FaultPlan,
}

#[derive(Debug)]
struct Rig {
    cameras: Vec<CameraDescriptor>,
    /// Session currently holding the hardware running.
    owner: Option<u64>,
}

/// Virtual capture session bound to a shared virtual camera rig.
///
/// Clones are handles to the same session, so tests can keep one to inspect
/// the hardware after moving another into the orchestrator.
#[derive(Debug, Clone)]
pub struct VirtualCaptureDevice {
    id: u64,
    rig: Arc<Mutex<Rig>>,
    session: Arc<Mutex<SessionState>>,
}

impl VirtualCaptureDevice {
    /// A phone-like rig: flashless front camera, back camera with flash.
    pub fn new() -> Self {
        Self::with_cameras(vec![
            CameraDescriptor {
                id: "virtual-front".into(),
                name: "Virtual Front Camera".into(),
                position: CameraPosition::Front,
                flash_modes: Vec::new(),
                max_zoom_factor: 4.0,
            },
            CameraDescriptor {
                id: "virtual-back".into(),
                name: "Virtual Back Camera".into(),
                position: CameraPosition::Back,
                flash_modes: vec![FlashMode::On, FlashMode::Auto],
                max_zoom_factor: 10.0,
            },
        ])
    }

    pub fn with_cameras(cameras: Vec<CameraDescriptor>) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            rig: Arc::new(Mutex::new(Rig {
                cameras,
                owner: None,
            })),
            session: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// A second, independent session on the same camera rig.
    pub fn another_session(&self) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            rig: Arc::clone(&self.rig),
            session: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    pub fn set_faults(&self, faults: FaultPlan) {
        self.session.lock().faults = faults;
    }

    /// Remove a camera from the rig, as if unplugged.
    pub fn unplug(&self, position: CameraPosition) {
        self.rig.lock().cameras.retain(|c| c.position != position);
    }

    /// Drop an output the way the OS does while the host app is backgrounded.
    pub fn drop_output(&self, output: OutputKind) {
        self.session.lock().outputs.remove(&output);
    }

    pub fn video_input(&self) -> Option<CameraPosition> {
        self.session.lock().video_input
    }

    pub fn has_audio_input(&self) -> bool {
        self.session.lock().audio_input
    }

    pub fn outputs(&self) -> BTreeSet<OutputKind> {
        self.session.lock().outputs.clone()
    }

    pub fn is_running(&self) -> bool {
        self.session.lock().running
    }

    pub fn is_configuring(&self) -> bool {
        self.session.lock().configuring
    }

    pub fn commit_count(&self) -> usize {
        self.session.lock().commits
    }

    pub fn zoom_factor(&self, position: CameraPosition) -> Option<f64> {
        self.session.lock().zoom.get(&position).copied()
    }

    pub fn orientation(&self) -> VideoOrientation {
        self.session.lock().orientation
    }
}

impl Default for VirtualCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureHardware for VirtualCaptureDevice {
    fn camera(&self, position: CameraPosition) -> Option<CameraDescriptor> {
        self.rig
            .lock()
            .cameras
            .iter()
            .find(|c| c.position == position)
            .cloned()
    }

    fn begin_configuration(&mut self) {
        self.session.lock().configuring = true;
    }

    fn commit_configuration(&mut self) -> Result<(), CaptureError> {
        let mut s = self.session.lock();
        s.configuring = false;
        if s.faults.reject_commit {
            return Err(CaptureError::ConfigurationFailed(
                "session rejected the configuration".into(),
            ));
        }
        s.commits += 1;
        Ok(())
    }

    fn add_video_input(&mut self, position: CameraPosition) -> Result<(), CaptureError> {
        if self.camera(position).is_none() {
            return Err(CaptureError::HardwareUnavailable(format!(
                "no {:?} camera",
                position
            )));
        }
        let mut s = self.session.lock();
        if s.faults.busy_cameras.contains(&position) {
            return Err(CaptureError::HardwareUnavailable(format!(
                "{:?} camera is busy",
                position
            )));
        }
        if s.video_input.is_some() {
            return Err(CaptureError::ConfigurationFailed(
                "session already has a video input".into(),
            ));
        }
        s.video_input = Some(position);
        Ok(())
    }

    fn remove_video_input(&mut self, position: CameraPosition) {
        let mut s = self.session.lock();
        if s.video_input == Some(position) {
            s.video_input = None;
        }
    }

    fn add_audio_input(&mut self) -> Result<(), CaptureError> {
        let mut s = self.session.lock();
        if s.faults.reject_audio_input {
            return Err(CaptureError::HardwareUnavailable(
                "microphone input cannot be added".into(),
            ));
        }
        s.audio_input = true;
        Ok(())
    }

    fn remove_audio_input(&mut self) {
        self.session.lock().audio_input = false;
    }

    fn add_output(&mut self, output: OutputKind) -> Result<(), CaptureError> {
        let mut s = self.session.lock();
        if s.faults.reject_outputs.contains(&output) || s.outputs.contains(&output) {
            return Err(CaptureError::HardwareUnavailable(format!(
                "cannot add {:?} output",
                output
            )));
        }
        s.outputs.insert(output);
        Ok(())
    }

    fn remove_output(&mut self, output: OutputKind) {
        self.session.lock().outputs.remove(&output);
    }

    fn has_output(&self, output: OutputKind) -> bool {
        self.session.lock().outputs.contains(&output)
    }

    fn start_running(&mut self) -> Result<(), CaptureError> {
        let mut rig = self.rig.lock();
        let mut s = self.session.lock();
        if s.faults.reject_start {
            return Err(CaptureError::HardwareUnavailable(
                "session failed to start".into(),
            ));
        }
        match rig.owner {
            Some(owner) if owner != self.id => Err(CaptureError::HardwareUnavailable(
                "camera hardware is in use by another session".into(),
            )),
            _ => {
                rig.owner = Some(self.id);
                s.running = true;
                Ok(())
            }
        }
    }

    fn stop_running(&mut self) {
        let mut rig = self.rig.lock();
        if rig.owner == Some(self.id) {
            rig.owner = None;
        }
        self.session.lock().running = false;
    }

    fn set_zoom_factor(&mut self, position: CameraPosition, factor: f64) -> Result<(), CaptureError> {
        let mut s = self.session.lock();
        if s.faults.reject_zoom {
            return Err(CaptureError::HardwareUnavailable(
                "camera could not be locked for configuration".into(),
            ));
        }
        s.zoom.insert(position, factor);
        Ok(())
    }

    fn set_video_orientation(&mut self, orientation: VideoOrientation) {
        self.session.lock().orientation = orientation;
    }
}
