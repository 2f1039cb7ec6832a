use parking_lot::Mutex;
use serde::Serialize;

use crate::models::camera_models::{CameraDescriptor, CaptureMode};
use crate::models::config::CameraConfiguration;
use crate::models::configuration_result::ConfigurationResult;
use crate::models::state::SessionPhase;
use crate::session::device_state::DeviceSessionState;
use crate::session::observers::{ObserverRegistry, SessionEvent, Subscription};

/// Read-only view of the session for the presentation layer.
///
/// Published by the configuration queue between operations, never in the
/// middle of one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub created_at: String,
    pub capture_mode: CaptureMode,
    pub phase: SessionPhase,
    pub device: DeviceSessionState,
    /// Initial setup has committed and not been torn down since.
    pub configured: bool,
    pub last_result: Option<ConfigurationResult>,
    /// Capabilities of the attached camera, if any.
    pub active_camera: Option<CameraDescriptor>,
}

impl SessionSnapshot {
    pub(crate) fn new(config: &CameraConfiguration) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            capture_mode: config.capture_mode,
            phase: SessionPhase::Idle,
            device: DeviceSessionState::new(config.default_camera_position),
            configured: false,
            last_result: None,
            active_camera: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.device.is_running
    }

    /// Whether the attached camera has a flash at all.
    pub fn flash_available(&self) -> bool {
        self.active_camera.as_ref().is_some_and(|c| c.has_flash())
    }
}

/// Where the configuration queue posts snapshots and events for other
/// threads.
pub(crate) struct StatusBoard {
    snapshot: Mutex<SessionSnapshot>,
    observers: ObserverRegistry,
}

impl StatusBoard {
    pub(crate) fn new(snapshot: SessionSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            observers: ObserverRegistry::default(),
        }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.lock().clone()
    }

    pub(crate) fn update(&self, apply: impl FnOnce(&mut SessionSnapshot)) {
        apply(&mut self.snapshot.lock());
    }

    pub(crate) fn subscribe(&self) -> Subscription {
        self.observers.subscribe()
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        self.observers.publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::camera_models::{CameraPosition, FlashMode};

    #[test]
    fn new_snapshot_is_idle_and_unconfigured() {
        let snapshot = SessionSnapshot::new(&CameraConfiguration::with_mode(CaptureMode::PhotoOnly));
        assert_eq!(snapshot.phase, SessionPhase::Idle);
        assert!(!snapshot.configured);
        assert!(!snapshot.is_running());
        assert!(!snapshot.flash_available());
        assert_eq!(snapshot.capture_mode, CaptureMode::PhotoOnly);
        assert!(uuid::Uuid::parse_str(&snapshot.session_id).is_ok());
    }

    #[test]
    fn flash_available_follows_active_camera() {
        let board = StatusBoard::new(SessionSnapshot::new(&CameraConfiguration::default()));
        board.update(|s| {
            s.active_camera = Some(CameraDescriptor {
                id: "back".into(),
                name: "Back".into(),
                position: CameraPosition::Back,
                flash_modes: vec![FlashMode::On],
                max_zoom_factor: 8.0,
            })
        });
        assert!(board.snapshot().flash_available());
    }

    #[test]
    fn serializes_for_the_presentation_layer() {
        let snapshot = SessionSnapshot::new(&CameraConfiguration::default());
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["phase"]["phase"], "idle");
        assert_eq!(json["capture_mode"], "photo_and_video");
        assert_eq!(json["device"]["zoom_factor"], 1.0);
    }
}
