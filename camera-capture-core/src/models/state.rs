use serde::Serialize;

use super::error::CaptureError;

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → requesting_camera_permission → configuring_session ⇄ requesting_microphone_permission
///                    ↓                          ↓       ↓
///                 failed ←──── (rollback) ──────┘    running ⇄ stopped
/// ```
/// `start()` from `stopped` or `failed` re-enters `requesting_camera_permission`.
/// Teardown moves any phase to `stopped`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "error", rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    RequestingCameraPermission,
    ConfiguringSession,
    RequestingMicrophonePermission,
    Running,
    Failed(CaptureError),
    Stopped,
}

impl SessionPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Phases during which a setup transaction is in flight.
    pub fn is_setting_up(&self) -> bool {
        matches!(
            self,
            Self::RequestingCameraPermission
                | Self::ConfiguringSession
                | Self::RequestingMicrophonePermission
        )
    }

    pub fn error(&self) -> Option<&CaptureError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::camera_models::Capability;

    #[test]
    fn setup_phases() {
        assert!(SessionPhase::RequestingMicrophonePermission.is_setting_up());
        assert!(!SessionPhase::Running.is_setting_up());
        assert!(!SessionPhase::Stopped.is_setting_up());
    }

    #[test]
    fn failed_exposes_error() {
        let phase = SessionPhase::Failed(CaptureError::PermissionDenied(Capability::Camera));
        assert!(phase.is_failed());
        assert_eq!(
            phase.error(),
            Some(&CaptureError::PermissionDenied(Capability::Camera))
        );
        assert_eq!(SessionPhase::Idle.error(), None);
    }

    #[test]
    fn serializes_phase_name() {
        let json = serde_json::to_value(SessionPhase::RequestingCameraPermission).unwrap();
        assert_eq!(json["phase"], "requesting_camera_permission");
    }
}
