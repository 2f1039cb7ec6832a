use serde::Serialize;
use thiserror::Error;

use super::camera_models::{Capability, CameraPosition};

/// Errors raised while configuring or running the capture session.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CaptureError {
    #[error("{0:?} permission denied")]
    PermissionDenied(Capability),

    #[error("hardware unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("interrupted: {0}")]
    Interrupted(String),

    #[error("capture session closed")]
    SessionClosed,
}

/// What the presentation layer should do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    Retry,
    Degrade,
    OpenSettings,
}

impl CaptureError {
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::PermissionDenied(Capability::Camera) => Recovery::OpenSettings,
            Self::PermissionDenied(Capability::Microphone) => Recovery::Degrade,
            Self::HardwareUnavailable(_)
            | Self::ConfigurationFailed(_)
            | Self::Timeout(_)
            | Self::Interrupted(_)
            | Self::SessionClosed => Recovery::Retry,
        }
    }
}

/// Recoverable failures of `switch_active_camera`.
///
/// None of these stop the session; it keeps running on the previous camera.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CameraSwitchError {
    #[error("session is not running")]
    NotRunning,

    #[error("no {0:?} camera available")]
    CameraUnavailable(CameraPosition),

    #[error("camera busy: {0}")]
    DeviceBusy(String),

    #[error("capture session closed")]
    SessionClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_denial_redirects_to_settings() {
        let err = CaptureError::PermissionDenied(Capability::Camera);
        assert_eq!(err.recovery(), Recovery::OpenSettings);
        assert_eq!(err.to_string(), "Camera permission denied");
    }

    #[test]
    fn microphone_denial_degrades() {
        assert_eq!(
            CaptureError::PermissionDenied(Capability::Microphone).recovery(),
            Recovery::Degrade
        );
        assert_eq!(
            CaptureError::HardwareUnavailable("no camera".into()).recovery(),
            Recovery::Retry
        );
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(CameraSwitchError::CameraUnavailable(CameraPosition::Front))
            .unwrap();
        assert_eq!(json["kind"], "camera_unavailable");
        assert_eq!(json["detail"], "front");
    }
}
