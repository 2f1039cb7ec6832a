use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::camera_models::{CameraPosition, CaptureMode, FlashMode};
use super::error::CaptureError;

/// Configuration for a capture session orchestrator.
///
/// Immutable once handed to the orchestrator. Missing JSON fields take their
/// default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfiguration {
    /// Which outputs the session needs (default: photo and video).
    pub capture_mode: CaptureMode,

    /// Camera used for initial setup (default: back).
    pub default_camera_position: CameraPosition,

    /// Flash mode reapplied after a camera switch when the current mode is
    /// not supported by the new camera (default: off).
    pub default_flash_mode: FlashMode,

    /// Upper zoom bound below the device maximum (None = device maximum).
    pub zoom_limit: Option<f64>,

    /// How long setup waits for a permission prompt (None = no limit).
    pub permission_timeout_secs: Option<f64>,

    /// Use the opposite camera when the default position has none.
    pub fall_back_to_available_camera: bool,
}

impl CameraConfiguration {
    pub fn with_mode(capture_mode: CaptureMode) -> Self {
        Self {
            capture_mode,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(limit) = self.zoom_limit {
            if !limit.is_finite() || limit < 1.0 {
                return Err(format!("zoom limit must be at least 1.0, got {}", limit));
            }
        }
        if let Some(secs) = self.permission_timeout_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(format!("permission timeout must be positive, got {}", secs));
            }
        }
        Ok(())
    }

    pub fn permission_timeout(&self) -> Option<Duration> {
        self.permission_timeout_secs.map(Duration::from_secs_f64)
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            CaptureError::ConfigurationFailed(format!("failed to parse configuration: {}", e))
        })?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, CaptureError> {
        let json = fs::read_to_string(path).map_err(|e| {
            CaptureError::ConfigurationFailed(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&json)
    }
}

impl Default for CameraConfiguration {
    fn default() -> Self {
        Self {
            capture_mode: CaptureMode::PhotoAndVideo,
            default_camera_position: CameraPosition::Back,
            default_flash_mode: FlashMode::Off,
            zoom_limit: None,
            permission_timeout_secs: None,
            fall_back_to_available_camera: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CameraConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture_mode, CaptureMode::PhotoAndVideo);
        assert_eq!(config.permission_timeout(), None);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            CameraConfiguration::from_json_str(r#"{"capture_mode":"video_only","zoom_limit":4.0}"#)
                .unwrap();
        assert_eq!(config.capture_mode, CaptureMode::VideoOnly);
        assert_eq!(config.zoom_limit, Some(4.0));
        assert_eq!(config.default_camera_position, CameraPosition::Back);
        assert!(config.fall_back_to_available_camera);
    }

    #[test]
    fn rejects_bad_values() {
        let config = CameraConfiguration {
            zoom_limit: Some(0.5),
            ..CameraConfiguration::default()
        };
        assert!(config.validate().is_err());

        let err = CameraConfiguration::from_json_str(r#"{"permission_timeout_secs":0}"#).unwrap_err();
        assert!(matches!(err, CaptureError::ConfigurationFailed(_)));
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        let err = CameraConfiguration::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, CaptureError::ConfigurationFailed(_)));
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = CameraConfiguration::load(Path::new("/nonexistent/camera.json")).unwrap_err();
        assert!(matches!(err, CaptureError::ConfigurationFailed(_)));
    }
}
