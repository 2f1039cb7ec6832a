use serde::{Deserialize, Serialize};

/// Physical position of a camera on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    Front,
    Back,
}

impl CameraPosition {
    pub fn opposite(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

/// Flash behavior applied to photo capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    Off,
    On,
    Auto,
}

/// Inputs that can be attached to the capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Video,
    Audio,
}

/// Outputs that can be attached to the capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Photo,
    Movie,
}

/// What the session captures. Fixed for the lifetime of an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    PhotoOnly,
    VideoOnly,
    PhotoAndVideo,
}

impl CaptureMode {
    /// Outputs the session needs for this mode, in attachment order.
    pub fn required_outputs(self) -> &'static [OutputKind] {
        match self {
            Self::PhotoOnly => &[OutputKind::Photo],
            Self::VideoOnly => &[OutputKind::Movie],
            Self::PhotoAndVideo => &[OutputKind::Photo, OutputKind::Movie],
        }
    }

    pub fn allows_output(self, output: OutputKind) -> bool {
        self.required_outputs().contains(&output)
    }

    /// Video modes record sound, so they need the microphone.
    pub fn records_video(self) -> bool {
        matches!(self, Self::VideoOnly | Self::PhotoAndVideo)
    }
}

/// A hardware capability guarded by an OS permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Camera,
    Microphone,
}

/// Resolved permission status for one capability.
///
/// Transitions are monotonic within a process: `Undetermined` resolves once to
/// `Granted` or `Denied` and stays there unless the cache is invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationState {
    Undetermined,
    Granted,
    Denied,
}

impl AuthorizationState {
    pub fn is_resolved(self) -> bool {
        !matches!(self, Self::Undetermined)
    }

    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Orientation applied to video connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

/// A camera the hardware can attach, with its runtime capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    pub id: String,
    pub name: String,
    pub position: CameraPosition,
    /// Flash modes besides `Off`, which every camera supports.
    pub flash_modes: Vec<FlashMode>,
    pub max_zoom_factor: f64,
}

impl CameraDescriptor {
    pub fn supports_flash(&self, mode: FlashMode) -> bool {
        mode == FlashMode::Off || self.flash_modes.contains(&mode)
    }

    pub fn has_flash(&self) -> bool {
        self.flash_modes.iter().any(|m| *m != FlashMode::Off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_outputs_follow_mode() {
        assert_eq!(CaptureMode::PhotoOnly.required_outputs(), &[OutputKind::Photo]);
        assert_eq!(CaptureMode::VideoOnly.required_outputs(), &[OutputKind::Movie]);
        assert_eq!(
            CaptureMode::PhotoAndVideo.required_outputs(),
            &[OutputKind::Photo, OutputKind::Movie]
        );
        assert!(!CaptureMode::PhotoOnly.allows_output(OutputKind::Movie));
    }

    #[test]
    fn only_video_modes_need_microphone() {
        assert!(!CaptureMode::PhotoOnly.records_video());
        assert!(CaptureMode::VideoOnly.records_video());
        assert!(CaptureMode::PhotoAndVideo.records_video());
    }

    #[test]
    fn off_is_always_supported() {
        let camera = CameraDescriptor {
            id: "front".into(),
            name: "Front Camera".into(),
            position: CameraPosition::Front,
            flash_modes: Vec::new(),
            max_zoom_factor: 2.0,
        };
        assert!(camera.supports_flash(FlashMode::Off));
        assert!(!camera.supports_flash(FlashMode::Auto));
        assert!(!camera.has_flash());
    }

    #[test]
    fn serde_names_are_stable() {
        let json = serde_json::to_string(&CaptureMode::PhotoAndVideo).unwrap();
        assert_eq!(json, "\"photo_and_video\"");
        let pos: CameraPosition = serde_json::from_str("\"front\"").unwrap();
        assert_eq!(pos.opposite(), CameraPosition::Back);
    }
}
