use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::camera_models::{
    CameraPosition, FlashMode, InputKind, OutputKind, VideoOrientation,
};

pub const MIN_ZOOM_FACTOR: f64 = 1.0;

/// What the capture session currently has attached, and its runtime
/// parameters.
///
/// Owned by the orchestrator's configuration queue; everyone else sees
/// clones published after each operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSessionState {
    pub is_configuring: bool,
    pub attached_inputs: BTreeSet<InputKind>,
    pub attached_outputs: BTreeSet<OutputKind>,
    pub active_camera_position: CameraPosition,
    pub flash_mode: FlashMode,
    pub zoom_factor: f64,
    pub is_running: bool,
    pub video_orientation: VideoOrientation,
}

impl DeviceSessionState {
    pub fn new(position: CameraPosition) -> Self {
        Self {
            is_configuring: false,
            attached_inputs: BTreeSet::new(),
            attached_outputs: BTreeSet::new(),
            active_camera_position: position,
            flash_mode: FlashMode::Off,
            zoom_factor: MIN_ZOOM_FACTOR,
            is_running: false,
            video_orientation: VideoOrientation::default(),
        }
    }

    pub fn has_input(&self, input: InputKind) -> bool {
        self.attached_inputs.contains(&input)
    }

    pub fn has_output(&self, output: OutputKind) -> bool {
        self.attached_outputs.contains(&output)
    }

    pub fn is_empty(&self) -> bool {
        self.attached_inputs.is_empty() && self.attached_outputs.is_empty()
    }

    /// Forget every attachment and runtime parameter except the camera
    /// position and orientation.
    pub fn clear(&mut self) {
        self.is_configuring = false;
        self.attached_inputs.clear();
        self.attached_outputs.clear();
        self.flash_mode = FlashMode::Off;
        self.zoom_factor = MIN_ZOOM_FACTOR;
        self.is_running = false;
    }
}

/// Clamp a requested zoom factor into `[1.0, max_zoom]`.
///
/// NaN requests fall back to 1.0.
pub fn clamp_zoom(factor: f64, max_zoom: f64) -> f64 {
    let max_zoom = max_zoom.max(MIN_ZOOM_FACTOR);
    if factor.is_nan() {
        return MIN_ZOOM_FACTOR;
    }
    factor.clamp(MIN_ZOOM_FACTOR, max_zoom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn starts_empty_and_stopped() {
        let state = DeviceSessionState::new(CameraPosition::Back);
        assert!(state.is_empty());
        assert!(!state.is_running);
        assert!(!state.is_configuring);
        assert_relative_eq!(state.zoom_factor, 1.0);
    }

    #[test]
    fn clear_keeps_position() {
        let mut state = DeviceSessionState::new(CameraPosition::Front);
        state.attached_inputs.insert(InputKind::Video);
        state.attached_outputs.insert(OutputKind::Photo);
        state.flash_mode = FlashMode::Auto;
        state.zoom_factor = 3.0;
        state.is_running = true;

        state.clear();

        assert!(state.is_empty());
        assert!(!state.is_running);
        assert_eq!(state.flash_mode, FlashMode::Off);
        assert_eq!(state.active_camera_position, CameraPosition::Front);
    }

    #[test]
    fn clamps_to_nearest_bound() {
        assert_relative_eq!(clamp_zoom(0.2, 5.0), 1.0);
        assert_relative_eq!(clamp_zoom(-3.0, 5.0), 1.0);
        assert_relative_eq!(clamp_zoom(12.0, 5.0), 5.0);
        assert_relative_eq!(clamp_zoom(f64::INFINITY, 5.0), 5.0);
        assert_relative_eq!(clamp_zoom(f64::NAN, 5.0), 1.0);
    }

    #[test]
    fn in_range_is_exact() {
        for factor in [1.0, 1.5, 2.25, 4.999, 5.0] {
            assert_eq!(clamp_zoom(factor, 5.0), factor);
        }
    }

    #[test]
    fn degenerate_max_pins_to_one() {
        assert_relative_eq!(clamp_zoom(3.0, 0.5), 1.0);
    }
}
