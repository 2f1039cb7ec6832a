use crate::models::camera_models::{CameraDescriptor, CameraPosition, OutputKind, VideoOrientation};
use crate::models::error::CaptureError;

/// Interface for the platform capture session hardware.
///
/// Implemented by platform backends (AVFoundation, V4L2, ...) and by
/// `VirtualCaptureDevice` for headless use. The orchestrator only ever calls
/// it from its configuration queue, so implementations need `Send` but not
/// `Sync`.
///
/// Mutations between `begin_configuration` and `commit_configuration` are
/// batched by the hardware and become effective together.
pub trait CaptureHardware: Send {
    /// Describe the camera at `position`, or `None` if the device has none.
    fn camera(&self, position: CameraPosition) -> Option<CameraDescriptor>;

    /// Open a configuration batch.
    fn begin_configuration(&mut self);

    /// Close the configuration batch and apply it.
    fn commit_configuration(&mut self) -> Result<(), CaptureError>;

    fn add_video_input(&mut self, position: CameraPosition) -> Result<(), CaptureError>;

    fn remove_video_input(&mut self, position: CameraPosition);

    fn add_audio_input(&mut self) -> Result<(), CaptureError>;

    fn remove_audio_input(&mut self);

    fn add_output(&mut self, output: OutputKind) -> Result<(), CaptureError>;

    fn remove_output(&mut self, output: OutputKind);

    /// Whether the hardware still holds `output`. The OS may drop outputs
    /// while the host application is in the background.
    fn has_output(&self, output: OutputKind) -> bool;

    /// Start frame delivery. Fails if another session holds the hardware.
    fn start_running(&mut self) -> Result<(), CaptureError>;

    fn stop_running(&mut self);

    /// Apply a zoom factor already clamped to the camera's range.
    fn set_zoom_factor(&mut self, position: CameraPosition, factor: f64) -> Result<(), CaptureError>;

    fn set_video_orientation(&mut self, orientation: VideoOrientation);
}
