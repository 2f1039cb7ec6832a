use crate::models::camera_models::VideoOrientation;
use crate::models::configuration_result::ConfigurationResult;
use crate::session::completion::Completion;

/// Session controls driven by host lifecycle signals.
///
/// Implemented by `CaptureSessionOrchestrator`; `LifecycleBridge` only talks
/// to this interface.
pub trait CaptureControl: Send + Sync {
    /// Run setup (or restart after a stop). Transitions: idle/stopped/failed → … → running.
    fn start(&self) -> Completion<ConfigurationResult>;

    /// Stop frame delivery, keeping the configuration. Transitions: running → stopped.
    fn stop(&self);

    /// Restart a previously configured session without permission requests.
    /// Transitions: stopped → running. A no-op until setup has committed;
    /// that check happens in submission order, after earlier operations.
    fn resume(&self);

    /// Re-add required outputs the hardware dropped. Same setup check as
    /// `resume`.
    fn reattach_outputs(&self);

    fn set_video_orientation(&self, orientation: VideoOrientation);
}
