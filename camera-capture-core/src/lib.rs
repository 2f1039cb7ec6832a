//! # camera-capture-core
//!
//! Platform-agnostic camera capture session orchestration.
//!
//! Sequences permission prompts, session configuration and runtime changes
//! (camera switch, flash, zoom, orientation) on a single serial queue, so the
//! capture hardware is never mutated from two threads and every failure
//! leaves the session either running or fully torn down. Platform backends
//! implement `CaptureHardware` and `PermissionAuthority`; the `backends`
//! module ships in-process versions of both.
//!
//! ## Architecture
//!
//! ```text
//! camera-capture-core (this crate)
//! ├── traits/       ← CaptureHardware, PermissionAuthority, CaptureControl
//! ├── models/       ← CaptureError, SessionPhase, CameraConfiguration, ConfigurationResult, etc.
//! ├── permission/   ← PermissionGate (memoized, coalesced authorization)
//! ├── session/      ← CaptureSessionOrchestrator, DeviceSessionState, Completion, events
//! ├── lifecycle/    ← LifecycleBridge (host signals → session controls)
//! └── backends/     ← VirtualCaptureDevice, VirtualPermissionAuthority
//! ```

pub mod backends;
pub mod lifecycle;
pub mod models;
pub mod permission;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use backends::virtual_device::{FaultPlan, VirtualCaptureDevice};
pub use backends::virtual_permissions::VirtualPermissionAuthority;
pub use lifecycle::bridge::{BridgeAction, HostSignal, HostState, LifecycleBridge, ViewState};
pub use models::camera_models::{
    AuthorizationState, CameraDescriptor, CameraPosition, Capability, CaptureMode, FlashMode,
    InputKind, OutputKind, VideoOrientation,
};
pub use models::config::CameraConfiguration;
pub use models::configuration_result::{ConfigurationResult, DegradedCapability, MicrophoneIssue};
pub use models::error::{CameraSwitchError, CaptureError, Recovery};
pub use models::state::SessionPhase;
pub use permission::gate::PermissionGate;
pub use session::completion::Completion;
pub use session::device_state::DeviceSessionState;
pub use session::observers::{SessionEvent, Subscription};
pub use session::orchestrator::CaptureSessionOrchestrator;
pub use session::snapshot::SessionSnapshot;
pub use traits::capture_control::CaptureControl;
pub use traits::capture_hardware::CaptureHardware;
pub use traits::permission_authority::{AccessResponder, PermissionAuthority};
