//! Host lifecycle signals translated into session controls.
//!
//! The bridge keeps its own model of the host (view loaded, visible or
//! hidden, app in background) and decides each action from that model
//! alone:
//!
//! ```text
//! signal                 action
//! ──────                 ──────
//! view_did_load          start (once)
//! ViewDidAppear          resume
//! ViewDidDisappear       stop, if loaded
//! DidEnterBackground     none (the OS interrupts the session itself)
//! WillEnterForeground    reattach outputs
//! orientation change     set video orientation
//! ```
//!
//! Whether setup has committed is checked by the session when the forwarded
//! call reaches its queue, so a signal that arrives while setup is still
//! waiting on a prompt is applied after setup, in order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;

use crate::models::camera_models::VideoOrientation;
use crate::models::configuration_result::ConfigurationResult;
use crate::models::error::CaptureError;
use crate::session::completion::Completion;
use crate::traits::capture_control::CaptureControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "signal", content = "orientation", rename_all = "snake_case")]
pub enum HostSignal {
    ViewDidAppear,
    ViewDidDisappear,
    WillEnterForeground,
    DidEnterBackground,
    DeviceOrientationChanged(VideoOrientation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewState {
    Unloaded,
    Visible,
    Hidden,
}

/// The bridge's view of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostState {
    pub view: ViewState,
    pub in_background: bool,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            view: ViewState::Unloaded,
            in_background: false,
        }
    }
}

/// What the bridge asked the session to do for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "orientation", rename_all = "snake_case")]
pub enum BridgeAction {
    Resume,
    Stop,
    ReattachOutputs,
    SetOrientation(VideoOrientation),
    Ignore,
}

/// Next host state and the action for `signal`.
pub fn plan(state: HostState, signal: HostSignal) -> (HostState, BridgeAction) {
    match signal {
        HostSignal::ViewDidAppear => (
            HostState {
                view: ViewState::Visible,
                ..state
            },
            BridgeAction::Resume,
        ),
        HostSignal::ViewDidDisappear => match state.view {
            ViewState::Unloaded => (state, BridgeAction::Ignore),
            ViewState::Visible | ViewState::Hidden => (
                HostState {
                    view: ViewState::Hidden,
                    ..state
                },
                BridgeAction::Stop,
            ),
        },
        HostSignal::DidEnterBackground => (
            HostState {
                in_background: true,
                ..state
            },
            BridgeAction::Ignore,
        ),
        HostSignal::WillEnterForeground => (
            HostState {
                in_background: false,
                ..state
            },
            BridgeAction::ReattachOutputs,
        ),
        HostSignal::DeviceOrientationChanged(orientation) => {
            (state, BridgeAction::SetOrientation(orientation))
        }
    }
}

/// Forwards host lifecycle signals to a session without owning it.
///
/// Holds only a weak reference, so the host dropping its session is never
/// delayed by the bridge. Signals arriving after that are reported as
/// `CaptureError::SessionClosed`.
pub struct LifecycleBridge<C: CaptureControl + ?Sized> {
    control: Weak<C>,
    state: Mutex<HostState>,
    setup_requested: AtomicBool,
}

impl<C: CaptureControl + ?Sized> LifecycleBridge<C> {
    pub fn new(control: &Arc<C>) -> Self {
        Self {
            control: Arc::downgrade(control),
            state: Mutex::new(HostState::default()),
            setup_requested: AtomicBool::new(false),
        }
    }

    /// The host view loaded: run setup once.
    ///
    /// Later calls return a completion that fails with `Interrupted`; use the
    /// session's own `start` to retry after a failure.
    pub fn view_did_load(&self) -> Result<Completion<ConfigurationResult>, CaptureError> {
        let control = self.control()?;
        if self.setup_requested.swap(true, Ordering::SeqCst) {
            log::debug!("view_did_load() repeated, setup already requested");
            return Ok(Completion::failed(CaptureError::Interrupted(
                "setup already requested".into(),
            )));
        }
        self.state.lock().view = ViewState::Visible;
        Ok(control.start())
    }

    pub fn handle(&self, signal: HostSignal) -> Result<BridgeAction, CaptureError> {
        let control = self.control()?;
        let action = {
            let mut state = self.state.lock();
            let (next, action) = plan(*state, signal);
            *state = next;
            action
        };
        log::debug!("{:?} -> {:?}", signal, action);

        match action {
            BridgeAction::Resume => control.resume(),
            BridgeAction::Stop => control.stop(),
            BridgeAction::ReattachOutputs => control.reattach_outputs(),
            BridgeAction::SetOrientation(orientation) => control.set_video_orientation(orientation),
            BridgeAction::Ignore => {}
        }
        Ok(action)
    }

    pub fn host_state(&self) -> HostState {
        *self.state.lock()
    }

    /// Whether the session is still alive.
    pub fn is_attached(&self) -> bool {
        self.control.strong_count() > 0
    }

    fn control(&self) -> Result<Arc<C>, CaptureError> {
        self.control.upgrade().ok_or_else(|| {
            log::debug!("Lifecycle signal after the capture session was dropped");
            CaptureError::SessionClosed
        })
    }
}
