use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::Serialize;

use crate::models::camera_models::{CameraPosition, FlashMode, VideoOrientation};
use crate::models::configuration_result::MicrophoneIssue;
use crate::models::error::CameraSwitchError;
use crate::models::state::SessionPhase;

/// Notifications published by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    FlashModeDidChange(FlashMode),
    CameraSwitched(CameraPosition),
    CameraSwitchFailed(CameraSwitchError),
    AudioUnavailable(MicrophoneIssue),
    OrientationChanged(VideoOrientation),
}

/// An observer's end of the event stream.
///
/// Events are queued here by the configuration queue and handed out only when
/// the subscriber asks, so they are always handled on the subscriber's own
/// thread. Dropping the subscription unregisters it.
#[derive(Debug)]
pub struct Subscription {
    rx: Receiver<SessionEvent>,
}

impl Subscription {
    pub fn try_next(&self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event. `None` on timeout or after
    /// the orchestrator is gone and the queue is drained.
    pub fn next_timeout(&self, timeout: Duration) -> Option<SessionEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Everything queued so far.
    pub fn drain(&self) -> Vec<SessionEvent> {
        self.rx.try_iter().collect()
    }
}

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    senders: Mutex<Vec<Sender<SessionEvent>>>,
}

impl ObserverRegistry {
    pub(crate) fn subscribe(&self) -> Subscription {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.senders.lock().push(tx);
        Subscription { rx }
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        self.senders
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_sees_every_event() {
        let registry = ObserverRegistry::default();
        let a = registry.subscribe();
        let b = registry.subscribe();

        registry.publish(SessionEvent::FlashModeDidChange(FlashMode::Auto));
        registry.publish(SessionEvent::CameraSwitched(CameraPosition::Front));

        let expected = vec![
            SessionEvent::FlashModeDidChange(FlashMode::Auto),
            SessionEvent::CameraSwitched(CameraPosition::Front),
        ];
        assert_eq!(a.drain(), expected);
        assert_eq!(b.drain(), expected);
        assert_eq!(a.try_next(), None);
    }

    #[test]
    fn dropped_subscriptions_are_pruned() {
        let registry = ObserverRegistry::default();
        let kept = registry.subscribe();
        drop(registry.subscribe());
        assert_eq!(registry.len(), 2);

        registry.publish(SessionEvent::OrientationChanged(VideoOrientation::LandscapeLeft));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            kept.next_timeout(Duration::from_millis(10)),
            Some(SessionEvent::OrientationChanged(VideoOrientation::LandscapeLeft))
        );
    }

    #[test]
    fn events_serialize_with_names() {
        let json = serde_json::to_value(SessionEvent::FlashModeDidChange(FlashMode::On)).unwrap();
        assert_eq!(json["event"], "flash_mode_did_change");
        assert_eq!(json["value"], "on");
    }
}
