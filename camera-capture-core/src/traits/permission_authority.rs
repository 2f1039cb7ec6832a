use crate::models::camera_models::{AuthorizationState, Capability};

/// One-shot reply handle for an OS permission prompt.
///
/// The OS layer calls [`AccessResponder::respond`] once the user answers, from
/// any thread. Dropping the responder without answering abandons the prompt.
pub struct AccessResponder {
    reply: Option<Box<dyn FnOnce(Option<bool>) + Send + 'static>>,
}

impl AccessResponder {
    pub(crate) fn new(reply: impl FnOnce(Option<bool>) + Send + 'static) -> Self {
        Self {
            reply: Some(Box::new(reply)),
        }
    }

    pub fn respond(mut self, granted: bool) {
        if let Some(reply) = self.reply.take() {
            reply(Some(granted));
        }
    }
}

impl Drop for AccessResponder {
    fn drop(&mut self) {
        if let Some(reply) = self.reply.take() {
            reply(None);
        }
    }
}

/// Interface to the OS authorization service for cameras and microphones.
pub trait PermissionAuthority: Send + Sync {
    /// Current OS status without prompting.
    fn authorization_status(&self, capability: Capability) -> AuthorizationState;

    /// Show the system prompt for `capability`.
    ///
    /// May answer inline or later from another thread.
    fn request_access(&self, capability: Capability, responder: AccessResponder);
}
