//! In-process permission authority with scripted user answers.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::models::camera_models::{AuthorizationState, Capability};
use crate::traits::permission_authority::{AccessResponder, PermissionAuthority};

#[derive(Debug, Clone, Copy)]
enum PromptPolicy {
    /// Answer every prompt inline with the scripted choice.
    Answer { camera: bool, microphone: bool },
    /// Hold prompts until `answer` or `abandon` is called.
    Deferred,
}

struct Inner {
    policy: PromptPolicy,
    statuses: HashMap<Capability, AuthorizationState>,
    pending: HashMap<Capability, Vec<AccessResponder>>,
    prompts: HashMap<Capability, usize>,
}

/// Permission authority that plays the user's part.
///
/// Statuses start `Undetermined` so the first request prompts. Answers are
/// written back to the status table the way the OS remembers them.
pub struct VirtualPermissionAuthority {
    inner: Mutex<Inner>,
    prompted: Condvar,
}

impl VirtualPermissionAuthority {
    fn with_policy(policy: PromptPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner {
                policy,
                statuses: HashMap::new(),
                pending: HashMap::new(),
                prompts: HashMap::new(),
            }),
            prompted: Condvar::new(),
        }
    }

    /// The user allows everything.
    pub fn granting() -> Self {
        Self::answering(true, true)
    }

    /// The user refuses everything.
    pub fn denying() -> Self {
        Self::answering(false, false)
    }

    pub fn answering(camera: bool, microphone: bool) -> Self {
        Self::with_policy(PromptPolicy::Answer { camera, microphone })
    }

    /// Prompts stay open until the test answers them.
    pub fn deferred() -> Self {
        Self::with_policy(PromptPolicy::Deferred)
    }

    /// Set the OS-level status, as if changed in system settings.
    pub fn preset(&self, capability: Capability, state: AuthorizationState) {
        self.inner.lock().statuses.insert(capability, state);
    }

    pub fn prompt_count(&self, capability: Capability) -> usize {
        self.inner.lock().prompts.get(&capability).copied().unwrap_or(0)
    }

    /// Block until a prompt for `capability` is open.
    pub fn wait_for_prompt(&self, capability: Capability, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if inner.pending.get(&capability).is_some_and(|p| !p.is_empty()) {
                return true;
            }
            if self.prompted.wait_until(&mut inner, deadline).timed_out() {
                return inner.pending.get(&capability).is_some_and(|p| !p.is_empty());
            }
        }
    }

    /// Answer the open prompts for `capability`. Returns false if none is open.
    pub fn answer(&self, capability: Capability, granted: bool) -> bool {
        let responders = {
            let mut inner = self.inner.lock();
            let state = if granted {
                AuthorizationState::Granted
            } else {
                AuthorizationState::Denied
            };
            inner.statuses.insert(capability, state);
            inner.pending.remove(&capability).unwrap_or_default()
        };
        let answered = !responders.is_empty();
        for responder in responders {
            responder.respond(granted);
        }
        answered
    }

    /// Dismiss the open prompts without an answer.
    pub fn abandon(&self, capability: Capability) -> bool {
        let responders = self.inner.lock().pending.remove(&capability).unwrap_or_default();
        let abandoned = !responders.is_empty();
        drop(responders);
        abandoned
    }
}

impl PermissionAuthority for VirtualPermissionAuthority {
    fn authorization_status(&self, capability: Capability) -> AuthorizationState {
        self.inner
            .lock()
            .statuses
            .get(&capability)
            .copied()
            .unwrap_or(AuthorizationState::Undetermined)
    }

    fn request_access(&self, capability: Capability, responder: AccessResponder) {
        let answer = {
            let mut inner = self.inner.lock();
            *inner.prompts.entry(capability).or_insert(0) += 1;
            match inner.policy {
                PromptPolicy::Answer { camera, microphone } => {
                    let granted = match capability {
                        Capability::Camera => camera,
                        Capability::Microphone => microphone,
                    };
                    let state = if granted {
                        AuthorizationState::Granted
                    } else {
                        AuthorizationState::Denied
                    };
                    inner.statuses.insert(capability, state);
                    Some(granted)
                }
                PromptPolicy::Deferred => {
                    inner.pending.entry(capability).or_default().push(responder);
                    self.prompted.notify_all();
                    return;
                }
            }
        };
        if let Some(granted) = answer {
            responder.respond(granted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::permission::gate::PermissionGate;

    #[test]
    fn scripted_answers_update_os_status() {
        let authority = Arc::new(VirtualPermissionAuthority::answering(true, false));
        let gate = PermissionGate::new(authority.clone());

        assert_eq!(
            gate.request_authorization(Capability::Microphone).wait(),
            Ok(AuthorizationState::Denied)
        );
        assert_eq!(
            authority.authorization_status(Capability::Microphone),
            AuthorizationState::Denied
        );
        assert_eq!(
            authority.authorization_status(Capability::Camera),
            AuthorizationState::Undetermined
        );
    }

    #[test]
    fn answer_without_prompt_reports_false() {
        let authority = VirtualPermissionAuthority::deferred();
        assert!(!authority.answer(Capability::Camera, true));
        assert!(!authority.abandon(Capability::Camera));
        assert!(!authority.wait_for_prompt(Capability::Camera, Duration::from_millis(10)));
    }
}
