//! Memoized, coalescing access to OS camera and microphone authorization.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::camera_models::{AuthorizationState, Capability};
use crate::models::error::CaptureError;
use crate::session::completion::{completion, Completer, Completion};
use crate::traits::permission_authority::{AccessResponder, PermissionAuthority};

enum Slot {
    Resolved(AuthorizationState),
    Prompting(Vec<Completer<AuthorizationState>>),
}

/// Single owner of the process-wide authorization cache.
///
/// Cloning shares the cache. Each capability resolves at most once per
/// process unless [`PermissionGate::invalidate`] is called; concurrent requests
/// during an outstanding prompt all receive that prompt's answer.
#[derive(Clone)]
pub struct PermissionGate {
    authority: Arc<dyn PermissionAuthority>,
    slots: Arc<Mutex<HashMap<Capability, Slot>>>,
}

impl PermissionGate {
    pub fn new(authority: Arc<dyn PermissionAuthority>) -> Self {
        Self {
            authority,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Ask for `capability`, prompting the user at most once.
    ///
    /// Never blocks: cached answers are placed in the returned completion,
    /// undetermined ones arrive when the user responds.
    pub fn request_authorization(&self, capability: Capability) -> Completion<AuthorizationState> {
        let (completer, pending) = completion();

        {
            let mut slots = self.slots.lock();
            match slots.get_mut(&capability) {
                Some(Slot::Resolved(state)) => {
                    completer.complete(*state);
                    return pending;
                }
                Some(Slot::Prompting(waiters)) => {
                    log::debug!("{:?} prompt already showing, joining it", capability);
                    waiters.push(completer);
                    return pending;
                }
                None => {}
            }

            let status = self.authority.authorization_status(capability);
            if status.is_resolved() {
                slots.insert(capability, Slot::Resolved(status));
                completer.complete(status);
                return pending;
            }
            slots.insert(capability, Slot::Prompting(vec![completer]));
        }

        log::info!("Requesting {:?} access from the user", capability);
        let slots = Arc::clone(&self.slots);
        let responder = AccessResponder::new(move |answer| resolve(&slots, capability, answer));
        self.authority.request_access(capability, responder);
        pending
    }

    /// Cached state, `Undetermined` while unknown or prompting.
    pub fn cached_state(&self, capability: Capability) -> AuthorizationState {
        match self.slots.lock().get(&capability) {
            Some(Slot::Resolved(state)) => *state,
            _ => AuthorizationState::Undetermined,
        }
    }

    /// Forget a resolved answer so the next request re-queries the OS.
    ///
    /// Used after redirecting the user to settings. Outstanding prompts are
    /// left alone.
    pub fn invalidate(&self, capability: Capability) {
        let mut slots = self.slots.lock();
        if let Some(Slot::Resolved(_)) = slots.get(&capability) {
            slots.remove(&capability);
        }
    }
}

fn resolve(
    slots: &Mutex<HashMap<Capability, Slot>>,
    capability: Capability,
    answer: Option<bool>,
) {
    let state = answer.map(|granted| {
        if granted {
            AuthorizationState::Granted
        } else {
            AuthorizationState::Denied
        }
    });

    let waiters = {
        let mut slots = slots.lock();
        let waiters = match slots.remove(&capability) {
            Some(Slot::Prompting(waiters)) => waiters,
            Some(resolved @ Slot::Resolved(_)) => {
                // Answers never overwrite a resolved state.
                slots.insert(capability, resolved);
                return;
            }
            None => return,
        };
        if let Some(state) = state {
            slots.insert(capability, Slot::Resolved(state));
        }
        waiters
    };

    match state {
        Some(state) => {
            log::info!("{:?} access resolved: {:?}", capability, state);
            for waiter in waiters {
                waiter.complete(state);
            }
        }
        None => {
            log::warn!("{:?} prompt abandoned without an answer", capability);
            for waiter in waiters {
                waiter.fail(CaptureError::Interrupted(format!(
                    "{:?} prompt abandoned",
                    capability
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_permissions::VirtualPermissionAuthority;
    use std::thread;

    #[test]
    fn resolved_os_state_never_prompts() {
        let authority = Arc::new(VirtualPermissionAuthority::granting());
        authority.preset(Capability::Camera, AuthorizationState::Denied);
        let gate = PermissionGate::new(authority.clone());

        assert_eq!(
            gate.request_authorization(Capability::Camera).wait(),
            Ok(AuthorizationState::Denied)
        );
        assert_eq!(authority.prompt_count(Capability::Camera), 0);
    }

    #[test]
    fn undetermined_prompts_once_then_caches() {
        let authority = Arc::new(VirtualPermissionAuthority::granting());
        let gate = PermissionGate::new(authority.clone());

        for _ in 0..3 {
            assert_eq!(
                gate.request_authorization(Capability::Microphone).wait(),
                Ok(AuthorizationState::Granted)
            );
        }
        assert_eq!(authority.prompt_count(Capability::Microphone), 1);
        assert_eq!(gate.cached_state(Capability::Microphone), AuthorizationState::Granted);
    }

    #[test]
    fn concurrent_requests_coalesce_into_one_prompt() {
        let authority = Arc::new(VirtualPermissionAuthority::deferred());
        let gate = PermissionGate::new(authority.clone());

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let gate = gate.clone();
                thread::spawn(move || gate.request_authorization(Capability::Camera).wait())
            })
            .collect();

        assert!(authority.wait_for_prompt(Capability::Camera, std::time::Duration::from_secs(2)));
        // Let the remaining threads join the outstanding prompt.
        thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(gate.cached_state(Capability::Camera), AuthorizationState::Undetermined);
        assert!(authority.answer(Capability::Camera, false));

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), Ok(AuthorizationState::Denied));
        }
        assert_eq!(authority.prompt_count(Capability::Camera), 1);
    }

    #[test]
    fn abandoned_prompt_interrupts_waiters_and_reprompts() {
        let authority = Arc::new(VirtualPermissionAuthority::deferred());
        let gate = PermissionGate::new(authority.clone());

        let pending = gate.request_authorization(Capability::Microphone);
        assert!(authority.abandon(Capability::Microphone));
        assert!(matches!(pending.wait(), Err(CaptureError::Interrupted(_))));
        assert_eq!(gate.cached_state(Capability::Microphone), AuthorizationState::Undetermined);

        let again = gate.request_authorization(Capability::Microphone);
        assert!(authority.answer(Capability::Microphone, true));
        assert_eq!(again.wait(), Ok(AuthorizationState::Granted));
        assert_eq!(authority.prompt_count(Capability::Microphone), 2);
    }

    #[test]
    fn invalidate_requeries_the_os() {
        let authority = Arc::new(VirtualPermissionAuthority::granting());
        authority.preset(Capability::Camera, AuthorizationState::Denied);
        let gate = PermissionGate::new(authority.clone());
        assert_eq!(
            gate.request_authorization(Capability::Camera).wait(),
            Ok(AuthorizationState::Denied)
        );

        // The user flips the switch in settings.
        authority.preset(Capability::Camera, AuthorizationState::Granted);
        assert_eq!(
            gate.request_authorization(Capability::Camera).wait(),
            Ok(AuthorizationState::Denied)
        );

        gate.invalidate(Capability::Camera);
        assert_eq!(
            gate.request_authorization(Capability::Camera).wait(),
            Ok(AuthorizationState::Granted)
        );
    }
}
