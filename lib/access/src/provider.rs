//! Auth provider boundary.
//!
//! The auth provider is an external collaborator. The portal consumes three
//! things from it: a change-notification stream, a current-session snapshot,
//! and a sign-out invalidation call. Listener registration returns an explicit
//! [`Subscription`] so teardown is deterministic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::AuthenticationError;
use crate::identity::Identity;
use crate::session::AuthSession;

/// Kind of auth transition reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    /// The session present when the listener was registered.
    InitialSession,
    /// A new identity signed in.
    SignedIn,
    /// The identity signed out, or its session was revoked.
    SignedOut,
    /// The access token was refreshed for the same identity.
    TokenRefreshed,
    /// Identity attributes changed.
    UserUpdated,
}

/// A single notification from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<AuthSession>,
}

impl AuthChange {
    /// Creates a change notification.
    #[must_use]
    pub fn new(event: AuthEvent, session: Option<AuthSession>) -> Self {
        Self { event, session }
    }
}

/// Callback invoked for every auth change, in delivery order.
pub type AuthListener = Arc<dyn Fn(AuthChange) + Send + Sync>;

/// Handle for a registered listener.
///
/// Dropping the handle unsubscribes as well; `unsubscribe` just makes the
/// point explicit at call sites.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Wraps the closure that removes the listener.
    #[must_use]
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Removes the listener from the provider.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

/// Listener bookkeeping shared by provider implementations.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    next_id: Arc<AtomicU64>,
    listeners: Arc<Mutex<BTreeMap<u64, AuthListener>>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` and returns the handle that removes it.
    pub fn register(&self, listener: AuthListener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, listener);

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&id);
            }
        })
    }

    /// Delivers `change` to every registered listener in registration order.
    pub fn emit(&self, change: &AuthChange) {
        let listeners: Vec<AuthListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for listener in listeners {
            listener(change.clone());
        }
    }

    /// Number of active listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nobody is listening.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

/// The hosted auth provider, as seen by the portal.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Registers a listener for auth changes.
    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription;

    /// Returns the current session snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be reached.
    async fn get_session(&self) -> Result<Option<AuthSession>, AuthenticationError>;

    /// Invalidates the current session on the provider side.
    ///
    /// # Errors
    ///
    /// Returns an error if the invalidation request fails.
    async fn sign_out(&self) -> Result<(), AuthenticationError>;

    /// Resolves a bearer token to the identity it was issued for.
    ///
    /// Returns `Ok(None)` when the provider rejects the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be reached.
    async fn get_user(&self, access_token: &str) -> Result<Option<Identity>, AuthenticationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_listener(counter: Arc<AtomicUsize>) -> AuthListener {
        Arc::new(move |_change: AuthChange| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn emit_reaches_registered_listeners() {
        let registry = ListenerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let _a = registry.register(counting_listener(counter.clone()));
        let _b = registry.register(counting_listener(counter.clone()));

        registry.emit(&AuthChange::new(AuthEvent::SignedOut, None));

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unsubscribe_removes_listener() {
        let registry = ListenerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let subscription = registry.register(counting_listener(counter.clone()));

        subscription.unsubscribe();
        registry.emit(&AuthChange::new(AuthEvent::SignedOut, None));

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn dropping_subscription_removes_listener() {
        let registry = ListenerRegistry::new();
        {
            let _subscription = registry.register(Arc::new(|_: AuthChange| {}));
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn listeners_observe_changes_in_order() {
        let registry = ListenerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = registry.register(Arc::new(move |change: AuthChange| {
            sink.lock().unwrap().push(change.event);
        }));

        registry.emit(&AuthChange::new(AuthEvent::SignedIn, None));
        registry.emit(&AuthChange::new(AuthEvent::TokenRefreshed, None));
        registry.emit(&AuthChange::new(AuthEvent::SignedOut, None));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                AuthEvent::SignedIn,
                AuthEvent::TokenRefreshed,
                AuthEvent::SignedOut
            ]
        );
    }

    #[test]
    fn auth_event_wire_names() {
        let json = serde_json::to_string(&AuthEvent::TokenRefreshed).expect("serialize");
        assert_eq!(json, "\"TOKEN_REFRESHED\"");
    }
}
