//! Session Store: the single record of who is logged in.
//!
//! The store subscribes to the auth provider before it asks for the current
//! snapshot, so no transition between the two is lost. Provider callbacks are
//! queued on an ordered channel and applied one at a time by a driver task.
//! Each application resolves the admin flag first and then publishes the new
//! identity and flag together, so consumers never see a fresh identity paired
//! with the previous identity's role.
//!
//! A local sign-out starts a new epoch. Changes delivered, and applications
//! started, under an earlier epoch are discarded instead of published.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::AuthenticationError;
use crate::provider::{AuthChange, AuthEvent, AuthListener, AuthProvider, Subscription};
use crate::resolver::RoleResolver;
use crate::session::{AuthSession, SessionState};

/// State shared between the store handle and its driver task.
struct Shared {
    resolver: RoleResolver,
    state: watch::Sender<SessionState>,
    epoch: AtomicU64,
}

impl Shared {
    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    async fn apply(&self, session: Option<AuthSession>, epoch: u64) {
        let is_admin = match &session {
            Some(session) => self.resolver.is_admin(session.identity().id()).await,
            None => false,
        };
        self.publish(SessionState::resolved(session, is_admin), epoch);
    }

    /// Publishes `next` unless a sign-out happened since `epoch` was read.
    ///
    /// The epoch is compared under the watch lock, the same lock
    /// [`clear`](Self::clear) bumps it under.
    fn publish(&self, next: SessionState, epoch: u64) {
        let identity_id = next.identity_id().cloned();
        let is_admin = next.is_admin();
        let published = self.state.send_if_modified(|state| {
            if self.epoch() != epoch {
                return false;
            }
            *state = next;
            true
        });
        if published {
            debug!(?identity_id, is_admin, "session state updated");
        } else {
            debug!(?identity_id, "discarding session update from before sign-out");
        }
    }

    /// Clears the session and starts a new epoch.
    fn clear(&self) {
        self.state.send_modify(|state| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *state = SessionState::unauthenticated();
        });
    }
}

/// Live resources owned by an initialized store.
struct Runtime {
    subscription: Subscription,
    driver: JoinHandle<()>,
}

impl Runtime {
    fn release(self) {
        self.subscription.unsubscribe();
        self.driver.abort();
    }
}

/// Process-wide session record fed by one auth provider.
pub struct SessionStore {
    provider: Arc<dyn AuthProvider>,
    shared: Arc<Shared>,
    runtime: Mutex<Option<Runtime>>,
}

impl SessionStore {
    /// Creates a store in the loading state. Call [`initialize`](Self::initialize)
    /// to start tracking the provider.
    #[must_use]
    pub fn new(provider: Arc<dyn AuthProvider>, resolver: RoleResolver) -> Self {
        let (state, _) = watch::channel(SessionState::loading());
        Self {
            provider,
            shared: Arc::new(Shared {
                resolver,
                state,
                epoch: AtomicU64::new(0),
            }),
            runtime: Mutex::new(None),
        }
    }

    /// Subscribes to the provider and applies the current snapshot.
    ///
    /// Calling this on an already initialized store does nothing, so there is
    /// never more than one active subscription. If the snapshot cannot be
    /// fetched the store settles to unauthenticated rather than staying in
    /// the loading state.
    pub async fn initialize(&self) {
        let mut runtime = self.runtime.lock().await;
        if runtime.is_some() {
            debug!("session store already initialized");
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel::<(u64, AuthChange)>();
        let shared = self.shared.clone();
        let listener: AuthListener = Arc::new(move |change: AuthChange| {
            // The receiver is gone only after teardown.
            let _ = tx.send((shared.epoch(), change));
        });
        let subscription = self.provider.on_auth_state_change(listener);

        let epoch = self.shared.epoch();
        match self.provider.get_session().await {
            Ok(session) => self.shared.apply(session, epoch).await,
            Err(e) => {
                warn!(error = %e, "failed to fetch initial session, settling unauthenticated");
                self.shared.publish(SessionState::unauthenticated(), epoch);
            }
        }

        let driver = tokio::spawn(drive(self.shared.clone(), rx));
        *runtime = Some(Runtime {
            subscription,
            driver,
        });
        info!("session store initialized");
    }

    /// Signs out: invalidates remotely, then clears local state regardless.
    ///
    /// The local identity and admin flag are cleared even when the provider
    /// call fails; the failure is still returned so the caller can show a
    /// notice. Auth changes already queued or being applied when this runs
    /// are discarded.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if remote invalidation failed.
    pub async fn sign_out(&self) -> Result<(), AuthenticationError> {
        let result = self.provider.sign_out().await;
        if let Err(e) = &result {
            warn!(error = %e, "remote sign-out failed, clearing local session anyway");
        }
        self.shared.clear();
        result
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    /// Returns a receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Returns the resolver the store consults.
    #[must_use]
    pub fn resolver(&self) -> &RoleResolver {
        &self.shared.resolver
    }

    /// Returns true while a provider subscription is held.
    pub async fn is_active(&self) -> bool {
        self.runtime.lock().await.is_some()
    }

    /// Releases the provider subscription and stops the driver.
    pub async fn shutdown(&self) {
        if let Some(runtime) = self.runtime.lock().await.take() {
            runtime.release();
            info!("session store shut down");
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.get_mut().take() {
            runtime.release();
        }
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.shared.state.borrow())
            .finish_non_exhaustive()
    }
}

async fn drive(shared: Arc<Shared>, mut rx: mpsc::UnboundedReceiver<(u64, AuthChange)>) {
    while let Some((epoch, change)) = rx.recv().await {
        if epoch != shared.epoch() {
            debug!(event = ?change.event, "skipping auth change delivered before sign-out");
            continue;
        }
        debug!(event = ?change.event, "applying auth change");
        let session = match change.event {
            AuthEvent::SignedOut => None,
            _ => change.session,
        };
        shared.apply(session, epoch).await;
    }
}
