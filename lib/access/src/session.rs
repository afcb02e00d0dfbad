//! Session types.
//!
//! `AuthSession` is what the auth provider hands out after a sign-in.
//! `SessionState` is the composite the Session Store publishes to consumers:
//! the current session (if any), whether it is still being resolved, and the
//! derived admin flag.

use chrono::{DateTime, Duration, Utc};
use peoplehub_core::IdentityId;
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// An authenticated session issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// The authenticated identity.
    identity: Identity,
    /// Bearer token for platform and proxy calls.
    access_token: String,
    /// Token used to obtain a fresh access token.
    refresh_token: Option<String>,
    /// When the access token stops being accepted.
    expires_at: DateTime<Utc>,
}

impl AuthSession {
    /// Creates a session valid for `lifetime` from now.
    #[must_use]
    pub fn new(
        identity: Identity,
        access_token: String,
        refresh_token: Option<String>,
        lifetime: Duration,
    ) -> Self {
        Self {
            identity,
            access_token,
            refresh_token,
            expires_at: Utc::now() + lifetime,
        }
    }

    /// Creates a session with an absolute expiry, as reported by the provider.
    #[must_use]
    pub fn with_expiry(
        identity: Identity,
        access_token: String,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity,
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Returns the authenticated identity.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns the bearer access token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the refresh token, if present.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Returns when the access token expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the access token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// What consumers see of the Session Store.
///
/// While `loading` is true, `session` and `is_admin` are not authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    loading: bool,
    session: Option<AuthSession>,
    is_admin: bool,
}

impl SessionState {
    /// Initial state: nothing resolved yet.
    #[must_use]
    pub fn loading() -> Self {
        Self {
            loading: true,
            session: None,
            is_admin: false,
        }
    }

    /// Resolved state with no identity.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self {
            loading: false,
            session: None,
            is_admin: false,
        }
    }

    /// Resolved state for `session` with its derived admin flag.
    ///
    /// Without a session the admin flag is forced to false.
    #[must_use]
    pub fn resolved(session: Option<AuthSession>, is_admin: bool) -> Self {
        let is_admin = is_admin && session.is_some();
        Self {
            loading: false,
            session,
            is_admin,
        }
    }

    /// Returns true until the first snapshot or event has been applied.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns the current session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    /// Returns the current identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.session.as_ref().map(AuthSession::identity)
    }

    /// Returns the current identity's id, if any.
    #[must_use]
    pub fn identity_id(&self) -> Option<&IdentityId> {
        self.identity().map(Identity::id)
    }

    /// Returns true if the current identity holds the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Returns true once resolved with an identity present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.loading && self.session.is_some()
    }
}
