//! Hosted auth provider speaking the platform's token endpoints.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use peoplehub_access::{
    AuthChange, AuthEvent, AuthListener, AuthProvider, AuthSession, AuthenticationError, Identity,
    ListenerRegistry, Subscription,
};
use peoplehub_core::Result;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument, warn};

use crate::client::{PlatformClient, check_status, read_json};
use crate::error::BackendError;

const PROVIDER_NAME: &str = "hosted";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    email: Option<String>,
}

impl From<UserResponse> for Identity {
    fn from(user: UserResponse) -> Self {
        Identity::new(user.id, user.email)
    }
}

impl TokenResponse {
    /// Converts the grant into a session, rejecting lifetimes chrono cannot
    /// represent.
    fn into_session(self) -> std::result::Result<AuthSession, BackendError> {
        let expires_at = Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                BackendError::decode(format!("expires_in out of range: {}", self.expires_in))
            })?;
        Ok(AuthSession::with_expiry(
            self.user.into(),
            self.access_token,
            self.refresh_token,
            expires_at,
        ))
    }
}

/// [`AuthProvider`] backed by the hosted platform's auth endpoints.
///
/// Holds the current session in memory and notifies listeners on every
/// transition it performs.
#[derive(Debug, Clone)]
pub struct HostedAuthProvider {
    client: PlatformClient,
    listeners: ListenerRegistry,
    current: Arc<Mutex<Option<AuthSession>>>,
}

impl HostedAuthProvider {
    /// Creates a provider with no session.
    #[must_use]
    pub fn new(client: PlatformClient) -> Self {
        Self {
            client,
            listeners: ListenerRegistry::new(),
            current: Arc::new(Mutex::new(None)),
        }
    }

    fn current(&self) -> MutexGuard<'_, Option<AuthSession>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, event: AuthEvent, session: Option<AuthSession>) {
        *self.current() = session.clone();
        debug!(?event, "auth state changed");
        self.listeners.emit(&AuthChange::new(event, session));
    }

    /// Posts a token grant. `None` means the platform rejected the grant.
    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Option<AuthSession>, BackendError> {
        let response = self
            .client
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::request(&e))?;

        if is_rejection(response.status()) {
            debug!(grant_type, status = response.status().as_u16(), "token grant rejected");
            return Ok(None);
        }
        let token: TokenResponse = read_json(response).await?;
        Ok(Some(token.into_session()?))
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] for rejected credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let session = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?
            .ok_or(BackendError::Unauthorized)?;
        self.replace(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    /// Exchanges the current refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] when there is no refresh token
    /// or the platform rejects it.
    pub async fn refresh_session(&self) -> Result<AuthSession, BackendError> {
        Ok(self
            .try_refresh()
            .await?
            .ok_or(BackendError::Unauthorized)?)
    }

    #[instrument(skip(self))]
    async fn try_refresh(&self) -> Result<Option<AuthSession>, BackendError> {
        let refresh_token = self
            .current()
            .as_ref()
            .and_then(|s| s.refresh_token().map(str::to_string));
        let Some(refresh_token) = refresh_token else {
            return Ok(None);
        };

        let session = self
            .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;
        if let Some(session) = &session {
            self.replace(AuthEvent::TokenRefreshed, Some(session.clone()));
        }
        Ok(session)
    }

    /// Resolves `access_token` to its identity; `None` if the token is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot be reached.
    #[instrument(skip_all)]
    pub async fn user_for_token(&self, access_token: &str) -> Result<Option<Identity>, BackendError> {
        let response = self
            .client
            .request(Method::GET, "/auth/v1/user")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| BackendError::request(&e))?;

        if is_rejection(response.status()) {
            return Ok(None);
        }
        let user: UserResponse = read_json(response).await?;
        Ok(Some(user.into()))
    }

    /// Revokes `access_token` on the platform.
    #[instrument(skip_all)]
    async fn revoke(&self, access_token: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .request(Method::POST, "/auth/v1/logout")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| BackendError::request(&e))?;
        check_status(response).await?;
        Ok(())
    }
}

fn is_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    )
}

fn provider_error(report: impl std::fmt::Display) -> AuthenticationError {
    AuthenticationError::ProviderError {
        provider: PROVIDER_NAME.to_string(),
        reason: report.to_string(),
    }
}

#[async_trait]
impl AuthProvider for HostedAuthProvider {
    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription {
        self.listeners.register(listener)
    }

    async fn get_session(&self) -> std::result::Result<Option<AuthSession>, AuthenticationError> {
        let snapshot = self.current().clone();
        match snapshot {
            Some(session) if session.is_expired() => match self.try_refresh().await {
                Ok(Some(session)) => Ok(Some(session)),
                Ok(None) => {
                    warn!("session expired and could not be refreshed");
                    self.replace(AuthEvent::SignedOut, None);
                    Ok(None)
                }
                Err(report) => Err(provider_error(report)),
            },
            other => Ok(other),
        }
    }

    async fn sign_out(&self) -> std::result::Result<(), AuthenticationError> {
        let previous = self.current().clone();
        let outcome = match previous {
            Some(session) => self.revoke(session.access_token()).await,
            None => Ok(()),
        };
        self.replace(AuthEvent::SignedOut, None);
        outcome.map_err(provider_error)
    }

    async fn get_user(
        &self,
        access_token: &str,
    ) -> std::result::Result<Option<Identity>, AuthenticationError> {
        self.user_for_token(access_token)
            .await
            .map_err(provider_error)
    }
}
