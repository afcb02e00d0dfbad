//! Error types for the access crate.
//!
//! - `AuthenticationError`: failures talking to the auth provider
//! - `AuthorizationError`: a caller lacks the capability a region requires
//! - `RoleLookupError`: the remote role-assertion read failed
//! - `QueryError`: a data-bound view's remote read failed

use peoplehub_core::IdentityId;
use std::fmt;

/// Errors from authentication operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// The provider rejected the supplied credentials.
    InvalidCredentials,
    /// Bearer token was rejected or could not be parsed.
    InvalidToken { reason: String },
    /// Session has expired and could not be refreshed.
    SessionExpired,
    /// The provider could not be reached or answered unexpectedly.
    ProviderError { provider: String, reason: String },
    /// No session is active.
    NoSession,
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::InvalidToken { reason } => write!(f, "invalid token: {reason}"),
            Self::SessionExpired => write!(f, "session has expired"),
            Self::ProviderError { provider, reason } => {
                write!(f, "auth provider '{provider}' error: {reason}")
            }
            Self::NoSession => write!(f, "no active session"),
        }
    }
}

impl std::error::Error for AuthenticationError {}

/// Errors from authorization checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// Caller is not authenticated.
    NotAuthenticated,
    /// Caller is authenticated but lacks the admin capability.
    AdminRequired { identity_id: IdentityId },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "caller is not authenticated"),
            Self::AdminRequired { identity_id } => {
                write!(f, "identity {identity_id} lacks admin capability")
            }
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// Errors from the remote role-assertion lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleLookupError {
    /// The lookup request failed in transit or was rejected.
    RequestFailed { reason: String },
    /// The response could not be interpreted.
    InvalidResponse { reason: String },
}

impl fmt::Display for RoleLookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { reason } => write!(f, "role lookup failed: {reason}"),
            Self::InvalidResponse { reason } => {
                write!(f, "role lookup returned an invalid response: {reason}")
            }
        }
    }
}

impl std::error::Error for RoleLookupError {}

/// Errors from remote data reads backing a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The read could not be completed (network, server, or policy failure).
    Unavailable { table: String, reason: String },
    /// A row could not be decoded into the view's record type.
    Decode { table: String, reason: String },
}

impl QueryError {
    /// Short message suitable for an inline indicator.
    #[must_use]
    pub fn inline_message(&self) -> String {
        match self {
            Self::Unavailable { table, .. } => format!("Could not load {table}"),
            Self::Decode { table, .. } => format!("Some {table} records could not be read"),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { table, reason } => {
                write!(f, "read of '{table}' failed: {reason}")
            }
            Self::Decode { table, reason } => {
                write!(f, "failed to decode '{table}' row: {reason}")
            }
        }
    }
}

impl std::error::Error for QueryError {}
