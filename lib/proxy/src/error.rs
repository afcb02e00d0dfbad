//! Error types for proxy functions.
//!
//! Every failure a proxy function can produce maps to one HTTP status and a
//! user-safe message. Upstream detail is kept in the variant for logging and
//! never reaches the response body.

use peoplehub_access::AuthorizationError;
use reqwest::StatusCode;
use serde_json::{Value as JsonValue, json};
use std::fmt;

/// Errors from proxy dispatch and upstream calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    /// Body is not a JSON object with a string `action`, or a field is invalid.
    InvalidRequest { reason: String },
    /// The function does not implement this action.
    UnknownAction { action: String },
    /// No function is registered under this name.
    UnknownFunction { name: String },
    /// Bearer credential missing or rejected.
    Unauthenticated,
    /// Caller is authenticated but lacks the admin role.
    Forbidden,
    /// The upstream API asked us to slow down.
    RateLimited {
        service: String,
        retry_after_secs: Option<u64>,
    },
    /// The upstream API answered with an error status.
    Upstream {
        service: String,
        status: u16,
        reason: String,
    },
    /// The upstream API could not be reached.
    Unreachable { service: String, reason: String },
    /// The upstream API answered with a body we could not interpret.
    InvalidUpstreamResponse { service: String, reason: String },
    /// The language model's output held no recoverable JSON object.
    InvalidAiResponse { reason: String },
    /// Failure inside the proxy itself.
    Internal { reason: String },
}

impl ProxyError {
    /// HTTP status this error is reported with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } | Self::UnknownAction { .. } => StatusCode::BAD_REQUEST,
            Self::UnknownFunction { .. } => StatusCode::NOT_FOUND,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream { .. }
            | Self::Unreachable { .. }
            | Self::InvalidUpstreamResponse { .. }
            | Self::InvalidAiResponse { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::InvalidRequest { reason } => reason.clone(),
            Self::UnknownAction { action } => format!("unknown action: {action}"),
            Self::UnknownFunction { name } => format!("unknown function: {name}"),
            Self::Unauthenticated => "authentication required".to_string(),
            Self::Forbidden => "admin role required".to_string(),
            Self::RateLimited { service, .. } => {
                format!("{service} rate limit reached, retry later")
            }
            Self::Upstream { service, .. } => format!("{service} request failed"),
            Self::Unreachable { service, .. } => format!("{service} is unreachable"),
            Self::InvalidUpstreamResponse { service, .. } => {
                format!("invalid response from {service}")
            }
            Self::InvalidAiResponse { .. } => "invalid AI response".to_string(),
            Self::Internal { .. } => "internal error".to_string(),
        }
    }

    /// The `{ "error": ... }` envelope returned to the caller.
    #[must_use]
    pub fn to_body(&self) -> JsonValue {
        let mut body = json!({ "error": self.message() });
        if let Self::RateLimited {
            retry_after_secs: Some(secs),
            ..
        } = self
        {
            body["retry_after_secs"] = json!(secs);
        }
        body
    }

    pub(crate) fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest { reason } => write!(f, "invalid request: {reason}"),
            Self::UnknownAction { action } => write!(f, "unknown action: {action}"),
            Self::UnknownFunction { name } => write!(f, "unknown function: {name}"),
            Self::Unauthenticated => write!(f, "caller is not authenticated"),
            Self::Forbidden => write!(f, "caller lacks the admin role"),
            Self::RateLimited {
                service,
                retry_after_secs,
            } => match retry_after_secs {
                Some(secs) => write!(f, "{service} rate limited, retry after {secs}s"),
                None => write!(f, "{service} rate limited"),
            },
            Self::Upstream {
                service,
                status,
                reason,
            } => write!(f, "{service} returned {status}: {reason}"),
            Self::Unreachable { service, reason } => {
                write!(f, "{service} unreachable: {reason}")
            }
            Self::InvalidUpstreamResponse { service, reason } => {
                write!(f, "invalid response from {service}: {reason}")
            }
            Self::InvalidAiResponse { reason } => write!(f, "invalid AI response: {reason}"),
            Self::Internal { reason } => write!(f, "internal error: {reason}"),
        }
    }
}

impl std::error::Error for ProxyError {}

impl From<AuthorizationError> for ProxyError {
    fn from(err: AuthorizationError) -> Self {
        match err {
            AuthorizationError::NotAuthenticated => Self::Unauthenticated,
            AuthorizationError::AdminRequired { .. } => Self::Forbidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peoplehub_core::IdentityId;

    #[test]
    fn unknown_action_is_bad_request_naming_the_action() {
        let err = ProxyError::UnknownAction {
            action: "explode".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_body(), json!({ "error": "unknown action: explode" }));
    }

    #[test]
    fn rate_limit_is_distinct_from_gateway_errors() {
        let limited = ProxyError::RateLimited {
            service: "board".to_string(),
            retry_after_secs: Some(30),
        };
        assert_eq!(limited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limited.to_body()["retry_after_secs"], 30);

        let upstream = ProxyError::Upstream {
            service: "board".to_string(),
            status: 500,
            reason: "stack trace".to_string(),
        };
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream.to_body(), json!({ "error": "board request failed" }));
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = ProxyError::Internal {
            reason: "secret path /etc".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "internal error");
    }

    #[test]
    fn authorization_errors_map_to_401_and_403() {
        assert_eq!(
            ProxyError::from(AuthorizationError::NotAuthenticated).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ProxyError::from(AuthorizationError::AdminRequired {
                identity_id: IdentityId::from("u1"),
            })
            .status_code(),
            StatusCode::FORBIDDEN
        );
    }
}
