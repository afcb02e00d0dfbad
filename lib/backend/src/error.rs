//! Backend error types.

use std::fmt;

/// Errors from the hosted platform clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request could not be sent or no response arrived.
    RequestFailed {
        /// Error details.
        details: String,
    },
    /// The platform answered with a status the caller did not expect.
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
    /// The response body did not have the expected shape.
    Decode {
        /// Error details.
        details: String,
    },
    /// The platform rejected the credentials or token.
    Unauthorized,
    /// Client configuration is invalid.
    InvalidConfig {
        /// Error details.
        details: String,
    },
}

impl BackendError {
    pub(crate) fn request(e: &reqwest::Error) -> Self {
        Self::RequestFailed {
            details: e.to_string(),
        }
    }

    pub(crate) fn decode(e: impl fmt::Display) -> Self {
        Self::Decode {
            details: e.to_string(),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { details } => write!(f, "platform request failed: {}", details),
            Self::UnexpectedStatus { status, body } => {
                write!(f, "platform returned status {}: {}", status, body)
            }
            Self::Decode { details } => {
                write!(f, "failed to decode platform response: {}", details)
            }
            Self::Unauthorized => write!(f, "platform rejected the credentials"),
            Self::InvalidConfig { details } => {
                write!(f, "invalid platform configuration: {}", details)
            }
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_status_display() {
        let err = BackendError::UnexpectedStatus {
            status: 503,
            body: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "platform returned status 503: maintenance");
    }

    #[test]
    fn decode_helper_keeps_details() {
        let err = BackendError::decode("missing field `id`");
        assert_eq!(
            err,
            BackendError::Decode {
                details: "missing field `id`".to_string()
            }
        );
    }
}
