//! Server error types.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use peoplehub_proxy::ProxyError;
use std::fmt;

/// Errors raised while assembling the server at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    /// Platform connection settings were rejected.
    Platform { details: String },
    /// A configured proxy function could not be built.
    Function { name: String, details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Platform { details } => write!(f, "invalid platform settings: {}", details),
            Self::Function { name, details } => {
                write!(f, "could not build function '{}': {}", name, details)
            }
        }
    }
}

impl std::error::Error for StartupError {}

/// A proxy failure rendered as `{ "error": ... }` with its status.
#[derive(Debug)]
pub struct ApiError(pub ProxyError);

impl From<ProxyError> for ApiError {
    fn from(error: ProxyError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "proxy request failed");
        } else {
            tracing::debug!(status = %status, error = %self.0, "proxy request rejected");
        }
        (status, Json(self.0.to_body())).into_response()
    }
}
