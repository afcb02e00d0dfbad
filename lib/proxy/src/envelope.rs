//! Request envelope and caller context.

use peoplehub_access::{AccessRequirement, AuthorizationError, Identity};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use crate::error::ProxyError;

/// A proxy request: an `action` discriminator plus action-specific fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    action: String,
    params: Map<String, JsonValue>,
}

impl ProxyRequest {
    /// Creates a request from parts.
    #[must_use]
    pub fn new(action: impl Into<String>, params: Map<String, JsonValue>) -> Self {
        Self {
            action: action.into(),
            params,
        }
    }

    /// Parses a raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidRequest`] unless the body is a JSON object
    /// with a string `action`.
    pub fn parse(body: &[u8]) -> Result<Self, ProxyError> {
        let value: JsonValue = serde_json::from_slice(body)
            .map_err(|e| ProxyError::invalid_request(format!("body is not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Builds a request from an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidRequest`] for anything but an object with
    /// a string `action`.
    pub fn from_value(value: JsonValue) -> Result<Self, ProxyError> {
        let JsonValue::Object(mut params) = value else {
            return Err(ProxyError::invalid_request("body must be a JSON object"));
        };
        let action = match params.remove("action") {
            Some(JsonValue::String(action)) if !action.is_empty() => action,
            Some(_) => return Err(ProxyError::invalid_request("`action` must be a string")),
            None => return Err(ProxyError::invalid_request("missing `action`")),
        };
        Ok(Self { action, params })
    }

    /// Returns the action discriminator.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns the fields besides `action`.
    #[must_use]
    pub fn params(&self) -> &Map<String, JsonValue> {
        &self.params
    }

    /// Decodes the fields into an action-specific struct.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidRequest`] naming the decode problem.
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T, ProxyError> {
        serde_json::from_value(JsonValue::Object(self.params.clone())).map_err(|e| {
            ProxyError::invalid_request(format!("invalid fields for '{}': {e}", self.action))
        })
    }
}

/// Who is calling a proxy function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    identity: Identity,
    is_admin: bool,
}

impl Caller {
    /// Creates a caller context.
    #[must_use]
    pub fn new(identity: Identity, is_admin: bool) -> Self {
        Self { identity, is_admin }
    }

    /// Returns the caller's identity.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns true if the caller holds the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Checks the caller against `requirement`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::AdminRequired`] for a non-admin caller of
    /// an admin action.
    pub fn require(&self, requirement: AccessRequirement) -> Result<(), AuthorizationError> {
        match requirement {
            AccessRequirement::Admin if !self.is_admin => Err(AuthorizationError::AdminRequired {
                identity_id: self.identity.id().clone(),
            }),
            _ => Ok(()),
        }
    }
}

/// Reads a required, non-blank string field.
pub(crate) fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, ProxyError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ProxyError::invalid_request(format!("`{field}` is required")));
    }
    Ok(trimmed)
}

/// Accepts identifiers that are safe to splice into an upstream URL path.
pub(crate) fn path_segment<'a>(value: &'a str, field: &str) -> Result<&'a str, ProxyError> {
    let value = required(value, field)?;
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(value)
    } else {
        Err(ProxyError::invalid_request(format!(
            "`{field}` contains invalid characters"
        )))
    }
}
