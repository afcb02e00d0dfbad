//! Identifier types.
//!
//! Identities are owned by the hosted auth provider and are treated as
//! opaque strings. Identifiers minted by peoplehub itself use ULID format,
//! providing both uniqueness and temporal ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Subject reference of an authenticated identity.
///
/// Issued by the auth provider (usually a UUID) and never interpreted by the
/// portal; it is only compared, hashed, and sent back in lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    /// Creates an identity ID from the provider's subject string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identity ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for IdentityId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseIdError {
                id_type: "IdentityId",
                reason: "identity id is empty".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for IdentityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for IdentityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Macro to generate a strongly-typed ID wrapper around ULID.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Creates a new ID with a randomly generated ULID.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Returns the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let prefix_with_underscore = concat!($prefix, "_");
                let ulid_str = s.strip_prefix(prefix_with_underscore).unwrap_or(s);

                Ulid::from_str(ulid_str)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        reason: e.to_string(),
                    })
            }
        }
    };
}

define_id!(
    /// Correlation identifier for a single proxy function invocation.
    RequestId,
    "req"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_display_format() {
        let id = RequestId::new();
        assert!(id.to_string().starts_with("req_"));
    }

    #[test]
    fn request_id_parses_with_and_without_prefix() {
        let id = RequestId::new();
        let parsed: RequestId = id.to_string().parse().expect("should parse");
        assert_eq!(id, parsed);

        let raw: RequestId = id.as_ulid().to_string().parse().expect("should parse");
        assert_eq!(id, raw);
    }

    #[test]
    fn request_id_rejects_garbage() {
        let err = "req_nope".parse::<RequestId>().unwrap_err();
        assert_eq!(err.id_type, "RequestId");
    }

    #[test]
    fn identity_id_is_opaque() {
        let id = IdentityId::new("8f14e45f-ceea-4a1b-9b1e-1c2d3e4f5a6b");
        assert_eq!(id.as_str(), "8f14e45f-ceea-4a1b-9b1e-1c2d3e4f5a6b");
        assert_eq!(id.to_string(), id.as_str());
    }

    #[test]
    fn identity_id_rejects_blank() {
        assert!("   ".parse::<IdentityId>().is_err());
        let parsed: IdentityId = " u1 ".parse().expect("should parse");
        assert_eq!(parsed, IdentityId::from("u1"));
    }

    #[test]
    fn identity_id_serializes_transparently() {
        let json = serde_json::to_string(&IdentityId::from("u1")).expect("serialize");
        assert_eq!(json, "\"u1\"");
    }
}
