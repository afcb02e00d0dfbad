//! The authenticated subject the portal acts on behalf of.
//!
//! Identities are owned by the hosted auth provider and are read-only to the
//! portal: created by a sign-in, gone after sign-out.

use peoplehub_core::IdentityId;
use serde::{Deserialize, Serialize};

/// An authenticated identity as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque subject reference from the provider.
    id: IdentityId,
    /// Email address, if the provider has one on record.
    email: Option<String>,
}

impl Identity {
    /// Creates an identity from the provider's subject and email.
    #[must_use]
    pub fn new(id: impl Into<IdentityId>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
        }
    }

    /// Returns the subject reference.
    #[must_use]
    pub fn id(&self) -> &IdentityId {
        &self.id
    }

    /// Returns the email address, if available.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
