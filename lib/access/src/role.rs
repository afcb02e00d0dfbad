//! Role names and role assertions.
//!
//! Role assertions live in the hosted database (`user_roles` table) and are
//! only ever read by the portal. The client inspects a single role, `admin`;
//! the others exist so rows can be decoded faithfully.

use peoplehub_core::IdentityId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named capability granted to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Elevated capability: admin dashboards, ombudsman inbox, privileged proxies.
    Admin,
    /// HR staff.
    Hr,
    /// Regular employee.
    Employee,
}

impl Role {
    /// Returns the role name as stored in the role table.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Hr => "hr",
            Self::Employee => "employee",
        }
    }

    /// Returns true if this role has admin privileges.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "hr" => Ok(Self::Hr),
            "employee" => Ok(Self::Employee),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A server-held record granting `role` to `identity_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssertion {
    #[serde(rename = "user_id")]
    pub identity_id: IdentityId,
    pub role: Role,
}

impl RoleAssertion {
    /// Creates a role assertion.
    #[must_use]
    pub fn new(identity_id: IdentityId, role: Role) -> Self {
        Self { identity_id, role }
    }
}
