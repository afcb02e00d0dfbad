//! Hosted platform clients for peoplehub.
//!
//! This crate implements the access crate's boundary traits over the hosted
//! platform's HTTP interface:
//! - `HostedAuthProvider` ([`AuthProvider`](peoplehub_access::AuthProvider)):
//!   password sign-in, refresh, sign-out, and token introspection
//! - `RestRoleDirectory` ([`RoleDirectory`](peoplehub_access::RoleDirectory)):
//!   point lookups in the `user_roles` table
//! - `RestTableClient` ([`TableSource`](peoplehub_access::TableSource)):
//!   filtered table reads for data-bound views
//!
//! Inherent methods return `peoplehub_core::Result<T, BackendError>`; the
//! trait implementations flatten those reports into the access crate's
//! error enums.

pub mod auth;
pub mod client;
pub mod error;
pub mod roles;
pub mod tables;

pub use auth::HostedAuthProvider;
pub use client::{PlatformClient, PlatformConfig};
pub use error::BackendError;
pub use roles::RestRoleDirectory;
pub use tables::RestTableClient;
