//! Core types shared across the peoplehub workspace.
//!
//! This crate provides the identifiers and the error-handling alias used by
//! the access, backend, and proxy layers of the HR portal.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{IdentityId, ParseIdError, RequestId};
