//! Proxy functions for the peoplehub portal.
//!
//! Each function is a stateless handler that validates the caller, forwards
//! a derived request to one third-party HTTP API, and reshapes the answer.
//! All of them share one contract:
//!
//! - the request body is a JSON object with a string `action`
//! - an unknown action is a 400 naming the action
//! - a missing or rejected bearer is a 401; a non-admin caller of an admin
//!   action is a 403
//! - failures are `{ "error": string }` with a non-2xx status; upstream 429s
//!   pass through as 429, other upstream failures become 502
//!
//! The crate is framework-free: [`Dispatcher::dispatch`] takes a function
//! name, an optional bearer token, and the raw body, and returns either the
//! result object or a [`ProxyError`] carrying its status.

pub mod ai_json;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod function;
pub mod functions;
pub mod upstream;

pub use ai_json::extract_json_object;
pub use dispatch::Dispatcher;
pub use envelope::{Caller, ProxyRequest};
pub use error::ProxyError;
pub use function::{ActionSpec, FunctionRegistry, ProxyFunction};
pub use upstream::UpstreamClient;
