//! peoplehub HTTP server.
//!
//! Hosts the proxy functions at `POST /functions/v1/{name}` and a
//! `GET /health` probe. Bearer tokens are verified against the hosted
//! platform and admin roles are resolved through a bounded cache.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, StartupError};
pub use routes::router;
pub use state::AppState;
