//! Session, role resolution, and access gating for the peoplehub portal.
//!
//! This crate provides:
//! - The Session Store (`SessionStore`), which mirrors the auth provider's
//!   session and the resolved admin flag as one observable `SessionState`
//! - The Role Resolver (`RoleResolver`), which answers "is this identity an
//!   admin?" with an injected per-identity cache
//! - The Access Gate (`AccessGate`), a pure decision over a `SessionState`
//! - Data-bound view state (`QueryCell`, `QueryState`) for remote table reads
//!
//! # Access Control Model
//!
//! Two capability levels exist: any signed-in identity, and identities
//! holding the `admin` role assertion. Role lookups fail closed.
//!
//! # Example
//!
//! ```
//! use peoplehub_access::{AccessGate, AccessRequirement, AuthSession, GateDecision, Identity, SessionState};
//! use chrono::Duration;
//!
//! let session = AuthSession::new(
//!     Identity::new("user-1", Some("alice@example.com".to_string())),
//!     "access-token".to_string(),
//!     None,
//!     Duration::hours(1),
//! );
//! let state = SessionState::resolved(Some(session), false);
//!
//! let gate = AccessGate::default();
//! assert_eq!(gate.decide(&state, AccessRequirement::Authenticated), GateDecision::Render);
//! assert_eq!(gate.decide(&state, AccessRequirement::Admin), GateDecision::Denied);
//! ```

pub mod cache;
pub mod error;
pub mod gate;
pub mod identity;
pub mod provider;
pub mod query;
pub mod resolver;
pub mod role;
pub mod session;
pub mod store;

pub use cache::{InMemoryRoleCache, RoleCache};
pub use error::{AuthenticationError, AuthorizationError, QueryError, RoleLookupError};
pub use gate::{AccessGate, AccessRequirement, GateDecision, LOGIN_ROUTE, PORTAL_ROUTES, PortalRoute};
pub use identity::Identity;
pub use peoplehub_core::IdentityId;
pub use provider::{AuthChange, AuthEvent, AuthListener, AuthProvider, ListenerRegistry, Subscription};
pub use query::{
    PortalTable, QueryCell, QueryKey, QueryState, QueryTicket, TableQuery, TableSource, load_table,
};
pub use resolver::{RoleDirectory, RoleResolver};
pub use role::{Role, RoleAssertion};
pub use session::{AuthSession, SessionState};
pub use store::SessionStore;
