//! Access Gate: decides what a protected region shows.
//!
//! The decision is a pure function of the current [`SessionState`] and the
//! region's declared requirement. The gate keeps no state of its own, so it
//! is re-evaluated whenever the Session Store publishes a change.

use serde::{Deserialize, Serialize};

use crate::session::SessionState;

/// Default route unauthenticated visitors are sent to.
pub const LOGIN_ROUTE: &str = "/login";

/// What a protected region demands of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRequirement {
    /// Any signed-in identity.
    Authenticated,
    /// A signed-in identity holding the admin role.
    Admin,
}

impl AccessRequirement {
    /// Maps the "requires admin" flag a region declares to a requirement.
    #[must_use]
    pub fn from_require_admin(require_admin: bool) -> Self {
        if require_admin {
            Self::Admin
        } else {
            Self::Authenticated
        }
    }
}

/// Outcome of evaluating a gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateDecision {
    /// Session not resolved yet: show a loading indicator.
    Loading,
    /// No identity: navigate to `to`, replacing the history entry.
    Redirect { to: String, replace: bool },
    /// Identity lacks the required capability: show the restricted notice.
    Denied,
    /// Render the protected content.
    Render,
}

/// A view the portal exposes and what it requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalRoute {
    pub path: &'static str,
    pub title: &'static str,
    /// `None` for public routes.
    pub requirement: Option<AccessRequirement>,
}

/// The portal's views.
pub const PORTAL_ROUTES: &[PortalRoute] = &[
    PortalRoute {
        path: "/login",
        title: "Sign in",
        requirement: None,
    },
    PortalRoute {
        path: "/",
        title: "Dashboard",
        requirement: Some(AccessRequirement::Authenticated),
    },
    PortalRoute {
        path: "/employees",
        title: "Employee directory",
        requirement: Some(AccessRequirement::Authenticated),
    },
    PortalRoute {
        path: "/onboarding",
        title: "Onboarding",
        requirement: Some(AccessRequirement::Authenticated),
    },
    PortalRoute {
        path: "/time-bank",
        title: "Time bank",
        requirement: Some(AccessRequirement::Authenticated),
    },
    PortalRoute {
        path: "/ombudsman",
        title: "Ombudsman",
        requirement: Some(AccessRequirement::Authenticated),
    },
    PortalRoute {
        path: "/ai-tools",
        title: "AI tools",
        requirement: Some(AccessRequirement::Authenticated),
    },
    PortalRoute {
        path: "/ombudsman/inbox",
        title: "Ombudsman inbox",
        requirement: Some(AccessRequirement::Admin),
    },
    PortalRoute {
        path: "/erp-reports",
        title: "ERP reports",
        requirement: Some(AccessRequirement::Admin),
    },
    PortalRoute {
        path: "/admin/users",
        title: "User administration",
        requirement: Some(AccessRequirement::Admin),
    },
];

/// Looks up a route by exact path.
#[must_use]
pub fn find_route(path: &str) -> Option<&'static PortalRoute> {
    let normalized = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    PORTAL_ROUTES.iter().find(|route| route.path == normalized)
}

/// Guard deciding whether protected content is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGate {
    login_route: String,
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new(LOGIN_ROUTE)
    }
}

impl AccessGate {
    /// Creates a gate redirecting unauthenticated visitors to `login_route`.
    #[must_use]
    pub fn new(login_route: impl Into<String>) -> Self {
        Self {
            login_route: login_route.into(),
        }
    }

    /// Returns the login route.
    #[must_use]
    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// Decides what a region with `requirement` shows for `state`.
    #[must_use]
    pub fn decide(&self, state: &SessionState, requirement: AccessRequirement) -> GateDecision {
        if state.is_loading() {
            return GateDecision::Loading;
        }
        if state.identity().is_none() {
            return GateDecision::Redirect {
                to: self.login_route.clone(),
                replace: true,
            };
        }
        match requirement {
            AccessRequirement::Admin if !state.is_admin() => GateDecision::Denied,
            _ => GateDecision::Render,
        }
    }

    /// Decides for a catalogued route; unknown paths require authentication.
    #[must_use]
    pub fn decide_route(&self, path: &str, state: &SessionState) -> GateDecision {
        match find_route(path) {
            Some(PortalRoute {
                requirement: None, ..
            }) => GateDecision::Render,
            Some(PortalRoute {
                requirement: Some(requirement),
                ..
            }) => self.decide(state, *requirement),
            None => self.decide(state, AccessRequirement::Authenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::session::AuthSession;
    use chrono::Duration;

    fn signed_in(id: &str, is_admin: bool) -> SessionState {
        let session = AuthSession::new(
            Identity::new(id, None),
            "token".to_string(),
            None,
            Duration::hours(1),
        );
        SessionState::resolved(Some(session), is_admin)
    }

    #[test]
    fn loading_state_shows_loading_for_any_requirement() {
        let gate = AccessGate::default();
        let state = SessionState::loading();

        assert_eq!(
            gate.decide(&state, AccessRequirement::Authenticated),
            GateDecision::Loading
        );
        assert_eq!(
            gate.decide(&state, AccessRequirement::Admin),
            GateDecision::Loading
        );
    }

    #[test]
    fn unauthenticated_redirects_to_login_replacing_history() {
        let gate = AccessGate::default();
        let decision = gate.decide(
            &SessionState::unauthenticated(),
            AccessRequirement::Authenticated,
        );

        assert_eq!(
            decision,
            GateDecision::Redirect {
                to: "/login".to_string(),
                replace: true
            }
        );
    }

    #[test]
    fn custom_login_route_is_used() {
        let gate = AccessGate::new("/auth");
        let decision = gate.decide(&SessionState::unauthenticated(), AccessRequirement::Admin);
        assert!(matches!(decision, GateDecision::Redirect { ref to, .. } if to == "/auth"));
    }

    #[test]
    fn non_admin_is_denied_admin_region() {
        let gate = AccessGate::default();
        let state = signed_in("u1", false);

        assert_eq!(
            gate.decide(&state, AccessRequirement::Admin),
            GateDecision::Denied
        );
        assert_eq!(
            gate.decide(&state, AccessRequirement::Authenticated),
            GateDecision::Render
        );
    }

    #[test]
    fn admin_renders_admin_region() {
        let gate = AccessGate::default();
        assert_eq!(
            gate.decide(&signed_in("u2", true), AccessRequirement::Admin),
            GateDecision::Render
        );
    }

    #[test]
    fn require_admin_flag_maps_to_requirement() {
        assert_eq!(
            AccessRequirement::from_require_admin(true),
            AccessRequirement::Admin
        );
        assert_eq!(
            AccessRequirement::from_require_admin(false),
            AccessRequirement::Authenticated
        );
    }

    #[test]
    fn route_catalogue_drives_decisions() {
        let gate = AccessGate::default();
        let employee = signed_in("u1", false);

        assert_eq!(
            gate.decide_route("/erp-reports", &employee),
            GateDecision::Denied
        );
        assert_eq!(
            gate.decide_route("/time-bank/", &employee),
            GateDecision::Render
        );
        assert_eq!(
            gate.decide_route("/login", &SessionState::loading()),
            GateDecision::Render
        );
        assert!(matches!(
            gate.decide_route("/not-catalogued", &SessionState::unauthenticated()),
            GateDecision::Redirect { .. }
        ));
    }

    #[test]
    fn find_route_normalizes_trailing_slash() {
        assert_eq!(find_route("/").map(|r| r.title), Some("Dashboard"));
        assert_eq!(
            find_route("/admin/users/").map(|r| r.requirement),
            Some(Some(AccessRequirement::Admin))
        );
        assert!(find_route("/nope").is_none());
    }
}
