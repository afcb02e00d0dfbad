//! Request dispatch: function lookup, envelope validation, caller checks.

use peoplehub_access::{AuthProvider, RoleResolver};
use peoplehub_core::RequestId;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::envelope::{Caller, ProxyRequest};
use crate::error::ProxyError;
use crate::function::FunctionRegistry;

/// Routes proxy requests to registered functions.
///
/// Checks run in a fixed order: unknown function (404), malformed body or
/// unknown action (400), missing or rejected bearer (401), missing admin
/// role (403). Only then is the function invoked.
#[derive(Clone)]
pub struct Dispatcher {
    registry: FunctionRegistry,
    provider: Arc<dyn AuthProvider>,
    resolver: RoleResolver,
}

impl Dispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        registry: FunctionRegistry,
        provider: Arc<dyn AuthProvider>,
        resolver: RoleResolver,
    ) -> Self {
        Self {
            registry,
            provider,
            resolver,
        }
    }

    /// Returns the registered functions.
    #[must_use]
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Handles one request addressed to function `name`.
    ///
    /// # Errors
    ///
    /// Returns the [`ProxyError`] describing the first check that failed, or
    /// the function's own error.
    #[instrument(skip_all, fields(request_id = %RequestId::new(), function = %name))]
    pub async fn dispatch(
        &self,
        name: &str,
        bearer: Option<&str>,
        body: &[u8],
    ) -> Result<JsonValue, ProxyError> {
        let function = self
            .registry
            .get(name)
            .ok_or_else(|| ProxyError::UnknownFunction {
                name: name.to_string(),
            })?;

        let request = ProxyRequest::parse(body)?;
        let spec = function
            .action(request.action())
            .ok_or_else(|| ProxyError::UnknownAction {
                action: request.action().to_string(),
            })?;

        let caller = self.authenticate(bearer).await?;
        caller.require(spec.requirement)?;

        debug!(
            action = spec.name,
            identity_id = %caller.identity().id(),
            "invoking proxy function"
        );
        match function.invoke(&caller, &request).await {
            Ok(result) => {
                info!(action = spec.name, "proxy request completed");
                Ok(result)
            }
            Err(e) => {
                warn!(action = spec.name, error = %e, "proxy request failed");
                Err(e)
            }
        }
    }

    /// Resolves a bearer token to a [`Caller`].
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Unauthenticated`] for a missing or rejected
    /// token, and [`ProxyError::Unreachable`] if the auth provider is down.
    pub async fn authenticate(&self, bearer: Option<&str>) -> Result<Caller, ProxyError> {
        let token = bearer
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ProxyError::Unauthenticated)?;

        let identity = match self.provider.get_user(token).await {
            Ok(Some(identity)) => identity,
            Ok(None) => return Err(ProxyError::Unauthenticated),
            Err(e) => {
                warn!(error = %e, "could not verify bearer token");
                return Err(ProxyError::Unreachable {
                    service: "auth".to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let is_admin = self.resolver.is_admin(identity.id()).await;
        Ok(Caller::new(identity, is_admin))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use peoplehub_access::{
        AuthListener, AuthProvider, AuthSession, AuthenticationError, Identity, ListenerRegistry,
        Role, RoleAssertion, RoleDirectory, RoleLookupError, Subscription,
    };
    use peoplehub_core::IdentityId;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that knows a fixed token table.
    #[derive(Default)]
    pub struct TokenTable {
        pub tokens: HashMap<String, Identity>,
        pub outage: bool,
        listeners: ListenerRegistry,
    }

    impl TokenTable {
        pub fn with(tokens: &[(&str, &str)]) -> Self {
            Self {
                tokens: tokens
                    .iter()
                    .map(|(token, id)| ((*token).to_string(), Identity::new(*id, None)))
                    .collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl AuthProvider for TokenTable {
        fn on_auth_state_change(&self, listener: AuthListener) -> Subscription {
            self.listeners.register(listener)
        }

        async fn get_session(&self) -> Result<Option<AuthSession>, AuthenticationError> {
            Ok(None)
        }

        async fn sign_out(&self) -> Result<(), AuthenticationError> {
            Ok(())
        }

        async fn get_user(&self, access_token: &str) -> Result<Option<Identity>, AuthenticationError> {
            if self.outage {
                return Err(AuthenticationError::ProviderError {
                    provider: "test".to_string(),
                    reason: "down".to_string(),
                });
            }
            Ok(self.tokens.get(access_token).cloned())
        }
    }

    /// Directory granting admin to a fixed set of identities.
    #[derive(Default)]
    pub struct Admins {
        pub ids: Vec<String>,
        pub calls: AtomicUsize,
    }

    impl Admins {
        pub fn of(ids: &[&str]) -> Self {
            Self {
                ids: ids.iter().map(|id| (*id).to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RoleDirectory for Admins {
        async fn find_assertion(
            &self,
            identity_id: &IdentityId,
            role: Role,
        ) -> Result<Option<RoleAssertion>, RoleLookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let found = role.is_admin() && self.ids.iter().any(|id| id == identity_id.as_str());
            Ok(found.then(|| RoleAssertion::new(identity_id.clone(), role)))
        }
    }
}
