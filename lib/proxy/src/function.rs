//! The proxy function trait and the registry of configured functions.

use async_trait::async_trait;
use peoplehub_access::AccessRequirement;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::envelope::{Caller, ProxyRequest};
use crate::error::ProxyError;

/// An action a function implements and what it demands of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    pub name: &'static str,
    pub requirement: AccessRequirement,
}

impl ActionSpec {
    /// An action open to any signed-in caller.
    #[must_use]
    pub const fn authenticated(name: &'static str) -> Self {
        Self {
            name,
            requirement: AccessRequirement::Authenticated,
        }
    }

    /// An action reserved for admins.
    #[must_use]
    pub const fn admin(name: &'static str) -> Self {
        Self {
            name,
            requirement: AccessRequirement::Admin,
        }
    }
}

/// A stateless handler forwarding requests to one third-party API.
///
/// Dispatch has already authenticated and authorized the caller for the
/// requested action by the time `invoke` runs.
#[async_trait]
pub trait ProxyFunction: Send + Sync {
    /// Name the function is addressed by, e.g. `"ai-content"`.
    fn name(&self) -> &'static str;

    /// Actions this function implements.
    fn actions(&self) -> &'static [ActionSpec];

    /// Executes `request` for `caller`, returning the result object.
    ///
    /// # Errors
    ///
    /// Returns an error if the fields are invalid or the upstream call fails.
    async fn invoke(&self, caller: &Caller, request: &ProxyRequest)
    -> Result<JsonValue, ProxyError>;

    /// Looks up an action by name.
    fn action(&self, name: &str) -> Option<&'static ActionSpec> {
        self.actions().iter().find(|spec| spec.name == name)
    }
}

/// Configured proxy functions keyed by name.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<&'static str, Arc<dyn ProxyFunction>>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `function`, replacing any function with the same name.
    pub fn register(&mut self, function: Arc<dyn ProxyFunction>) {
        self.functions.insert(function.name(), function);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, function: Arc<dyn ProxyFunction>) -> Self {
        self.register(function);
        self
    }

    /// Returns the function registered as `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ProxyFunction>> {
        self.functions.get(name)
    }

    /// Names of the registered functions, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.keys().copied()
    }

    /// Number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns true if no function is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
