//! Role Resolver: "is this identity an admin?".
//!
//! At most one remote lookup per distinct identity for the resolver's
//! lifetime. Lookup failures answer "not admin" and are not cached, so a
//! network error never grants elevated capability and stays retryable.

use async_trait::async_trait;
use peoplehub_core::IdentityId;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{InMemoryRoleCache, RoleCache};
use crate::error::RoleLookupError;
use crate::role::{Role, RoleAssertion};

/// Remote source of role assertions.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Point lookup of a role assertion for `(identity_id, role)`.
    ///
    /// Returns `Ok(None)` when no such row exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup could not be completed.
    async fn find_assertion(
        &self,
        identity_id: &IdentityId,
        role: Role,
    ) -> Result<Option<RoleAssertion>, RoleLookupError>;
}

/// Resolves and memoizes the admin flag per identity.
#[derive(Clone)]
pub struct RoleResolver {
    directory: Arc<dyn RoleDirectory>,
    cache: Arc<dyn RoleCache>,
}

impl RoleResolver {
    /// Creates a resolver with a fresh unbounded cache.
    #[must_use]
    pub fn new(directory: Arc<dyn RoleDirectory>) -> Self {
        Self::with_cache(directory, Arc::new(InMemoryRoleCache::new()))
    }

    /// Creates a resolver over an injected cache.
    #[must_use]
    pub fn with_cache(directory: Arc<dyn RoleDirectory>, cache: Arc<dyn RoleCache>) -> Self {
        Self { directory, cache }
    }

    /// Returns true if `identity_id` holds the admin role.
    ///
    /// Concurrent first calls for the same identity may each query the
    /// directory; the read is idempotent so this is tolerated.
    pub async fn is_admin(&self, identity_id: &IdentityId) -> bool {
        if let Some(cached) = self.cache.get(identity_id) {
            debug!(identity_id = %identity_id, is_admin = cached, "role cache hit");
            return cached;
        }

        match self.directory.find_assertion(identity_id, Role::Admin).await {
            Ok(assertion) => {
                let is_admin = assertion.is_some_and(|a| a.role.is_admin());
                debug!(identity_id = %identity_id, is_admin, "role resolved");
                self.cache.insert(identity_id.clone(), is_admin);
                is_admin
            }
            Err(e) => {
                warn!(
                    identity_id = %identity_id,
                    error = %e,
                    "role lookup failed, treating identity as non-admin"
                );
                false
            }
        }
    }

    /// Drops the memoized flag for one identity.
    pub fn forget(&self, identity_id: &IdentityId) {
        self.cache.remove(identity_id);
    }

    /// Drops every memoized flag.
    pub fn reset(&self) {
        self.cache.clear();
    }

    /// Returns the cache backing this resolver.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn RoleCache> {
        &self.cache
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Directory fake with scripted admins, scripted failures, and a call counter.
    #[derive(Default)]
    pub struct FakeDirectory {
        pub admins: Mutex<HashSet<IdentityId>>,
        pub failures: Mutex<HashMap<IdentityId, usize>>,
        pub calls: AtomicUsize,
    }

    impl FakeDirectory {
        pub fn with_admins(admins: &[&str]) -> Self {
            let directory = Self::default();
            directory
                .admins
                .lock()
                .unwrap()
                .extend(admins.iter().map(|a| IdentityId::from(*a)));
            directory
        }

        /// Makes the next `times` lookups for `identity` fail.
        pub fn fail_next(&self, identity: &str, times: usize) {
            self.failures
                .lock()
                .unwrap()
                .insert(IdentityId::from(identity), times);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RoleDirectory for FakeDirectory {
        async fn find_assertion(
            &self,
            identity_id: &IdentityId,
            role: Role,
        ) -> Result<Option<RoleAssertion>, RoleLookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(remaining) = self.failures.lock().unwrap().get_mut(identity_id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(RoleLookupError::RequestFailed {
                        reason: "connection reset".to_string(),
                    });
                }
            }

            let found = role.is_admin() && self.admins.lock().unwrap().contains(identity_id);
            Ok(found.then(|| RoleAssertion::new(identity_id.clone(), role)))
        }
    }
}
