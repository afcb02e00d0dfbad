//! Memoization of the per-identity admin flag.
//!
//! The cache is injected into the [`RoleResolver`](crate::resolver::RoleResolver)
//! rather than living in a module-level global, so each resolver (and each
//! test) owns its own entries.

use peoplehub_core::IdentityId;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

/// Key-value store mapping identity id to "holds admin".
pub trait RoleCache: Send + Sync {
    /// Returns the cached flag for `identity_id`, if present.
    fn get(&self, identity_id: &IdentityId) -> Option<bool>;

    /// Records the flag for `identity_id`.
    fn insert(&self, identity_id: IdentityId, is_admin: bool);

    /// Drops the entry for `identity_id`.
    fn remove(&self, identity_id: &IdentityId);

    /// Drops every entry.
    fn clear(&self);

    /// Number of cached identities.
    fn len(&self) -> usize;

    /// Returns true if nothing is cached.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct Entries {
    flags: HashMap<IdentityId, bool>,
    order: VecDeque<IdentityId>,
}

/// In-memory [`RoleCache`].
///
/// Unbounded by default, which suits a client serving one person. A bounded
/// cache evicts the oldest inserted identity once `capacity` is reached.
#[derive(Debug, Default)]
pub struct InMemoryRoleCache {
    entries: Mutex<Entries>,
    capacity: Option<usize>,
}

impl InMemoryRoleCache {
    /// Creates an unbounded cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache holding at most `capacity` identities.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            entries: Mutex::default(),
            capacity: Some(capacity.max(1)),
        }
    }

    /// Returns the configured capacity, if bounded.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RoleCache for InMemoryRoleCache {
    fn get(&self, identity_id: &IdentityId) -> Option<bool> {
        self.entries().flags.get(identity_id).copied()
    }

    fn insert(&self, identity_id: IdentityId, is_admin: bool) {
        let mut entries = self.entries();
        if entries.flags.insert(identity_id.clone(), is_admin).is_some() {
            return;
        }
        entries.order.push_back(identity_id);

        if let Some(capacity) = self.capacity {
            while entries.order.len() > capacity {
                if let Some(oldest) = entries.order.pop_front() {
                    entries.flags.remove(&oldest);
                }
            }
        }
    }

    fn remove(&self, identity_id: &IdentityId) {
        let mut entries = self.entries();
        if entries.flags.remove(identity_id).is_some() {
            entries.order.retain(|id| id != identity_id);
        }
    }

    fn clear(&self) {
        let mut entries = self.entries();
        entries.flags.clear();
        entries.order.clear();
    }

    fn len(&self) -> usize {
        self.entries().flags.len()
    }
}
