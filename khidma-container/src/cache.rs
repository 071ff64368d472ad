//! Singleton and scoped instance caches.
//!
//! Both caches are maps of contract → `OnceCell<Instance>`. The cell is
//! the unit of mutual exclusion: concurrent first resolutions of one
//! contract block on the same cell, exactly one constructor runs, and a
//! failed constructor leaves the cell empty so the next call retries.
//!
//! Map guards are never held while a cell initializes, because the
//! initializer resolves further contracts through the same maps.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use crate::context::ScopeId;
use crate::descriptor::Instance;
use crate::error::Result;
use crate::key::ContractKey;

/// Contract → instance, entries are never evicted.
#[derive(Default)]
pub(crate) struct InstanceCache {
    cells: DashMap<ContractKey, Arc<OnceCell<Instance>>>,
}

impl InstanceCache {
    pub fn get(&self, contract: &ContractKey) -> Option<Instance> {
        self.cells.get(contract).and_then(|cell| cell.get().cloned())
    }

    /// Returns the cached instance, or runs `create` and caches its result.
    pub fn get_or_try_insert_with(
        &self,
        contract: &ContractKey,
        create: impl FnOnce() -> Result<Instance>,
    ) -> Result<Instance> {
        if let Some(hit) = self.get(contract) {
            return Ok(hit);
        }

        let cell = self.cells.entry(*contract).or_default().clone();
        cell.get_or_try_init(create).cloned()
    }

    /// Number of created instances.
    pub fn len(&self) -> usize {
        self.cells.iter().filter(|cell| cell.get().is_some()).count()
    }
}

/// Scope id → its own [`InstanceCache`].
#[derive(Default)]
pub(crate) struct ScopedCache {
    scopes: DashMap<ScopeId, Arc<InstanceCache>>,
}

impl ScopedCache {
    /// The cache of `scope`, created on first use.
    pub fn scope(&self, scope: ScopeId) -> Arc<InstanceCache> {
        if let Some(cache) = self.scopes.get(&scope) {
            return cache.clone();
        }
        self.scopes.entry(scope).or_default().clone()
    }

    /// The cache of `scope` if it exists.
    pub fn peek(&self, scope: ScopeId) -> Option<Arc<InstanceCache>> {
        self.scopes.get(&scope).map(|cache| cache.clone())
    }

    /// Drops the cache of `scope`. Returns whether it existed.
    pub fn reset(&self, scope: ScopeId) -> bool {
        self.scopes.remove(&scope).is_some()
    }

    /// Scopes with a live cache, sorted.
    pub fn active_scopes(&self) -> Vec<ScopeId> {
        let mut scopes: Vec<ScopeId> = self.scopes.iter().map(|entry| *entry.key()).collect();
        scopes.sort();
        scopes
    }
}
