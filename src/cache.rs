//! In-memory memo of computed group balances.
//!
//! Entries are dropped by [`BalanceCache::invalidate`], which every ledger write calls
//! after committing. A per-group generation counter stops a computation that started
//! before an invalidation from publishing its (now stale) result, so a writer's next read
//! always reflects its own write.

use crate::core::balance::{Balances, compute_balances};
use crate::errors::Result;
use sea_orm::DatabaseConnection;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<i64, Arc<Balances>>,
    generations: HashMap<i64, u64>,
}

impl CacheState {
    fn generation(&self, group_id: i64) -> u64 {
        self.generations.get(&group_id).copied().unwrap_or(0)
    }
}

/// Shared, cloneable balance cache. Cloning shares the same underlying map.
#[derive(Debug, Clone)]
pub struct BalanceCache {
    enabled: bool,
    state: Arc<RwLock<CacheState>>,
}

impl Default for BalanceCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl BalanceCache {
    /// Creates a cache; when `enabled` is false every read recomputes.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            state: Arc::new(RwLock::new(CacheState::default())),
        }
    }

    /// Returns the group's balances, computing and storing them on a miss.
    pub async fn get_or_compute(
        &self,
        db: &DatabaseConnection,
        group_id: i64,
    ) -> Result<Arc<Balances>> {
        if !self.enabled {
            return Ok(Arc::new(compute_balances(db, group_id).await?));
        }

        let generation = match self.lookup(group_id).await {
            Ok(hit) => {
                trace!(group_id, "Balance cache hit");
                return Ok(hit);
            }
            Err(generation) => generation,
        };

        debug!(group_id, "Balance cache miss, recomputing");
        let balances = Arc::new(compute_balances(db, group_id).await?);
        if !self.store_if_current(group_id, generation, Arc::clone(&balances)).await {
            debug!(group_id, "Group changed during recompute, not caching");
        }
        Ok(balances)
    }

    /// Returns the cached entry, or the generation a fresh computation must be stored under.
    async fn lookup(&self, group_id: i64) -> std::result::Result<Arc<Balances>, u64> {
        let state = self.state.read().await;
        state
            .entries
            .get(&group_id)
            .map(Arc::clone)
            .ok_or_else(|| state.generation(group_id))
    }

    /// Stores `balances` only if no invalidation happened since `generation` was read.
    async fn store_if_current(
        &self,
        group_id: i64,
        generation: u64,
        balances: Arc<Balances>,
    ) -> bool {
        let mut state = self.state.write().await;
        if state.generation(group_id) != generation {
            return false;
        }
        state.entries.insert(group_id, balances);
        true
    }

    /// Drops the group's cached balances and fences in-flight computations.
    pub async fn invalidate(&self, group_id: i64) {
        if !self.enabled {
            return;
        }
        let mut state = self.state.write().await;
        state.entries.remove(&group_id);
        *state.generations.entry(group_id).or_insert(0) += 1;
        trace!(group_id, "Balance cache invalidated");
    }

    /// Number of groups currently cached.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether the cache stores anything at all.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::money::ShareInput;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_get_or_compute_caches_until_invalidated() -> Result<()> {
        init_test_tracing();
        let fixture = setup_group_with_members(&["alice", "bob"]).await?;
        let group_id = fixture.group.id;
        let cache = BalanceCache::new(true);

        let first = cache.get_or_compute(&fixture.db, group_id).await?;
        let second = cache.get_or_compute(&fixture.db, group_id).await?;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len().await, 1);

        cache.invalidate(group_id).await;
        assert!(cache.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn test_writes_are_visible_on_next_read() -> Result<()> {
        init_test_tracing();
        let fixture = setup_group_with_members(&["alice", "bob"]).await?;
        let group_id = fixture.group.id;

        let empty = fixture.cache.get_or_compute(&fixture.db, group_id).await?;
        assert!(empty.is_settled());

        create_test_lending(
            &fixture.db,
            &fixture.cache,
            group_id,
            "alice",
            vec![ShareInput::new("bob", 900)],
        )
        .await?;

        let fresh = fixture.cache.get_or_compute(&fixture.db, group_id).await?;
        assert_eq!(fresh.net("bob", "alice"), 900);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalidate_bumps_generation() -> Result<()> {
        let cache = BalanceCache::new(true);
        assert_eq!(cache.state.read().await.generation(7), 0);
        cache.invalidate(7).await;
        cache.invalidate(7).await;
        assert_eq!(cache.state.read().await.generation(7), 2);
        assert_eq!(cache.state.read().await.generation(8), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_computation_is_not_stored() -> Result<()> {
        let cache = BalanceCache::new(true);
        let Err(generation) = cache.lookup(3).await else {
            panic!("empty cache returned an entry");
        };

        // A write lands while the computation is in flight.
        cache.invalidate(3).await;
        let stale = Arc::new(Balances::default());
        assert!(!cache.store_if_current(3, generation, stale).await);
        assert!(cache.is_empty().await);

        let Err(current) = cache.lookup(3).await else {
            panic!("stale entry was stored");
        };
        assert_eq!(current, generation + 1);
        assert!(cache.store_if_current(3, current, Arc::new(Balances::default())).await);
        assert!(cache.lookup(3).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_cache_never_stores() -> Result<()> {
        let fixture = setup_group_with_members(&["alice"]).await?;
        let cache = BalanceCache::new(false);
        assert!(!cache.is_enabled());

        cache.get_or_compute(&fixture.db, fixture.group.id).await?;
        assert!(cache.is_empty().await);
        Ok(())
    }
}
