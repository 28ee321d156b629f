//! TTL-bound in-process holder of the published catalog snapshot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::error::Result;
use crate::index;
use crate::product::CatalogSnapshot;
use crate::store::KvStore;

struct Cached {
    snapshot: Arc<CatalogSnapshot>,
    loaded_at: Instant,
}

/// Single-writer snapshot cache. Reads within the TTL return the cached
/// reference without touching the store. On expiry the next caller reloads
/// synchronously; concurrent readers keep the old `Arc` until the new
/// snapshot is fully deserialized, then the reference swaps atomically.
pub struct SnapshotCache {
    store: Arc<dyn KvStore>,
    ttl: Duration,
    slot: RwLock<Option<Cached>>,
}

impl SnapshotCache {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// Cached snapshot, reloading on expiry. `None` before the first sync.
    pub fn get(&self) -> Result<Option<Arc<CatalogSnapshot>>> {
        if let Some(cached) = self.slot.read().as_ref() {
            if cached.loaded_at.elapsed() < self.ttl {
                return Ok(Some(cached.snapshot.clone()));
            }
        }
        // Reload happens outside the lock; a failed reload leaves the old
        // snapshot in place.
        let loaded = index::load_snapshot(self.store.as_ref())?;
        let mut slot = self.slot.write();
        match loaded {
            Some(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *slot = Some(Cached {
                    snapshot: snapshot.clone(),
                    loaded_at: Instant::now(),
                });
                tracing::debug!(products = snapshot.products.len(), "snapshot cache refreshed");
                Ok(Some(snapshot))
            }
            None => {
                *slot = None;
                Ok(None)
            }
        }
    }

    /// Drop the cached snapshot, e.g. after a rebuild notification.
    pub fn invalidate(&self) {
        *self.slot.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_index;
    use crate::product::{AgeGroup, Gender, Product};
    use crate::store::MemoryStore;

    fn sample_product(id: &str) -> Product {
        Product {
            id: id.into(),
            title: "Nivea Men dezodorant".into(),
            brand: "Nivea".into(),
            category_path: vec!["Drogeria".into()],
            category: "Drogeria".into(),
            price: 3.5,
            sale_price: None,
            has_discount: false,
            discount_percent: 0,
            available: true,
            description: "dezodorant".into(),
            image: None,
            url: None,
            target_gender: Gender::Male,
            target_age_group: AgeGroup::Adult,
        }
    }

    #[test]
    fn empty_store_yields_none() {
        let store = Arc::new(MemoryStore::new());
        let cache = SnapshotCache::new(store, Duration::from_secs(60));
        assert!(cache.get().unwrap().is_none());
    }

    #[test]
    fn cached_reference_is_reused_within_ttl() {
        let store = Arc::new(MemoryStore::new());
        build_index(store.as_ref(), &[sample_product("p1")], "2026-01-01T00:00:00Z").unwrap();
        let cache = SnapshotCache::new(store, Duration::from_secs(60));
        let first = cache.get().unwrap().unwrap();
        let second = cache.get().unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn invalidate_forces_reload() {
        let store = Arc::new(MemoryStore::new());
        build_index(store.as_ref(), &[sample_product("p1")], "2026-01-01T00:00:00Z").unwrap();
        let cache = SnapshotCache::new(store.clone(), Duration::from_secs(60));
        let first = cache.get().unwrap().unwrap();
        build_index(
            store.as_ref(),
            &[sample_product("p1"), sample_product("p2")],
            "2026-01-02T00:00:00Z",
        )
        .unwrap();
        cache.invalidate();
        let second = cache.get().unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.products.len(), 2);
    }
}
