//! Memoization of resolved instances.
//!
//! Each cache key owns a `OnceCell`. The shard lock only guards the lookup or
//! insertion of that cell; factories run outside of it, so different keys
//! never wait on each other's construction, while concurrent callers of the
//! same key share one construction.

use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::config::DEFAULT_CACHE_SHARDS;
use crate::error::DiResult;
use crate::key::CacheKey;
use crate::registration::Instance;

#[cfg(feature = "ahash")]
type CacheHasher = ahash::RandomState;
#[cfg(not(feature = "ahash"))]
type CacheHasher = std::collections::hash_map::RandomState;

type Cell = Arc<OnceCell<Instance>>;
type Shard = RwLock<HashMap<CacheKey, Cell, CacheHasher>>;

/// Sharded, never-evicting table of cached instances.
///
/// # Examples
///
/// ```rust
/// use tenant_di::{CacheKey, Instance, InstanceCache, ServiceId};
/// use std::sync::Arc;
///
/// let cache = InstanceCache::new(4);
/// let key = CacheKey::new(None, ServiceId::of::<u32>(), ServiceId::of::<u32>());
///
/// let first = cache.get_or_create(&key, || Ok(Instance::new(Arc::new(7u32)))).unwrap();
/// let second = cache.get_or_create(&key, || unreachable!()).unwrap();
/// assert!(first.ptr_eq(&second));
/// assert_eq!(cache.len(), 1);
/// ```
pub struct InstanceCache {
    shards: Box<[Shard]>,
    hasher: CacheHasher,
}

impl InstanceCache {
    /// Creates a cache with `shards` lock shards (at least one).
    pub fn new(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards)
                .map(|_| RwLock::new(HashMap::with_hasher(CacheHasher::default())))
                .collect(),
            hasher: CacheHasher::default(),
        }
    }

    #[inline]
    fn shard(&self, key: &CacheKey) -> &Shard {
        let hash = self.hasher.hash_one(key);
        &self.shards[(hash as usize) % self.shards.len()]
    }

    fn cell(&self, key: &CacheKey) -> Cell {
        let shard = self.shard(key);
        let existing = shard.read().get(key).cloned();
        match existing {
            Some(cell) => cell,
            None => shard.write().entry(key.clone()).or_default().clone(),
        }
    }

    /// Returns the instance cached under `key`, running `factory` to create it
    /// when absent.
    ///
    /// The factory runs at most once per key even under concurrent calls; the
    /// other callers block until it finishes and receive its result. A failing
    /// factory leaves nothing behind for the key, so a later call retries.
    pub fn get_or_create<F>(&self, key: &CacheKey, factory: F) -> DiResult<Instance>
    where
        F: FnOnce() -> DiResult<Instance>,
    {
        let cell = self.cell(key);
        if let Some(instance) = cell.get() {
            tracing::trace!(key = %key, "instance cache hit");
            return Ok(instance.clone());
        }

        let result = cell
            .get_or_try_init(|| {
                tracing::debug!(key = %key, "creating cached instance");
                factory()
            })
            .cloned();
        if let Err(error) = &result {
            tracing::warn!(key = %key, error = %error, "instance creation failed");
            self.discard_empty(key, cell);
        }
        result
    }

    // Drops the slot of a failed key unless another caller still holds it
    fn discard_empty(&self, key: &CacheKey, cell: Cell) {
        let mut shard = self.shard(key).write();
        let unused = shard.get(key).is_some_and(|slot| {
            Arc::ptr_eq(slot, &cell) && slot.get().is_none() && Arc::strong_count(slot) == 2
        });
        if unused {
            shard.remove(key);
        }
    }

    /// The instance cached under `key`, if it has been created.
    pub fn get(&self, key: &CacheKey) -> Option<Instance> {
        self.shard(key)
            .read()
            .get(key)
            .and_then(|cell| cell.get().cloned())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of created instances.
    ///
    /// Slots whose creation is still in progress are not counted.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().values().filter(|cell| cell.get().is_some()).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InstanceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SHARDS)
    }
}

impl fmt::Debug for InstanceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCache")
            .field("shards", &self.shards.len())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiError;
    use crate::key::ServiceId;
    use crate::tenant::TenantId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(tenant: Option<TenantId>) -> CacheKey {
        CacheKey::new(tenant, ServiceId::of::<String>(), ServiceId::of::<String>())
    }

    impl InstanceCache {
        fn slots(&self) -> usize {
            self.shards.iter().map(|shard| shard.read().len()).sum()
        }
    }

    fn string(value: &str) -> DiResult<Instance> {
        Ok(Instance::new(Arc::new(value.to_string())))
    }

    #[test]
    fn failed_factory_is_retried() {
        let cache = InstanceCache::new(2);
        let k = key(None);

        let failed = cache.get_or_create(&k, || Err(DiError::factory("String", "boom")));
        assert!(failed.is_err());
        assert!(!cache.contains(&k));
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.slots(), 0);

        let created = cache.get_or_create(&k, || string("ok")).unwrap();
        assert_eq!(*created.downcast::<String>().unwrap(), "ok");
        assert!(cache.contains(&k));
    }

    #[test]
    fn tenants_get_separate_entries() {
        let cache = InstanceCache::default();
        let (a, b) = (TenantId::new_v4(), TenantId::new_v4());

        let ia = cache.get_or_create(&key(Some(a)), || string("a")).unwrap();
        let ib = cache.get_or_create(&key(Some(b)), || string("b")).unwrap();
        let shared = cache.get_or_create(&key(None), || string("*")).unwrap();

        assert!(!ia.ptr_eq(&ib));
        assert!(!ia.ptr_eq(&shared));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn factory_runs_once_per_key() {
        let cache = InstanceCache::new(1);
        let calls = AtomicUsize::new(0);
        let k = key(None);

        for _ in 0..5 {
            cache
                .get_or_create(&k, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    string("once")
                })
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn repeatedly_failing_keys_leave_no_slots() {
        let cache = InstanceCache::new(4);
        for attempt in 0..10 {
            let k = key(Some(TenantId::new_v4()));
            let result = cache.get_or_create(&k, || Err(DiError::factory("String", format!("attempt {}", attempt))));
            assert!(result.is_err());
        }
        assert_eq!(cache.slots(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_shards_falls_back_to_one() {
        let cache = InstanceCache::new(0);
        assert!(cache.get_or_create(&key(None), || string("x")).is_ok());
    }
}
