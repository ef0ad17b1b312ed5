use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;

/// Capacity-bounded map from key to independently locked per-key state.
///
/// The outer lock is held only long enough to find or create the per-key
/// slot; callers then lock the slot itself, so unrelated keys never contend
/// on the mutation. Once `capacity` keys are tracked, the least recently
/// used key is evicted, which is indistinguishable from that key never
/// having been seen.
pub struct BoundedKeyedCache<K, V> {
    entries: Mutex<LruCache<K, Arc<Mutex<V>>>>,
}

impl<K, V> BoundedKeyedCache<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { entries: Mutex::new(LruCache::new(capacity)) }
    }

    /// Zero is clamped to one so a misconfigured bound still holds one key.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN))
    }

    /// Returns the slot for `key`, creating an empty one if absent, and marks
    /// the key as most recently used.
    pub fn slot_or_default(&self, key: &K) -> Arc<Mutex<V>>
    where
        V: Default,
    {
        let mut entries = lock(&self.entries);
        Arc::clone(entries.get_or_insert(key.clone(), || Arc::new(Mutex::new(V::default()))))
    }

    /// Returns the slot for `key` if tracked, marking it as most recently used.
    pub fn slot(&self, key: &K) -> Option<Arc<Mutex<V>>> {
        lock(&self.entries).get(key).map(Arc::clone)
    }

    pub fn remove(&self, key: &K) -> bool {
        lock(&self.entries).pop(key).is_some()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        lock(&self.entries).cap().get()
    }
}

/// Every critical section in this crate leaves its state consistent, so a
/// poisoned lock is safe to keep using.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{lock, BoundedKeyedCache};

    #[test]
    fn creates_slots_lazily() {
        let cache = BoundedKeyedCache::<String, Vec<u32>>::with_capacity(4);
        assert!(cache.is_empty());
        assert!(cache.slot(&"a".to_owned()).is_none());

        let slot = cache.slot_or_default(&"a".to_owned());
        lock(&slot).push(7);

        assert_eq!(cache.len(), 1);
        let again = cache.slot(&"a".to_owned()).expect("slot should exist");
        assert_eq!(*lock(&again), vec![7]);
        assert!(Arc::ptr_eq(&slot, &again));
    }

    #[test]
    fn evicts_least_recently_used_key_at_capacity() {
        let cache = BoundedKeyedCache::<&str, u32>::with_capacity(2);
        cache.slot_or_default(&"a");
        cache.slot_or_default(&"b");
        // touch `a` so `b` becomes the eviction candidate
        let _ = cache.slot(&"a");
        cache.slot_or_default(&"c");

        assert_eq!(cache.len(), 2);
        assert!(cache.slot(&"a").is_some());
        assert!(cache.slot(&"b").is_none());
        assert!(cache.slot(&"c").is_some());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let cache = BoundedKeyedCache::<u8, u8>::with_capacity(0);
        assert_eq!(cache.capacity(), 1);
        cache.slot_or_default(&1);
        cache.slot_or_default(&2);
        assert_eq!(cache.len(), 1);
        assert!(cache.remove(&2));
        assert!(!cache.remove(&2));
    }
}
