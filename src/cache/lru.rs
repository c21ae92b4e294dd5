//! A small strict-LRU map.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use thiserror::Error;

/// Cache construction errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A cache with no room can never hold an entry.
    #[error("cache capacity must be at least 1")]
    ZeroCapacity,
}

/// Bounded map with strict least-recently-used eviction.
///
/// Every `get` hit promotes the key to most-recently-used; inserting a
/// new key at capacity evicts exactly the least-recently-used one,
/// synchronously. Recency bookkeeping is a linear scan of the order
/// queue, which is fine at the tens-of-entries capacities this serves.
#[derive(Debug)]
pub struct LruCache<K, V> {
    entries: HashMap<K, V>,
    // Front is least recently used, back is most recently used.
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// Creates a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        Ok(Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Looks up a key, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.promote(key);
        self.entries.get(key)
    }

    /// Inserts or updates an entry.
    ///
    /// An existing key has its value replaced and its recency
    /// refreshed. A new key at capacity first evicts the
    /// least-recently-used entry.
    pub fn put(&mut self, key: K, value: V) {
        if self.entries.contains_key(&key) {
            self.promote(&key);
            self.entries.insert(key, value);
            return;
        }
        if self.entries.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every entry immediately.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn promote(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            LruCache::<String, u32>::new(0),
            Err(CacheError::ZeroCapacity)
        ));
    }

    #[test]
    fn test_get_miss_and_hit() {
        let mut cache = LruCache::new(2).unwrap();
        assert_eq!(cache.get(&"a"), None);
        cache.put("a", 1);
        assert_eq!(cache.get(&"a"), Some(&1));
    }

    #[test]
    fn test_eviction_order_is_lru() {
        let mut cache = LruCache::new(2).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3); // evicts "a"

        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(&2));
        assert_eq!(cache.get(&"c"), Some(&3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let mut cache = LruCache::new(2).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        cache.get(&"a"); // "b" is now least recently used
        cache.put("c", 3); // evicts "b"

        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.get(&"b"), None);
    }

    #[test]
    fn test_put_existing_updates_without_eviction() {
        let mut cache = LruCache::new(2).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("a", 10); // update, no eviction

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(&10));
        assert_eq!(cache.get(&"b"), Some(&2));

        // The update also refreshed "a"'s recency
        cache.put("a", 11);
        cache.put("c", 3); // evicts "b", not "a"
        assert_eq!(cache.get(&"a"), Some(&11));
        assert_eq!(cache.get(&"b"), None);
    }

    proptest::proptest! {
        #[test]
        fn prop_len_never_exceeds_capacity(
            capacity in 1usize..8,
            ops in proptest::collection::vec((0u8..16, proptest::prelude::any::<bool>()), 0..200)
        ) {
            let mut cache = LruCache::new(capacity).unwrap();
            for (key, is_put) in ops {
                if is_put {
                    cache.put(key, u32::from(key));
                } else {
                    cache.get(&key);
                }
                proptest::prop_assert!(cache.len() <= capacity);
                // Every retained value is still correct
                if let Some(&v) = cache.get(&key) {
                    proptest::prop_assert_eq!(v, u32::from(key));
                }
            }
        }
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut cache = LruCache::new(4).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a"), None);
        // Capacity survives a clear
        assert_eq!(cache.capacity(), 4);
    }
}
