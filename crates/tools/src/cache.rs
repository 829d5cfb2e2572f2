//! Bounded TTL cache for tool results.
//!
//! Size-limited with oldest-inserted eviction. Each registry instance owns
//! its caches; nothing here is process-global.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    /// Insertion order, oldest first.
    order: VecDeque<K>,
}

pub struct BoundedCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    capacity: usize,
    ttl: Duration,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let expired = match inner.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
            None => return None,
        };
        if expired {
            inner.entries.remove(key);
            inner.order.retain(|k| k != key);
            return None;
        }
        inner.entries.get(key).map(|e| e.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        } else if inner.entries.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_and_miss() {
        let cache: BoundedCache<String, String> =
            BoundedCache::new(4, Duration::from_secs(60));
        assert!(cache.get(&"a".to_string()).is_none());
        cache.insert("a".into(), "1".into());
        assert_eq!(cache.get(&"a".to_string()).as_deref(), Some("1"));
    }

    #[test]
    fn evicts_oldest_when_full() {
        let cache: BoundedCache<u32, u32> = BoundedCache::new(2, Duration::from_secs(60));
        cache.insert(1, 10);
        cache.insert(2, 20);
        cache.insert(3, 30);
        assert!(cache.get(&1).is_none());
        assert_eq!(cache.get(&2), Some(20));
        assert_eq!(cache.get(&3), Some(30));
    }

    #[test]
    fn reinsert_refreshes_position() {
        let cache: BoundedCache<u32, u32> = BoundedCache::new(2, Duration::from_secs(60));
        cache.insert(1, 10);
        cache.insert(2, 20);
        cache.insert(1, 11); // 1 is now newest
        cache.insert(3, 30); // evicts 2
        assert_eq!(cache.get(&1), Some(11));
        assert!(cache.get(&2).is_none());
    }

    #[test]
    fn expired_entries_miss() {
        let cache: BoundedCache<u32, u32> = BoundedCache::new(4, Duration::from_millis(0));
        cache.insert(1, 10);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&1).is_none());
        assert!(cache.is_empty());
    }
}
