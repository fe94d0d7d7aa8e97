//! Bounded in-memory cache mapping IP addresses to city ids.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default capacity, matching the deployed service.
const DEFAULT_CAPACITY: usize = 5000;
/// Default entry lifetime.
const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// IP address → city id cache with LRU eviction and per-entry expiry,
/// whichever triggers first. Entries are rebuildable from storage on a
/// miss, so eviction is always safe. Shared across concurrent
/// resolutions; all operations take a short internal lock.
pub struct CityCache {
    inner: Mutex<Inner>,
    capacity: usize,
    ttl: Duration,
}

struct Inner {
    entries: HashMap<String, Entry>,
    /// Recency index, stamp → ip. Stamps are unique and increase on every
    /// touch, so the first key is always the least recently used entry.
    recency: BTreeMap<u64, String>,
    clock: u64,
}

struct Entry {
    city_id: i64,
    expires_at: Instant,
    stamp: u64,
}

impl Default for CityCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl CityCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                clock: 0,
            }),
            capacity,
            ttl,
        }
    }

    /// Look up an IP, refreshing its recency on a hit. An expired entry
    /// is removed and reported as a miss.
    pub fn get(&self, ip: &str) -> Option<i64> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        let (city_id, stamp, expired) = match inner.entries.get(ip) {
            Some(entry) => (entry.city_id, entry.stamp, entry.expires_at <= now),
            None => return None,
        };
        if expired {
            inner.entries.remove(ip);
            inner.recency.remove(&stamp);
            return None;
        }

        inner.recency.remove(&stamp);
        inner.clock += 1;
        let fresh = inner.clock;
        inner.recency.insert(fresh, ip.to_string());
        if let Some(entry) = inner.entries.get_mut(ip) {
            entry.stamp = fresh;
        }
        Some(city_id)
    }

    /// Insert or replace an entry, evicting the least recently used entry
    /// when the cache is full.
    pub fn insert(&self, ip: &str, city_id: i64) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        if let Some(old) = inner.entries.remove(ip) {
            inner.recency.remove(&old.stamp);
        }
        while inner.entries.len() >= self.capacity {
            match inner.recency.pop_first() {
                Some((_, lru_ip)) => {
                    inner.entries.remove(&lru_ip);
                }
                None => break,
            }
        }

        inner.clock += 1;
        let stamp = inner.clock;
        inner.entries.insert(
            ip.to_string(),
            Entry {
                city_id,
                expires_at: now + self.ttl,
                stamp,
            },
        );
        inner.recency.insert(stamp, ip.to_string());
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
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
        let cache = CityCache::default();
        assert_eq!(cache.get("1.2.3.4"), None);
        cache.insert("1.2.3.4", 7);
        assert_eq!(cache.get("1.2.3.4"), Some(7));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn replaces_existing_entry() {
        let cache = CityCache::default();
        cache.insert("1.2.3.4", 7);
        cache.insert("1.2.3.4", 9);
        assert_eq!(cache.get("1.2.3.4"), Some(9));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_least_recently_used_at_capacity() {
        let cache = CityCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);
        // Touch "a" so "b" becomes the LRU entry.
        assert_eq!(cache.get("a"), Some(1));
        cache.insert("c", 3);

        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = CityCache::new(10, Duration::from_millis(10));
        cache.insert("a", 1);
        assert_eq!(cache.get("a"), Some(1));
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }
}
