// Time- and capacity-bounded resource cache.
//
// One instance per resource kind (game detail, flow, game list). Entries
// expire by age and the oldest-fetched entry is evicted when a new key
// arrives at capacity. Expired entries are not swept; they stay until
// overwritten or evicted.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// TTL, freshness window and capacity for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Age at which an entry is treated as absent.
    pub ttl: Duration,
    /// Age below which an entry is fresh enough to skip fetching entirely.
    /// Always `<= ttl`.
    pub fresh_for: Duration,
    pub capacity: usize,
}

impl CachePolicy {
    pub fn new(ttl: Duration, fresh_for: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            fresh_for: fresh_for.min(ttl),
            capacity: capacity.max(1),
        }
    }

    /// Game detail: 5 minutes, 8 entries, always refreshed in the background
    /// on a hit.
    pub fn game_detail() -> Self {
        Self::new(Duration::from_secs(300), Duration::ZERO, 8)
    }

    /// Flow: 5 minutes, 8 entries.
    pub fn flow() -> Self {
        Self::new(Duration::from_secs(300), Duration::ZERO, 8)
    }

    /// Game list by section: 90 second TTL, fetches suppressed for 45 seconds.
    pub fn game_list() -> Self {
        Self::new(Duration::from_secs(90), Duration::from_secs(45), 16)
    }
}

// ---------------------------------------------------------------------------
// Lookup result
// ---------------------------------------------------------------------------

/// Three-tier staleness of a cached value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    /// Serve immediately, no fetch.
    Fresh(V),
    /// Serve immediately, refetch silently.
    Stale(V),
    /// Nothing usable; the caller must fetch before serving.
    Absent,
}

impl<V> Lookup<V> {
    pub fn value(self) -> Option<V> {
        match self {
            Lookup::Fresh(v) | Lookup::Stale(v) => Some(v),
            Lookup::Absent => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ResourceCache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
}

/// Generic key/value cache with TTL expiry and oldest-fetched eviction.
///
/// Not internally synchronized: owners hold it behind a mutex so an
/// eviction scan is never interleaved with another mutation.
#[derive(Debug)]
pub struct ResourceCache<K, V> {
    policy: CachePolicy,
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K, V> ResourceCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: HashMap::with_capacity(policy.capacity),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Value for `key` if it is younger than the TTL.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let entry = self.entries.get(key)?;
        if now.saturating_duration_since(entry.fetched_at) >= self.policy.ttl {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Classify the entry for `key` as fresh, stale or absent.
    pub fn lookup(&self, key: &K) -> Lookup<V> {
        self.lookup_at(key, Instant::now())
    }

    pub fn lookup_at(&self, key: &K, now: Instant) -> Lookup<V> {
        let Some(entry) = self.entries.get(key) else {
            return Lookup::Absent;
        };
        let age = now.saturating_duration_since(entry.fetched_at);
        if age >= self.policy.ttl {
            Lookup::Absent
        } else if age < self.policy.fresh_for {
            Lookup::Fresh(entry.value.clone())
        } else {
            Lookup::Stale(entry.value.clone())
        }
    }

    /// Insert or overwrite `key`. Returns the evicted key, if any.
    pub fn set(&mut self, key: K, value: V) -> Option<K> {
        self.set_at(key, value, Instant::now())
    }

    pub fn set_at(&mut self, key: K, value: V, now: Instant) -> Option<K> {
        let mut evicted = None;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.policy.capacity {
            evicted = self.oldest_key();
            if let Some(old) = &evicted {
                self.entries.remove(old);
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at: now,
            },
        );
        evicted
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|e| e.value)
    }

    /// Whether `key` is physically present, expired or not.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn oldest_key(&self) -> Option<K> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| entry.fetched_at)
            .map(|(key, _)| key.clone())
    }
}
