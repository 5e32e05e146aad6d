use crate::model::{Environment, Id};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Cache entry with the instant it was loaded
#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    loaded_at: Instant,
}

/// Map whose entries expire a fixed time after they were stored
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Get a value if present and not expired
    pub fn get(&self, key: &K) -> Option<V> {
        if self.ttl.is_zero() {
            return None;
        }

        let mut entries = self.entries.lock();
        let fresh = entries
            .get(key)
            .map(|entry| entry.loaded_at.elapsed() <= self.ttl)?;
        if fresh {
            entries.get(key).map(|entry| entry.value.clone())
        } else {
            entries.remove(key);
            None
        }
    }

    pub fn put(&self, key: K, value: V) {
        if self.ttl.is_zero() {
            return;
        }

        self.entries.lock().insert(
            key,
            CacheEntry {
                value,
                loaded_at: Instant::now(),
            },
        );
    }

    /// Drop every entry whose key matches the predicate
    pub fn invalidate_where(&self, predicate: impl Fn(&K) -> bool) {
        self.entries.lock().retain(|key, _| !predicate(key));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Short-lived cache for environment reads.
///
/// Lookups by id, by name and whole listings are cached per gamespace.
/// Any write to a gamespace's environments drops all of its entries.
#[derive(Debug)]
pub struct EnvironmentReadCache {
    by_id: TtlCache<(String, Id), Environment>,
    by_name: TtlCache<(String, String), Environment>,
    listings: TtlCache<String, Vec<Environment>>,
}

impl EnvironmentReadCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            by_id: TtlCache::new(ttl),
            by_name: TtlCache::new(ttl),
            listings: TtlCache::new(ttl),
        }
    }

    pub fn get_by_id(&self, gamespace: &str, environment_id: Id) -> Option<Environment> {
        self.by_id.get(&(gamespace.to_string(), environment_id))
    }

    pub fn get_by_name(&self, gamespace: &str, name: &str) -> Option<Environment> {
        self.by_name.get(&(gamespace.to_string(), name.to_string()))
    }

    pub fn get_listing(&self, gamespace: &str) -> Option<Vec<Environment>> {
        self.listings.get(&gamespace.to_string())
    }

    pub fn put(&self, environment: &Environment) {
        self.by_id.put(
            (environment.gamespace.clone(), environment.environment_id),
            environment.clone(),
        );
        self.by_name.put(
            (environment.gamespace.clone(), environment.name.clone()),
            environment.clone(),
        );
    }

    pub fn put_listing(&self, gamespace: &str, environments: Vec<Environment>) {
        self.listings.put(gamespace.to_string(), environments);
    }

    pub fn invalidate_gamespace(&self, gamespace: &str) {
        self.by_id.invalidate_where(|(space, _)| space == gamespace);
        self.by_name.invalidate_where(|(space, _)| space == gamespace);
        self.listings.invalidate_where(|space| space == gamespace);
    }
}
