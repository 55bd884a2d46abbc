use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

#[derive(Debug)]
struct CacheInner<V> {
    entries: HashMap<String, V>,
    stats: CacheStats,
}

/// Instance-owned key/value cache with hit and miss accounting.
///
/// The map lives behind a mutex so one cache can be handed to several
/// consumers through an `Arc` and still be inspected by whoever created it.
#[derive(Debug)]
pub struct Cache<V> {
    inner: Mutex<CacheInner<V>>,
}

impl<V> Default for Cache<V> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                stats: CacheStats::default(),
            }),
        }
    }
}

impl<V: Clone> Cache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();
        match inner.entries.get(key).cloned() {
            Some(value) => {
                inner.stats.hits += 1;
                Some(value)
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        let mut inner = self.inner.lock();
        inner.entries.insert(key.into(), value);
        inner.stats.size = inner.entries.len();
    }

    /// Empties the cache and resets every counter.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.stats = CacheStats::default();
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
}

/// Cache-first user lookup.
pub struct UserService {
    cache: Arc<Cache<User>>,
}

impl Default for UserService {
    fn default() -> Self {
        Self::new(Arc::new(Cache::new()))
    }
}

impl UserService {
    pub fn new(cache: Arc<Cache<User>>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<Cache<User>> {
        &self.cache
    }

    pub fn get_user(&self, user_id: i64) -> Option<User> {
        let key = user_id.to_string();
        if let Some(user) = self.cache.get(&key) {
            return Some(user);
        }

        let user = fetch_from_database(user_id)?;
        tracing::debug!(user_id, "cached user after database fetch");
        self.cache.set(key, user.clone());
        Some(user)
    }
}

/// Simulated lookup: every positive id exists.
fn fetch_from_database(user_id: i64) -> Option<User> {
    (user_id > 0).then(|| User {
        id: user_id,
        name: format!("User {user_id}"),
    })
}

pub struct UserStats {
    cache: Arc<Cache<User>>,
}

impl UserStats {
    pub fn new(cache: Arc<Cache<User>>) -> Self {
        Self { cache }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// More hits than misses and fewer than 1000 entries.
    pub fn is_cache_healthy(&self) -> bool {
        let stats = self.cache_stats();
        stats.hits > stats.misses && stats.size < 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, name: &str) -> User {
        User {
            id,
            name: name.to_string(),
        }
    }

    // =========================================================================
    // Cache
    // =========================================================================

    #[test]
    fn test_cache_operations() {
        let cache = Cache::new();
        cache.set("1", user(1, "Test User"));

        assert_eq!(cache.get("1"), Some(user(1, "Test User")));
        assert_eq!(cache.get("2"), None);
    }

    #[test]
    fn test_cache_stats() {
        let cache = Cache::new();
        cache.get("1");
        cache.set("1", user(1, "A"));
        cache.get("1");
        cache.get("2");

        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 2,
                size: 1
            }
        );
    }

    #[test]
    fn test_cache_clear() {
        let cache = Cache::new();
        cache.set("1", user(1, "A"));
        cache.clear();

        assert_eq!(cache.get("1"), None);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 0,
                misses: 1,
                size: 0
            }
        );
    }

    #[test]
    fn test_overwrite_keeps_size() {
        let cache = Cache::new();
        cache.set("1", user(1, "A"));
        cache.set("1", user(1, "B"));
        assert_eq!(cache.stats().size, 1);
        assert_eq!(cache.get("1"), Some(user(1, "B")));
    }

    // =========================================================================
    // UserService
    // =========================================================================

    #[test]
    fn test_get_user_from_cache() {
        let cache = Arc::new(Cache::new());
        cache.set("1", user(1, "Test User"));
        let service = UserService::new(cache);

        assert_eq!(service.get_user(1), Some(user(1, "Test User")));
    }

    #[test]
    fn test_get_user_from_database() {
        let cache = Arc::new(Cache::new());
        let service = UserService::new(cache.clone());

        assert_eq!(service.get_user(1), Some(user(1, "User 1")));
        assert_eq!(cache.get("1"), Some(user(1, "User 1")), "result should be cached");
    }

    #[test]
    fn test_get_invalid_user() {
        let cache = Arc::new(Cache::new());
        let service = UserService::new(cache.clone());

        assert_eq!(service.get_user(-1), None);
        assert_eq!(service.get_user(0), None);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_services_do_not_share_default_caches() {
        let first = UserService::default();
        let second = UserService::default();
        first.get_user(1);

        assert_eq!(first.cache().stats().size, 1);
        assert_eq!(second.cache().stats().size, 0);
    }

    // =========================================================================
    // UserStats
    // =========================================================================

    #[test]
    fn test_cache_health() {
        let cache = Arc::new(Cache::new());
        let stats = UserStats::new(cache.clone());
        cache.set("1", user(1, "A"));
        cache.get("1");
        cache.get("1");
        cache.get("2");

        assert!(stats.is_cache_healthy());
    }

    #[test]
    fn test_cache_unhealthy() {
        let cache = Arc::new(Cache::new());
        let stats = UserStats::new(cache.clone());
        cache.get("1");
        cache.get("2");
        cache.get("3");
        cache.set("1", user(1, "A"));
        cache.get("1");

        assert!(!stats.is_cache_healthy());
    }

    #[test]
    fn test_cache_unhealthy_when_full() {
        let cache = Arc::new(Cache::new());
        for id in 0..1000 {
            cache.set(id.to_string(), user(id, "bulk"));
        }
        cache.get("1");
        let stats = UserStats::new(cache);

        assert!(!stats.is_cache_healthy(), "1000 entries exceeds the size limit");
    }
}
