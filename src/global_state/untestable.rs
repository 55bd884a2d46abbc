use super::testable::{CacheStats, User};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;

struct SharedCache {
    entries: HashMap<i64, User>,
    hits: u64,
    misses: u64,
}

static USER_CACHE: Lazy<Mutex<SharedCache>> = Lazy::new(|| {
    Mutex::new(SharedCache {
        entries: HashMap::new(),
        hits: 0,
        misses: 0,
    })
});

/// Handle onto the one process-wide cache. Every instance sees the same data.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserCache;

impl UserCache {
    pub fn get(&self, user_id: i64) -> Option<User> {
        let mut cache = USER_CACHE.lock();
        match cache.entries.get(&user_id).cloned() {
            Some(user) => {
                cache.hits += 1;
                Some(user)
            }
            None => {
                cache.misses += 1;
                None
            }
        }
    }

    pub fn set(&self, user_id: i64, user: User) {
        USER_CACHE.lock().entries.insert(user_id, user);
    }

    pub fn clear(&self) {
        let mut cache = USER_CACHE.lock();
        cache.entries.clear();
        cache.hits = 0;
        cache.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let cache = USER_CACHE.lock();
        CacheStats {
            hits: cache.hits,
            misses: cache.misses,
            size: cache.entries.len(),
        }
    }
}

#[derive(Debug, Default)]
pub struct UserService {
    cache: UserCache,
}

impl UserService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_user(&self, user_id: i64) -> Option<User> {
        if let Some(user) = self.cache.get(user_id) {
            return Some(user);
        }
        let user = (user_id > 0).then(|| User {
            id: user_id,
            name: format!("User {user_id}"),
        })?;
        self.cache.set(user_id, user.clone());
        Some(user)
    }
}

#[derive(Debug, Default)]
pub struct UserStats {
    cache: UserCache,
}

impl UserStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn is_cache_healthy(&self) -> bool {
        let stats = self.cache_stats();
        stats.hits > stats.misses && stats.size < 1000
    }
}
