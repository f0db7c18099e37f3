//! Read-through cache of user records keyed by email.
//!
//! Entries expire a fixed TTL after they were written. Expiry is checked on
//! read: an expired entry is reported as absent and removed on the spot, and
//! there is no background sweeper. An expired entry that is never read again
//! stays in memory until the same key is written, deleted or looked up.
//!
//! The map sits behind a reader/writer lock. Lookups share the read lock,
//! writes take it exclusively, and the lock is only held for the map
//! operation itself, never across an `.await`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use crate::storage::User;

struct CacheEntry {
    user: User,
    expires_at: Instant,
}

/// Cache hit/miss counters and current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries physically present, expired or not.
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

/// TTL cache of user records.
pub struct UserCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl UserCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached record, or `None` if it was never set or has expired.
    pub fn get(&self, email: &str) -> Option<User> {
        let now = Instant::now();

        {
            let entries = self.entries.read();
            match entries.get(email) {
                Some(entry) if entry.expires_at > now => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(email, "User cache hit");
                    return Some(entry.user.clone());
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    debug!(email, "User cache miss");
                    return None;
                }
            }
        }

        // Expired. Another writer may have refreshed the entry between the
        // two locks, so re-check before removing.
        let mut entries = self.entries.write();
        if entries
            .get(email)
            .is_some_and(|entry| entry.expires_at <= now)
        {
            entries.remove(email);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(email, "User cache entry expired");
        None
    }

    /// Stores `user` under `email`, replacing any previous entry and resetting
    /// its expiry to now + TTL.
    pub fn set(&self, email: &str, user: User) {
        let entry = CacheEntry {
            user,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().insert(email.to_string(), entry);
        debug!(email, ttl = ?self.ttl, "User cached");
    }

    /// Removes the entry for `email`. Does nothing if there is none.
    pub fn delete(&self, email: &str) {
        if self.entries.write().remove(email).is_some() {
            debug!(email, "User removed from cache");
        }
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Entries physically present, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::NewUser;

    fn user(email: &str) -> User {
        User::new(
            &NewUser {
                email: email.to_string(),
                name: None,
            },
            "hash",
        )
    }

    #[test]
    fn test_get_after_set() {
        let cache = UserCache::new(Duration::from_secs(60));
        let stored = user("a@x.com");

        cache.set("a@x.com", stored.clone());
        assert_eq!(cache.get("a@x.com"), Some(stored));
    }

    #[test]
    fn test_missing_key() {
        let cache = UserCache::new(Duration::from_secs(60));
        assert!(cache.get("nobody@x.com").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_entry_expires() {
        let cache = UserCache::new(Duration::from_millis(30));
        cache.set("a@x.com", user("a@x.com"));

        std::thread::sleep(Duration::from_millis(60));

        assert!(cache.get("a@x.com").is_none());
        // Expired entries are purged on read
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_set_resets_expiry() {
        let cache = UserCache::new(Duration::from_millis(80));
        cache.set("a@x.com", user("a@x.com"));

        std::thread::sleep(Duration::from_millis(50));
        cache.set("a@x.com", user("a@x.com"));
        std::thread::sleep(Duration::from_millis(50));

        assert!(cache.get("a@x.com").is_some());
    }

    #[test]
    fn test_set_overwrites() {
        let cache = UserCache::new(Duration::from_secs(60));
        let first = user("a@x.com");
        let second = user("a@x.com");

        cache.set("a@x.com", first);
        cache.set("a@x.com", second.clone());

        assert_eq!(cache.get("a@x.com").unwrap().id, second.id);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let cache = UserCache::new(Duration::from_secs(60));
        cache.set("a@x.com", user("a@x.com"));

        cache.delete("a@x.com");
        assert!(cache.get("a@x.com").is_none());

        cache.delete("a@x.com");
        cache.delete("never-set@x.com");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stats() {
        let cache = UserCache::new(Duration::from_secs(60));
        cache.set("a@x.com", user("a@x.com"));

        cache.get("a@x.com");
        cache.get("a@x.com");
        cache.get("b@x.com");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_disjoint_keys() {
        let cache = Arc::new(UserCache::new(Duration::from_secs(60)));
        let keeper = user("keeper@x.com");
        cache.set("keeper@x.com", keeper.clone());

        let threads: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let email = format!("user-{t}-{i}@x.com");
                        let stored = user(&email);
                        cache.set(&email, stored.clone());
                        assert_eq!(cache.get(&email).map(|u| u.id), Some(stored.id));
                        cache.delete(&email);
                        assert!(cache.get(&email).is_none());
                    }
                })
            })
            .collect();

        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(cache.get("keeper@x.com"), Some(keeper));
        assert_eq!(cache.len(), 1);
    }
}
