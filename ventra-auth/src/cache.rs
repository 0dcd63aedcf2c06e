//! Identity cache.
//!
//! A process-wide, time-bounded cache of authenticated-identity lookups,
//! keyed by credential subject id. Entries expire after a fixed TTL,
//! evaluated at read time; there is no background sweep. In a
//! multi-instance deployment each instance has its own cache and therefore
//! its own staleness window — an accepted trade-off, not a bug.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use ventra_core::identity::Identity;

use crate::options::AuthOptions;

/// Subject id → identity cache with explicit invalidation.
///
/// Any mutation to a user's role, tenant or active status MUST call
/// `invalidate` for that subject id; failing to do so leaves a stale
/// privilege window up to the TTL.
pub trait IdentityCache: Send + Sync {
    fn get(&self, subject_id: &str) -> Option<Identity>;
    fn put(&self, subject_id: &str, identity: Identity);
    fn invalidate(&self, subject_id: &str);
}

struct CacheEntry {
    identity: Identity,
    inserted_at: Instant,
}

/// In-process TTL cache.
pub struct MemoryIdentityCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryIdentityCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Build the cache from the configured `cache_ttl`. Application wiring
    /// goes through here so the option actually governs entry lifetime.
    pub fn from_options(options: &AuthOptions) -> Self {
        Self::new(options.cache_ttl)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl IdentityCache for MemoryIdentityCache {
    fn get(&self, subject_id: &str) -> Option<Identity> {
        {
            let entries = self.entries.read();
            match entries.get(subject_id) {
                Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                    return Some(entry.identity.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Stale entry: lazily evict this key only. Re-check age under the
        // write lock so a fresh concurrent put is not thrown away.
        let mut entries = self.entries.write();
        if entries
            .get(subject_id)
            .is_some_and(|entry| entry.inserted_at.elapsed() >= self.ttl)
        {
            entries.remove(subject_id);
        }
        None
    }

    fn put(&self, subject_id: &str, identity: Identity) {
        // A write for a key always wins over the previous entry.
        self.entries.write().insert(
            subject_id.to_string(),
            CacheEntry {
                identity,
                inserted_at: Instant::now(),
            },
        );
    }

    fn invalidate(&self, subject_id: &str) {
        self.entries.write().remove(subject_id);
    }
}

/// Cache that never stores anything. Substitutable wherever caching is
/// undesirable (e.g. tests that must observe every directory lookup).
#[derive(Default)]
pub struct NoopIdentityCache;

impl IdentityCache for NoopIdentityCache {
    fn get(&self, _subject_id: &str) -> Option<Identity> {
        None
    }

    fn put(&self, _subject_id: &str, _identity: Identity) {}

    fn invalidate(&self, _subject_id: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use ventra_core::identity::Role;
    use ventra_core::tenant::TenantId;

    fn identity(id: &str) -> Identity {
        Identity::new(id, "alice", Role::TenantUser, Some(TenantId::new("t1")))
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = MemoryIdentityCache::new(Duration::from_secs(300));
        cache.put("u1", identity("u1"));
        assert_eq!(cache.get("u1").unwrap().id, "u1");
    }

    #[test]
    fn expired_entries_are_never_served() {
        let cache = MemoryIdentityCache::new(Duration::from_millis(20));
        cache.put("u1", identity("u1"));
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("u1").is_none());
        // Lazy eviction removed the key.
        assert!(cache.is_empty());
    }

    #[test]
    fn configured_ttl_governs_expiry() {
        let options = AuthOptions {
            cache_ttl: Duration::from_millis(20),
            ..AuthOptions::default()
        };
        let cache = MemoryIdentityCache::from_options(&options);
        cache.put("u1", identity("u1"));
        assert!(cache.get("u1").is_some());
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("u1").is_none());
    }

    #[test]
    fn a_later_put_overwrites() {
        let cache = MemoryIdentityCache::new(Duration::from_secs(300));
        cache.put("u1", identity("u1"));
        let mut updated = identity("u1");
        updated.role = Role::TenantAdmin;
        cache.put("u1", updated);
        assert_eq!(cache.get("u1").unwrap().role, Role::TenantAdmin);
    }

    #[test]
    fn invalidate_removes_only_that_key() {
        let cache = MemoryIdentityCache::new(Duration::from_secs(300));
        cache.put("u1", identity("u1"));
        cache.put("u2", identity("u2"));
        cache.invalidate("u1");
        assert!(cache.get("u1").is_none());
        assert!(cache.get("u2").is_some());
    }
}
