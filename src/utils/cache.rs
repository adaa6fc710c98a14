// In-process cache with per-entry expiry, shared across requests
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedEntry<V> {
    value: V,
    stored_at: Instant,
}

pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CachedEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached value if it is younger than `ttl`
    pub fn get_fresh(&self, key: &str, ttl: Duration) -> Option<V> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() < ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn set(&self, key: String, value: V) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key,
                CachedEntry {
                    value,
                    stored_at: Instant::now(),
                },
            );
        }
    }

    pub fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_entry_is_returned() {
        let cache = TtlCache::new();
        cache.set("news".to_string(), 42);
        assert_eq!(cache.get_fresh("news", Duration::from_secs(60)), Some(42));
    }

    #[test]
    fn test_expired_entry_is_ignored() {
        let cache = TtlCache::new();
        cache.set("news".to_string(), 42);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get_fresh("news", Duration::from_millis(1)), None);
    }

    #[test]
    fn test_invalidate() {
        let cache = TtlCache::new();
        cache.set("news".to_string(), "a".to_string());
        cache.invalidate("news");
        assert_eq!(cache.get_fresh("news", Duration::from_secs(60)), None);
    }
}
