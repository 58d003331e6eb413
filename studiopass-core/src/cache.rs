//! Process-local key-value cache
//!
//! A disposable, rebuildable projection of remote data keyed by path
//! strings like `users/u1` or `users/u1/payment_methods`. The remote
//! record store is always authoritative; nothing here survives a process
//! restart, and the whole namespace is wiped on boot and sign-out so no
//! stale data leaks across sessions.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value as JsonValue;

/// Process-local, time-unaware key-value store for JSON values
///
/// Entries live for the process session; there is no expiry policy.
/// An internal mutex makes the handle shareable behind `Arc` across
/// cooperative tasks; it is never held across an await.
#[derive(Debug, Default)]
pub struct KeyValueCache {
    entries: Mutex<HashMap<String, JsonValue>>,
}

impl KeyValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key; a miss is not an error
    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .get(key)
            .cloned()
    }

    /// Store a value under a key, overwriting any prior value
    pub fn set(&self, key: impl Into<String>, value: JsonValue) {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .insert(key.into(), value);
    }

    /// Remove a single key
    pub fn remove(&self, key: &str) {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .remove(key);
    }

    /// Clear every key; called on application boot and sign-out
    pub fn reset_all(&self) {
        self.entries.lock().expect("cache mutex poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_miss_is_none() {
        let cache = KeyValueCache::new();
        assert!(cache.get("users/u1").is_none());
    }

    #[test]
    fn test_set_overwrites() {
        let cache = KeyValueCache::new();
        cache.set("k", json!(1));
        cache.set("k", json!(2));
        assert_eq!(cache.get("k"), Some(json!(2)));
    }

    #[test]
    fn test_reset_all_clears_every_key() {
        let cache = KeyValueCache::new();
        cache.set("users/u1", json!({"first": "A"}));
        cache.set("users/u1/payments", json!([1, 2]));
        cache.reset_all();
        assert!(cache.get("users/u1").is_none());
        assert!(cache.get("users/u1/payments").is_none());
    }
}
