//! Record mirror - binds one remote record to a local mutable copy
//!
//! The remote store is the source of truth; the mirror is the working copy
//! an entity mutates between pulls and pushes, and the cache is a
//! disposable projection refreshed on every pull and push. The mirror is
//! only mutated synchronously (never across an await), so cooperating
//! tasks on the same entity never observe a torn attribute bag.

use std::sync::{Arc, Mutex};

use serde_json::Value as JsonValue;

use crate::cache::KeyValueCache;
use crate::domain::result::{Error, Result};
use crate::domain::Attributes;
use crate::ports::{RecordKey, RemoteRecordStore};

struct Bound {
    key: RecordKey,
    attrs: Attributes,
}

/// Local mutable mirror of one remote record
pub struct RecordMirror {
    store: Arc<dyn RemoteRecordStore>,
    cache: Arc<KeyValueCache>,
    state: Mutex<Option<Bound>>,
}

impl RecordMirror {
    pub fn new(store: Arc<dyn RemoteRecordStore>, cache: Arc<KeyValueCache>) -> Self {
        Self {
            store,
            cache,
            state: Mutex::new(None),
        }
    }

    /// Whether the mirror is bound to a record yet
    pub fn is_bound(&self) -> bool {
        self.state.lock().expect("mirror mutex poisoned").is_some()
    }

    /// The bound record key, if any
    pub fn key(&self) -> Option<RecordKey> {
        self.state
            .lock()
            .expect("mirror mutex poisoned")
            .as_ref()
            .map(|b| b.key.clone())
    }

    /// Hydrate the mirror from cache or the remote store
    ///
    /// Idempotent once bound to `key`; binding an already-bound mirror to a
    /// different key is a programming error (record identity is immutable
    /// for the lifetime of the entity) and fails validation.
    pub async fn init_by_key(&self, key: RecordKey) -> Result<()> {
        if let Some(bound_key) = self.key() {
            if bound_key == key {
                return Ok(());
            }
            return Err(Error::validation(format!(
                "mirror already bound to {}/{}",
                bound_key.collection, bound_key.id
            )));
        }

        // Cache first; the cached entry is the full attribute bag
        if let Some(JsonValue::Object(attrs)) = self.cache.get(&key.cache_key()) {
            self.bind(key, attrs);
            return Ok(());
        }

        let attrs = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| Error::not_found(format!("{}/{}", key.collection, key.id)))?;

        self.cache.set(key.cache_key(), JsonValue::Object(attrs.clone()));
        self.bind(key, attrs);
        Ok(())
    }

    fn bind(&self, key: RecordKey, attrs: Attributes) {
        let mut state = self.state.lock().expect("mirror mutex poisoned");
        *state = Some(Bound { key, attrs });
    }

    /// Bind to a key with an empty attribute bag, without fetching
    ///
    /// Used when creating a brand-new record that does not exist remotely
    /// yet; the caller merges the initial fields and pushes.
    pub fn bind_fresh(&self, key: RecordKey) -> Result<()> {
        let mut state = self.state.lock().expect("mirror mutex poisoned");
        if state.is_some() {
            return Err(Error::validation("mirror already bound"));
        }
        *state = Some(Bound {
            key,
            attrs: Attributes::new(),
        });
        Ok(())
    }

    /// Shallow-merge a partial bag into the local mirror only
    ///
    /// Does not write through to the remote store or the cache.
    pub fn merge_items(&self, partial: Attributes) -> Result<()> {
        let mut state = self.state.lock().expect("mirror mutex poisoned");
        let bound = state.as_mut().ok_or_else(not_hydrated)?;
        for (k, v) in partial {
            bound.attrs.insert(k, v);
        }
        Ok(())
    }

    /// Snapshot copy of the current local mirror
    pub fn get_all(&self) -> Result<Attributes> {
        let state = self.state.lock().expect("mirror mutex poisoned");
        let bound = state.as_ref().ok_or_else(not_hydrated)?;
        Ok(bound.attrs.clone())
    }

    /// Write the full mirror to the remote store and refresh the cache
    ///
    /// Upsert semantics, last-write-wins. A transport failure surfaces as
    /// `Error::RemoteWrite`; retrying is the caller's decision.
    pub async fn push(&self) -> Result<()> {
        let (key, attrs) = {
            let state = self.state.lock().expect("mirror mutex poisoned");
            let bound = state.as_ref().ok_or_else(not_hydrated)?;
            (bound.key.clone(), bound.attrs.clone())
        };

        self.store.set(&key, &attrs).await.map_err(|e| match e {
            Error::RemoteWrite(m) => Error::RemoteWrite(m),
            other => Error::remote_write(other.to_string()),
        })?;

        self.cache.set(key.cache_key(), JsonValue::Object(attrs));
        Ok(())
    }

    /// Unconditionally re-fetch the record, overwriting mirror and cache
    ///
    /// Discards any unpushed local merges. Run immediately before any
    /// payment-bearing mutation so the precondition check sees state no
    /// staler than one remote read.
    pub async fn force_pull(&self) -> Result<()> {
        let key = self.key().ok_or_else(not_hydrated)?;

        let attrs = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| Error::not_found(format!("{}/{}", key.collection, key.id)))?;

        self.cache.set(key.cache_key(), JsonValue::Object(attrs.clone()));
        let mut state = self.state.lock().expect("mirror mutex poisoned");
        if let Some(bound) = state.as_mut() {
            bound.attrs = attrs;
        }
        Ok(())
    }
}

fn not_hydrated() -> Error {
    Error::validation("record not hydrated; call init_by_key first")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryRecordStore;
    use serde_json::json;

    fn attrs(value: JsonValue) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    fn setup() -> (Arc<InMemoryRecordStore>, Arc<KeyValueCache>, RecordMirror) {
        let store = Arc::new(InMemoryRecordStore::new());
        let cache = Arc::new(KeyValueCache::new());
        let mirror = RecordMirror::new(store.clone(), cache.clone());
        (store, cache, mirror)
    }

    #[tokio::test]
    async fn test_init_missing_record_is_not_found() {
        let (_, _, mirror) = setup();
        let err = mirror
            .init_by_key(RecordKey::new("users", "ghost"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn test_init_populates_cache() {
        let (store, cache, mirror) = setup();
        store.insert(RecordKey::new("users", "u1"), attrs(json!({"first": "A"})));

        mirror.init_by_key(RecordKey::new("users", "u1")).await.unwrap();
        assert!(cache.get("users/u1").is_some());
        assert_eq!(mirror.get_all().unwrap()["first"], json!("A"));
    }

    #[tokio::test]
    async fn test_init_prefers_cache_over_store() {
        let (store, cache, mirror) = setup();
        store.insert(RecordKey::new("users", "u1"), attrs(json!({"first": "remote"})));
        cache.set("users/u1", json!({"first": "cached"}));

        mirror.init_by_key(RecordKey::new("users", "u1")).await.unwrap();
        assert_eq!(mirror.get_all().unwrap()["first"], json!("cached"));
    }

    #[tokio::test]
    async fn test_rebind_to_other_key_rejected() {
        let (store, _, mirror) = setup();
        store.insert(RecordKey::new("users", "u1"), Attributes::new());
        mirror.init_by_key(RecordKey::new("users", "u1")).await.unwrap();

        // Same key is idempotent
        assert!(mirror.init_by_key(RecordKey::new("users", "u1")).await.is_ok());
        // A different identity is rejected
        assert!(mirror.init_by_key(RecordKey::new("users", "u2")).await.is_err());
    }

    #[tokio::test]
    async fn test_merge_push_pull_round_trip() {
        let (store, _, mirror) = setup();
        store.insert(
            RecordKey::new("users", "u1"),
            attrs(json!({"first": "A", "email": "a@b.c"})),
        );
        mirror.init_by_key(RecordKey::new("users", "u1")).await.unwrap();

        mirror.merge_items(attrs(json!({"first": "B"}))).unwrap();
        mirror.push().await.unwrap();
        mirror.force_pull().await.unwrap();

        let all = mirror.get_all().unwrap();
        // Merged field updated, untouched field preserved
        assert_eq!(all["first"], json!("B"));
        assert_eq!(all["email"], json!("a@b.c"));
    }

    #[tokio::test]
    async fn test_force_pull_discards_unpushed_merges() {
        let (store, _, mirror) = setup();
        store.insert(RecordKey::new("users", "u1"), attrs(json!({"first": "A"})));
        mirror.init_by_key(RecordKey::new("users", "u1")).await.unwrap();

        mirror.merge_items(attrs(json!({"first": "local-only"}))).unwrap();
        mirror.force_pull().await.unwrap();
        assert_eq!(mirror.get_all().unwrap()["first"], json!("A"));
    }

    #[tokio::test]
    async fn test_push_failure_is_remote_write() {
        let (store, _, mirror) = setup();
        store.insert(RecordKey::new("users", "u1"), Attributes::new());
        mirror.init_by_key(RecordKey::new("users", "u1")).await.unwrap();

        store.fail_writes(true);
        let err = mirror.push().await.unwrap_err();
        assert_eq!(err.code(), "remote_write");
    }
}
