//! In-memory adapters for demo mode and tests
//!
//! Fully local implementations of the external-collaborator ports. Demo
//! mode wires these into the context so the whole client runs without a
//! backend; tests use the same implementations seeded with fixture data.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Attributes, DEFAULT_ICON_KEY};
use crate::ports::{
    AuthProvider, AuthUser, ClassCatalog, GymCatalog, ImagePicker, ObjectStorage, PickedImage,
    RecordKey, RemoteRecordStore,
};

// =============================================================================
// Record store
// =============================================================================

/// HashMap-backed record store
#[derive(Default)]
pub struct InMemoryRecordStore {
    docs: Mutex<HashMap<RecordKey, Attributes>>,
    subdocs: Mutex<HashMap<(RecordKey, String), Vec<Attributes>>>,
    fail_writes: AtomicBool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing the port
    pub fn insert(&self, key: RecordKey, attrs: Attributes) {
        self.docs.lock().expect("store mutex poisoned").insert(key, attrs);
    }

    /// Seed a subcollection directly
    pub fn insert_subcollection(&self, key: RecordKey, sub: &str, docs: Vec<Attributes>) {
        self.subdocs
            .lock()
            .expect("store mutex poisoned")
            .insert((key, sub.to_string()), docs);
    }

    /// Read a record back for assertions
    pub fn snapshot(&self, key: &RecordKey) -> Option<Attributes> {
        self.docs.lock().expect("store mutex poisoned").get(key).cloned()
    }

    /// Make subsequent writes fail with a remote-write error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteRecordStore for InMemoryRecordStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<Attributes>> {
        Ok(self.docs.lock().expect("store mutex poisoned").get(key).cloned())
    }

    async fn set(&self, key: &RecordKey, attrs: &Attributes) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::remote_write("simulated write failure"));
        }
        self.docs
            .lock()
            .expect("store mutex poisoned")
            .insert(key.clone(), attrs.clone());
        Ok(())
    }

    async fn merge(&self, key: &RecordKey, partial: &Attributes) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::remote_write("simulated write failure"));
        }
        let mut docs = self.docs.lock().expect("store mutex poisoned");
        let doc = docs.entry(key.clone()).or_default();
        for (k, v) in partial {
            doc.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    async fn get_subcollection(&self, key: &RecordKey, sub: &str) -> Result<Vec<Attributes>> {
        Ok(self
            .subdocs
            .lock()
            .expect("store mutex poisoned")
            .get(&(key.clone(), sub.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

// =============================================================================
// Auth
// =============================================================================

/// In-memory auth provider holding at most one signed-in user
#[derive(Default)]
pub struct InMemoryAuthProvider {
    user: Mutex<Option<AuthUser>>,
}

impl InMemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a signed-in user
    pub fn signed_in(user: AuthUser) -> Self {
        Self {
            user: Mutex::new(Some(user)),
        }
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    fn current_user(&self) -> Option<AuthUser> {
        self.user.lock().expect("auth mutex poisoned").clone()
    }

    async fn create_user(&self, email: &str, _password: &str) -> Result<AuthUser> {
        let user = AuthUser {
            uid: Uuid::new_v4().to_string(),
            display_name: String::new(),
            email: Some(email.to_string()),
            photo_url: None,
        };
        *self.user.lock().expect("auth mutex poisoned") = Some(user.clone());
        Ok(user)
    }

    async fn update_display_name(&self, display_name: &str) -> Result<()> {
        let mut user = self.user.lock().expect("auth mutex poisoned");
        match user.as_mut() {
            Some(u) => {
                u.display_name = display_name.to_string();
                Ok(())
            }
            None => Err(Error::validation("no signed-in user")),
        }
    }

    async fn sign_out(&self) -> Result<()> {
        *self.user.lock().expect("auth mutex poisoned") = None;
        Ok(())
    }
}

// =============================================================================
// Object storage
// =============================================================================

/// In-memory object storage mapping keys to fake public URLs
#[derive(Default)]
pub struct InMemoryObjectStorage {
    objects: Mutex<HashMap<String, String>>,
}

impl InMemoryObjectStorage {
    /// New storage pre-seeded with the default icon object
    pub fn new() -> Self {
        let storage = Self::default();
        storage
            .objects
            .lock()
            .expect("storage mutex poisoned")
            .insert(DEFAULT_ICON_KEY.to_string(), "default-icon".to_string());
        storage
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn put_file(&self, key: &str, local_path: &Path) -> Result<()> {
        self.objects
            .lock()
            .expect("storage mutex poisoned")
            .insert(key.to_string(), local_path.display().to_string());
        Ok(())
    }

    async fn public_url(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .objects
            .lock()
            .expect("storage mutex poisoned")
            .get(key)
            .map(|_| format!("memory://{}", key)))
    }
}

// =============================================================================
// Catalogs
// =============================================================================

/// In-memory class and gym catalog over seeded documents
///
/// Documents are matched by their `id` attribute, the way the remote
/// catalog queries filter on the id field.
#[derive(Default)]
pub struct InMemoryCatalog {
    classes: Mutex<Vec<Attributes>>,
    gyms: Mutex<Vec<Attributes>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&self, doc: Attributes) {
        self.classes.lock().expect("catalog mutex poisoned").push(doc);
    }

    pub fn add_gym(&self, doc: Attributes) {
        self.gyms.lock().expect("catalog mutex poisoned").push(doc);
    }
}

fn filter_by_ids(docs: &[Attributes], ids: &[String]) -> Vec<Attributes> {
    docs.iter()
        .filter(|doc| {
            doc.get("id")
                .and_then(JsonValue::as_str)
                .map(|id| ids.iter().any(|want| want == id))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

#[async_trait]
impl ClassCatalog for InMemoryCatalog {
    async fn classes_by_ids(&self, ids: &[String]) -> Result<Vec<Attributes>> {
        Ok(filter_by_ids(
            &self.classes.lock().expect("catalog mutex poisoned"),
            ids,
        ))
    }
}

#[async_trait]
impl GymCatalog for InMemoryCatalog {
    async fn gyms_by_ids(&self, ids: &[String]) -> Result<Vec<Attributes>> {
        Ok(filter_by_ids(
            &self.gyms.lock().expect("catalog mutex poisoned"),
            ids,
        ))
    }
}

// =============================================================================
// Image picker
// =============================================================================

/// Picker that returns a scripted result
pub struct ScriptedImagePicker {
    result: Mutex<PickedImage>,
}

impl ScriptedImagePicker {
    pub fn new(result: PickedImage) -> Self {
        Self {
            result: Mutex::new(result),
        }
    }

    /// Picker that always cancels; the demo default
    pub fn cancelled() -> Self {
        Self::new(PickedImage::Cancelled)
    }
}

#[async_trait]
impl ImagePicker for ScriptedImagePicker {
    async fn pick_image(&self) -> Result<PickedImage> {
        Ok(self.result.lock().expect("picker mutex poisoned").clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_catalog_filters_by_id() {
        let catalog = InMemoryCatalog::new();
        catalog.add_class(json!({"id": "c1", "name": "Yoga"}).as_object().cloned().unwrap());
        catalog.add_class(json!({"id": "c2", "name": "Spin"}).as_object().cloned().unwrap());

        let found = catalog.classes_by_ids(&["c2".to_string()]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["name"], json!("Spin"));
    }

    #[tokio::test]
    async fn test_store_merge_is_shallow() {
        let store = InMemoryRecordStore::new();
        let key = RecordKey::new("users", "u1");
        store.insert(key.clone(), json!({"a": 1, "b": 2}).as_object().cloned().unwrap());

        store
            .merge(&key, json!({"b": 3}).as_object().unwrap())
            .await
            .unwrap();

        let doc = store.snapshot(&key).unwrap();
        assert_eq!(doc["a"], json!(1));
        assert_eq!(doc["b"], json!(3));
    }

    #[tokio::test]
    async fn test_default_icon_resolves() {
        let storage = InMemoryObjectStorage::new();
        assert!(storage.public_url(DEFAULT_ICON_KEY).await.unwrap().is_some());
        assert!(storage.public_url("nope").await.unwrap().is_none());
    }
}
