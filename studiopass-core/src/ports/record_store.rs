//! Remote record store port - document database abstraction

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::Attributes;

/// Identifies one record: a collection name plus a document id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub collection: String,
    pub id: String,
}

impl RecordKey {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Cache namespace for the record itself
    pub fn cache_key(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }

    /// Cache namespace for one of the record's subresources
    pub fn subresource_cache_key(&self, sub: &str) -> String {
        format!("{}/{}/{}", self.collection, self.id, sub)
    }
}

/// Document database abstraction
///
/// The remote store is the source of truth for every record. Implementations
/// (adapters) provide the actual transport; the core treats this as an opaque
/// boundary and never assumes anything beyond these operations.
#[async_trait]
pub trait RemoteRecordStore: Send + Sync {
    /// Fetch a record's full attribute bag, `None` if no such id
    async fn get(&self, key: &RecordKey) -> Result<Option<Attributes>>;

    /// Write a record's full attribute bag (upsert, last-write-wins)
    async fn set(&self, key: &RecordKey, attrs: &Attributes) -> Result<()>;

    /// Server-side shallow merge of a partial bag into a record
    async fn merge(&self, key: &RecordKey, partial: &Attributes) -> Result<()>;

    /// Fetch the documents of a record's subcollection, in store order
    async fn get_subcollection(&self, key: &RecordKey, sub: &str) -> Result<Vec<Attributes>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_keys() {
        let key = RecordKey::new("users", "u1");
        assert_eq!(key.cache_key(), "users/u1");
        assert_eq!(
            key.subresource_cache_key("payment_methods"),
            "users/u1/payment_methods"
        );
    }
}
