//! Object storage port - icon uploads and public URL resolution

use std::path::Path;

use async_trait::async_trait;

use crate::domain::result::Result;

/// File/object storage abstraction
///
/// Keys map to publicly resolvable URLs; by convention the account uid is
/// used as the key for a custom icon, and [`crate::domain::DEFAULT_ICON_KEY`]
/// denotes "no custom icon".
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload a local file under the given key, overwriting any prior object
    async fn put_file(&self, key: &str, local_path: &Path) -> Result<()>;

    /// Resolve a key to a public URL, `None` if no object exists for it
    async fn public_url(&self, key: &str) -> Result<Option<String>>;
}
