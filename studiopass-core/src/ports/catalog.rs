//! Catalog ports - class and gym lookup collaborators
//!
//! Derived account views join membership/class ids against these lookups.
//! Catalog documents are display-shaped and vary by screen, so they stay
//! as raw attribute bags.

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::Attributes;

/// Class catalog lookup
#[async_trait]
pub trait ClassCatalog: Send + Sync {
    /// Fetch the class documents whose id is in `ids`, preserving no
    /// particular order; unknown ids are silently skipped
    async fn classes_by_ids(&self, ids: &[String]) -> Result<Vec<Attributes>>;
}

/// Gym catalog lookup
#[async_trait]
pub trait GymCatalog: Send + Sync {
    /// Fetch the gym documents whose id is in `ids`; unknown ids are skipped
    async fn gyms_by_ids(&self, ids: &[String]) -> Result<Vec<Attributes>>;
}
