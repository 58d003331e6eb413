//! Authentication provider port

use async_trait::async_trait;

use crate::domain::result::Result;

/// The signed-in identity as reported by the auth provider
///
/// `display_name` encodes `"<account_type>_<first>_<last>"` - it is how the
/// client knows which collection an account's record lives in before the
/// record itself has been fetched.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub display_name: String,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

/// Authentication provider abstraction
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The currently signed-in user, if any
    fn current_user(&self) -> Option<AuthUser>;

    /// Create a new email/password credential, returning the new identity
    async fn create_user(&self, email: &str, password: &str) -> Result<AuthUser>;

    /// Update the current user's profile display name
    async fn update_display_name(&self, display_name: &str) -> Result<()>;

    /// Sign the current user out
    async fn sign_out(&self) -> Result<()>;
}
