//! StudioPass Core - business logic for the fitness membership client
//!
//! This crate implements the core domain logic following hexagonal
//! architecture:
//!
//! - **domain**: Core business entities (accounts, class refs, payments)
//! - **ports**: Trait definitions for external collaborators (record
//!   store, service gateway, auth, object storage, catalogs)
//! - **services**: Business logic orchestration (record mirror, account
//!   entity, single-flight guard)
//! - **adapters**: Concrete implementations (HTTPS callable gateway,
//!   in-memory demo/test adapters)

pub mod adapters;
pub mod cache;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::gateway_mock::ScriptedGateway;
use adapters::memory::{
    InMemoryAuthProvider, InMemoryCatalog, InMemoryObjectStorage, InMemoryRecordStore,
    ScriptedImagePicker,
};
use cache::KeyValueCache;
use config::Config;
use services::logging::EventLogger;
use services::{AccountDeps, AccountEntity, OperationLimits, SignUpForm, SocialSignUp};

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result as CoreResult};
pub use domain::{
    AccountKind, AccountOverview, ClassRef, LivestreamKey, NewPaymentMethod,
    PurchaseClassDetails, PurchaseMembershipDetails, ScheduleClassDetails,
};

/// Externally provided collaborators for a real (non-demo) context
///
/// The mobile shell supplies these, each wrapping the platform SDK it
/// fronts.
pub struct ContextPorts {
    pub store: Arc<dyn ports::RemoteRecordStore>,
    pub gateway: Arc<dyn ports::ServiceGateway>,
    pub auth: Arc<dyn ports::AuthProvider>,
    pub storage: Arc<dyn ports::ObjectStorage>,
    pub classes: Arc<dyn ports::ClassCatalog>,
    pub gyms: Arc<dyn ports::GymCatalog>,
    pub picker: Arc<dyn ports::ImagePicker>,
}

/// Main context for StudioPass operations
///
/// This is the primary entry point for all business logic. It holds the
/// configuration, the process-local cache, and the wired collaborators;
/// account entities are constructed from it with their dependencies
/// injected explicitly.
pub struct StudioPassContext {
    pub config: Config,
    pub cache: Arc<KeyValueCache>,
    pub logger: Arc<EventLogger>,
    ports: ContextPorts,
}

impl StudioPassContext {
    /// Create a new context with the given collaborators
    ///
    /// The cache starts empty on every boot so no stale data crosses
    /// process sessions.
    pub fn new(app_dir: &Path, ports: ContextPorts) -> Result<Self> {
        let config = Config::load(app_dir)?;
        let logger = Arc::new(EventLogger::new(app_dir, env!("CARGO_PKG_VERSION"))?);
        logger.log_event("boot")?;

        Ok(Self {
            config,
            cache: Arc::new(KeyValueCache::new()),
            logger,
            ports,
        })
    }

    /// Create a context wired entirely to in-memory adapters
    ///
    /// Used when demo mode is enabled: the whole client runs without a
    /// backend.
    pub fn demo(app_dir: &Path) -> Result<Self> {
        let ports = ContextPorts {
            store: Arc::new(InMemoryRecordStore::new()),
            gateway: Arc::new(ScriptedGateway::new()),
            auth: Arc::new(InMemoryAuthProvider::new()),
            storage: Arc::new(InMemoryObjectStorage::new()),
            classes: Arc::new(InMemoryCatalog::new()),
            gyms: Arc::new(InMemoryCatalog::new()),
            picker: Arc::new(ScriptedImagePicker::cancelled()),
        };
        Self::new(app_dir, ports)
    }

    /// Build the account entity for the signed-in session
    pub fn current_account(&self) -> CoreResult<AccountEntity> {
        AccountEntity::for_current_session(self.account_deps())
    }

    /// Create a brand-new account with email and password
    pub async fn sign_up(&self, form: SignUpForm) -> CoreResult<AccountEntity> {
        AccountEntity::create(form, self.account_deps()).await
    }

    /// Create a brand-new account from a social identity
    pub async fn sign_up_social(&self, social: SocialSignUp) -> CoreResult<AccountEntity> {
        AccountEntity::create_social(social, self.account_deps()).await
    }

    /// Sign out and wipe the cache namespace
    pub async fn sign_out(&self) -> CoreResult<()> {
        self.ports.auth.sign_out().await?;
        self.cache.reset_all();
        let _ = self.logger.log_event("sign_out");
        Ok(())
    }

    fn account_deps(&self) -> AccountDeps {
        AccountDeps {
            store: self.ports.store.clone(),
            cache: self.cache.clone(),
            gateway: self.ports.gateway.clone(),
            auth: self.ports.auth.clone(),
            storage: self.ports.storage.clone(),
            classes: self.ports.classes.clone(),
            gyms: self.ports.gyms.clone(),
            picker: self.ports.picker.clone(),
            limits: OperationLimits {
                poll_attempts: self.config.livestream_poll_attempts,
                poll_delay: std::time::Duration::from_millis(self.config.livestream_poll_delay_ms),
                icon_max_bytes: self.config.icon_max_bytes,
            },
            logger: Some(self.logger.clone()),
        }
    }
}
