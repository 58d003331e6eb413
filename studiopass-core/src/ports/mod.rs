//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external collaborators. The core domain
//! depends only on these traits, not on concrete implementations.

mod auth;
mod catalog;
mod image_picker;
mod object_storage;
mod record_store;
mod service_gateway;

pub use auth::{AuthProvider, AuthUser};
pub use catalog::{ClassCatalog, GymCatalog};
pub use image_picker::{ImagePicker, PickedImage};
pub use object_storage::ObjectStorage;
pub use record_store::{RecordKey, RemoteRecordStore};
pub use service_gateway::{calls, ServiceGateway};
