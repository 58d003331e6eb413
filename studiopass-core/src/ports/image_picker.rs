//! Image picker port - native photo selection

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::result::Result;

/// Outcome of presenting the native image picker
#[derive(Debug, Clone)]
pub enum PickedImage {
    /// The user dismissed the picker without choosing
    Cancelled,
    /// The picker itself failed
    Failed(String),
    /// An image was chosen
    Selected {
        file_path: PathBuf,
        file_size: u64,
    },
}

/// Native image picker abstraction
#[async_trait]
pub trait ImagePicker: Send + Sync {
    /// Present the picker and wait for the user's choice
    async fn pick_image(&self) -> Result<PickedImage>;
}
