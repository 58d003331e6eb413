//! Configuration management
//!
//! Settings are shared with the mobile shell through a settings.json file:
//! ```json
//! {
//!   "app": { "demoMode": false, ... },
//!   "livestream": { "pollAttempts": 15, "pollDelayMs": 3500 },
//!   "upload": { "iconMaxBytes": 8388608 }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Default bound on livestream key polling attempts
pub const DEFAULT_POLL_ATTEMPTS: u32 = 15;
/// Default delay between livestream polling attempts, in milliseconds
pub const DEFAULT_POLL_DELAY_MS: u64 = 3500;
/// Default icon upload size cap: 8 MB
pub const DEFAULT_ICON_MAX_BYTES: u64 = 8 * 1024 * 1024;

/// Raw settings.json structure (matching the app shell's format)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    livestream: LivestreamSettings,
    #[serde(default)]
    upload: UploadSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LivestreamSettings {
    #[serde(default)]
    poll_attempts: Option<u32>,
    #[serde(default)]
    poll_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadSettings {
    #[serde(default)]
    icon_max_bytes: Option<u64>,
}

/// StudioPass configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub demo_mode: bool,
    pub livestream_poll_attempts: u32,
    pub livestream_poll_delay_ms: u64,
    pub icon_max_bytes: u64,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            demo_mode: false,
            livestream_poll_attempts: DEFAULT_POLL_ATTEMPTS,
            livestream_poll_delay_ms: DEFAULT_POLL_DELAY_MS,
            icon_max_bytes: DEFAULT_ICON_MAX_BYTES,
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the app directory
    ///
    /// Demo mode can be enabled via:
    /// 1. Settings file
    /// 2. Environment variable STUDIOPASS_DEMO_MODE (for CI/testing)
    pub fn load(app_dir: &Path) -> Result<Self> {
        let settings_path = app_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        // Check env var for demo mode override (for CI/testing)
        let demo_mode = match std::env::var("STUDIOPASS_DEMO_MODE").ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.app.demo_mode,
        };

        Ok(Self {
            demo_mode,
            livestream_poll_attempts: raw
                .livestream
                .poll_attempts
                .unwrap_or(DEFAULT_POLL_ATTEMPTS),
            livestream_poll_delay_ms: raw
                .livestream
                .poll_delay_ms
                .unwrap_or(DEFAULT_POLL_DELAY_MS),
            icon_max_bytes: raw.upload.icon_max_bytes.unwrap_or(DEFAULT_ICON_MAX_BYTES),
            _raw_settings: raw,
        })
    }

    /// Save config to the app directory
    /// Preserves settings that the core doesn't manage
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        let settings_path = app_dir.join("settings.json");

        // Load existing settings to preserve fields we don't manage
        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        // Update only the fields we manage
        settings.app.demo_mode = self.demo_mode;
        settings.livestream.poll_attempts = Some(self.livestream_poll_attempts);
        settings.livestream.poll_delay_ms = Some(self.livestream_poll_delay_ms);
        settings.upload.icon_max_bytes = Some(self.icon_max_bytes);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(!config.demo_mode);
        assert_eq!(config.livestream_poll_attempts, DEFAULT_POLL_ATTEMPTS);
        assert_eq!(config.livestream_poll_delay_ms, DEFAULT_POLL_DELAY_MS);
        assert_eq!(config.icon_max_bytes, DEFAULT_ICON_MAX_BYTES);
    }

    #[test]
    fn test_load_overrides_from_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{ "app": { "demoMode": true }, "livestream": { "pollAttempts": 3, "pollDelayMs": 10 } }"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.demo_mode);
        assert_eq!(config.livestream_poll_attempts, 3);
        assert_eq!(config.livestream_poll_delay_ms, 10);
    }

    #[test]
    fn test_save_preserves_unmanaged_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{ "app": { "demoMode": false, "theme": "dark" } }"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.demo_mode = true;
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["app"]["demoMode"], serde_json::json!(true));
        assert_eq!(value["app"]["theme"], serde_json::json!("dark"));
    }
}
