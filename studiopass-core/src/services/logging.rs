//! Structured event logging
//!
//! Privacy-safe operation logging to a JSON-lines file in the app
//! directory. No personal or payment data (names, emails, card numbers,
//! amounts) is ever logged - only operation names, account kinds, and
//! error codes.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique ID based on timestamp + counter
fn generate_id() -> u64 {
    let timestamp = Utc::now().timestamp_millis() as u64;

    // Timestamp in the high bits, 16-bit counter in the low bits
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    (timestamp << 16) | counter
}

/// Get current unix timestamp in milliseconds
fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Detect the current platform
fn detect_platform() -> &'static str {
    if cfg!(target_os = "ios") {
        "ios"
    } else if cfg!(target_os = "android") {
        "android"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LogEvent {
    /// Create a new log event with just an event name
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            operation: None,
            account_kind: None,
            error_code: None,
            error_message: None,
        }
    }

    /// Set the operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Set the account kind context
    pub fn with_account_kind(mut self, kind: impl Into<String>) -> Self {
        self.account_kind = Some(kind.into());
        self
    }

    /// Set error information
    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self.error_message = Some(message.into());
        self
    }
}

/// A log entry as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub session_id: Uuid,
    pub app_version: String,
    pub platform: String,
    #[serde(flatten)]
    pub event: LogEvent,
}

/// Service for structured event logging
///
/// Appends entries to `events.log.jsonl` in the app directory. Each
/// process gets a fresh session id so entries from different launches
/// can be told apart.
pub struct EventLogger {
    file: Mutex<File>,
    path: PathBuf,
    session_id: Uuid,
    app_version: String,
    platform: &'static str,
}

impl EventLogger {
    /// Create a new event logger, opening the log file in append mode
    pub fn new(app_dir: &Path, app_version: impl Into<String>) -> Result<Self> {
        let path = app_dir.join("events.log.jsonl");
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            file: Mutex::new(file),
            path,
            session_id: Uuid::new_v4(),
            app_version: app_version.into(),
            platform: detect_platform(),
        })
    }

    /// Log an event
    ///
    /// The session id, app version, and platform are added automatically.
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let entry = LogEntry {
            id: generate_id(),
            timestamp: now_ms(),
            session_id: self.session_id,
            app_version: self.app_version.clone(),
            platform: self.platform.to_string(),
            event,
        };

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = self.file.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Log a simple event with just a name
    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    /// Log a completed account operation
    pub fn log_operation(&self, operation: &str, account_kind: &str) -> Result<()> {
        self.log(
            LogEvent::new("operation_completed")
                .with_operation(operation)
                .with_account_kind(account_kind),
        )
    }

    /// Log a failed account operation
    pub fn log_operation_error(
        &self,
        operation: &str,
        account_kind: &str,
        code: &str,
        message: &str,
    ) -> Result<()> {
        self.log(
            LogEvent::new("operation_failed")
                .with_operation(operation)
                .with_account_kind(account_kind)
                .with_error(code, message),
        )
    }

    /// Read back every entry in the log file
    pub fn read_all(&self) -> Result<Vec<LogEntry>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }
}
