//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Callers are expected to branch on [`Error::code`] when deciding how to
/// present a failure: domain precondition errors ("already bought") get a
/// benign informational banner, transport errors get a generic failure
/// message, and `Busy` is a transient notice that resolves on its own.
#[derive(Error, Debug)]
pub enum Error {
    /// The class time slot has already been purchased by this account
    #[error("Class time {time_id} has already been purchased")]
    AlreadyPurchased { time_id: String },

    /// The class time slot is already on this account's schedule
    #[error("Class time {time_id} has already been scheduled")]
    AlreadyScheduled { time_id: String },

    /// The membership is already active on this account
    #[error("Membership {membership_id} is already owned")]
    AlreadyOwned { membership_id: String },

    /// Another guarded operation is still in flight on this entity
    #[error("Operation '{in_flight}' is already in progress")]
    Busy { in_flight: &'static str },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Writing the record back to the remote store failed
    #[error("Remote write failed: {0}")]
    RemoteWrite(String),

    /// A remote read or service call failed at the transport level
    #[error("Transport error: {0}")]
    Transport(String),

    /// A named gateway procedure rejected the call
    #[error("Service call '{name}' failed: {message}")]
    ServiceCall { name: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a remote write error
    pub fn remote_write(msg: impl Into<String>) -> Self {
        Self::RemoteWrite(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Stable machine-readable discriminant for this error
    ///
    /// UI layers key banner selection off this rather than the display
    /// string, which may change.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyPurchased { .. } => "already_purchased",
            Self::AlreadyScheduled { .. } => "already_scheduled",
            Self::AlreadyOwned { .. } => "already_owned",
            Self::Busy { .. } => "busy",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::RemoteWrite(_) => "remote_write",
            Self::Transport(_) => "transport",
            Self::ServiceCall { .. } => "service_call",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Other(_) => "other",
        }
    }

    /// Whether this is an expected domain precondition failure
    ///
    /// These are presented as informational notices, never retried.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::AlreadyPurchased { .. } | Self::AlreadyScheduled { .. } | Self::AlreadyOwned { .. }
        )
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        let err = Error::AlreadyScheduled {
            time_id: "t1".to_string(),
        };
        assert_eq!(err.code(), "already_scheduled");
        assert!(err.is_precondition());

        let err = Error::Busy {
            in_flight: "purchase_class",
        };
        assert_eq!(err.code(), "busy");
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_transport_is_not_precondition() {
        let err = Error::transport("connection reset");
        assert_eq!(err.code(), "transport");
        assert!(!err.is_precondition());
    }
}
