//! Livestream provisioning result

use serde::{Deserialize, Serialize};

/// Outcome of livestream provisioning
///
/// Stream keys are assigned by the backend asynchronously after the
/// creation call, so "not there yet" is an expected state, not a failure.
/// Callers treat `Pending` as "try again later".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LivestreamKey {
    /// The stream key is assigned and ready to use
    Ready(String),
    /// Creation was requested but the key has not appeared within the
    /// polling bound
    Pending,
}

impl LivestreamKey {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The key, if assigned
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Ready(k) => Some(k),
            Self::Pending => None,
        }
    }
}
