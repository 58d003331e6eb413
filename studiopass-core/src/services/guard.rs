//! Single-flight mutation guard
//!
//! Payment-bearing operations must never overlap on the same entity
//! instance (a slow double-tap must not double-charge). The guard tracks
//! at most one named operation in flight; a second acquisition fails
//! immediately with `Error::Busy` naming the running operation instead of
//! queueing. Release happens in `Drop`, so every exit path - success,
//! domain failure, transport failure - clears the flag and no prior
//! failure can cause a permanent lockout.

use std::sync::Mutex;

use crate::domain::result::{Error, Result};

/// Per-instance scoped lock parameterized by operation name
#[derive(Debug, Default)]
pub struct SingleFlight {
    in_flight: Mutex<Option<&'static str>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to start a named operation
    ///
    /// Fails with `Error::Busy` if another operation holds the guard.
    /// The returned permit releases the guard when dropped.
    pub fn acquire(&self, operation: &'static str) -> Result<FlightPermit<'_>> {
        let mut slot = self.in_flight.lock().expect("guard mutex poisoned");
        if let Some(current) = *slot {
            return Err(Error::Busy { in_flight: current });
        }
        *slot = Some(operation);
        Ok(FlightPermit { slot: &self.in_flight })
    }

    /// The operation currently holding the guard, if any
    pub fn in_flight(&self) -> Option<&'static str> {
        *self.in_flight.lock().expect("guard mutex poisoned")
    }
}

/// RAII permit for one guarded operation
#[must_use = "dropping the permit releases the guard immediately"]
pub struct FlightPermit<'a> {
    slot: &'a Mutex<Option<&'static str>>,
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        *self.slot.lock().expect("guard mutex poisoned") = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_busy() {
        let guard = SingleFlight::new();
        let _permit = guard.acquire("purchase_class").unwrap();

        match guard.acquire("schedule_class") {
            Err(Error::Busy { in_flight }) => assert_eq!(in_flight, "purchase_class"),
            other => panic!("expected Busy, got {:?}", other.map(|_| ())),
        };
    }

    #[test]
    fn test_release_on_drop() {
        let guard = SingleFlight::new();
        {
            let _permit = guard.acquire("purchase_membership").unwrap();
            assert_eq!(guard.in_flight(), Some("purchase_membership"));
        }
        assert_eq!(guard.in_flight(), None);
        assert!(guard.acquire("purchase_membership").is_ok());
    }

    #[test]
    fn test_release_on_error_path() {
        let guard = SingleFlight::new();
        let failing = || -> Result<()> {
            let _permit = guard.acquire("delete_subscription")?;
            Err(Error::transport("connection reset"))
        };
        assert!(failing().is_err());
        // The failed attempt must not leave the guard held
        assert_eq!(guard.in_flight(), None);
    }
}
