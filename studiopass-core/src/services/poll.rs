//! Bounded polling for eventually-consistent fields
//!
//! Some backend writes land asynchronously (a livestream key appears on the
//! account record some seconds after the creation call). This primitive
//! probes a fixed number of times with a fixed delay and reports the
//! outcome explicitly: `Ready` with the value, or `GaveUp` after the bound.
//! Exhaustion is an expected state for the caller, never an error.

use std::future::Future;
use std::time::Duration;

use crate::domain::result::Result;

/// Result of one probe attempt
#[derive(Debug)]
pub enum Probe<T> {
    Ready(T),
    NotYet,
}

/// Final outcome of a bounded poll
#[derive(Debug)]
pub enum PollOutcome<T> {
    Ready(T),
    GaveUp { attempts: u32 },
}

/// Probe up to `attempts` times, sleeping `delay` between attempts
///
/// The first probe runs immediately; no sleep follows the final probe.
/// A probe error aborts the whole poll - only `NotYet` keeps it going.
pub async fn poll_bounded<T, F, Fut>(
    attempts: u32,
    delay: Duration,
    mut probe: F,
) -> Result<PollOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>>>,
{
    for attempt in 0..attempts {
        match probe().await? {
            Probe::Ready(value) => return Ok(PollOutcome::Ready(value)),
            Probe::NotYet => {
                if attempt + 1 < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
    Ok(PollOutcome::GaveUp { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_first_probe_skips_sleeping() {
        let outcome = poll_bounded(15, Duration::from_millis(3500), || async {
            Ok(Probe::Ready(42))
        })
        .await
        .unwrap();
        assert!(matches!(outcome, PollOutcome::Ready(42)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_becomes_ready_after_some_attempts() {
        let count = AtomicU32::new(0);
        let outcome = poll_bounded(15, Duration::from_millis(3500), || {
            let n = count.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 4 {
                    Ok(Probe::NotYet)
                } else {
                    Ok(Probe::Ready("key"))
                }
            }
        })
        .await
        .unwrap();
        assert!(matches!(outcome, PollOutcome::Ready("key")));
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_bound() {
        let count = AtomicU32::new(0);
        let outcome: PollOutcome<()> = poll_bounded(3, Duration::from_millis(100), || {
            count.fetch_add(1, Ordering::SeqCst);
            async { Ok(Probe::NotYet) }
        })
        .await
        .unwrap();
        assert!(matches!(outcome, PollOutcome::GaveUp { attempts: 3 }));
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_error_aborts() {
        let result: Result<PollOutcome<()>> =
            poll_bounded(5, Duration::from_millis(100), || async {
                Err(crate::domain::result::Error::transport("gone"))
            })
            .await;
        assert!(result.is_err());
    }
}
