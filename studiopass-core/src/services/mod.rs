//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions: the record
//! mirror over the store+cache pair, the account entity with its guarded
//! operations, and the cross-cutting guard/poll/logging helpers.

pub mod account;
pub mod guard;
pub mod logging;
pub mod poll;
pub mod record;

pub use account::{ops, AccountDeps, AccountEntity, OperationLimits, SignUpForm, SocialSignUp};
pub use guard::{FlightPermit, SingleFlight};
pub use logging::{EventLogger, LogEntry, LogEvent};
pub use poll::{poll_bounded, PollOutcome, Probe};
pub use record::RecordMirror;
