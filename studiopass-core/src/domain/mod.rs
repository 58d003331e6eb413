//! Core domain entities
//!
//! All business data structures are defined here. These are pure data with
//! validation logic - no I/O or external dependencies.

mod account;
mod livestream;
mod payment;
pub mod result;

pub use account::{
    AccountFields, AccountKind, AccountOverview, Attributes, ClassRef, MemberFields,
    PartnerFields, Profile, DEFAULT_ICON_KEY,
};
pub use livestream::LivestreamKey;
pub use payment::{
    NewPaymentMethod, PastTransaction, PaymentMethod, PurchaseClassDetails,
    PurchaseMembershipDetails, ScheduleClassDetails,
};
