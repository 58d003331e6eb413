//! Service gateway port - named serverless callable procedures
//!
//! The backend exposes payment and bookkeeping actions as callable
//! functions invoked by string name with a JSON payload. The core only
//! depends on this call surface; it never assumes how calls travel.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::domain::result::Result;

/// Names of the callable procedures the core invokes
///
/// Kept as constants so call sites and test assertions share one spelling.
pub mod calls {
    pub const ADD_PAYMENT_METHOD: &str = "addPaymentMethod";
    pub const CHARGE_CUSTOMER: &str = "chargeCustomer";
    pub const DOCUMENT_CLASS_PURCHASE: &str = "documentClassPurchase";
    pub const DOCUMENT_SCHEDULED_CLASS: &str = "documentScheduledClass";
    pub const SUBSCRIBE_CUSTOMER: &str = "subscribeCustomer";
    pub const DOCUMENT_MEMBERSHIP_PURCHASE: &str = "documentMembershipPurchase";
    pub const DELETE_SUBSCRIPTION: &str = "deleteSubscription";
    pub const CREATE_LIVESTREAM: &str = "createLivestream";
    pub const CREATE_STRIPE_SELLER: &str = "createStripeSeller";
}

/// Serverless callable-function gateway
///
/// Calls are at-least-once from the backend's point of view; failures are
/// either transport errors (`Error::Transport`) or procedure rejections
/// (`Error::ServiceCall`), both distinct from domain validation errors.
#[async_trait]
pub trait ServiceGateway: Send + Sync {
    /// Invoke a named procedure with a JSON payload, returning its JSON result
    async fn call(&self, name: &str, payload: JsonValue) -> Result<JsonValue>;
}
