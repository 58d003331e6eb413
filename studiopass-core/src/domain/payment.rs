//! Payment-bearing request forms and payment subresources
//!
//! These are the payloads carried into the guarded mutating operations and
//! the shapes read back from the `stripe_customers` subcollections. Payment
//! method and transaction documents are provider-shaped, so they stay as
//! raw attribute bags rather than being typed field by field.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::account::Attributes;

/// A stored payment method document, as returned by the payment provider
pub type PaymentMethod = Attributes;

/// A past transaction document, as returned by the payment provider
pub type PastTransaction = Attributes;

/// Card form submitted to the `addPaymentMethod` gateway procedure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPaymentMethod {
    pub card_number: String,
    pub exp_month: u8,
    pub exp_year: u16,
    pub cvc: String,
    pub card_holder_name: String,
    pub zip: String,
}

/// Details for a single-class purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseClassDetails {
    pub class_id: String,
    pub time_id: String,
    pub credit_card_id: String,
    pub price: Decimal,
    pub description: String,
    pub partner_id: String,
    pub gym_id: String,
    #[serde(default)]
    pub purchase_type: Option<String>,
}

/// Details for putting a class time on the schedule (no charge)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleClassDetails {
    pub class_id: String,
    pub time_id: String,
}

/// Details for a recurring membership purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseMembershipDetails {
    pub membership_id: String,
    pub credit_card_id: String,
    pub price: Decimal,
    pub description: String,
    pub partner_id: String,
    pub gym_id: String,
}
