//! Collaborator contracts: inventory and payments.
//!
//! The engine talks to inventory and the payment provider through these
//! traits. Implementations own the transport; the contracts here only pin
//! down the semantics the checkout pipeline depends on: conditional
//! reservation that can lose a race without erroring, and an intent-confirm
//! payment flow whose status is always re-checked server-side.

use crate::ids::{CustomerId, IntentId, VariantId};
use crate::money::Money;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A collaborator call failed.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport-level failure; retryable for read-only calls.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider understood and refused the request.
    #[error("provider rejected request: {0}")]
    Rejected(String),
}

/// Result of a conditional single-unit reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveOutcome {
    /// Whether a unit was actually taken.
    pub reserved: bool,
    /// Availability after the attempt.
    pub available_after: i64,
}

/// Per-variant inventory, mutated only through conditional operations.
///
/// `reserve_one` must be atomic at the data layer: under any level of
/// concurrency the count never goes below zero, and a caller that loses the
/// race observes `reserved: false` rather than an error.
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// Take one unit if any are available.
    async fn reserve_one(&self, variant: &VariantId) -> Result<ReserveOutcome, ProviderError>;

    /// Return one unit; yields the new availability.
    async fn release_one(&self, variant: &VariantId) -> Result<i64, ProviderError>;

    /// Current availability.
    async fn available(&self, variant: &VariantId) -> Result<i64, ProviderError>;
}

/// Status of a payment intent as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentStatus {
    /// Created, customer has not paid.
    RequiresPayment,
    /// Payment submitted, not yet settled.
    Processing,
    /// Funds captured.
    Succeeded,
    /// Intent voided or expired provider-side.
    Canceled,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::RequiresPayment => "requires_payment",
            IntentStatus::Processing => "processing",
            IntentStatus::Succeeded => "succeeded",
            IntentStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reconciliation metadata embedded in a payment intent.
///
/// Enough to match a stray provider event back to the checkout that created
/// it; never the pricing inputs themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentMetadata {
    pub customer_id: CustomerId,
    /// Provider-side customer reference from `ensure_customer`.
    pub provider_customer: String,
    /// Number of cart lines covered by the intent.
    pub item_count: usize,
    /// Discount code in effect, if any.
    pub discount_code: Option<String>,
    /// Store credit applied before the residual was computed, in cents.
    pub credits_applied_cents: i64,
}

/// A created payment intent.
///
/// The `client_secret` is the only field that ever leaves the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: IntentId,
    pub client_secret: String,
}

/// Intent-confirm payment provider (Stripe-shaped).
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Find or create the provider-side customer record.
    async fn ensure_customer(
        &self,
        customer: &CustomerId,
        name: &str,
        email: &str,
    ) -> Result<String, ProviderError>;

    /// Create an intent for exactly `amount`.
    async fn create_intent(
        &self,
        amount: Money,
        metadata: IntentMetadata,
    ) -> Result<PaymentIntent, ProviderError>;

    /// Re-check an intent's status server-side.
    async fn verify_intent(&self, intent: &IntentId) -> Result<IntentStatus, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_status_strings() {
        assert_eq!(IntentStatus::Succeeded.as_str(), "succeeded");
        assert_eq!(format!("{}", IntentStatus::RequiresPayment), "requires_payment");
    }
}
