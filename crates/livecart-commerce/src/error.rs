//! Commerce error types.
//!
//! The variants follow the engine's failure taxonomy: an HTTP layer maps
//! [`ErrorKind`] to a status class without matching on strings, and the
//! post-payment-commit case stays distinguishable from everything else
//! because money has already moved when it fires.

use crate::discount::DiscountRejection;
use crate::ids::{CheckoutId, CustomerId, IntentId, LineItemId, VariantId};
use crate::money::Money;
use crate::providers::{IntentStatus, ProviderError};
use crate::storage::StorageError;
use thiserror::Error;

/// Coarse classification of a [`CommerceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input; user-correctable.
    Validation,
    /// A referenced entity does not exist.
    NotFound,
    /// The request was well-formed but lost to current state (stale
    /// discount, depleted stock, insufficient balance, phase race).
    Conflict,
    /// The provider does not consider the payment confirmed.
    PaymentVerification,
    /// Payment confirmed but order bookkeeping failed; needs reconciliation.
    PostPaymentCommit,
    /// A collaborator failed or timed out.
    External,
}

/// Errors that can occur in cart, credit and checkout operations.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Malformed or out-of-range input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Cart line item not found.
    #[error("cart item not found: {0}")]
    CartItemNotFound(LineItemId),

    /// Variant not found in the catalog.
    #[error("variant not found: {0}")]
    VariantNotFound(VariantId),

    /// Customer not found.
    #[error("customer not found: {0}")]
    CustomerNotFound(CustomerId),

    /// Checkout session not found.
    #[error("checkout not found: {0}")]
    CheckoutNotFound(CheckoutId),

    /// Checkout attempted on an empty cart.
    #[error("cart is empty")]
    EmptyCart,

    /// A discount code failed validation.
    #[error("discount rejected: {0}")]
    DiscountRejected(DiscountRejection),

    /// A credit spend exceeded the available balance.
    #[error("insufficient credit balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Money, available: Money },

    /// The checkout session passed its expiry window.
    #[error("checkout expired: {0}")]
    CheckoutExpired(CheckoutId),

    /// The provider reports the intent as anything other than succeeded.
    #[error("payment not verified: intent {intent} is {status}")]
    PaymentNotVerified {
        intent: IntentId,
        status: IntentStatus,
    },

    /// Verification timed out; the payment may still land. Retry later
    /// instead of treating the order as failed.
    #[error("payment verification pending for intent {0}, retry later")]
    PaymentVerificationPending(IntentId),

    /// Payment is confirmed but the committing transaction failed. The
    /// order must be reconciled (idempotent retry keyed by the payment
    /// reference), never silently dropped.
    #[error("payment {payment_ref} confirmed but order commit failed: {source}")]
    PostPaymentCommit {
        payment_ref: String,
        #[source]
        source: StorageError,
    },

    /// Money arithmetic left the representable range.
    #[error("money arithmetic out of range")]
    Overflow,

    /// Storage layer failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Payment or inventory provider failure.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl CommerceError {
    /// Classify this error for transport mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommerceError::Validation(_) | CommerceError::EmptyCart | CommerceError::Overflow => {
                ErrorKind::Validation
            }
            CommerceError::CartItemNotFound(_)
            | CommerceError::VariantNotFound(_)
            | CommerceError::CustomerNotFound(_)
            | CommerceError::CheckoutNotFound(_) => ErrorKind::NotFound,
            CommerceError::DiscountRejected(rejection) => {
                if matches!(rejection, DiscountRejection::NotFound) {
                    ErrorKind::NotFound
                } else {
                    ErrorKind::Conflict
                }
            }
            CommerceError::InsufficientBalance { .. } | CommerceError::CheckoutExpired(_) => {
                ErrorKind::Conflict
            }
            CommerceError::PaymentNotVerified { .. } => ErrorKind::PaymentVerification,
            CommerceError::PaymentVerificationPending(_) => ErrorKind::External,
            CommerceError::PostPaymentCommit { .. } => ErrorKind::PostPaymentCommit,
            CommerceError::Storage(err) => match err {
                StorageError::NotFound(_) => ErrorKind::NotFound,
                StorageError::BalanceFloor { .. }
                | StorageError::PhaseConflict { .. }
                | StorageError::Conflict(_) => ErrorKind::Conflict,
                StorageError::Unavailable(_) => ErrorKind::External,
            },
            CommerceError::Provider(_) => ErrorKind::External,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            CommerceError::Validation("bad".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CommerceError::VariantNotFound(VariantId::new("var_1")).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CommerceError::DiscountRejected(DiscountRejection::Expired).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            CommerceError::DiscountRejected(DiscountRejection::NotFound).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CommerceError::PostPaymentCommit {
                payment_ref: "pi_1".into(),
                source: StorageError::Unavailable("down".into()),
            }
            .kind(),
            ErrorKind::PostPaymentCommit
        );
    }
}
