//! Checkout session and phase machine.

use crate::checkout::order::{CustomerSnapshot, OrderLineItem};
use crate::cart::PricingBreakdown;
use crate::discount::AppliedDiscount;
use crate::ids::{CheckoutId, CustomerId, IntentId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phases of the two-phase checkout protocol.
///
/// Forward-only: `Preparing -> AwaitingPayment -> Completing -> Completed`,
/// with `Failed` reachable from any live phase. `Failed -> Completing` is
/// allowed so a post-payment commit failure can be retried idempotently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckoutPhase {
    Preparing,
    AwaitingPayment,
    Completing,
    Completed,
    Failed,
}

impl CheckoutPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutPhase::Preparing => "preparing",
            CheckoutPhase::AwaitingPayment => "awaiting_payment",
            CheckoutPhase::Completing => "completing",
            CheckoutPhase::Completed => "completed",
            CheckoutPhase::Failed => "failed",
        }
    }

    /// Whether the machine allows moving from `self` to `to`.
    pub fn can_transition(&self, to: CheckoutPhase) -> bool {
        use CheckoutPhase::*;
        matches!(
            (self, to),
            (Preparing, AwaitingPayment)
                | (AwaitingPayment, Completing)
                | (Completing, Completed)
                | (Failed, Completing)
                | (Preparing, Failed)
                | (AwaitingPayment, Failed)
                | (Completing, Failed)
        )
    }

    /// Terminal phases accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutPhase::Completed)
    }
}

impl fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Server-side record of an in-flight checkout.
///
/// Everything completion needs is snapshotted here at prepare time; the
/// client contributes nothing but the session id and (for card payments) a
/// confirmed intent reference, which is still re-verified provider-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: CheckoutId,
    pub customer_id: CustomerId,
    pub phase: CheckoutPhase,
    /// Line items frozen at prepare time; completion clears exactly these.
    pub items: Vec<OrderLineItem>,
    pub customer: CustomerSnapshot,
    pub discount: Option<AppliedDiscount>,
    pub pricing: PricingBreakdown,
    /// True when credits covered the whole total and no intent exists.
    pub credits_only: bool,
    /// The provider intent, for card checkouts.
    pub intent_id: Option<IntentId>,
    pub created_at: i64,
    pub expires_at: i64,
}

impl CheckoutSession {
    /// Whether the session has passed its completion window.
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// What the caller asserts when completing a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentConfirmation {
    /// A card payment the client believes succeeded; always re-verified.
    Paid { intent: IntentId },
    /// The session was fully covered by credits; no provider involved.
    CreditsOnly,
}

/// Result of the prepare phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCheckout {
    pub session: CheckoutSession,
    /// Opaque secret the client hands to the payment SDK; `None` for
    /// credits-only sessions.
    pub client_secret: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use CheckoutPhase::*;
        assert!(Preparing.can_transition(AwaitingPayment));
        assert!(AwaitingPayment.can_transition(Completing));
        assert!(Completing.can_transition(Completed));
    }

    #[test]
    fn test_failure_and_retry_transitions() {
        use CheckoutPhase::*;
        assert!(Preparing.can_transition(Failed));
        assert!(AwaitingPayment.can_transition(Failed));
        assert!(Completing.can_transition(Failed));
        // Post-payment commit retry.
        assert!(Failed.can_transition(Completing));
    }

    #[test]
    fn test_forbidden_transitions() {
        use CheckoutPhase::*;
        assert!(!Completed.can_transition(Completing));
        assert!(!Completed.can_transition(Failed));
        assert!(!Preparing.can_transition(Completing));
        assert!(!AwaitingPayment.can_transition(Completed));
        assert!(Completed.is_terminal());
    }
}
