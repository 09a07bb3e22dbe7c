//! Discount definitions and validation.

use crate::error::CommerceError;
use crate::ids::{CustomerId, DiscountId};
use crate::money::Money;
use crate::storage::{DiscountStore, Store};
use livecart_cache::SharedClock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How a discount reduces the subtotal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiscountKind {
    /// Percentage off the subtotal, in [0, 100].
    Percentage(f64),
    /// Fixed amount off, capped at the subtotal.
    FixedAmount(Money),
}

/// Effective status derived from the stored flag and the schedule window.
///
/// Precedence: disabled beats scheduled beats expired beats active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscountStatus {
    Disabled,
    Scheduled,
    Expired,
    Active,
}

impl DiscountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountStatus::Disabled => "disabled",
            DiscountStatus::Scheduled => "scheduled",
            DiscountStatus::Expired => "expired",
            DiscountStatus::Active => "active",
        }
    }
}

/// A discount code definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    /// Unique discount identifier.
    pub id: DiscountId,
    /// Redemption code, stored normalized uppercase.
    pub code: String,
    /// Display title (e.g. "10% off first order").
    pub title: String,
    /// Value of the discount.
    pub kind: DiscountKind,
    /// Explicit on/off switch; off wins over everything else.
    pub enabled: bool,
    /// Unix timestamp the code becomes redeemable.
    pub starts_at: Option<i64>,
    /// Unix timestamp the code stops being redeemable.
    pub ends_at: Option<i64>,
    /// Cap on total redemptions across all customers.
    pub usage_limit: Option<i64>,
    /// Cap on redemptions per customer.
    pub usage_limit_per_customer: Option<i64>,
    /// Minimum cart subtotal required to redeem.
    pub minimum_subtotal: Option<Money>,
    /// Unix timestamp of creation.
    pub created_at: i64,
}

impl Discount {
    /// Create an enabled percentage discount.
    pub fn percentage(
        code: impl Into<String>,
        title: impl Into<String>,
        percent: f64,
        created_at: i64,
    ) -> Self {
        Self {
            id: DiscountId::generate(),
            code: normalize_code(&code.into()),
            title: title.into(),
            kind: DiscountKind::Percentage(percent),
            enabled: true,
            starts_at: None,
            ends_at: None,
            usage_limit: None,
            usage_limit_per_customer: None,
            minimum_subtotal: None,
            created_at,
        }
    }

    /// Create an enabled fixed-amount discount.
    pub fn fixed_amount(
        code: impl Into<String>,
        title: impl Into<String>,
        amount: Money,
        created_at: i64,
    ) -> Self {
        Self {
            id: DiscountId::generate(),
            code: normalize_code(&code.into()),
            title: title.into(),
            kind: DiscountKind::FixedAmount(amount),
            enabled: true,
            starts_at: None,
            ends_at: None,
            usage_limit: None,
            usage_limit_per_customer: None,
            minimum_subtotal: None,
            created_at,
        }
    }

    /// Require a minimum subtotal.
    pub fn with_minimum_subtotal(mut self, minimum: Money) -> Self {
        self.minimum_subtotal = Some(minimum);
        self
    }

    /// Cap total redemptions.
    pub fn with_usage_limit(mut self, limit: i64) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    /// Cap redemptions per customer.
    pub fn with_per_customer_limit(mut self, limit: i64) -> Self {
        self.usage_limit_per_customer = Some(limit);
        self
    }

    /// Restrict to a schedule window.
    pub fn with_window(mut self, starts_at: Option<i64>, ends_at: Option<i64>) -> Self {
        self.starts_at = starts_at;
        self.ends_at = ends_at;
        self
    }

    /// Effective status at `now`.
    pub fn effective_status(&self, now: i64) -> DiscountStatus {
        if !self.enabled {
            return DiscountStatus::Disabled;
        }
        if let Some(starts) = self.starts_at {
            if now < starts {
                return DiscountStatus::Scheduled;
            }
        }
        if let Some(ends) = self.ends_at {
            if now > ends {
                return DiscountStatus::Expired;
            }
        }
        DiscountStatus::Active
    }

    /// Discount amount against `subtotal`.
    ///
    /// Percentage values round half-up at the cent; fixed amounts never
    /// exceed the subtotal, so the discounted subtotal cannot go negative.
    pub fn amount_for(&self, subtotal: Money) -> Result<Money, CommerceError> {
        match &self.kind {
            DiscountKind::Percentage(percent) => {
                subtotal.percent(*percent).ok_or(CommerceError::Overflow)
            }
            DiscountKind::FixedAmount(amount) => amount
                .try_min(&subtotal)
                .map(|m| Money::new(m.cents.max(0), m.currency))
                .ok_or(CommerceError::Overflow),
        }
    }
}

/// Normalize a user-supplied code for lookup and storage.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Why a code was refused. Surfaced verbatim to the end user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiscountRejection {
    NotFound,
    Disabled,
    Scheduled,
    Expired,
    UsageLimitReached,
    CustomerLimitReached,
    MinimumNotMet { required: Money },
}

impl DiscountRejection {
    /// Stable machine-readable reason code.
    pub fn reason_code(&self) -> &'static str {
        match self {
            DiscountRejection::NotFound => "not-found",
            DiscountRejection::Disabled => "disabled",
            DiscountRejection::Scheduled => "scheduled",
            DiscountRejection::Expired => "expired",
            DiscountRejection::UsageLimitReached => "usage-limit",
            DiscountRejection::CustomerLimitReached => "customer-limit",
            DiscountRejection::MinimumNotMet { .. } => "minimum-not-met",
        }
    }
}

impl fmt::Display for DiscountRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountRejection::MinimumNotMet { required } => {
                write!(f, "minimum-not-met (requires {})", required)
            }
            other => write!(f, "{}", other.reason_code()),
        }
    }
}

/// A discount currently attached to a cart.
///
/// The amount is a cache of the last pricing pass; it is re-derived against
/// the live subtotal whenever totals are computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub discount_id: DiscountId,
    pub code: String,
    pub title: String,
    pub amount: Money,
}

impl AppliedDiscount {
    pub fn from_discount(discount: &Discount, amount: Money) -> Self {
        Self {
            discount_id: discount.id.clone(),
            code: discount.code.clone(),
            title: discount.title.clone(),
            amount,
        }
    }
}

/// Outcome of validating a code against a cart snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// The code applies; `amount` is the computed reduction.
    Valid { discount: Discount, amount: Money },
    /// The code was refused for the given reason.
    Rejected(DiscountRejection),
}

/// Validates discount codes against cart state and usage history.
///
/// Validation never records usage; usage rows are written by checkout
/// completion, so an abandoned cart cannot burn a redemption.
#[derive(Clone)]
pub struct DiscountEvaluator {
    store: Arc<dyn Store>,
    clock: SharedClock,
}

impl DiscountEvaluator {
    pub fn new(store: Arc<dyn Store>, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Validate `code` for `customer` against `cart_subtotal`.
    pub async fn validate(
        &self,
        code: &str,
        cart_subtotal: Money,
        customer: &CustomerId,
    ) -> Result<ValidationOutcome, CommerceError> {
        let normalized = normalize_code(code);
        let Some(discount) = self.store.discount_by_code(&normalized).await? else {
            return Ok(ValidationOutcome::Rejected(DiscountRejection::NotFound));
        };

        let status = discount.effective_status(self.clock.now());
        match status {
            DiscountStatus::Disabled => {
                return Ok(ValidationOutcome::Rejected(DiscountRejection::Disabled))
            }
            DiscountStatus::Scheduled => {
                return Ok(ValidationOutcome::Rejected(DiscountRejection::Scheduled))
            }
            DiscountStatus::Expired => {
                return Ok(ValidationOutcome::Rejected(DiscountRejection::Expired))
            }
            DiscountStatus::Active => {}
        }

        if let Some(limit) = discount.usage_limit {
            let used = self.store.discount_usage_total(&discount.id).await?;
            if used >= limit {
                return Ok(ValidationOutcome::Rejected(
                    DiscountRejection::UsageLimitReached,
                ));
            }
        }

        if let Some(limit) = discount.usage_limit_per_customer {
            let used = self
                .store
                .discount_usage_for_customer(&discount.id, customer)
                .await?;
            if used >= limit {
                return Ok(ValidationOutcome::Rejected(
                    DiscountRejection::CustomerLimitReached,
                ));
            }
        }

        if let Some(minimum) = discount.minimum_subtotal {
            if cart_subtotal.cents < minimum.cents {
                return Ok(ValidationOutcome::Rejected(
                    DiscountRejection::MinimumNotMet { required: minimum },
                ));
            }
        }

        let amount = discount.amount_for(cart_subtotal)?;
        Ok(ValidationOutcome::Valid { discount, amount })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    #[test]
    fn test_code_normalization() {
        assert_eq!(normalize_code("  save10 "), "SAVE10");
        let discount = Discount::percentage("save10", "Ten off", 10.0, 0);
        assert_eq!(discount.code, "SAVE10");
    }

    #[test]
    fn test_status_precedence() {
        let mut discount = Discount::percentage("X", "x", 10.0, 0).with_window(Some(100), Some(200));

        // Disabled wins even when also scheduled and expired.
        discount.enabled = false;
        assert_eq!(discount.effective_status(50), DiscountStatus::Disabled);
        assert_eq!(discount.effective_status(300), DiscountStatus::Disabled);

        discount.enabled = true;
        assert_eq!(discount.effective_status(50), DiscountStatus::Scheduled);
        assert_eq!(discount.effective_status(300), DiscountStatus::Expired);
        assert_eq!(discount.effective_status(150), DiscountStatus::Active);
    }

    #[test]
    fn test_percentage_amount_rounds_half_up() {
        let discount = Discount::percentage("SAVE10", "Ten off", 10.0, 0);
        assert_eq!(discount.amount_for(usd(10_000)).unwrap(), usd(1_000));

        // 10% of $0.05 = 0.5 cents, rounds up.
        assert_eq!(discount.amount_for(usd(5)).unwrap(), usd(1));
    }

    #[test]
    fn test_fixed_amount_capped_at_subtotal() {
        let discount = Discount::fixed_amount("FIVE", "Five off", usd(500), 0);
        assert_eq!(discount.amount_for(usd(10_000)).unwrap(), usd(500));
        assert_eq!(discount.amount_for(usd(300)).unwrap(), usd(300));
    }

    #[test]
    fn test_rejection_reason_codes() {
        assert_eq!(DiscountRejection::NotFound.reason_code(), "not-found");
        assert_eq!(
            DiscountRejection::CustomerLimitReached.reason_code(),
            "customer-limit"
        );
        assert_eq!(
            DiscountRejection::MinimumNotMet { required: usd(5_000) }.reason_code(),
            "minimum-not-met"
        );
        assert_eq!(
            format!("{}", DiscountRejection::MinimumNotMet { required: usd(5_000) }),
            "minimum-not-met (requires 50.00 USD)"
        );
    }
}
