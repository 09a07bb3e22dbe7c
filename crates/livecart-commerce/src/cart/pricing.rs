//! Pricing breakdown.

use crate::config::CheckoutConfig;
use crate::error::CommerceError;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Derived pricing for a cart. Never stored; recomputed on every read so a
/// stale discount or balance can never leak into a total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    /// Sum of line-item prices.
    pub subtotal: Money,
    /// Tax on the subtotal.
    pub tax: Money,
    /// Shipping charge.
    pub shipping: Money,
    /// Discount reduction.
    pub discount: Money,
    /// Store credit applied.
    pub credits_applied: Money,
    /// Amount due: `max(0, subtotal + tax + shipping - discount - credits)`.
    pub total: Money,
}

impl PricingBreakdown {
    /// Compute a breakdown from the cart inputs.
    ///
    /// Credits are clamped to `min(requested, balance, amount due before
    /// credits)`, so the result never over-applies credit and the total is
    /// never negative.
    pub fn compute(
        subtotal: Money,
        discount: Money,
        credits_requested: Money,
        credit_balance: Money,
        config: &CheckoutConfig,
    ) -> Result<Self, CommerceError> {
        let tax = subtotal
            .percent(config.tax_rate_percent)
            .ok_or(CommerceError::Overflow)?;
        let shipping = config.shipping_flat();

        let due_before_credits = subtotal
            .try_add(&tax)
            .and_then(|m| m.try_add(&shipping))
            .and_then(|m| m.clamped_sub(&discount))
            .ok_or(CommerceError::Overflow)?;

        let credits_applied = credits_requested
            .try_min(&credit_balance)
            .and_then(|m| m.try_min(&due_before_credits))
            .map(|m| Money::new(m.cents.max(0), m.currency))
            .ok_or(CommerceError::Overflow)?;

        let total = due_before_credits
            .clamped_sub(&credits_applied)
            .ok_or(CommerceError::Overflow)?;

        Ok(Self {
            subtotal,
            tax,
            shipping,
            discount,
            credits_applied,
            total,
        })
    }

    /// An all-zero breakdown for an empty cart.
    pub fn empty(config: &CheckoutConfig) -> Self {
        let zero = Money::zero(config.currency);
        Self {
            subtotal: zero,
            tax: zero,
            shipping: zero,
            discount: zero,
            credits_applied: zero,
            total: zero,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    fn config() -> CheckoutConfig {
        CheckoutConfig::default()
    }

    #[test]
    fn test_reference_scenario() {
        // Subtotal $100, 10% discount = $10, tax 8% = $8, shipping $0,
        // $5 credits requested against a $50 balance -> total $93.
        let pricing = PricingBreakdown::compute(
            usd(10_000),
            usd(1_000),
            usd(500),
            usd(5_000),
            &config(),
        )
        .unwrap();
        assert_eq!(pricing.tax, usd(800));
        assert_eq!(pricing.shipping, usd(0));
        assert_eq!(pricing.credits_applied, usd(500));
        assert_eq!(pricing.total, usd(9_300));
    }

    #[test]
    fn test_total_identity_holds() {
        let pricing = PricingBreakdown::compute(
            usd(2_500),
            usd(700),
            usd(10_000),
            usd(10_000),
            &config(),
        )
        .unwrap();
        let raw = pricing.subtotal.cents + pricing.tax.cents + pricing.shipping.cents
            - pricing.discount.cents
            - pricing.credits_applied.cents;
        assert_eq!(pricing.total.cents, raw.max(0));
        assert!(pricing.total.cents >= 0);
    }

    #[test]
    fn test_credits_clamped_to_balance_and_due() {
        // Balance smaller than request.
        let pricing =
            PricingBreakdown::compute(usd(1_000), usd(0), usd(5_000), usd(300), &config()).unwrap();
        assert_eq!(pricing.credits_applied, usd(300));

        // Due smaller than both.
        let pricing =
            PricingBreakdown::compute(usd(1_000), usd(0), usd(5_000), usd(5_000), &config())
                .unwrap();
        assert_eq!(pricing.credits_applied, usd(1_080));
        assert_eq!(pricing.total, usd(0));
    }

    #[test]
    fn test_discount_larger_than_order_floors_at_zero() {
        let pricing =
            PricingBreakdown::compute(usd(1_000), usd(5_000), usd(0), usd(0), &config()).unwrap();
        assert_eq!(pricing.total, usd(0));
        assert_eq!(pricing.credits_applied, usd(0));
    }

    #[test]
    fn test_negative_credit_request_applies_nothing() {
        let pricing =
            PricingBreakdown::compute(usd(1_000), usd(0), usd(-500), usd(1_000), &config())
                .unwrap();
        assert_eq!(pricing.credits_applied, usd(0));
    }
}
