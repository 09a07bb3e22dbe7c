//! Engine configuration.

use crate::error::CommerceError;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Business-rule constants for pricing and checkout.
///
/// Defaults match the reference behavior: 8% flat tax on the subtotal, free
/// shipping, 30-minute checkout expiry. Deployments override via TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Settlement currency for all carts and orders.
    pub currency: Currency,
    /// Tax applied to the cart subtotal, as a percentage in [0, 100].
    pub tax_rate_percent: f64,
    /// Flat shipping charge in minor units.
    pub shipping_flat_cents: i64,
    /// How long a prepared checkout (and its payment intent) stays
    /// completable, in seconds.
    pub checkout_ttl_secs: i64,
    /// Bound on any single payment-provider call, in milliseconds.
    pub provider_timeout_ms: u64,
    /// TTL for cached credit-balance aggregates, in seconds.
    pub balance_cache_ttl_secs: i64,
    /// Whether administrative credit adjustments may drive a balance below
    /// zero. Customer-facing spends never may, regardless of this flag.
    pub allow_negative_adjustment: bool,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: Currency::USD,
            tax_rate_percent: 8.0,
            shipping_flat_cents: 0,
            checkout_ttl_secs: 30 * 60,
            provider_timeout_ms: 10_000,
            balance_cache_ttl_secs: 300,
            allow_negative_adjustment: false,
        }
    }
}

impl CheckoutConfig {
    /// Parse a TOML document; unspecified keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, CommerceError> {
        let config: Self =
            toml::from_str(raw).map_err(|err| CommerceError::Validation(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pricing math cannot honor.
    pub fn validate(&self) -> Result<(), CommerceError> {
        if !(0.0..=100.0).contains(&self.tax_rate_percent) || !self.tax_rate_percent.is_finite() {
            return Err(CommerceError::Validation(format!(
                "tax_rate_percent must be within [0, 100], got {}",
                self.tax_rate_percent
            )));
        }
        if self.shipping_flat_cents < 0 {
            return Err(CommerceError::Validation(
                "shipping_flat_cents must not be negative".into(),
            ));
        }
        if self.checkout_ttl_secs <= 0 {
            return Err(CommerceError::Validation(
                "checkout_ttl_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Flat shipping charge as money.
    pub fn shipping_flat(&self) -> Money {
        Money::new(self.shipping_flat_cents, self.currency)
    }

    /// Provider call bound as a `Duration`.
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_behavior() {
        let config = CheckoutConfig::default();
        assert_eq!(config.currency, Currency::USD);
        assert!((config.tax_rate_percent - 8.0).abs() < f64::EPSILON);
        assert_eq!(config.shipping_flat_cents, 0);
        assert_eq!(config.checkout_ttl_secs, 1_800);
        assert!(!config.allow_negative_adjustment);
    }

    #[test]
    fn test_toml_overrides_and_defaults() {
        let config = CheckoutConfig::from_toml_str(
            r#"
            tax_rate_percent = 6.5
            shipping_flat_cents = 499
            "#,
        )
        .unwrap();
        assert!((config.tax_rate_percent - 6.5).abs() < f64::EPSILON);
        assert_eq!(config.shipping_flat_cents, 499);
        // Unspecified keys fall back.
        assert_eq!(config.checkout_ttl_secs, 1_800);
    }

    #[test]
    fn test_rejects_invalid_tax_rate() {
        assert!(CheckoutConfig::from_toml_str("tax_rate_percent = 140.0").is_err());
        assert!(CheckoutConfig::from_toml_str("shipping_flat_cents = -1").is_err());
    }
}
