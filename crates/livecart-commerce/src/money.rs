//! Money type for monetary values.
//!
//! Amounts are an integer count of minor units (cents). Arithmetic is
//! checked and currency-aware: mixing currencies or overflowing yields
//! `None` from the `try_*` operations rather than panicking, and callers
//! translate that into a domain error. Percentage math rounds half-up at
//! the cent using integer arithmetic, so boundary values are exact.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported settlement currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    USD,
    CAD,
    EUR,
    GBP,
    AUD,
}

impl Currency {
    /// ISO 4217 code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::CAD => "CAD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::AUD => "AUD",
        }
    }

    /// Parse an ISO code, case-insensitive.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "USD" => Some(Currency::USD),
            "CAD" => Some(Currency::CAD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "AUD" => Some(Currency::AUD),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A monetary amount in minor units of a currency.
///
/// The amount may be negative: the credit ledger stores spends and downward
/// adjustments as negative entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in minor units (cents).
    pub cents: i64,
    /// The currency.
    pub currency: Currency,
}

impl Money {
    /// Create a value from minor units.
    pub fn new(cents: i64, currency: Currency) -> Self {
        Self { cents, currency }
    }

    /// Zero in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Negate the amount.
    pub fn negated(&self) -> Self {
        Self::new(-self.cents, self.currency)
    }

    /// Checked addition; `None` on currency mismatch or overflow.
    pub fn try_add(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.cents
            .checked_add(other.cents)
            .map(|cents| Money::new(cents, self.currency))
    }

    /// Checked subtraction; `None` on currency mismatch or overflow.
    pub fn try_sub(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.cents
            .checked_sub(other.cents)
            .map(|cents| Money::new(cents, self.currency))
    }

    /// Subtraction floored at zero: `max(0, self - other)`.
    pub fn clamped_sub(&self, other: &Money) -> Option<Money> {
        self.try_sub(other)
            .map(|m| Money::new(m.cents.max(0), m.currency))
    }

    /// The smaller of two same-currency amounts.
    pub fn try_min(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        Some(Money::new(self.cents.min(other.cents), self.currency))
    }

    /// Sum an iterator of amounts in the expected currency.
    pub fn try_sum<'a>(
        iter: impl Iterator<Item = &'a Money>,
        currency: Currency,
    ) -> Option<Money> {
        let mut total = Money::zero(currency);
        for m in iter {
            total = total.try_add(m)?;
        }
        Some(total)
    }

    /// `percent` of this amount, rounded half-up at the cent.
    ///
    /// `percent` must lie in `[0, 100]` and is resolved to hundredths of a
    /// percent before the integer multiply, so `8.25` is exact.
    pub fn percent(&self, percent: f64) -> Option<Money> {
        if !(0.0..=100.0).contains(&percent) || !percent.is_finite() {
            return None;
        }
        // Hundredths of a percent as an integer scale factor.
        let basis_points = (percent * 100.0).round() as i128;
        let product = self.cents as i128 * basis_points;
        let cents = if product >= 0 {
            (product + 5_000) / 10_000
        } else {
            (product - 5_000) / 10_000
        };
        i64::try_from(cents)
            .ok()
            .map(|cents| Money::new(cents, self.currency))
    }

    /// Render without a currency symbol, e.g. "93.00" or "-0.50".
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        format!("{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_decimal_string(), self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    #[test]
    fn test_checked_add_and_sub() {
        assert_eq!(usd(1000).try_add(&usd(500)), Some(usd(1500)));
        assert_eq!(usd(1000).try_sub(&usd(300)), Some(usd(700)));
    }

    #[test]
    fn test_currency_mismatch_is_none() {
        let eur = Money::new(1000, Currency::EUR);
        assert!(usd(1000).try_add(&eur).is_none());
        assert!(usd(1000).try_min(&eur).is_none());
    }

    #[test]
    fn test_clamped_sub_floors_at_zero() {
        assert_eq!(usd(500).clamped_sub(&usd(800)), Some(usd(0)));
        assert_eq!(usd(800).clamped_sub(&usd(500)), Some(usd(300)));
    }

    #[test]
    fn test_percent_rounds_half_up() {
        // 10% of $100.00
        assert_eq!(usd(10_000).percent(10.0), Some(usd(1_000)));
        // 8% of $100.00
        assert_eq!(usd(10_000).percent(8.0), Some(usd(800)));
        // 15% of $0.03 = 0.45 cents, rounds up to 1
        assert_eq!(usd(3).percent(15.0), Some(usd(1)));
        // 12.5% of $0.01 = 0.125 cents, rounds down
        assert_eq!(usd(1).percent(12.5), Some(usd(0)));
        // Fractional rates stay exact: 8.25% of $10.00 = 82.5 -> 83
        assert_eq!(usd(1_000).percent(8.25), Some(usd(83)));
    }

    #[test]
    fn test_percent_rejects_out_of_range() {
        assert!(usd(1000).percent(-1.0).is_none());
        assert!(usd(1000).percent(100.5).is_none());
        assert!(usd(1000).percent(f64::NAN).is_none());
    }

    #[test]
    fn test_try_sum() {
        let items = [usd(100), usd(250), usd(50)];
        assert_eq!(Money::try_sum(items.iter(), Currency::USD), Some(usd(400)));

        let mixed = [usd(100), Money::new(1, Currency::GBP)];
        assert!(Money::try_sum(mixed.iter(), Currency::USD).is_none());
    }

    #[test]
    fn test_decimal_rendering() {
        assert_eq!(usd(9_300).to_decimal_string(), "93.00");
        assert_eq!(usd(5).to_decimal_string(), "0.05");
        assert_eq!(usd(-50).to_decimal_string(), "-0.50");
        assert_eq!(format!("{}", usd(1_234)), "12.34 USD");
    }

    #[test]
    fn test_overflow_is_none() {
        assert!(usd(i64::MAX).try_add(&usd(1)).is_none());
    }
}
