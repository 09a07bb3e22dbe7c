//! Store-credit ledger.
//!
//! Credit is an append-only transaction log: positive entries issue credit,
//! negative entries spend or correct it, and every entry snapshots the
//! balance it produced. The live balance is derived by summing non-expired
//! entries; a small TTL cache avoids recomputing it on every pricing pass
//! and is invalidated on every mutation.

use crate::config::CheckoutConfig;
use crate::error::CommerceError;
use crate::ids::{ActorId, CustomerId, OrderId, TransactionId};
use crate::money::{Currency, Money};
use crate::storage::{CreditStore, CreditTransactionDraft, Store, StorageError};
use livecart_cache::{SharedClock, TtlCache};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Who recorded a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditActor {
    /// The engine itself (checkout spends, automated grants).
    System,
    /// A staff member, by id.
    Admin(ActorId),
}

/// What kind of entry this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditKind {
    /// Credit granted; amount is positive.
    Issue,
    /// Credit consumed by an order; amount is negative.
    Spend,
    /// Administrative correction; either sign.
    Adjust,
}

/// One immutable row of the credit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: TransactionId,
    pub customer_id: CustomerId,
    /// Signed amount; positive issues credit, negative consumes it.
    pub amount: Money,
    pub kind: CreditKind,
    pub description: String,
    pub actor: CreditActor,
    /// Balance immediately after this entry was appended.
    pub balance_after: Money,
    /// Order that consumed the credit, for spends.
    pub order_id: Option<OrderId>,
    /// Expiry for issued entries; expired issues stop counting toward the
    /// balance.
    pub expires_at: Option<i64>,
    pub created_at: i64,
}

impl CreditTransaction {
    /// Whether this entry still counts toward the balance at `now`.
    pub fn counts_at(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

/// Balance summary derived from the log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditBalance {
    /// Spendable balance (non-expired entries summed).
    pub balance: Money,
    /// Lifetime credit issued, expired or not.
    pub total_earned: Money,
    /// Lifetime credit consumed (positive number).
    pub total_spent: Money,
}

impl CreditBalance {
    fn empty(currency: Currency) -> Self {
        Self {
            balance: Money::zero(currency),
            total_earned: Money::zero(currency),
            total_spent: Money::zero(currency),
        }
    }
}

/// Derive the balance summary from a transaction log at `now`.
///
/// Shared with store implementations so their conditional spend check uses
/// exactly the arithmetic the ledger reports.
pub fn derive_balance(
    transactions: &[CreditTransaction],
    now: i64,
    currency: Currency,
) -> CreditBalance {
    let mut summary = CreditBalance::empty(currency);
    for txn in transactions {
        if txn.counts_at(now) {
            summary.balance.cents += txn.amount.cents;
        }
        if txn.amount.is_positive() {
            summary.total_earned.cents += txn.amount.cents;
        } else {
            summary.total_spent.cents += -txn.amount.cents;
        }
    }
    summary
}

/// How much of a requested credit application can actually be used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditApplication {
    /// `min(requested, balance, cart_total)`.
    pub applicable: Money,
    /// Balance left if `applicable` were spent.
    pub remaining_balance: Money,
}

/// Append-only credit ledger with a cached balance aggregate.
#[derive(Clone)]
pub struct CreditLedger {
    store: Arc<dyn Store>,
    cache: Arc<TtlCache<CreditBalance>>,
    clock: SharedClock,
    currency: Currency,
    allow_negative_adjustment: bool,
}

impl CreditLedger {
    pub fn new(store: Arc<dyn Store>, clock: SharedClock, config: &CheckoutConfig) -> Self {
        Self {
            store,
            cache: Arc::new(TtlCache::new(clock.clone(), config.balance_cache_ttl_secs)),
            clock,
            currency: config.currency,
            allow_negative_adjustment: config.allow_negative_adjustment,
        }
    }

    fn cache_key(customer: &CustomerId) -> String {
        format!("balance:{}", customer)
    }

    /// Current balance summary, cached.
    pub async fn balance(&self, customer: &CustomerId) -> Result<CreditBalance, CommerceError> {
        let key = Self::cache_key(customer);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }
        let transactions = self.store.credit_transactions(customer).await?;
        let summary = derive_balance(&transactions, self.clock.now(), self.currency);
        self.cache.put(key, summary);
        Ok(summary)
    }

    /// Full transaction history, newest last.
    pub async fn history(
        &self,
        customer: &CustomerId,
    ) -> Result<Vec<CreditTransaction>, CommerceError> {
        Ok(self.store.credit_transactions(customer).await?)
    }

    /// Force the next `balance` read to recompute.
    pub fn invalidate(&self, customer: &CustomerId) {
        self.cache.invalidate(&Self::cache_key(customer));
    }

    /// How much of `requested` can be applied against `cart_total`.
    pub async fn validate_application(
        &self,
        customer: &CustomerId,
        requested: Money,
        cart_total: Money,
    ) -> Result<CreditApplication, CommerceError> {
        if !requested.is_positive() {
            return Err(CommerceError::Validation(
                "requested credit amount must be positive".into(),
            ));
        }
        if !cart_total.is_positive() {
            return Err(CommerceError::Validation(
                "cart total must be positive to apply credits".into(),
            ));
        }
        let balance = self.balance(customer).await?.balance;
        let applicable = requested
            .try_min(&balance)
            .and_then(|m| m.try_min(&cart_total))
            .map(|m| Money::new(m.cents.max(0), m.currency))
            .ok_or(CommerceError::Overflow)?;
        let remaining_balance = balance.try_sub(&applicable).ok_or(CommerceError::Overflow)?;
        Ok(CreditApplication {
            applicable,
            remaining_balance,
        })
    }

    /// Grant credit to a customer.
    pub async fn issue(
        &self,
        customer: &CustomerId,
        amount: Money,
        description: impl Into<String>,
        actor: CreditActor,
        expires_at: Option<i64>,
    ) -> Result<CreditTransaction, CommerceError> {
        if !amount.is_positive() {
            return Err(CommerceError::Validation(
                "issued credit must be positive".into(),
            ));
        }
        let draft = CreditTransactionDraft {
            customer_id: customer.clone(),
            amount,
            kind: CreditKind::Issue,
            description: description.into(),
            actor,
            order_id: None,
            expires_at,
            created_at: self.clock.now(),
        };
        let txn = self.store.append_credit(draft, None).await?;
        self.invalidate(customer);
        tracing::info!(
            customer = %customer,
            amount = %amount,
            "credit issued"
        );
        Ok(txn)
    }

    /// Consume credit for an order.
    ///
    /// The balance check and the append are one atomic step at the store
    /// layer; two concurrent spends cannot both draw on the same funds.
    pub async fn spend(
        &self,
        customer: &CustomerId,
        amount: Money,
        order: &OrderId,
    ) -> Result<CreditTransaction, CommerceError> {
        if !amount.is_positive() {
            return Err(CommerceError::Validation(
                "spend amount must be positive".into(),
            ));
        }
        let draft = CreditTransactionDraft {
            customer_id: customer.clone(),
            amount: amount.negated(),
            kind: CreditKind::Spend,
            description: format!("applied to order {}", order),
            actor: CreditActor::System,
            order_id: Some(order.clone()),
            expires_at: None,
            created_at: self.clock.now(),
        };
        let result = self.store.append_credit(draft, Some(0)).await;
        self.invalidate(customer);
        match result {
            Ok(txn) => Ok(txn),
            Err(StorageError::BalanceFloor { available_cents }) => {
                Err(CommerceError::InsufficientBalance {
                    requested: amount,
                    available: Money::new(available_cents, self.currency),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Administrative correction, either sign.
    ///
    /// Refuses to drive the balance below zero unless the deployment
    /// enables `allow_negative_adjustment`; that gate is separate from
    /// customer-facing spends, which never overdraw.
    pub async fn adjust(
        &self,
        customer: &CustomerId,
        amount: Money,
        description: impl Into<String>,
        actor: CreditActor,
    ) -> Result<CreditTransaction, CommerceError> {
        if amount.is_zero() {
            return Err(CommerceError::Validation(
                "adjustment amount must be non-zero".into(),
            ));
        }
        let floor = if self.allow_negative_adjustment {
            None
        } else {
            Some(0)
        };
        let draft = CreditTransactionDraft {
            customer_id: customer.clone(),
            amount,
            kind: CreditKind::Adjust,
            description: description.into(),
            actor,
            order_id: None,
            expires_at: None,
            created_at: self.clock.now(),
        };
        let result = self.store.append_credit(draft, floor).await;
        self.invalidate(customer);
        match result {
            Ok(txn) => {
                tracing::info!(
                    customer = %customer,
                    amount = %amount,
                    "credit adjusted"
                );
                Ok(txn)
            }
            Err(StorageError::BalanceFloor { available_cents }) => {
                Err(CommerceError::InsufficientBalance {
                    requested: amount.negated(),
                    available: Money::new(available_cents, self.currency),
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::CustomerId;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    fn txn(amount: i64, expires_at: Option<i64>) -> CreditTransaction {
        CreditTransaction {
            id: TransactionId::generate(),
            customer_id: CustomerId::new("cust_1"),
            amount: usd(amount),
            kind: if amount >= 0 {
                CreditKind::Issue
            } else {
                CreditKind::Spend
            },
            description: String::new(),
            actor: CreditActor::System,
            balance_after: usd(0),
            order_id: None,
            expires_at,
            created_at: 0,
        }
    }

    #[test]
    fn test_derive_balance_sums_signed_amounts() {
        let log = [txn(5_000, None), txn(-1_500, None), txn(200, None)];
        let summary = derive_balance(&log, 100, Currency::USD);
        assert_eq!(summary.balance, usd(3_700));
        assert_eq!(summary.total_earned, usd(5_200));
        assert_eq!(summary.total_spent, usd(1_500));
    }

    #[test]
    fn test_expired_issues_stop_counting() {
        let log = [txn(5_000, Some(50)), txn(1_000, None)];
        let before = derive_balance(&log, 40, Currency::USD);
        assert_eq!(before.balance, usd(6_000));

        let after = derive_balance(&log, 50, Currency::USD);
        assert_eq!(after.balance, usd(1_000));
        // Lifetime totals are unaffected by expiry.
        assert_eq!(after.total_earned, usd(6_000));
    }
}
