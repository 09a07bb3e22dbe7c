//! Storage contracts.
//!
//! The engine owns the semantics; implementations own the store. Three of
//! these operations are contractually atomic and must stay atomic in any
//! backend (a SQL implementation maps them onto row-locked transactions):
//!
//! - [`CreditStore::append_credit`] with a floor: the balance check and
//!   the append are one step, so concurrent spends cannot both draw on the
//!   same funds;
//! - [`CheckoutStore::transition_checkout`]: a compare-and-set on the
//!   phase column, serializing concurrent completions;
//! - [`CheckoutStore::commit_completion`]: order insert, discount usage,
//!   credit spend and cart clear commit together or not at all.

mod memory;

pub use memory::MemoryStore;

use crate::cart::{CartLineItem, VariantAttributes};
use crate::checkout::{CheckoutPhase, CheckoutSession, DiscountUsageRecord, Order};
use crate::credit::{CreditActor, CreditKind, CreditTransaction};
use crate::discount::{AppliedDiscount, Discount};
use crate::ids::{
    CheckoutId, CustomerId, DiscountId, IntentId, LineItemId, OrderId, ProductId, VariantId,
    WaitlistId,
};
use crate::money::Money;
use crate::waitlist::WaitlistEntry;
use async_trait::async_trait;
use thiserror::Error;

/// Storage layer failure.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A conditional credit append would take the balance below its floor.
    /// Carries the balance that was actually available.
    #[error("balance floor violated, available {available_cents} cents")]
    BalanceFloor { available_cents: i64 },

    /// A conditional phase transition found the row in another phase.
    #[error("phase conflict: expected {expected}, found {found}")]
    PhaseConflict { expected: String, found: String },

    /// Any other conditional update that did not match.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store itself failed.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A purchasable variant as the catalog knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRecord {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    /// Live price; carts snapshot it at add time.
    pub price: Money,
    pub attributes: VariantAttributes,
}

/// The mutable customer record (orders snapshot it instead of linking it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
}

/// A credit ledger entry awaiting its `id` and `balance_after`, which the
/// store assigns inside the conditional append.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditTransactionDraft {
    pub customer_id: CustomerId,
    /// Signed amount; negative entries consume credit.
    pub amount: Money,
    pub kind: CreditKind,
    pub description: String,
    pub actor: CreditActor,
    pub order_id: Option<OrderId>,
    pub expires_at: Option<i64>,
    pub created_at: i64,
}

/// Everything checkout completion commits in one atomic unit.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionPlan {
    pub session_id: CheckoutId,
    /// The fully built order row.
    pub order: Order,
    /// Redemption row to write, when a discount was applied.
    pub discount_usage: Option<DiscountUsageRecord>,
    /// Conditional spend (floor zero), when credits were applied.
    pub credit_spend: Option<CreditTransactionDraft>,
    /// Cart lines consumed by this order; lines added after prepare stay.
    pub clear_items: Vec<LineItemId>,
}

/// Catalog reads.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn variant(&self, variant: &VariantId) -> Result<Option<VariantRecord>, StorageError>;
}

/// Customer reads.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn customer(&self, customer: &CustomerId)
        -> Result<Option<CustomerRecord>, StorageError>;
}

/// Cart rows and the at-most-one applied discount per cart.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn cart_items(&self, customer: &CustomerId)
        -> Result<Vec<CartLineItem>, StorageError>;

    async fn insert_cart_item(&self, item: CartLineItem) -> Result<(), StorageError>;

    /// Delete and return the line, or `None` if it was not there.
    async fn remove_cart_item(
        &self,
        customer: &CustomerId,
        line_item: &LineItemId,
    ) -> Result<Option<CartLineItem>, StorageError>;

    async fn applied_discount(
        &self,
        customer: &CustomerId,
    ) -> Result<Option<AppliedDiscount>, StorageError>;

    async fn set_applied_discount(
        &self,
        customer: &CustomerId,
        discount: Option<AppliedDiscount>,
    ) -> Result<(), StorageError>;
}

/// Discount definitions and redemption counts.
#[async_trait]
pub trait DiscountStore: Send + Sync {
    /// Lookup by normalized (uppercase) code.
    async fn discount_by_code(&self, code: &str) -> Result<Option<Discount>, StorageError>;

    async fn insert_discount(&self, discount: Discount) -> Result<(), StorageError>;

    /// Completed redemptions across all customers.
    async fn discount_usage_total(&self, discount: &DiscountId) -> Result<i64, StorageError>;

    /// Completed redemptions by one customer.
    async fn discount_usage_for_customer(
        &self,
        discount: &DiscountId,
        customer: &CustomerId,
    ) -> Result<i64, StorageError>;
}

/// Append-only credit log.
#[async_trait]
pub trait CreditStore: Send + Sync {
    async fn credit_transactions(
        &self,
        customer: &CustomerId,
    ) -> Result<Vec<CreditTransaction>, StorageError>;

    /// Append an entry, atomically refusing if the resulting balance would
    /// drop below `floor_cents` (when given).
    async fn append_credit(
        &self,
        draft: CreditTransactionDraft,
        floor_cents: Option<i64>,
    ) -> Result<CreditTransaction, StorageError>;
}

/// Waitlist rows.
#[async_trait]
pub trait WaitlistStore: Send + Sync {
    async fn insert_waitlist(&self, entry: WaitlistEntry) -> Result<(), StorageError>;

    async fn waitlist_for(
        &self,
        customer: &CustomerId,
    ) -> Result<Vec<WaitlistEntry>, StorageError>;

    async fn remove_waitlist(
        &self,
        customer: &CustomerId,
        entry: &WaitlistId,
    ) -> Result<Option<WaitlistEntry>, StorageError>;
}

/// Checkout sessions and the committing transaction.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn insert_checkout(&self, session: CheckoutSession) -> Result<(), StorageError>;

    async fn checkout_session(
        &self,
        checkout: &CheckoutId,
    ) -> Result<Option<CheckoutSession>, StorageError>;

    /// Compare-and-set the phase: succeeds only when the current phase is
    /// one of `from` and the machine allows `from -> to`.
    async fn transition_checkout(
        &self,
        checkout: &CheckoutId,
        from: &[CheckoutPhase],
        to: CheckoutPhase,
    ) -> Result<CheckoutSession, StorageError>;

    /// Run the completion atomically. Idempotent: a session that already
    /// committed returns its existing order untouched.
    async fn commit_completion(&self, plan: CompletionPlan) -> Result<Order, StorageError>;
}

/// Order reads.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn order(&self, order: &OrderId) -> Result<Option<Order>, StorageError>;

    async fn order_for_checkout(
        &self,
        checkout: &CheckoutId,
    ) -> Result<Option<Order>, StorageError>;

    /// Reconciliation lookup by payment reference.
    async fn order_for_payment(&self, intent: &IntentId) -> Result<Option<Order>, StorageError>;
}

/// The full persistence surface the engine is built against.
pub trait Store:
    CatalogStore
    + CustomerStore
    + CartStore
    + DiscountStore
    + CreditStore
    + WaitlistStore
    + CheckoutStore
    + OrderStore
{
}

impl<T> Store for T where
    T: CatalogStore
        + CustomerStore
        + CartStore
        + DiscountStore
        + CreditStore
        + WaitlistStore
        + CheckoutStore
        + OrderStore
{
}
