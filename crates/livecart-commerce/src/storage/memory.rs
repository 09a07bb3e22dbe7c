//! In-memory store.
//!
//! Reference backend for tests and demos. All state sits behind one mutex,
//! which trivially satisfies the atomicity contracts in [`super`]; the
//! point is that every conditional check (stock, balance floor, phase CAS,
//! completion idempotency) happens under the same critical section that
//! applies the write, exactly as a SQL backend would do inside a
//! transaction.

use crate::cart::CartLineItem;
use crate::checkout::{CheckoutPhase, CheckoutSession, DiscountUsageRecord, Order};
use crate::credit::{derive_balance, CreditTransaction};
use crate::discount::{AppliedDiscount, Discount};
use crate::ids::{
    CheckoutId, CustomerId, DiscountId, IntentId, LineItemId, OrderId, TransactionId, VariantId,
    WaitlistId,
};
use crate::money::Money;
use crate::providers::{InventoryProvider, ProviderError, ReserveOutcome};
use crate::storage::{
    CartStore, CatalogStore, CheckoutStore, CompletionPlan, CreditStore, CreditTransactionDraft,
    CustomerRecord, CustomerStore, DiscountStore, OrderStore, StorageError, VariantRecord,
    WaitlistStore,
};
use crate::waitlist::WaitlistEntry;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    variants: HashMap<VariantId, VariantRecord>,
    stock: HashMap<VariantId, i64>,
    customers: HashMap<CustomerId, CustomerRecord>,
    cart_items: HashMap<CustomerId, Vec<CartLineItem>>,
    applied_discounts: HashMap<CustomerId, AppliedDiscount>,
    discounts: HashMap<String, Discount>,
    usage_records: Vec<DiscountUsageRecord>,
    credits: HashMap<CustomerId, Vec<CreditTransaction>>,
    waitlists: HashMap<CustomerId, Vec<WaitlistEntry>>,
    checkouts: HashMap<CheckoutId, CheckoutSession>,
    orders: HashMap<OrderId, Order>,
    orders_by_checkout: HashMap<CheckoutId, OrderId>,
    fail_next_commit: bool,
    fail_releases: bool,
}

/// Single-process store implementing the whole persistence surface plus
/// [`InventoryProvider`].
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Seed a variant with an initial stock level.
    pub fn insert_variant(&self, record: VariantRecord, stock: i64) {
        let mut state = self.state();
        state.stock.insert(record.variant_id.clone(), stock);
        state.variants.insert(record.variant_id.clone(), record);
    }

    /// Seed a customer record.
    pub fn insert_customer(&self, record: CustomerRecord) {
        let mut state = self.state();
        state.customers.insert(record.customer_id.clone(), record);
    }

    /// Current stock level for a variant.
    pub fn stock_level(&self, variant: &VariantId) -> i64 {
        *self.state().stock.get(variant).unwrap_or(&0)
    }

    /// Make the next `commit_completion` fail after its checks, as a crash
    /// between payment confirmation and the commit would.
    pub fn fail_next_commit(&self) {
        self.state().fail_next_commit = true;
    }

    /// Make every `release_one` fail until turned off.
    pub fn fail_releases(&self, fail: bool) {
        self.state().fail_releases = fail;
    }

    /// All recorded discount redemptions.
    pub fn usage_records(&self) -> Vec<DiscountUsageRecord> {
        self.state().usage_records.clone()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn variant(&self, variant: &VariantId) -> Result<Option<VariantRecord>, StorageError> {
        Ok(self.state().variants.get(variant).cloned())
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn customer(
        &self,
        customer: &CustomerId,
    ) -> Result<Option<CustomerRecord>, StorageError> {
        Ok(self.state().customers.get(customer).cloned())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart_items(&self, customer: &CustomerId) -> Result<Vec<CartLineItem>, StorageError> {
        Ok(self
            .state()
            .cart_items
            .get(customer)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_cart_item(&self, item: CartLineItem) -> Result<(), StorageError> {
        let mut state = self.state();
        state
            .cart_items
            .entry(item.customer_id.clone())
            .or_default()
            .push(item);
        Ok(())
    }

    async fn remove_cart_item(
        &self,
        customer: &CustomerId,
        line_item: &LineItemId,
    ) -> Result<Option<CartLineItem>, StorageError> {
        let mut state = self.state();
        let Some(items) = state.cart_items.get_mut(customer) else {
            return Ok(None);
        };
        let position = items.iter().position(|i| &i.id == line_item);
        Ok(position.map(|index| items.remove(index)))
    }

    async fn applied_discount(
        &self,
        customer: &CustomerId,
    ) -> Result<Option<AppliedDiscount>, StorageError> {
        Ok(self.state().applied_discounts.get(customer).cloned())
    }

    async fn set_applied_discount(
        &self,
        customer: &CustomerId,
        discount: Option<AppliedDiscount>,
    ) -> Result<(), StorageError> {
        let mut state = self.state();
        match discount {
            Some(discount) => {
                state.applied_discounts.insert(customer.clone(), discount);
            }
            None => {
                state.applied_discounts.remove(customer);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DiscountStore for MemoryStore {
    async fn discount_by_code(&self, code: &str) -> Result<Option<Discount>, StorageError> {
        Ok(self.state().discounts.get(code).cloned())
    }

    async fn insert_discount(&self, discount: Discount) -> Result<(), StorageError> {
        let mut state = self.state();
        state.discounts.insert(discount.code.clone(), discount);
        Ok(())
    }

    async fn discount_usage_total(&self, discount: &DiscountId) -> Result<i64, StorageError> {
        Ok(self
            .state()
            .usage_records
            .iter()
            .filter(|r| &r.discount_id == discount)
            .count() as i64)
    }

    async fn discount_usage_for_customer(
        &self,
        discount: &DiscountId,
        customer: &CustomerId,
    ) -> Result<i64, StorageError> {
        Ok(self
            .state()
            .usage_records
            .iter()
            .filter(|r| &r.discount_id == discount && &r.customer_id == customer)
            .count() as i64)
    }
}

fn append_credit_locked(
    state: &mut State,
    draft: CreditTransactionDraft,
    floor_cents: Option<i64>,
) -> Result<CreditTransaction, StorageError> {
    let log = state.credits.entry(draft.customer_id.clone()).or_default();
    let current = derive_balance(log, draft.created_at, draft.amount.currency);
    let new_balance = current.balance.cents + draft.amount.cents;
    if let Some(floor) = floor_cents {
        if new_balance < floor {
            return Err(StorageError::BalanceFloor {
                available_cents: current.balance.cents,
            });
        }
    }
    let txn = CreditTransaction {
        id: TransactionId::generate(),
        customer_id: draft.customer_id,
        amount: draft.amount,
        kind: draft.kind,
        description: draft.description,
        actor: draft.actor,
        balance_after: Money::new(new_balance, draft.amount.currency),
        order_id: draft.order_id,
        expires_at: draft.expires_at,
        created_at: draft.created_at,
    };
    log.push(txn.clone());
    Ok(txn)
}

#[async_trait]
impl CreditStore for MemoryStore {
    async fn credit_transactions(
        &self,
        customer: &CustomerId,
    ) -> Result<Vec<CreditTransaction>, StorageError> {
        Ok(self
            .state()
            .credits
            .get(customer)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_credit(
        &self,
        draft: CreditTransactionDraft,
        floor_cents: Option<i64>,
    ) -> Result<CreditTransaction, StorageError> {
        append_credit_locked(&mut self.state(), draft, floor_cents)
    }
}

#[async_trait]
impl WaitlistStore for MemoryStore {
    async fn insert_waitlist(&self, entry: WaitlistEntry) -> Result<(), StorageError> {
        let mut state = self.state();
        state
            .waitlists
            .entry(entry.customer_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn waitlist_for(
        &self,
        customer: &CustomerId,
    ) -> Result<Vec<WaitlistEntry>, StorageError> {
        Ok(self
            .state()
            .waitlists
            .get(customer)
            .cloned()
            .unwrap_or_default())
    }

    async fn remove_waitlist(
        &self,
        customer: &CustomerId,
        entry: &WaitlistId,
    ) -> Result<Option<WaitlistEntry>, StorageError> {
        let mut state = self.state();
        let Some(entries) = state.waitlists.get_mut(customer) else {
            return Ok(None);
        };
        let position = entries.iter().position(|e| &e.id == entry);
        Ok(position.map(|index| entries.remove(index)))
    }
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn insert_checkout(&self, session: CheckoutSession) -> Result<(), StorageError> {
        let mut state = self.state();
        state.checkouts.insert(session.id.clone(), session);
        Ok(())
    }

    async fn checkout_session(
        &self,
        checkout: &CheckoutId,
    ) -> Result<Option<CheckoutSession>, StorageError> {
        Ok(self.state().checkouts.get(checkout).cloned())
    }

    async fn transition_checkout(
        &self,
        checkout: &CheckoutId,
        from: &[CheckoutPhase],
        to: CheckoutPhase,
    ) -> Result<CheckoutSession, StorageError> {
        let mut state = self.state();
        let session = state
            .checkouts
            .get_mut(checkout)
            .ok_or_else(|| StorageError::NotFound(format!("checkout {}", checkout)))?;
        let expected = from
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join("|");
        if !from.contains(&session.phase) || !session.phase.can_transition(to) {
            return Err(StorageError::PhaseConflict {
                expected,
                found: session.phase.as_str().to_string(),
            });
        }
        session.phase = to;
        Ok(session.clone())
    }

    async fn commit_completion(&self, plan: CompletionPlan) -> Result<Order, StorageError> {
        let mut state = self.state();

        if let Some(order_id) = state.orders_by_checkout.get(&plan.session_id) {
            if let Some(existing) = state.orders.get(order_id) {
                return Ok(existing.clone());
            }
        }

        if state.fail_next_commit {
            state.fail_next_commit = false;
            return Err(StorageError::Unavailable("injected commit failure".into()));
        }

        // Checks before writes: the commit is all-or-nothing.
        if let Some(draft) = &plan.credit_spend {
            let log = state.credits.entry(draft.customer_id.clone()).or_default();
            let current = derive_balance(log, draft.created_at, draft.amount.currency);
            if current.balance.cents + draft.amount.cents < 0 {
                return Err(StorageError::BalanceFloor {
                    available_cents: current.balance.cents,
                });
            }
        }

        let customer = plan.order.customer.customer_id.clone();
        let order = plan.order.clone();
        state
            .orders_by_checkout
            .insert(plan.session_id.clone(), order.id.clone());
        state.orders.insert(order.id.clone(), order.clone());

        if let Some(usage) = plan.discount_usage {
            state.usage_records.push(usage);
        }
        if let Some(draft) = plan.credit_spend {
            // Cannot fail: the floor was checked above under this lock.
            append_credit_locked(&mut state, draft, Some(0))?;
        }
        if let Some(items) = state.cart_items.get_mut(&customer) {
            items.retain(|item| !plan.clear_items.contains(&item.id));
        }
        state.applied_discounts.remove(&customer);

        Ok(order)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn order(&self, order: &OrderId) -> Result<Option<Order>, StorageError> {
        Ok(self.state().orders.get(order).cloned())
    }

    async fn order_for_checkout(
        &self,
        checkout: &CheckoutId,
    ) -> Result<Option<Order>, StorageError> {
        let state = self.state();
        Ok(state
            .orders_by_checkout
            .get(checkout)
            .and_then(|id| state.orders.get(id))
            .cloned())
    }

    async fn order_for_payment(&self, intent: &IntentId) -> Result<Option<Order>, StorageError> {
        Ok(self
            .state()
            .orders
            .values()
            .find(|o| o.provider_ref.as_deref() == Some(intent.as_str()))
            .cloned())
    }
}

#[async_trait]
impl InventoryProvider for MemoryStore {
    async fn reserve_one(&self, variant: &VariantId) -> Result<ReserveOutcome, ProviderError> {
        let mut state = self.state();
        let available = state.stock.entry(variant.clone()).or_insert(0);
        if *available > 0 {
            *available -= 1;
            Ok(ReserveOutcome {
                reserved: true,
                available_after: *available,
            })
        } else {
            Ok(ReserveOutcome {
                reserved: false,
                available_after: *available,
            })
        }
    }

    async fn release_one(&self, variant: &VariantId) -> Result<i64, ProviderError> {
        let mut state = self.state();
        if state.fail_releases {
            return Err(ProviderError::Unavailable("release failure injected".into()));
        }
        let available = state.stock.entry(variant.clone()).or_insert(0);
        *available += 1;
        Ok(*available)
    }

    async fn available(&self, variant: &VariantId) -> Result<i64, ProviderError> {
        Ok(*self.state().stock.get(variant).unwrap_or(&0))
    }
}
