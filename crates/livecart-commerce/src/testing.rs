//! Test support: a fake payment provider and a wired-up harness.
//!
//! Kept in the library (not `#[cfg(test)]`) so integration suites and demos
//! can drive the full engine against the in-memory store.

use crate::cart::{CartService, VariantAttributes};
use crate::checkout::CheckoutOrchestrator;
use crate::config::CheckoutConfig;
use crate::credit::CreditLedger;
use crate::discount::DiscountEvaluator;
use crate::ids::{CustomerId, IntentId, ProductId, TenantId, VariantId};
use crate::money::Money;
use crate::providers::{
    IntentMetadata, IntentStatus, InventoryProvider, PaymentIntent, PaymentProvider, ProviderError,
};
use crate::storage::{CustomerRecord, MemoryStore, Store, VariantRecord};
use async_trait::async_trait;
use livecart_cache::{Clock, ManualClock, SharedClock};
use livecart_events::Outbox;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// An intent as the fake provider recorded it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedIntent {
    pub amount: Money,
    pub metadata: IntentMetadata,
    pub status: IntentStatus,
}

#[derive(Default)]
struct FakeState {
    intents: HashMap<String, RecordedIntent>,
    verify_delay: Option<Duration>,
}

/// In-memory payment provider.
///
/// Intents start at `RequiresPayment`; tests flip them with
/// [`FakePaymentProvider::mark_succeeded`] to simulate the customer paying.
#[derive(Default)]
pub struct FakePaymentProvider {
    state: Mutex<FakeState>,
}

impl FakePaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Number of intents created so far.
    pub fn created_count(&self) -> usize {
        self.state().intents.len()
    }

    /// Inspect a recorded intent.
    pub fn intent(&self, intent: &IntentId) -> Option<RecordedIntent> {
        self.state().intents.get(intent.as_str()).cloned()
    }

    /// Set an intent's status directly.
    pub fn set_status(&self, intent: &IntentId, status: IntentStatus) {
        if let Some(recorded) = self.state().intents.get_mut(intent.as_str()) {
            recorded.status = status;
        }
    }

    /// Simulate the customer completing payment.
    pub fn mark_succeeded(&self, intent: &IntentId) {
        self.set_status(intent, IntentStatus::Succeeded);
    }

    /// Delay every `verify_intent` call, for exercising the timeout bound.
    pub fn set_verify_delay(&self, delay: Duration) {
        self.state().verify_delay = Some(delay);
    }
}

#[async_trait]
impl PaymentProvider for FakePaymentProvider {
    async fn ensure_customer(
        &self,
        customer: &CustomerId,
        _name: &str,
        _email: &str,
    ) -> Result<String, ProviderError> {
        Ok(format!("cus_{}", customer.as_str()))
    }

    async fn create_intent(
        &self,
        amount: Money,
        metadata: IntentMetadata,
    ) -> Result<PaymentIntent, ProviderError> {
        if !amount.is_positive() {
            return Err(ProviderError::Rejected(format!(
                "intent amount must be positive, got {}",
                amount
            )));
        }
        let id = IntentId::generate();
        let secret = format!("{}_secret", id.as_str());
        self.state().intents.insert(
            id.as_str().to_string(),
            RecordedIntent {
                amount,
                metadata,
                status: IntentStatus::RequiresPayment,
            },
        );
        Ok(PaymentIntent {
            id,
            client_secret: secret,
        })
    }

    async fn verify_intent(&self, intent: &IntentId) -> Result<IntentStatus, ProviderError> {
        let delay = self.state().verify_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state()
            .intents
            .get(intent.as_str())
            .map(|recorded| recorded.status)
            .ok_or_else(|| ProviderError::Rejected(format!("unknown intent {}", intent)))
    }
}

/// The whole engine wired against the in-memory store and fake provider.
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub payments: Arc<FakePaymentProvider>,
    pub clock: Arc<ManualClock>,
    pub outbox: Arc<Outbox>,
    pub config: CheckoutConfig,
    pub evaluator: DiscountEvaluator,
    pub ledger: CreditLedger,
    pub cart: CartService,
    pub checkout: CheckoutOrchestrator,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(CheckoutConfig::default())
    }

    pub fn with_config(config: CheckoutConfig) -> Self {
        let clock = Arc::new(ManualClock::at(1_700_000_000));
        let shared_clock: SharedClock = clock.clone();
        let store = Arc::new(MemoryStore::new());
        let store_dyn: Arc<dyn Store> = store.clone();
        let inventory: Arc<dyn InventoryProvider> = store.clone();
        let payments = Arc::new(FakePaymentProvider::new());
        let outbox = Arc::new(Outbox::new());
        let tenant = TenantId::new("tenant_demo");

        let evaluator = DiscountEvaluator::new(store_dyn.clone(), shared_clock.clone());
        let ledger = CreditLedger::new(store_dyn.clone(), shared_clock.clone(), &config);
        let cart = CartService::new(
            store_dyn.clone(),
            inventory,
            evaluator.clone(),
            ledger.clone(),
            outbox.clone(),
            config.clone(),
            shared_clock.clone(),
            tenant.clone(),
        );
        let payments_dyn: Arc<dyn PaymentProvider> = payments.clone();
        let checkout = CheckoutOrchestrator::new(
            store_dyn,
            payments_dyn,
            cart.clone(),
            ledger.clone(),
            outbox.clone(),
            config.clone(),
            shared_clock,
            tenant,
        );

        Self {
            store,
            payments,
            clock,
            outbox,
            config,
            evaluator,
            ledger,
            cart,
            checkout,
        }
    }

    /// Seed a variant priced in the configured currency.
    pub fn seed_variant(&self, id: &str, price_cents: i64, stock: i64) -> VariantId {
        let variant_id = VariantId::new(id);
        self.store.insert_variant(
            VariantRecord {
                variant_id: variant_id.clone(),
                product_id: ProductId::new(format!("prod_{id}")),
                price: Money::new(price_cents, self.config.currency),
                attributes: VariantAttributes::new(Some("M"), Some("black")),
            },
            stock,
        );
        variant_id
    }

    /// Seed a customer record.
    pub fn seed_customer(&self, id: &str) -> CustomerId {
        let customer_id = CustomerId::new(id);
        self.store.insert_customer(CustomerRecord {
            customer_id: customer_id.clone(),
            name: format!("Customer {id}"),
            email: format!("{id}@example.com"),
        });
        customer_id
    }

    /// Money in the configured currency.
    pub fn money(&self, cents: i64) -> Money {
        Money::new(cents, self.config.currency)
    }

    /// The harness clock's current timestamp.
    pub fn now(&self) -> i64 {
        self.clock.now()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
