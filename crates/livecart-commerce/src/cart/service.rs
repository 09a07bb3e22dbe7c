//! Cart operations.

use crate::cart::item::CartLineItem;
use crate::cart::pricing::PricingBreakdown;
use crate::config::CheckoutConfig;
use crate::credit::CreditLedger;
use crate::discount::{
    AppliedDiscount, DiscountEvaluator, DiscountRejection, ValidationOutcome,
};
use crate::error::CommerceError;
use crate::ids::{CustomerId, LineItemId, ProductId, TenantId, VariantId};
use crate::money::Money;
use crate::providers::InventoryProvider;
use crate::storage::{CartStore, CatalogStore, Store, WaitlistStore};
use crate::waitlist::{WaitlistEntry, WaitlistReason};
use livecart_cache::SharedClock;
use livecart_events::{Event, Outbox};
use serde_json::json;
use std::sync::Arc;

/// A customer's cart as the client should render it.
///
/// Every cart operation, including failed ones, hands back one of these,
/// so the caller never has to guess whether server state moved.
#[derive(Debug, Clone, PartialEq)]
pub struct CartView {
    pub items: Vec<CartLineItem>,
    pub pricing: PricingBreakdown,
    pub applied_discount: Option<AppliedDiscount>,
    /// Set when a previously applied discount stopped qualifying and was
    /// removed during this pricing pass.
    pub dropped_discount: Option<DiscountRejection>,
}

/// Result of an add-to-cart attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CartAddOutcome {
    /// A unit was reserved and the line item created.
    Added { item: CartLineItem, cart: CartView },
    /// Stock was exhausted (or the reservation race lost); the customer is
    /// waitlisted instead.
    Waitlisted { entry: WaitlistEntry, cart: CartView },
}

impl CartAddOutcome {
    /// The refreshed cart regardless of which way the add went.
    pub fn cart(&self) -> &CartView {
        match self {
            CartAddOutcome::Added { cart, .. } => cart,
            CartAddOutcome::Waitlisted { cart, .. } => cart,
        }
    }
}

/// Result of applying a discount code.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyDiscountOutcome {
    pub cart: CartView,
    /// `None` when the code was accepted and stored.
    pub rejection: Option<DiscountRejection>,
}

/// Cart mutations and pricing.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
    inventory: Arc<dyn InventoryProvider>,
    evaluator: DiscountEvaluator,
    ledger: CreditLedger,
    outbox: Arc<Outbox>,
    config: CheckoutConfig,
    clock: SharedClock,
    tenant: TenantId,
}

impl CartService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        inventory: Arc<dyn InventoryProvider>,
        evaluator: DiscountEvaluator,
        ledger: CreditLedger,
        outbox: Arc<Outbox>,
        config: CheckoutConfig,
        clock: SharedClock,
        tenant: TenantId,
    ) -> Self {
        Self {
            store,
            inventory,
            evaluator,
            ledger,
            outbox,
            config,
            clock,
            tenant,
        }
    }

    fn emit(&self, name: &str, payload: serde_json::Value) {
        self.outbox.enqueue(Event::new(
            self.tenant.as_str(),
            name,
            payload,
            self.clock.now(),
        ));
    }

    /// Add one unit of `variant` to the customer's cart.
    ///
    /// A depleted variant, whether it was already at zero or another
    /// request won the last unit mid-flight, waitlists the customer
    /// instead of failing.
    pub async fn add_item(
        &self,
        customer: &CustomerId,
        variant: &VariantId,
    ) -> Result<CartAddOutcome, CommerceError> {
        let record = self
            .store
            .variant(variant)
            .await?
            .ok_or_else(|| CommerceError::VariantNotFound(variant.clone()))?;

        let available = self.inventory.available(variant).await?;
        if available <= 0 {
            return self
                .waitlist(customer, &record.product_id, variant, WaitlistReason::OutOfStock)
                .await;
        }

        let outcome = self.inventory.reserve_one(variant).await?;
        if !outcome.reserved {
            return self
                .waitlist(
                    customer,
                    &record.product_id,
                    variant,
                    WaitlistReason::LostReservationRace,
                )
                .await;
        }

        let item = CartLineItem::new(
            customer.clone(),
            record.product_id.clone(),
            variant.clone(),
            record.price,
            record.attributes.clone(),
            self.clock.now(),
        );
        if let Err(err) = self.store.insert_cart_item(item.clone()).await {
            // The reservation must not leak when the row write fails.
            if let Err(release_err) = self.inventory.release_one(variant).await {
                tracing::warn!(
                    variant = %variant,
                    error = %release_err,
                    "failed to release reservation after cart insert failure"
                );
                self.emit("inventory.reconcile", json!({ "variant_id": variant.as_str() }));
            }
            return Err(err.into());
        }

        self.emit(
            "cart.item_added",
            json!({
                "customer_id": customer.as_str(),
                "variant_id": variant.as_str(),
                "line_item_id": item.id.as_str(),
            }),
        );

        let cart = self.view(customer, None).await?;
        Ok(CartAddOutcome::Added { item, cart })
    }

    async fn waitlist(
        &self,
        customer: &CustomerId,
        product: &ProductId,
        variant: &VariantId,
        reason: WaitlistReason,
    ) -> Result<CartAddOutcome, CommerceError> {
        let entry = WaitlistEntry::new(
            customer.clone(),
            product.clone(),
            variant.clone(),
            reason,
            self.clock.now(),
        );
        self.store.insert_waitlist(entry.clone()).await?;
        self.emit(
            "waitlist.added",
            json!({
                "customer_id": customer.as_str(),
                "variant_id": variant.as_str(),
                "waitlist_id": entry.id.as_str(),
            }),
        );
        let cart = self.view(customer, None).await?;
        Ok(CartAddOutcome::Waitlisted { entry, cart })
    }

    /// Remove a line item and return its reserved unit to inventory.
    ///
    /// The removal itself always wins: a failed inventory release is logged
    /// and queued for reconciliation rather than blocking the customer.
    pub async fn remove_item(
        &self,
        customer: &CustomerId,
        line_item: &LineItemId,
    ) -> Result<CartView, CommerceError> {
        let removed = self
            .store
            .remove_cart_item(customer, line_item)
            .await?
            .ok_or_else(|| CommerceError::CartItemNotFound(line_item.clone()))?;

        if let Err(err) = self.inventory.release_one(&removed.variant_id).await {
            tracing::warn!(
                variant = %removed.variant_id,
                error = %err,
                "inventory release failed on removal, queueing reconciliation"
            );
            self.emit(
                "inventory.reconcile",
                json!({ "variant_id": removed.variant_id.as_str() }),
            );
        }

        self.emit(
            "cart.item_removed",
            json!({
                "customer_id": customer.as_str(),
                "variant_id": removed.variant_id.as_str(),
                "line_item_id": removed.id.as_str(),
            }),
        );

        self.view(customer, None).await
    }

    /// Apply a discount code; a rejection leaves cart state untouched.
    pub async fn apply_discount(
        &self,
        customer: &CustomerId,
        code: &str,
    ) -> Result<ApplyDiscountOutcome, CommerceError> {
        let items = self.store.cart_items(customer).await?;
        let subtotal = Money::try_sum(items.iter().map(|i| &i.unit_price), self.config.currency)
            .ok_or(CommerceError::Overflow)?;

        match self.evaluator.validate(code, subtotal, customer).await? {
            ValidationOutcome::Valid { discount, amount } => {
                let applied = AppliedDiscount::from_discount(&discount, amount);
                self.store
                    .set_applied_discount(customer, Some(applied))
                    .await?;
                Ok(ApplyDiscountOutcome {
                    cart: self.view(customer, None).await?,
                    rejection: None,
                })
            }
            ValidationOutcome::Rejected(rejection) => Ok(ApplyDiscountOutcome {
                cart: self.view(customer, None).await?,
                rejection: Some(rejection),
            }),
        }
    }

    /// Remove any applied discount.
    pub async fn remove_discount(&self, customer: &CustomerId) -> Result<CartView, CommerceError> {
        self.store.set_applied_discount(customer, None).await?;
        self.view(customer, None).await
    }

    /// Current cart with freshly computed pricing.
    ///
    /// `credits_requested` caps the store credit the customer wants to put
    /// toward this cart; `None` prices without credits. Any applied
    /// discount is re-validated here and dropped, with the reason surfaced,
    /// the moment it stops qualifying.
    pub async fn view(
        &self,
        customer: &CustomerId,
        credits_requested: Option<Money>,
    ) -> Result<CartView, CommerceError> {
        let items = self.store.cart_items(customer).await?;
        let subtotal = Money::try_sum(items.iter().map(|i| &i.unit_price), self.config.currency)
            .ok_or(CommerceError::Overflow)?;

        let mut applied = self.store.applied_discount(customer).await?;
        let mut dropped = None;
        let mut discount_amount = Money::zero(self.config.currency);

        if let Some(current) = applied.clone() {
            match self
                .evaluator
                .validate(&current.code, subtotal, customer)
                .await?
            {
                ValidationOutcome::Valid { discount, amount } => {
                    discount_amount = amount;
                    if amount != current.amount {
                        // Keep the cached amount in step with the live subtotal.
                        let refreshed = AppliedDiscount::from_discount(&discount, amount);
                        self.store
                            .set_applied_discount(customer, Some(refreshed.clone()))
                            .await?;
                        applied = Some(refreshed);
                    }
                }
                ValidationOutcome::Rejected(rejection) => {
                    tracing::debug!(
                        customer = %customer,
                        code = %current.code,
                        reason = rejection.reason_code(),
                        "applied discount no longer qualifies, dropping"
                    );
                    self.store.set_applied_discount(customer, None).await?;
                    applied = None;
                    dropped = Some(rejection);
                }
            }
        }

        let pricing = if items.is_empty() {
            PricingBreakdown::empty(&self.config)
        } else {
            let balance = self.ledger.balance(customer).await?.balance;
            let requested = credits_requested.unwrap_or_else(|| Money::zero(self.config.currency));
            PricingBreakdown::compute(subtotal, discount_amount, requested, balance, &self.config)?
        };

        Ok(CartView {
            items,
            pricing,
            applied_discount: applied,
            dropped_discount: dropped,
        })
    }
}
