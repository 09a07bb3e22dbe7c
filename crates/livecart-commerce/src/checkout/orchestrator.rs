//! Checkout orchestration.
//!
//! Two phases. `prepare` turns the server-side cart into a checkout
//! session and (unless credits cover everything) a payment intent.
//! `complete` re-verifies payment with the provider and runs the single
//! committing transaction: order + discount usage + credit spend + cart
//! clear. Completion is idempotent per session, so a retry after a
//! post-payment failure cannot double-charge credits or duplicate orders.

use crate::cart::CartService;
use crate::checkout::order::{
    CustomerSnapshot, DiscountUsageRecord, Order, OrderLineItem, OrderStatus, PaymentMethod,
};
use crate::checkout::session::{
    CheckoutPhase, CheckoutSession, PaymentConfirmation, PreparedCheckout,
};
use crate::config::CheckoutConfig;
use crate::credit::{CreditActor, CreditKind, CreditLedger};
use crate::error::CommerceError;
use crate::ids::{CheckoutId, CustomerId, OrderId, TenantId};
use crate::money::Money;
use crate::providers::{IntentMetadata, IntentStatus, PaymentProvider, ProviderError};
use crate::storage::{
    CheckoutStore, CompletionPlan, CreditTransactionDraft, CustomerStore, OrderStore, Store,
    StorageError,
};
use livecart_cache::SharedClock;
use livecart_events::{Event, Outbox};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;

/// Drives the two-phase checkout protocol.
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    store: Arc<dyn Store>,
    payments: Arc<dyn PaymentProvider>,
    cart: CartService,
    ledger: CreditLedger,
    outbox: Arc<Outbox>,
    config: CheckoutConfig,
    clock: SharedClock,
    tenant: TenantId,
}

impl CheckoutOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        payments: Arc<dyn PaymentProvider>,
        cart: CartService,
        ledger: CreditLedger,
        outbox: Arc<Outbox>,
        config: CheckoutConfig,
        clock: SharedClock,
        tenant: TenantId,
    ) -> Self {
        Self {
            store,
            payments,
            cart,
            ledger,
            outbox,
            config,
            clock,
            tenant,
        }
    }

    /// Bound a provider call so a stuck provider cannot wedge checkout.
    async fn bounded<T>(
        &self,
        what: &'static str,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        match tokio::time::timeout(self.config.provider_timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Unavailable(format!("{what} timed out"))),
        }
    }

    /// Phase 1: validate the cart server-side and stage a session.
    ///
    /// `credits_requested` caps the store credit to apply; `None` applies
    /// as much of the balance as the total allows. When credits cover the
    /// entire total no payment intent is created at all. A discount that
    /// stopped qualifying aborts preparation before any intent exists;
    /// the cart has already dropped it, so a retry prices cleanly.
    pub async fn prepare(
        &self,
        customer: &CustomerId,
        credits_requested: Option<Money>,
    ) -> Result<PreparedCheckout, CommerceError> {
        let record = self
            .store
            .customer(customer)
            .await?
            .ok_or_else(|| CommerceError::CustomerNotFound(customer.clone()))?;

        let requested = match credits_requested {
            Some(amount) => amount,
            None => self.ledger.balance(customer).await?.balance,
        };

        let view = self.cart.view(customer, Some(requested)).await?;
        if view.items.is_empty() {
            return Err(CommerceError::EmptyCart);
        }
        if let Some(reason) = view.dropped_discount {
            return Err(CommerceError::DiscountRejected(reason));
        }

        let now = self.clock.now();
        let mut session = CheckoutSession {
            id: CheckoutId::generate(),
            customer_id: customer.clone(),
            phase: CheckoutPhase::Preparing,
            items: view.items.iter().map(OrderLineItem::from).collect(),
            customer: CustomerSnapshot {
                customer_id: record.customer_id.clone(),
                name: record.name.clone(),
                email: record.email.clone(),
            },
            discount: view.applied_discount.clone(),
            pricing: view.pricing,
            credits_only: view.pricing.total.is_zero(),
            intent_id: None,
            created_at: now,
            expires_at: now + self.config.checkout_ttl_secs,
        };

        let client_secret = if session.credits_only {
            None
        } else {
            let provider_customer = self
                .bounded(
                    "ensure_customer",
                    self.payments
                        .ensure_customer(customer, &record.name, &record.email),
                )
                .await?;
            let metadata = IntentMetadata {
                customer_id: customer.clone(),
                provider_customer,
                item_count: session.items.len(),
                discount_code: session.discount.as_ref().map(|d| d.code.clone()),
                credits_applied_cents: session.pricing.credits_applied.cents,
            };
            let intent = self
                .bounded(
                    "create_intent",
                    self.payments.create_intent(session.pricing.total, metadata),
                )
                .await?;
            session.intent_id = Some(intent.id);
            Some(intent.client_secret)
        };

        // Nothing is persisted until the intent exists: an abandoned
        // prepare leaves no server state behind.
        session.phase = CheckoutPhase::AwaitingPayment;
        self.store.insert_checkout(session.clone()).await?;

        tracing::info!(
            checkout = %session.id,
            customer = %customer,
            total = %session.pricing.total,
            credits_only = session.credits_only,
            "checkout prepared"
        );

        Ok(PreparedCheckout {
            session,
            client_secret,
        })
    }

    /// Phase 2: verify payment and run the committing transaction.
    ///
    /// Safe to retry: a session that already produced an order returns that
    /// order. An expired session is never completed on the caller's word:
    /// credits-only expiries are rejected, and card payments only proceed
    /// if the provider still reports the intent settled.
    pub async fn complete(
        &self,
        checkout: &CheckoutId,
        confirmation: PaymentConfirmation,
    ) -> Result<Order, CommerceError> {
        if let Some(existing) = self.store.order_for_checkout(checkout).await? {
            return Ok(existing);
        }

        let session = self
            .store
            .checkout_session(checkout)
            .await?
            .ok_or_else(|| CommerceError::CheckoutNotFound(checkout.clone()))?;

        let now = self.clock.now();
        let expired = session.is_expired(now);

        match &confirmation {
            PaymentConfirmation::CreditsOnly => {
                if !session.credits_only {
                    return Err(CommerceError::Validation(
                        "checkout has a residual total; credits-only completion rejected".into(),
                    ));
                }
                if expired {
                    return Err(CommerceError::CheckoutExpired(checkout.clone()));
                }
            }
            PaymentConfirmation::Paid { intent } => {
                if session.credits_only {
                    return Err(CommerceError::Validation(
                        "credits-only checkout has no payment to confirm".into(),
                    ));
                }
                let expected = session.intent_id.clone().ok_or_else(|| {
                    CommerceError::Validation("checkout has no payment intent".into())
                })?;
                if *intent != expected {
                    return Err(CommerceError::Validation(
                        "payment intent does not belong to this checkout".into(),
                    ));
                }

                let status = match tokio::time::timeout(
                    self.config.provider_timeout(),
                    self.payments.verify_intent(intent),
                )
                .await
                {
                    Ok(result) => result?,
                    Err(_) => {
                        return Err(CommerceError::PaymentVerificationPending(intent.clone()))
                    }
                };

                if status != IntentStatus::Succeeded {
                    if expired {
                        return Err(CommerceError::CheckoutExpired(checkout.clone()));
                    }
                    return Err(CommerceError::PaymentNotVerified {
                        intent: intent.clone(),
                        status,
                    });
                }
                if expired {
                    // Money moved before the window closed; refusing now
                    // would strand a settled payment.
                    tracing::warn!(
                        checkout = %checkout,
                        intent = %intent,
                        "completing expired checkout with settled payment"
                    );
                }
            }
        }

        // Serialize concurrent completions through the phase row.
        if let Err(err) = self
            .store
            .transition_checkout(
                checkout,
                &[CheckoutPhase::AwaitingPayment, CheckoutPhase::Failed],
                CheckoutPhase::Completing,
            )
            .await
        {
            // The race loser may find the winner's order already committed.
            if let Some(existing) = self.store.order_for_checkout(checkout).await? {
                return Ok(existing);
            }
            return Err(err.into());
        }

        let order_id = OrderId::generate();
        let provider_ref = session.intent_id.as_ref().map(|i| i.as_str().to_string());
        let order = Order {
            id: order_id.clone(),
            customer: session.customer.clone(),
            items: session.items.clone(),
            payment_method: if session.credits_only {
                PaymentMethod::StoreCredit
            } else {
                PaymentMethod::Card
            },
            provider_ref: provider_ref.clone(),
            pricing: session.pricing,
            status: OrderStatus::Paid,
            created_at: now,
        };
        let discount_usage = session.discount.as_ref().map(|d| DiscountUsageRecord {
            discount_id: d.discount_id.clone(),
            customer_id: session.customer_id.clone(),
            order_id: order_id.clone(),
            used_at: now,
        });
        let credit_spend = if session.pricing.credits_applied.is_positive() {
            Some(CreditTransactionDraft {
                customer_id: session.customer_id.clone(),
                amount: session.pricing.credits_applied.negated(),
                kind: CreditKind::Spend,
                description: format!("applied to order {}", order_id),
                actor: CreditActor::System,
                order_id: Some(order_id.clone()),
                expires_at: None,
                created_at: now,
            })
        } else {
            None
        };
        let plan = CompletionPlan {
            session_id: checkout.clone(),
            order,
            discount_usage,
            credit_spend,
            clear_items: session.items.iter().map(|i| i.line_item_id.clone()).collect(),
        };

        match self.store.commit_completion(plan).await {
            Ok(order) => {
                self.finish_phase(checkout, CheckoutPhase::Completed).await;
                self.ledger.invalidate(&session.customer_id);
                self.outbox.enqueue(Event::new(
                    self.tenant.as_str(),
                    "order.completed",
                    json!({
                        "order_id": order.id.as_str(),
                        "customer_id": session.customer_id.as_str(),
                        "total_cents": order.pricing.total.cents,
                        "payment_method": order.payment_method.as_str(),
                    }),
                    now,
                ));
                tracing::info!(
                    order = %order.id,
                    checkout = %checkout,
                    total = %order.pricing.total,
                    "order completed"
                );
                Ok(order)
            }
            Err(err) => {
                self.finish_phase(checkout, CheckoutPhase::Failed).await;
                if session.credits_only {
                    if let StorageError::BalanceFloor { available_cents } = err {
                        return Err(CommerceError::InsufficientBalance {
                            requested: session.pricing.credits_applied,
                            available: Money::new(available_cents, self.config.currency),
                        });
                    }
                    return Err(err.into());
                }
                // Payment is settled; this is the reconciliation case and
                // must never be reported as a payment failure.
                let payment_ref = provider_ref.unwrap_or_else(|| checkout.as_str().to_string());
                tracing::error!(
                    checkout = %checkout,
                    payment_ref = %payment_ref,
                    error = %err,
                    "post-payment commit failure, manual reconciliation or retry required"
                );
                Err(CommerceError::PostPaymentCommit {
                    payment_ref,
                    source: err,
                })
            }
        }
    }

    /// Best-effort terminal phase write after the commit outcome is known.
    async fn finish_phase(&self, checkout: &CheckoutId, to: CheckoutPhase) {
        if let Err(err) = self
            .store
            .transition_checkout(checkout, &[CheckoutPhase::Completing], to)
            .await
        {
            tracing::warn!(
                checkout = %checkout,
                phase = %to,
                error = %err,
                "failed to record checkout phase"
            );
        }
    }
}
