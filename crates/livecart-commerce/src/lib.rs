//! Cart, checkout, credit and discount engine for LiveCart.
//!
//! This crate is the reconciliation core of a live-selling commerce
//! backend: it computes one consistent order total across discounts, store
//! credit, tax and shipping, reserves inventory a unit at a time with a
//! waitlist fallback, and coordinates with an intent-confirm payment
//! provider without double-charging, double-counting discount usage, or
//! overselling.
//!
//! - **Discounts** ([`discount`]): code validation with effective-status
//!   precedence and usage caps; usage is recorded only at order completion.
//! - **Credits** ([`credit`]): an append-only ledger with atomic spends and
//!   a cached, expiry-aware balance.
//! - **Cart** ([`cart`]): quantity-1 line items, live pricing, waitlist
//!   fallback when stock runs out.
//! - **Checkout** ([`checkout`]): two-phase prepare/complete over a stored
//!   session; completion is idempotent and commits order, discount usage,
//!   credit spend and cart clear as one unit.
//!
//! Collaborators (inventory, payments, events, persistence) sit behind
//! traits in [`providers`], [`storage`] and the `livecart-events` crate;
//! the in-memory [`storage::MemoryStore`] is the reference backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use livecart_commerce::prelude::*;
//!
//! let added = cart.add_item(&customer, &variant).await?;
//! cart.apply_discount(&customer, "SAVE10").await?;
//!
//! let prepared = checkout.prepare(&customer, Some(credits)).await?;
//! // client confirms the intent with the payment SDK, then:
//! let order = checkout
//!     .complete(&prepared.session.id, PaymentConfirmation::Paid { intent })
//!     .await?;
//! ```

pub mod cart;
pub mod checkout;
pub mod config;
pub mod credit;
pub mod discount;
pub mod error;
pub mod ids;
pub mod money;
pub mod providers;
pub mod storage;
pub mod testing;
pub mod waitlist;

pub use config::CheckoutConfig;
pub use error::{CommerceError, ErrorKind};
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::CheckoutConfig;
    pub use crate::error::{CommerceError, ErrorKind};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Cart
    pub use crate::cart::{
        ApplyDiscountOutcome, CartAddOutcome, CartLineItem, CartService, CartView,
        PricingBreakdown, VariantAttributes,
    };

    // Discounts
    pub use crate::discount::{
        AppliedDiscount, Discount, DiscountEvaluator, DiscountKind, DiscountRejection,
        DiscountStatus, ValidationOutcome,
    };

    // Credits
    pub use crate::credit::{
        CreditActor, CreditBalance, CreditKind, CreditLedger, CreditTransaction,
    };

    // Checkout
    pub use crate::checkout::{
        CheckoutOrchestrator, CheckoutPhase, CheckoutSession, CustomerSnapshot, Order,
        OrderLineItem, OrderStatus, PaymentConfirmation, PaymentMethod, PreparedCheckout,
    };

    // Collaborators
    pub use crate::providers::{
        IntentMetadata, IntentStatus, InventoryProvider, PaymentIntent, PaymentProvider,
        ProviderError, ReserveOutcome,
    };
    pub use crate::storage::{MemoryStore, Store, StorageError};
    pub use crate::waitlist::{WaitlistEntry, WaitlistReason};
}
