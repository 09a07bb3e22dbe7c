//! Checkout module.
//!
//! Two-phase checkout: sessions and their phase machine, order types, and
//! the orchestrator that drives prepare/complete.

mod order;
mod orchestrator;
mod session;

pub use order::{
    CustomerSnapshot, DiscountUsageRecord, Order, OrderLineItem, OrderStatus, PaymentMethod,
};
pub use orchestrator::CheckoutOrchestrator;
pub use session::{CheckoutPhase, CheckoutSession, PaymentConfirmation, PreparedCheckout};
