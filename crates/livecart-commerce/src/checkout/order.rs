//! Order types.

use crate::cart::{CartLineItem, PricingBreakdown, VariantAttributes};
use crate::ids::{CustomerId, DiscountId, LineItemId, OrderId, ProductId, VariantId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Created, payment settlement still in flight.
    #[default]
    Processing,
    /// Payment settled (or the order was fully covered by credits).
    Paid,
    /// Payment definitively failed.
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
        }
    }
}

/// How the order was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Card payment through the provider.
    Card,
    /// Fully covered by store credit; no provider involved.
    StoreCredit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::StoreCredit => "store_credit",
        }
    }
}

/// Customer identity frozen at checkout time.
///
/// Orders must read the same forever, so this never follows later edits to
/// the customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
}

/// One purchased unit, frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    /// Cart line this unit came from.
    pub line_item_id: LineItemId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub unit_price: Money,
    pub attributes: VariantAttributes,
}

impl From<&CartLineItem> for OrderLineItem {
    fn from(item: &CartLineItem) -> Self {
        Self {
            line_item_id: item.id.clone(),
            product_id: item.product_id.clone(),
            variant_id: item.variant_id.clone(),
            unit_price: item.unit_price,
            attributes: item.attributes.clone(),
        }
    }
}

/// A durable order, created exactly once per completed checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: CustomerSnapshot,
    pub items: Vec<OrderLineItem>,
    pub payment_method: PaymentMethod,
    /// Payment-provider intent reference; `None` for credits-only orders.
    pub provider_ref: Option<String>,
    pub pricing: PricingBreakdown,
    pub status: OrderStatus,
    pub created_at: i64,
}

impl Order {
    /// Number of units in the order.
    pub fn unit_count(&self) -> usize {
        self.items.len()
    }
}

/// One redemption of a discount by a customer, written at order-completion
/// time. Apply-time validation reads these, so an in-flight cart never
/// burns a usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountUsageRecord {
    pub discount_id: DiscountId,
    pub customer_id: CustomerId,
    pub order_id: OrderId,
    pub used_at: i64,
}
