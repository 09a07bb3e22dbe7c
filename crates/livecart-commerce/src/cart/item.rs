//! Cart line items.

use crate::ids::{CustomerId, LineItemId, ProductId, VariantId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Display attributes of a variant, snapshotted at add time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VariantAttributes {
    pub size: Option<String>,
    pub color: Option<String>,
}

impl VariantAttributes {
    pub fn new(size: Option<&str>, color: Option<&str>) -> Self {
        Self {
            size: size.map(str::to_string),
            color: color.map(str::to_string),
        }
    }
}

/// One reserved unit of a variant in a customer's cart.
///
/// Quantity is always exactly one: N units of the same variant are N line
/// items, each carrying its own reservation, so inventory bookkeeping stays
/// one row to one unit. Price and attributes are captured at add time and
/// do not follow later catalog edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: LineItemId,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    /// Unit price at the moment the item was added.
    pub unit_price: Money,
    /// Size/color snapshot at the moment the item was added.
    pub attributes: VariantAttributes,
    pub added_at: i64,
}

impl CartLineItem {
    pub fn new(
        customer_id: CustomerId,
        product_id: ProductId,
        variant_id: VariantId,
        unit_price: Money,
        attributes: VariantAttributes,
        added_at: i64,
    ) -> Self {
        Self {
            id: LineItemId::generate(),
            customer_id,
            product_id,
            variant_id,
            unit_price,
            attributes,
            added_at,
        }
    }
}
