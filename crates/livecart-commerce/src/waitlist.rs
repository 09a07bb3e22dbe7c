//! Waitlist entries.
//!
//! A cart add against exhausted stock converts into a waitlist signal
//! instead of a rejection; these are the records that conversion produces.

use crate::ids::{CustomerId, ProductId, VariantId, WaitlistId};
use serde::{Deserialize, Serialize};

/// Why the customer landed on the waitlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitlistReason {
    /// No stock at the moment of the add.
    OutOfStock,
    /// Stock existed but another add won the reservation race.
    LostReservationRace,
}

/// One customer waiting on one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: WaitlistId,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub reason: WaitlistReason,
    pub created_at: i64,
}

impl WaitlistEntry {
    pub fn new(
        customer_id: CustomerId,
        product_id: ProductId,
        variant_id: VariantId,
        reason: WaitlistReason,
        created_at: i64,
    ) -> Self {
        Self {
            id: WaitlistId::generate(),
            customer_id,
            product_id,
            variant_id,
            reason,
            created_at,
        }
    }
}
