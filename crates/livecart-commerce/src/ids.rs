//! Newtype IDs for type-safe identifiers.
//!
//! Every entity gets its own id newtype so a `CustomerId` can never be
//! handed to something expecting a `VariantId`. Ids are opaque strings;
//! generated ones are UUIDv4 with a short entity prefix, which keeps them
//! greppable in logs and payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        /// A unique identifier.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing id string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh id.
            pub fn generate() -> Self {
                Self(format!("{}_{}", $prefix, uuid::Uuid::new_v4()))
            }

            /// Get the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(TenantId, "ten");
define_id!(CustomerId, "cust");
define_id!(ProductId, "prod");
define_id!(VariantId, "var");
define_id!(LineItemId, "li");
define_id!(DiscountId, "disc");
define_id!(OrderId, "ord");
define_id!(CheckoutId, "chk");
define_id!(IntentId, "pi");
define_id!(TransactionId, "ctx");
define_id!(WaitlistId, "wl");
define_id!(ActorId, "act");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        let id = CustomerId::new("cust_123");
        assert_eq!(id.as_str(), "cust_123");
    }

    #[test]
    fn test_generated_ids_are_prefixed_and_unique() {
        let a = OrderId::generate();
        let b = OrderId::generate();
        assert!(a.as_str().starts_with("ord_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_display_and_conversion() {
        let id: VariantId = "var_9".into();
        assert_eq!(format!("{}", id), "var_9");
        assert_eq!(id.clone().into_inner(), "var_9");
    }
}
