//! Clock and TTL caching utilities for LiveCart.
//!
//! Low-churn configuration and derived aggregates (credit balances, feature
//! flags) are cached here instead of being re-read on every request. The
//! cache takes its notion of "now" from an injected [`Clock`], so expiry is
//! testable with a fake clock rather than by sleeping.
//!
//! # Example
//!
//! ```rust,ignore
//! use livecart_cache::{SystemClock, TtlCache};
//! use std::sync::Arc;
//!
//! let cache: TtlCache<u64> = TtlCache::new(Arc::new(SystemClock), 300);
//!
//! cache.put("balance:cust_1", 4_200);
//! let hit = cache.get("balance:cust_1");
//! cache.invalidate("balance:cust_1");
//! ```

mod clock;
mod ttl;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use ttl::TtlCache;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Clock, ManualClock, SharedClock, SystemClock, TtlCache};
}
