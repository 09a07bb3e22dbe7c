//! Outbound event types and outbox delivery for LiveCart.
//!
//! Plugins, webhooks and notification channels observe the commerce engine
//! through events. The engine never blocks on a subscriber: mutations push
//! events into an [`Outbox`] after their transaction commits, and a delivery
//! loop drains the outbox into an [`EventSink`] with at-least-once
//! semantics. A sink failure leaves the event queued for the next drain and
//! is logged, never surfaced to the request that produced it.
//!
//! # Example
//!
//! ```rust,ignore
//! use livecart_events::{Event, EventSink, Outbox};
//!
//! outbox.enqueue(Event::new("tenant_1", "cart.item_added", payload, now));
//! // later, on the delivery loop:
//! outbox.drain(&sink).await;
//! ```

mod event;
mod outbox;
mod sink;

pub use event::Event;
pub use outbox::Outbox;
pub use sink::{EventSink, MemorySink, NullSink, SinkError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Event, EventSink, MemorySink, NullSink, Outbox, SinkError};
}
