//! Event record type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An event destined for plugin/webhook subscribers.
///
/// Events are plain records: a tenant scope, a dotted name such as
/// `cart.item_added`, and a JSON payload. They carry no behavior; delivery
/// is the outbox's job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Unique event identifier.
    pub id: String,
    /// Tenant whose subscribers should see this event.
    pub tenant_id: String,
    /// Dotted event name (e.g. "order.completed").
    pub name: String,
    /// Arbitrary JSON payload.
    pub payload: Value,
    /// Unix timestamp when the event was produced.
    pub occurred_at: i64,
}

impl Event {
    /// Create a new event with a generated id.
    pub fn new(
        tenant_id: impl Into<String>,
        name: impl Into<String>,
        payload: Value,
        occurred_at: i64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            payload,
            occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_ids_are_unique() {
        let a = Event::new("t", "cart.item_added", json!({}), 0);
        let b = Event::new("t", "cart.item_added", json!({}), 0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_event_round_trips_through_json() {
        let event = Event::new("t", "order.completed", json!({"order_id": "o_1"}), 42);
        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: Event = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, event);
    }
}
