//! At-least-once event outbox.

use crate::event::Event;
use crate::sink::EventSink;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Queue of events awaiting delivery.
///
/// Producers enqueue after their own transaction has committed; the delivery
/// loop drains into a sink. An event the sink rejects stays at the head of
/// the queue and is retried on the next drain, so subscribers may see an
/// event more than once but never lose one.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Mutex<VecDeque<Event>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for delivery.
    pub fn enqueue(&self, event: Event) {
        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tracing::debug!(event = %event.name, tenant = %event.tenant_id, "event queued");
        pending.push_back(event);
    }

    /// Number of events awaiting delivery.
    pub fn pending(&self) -> usize {
        let pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        pending.len()
    }

    /// Snapshot of queued events, front of the queue first.
    pub fn pending_events(&self) -> Vec<Event> {
        let pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        pending.iter().cloned().collect()
    }

    /// Deliver queued events in order until the queue is empty or the sink
    /// fails. Returns how many events were delivered.
    ///
    /// On failure the undelivered event stays queued and the error is
    /// logged; the caller's request path is never affected.
    pub async fn drain(&self, sink: &dyn EventSink) -> usize {
        let mut delivered = 0;
        loop {
            // Pop-then-deliver outside the lock; re-queue at the front on failure.
            let event = {
                let mut pending = match self.pending.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                match pending.pop_front() {
                    Some(event) => event,
                    None => break,
                }
            };

            match sink.deliver(&event).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::warn!(
                        event = %event.name,
                        tenant = %event.tenant_id,
                        error = %err,
                        "event delivery failed, keeping queued"
                    );
                    let mut pending = match self.pending.lock() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    pending.push_front(event);
                    break;
                }
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use serde_json::json;

    fn event(name: &str) -> Event {
        Event::new("tenant_1", name, json!({}), 0)
    }

    #[tokio::test]
    async fn test_drain_delivers_in_order() {
        let outbox = Outbox::new();
        outbox.enqueue(event("cart.item_added"));
        outbox.enqueue(event("order.completed"));

        let sink = MemorySink::new();
        assert_eq!(outbox.drain(&sink).await, 2);
        assert_eq!(outbox.pending(), 0);
        assert_eq!(
            sink.delivered_names(),
            vec!["cart.item_added", "order.completed"]
        );
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_event_queued() {
        let outbox = Outbox::new();
        outbox.enqueue(event("good"));
        outbox.enqueue(event("bad"));
        outbox.enqueue(event("later"));

        let sink = MemorySink::new();
        sink.fail_for("bad");

        assert_eq!(outbox.drain(&sink).await, 1);
        assert_eq!(outbox.pending(), 2);
        assert_eq!(outbox.pending_events()[0].name, "bad");
    }

    #[tokio::test]
    async fn test_redelivery_after_sink_recovers() {
        let outbox = Outbox::new();
        outbox.enqueue(event("flaky"));

        let failing = MemorySink::new();
        failing.fail_for("flaky");
        assert_eq!(outbox.drain(&failing).await, 0);

        let healthy = MemorySink::new();
        assert_eq!(outbox.drain(&healthy).await, 1);
        assert_eq!(healthy.delivered_names(), vec!["flaky"]);
    }
}
