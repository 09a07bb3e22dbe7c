//! Delivery sinks.

use crate::event::Event;
use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;

/// A sink delivery failure.
///
/// Sinks wrap whatever transport they use (HTTP webhook, message queue);
/// the outbox only needs to know that delivery did not happen.
#[derive(Error, Debug)]
#[error("event delivery failed: {0}")]
pub struct SinkError(pub String);

/// Where drained events go.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver a single event. Failure leaves the event queued.
    async fn deliver(&self, event: &Event) -> Result<(), SinkError>;
}

/// A sink that records delivered events in memory. Test double.
#[derive(Debug, Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<Event>>,
    fail_names: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make delivery fail for events with the given name.
    pub fn fail_for(&self, name: impl Into<String>) {
        let mut names = match self.fail_names.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        names.push(name.into());
    }

    /// Events delivered so far, in order.
    pub fn delivered(&self) -> Vec<Event> {
        let delivered = match self.delivered.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        delivered.clone()
    }

    /// Names of delivered events, in order.
    pub fn delivered_names(&self) -> Vec<String> {
        self.delivered().into_iter().map(|e| e.name).collect()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn deliver(&self, event: &Event) -> Result<(), SinkError> {
        let failing = {
            let names = match self.fail_names.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            names.contains(&event.name)
        };
        if failing {
            return Err(SinkError(format!("refusing {}", event.name)));
        }
        let mut delivered = match self.delivered.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        delivered.push(event.clone());
        Ok(())
    }
}

/// A sink that drops everything. Useful when no subscribers are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn deliver(&self, _event: &Event) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.deliver(&Event::new("t", "a", json!({}), 0)).await.unwrap();
        sink.deliver(&Event::new("t", "b", json!({}), 0)).await.unwrap();
        assert_eq!(sink.delivered_names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_memory_sink_failure_injection() {
        let sink = MemorySink::new();
        sink.fail_for("bad");
        assert!(sink.deliver(&Event::new("t", "bad", json!({}), 0)).await.is_err());
        assert!(sink.delivered().is_empty());
    }
}
