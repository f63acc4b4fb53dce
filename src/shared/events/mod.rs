use crate::domain::events::SystemEvent;
use crate::domain::ports::event_bus::EventBus;
use crate::infrastructure::http::middleware::error::ApiResult;
use futures::Stream;
use std::pin::Pin;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Local in-memory implementation of EventBus
#[derive(Clone)]
pub struct LocalEventBus {
    tx: broadcast::Sender<SystemEvent>,
}

impl LocalEventBus {
    /// Create a new event bus with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventBus for LocalEventBus {
    fn publish(&self, event: SystemEvent) -> ApiResult<()> {
        let event_type = event.event_type();
        // No subscribers is not a failure for the publisher.
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("No active subscribers for {}: {}", event_type, e);
        }
        Ok(())
    }

    fn subscribe(&self) -> Pin<Box<dyn Stream<Item = Result<SystemEvent, String>> + Send>> {
        let rx = self.tx.subscribe();
        Box::pin(BroadcastStream::new(rx).map(|item| item.map_err(|e| e.to_string())))
    }
}

impl Default for LocalEventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}
