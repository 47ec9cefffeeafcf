use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use stayline_core::EventPublisher;
use stayline_domain::LifecycleEvent;

/// Fans lifecycle events out to in-process subscribers (SSE stream, folio
/// and notification consumers). Send failures mean nobody is listening,
/// which is not an error for the engine.
#[derive(Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl BroadcastPublisher {
    pub fn new(tx: broadcast::Sender<LifecycleEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, event: LifecycleEvent) {
        debug!(
            reservation_id = %event.reservation_id,
            event_type = ?event.event_type,
            "publishing lifecycle event"
        );
        let _ = self.tx.send(event);
    }
}

/// Captures published events for assertions in tests
#[derive(Default)]
pub struct MemoryPublisher {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(&self, event: LifecycleEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
