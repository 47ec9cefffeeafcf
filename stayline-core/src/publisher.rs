use async_trait::async_trait;
use stayline_domain::LifecycleEvent;

/// Seam between the lifecycle engine and event consumers (folio,
/// housekeeping, notifications). Production wires an in-process broadcast
/// bus; tests capture events in memory.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: LifecycleEvent);
}
