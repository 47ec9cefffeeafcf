use std::sync::Arc;

use tokio::sync::broadcast;

use stayline_booking::{LifecycleManager, RoomAssignmentOptimizer};
use stayline_core::Clock;
use stayline_domain::LifecycleEvent;
use stayline_holds::HoldManager;
use stayline_inventory::{AvailabilityIndex, RoomRegistry};
use stayline_store::{BroadcastPublisher, Config, MemoryStore, RoomLockTable};
use stayline_sweeps::ReconciliationSweeps;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub registry: RoomRegistry,
    pub availability: AvailabilityIndex,
    pub assignment: Arc<RoomAssignmentOptimizer>,
    pub lifecycle: Arc<LifecycleManager>,
    pub holds: Arc<HoldManager>,
    pub events_tx: broadcast::Sender<LifecycleEvent>,
    pub clock: Arc<dyn Clock>,
    pub config: Config,
}

impl AppState {
    /// Wire the engine components around one shared store, lock table
    /// and event bus. Returns the state plus the reconciliation sweeps
    /// for the caller to schedule.
    pub fn build(config: Config, clock: Arc<dyn Clock>) -> (AppState, Arc<ReconciliationSweeps>) {
        let store = Arc::new(MemoryStore::new());
        let locks = Arc::new(RoomLockTable::new());
        let availability = AvailabilityIndex::new(store.clone());
        let registry = RoomRegistry::new(store.clone());

        let (events_tx, _) = broadcast::channel(256);
        let publisher = Arc::new(BroadcastPublisher::new(events_tx.clone()));

        let assignment = Arc::new(RoomAssignmentOptimizer::new(
            store.clone(),
            availability.clone(),
            locks.clone(),
        ));
        let lifecycle = Arc::new(LifecycleManager::new(
            store.clone(),
            locks.clone(),
            availability.clone(),
            assignment.clone(),
            publisher,
            clock.clone(),
            config.engine.clone(),
        ));
        let holds = Arc::new(HoldManager::new(
            store.clone(),
            locks,
            availability.clone(),
            lifecycle.clone(),
            assignment.clone(),
            clock.clone(),
            config.engine.clone(),
        ));
        let sweeps = Arc::new(ReconciliationSweeps::new(
            store.clone(),
            lifecycle.clone(),
            holds.clone(),
            clock.clone(),
            config.engine.clone(),
        ));

        let state = AppState {
            store,
            registry,
            availability,
            assignment,
            lifecycle,
            holds,
            events_tx,
            clock,
            config,
        };
        (state, sweeps)
    }
}
