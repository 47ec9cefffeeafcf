use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use stayline_domain::SweepKind;
use stayline_store::SweepSchedule;

use crate::reconcile::ReconciliationSweeps;

/// Spawn one periodic task per sweep kind on its configured cadence.
/// Kinds tick independently with no ordering between them; within a
/// kind the sweep's own guard keeps runs serial even if a tick fires
/// while the previous run is still going.
pub fn spawn_sweeps(
    sweeps: Arc<ReconciliationSweeps>,
    schedule: &SweepSchedule,
) -> Vec<JoinHandle<()>> {
    SweepKind::ALL
        .iter()
        .map(|kind| {
            let kind = *kind;
            let sweeps = sweeps.clone();
            let seconds = schedule.seconds_for(kind).max(1);

            tokio::spawn(async move {
                info!(sweep = kind.name(), interval_seconds = seconds, "sweep scheduled");
                let mut ticker = tokio::time::interval(Duration::from_secs(seconds));
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    ticker.tick().await;
                    if let Err(e) = sweeps.run(kind).await {
                        error!(sweep = kind.name(), error = %e, "sweep run failed");
                    }
                }
            })
        })
        .collect()
}
