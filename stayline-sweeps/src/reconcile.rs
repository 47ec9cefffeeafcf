use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info};

use stayline_booking::LifecycleManager;
use stayline_core::time::date_at_hour;
use stayline_core::{Clock, StoreError};
use stayline_domain::{Reservation, ReservationStatus, SweepKind, TriggerSource};
use stayline_holds::HoldManager;
use stayline_store::{EngineRules, MemoryStore};

/// Outcome of one sweep run
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub kind: SweepKind,
    pub examined: usize,
    pub transitioned: usize,
    pub failures: usize,
}

impl SweepReport {
    fn empty(kind: SweepKind) -> Self {
        Self { kind, examined: 0, transitioned: 0, failures: 0 }
    }
}

/// The periodic reconciliation rules. Each sweep reads the clock once at
/// the start of its run and uses that snapshot for every comparison;
/// candidates are filtered by status first, then by date predicate, so a
/// row already transitioned by the previous run can never match again.
/// One failing row is logged and left for the next run without aborting
/// the rest of the batch.
pub struct ReconciliationSweeps {
    store: Arc<MemoryStore>,
    lifecycle: Arc<LifecycleManager>,
    holds: Arc<HoldManager>,
    clock: Arc<dyn Clock>,
    rules: EngineRules,
    /// One guard per sweep kind: a kind never runs twice concurrently
    runner_locks: [Mutex<()>; 6],
}

impl ReconciliationSweeps {
    pub fn new(
        store: Arc<MemoryStore>,
        lifecycle: Arc<LifecycleManager>,
        holds: Arc<HoldManager>,
        clock: Arc<dyn Clock>,
        rules: EngineRules,
    ) -> Self {
        Self {
            store,
            lifecycle,
            holds,
            clock,
            rules,
            runner_locks: Default::default(),
        }
    }

    pub async fn run(&self, kind: SweepKind) -> Result<SweepReport, StoreError> {
        let _guard = self.runner_locks[kind_index(kind)].lock().await;
        let now = self.clock.now();

        let report = match kind {
            SweepKind::UnconfirmedDeadline => self.unconfirmed_deadline(now).await?,
            SweepKind::StalePending => self.stale_pending(now).await?,
            SweepKind::Arrival => self.arrival(now).await?,
            SweepKind::NoShow => self.no_show(now).await?,
            SweepKind::OverdueCheckout => self.overdue_checkout(now).await?,
            SweepKind::ExpiredHolds => self.expired_holds(now)?,
        };

        if report.transitioned > 0 || report.failures > 0 {
            info!(
                sweep = kind.name(),
                examined = report.examined,
                transitioned = report.transitioned,
                failures = report.failures,
                "sweep finished"
            );
        }
        Ok(report)
    }

    /// Pending bookings past the confirmation deadline (a configurable
    /// number of hours before the check-in hour on arrival day) are
    /// cancelled and their rooms released.
    async fn unconfirmed_deadline(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let candidates = self.store.reservations_with_status(ReservationStatus::Pending)?;
        let due: Vec<&Reservation> = candidates
            .iter()
            .filter(|r| {
                let deadline = date_at_hour(r.check_in, self.rules.check_in_hour)
                    - Duration::hours(self.rules.unconfirmed_cutoff_hours);
                now >= deadline
            })
            .collect();

        self.cancel_batch(SweepKind::UnconfirmedDeadline, candidates.len(), &due)
            .await
    }

    /// Pending bookings that have sat unconfirmed longer than the stale
    /// threshold, regardless of how far away the stay is
    async fn stale_pending(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let candidates = self.store.reservations_with_status(ReservationStatus::Pending)?;
        let due: Vec<&Reservation> = candidates
            .iter()
            .filter(|r| now >= r.created_at + Duration::hours(self.rules.stale_pending_hours))
            .collect();

        self.cancel_batch(SweepKind::StalePending, candidates.len(), &due).await
    }

    /// Confirmed bookings arriving today are checked in once the
    /// check-in hour has passed
    async fn arrival(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let candidates = self.store.reservations_with_status(ReservationStatus::Confirmed)?;
        let mut report = SweepReport::empty(SweepKind::Arrival);
        report.examined = candidates.len();

        for reservation in candidates.iter().filter(|r| {
            r.check_in == now.date_naive() && now >= date_at_hour(r.check_in, self.rules.check_in_hour)
        }) {
            match self
                .lifecycle
                .check_in(reservation.id, TriggerSource::Sweep(SweepKind::Arrival))
                .await
            {
                Ok(_) => report.transitioned += 1,
                Err(e) => {
                    report.failures += 1;
                    error!(reservation_id = %reservation.id, error = %e, "arrival check-in failed");
                }
            }
        }
        Ok(report)
    }

    /// Confirmed bookings whose guest never arrived are cancelled once
    /// the grace period after the check-in hour has fully elapsed
    async fn no_show(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        if !self.rules.auto_mark_no_shows {
            return Ok(SweepReport::empty(SweepKind::NoShow));
        }
        let candidates = self.store.reservations_with_status(ReservationStatus::Confirmed)?;
        let due: Vec<&Reservation> = candidates
            .iter()
            .filter(|r| {
                let deadline = date_at_hour(r.check_in, self.rules.check_in_hour)
                    + Duration::hours(self.rules.no_show_grace_period_hours);
                now >= deadline
            })
            .collect();

        self.cancel_batch(SweepKind::NoShow, candidates.len(), &due).await
    }

    /// Occupied rooms past their check-out date are checked out
    async fn overdue_checkout(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let mut candidates = self.store.reservations_with_status(ReservationStatus::CheckedIn)?;
        candidates.extend(self.store.reservations_with_status(ReservationStatus::Occupied)?);

        let mut report = SweepReport::empty(SweepKind::OverdueCheckout);
        report.examined = candidates.len();

        for reservation in candidates.iter().filter(|r| r.check_out < now.date_naive()) {
            match self
                .lifecycle
                .check_out(reservation.id, TriggerSource::Sweep(SweepKind::OverdueCheckout))
                .await
            {
                Ok(_) => report.transitioned += 1,
                Err(e) => {
                    report.failures += 1;
                    error!(reservation_id = %reservation.id, error = %e, "overdue checkout failed");
                }
            }
        }
        Ok(report)
    }

    /// Active holds whose TTL has passed are marked Expired, releasing
    /// their rooms for everyone else
    fn expired_holds(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let examined = self.store.expired_active_holds(now)?.len();
        let expired = self
            .holds
            .process_expired_holds(now)
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        Ok(SweepReport {
            kind: SweepKind::ExpiredHolds,
            examined,
            transitioned: expired,
            failures: examined.saturating_sub(expired),
        })
    }

    async fn cancel_batch(
        &self,
        kind: SweepKind,
        examined: usize,
        due: &[&Reservation],
    ) -> Result<SweepReport, StoreError> {
        let mut report = SweepReport::empty(kind);
        report.examined = examined;

        for reservation in due {
            match self
                .lifecycle
                .cancel(reservation.id, TriggerSource::Sweep(kind))
                .await
            {
                Ok(_) => report.transitioned += 1,
                Err(e) => {
                    report.failures += 1;
                    error!(
                        sweep = kind.name(),
                        reservation_id = %reservation.id,
                        error = %e,
                        "sweep cancellation failed"
                    );
                }
            }
        }
        Ok(report)
    }
}

fn kind_index(kind: SweepKind) -> usize {
    match kind {
        SweepKind::UnconfirmedDeadline => 0,
        SweepKind::StalePending => 1,
        SweepKind::Arrival => 2,
        SweepKind::NoShow => 3,
        SweepKind::OverdueCheckout => 4,
        SweepKind::ExpiredHolds => 5,
    }
}
