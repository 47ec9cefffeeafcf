use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use stayline_core::time::date_at_hour;
use stayline_core::{Clock, EventPublisher, PaymentEventType, PaymentStatusEvent, StoreError};
use stayline_domain::{
    AuditRecord, EntityType, GuestRef, LifecycleEvent, LifecycleEventType, Reservation,
    ReservationSource, ReservationStatus, TriggerSource,
};
use stayline_inventory::AvailabilityIndex;
use stayline_store::{EngineRules, MemoryStore, RoomLockTable};

use crate::assignment::{AssignmentError, RoomAssignmentOptimizer};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Reservation not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Room unavailable: {0}")]
    RoomUnavailable(Uuid),

    #[error("Check-in for {check_in} does not open before {hour}:00")]
    ArrivalNotOpen { check_in: NaiveDate, hour: u32 },

    #[error("No rooms assigned to reservation {0}")]
    NoRoomsAssigned(Uuid),

    #[error("Payment confirmation window elapsed for reservation {0}")]
    PaymentWindowElapsed(Uuid),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Booking request as it enters the lifecycle machine
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub guest: GuestRef,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub rooms: Vec<Uuid>,
    pub total_guests: i32,
    pub source: ReservationSource,
    /// Hold being converted, excluded from the availability check so the
    /// hold does not collide with its own reservation
    pub converted_from: Option<Uuid>,
}

/// Owns the canonical reservation status and validates every transition.
/// Each applied transition stamps `updated_at`, appends an audit record
/// and publishes a lifecycle event for the folio, housekeeping and
/// notification collaborators.
pub struct LifecycleManager {
    store: Arc<MemoryStore>,
    locks: Arc<RoomLockTable>,
    availability: AvailabilityIndex,
    assignment: Arc<RoomAssignmentOptimizer>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    rules: EngineRules,
}

impl LifecycleManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<MemoryStore>,
        locks: Arc<RoomLockTable>,
        availability: AvailabilityIndex,
        assignment: Arc<RoomAssignmentOptimizer>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        rules: EngineRules,
    ) -> Self {
        Self { store, locks, availability, assignment, publisher, clock, rules }
    }

    /// Create a booking. Same-day arrivals start Confirmed, everything
    /// else starts Pending awaiting payment or explicit confirmation.
    /// When concrete rooms are requested, availability is checked and
    /// committed under the room locks as one unit.
    pub async fn create_reservation(
        &self,
        new: NewReservation,
        triggered_by: TriggerSource,
    ) -> Result<Reservation, LifecycleError> {
        let now = self.clock.now();
        let today = now.date_naive();

        if new.check_out <= new.check_in {
            return Err(LifecycleError::Validation(
                "check-out date must be after check-in date".to_string(),
            ));
        }
        if new.check_in < today {
            return Err(LifecycleError::Validation("check-in date is in the past".to_string()));
        }
        if new.total_guests <= 0 {
            return Err(LifecycleError::Validation("at least one guest is required".to_string()));
        }
        if new.guest.email.trim().is_empty() {
            return Err(LifecycleError::Validation("guest email is required".to_string()));
        }
        let mut unique = new.rooms.clone();
        unique.sort();
        unique.dedup();
        if unique.len() != new.rooms.len() {
            return Err(LifecycleError::Validation("duplicate room ids in request".to_string()));
        }

        let status = if new.check_in == today {
            ReservationStatus::Confirmed
        } else {
            ReservationStatus::Pending
        };

        let reservation = Reservation::new(
            new.guest,
            new.check_in,
            new.check_out,
            new.rooms.clone(),
            new.total_guests,
            new.source,
            status,
            now,
        );

        if new.rooms.is_empty() {
            self.store.insert_reservation(reservation.clone())?;
        } else {
            // Check and commit inside the room locks; a concurrent
            // request for an overlapping stay waits here instead of
            // double-booking
            let guards = self.locks.lock_rooms(&new.rooms).await;
            for room_id in &new.rooms {
                self.store.room(*room_id)?;
                if !self.availability.is_available(
                    *room_id,
                    new.check_in,
                    new.check_out,
                    now,
                    None,
                    new.converted_from,
                )? {
                    return Err(LifecycleError::RoomUnavailable(*room_id));
                }
            }
            self.store.insert_reservation(reservation.clone())?;
            drop(guards);
        }

        self.record(&reservation, "reservation.created", &triggered_by, now)?;
        self.publish(None, &reservation, LifecycleEventType::Created, triggered_by.clone(), now)
            .await;
        info!(reservation_id = %reservation.id, status = ?reservation.status, "reservation created");

        if reservation.status == ReservationStatus::Confirmed {
            self.maybe_auto_assign(&reservation, now, triggered_by).await;
        }

        Ok(reservation)
    }

    pub fn get(&self, id: Uuid) -> Result<Reservation, LifecycleError> {
        self.store.reservation(id).map_err(|_| LifecycleError::NotFound(id))
    }

    /// Pending -> Confirmed, by payment capture or explicit confirmation
    pub async fn confirm(
        &self,
        id: Uuid,
        triggered_by: TriggerSource,
    ) -> Result<Reservation, LifecycleError> {
        let now = self.clock.now();
        let (previous, reservation) = self.transition(
            id,
            &[ReservationStatus::Pending],
            ReservationStatus::Confirmed,
            now,
        )?;

        self.record(&reservation, "reservation.confirmed", &triggered_by, now)?;
        self.publish(Some(previous), &reservation, LifecycleEventType::Confirmed, triggered_by.clone(), now)
            .await;

        self.maybe_auto_assign(&reservation, now, triggered_by).await;
        Ok(reservation)
    }

    /// Confirmed -> CheckedIn once the arrival window is open
    pub async fn check_in(
        &self,
        id: Uuid,
        triggered_by: TriggerSource,
    ) -> Result<Reservation, LifecycleError> {
        let now = self.clock.now();
        let hour = self.rules.check_in_hour;

        let current = self.get(id)?;
        let arrival_opens = date_at_hour(current.check_in, hour);
        if now < arrival_opens {
            return Err(LifecycleError::ArrivalNotOpen { check_in: current.check_in, hour });
        }
        if current.status == ReservationStatus::Confirmed && current.rooms.is_empty() {
            return Err(LifecycleError::NoRoomsAssigned(id));
        }

        let (previous, reservation) = self.transition(
            id,
            &[ReservationStatus::Confirmed],
            ReservationStatus::CheckedIn,
            now,
        )?;

        self.record(&reservation, "reservation.checked_in", &triggered_by, now)?;
        self.publish(Some(previous), &reservation, LifecycleEventType::CheckedIn, triggered_by, now)
            .await;
        Ok(reservation)
    }

    /// CheckedIn -> Occupied, a staff/housekeeping transition
    pub async fn mark_occupied(
        &self,
        id: Uuid,
        triggered_by: TriggerSource,
    ) -> Result<Reservation, LifecycleError> {
        let now = self.clock.now();
        let (previous, reservation) = self.transition(
            id,
            &[ReservationStatus::CheckedIn],
            ReservationStatus::Occupied,
            now,
        )?;

        self.record(&reservation, "reservation.occupied", &triggered_by, now)?;
        self.publish(Some(previous), &reservation, LifecycleEventType::Occupied, triggered_by, now)
            .await;
        Ok(reservation)
    }

    /// CheckedIn/Occupied -> CheckedOut (terminal)
    pub async fn check_out(
        &self,
        id: Uuid,
        triggered_by: TriggerSource,
    ) -> Result<Reservation, LifecycleError> {
        let now = self.clock.now();
        let (previous, reservation) = self.transition(
            id,
            &[ReservationStatus::CheckedIn, ReservationStatus::Occupied],
            ReservationStatus::CheckedOut,
            now,
        )?;

        self.record(&reservation, "reservation.checked_out", &triggered_by, now)?;
        self.publish(Some(previous), &reservation, LifecycleEventType::CheckedOut, triggered_by, now)
            .await;
        Ok(reservation)
    }

    /// Pending/Confirmed -> Cancelled (terminal). A cancelled unconfirmed
    /// booking releases its room associations.
    pub async fn cancel(
        &self,
        id: Uuid,
        triggered_by: TriggerSource,
    ) -> Result<Reservation, LifecycleError> {
        let now = self.clock.now();
        let mut previous = None;
        let reservation = self.store.apply_reservation::<LifecycleError, _>(id, |r| {
            if !matches!(r.status, ReservationStatus::Pending | ReservationStatus::Confirmed) {
                return Err(LifecycleError::InvalidTransition {
                    from: format!("{:?}", r.status),
                    to: format!("{:?}", ReservationStatus::Cancelled),
                });
            }
            previous = Some(r.status);
            if r.status == ReservationStatus::Pending {
                r.release_rooms(now);
            }
            r.update_status(ReservationStatus::Cancelled, now);
            Ok(())
        })?;
        let previous = previous.unwrap_or(ReservationStatus::Cancelled);

        self.record(&reservation, "reservation.cancelled", &triggered_by, now)?;
        self.publish(Some(previous), &reservation, LifecycleEventType::Cancelled, triggered_by, now)
            .await;
        Ok(reservation)
    }

    /// Payment collaborator signal. Success confirms a Pending
    /// reservation when auto-confirmation is enabled and the capture
    /// arrived within the payment window.
    pub async fn handle_payment(
        &self,
        event: PaymentStatusEvent,
    ) -> Result<Option<Reservation>, LifecycleError> {
        let now = self.clock.now();
        let reservation = self.get(event.reservation_id)?;

        match event.event_type {
            PaymentEventType::Success => {
                if !self.rules.auto_confirm_on_payment {
                    self.record(&reservation, "payment.received", &TriggerSource::Payment, now)?;
                    return Ok(None);
                }
                if reservation.status != ReservationStatus::Pending {
                    self.record(&reservation, "payment.ignored", &TriggerSource::Payment, now)?;
                    return Ok(None);
                }
                let window = Duration::minutes(self.rules.payment_timeout_minutes);
                if now > reservation.created_at + window {
                    return Err(LifecycleError::PaymentWindowElapsed(reservation.id));
                }
                let confirmed = self.confirm(reservation.id, TriggerSource::Payment).await?;
                Ok(Some(confirmed))
            }
            PaymentEventType::Failed => {
                // The unconfirmed-deadline sweep will collect it
                self.record(&reservation, "payment.failed", &TriggerSource::Payment, now)?;
                Ok(None)
            }
        }
    }

    // ---- internals ----

    fn transition(
        &self,
        id: Uuid,
        allowed_from: &[ReservationStatus],
        to: ReservationStatus,
        now: DateTime<Utc>,
    ) -> Result<(ReservationStatus, Reservation), LifecycleError> {
        let mut previous = None;
        let reservation = self.store.apply_reservation::<LifecycleError, _>(id, |r| {
            if !allowed_from.contains(&r.status) {
                return Err(LifecycleError::InvalidTransition {
                    from: format!("{:?}", r.status),
                    to: format!("{:?}", to),
                });
            }
            previous = Some(r.status);
            r.update_status(to, now);
            Ok(())
        })?;
        let previous = previous.unwrap_or(to);
        Ok((previous, reservation))
    }

    fn record(
        &self,
        reservation: &Reservation,
        action: &str,
        triggered_by: &TriggerSource,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        self.store.record_audit(AuditRecord::new(
            EntityType::Reservation,
            reservation.id,
            action,
            triggered_by.clone(),
            format!(
                "{} for {} ({} -> {})",
                action, reservation.guest.email, reservation.check_in, reservation.check_out
            ),
            now,
        ))?;
        Ok(())
    }

    async fn publish(
        &self,
        previous: Option<ReservationStatus>,
        reservation: &Reservation,
        event_type: LifecycleEventType,
        triggered_by: TriggerSource,
        now: DateTime<Utc>,
    ) {
        self.publisher
            .publish(LifecycleEvent {
                reservation_id: reservation.id,
                previous_status: previous,
                new_status: reservation.status,
                event_type,
                triggered_by,
                event_time: now,
            })
            .await;
    }

    async fn maybe_auto_assign(
        &self,
        reservation: &Reservation,
        now: DateTime<Utc>,
        triggered_by: TriggerSource,
    ) {
        if !self.rules.auto_assign_rooms || !reservation.rooms.is_empty() {
            return;
        }
        match self.assignment.auto_assign(reservation.id, now, triggered_by).await {
            Ok(rooms) => {
                info!(reservation_id = %reservation.id, rooms = rooms.len(), "auto-assignment complete");
            }
            Err(e) => {
                // Reported, not retried; staff resolve or the guest picks
                // different dates
                warn!(reservation_id = %reservation.id, error = %e, "auto-assignment failed");
            }
        }
    }
}
