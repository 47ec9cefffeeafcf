pub mod audit;
pub mod events;
pub mod hold;
pub mod reservation;
pub mod room;

pub use audit::{AuditRecord, EntityType};
pub use events::{LifecycleEvent, LifecycleEventType, SweepKind, TriggerSource};
pub use hold::{HoldStatus, ReservationHold};
pub use reservation::{GuestRef, Reservation, ReservationSource, ReservationStatus};
pub use room::{Room, RoomType};
