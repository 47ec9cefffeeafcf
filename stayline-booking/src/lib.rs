pub mod assignment;
pub mod lifecycle;

pub use assignment::{AssignmentError, RoomAssignmentOptimizer};
pub use lifecycle::{LifecycleError, LifecycleManager, NewReservation};
