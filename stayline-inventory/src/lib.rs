pub mod availability;
pub mod registry;

pub use availability::AvailabilityIndex;
pub use registry::{InventoryError, RoomRegistry};
