pub mod manager;

pub use manager::{CreateHoldRequest, HoldError, HoldManager};
