pub mod reconcile;
pub mod scheduler;

pub use reconcile::{ReconciliationSweeps, SweepReport};
pub use scheduler::spawn_sweeps;
