pub mod clock;
pub mod payment;
pub mod publisher;
pub mod store;
pub mod time;

pub use clock::{Clock, FixedClock, SystemClock};
pub use payment::{PaymentEventType, PaymentStatusEvent};
pub use publisher::EventPublisher;
pub use store::StoreError;
