pub mod app_config;
pub mod events;
pub mod lock_table;
pub mod memory;

pub use app_config::{Config, EngineRules, ServerConfig, SweepSchedule};
pub use events::{BroadcastPublisher, MemoryPublisher};
pub use lock_table::{RoomGuards, RoomLockTable};
pub use memory::{BlockSource, MemoryStore, RoomBlock};
