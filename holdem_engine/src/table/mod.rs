//! Tables: one async actor per table plus a registry of running tables.
//!
//! Each table runs in a separate Tokio task with an mpsc message inbox and
//! is the only writer of its game state. Callers talk to it through a
//! cloneable [`TableHandle`]; the [`TableManager`] spawns tables and hands
//! out their handles by id.

pub mod actor;
pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;

/// Table identifier, assigned by the [`TableManager`]
pub type TableId = u64;

pub use actor::{SeatAssignment, SeatController, TableActor, TableHandle};
pub use config::{BotDifficulty, TableConfig, TableSpeed};
pub use errors::{TableError, TableResult};
pub use manager::{TableManager, TableMetadata};
pub use messages::{TableEvent, TableMessage, TableResponse, TableStateResponse};
