//! Table error types.

use thiserror::Error;

use super::TableId;
use crate::game::GameError;

/// Table errors
#[derive(Debug, Error)]
pub enum TableError {
    /// Rejected table configuration
    #[error("Invalid table config: {0}")]
    InvalidConfig(String),

    /// No table with this id in the registry
    #[error("Table {0} not found")]
    NotFound(TableId),

    /// The table's actor has stopped
    #[error("Table is closed")]
    Closed,

    /// Error from the game engine
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;
