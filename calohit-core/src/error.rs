//! Error types for calohit-core.

use thiserror::Error;

/// Result type alias for calohit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for calohit operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A step carried a non-finite position or momentum.
    #[error("corrupted event: NaN detected in volume {volume}")]
    CorruptedStep { volume: String },

    /// A lifecycle notification arrived in a state that cannot accept it.
    #[error("invalid transition: {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },

    /// Event-end named a different event than the open one.
    #[error("event mismatch: open event is {open}, end-of-event received for {received}")]
    EventMismatch { open: u32, received: u32 },

    /// The event was aborted by a fatal step and produced no hits.
    #[error("event {0} was aborted")]
    EventAborted(u32),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
