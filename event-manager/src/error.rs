use thiserror::Error;

use crate::event::EventSource;

/// Errors returned by the event manager
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// Numeric source index that names no event source
    #[error("Invalid event source index {0}")]
    InvalidSource(u32),

    /// Handset queue drained
    #[error("No pending events for source {0}")]
    NoData(EventSource),

    /// Source has no state that can be queried
    #[error("Event source {0} does not support state queries")]
    NotSupported(EventSource),

    /// Handset queue at capacity; the event was dropped
    #[error("Handset event queue full ({capacity} events)")]
    OutOfMemory { capacity: usize },
}

/// Failure reported by a consumer callback
///
/// Callback failures are logged by the manager and never interrupt
/// delivery to the remaining consumers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CallbackError(pub String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result type for event manager operations
pub type Result<T> = std::result::Result<T, EventError>;
