//! Routing error types

use thiserror::Error;

use crate::table::Pin;

/// Errors from routing decisions and the neighbor table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// No neighbor is closer to the destination than this node
    #[error("No route available to destination")]
    Unroutable,

    /// The one-byte pin space is exhausted
    #[error("Too many neighbors: {count} (max {max})")]
    TooManyNeighbors { count: usize, max: usize },

    /// A pin that was never assigned
    #[error("Unknown pin: {0}")]
    UnknownPin(Pin),
}

/// Result type for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;
