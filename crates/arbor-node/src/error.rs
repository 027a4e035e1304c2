//! Error types for the node orchestrator

use arbor_core::{AddressError, HardwareAddr, TransportError};
use arbor_crypto::CodecError;
use arbor_routing::RoutingError;
use arbor_storage::{SequenceError, StorageError};
use thiserror::Error;

/// Errors that can occur in the node orchestrator
#[derive(Debug, Error)]
pub enum NodeError {
    /// No neighbor leads towards the destination
    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    /// Payload too large or frame rejected
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Sequence state error
    #[error("Sequence error: {0}")]
    Sequence(#[from] SequenceError),

    /// Link layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Some neighbors could not be registered with the link layer
    #[error("Failed to register {} neighbor(s): {failed:?}", .failed.len())]
    PeerRegistration { failed: Vec<HardwareAddr> },

    /// IO error
    #[error("IO error: {0}")]
    Io(String),
}

impl From<AddressError> for NodeError {
    fn from(e: AddressError) -> Self {
        NodeError::Config(e.to_string())
    }
}

impl From<toml::de::Error> for NodeError {
    fn from(e: toml::de::Error) -> Self {
        NodeError::Config(e.to_string())
    }
}

impl From<std::io::Error> for NodeError {
    fn from(e: std::io::Error) -> Self {
        NodeError::Io(e.to_string())
    }
}

impl NodeError {
    /// Whether this is the unroutable outcome of a submit
    pub fn is_unroutable(&self) -> bool {
        matches!(self, NodeError::Routing(RoutingError::Unroutable))
    }
}

/// Result type alias for node operations
pub type NodeResult<T> = Result<T, NodeError>;
