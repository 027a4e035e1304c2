//! Error types for arbor-storage
//!
//! This module defines the error types used throughout the storage crate.

use arbor_core::HardwareAddr;
use thiserror::Error;

/// Errors that can occur in storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error during storage operations
    #[error("I/O error: {0}")]
    Io(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl StorageError {
    /// Create a new I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Create a new Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }
}

/// Errors from the sequence manager
#[derive(Debug, Error)]
pub enum SequenceError {
    /// The peer was not registered when the manager was loaded
    #[error("Unknown peer: {0}")]
    UnknownPeer(HardwareAddr),

    /// The backing store failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for sequence operations
pub type SequenceResult<T> = Result<T, SequenceError>;
