//! # Arbor Storage
//!
//! Durable state for Arbor nodes.
//!
//! A node persists exactly two counters per neighbor: the last sequence
//! number it sent and the last one it accepted. They are what make replay
//! protection survive a reboot.
//!
//! ## Features
//!
//! - **SequenceStore trait**: Minimal durable key-value interface (`&str -> u32`)
//! - **InMemorySequenceStore**: Shared in-memory implementation for testing/simulation
//! - **RedbSequenceStore**: redb-backed implementation for deployments
//! - **SequenceManager**: Per-peer counters, replay checks and throttled flushing
//!
//! ## Example
//!
//! ```rust,ignore
//! use arbor_core::{HardwareAddr, SystemClock};
//! use arbor_storage::{InMemorySequenceStore, SequenceManager, DEFAULT_FLUSH_INTERVAL};
//!
//! let peer = HardwareAddr::new([0x88, 0x13, 0xBF, 0x0B, 0xA6, 0x6C]);
//! let mut seq = SequenceManager::load(
//!     InMemorySequenceStore::new(),
//!     SystemClock,
//!     [peer],
//!     DEFAULT_FLUSH_INTERVAL,
//! )?;
//!
//! let n = seq.next_send_seq(&peer)?;
//! assert!(seq.accept_receive(&peer, 1));
//! assert!(!seq.accept_receive(&peer, 1));
//! seq.maybe_flush(&peer)?;
//! ```

pub mod error;
pub mod memory;
pub mod persistent;
pub mod sequence;

// Re-exports
pub use error::{SequenceError, SequenceResult, StorageError, StorageResult};
pub use memory::InMemorySequenceStore;
pub use persistent::{RedbSequenceStore, SEQUENCE_COUNTERS};
pub use sequence::{
    DEFAULT_FLUSH_INTERVAL, PeerSequenceState, SequenceManager, is_newer, seen_key, send_key,
};

/// Durable key-value store for sequence counters
///
/// Writes are small and synchronous. A missing key reads as 0.
///
/// Implementations must be cheap to call from inside a lock: the node
/// holds its sequence state mutex while flushing.
pub trait SequenceStore: Send + Sync {
    /// Read a counter
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> StorageResult<u32>;

    /// Write a counter
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be made durable.
    fn put(&self, key: &str, value: u32) -> StorageResult<()>;
}

impl<T: SequenceStore + ?Sized> SequenceStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> StorageResult<u32> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: u32) -> StorageResult<()> {
        (**self).put(key, value)
    }
}
