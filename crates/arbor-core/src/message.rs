//! Logical messages routed between tree addresses

use bytes::Bytes;

use crate::address::Address;

/// A message as seen by the router and the application
///
/// Messages are transient: one is built per submit and one is produced per
/// successfully decoded frame. `sequence` is the per-hop sequence number the
/// frame carried, or 0 for messages that never crossed a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Final destination in the tree
    pub destination: Address,
    /// Original sender
    pub source: Address,
    /// Application payload
    pub payload: Bytes,
    /// Sequence number of the hop that delivered this message
    pub sequence: u32,
}

impl Message {
    /// Create a message that has not yet been sent over a link
    pub fn new(destination: Address, source: Address, payload: impl Into<Bytes>) -> Self {
        Self {
            destination,
            source,
            payload: payload.into(),
            sequence: 0,
        }
    }

    /// Set the hop sequence number
    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    /// Payload length in bytes
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}
