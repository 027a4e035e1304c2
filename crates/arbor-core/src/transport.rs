//! Link-layer transport abstraction
//!
//! The [`LinkTransport`] trait is the only thing the node knows about the
//! radio. It is connectionless: frames are handed to a neighbor by hardware
//! address and may be lost, duplicated or reordered.
//!
//! ## Implementations
//!
//! - [`MockLink`](crate::MockLink): In-memory link for tests and simulation

use async_trait::async_trait;

use crate::error::TransportError;
use crate::identity::HardwareAddr;

/// Size of every frame on the link, in bytes
pub const FRAME_SIZE: usize = 250;

/// Number of radio channels a network id can map onto
pub const RADIO_CHANNELS: u8 = 13;

/// Radio channel used by all members of a network
///
/// Channels are numbered `1..=13`; distinct network ids spread over them so
/// that neighboring meshes are unlikely to share a channel.
pub fn channel_for_network(net_id: u8) -> u8 {
    ((net_id as u16 * 7) % RADIO_CHANNELS as u16) as u8 + 1
}

/// Connectionless, fixed-frame link layer
///
/// # Example
///
/// ```rust,ignore
/// use arbor_core::{LinkTransport, HardwareAddr, FRAME_SIZE};
///
/// async fn ping<T: LinkTransport>(link: &T, peer: HardwareAddr) -> Result<(), TransportError> {
///     link.add_peer(peer, 1).await?;
///     link.transmit(&peer, &[0u8; FRAME_SIZE]).await
/// }
/// ```
#[async_trait]
pub trait LinkTransport: Send + Sync {
    /// Hardware address of this node
    fn local_addr(&self) -> HardwareAddr;

    /// Register a neighbor so frames can be sent to it
    ///
    /// # Errors
    ///
    /// Returns an error if the link layer refuses the registration.
    async fn add_peer(&self, peer: HardwareAddr, channel: u8) -> Result<(), TransportError>;

    /// Hand one frame to a registered neighbor
    ///
    /// Success means the link layer accepted the frame, not that the
    /// neighbor received it.
    async fn transmit(
        &self,
        peer: &HardwareAddr,
        frame: &[u8; FRAME_SIZE],
    ) -> Result<(), TransportError>;

    /// Wait for the next inbound frame
    ///
    /// Returns the sender and the raw bytes exactly as received; the length
    /// is not guaranteed to be [`FRAME_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::LinkClosed`] once no more frames can arrive.
    async fn recv(&self) -> Result<(HardwareAddr, Vec<u8>), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_range() {
        for net_id in 0..=u8::MAX {
            let channel = channel_for_network(net_id);
            assert!((1..=13).contains(&channel), "net {net_id} -> {channel}");
        }
    }

    #[test]
    fn test_channel_values() {
        assert_eq!(channel_for_network(0), 1);
        assert_eq!(channel_for_network(1), 8);
        assert_eq!(channel_for_network(2), 2);
        assert_eq!(channel_for_network(255), (255 * 7 % 13) as u8 + 1);
    }

    #[test]
    fn test_transport_trait_is_object_safe() {
        fn assert_dyn(_: Option<&dyn LinkTransport>) {}
        assert_dyn(None);
    }
}
