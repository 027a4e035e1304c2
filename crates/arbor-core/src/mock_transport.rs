//! Mock link implementation for testing
//!
//! Provides an in-memory radio for testing routing and the node orchestrator
//! without real hardware.
//!
//! Two things must hold for a frame to arrive: the receiver must be in radio
//! range of the sender (set up with [`MockLink::connect_to`] or the
//! [`MockLinkBuilder`] topologies), and the sender must have registered the
//! receiver with [`LinkTransport::add_peer`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use arbor_core::{HardwareAddr, LinkTransport, MockLinkBuilder, FRAME_SIZE};
//!
//! let a = HardwareAddr::new([0, 0, 0, 0, 0, 1]);
//! let b = HardwareAddr::new([0, 0, 0, 0, 0, 2]);
//! let (link_a, link_b) = MockLinkBuilder::new().create_connected_pair(a, b);
//!
//! link_a.add_peer(b, 1).await.unwrap();
//! link_a.transmit(&b, &[7u8; FRAME_SIZE]).await.unwrap();
//! let (sender, frame) = link_b.recv().await.unwrap();
//! assert_eq!(sender, a);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, RwLock, mpsc};

use crate::error::TransportError;
use crate::identity::HardwareAddr;
use crate::transport::{FRAME_SIZE, LinkTransport};

/// Frame in flight on the mock radio
#[derive(Debug, Clone)]
pub struct MockFrame {
    /// The sender of the frame
    pub sender: HardwareAddr,
    /// The raw bytes
    pub data: Vec<u8>,
}

/// A mock link for testing
///
/// Frames are delivered via in-memory channels. Every frame accepted by
/// [`LinkTransport::transmit`] is also captured so tests can inspect or
/// replay it.
pub struct MockLink {
    /// Our hardware address
    local: HardwareAddr,
    /// Nodes within radio range (peer -> their inbox)
    in_range: DashMap<HardwareAddr, mpsc::Sender<MockFrame>>,
    /// Peers registered through `add_peer` (peer -> channel)
    registered: DashMap<HardwareAddr, u8>,
    /// Peers whose registration should be refused
    refused: DashSet<HardwareAddr>,
    /// Incoming frame channel receiver
    inbox_rx: Arc<RwLock<mpsc::Receiver<MockFrame>>>,
    /// Incoming frame channel sender (for peers to send to us)
    inbox_tx: mpsc::Sender<MockFrame>,
    /// Frames handed to the radio, in transmit order
    sent: Mutex<Vec<(HardwareAddr, Vec<u8>)>>,
    /// When set, every transmit fails
    fail_transmit: AtomicBool,
    /// Frames lost because the receiver's inbox was full
    overflowed: AtomicUsize,
    closed: AtomicBool,
    close_notify: Notify,
}

impl MockLink {
    /// Create a new mock link with the given hardware address
    pub fn new(local: HardwareAddr) -> Self {
        Self::with_buffer_size(local, 1024)
    }

    /// Create a new mock link with a specific inbox size
    pub fn with_buffer_size(local: HardwareAddr, buffer_size: usize) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel(buffer_size);
        Self {
            local,
            in_range: DashMap::new(),
            registered: DashMap::new(),
            refused: DashSet::new(),
            inbox_rx: Arc::new(RwLock::new(inbox_rx)),
            inbox_tx,
            sent: Mutex::new(Vec::new()),
            fail_transmit: AtomicBool::new(false),
            overflowed: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            close_notify: Notify::new(),
        }
    }

    /// Get the inbox sender for this link
    ///
    /// This is used by other MockLinks to send frames to us.
    pub fn inbox_sender(&self) -> mpsc::Sender<MockFrame> {
        self.inbox_tx.clone()
    }

    /// Put a peer within radio range
    ///
    /// This establishes a one-way path. For bidirectional communication,
    /// the other link should also call `connect_to` on this link.
    pub fn connect_to(&self, peer: HardwareAddr, peer_inbox: mpsc::Sender<MockFrame>) {
        self.in_range.insert(peer, peer_inbox);
    }

    /// Take a peer out of radio range
    pub fn disconnect_from(&self, peer: &HardwareAddr) {
        self.in_range.remove(peer);
    }

    /// Whether a peer is within radio range
    pub fn is_in_range(&self, peer: &HardwareAddr) -> bool {
        self.in_range.contains_key(peer)
    }

    /// Channel a peer was registered on, if any
    pub fn registered_channel(&self, peer: &HardwareAddr) -> Option<u8> {
        self.registered.get(peer).map(|entry| *entry.value())
    }

    /// All registered peers
    pub fn registered_peers(&self) -> Vec<HardwareAddr> {
        self.registered.iter().map(|entry| *entry.key()).collect()
    }

    /// Make future `add_peer` calls for this peer fail
    pub fn refuse_registration(&self, peer: HardwareAddr) {
        self.refused.insert(peer);
    }

    /// Make every subsequent transmit fail (or succeed again)
    pub fn set_fail_transmit(&self, fail: bool) {
        self.fail_transmit.store(fail, Ordering::SeqCst);
    }

    /// Frames accepted by the radio so far, oldest first
    pub fn sent_frames(&self) -> Vec<(HardwareAddr, Vec<u8>)> {
        self.sent.lock().clone()
    }

    /// Number of frames accepted by the radio so far
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Frames accepted by the radio but lost to a full receiver inbox
    pub fn overflow_count(&self) -> usize {
        self.overflowed.load(Ordering::SeqCst)
    }

    /// Forget captured frames
    pub fn clear_sent(&self) {
        self.sent.lock().clear();
    }

    /// Deliver raw bytes to our own inbox as if `sender` had transmitted them
    ///
    /// Used to replay captured frames or feed malformed ones.
    pub async fn inject_frame(
        &self,
        sender: HardwareAddr,
        data: Vec<u8>,
    ) -> Result<(), TransportError> {
        self.inbox_tx
            .send(MockFrame { sender, data })
            .await
            .map_err(|_| TransportError::LinkClosed)
    }

    /// Close the link; pending and future `recv` calls return `LinkClosed`
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.close_notify.notify_one();
    }
}

#[async_trait]
impl LinkTransport for MockLink {
    fn local_addr(&self) -> HardwareAddr {
        self.local
    }

    async fn add_peer(&self, peer: HardwareAddr, channel: u8) -> Result<(), TransportError> {
        if self.refused.contains(&peer) {
            return Err(TransportError::RegistrationFailed(peer.to_string()));
        }
        self.registered.insert(peer, channel);
        Ok(())
    }

    async fn transmit(
        &self,
        peer: &HardwareAddr,
        frame: &[u8; FRAME_SIZE],
    ) -> Result<(), TransportError> {
        if !self.registered.contains_key(peer) {
            return Err(TransportError::PeerNotRegistered(peer.to_string()));
        }
        if self.fail_transmit.load(Ordering::SeqCst) {
            return Err(TransportError::TransmitFailed("injected failure".into()));
        }

        let sender = self
            .in_range
            .get(peer)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TransportError::TransmitFailed(format!("{} out of range", peer)))?;

        self.sent.lock().push((*peer, frame.to_vec()));

        let msg = MockFrame {
            sender: self.local,
            data: frame.to_vec(),
        };
        // Never waits on the receiver: a full inbox loses the frame, as the
        // air would
        match sender.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.overflowed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(TrySendError::Closed(_)) => {
                Err(TransportError::TransmitFailed("channel closed".into()))
            }
        }
    }

    async fn recv(&self) -> Result<(HardwareAddr, Vec<u8>), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::LinkClosed);
        }

        let mut inbox = self.inbox_rx.write().await;
        tokio::select! {
            msg = inbox.recv() => {
                let msg = msg.ok_or(TransportError::LinkClosed)?;
                Ok((msg.sender, msg.data))
            }
            _ = self.close_notify.notified() => Err(TransportError::LinkClosed),
        }
    }
}

/// Builder for creating interconnected mock links
///
/// Links come back with radio range set up but no peers registered;
/// registration is the node's job.
pub struct MockLinkBuilder {
    buffer_size: usize,
}

impl Default for MockLinkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLinkBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self { buffer_size: 1024 }
    }

    /// Set the inbox size for each link
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Create a pair of links within range of each other
    pub fn create_connected_pair(
        &self,
        a: HardwareAddr,
        b: HardwareAddr,
    ) -> (MockLink, MockLink) {
        let link_a = MockLink::with_buffer_size(a, self.buffer_size);
        let link_b = MockLink::with_buffer_size(b, self.buffer_size);

        link_a.connect_to(b, link_b.inbox_sender());
        link_b.connect_to(a, link_a.inbox_sender());

        (link_a, link_b)
    }

    /// Create links where only the listed pairs are within range
    pub fn create_with_links(
        &self,
        ids: &[HardwareAddr],
        links: &[(HardwareAddr, HardwareAddr)],
    ) -> HashMap<HardwareAddr, MockLink> {
        let radios: HashMap<HardwareAddr, MockLink> = ids
            .iter()
            .map(|id| (*id, MockLink::with_buffer_size(*id, self.buffer_size)))
            .collect();

        for (a, b) in links {
            if let (Some(link_a), Some(link_b)) = (radios.get(a), radios.get(b)) {
                link_a.connect_to(*b, link_b.inbox_sender());
                link_b.connect_to(*a, link_a.inbox_sender());
            }
        }

        radios
    }

    /// Create a linear chain of links
    ///
    /// A - B - C - D (each within range of its neighbors only)
    pub fn create_chain(&self, ids: &[HardwareAddr]) -> HashMap<HardwareAddr, MockLink> {
        let links: Vec<_> = ids.windows(2).map(|w| (w[0], w[1])).collect();
        self.create_with_links(ids, &links)
    }

    /// Create links that are all within range of each other
    pub fn create_full_mesh(&self, ids: &[HardwareAddr]) -> HashMap<HardwareAddr, MockLink> {
        let mut links = Vec::new();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                links.push((*a, *b));
            }
        }
        self.create_with_links(ids, &links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hw(n: u8) -> HardwareAddr {
        HardwareAddr::new([0x02, 0, 0, 0, 0, n])
    }

    #[tokio::test]
    async fn test_mock_link_transmit_recv() {
        let (link_a, link_b) = MockLinkBuilder::new().create_connected_pair(hw(1), hw(2));
        link_a.add_peer(hw(2), 1).await.unwrap();

        let frame = [0x5Au8; FRAME_SIZE];
        link_a.transmit(&hw(2), &frame).await.unwrap();

        let (sender, data) = link_b.recv().await.unwrap();
        assert_eq!(sender, hw(1));
        assert_eq!(data, frame.to_vec());
        assert_eq!(link_a.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_transmit_requires_registration() {
        let (link_a, _link_b) = MockLinkBuilder::new().create_connected_pair(hw(1), hw(2));

        let result = link_a.transmit(&hw(2), &[0u8; FRAME_SIZE]).await;
        assert!(matches!(result, Err(TransportError::PeerNotRegistered(_))));
        assert_eq!(link_a.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_transmit_requires_range() {
        let link = MockLink::new(hw(1));
        link.add_peer(hw(9), 3).await.unwrap();
        assert_eq!(link.registered_channel(&hw(9)), Some(3));

        let result = link.transmit(&hw(9), &[0u8; FRAME_SIZE]).await;
        assert!(matches!(result, Err(TransportError::TransmitFailed(_))));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let (link_a, _link_b) = MockLinkBuilder::new().create_connected_pair(hw(1), hw(2));
        link_a.add_peer(hw(2), 1).await.unwrap();
        link_a.set_fail_transmit(true);

        let result = link_a.transmit(&hw(2), &[0u8; FRAME_SIZE]).await;
        assert!(matches!(result, Err(TransportError::TransmitFailed(_))));

        link_a.set_fail_transmit(false);
        assert!(link_a.transmit(&hw(2), &[0u8; FRAME_SIZE]).await.is_ok());
    }

    #[tokio::test]
    async fn test_full_inbox_loses_frame_without_blocking() {
        let (link_a, link_b) = MockLinkBuilder::new()
            .buffer_size(1)
            .create_connected_pair(hw(1), hw(2));
        link_a.add_peer(hw(2), 1).await.unwrap();

        let first = [1u8; FRAME_SIZE];
        link_a.transmit(&hw(2), &first).await.unwrap();
        let second = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            link_a.transmit(&hw(2), &[2u8; FRAME_SIZE]),
        )
        .await
        .unwrap();

        assert!(second.is_ok());
        assert_eq!(link_a.sent_count(), 2);
        assert_eq!(link_a.overflow_count(), 1);

        let (_, data) = link_b.recv().await.unwrap();
        assert_eq!(data, first.to_vec());
    }

    #[tokio::test]
    async fn test_refused_registration() {
        let link = MockLink::new(hw(1));
        link.refuse_registration(hw(2));

        assert!(link.add_peer(hw(2), 1).await.is_err());
        assert!(link.add_peer(hw(3), 1).await.is_ok());
        assert_eq!(link.registered_peers(), vec![hw(3)]);
    }

    #[tokio::test]
    async fn test_inject_frame() {
        let link = MockLink::new(hw(1));
        link.inject_frame(hw(7), vec![1, 2, 3]).await.unwrap();

        let (sender, data) = link.recv().await.unwrap();
        assert_eq!(sender, hw(7));
        assert_eq!(data, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_close_wakes_receiver() {
        let link = Arc::new(MockLink::new(hw(1)));
        let receiver = {
            let link = Arc::clone(&link);
            tokio::spawn(async move { link.recv().await })
        };

        tokio::task::yield_now().await;
        link.close();

        let result = receiver.await.unwrap();
        assert!(matches!(result, Err(TransportError::LinkClosed)));
        assert!(matches!(link.recv().await, Err(TransportError::LinkClosed)));
    }

    #[tokio::test]
    async fn test_chain_topology() {
        let ids = [hw(1), hw(2), hw(3)];
        let links = MockLinkBuilder::new().create_chain(&ids);

        let a = links.get(&hw(1)).unwrap();
        let b = links.get(&hw(2)).unwrap();

        assert!(a.is_in_range(&hw(2)));
        assert!(!a.is_in_range(&hw(3)));
        assert!(b.is_in_range(&hw(1)));
        assert!(b.is_in_range(&hw(3)));
    }

    #[tokio::test]
    async fn test_full_mesh_topology() {
        let ids = [hw(1), hw(2), hw(3), hw(4)];
        let links = MockLinkBuilder::new().create_full_mesh(&ids);

        for a in &ids {
            for b in &ids {
                assert_eq!(links[a].is_in_range(b), a != b);
            }
        }
    }

    #[tokio::test]
    async fn test_disconnect_from() {
        let (link_a, _link_b) = MockLinkBuilder::new().create_connected_pair(hw(1), hw(2));
        link_a.add_peer(hw(2), 1).await.unwrap();
        link_a.disconnect_from(&hw(2));

        assert!(link_a.transmit(&hw(2), &[0u8; FRAME_SIZE]).await.is_err());
    }
}
