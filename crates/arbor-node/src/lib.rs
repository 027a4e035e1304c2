//! # Arbor Node
//!
//! Mesh node orchestrator for Arbor.
//!
//! [`MeshNode`] ties together:
//! - Routing (prefix matching against the neighbor table)
//! - Sealing (AES-128-GCM wire frames bound to the network id)
//! - Replay protection (per-neighbor sequence numbers, throttled persistence)
//! - The link layer (any [`LinkTransport`])
//!
//! Security is hop-by-hop: a frame is opened by the neighbor that receives
//! it, and a relaying node seals a brand new frame for the next hop.
//!
//! ## Example
//!
//! ```rust,ignore
//! use arbor_node::{MeshNode, MeshPlan};
//!
//! let plan = MeshPlan::load("mesh.toml")?;
//! let config = plan.node_config_for(&link.local_addr())?;
//! let node = Arc::new(MeshNode::new(config, Arc::new(link), store)?);
//!
//! node.on_message(|msg| println!("{} says {:?}", msg.source, msg.payload));
//! node.begin().await?;
//!
//! tokio::spawn({
//!     let node = node.clone();
//!     async move { node.run().await }
//! });
//! node.submit(Address::new(&[1, 1])?, b"hi".to_vec()).await?;
//! ```

mod config;
mod error;

pub use config::{MemberPlan, MeshPlan, NeighborConfig, NodeConfig};
pub use error::{NodeError, NodeResult};

use std::collections::HashMap;
use std::sync::Arc;

use arbor_core::{
    Address, Clock, FRAME_SIZE, HardwareAddr, LinkTransport, Message, SystemClock,
    TransportError, channel_for_network,
};
use arbor_crypto::{CodecError, FrameCodec, WireFrame, max_payload};
use arbor_routing::{NeighborTable, Pin, RouteDecision, RoutingError, TreeRouter};
use arbor_storage::{PeerSequenceState, SequenceManager, SequenceStore};
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Mutex as SendLock;
use tracing::{debug, info, instrument, trace, warn};

/// Application callback for messages addressed to this node
pub type MessageCallback = Arc<dyn Fn(&Message) + Send + Sync>;

/// Where a submitted message went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the local application callback
    Local,
    /// Sealed and accepted by the link layer for a neighbor
    Forwarded {
        pin: Pin,
        hardware_addr: HardwareAddr,
        sequence: u32,
    },
}

/// Why an inbound frame was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Not exactly one frame long
    FrameSize(usize),
    /// Failed authentication or carried inconsistent lengths
    Authentication,
    /// Sender is not a configured neighbor
    UnknownPeer,
    /// Sequence number not newer than the last one accepted from the sender
    Replay(u32),
}

/// What happened to an inbound frame
#[derive(Debug)]
pub enum InboundOutcome {
    /// Accepted and routed onwards (or delivered here)
    Routed(Delivery),
    /// Discarded before routing
    Dropped(DropReason),
    /// Accepted, but the onward hop failed
    RouteFailed(NodeError),
}

/// A node in a tree-addressed mesh
///
/// Generic over the link layer `T`, the counter store `S` and the clock `C`
/// that paces persistence. All methods take `&self`, so a node is normally
/// shared as `Arc<MeshNode<..>>` between the receive loop and submitters.
pub struct MeshNode<T, S, C = SystemClock> {
    net_id: u8,
    hardware_addr: HardwareAddr,
    router: TreeRouter,
    /// Hardware address behind each pin, indexed by `pin.index()`
    neighbors: Vec<HardwareAddr>,
    codec: FrameCodec,
    /// Never held across an await
    sequences: Mutex<SequenceManager<S, C>>,
    /// Held from sequence allocation until the frame is handed to the link,
    /// so frames to one neighbor leave in sequence order
    send_locks: HashMap<HardwareAddr, SendLock<()>>,
    transport: Arc<T>,
    callback: RwLock<Option<MessageCallback>>,
}

impl<T: LinkTransport, S: SequenceStore> MeshNode<T, S, SystemClock> {
    /// Create a node using the system clock
    pub fn new(config: NodeConfig, transport: Arc<T>, store: S) -> NodeResult<Self> {
        Self::with_clock(config, transport, store, SystemClock)
    }
}

impl<T: LinkTransport, S: SequenceStore, C: Clock> MeshNode<T, S, C> {
    /// Create a node with an explicit clock
    ///
    /// Loads every neighbor's counters from `store`. Nothing is sent until
    /// [`begin`](Self::begin) registers the neighbors with the link layer.
    #[instrument(skip_all, fields(address = %config.address, hw = %config.hardware_addr))]
    pub fn with_clock(config: NodeConfig, transport: Arc<T>, store: S, clock: C) -> NodeResult<Self> {
        if transport.local_addr() != config.hardware_addr {
            return Err(NodeError::Config(format!(
                "link address {} does not match configured {}",
                transport.local_addr(),
                config.hardware_addr
            )));
        }

        let table = NeighborTable::new(config.neighbors.iter().map(|n| n.address))?;
        let router = TreeRouter::new(config.address, table);
        let neighbors: Vec<HardwareAddr> =
            config.neighbors.iter().map(|n| n.hardware_addr).collect();

        let send_locks = config
            .neighbor_hardware_addrs()
            .into_iter()
            .map(|hw| (hw, SendLock::new(())))
            .collect();

        let sequences = SequenceManager::load(
            store,
            clock,
            config.neighbor_hardware_addrs(),
            config.flush_interval,
        )?;

        info!(
            net_id = config.net_id,
            neighbors = neighbors.len(),
            "Node created"
        );

        Ok(Self {
            net_id: config.net_id,
            hardware_addr: config.hardware_addr,
            router,
            neighbors,
            codec: FrameCodec::new(config.net_id, config.key),
            sequences: Mutex::new(sequences),
            send_locks,
            transport,
            callback: RwLock::new(None),
        })
    }

    /// Our tree address
    pub fn address(&self) -> &Address {
        self.router.address()
    }

    /// Our link-layer address
    pub fn hardware_addr(&self) -> HardwareAddr {
        self.hardware_addr
    }

    /// Network id
    pub fn net_id(&self) -> u8 {
        self.net_id
    }

    /// The router
    pub fn router(&self) -> &TreeRouter {
        &self.router
    }

    /// The link layer
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Current counters for a neighbor
    pub fn sequence_state(&self, peer: &HardwareAddr) -> Option<PeerSequenceState> {
        self.sequences.lock().state(peer).copied()
    }

    /// Register the application callback, replacing any previous one
    pub fn on_message<F>(&self, callback: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        *self.callback.write() = Some(Arc::new(callback));
    }

    /// Largest payload that fits in one frame from us to `dest`
    pub fn max_payload(&self, dest: &Address) -> usize {
        max_payload(self.address().len(), dest.len())
    }

    /// Register every neighbor with the link layer
    ///
    /// All neighbors are attempted even after a failure.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::PeerRegistration`] listing the neighbors the link
    /// layer refused.
    #[instrument(skip(self), fields(address = %self.address()))]
    pub async fn begin(&self) -> NodeResult<()> {
        let channel = channel_for_network(self.net_id);
        let mut failed = Vec::new();

        let mut peers: Vec<HardwareAddr> = Vec::new();
        for hw in &self.neighbors {
            if !peers.contains(hw) {
                peers.push(*hw);
            }
        }

        for peer in peers {
            match self.transport.add_peer(peer, channel).await {
                Ok(()) => debug!(%peer, channel, "Registered neighbor"),
                Err(e) => {
                    warn!(%peer, channel, error = %e, "Failed to register neighbor");
                    failed.push(peer);
                }
            }
        }

        if !failed.is_empty() {
            return Err(NodeError::PeerRegistration { failed });
        }

        info!(channel, "Node started");
        Ok(())
    }

    /// Send `payload` to `dest`
    ///
    /// # Errors
    ///
    /// - [`RoutingError::Unroutable`] if no neighbor leads towards `dest`
    /// - [`CodecError::CapacityExceeded`] if the payload does not fit in one
    ///   frame; no sequence number is used
    /// - [`TransportError`] if the link layer rejects the frame; the sequence
    ///   number is still consumed
    #[instrument(skip(self, payload), fields(address = %self.address(), dest = %dest))]
    pub async fn submit(&self, dest: Address, payload: impl Into<Bytes>) -> NodeResult<Delivery> {
        let message = Message::new(dest, *self.address(), payload);
        self.dispatch(message).await
    }

    /// Route a message originated here or accepted from a neighbor
    async fn dispatch(&self, message: Message) -> NodeResult<Delivery> {
        let pin = match self.router.route(&message.destination) {
            RouteDecision::Local => {
                self.deliver(&message);
                return Ok(Delivery::Local);
            }
            RouteDecision::Unroutable => {
                debug!(dest = %message.destination, "Unroutable");
                return Err(RoutingError::Unroutable.into());
            }
            RouteDecision::Forward(pin) => pin,
        };

        let peer = self.peer_for(pin)?;

        let capacity = max_payload(message.source.len(), message.destination.len());
        if message.payload_len() > capacity {
            return Err(CodecError::CapacityExceeded {
                size: message.payload_len(),
                max: capacity,
            }
            .into());
        }

        let send_lock = self
            .send_locks
            .get(&peer)
            .ok_or(RoutingError::UnknownPin(pin))?;
        let (sequence, sent) = {
            let _in_order = send_lock.lock().await;
            let sequence = self.sequences.lock().next_send_seq(&peer)?;
            let frame = self.codec.encode(&message, sequence)?;
            (sequence, self.transport.transmit(&peer, &frame.to_bytes()).await)
        };

        // Persistence failures are logged by the manager and do not change
        // the outcome of the transmit
        let _ = self.sequences.lock().maybe_flush(&peer);

        match sent {
            Ok(()) => {
                trace!(%pin, %peer, sequence, "Forwarded");
                Ok(Delivery::Forwarded {
                    pin,
                    hardware_addr: peer,
                    sequence,
                })
            }
            Err(e) => {
                debug!(%pin, %peer, sequence, error = %e, "Transmit failed");
                Err(e.into())
            }
        }
    }

    fn peer_for(&self, pin: Pin) -> NodeResult<HardwareAddr> {
        self.neighbors
            .get(pin.index())
            .copied()
            .ok_or_else(|| RoutingError::UnknownPin(pin).into())
    }

    fn deliver(&self, message: &Message) {
        let callback = self.callback.read().clone();
        match callback {
            Some(callback) => callback(message),
            None => debug!(src = %message.source, "No application callback, message discarded"),
        }
    }

    /// Handle raw bytes received from `sender`
    ///
    /// Accepted messages are routed again with their original destination,
    /// source and payload: delivered here or sealed anew for the next hop.
    /// Drops are reported in the outcome and never reach the application.
    #[instrument(skip(self, bytes), fields(address = %self.address(), sender = %sender, len = bytes.len()))]
    pub async fn on_frame_arrived(&self, sender: HardwareAddr, bytes: &[u8]) -> InboundOutcome {
        if bytes.len() != FRAME_SIZE {
            debug!("Dropping frame of wrong size");
            return InboundOutcome::Dropped(DropReason::FrameSize(bytes.len()));
        }

        let frame = match WireFrame::from_bytes(bytes) {
            Ok(frame) => frame,
            Err(_) => return InboundOutcome::Dropped(DropReason::FrameSize(bytes.len())),
        };

        let message = match self.codec.decode(&frame) {
            Ok(message) => message,
            Err(_) => {
                debug!("Dropping unauthenticated frame");
                return InboundOutcome::Dropped(DropReason::Authentication);
            }
        };

        if let Some(reason) = self.check_sequence(&sender, message.sequence) {
            return InboundOutcome::Dropped(reason);
        }

        trace!(
            src = %message.source,
            dest = %message.destination,
            sequence = message.sequence,
            "Accepted frame"
        );

        match self.dispatch(message).await {
            Ok(delivery) => InboundOutcome::Routed(delivery),
            Err(e) => {
                debug!(error = %e, "Onward routing failed");
                InboundOutcome::RouteFailed(e)
            }
        }
    }

    /// Run the replay check for `sender`, persisting on success
    fn check_sequence(&self, sender: &HardwareAddr, sequence: u32) -> Option<DropReason> {
        let mut sequences = self.sequences.lock();

        if sequences.state(sender).is_none() {
            debug!(sequence, "Dropping frame from unknown peer");
            return Some(DropReason::UnknownPeer);
        }

        if !sequences.accept_receive(sender, sequence) {
            return Some(DropReason::Replay(sequence));
        }

        // Persistence failures are logged by the manager; the frame is
        // already accepted
        let _ = sequences.maybe_flush(sender);
        None
    }

    /// Receive and handle one frame
    ///
    /// # Errors
    ///
    /// Returns the link error, e.g. [`TransportError::LinkClosed`].
    pub async fn process_next(&self) -> NodeResult<InboundOutcome> {
        let (sender, bytes) = self.transport.recv().await?;
        Ok(self.on_frame_arrived(sender, &bytes).await)
    }

    /// Handle inbound frames until the link closes
    pub async fn run(&self) -> NodeResult<()> {
        loop {
            match self.process_next().await {
                Ok(outcome) => trace!(?outcome, "Processed frame"),
                Err(NodeError::Transport(TransportError::LinkClosed)) => {
                    info!(address = %self.address(), "Link closed, receive loop stopped");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Persist every neighbor's counters
    ///
    /// Call before dropping the node so a restart resumes exactly where it
    /// stopped.
    #[instrument(skip(self), fields(address = %self.address()))]
    pub fn shutdown(&self) -> NodeResult<()> {
        self.sequences.lock().flush_all()?;
        info!("Node state flushed");
        Ok(())
    }
}
