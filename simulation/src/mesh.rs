//! A whole mesh plan running in one process
//!
//! Every member gets its own [`MeshNode`] on a [`MockLink`]. Links are in
//! range exactly where the plan lists a neighbor relationship, and each
//! node's receive loop runs as its own task.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use arbor_core::{Address, HardwareAddr, LinkTransport, Message, MockLink, MockLinkBuilder};
use arbor_logging::NodeContextGuard;
use arbor_node::{Delivery, MeshNode, MeshPlan, NodeError, NodeResult};
use arbor_storage::InMemorySequenceStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

/// Node type used by the simulator
pub type SimNode = MeshNode<MockLink, InMemorySequenceStore>;

/// A message that reached the application of some node
#[derive(Debug, Clone)]
pub struct Delivered {
    /// Address of the node that delivered it
    pub at: Address,
    pub message: Message,
}

/// Counters for a simulation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimStats {
    pub submitted: u64,
    pub delivered: u64,
    pub unroutable: u64,
    pub failed: u64,
    pub lost: u64,
}

struct Member {
    node: Arc<SimNode>,
    task: JoinHandle<NodeResult<()>>,
}

/// Every member of a plan, wired together and running
pub struct SimMesh {
    members: BTreeMap<HardwareAddr, Member>,
    deliveries: mpsc::UnboundedReceiver<Delivered>,
    pub stats: SimStats,
}

impl SimMesh {
    /// Build and start one node per plan member
    pub async fn start(plan: &MeshPlan) -> NodeResult<Self> {
        let ids: Vec<HardwareAddr> = plan.members.iter().map(|m| m.mac).collect();

        let mut pairs = HashSet::new();
        for member in &plan.members {
            for neighbor in &member.neighbors {
                let pair = if member.mac < *neighbor {
                    (member.mac, *neighbor)
                } else {
                    (*neighbor, member.mac)
                };
                pairs.insert(pair);
            }
        }
        let pairs: Vec<_> = pairs.into_iter().collect();
        let mut links = MockLinkBuilder::new().create_with_links(&ids, &pairs);

        let (tx, deliveries) = mpsc::unbounded_channel();
        let mut members = BTreeMap::new();

        for id in ids {
            let config = plan.node_config_for(&id)?;
            let link = links
                .remove(&id)
                .ok_or_else(|| NodeError::Config(format!("no link for {}", id)))?;

            // Spans created here carry this node's identity
            let (node, span) = {
                let _ctx = NodeContextGuard::new(&config.address, &config.hardware_addr);
                let span = info_span!("node", address = %config.address, hw = %id);
                let node = span.in_scope(|| {
                    MeshNode::new(config, Arc::new(link), InMemorySequenceStore::new())
                })?;
                (Arc::new(node), span)
            };

            let at = *node.address();
            let tx = tx.clone();
            node.on_message(move |message| {
                info!(src = %message.source, len = message.payload_len(), "Delivered");
                let _ = tx.send(Delivered {
                    at,
                    message: message.clone(),
                });
            });

            node.begin().instrument(span.clone()).await?;

            let task = tokio::spawn({
                let node = node.clone();
                async move { node.run().await }.instrument(span)
            });

            members.insert(id, Member { node, task });
        }

        info!(members = members.len(), "Mesh started");
        Ok(Self {
            members,
            deliveries,
            stats: SimStats::default(),
        })
    }

    /// The node with this hardware address
    pub fn node(&self, hw: &HardwareAddr) -> Option<&Arc<SimNode>> {
        self.members.get(hw).map(|m| &m.node)
    }

    /// Tree addresses of every member except `hw`
    pub fn destinations_from(&self, hw: &HardwareAddr) -> Vec<Address> {
        self.members
            .iter()
            .filter(|(id, _)| *id != hw)
            .map(|(_, m)| *m.node.address())
            .collect()
    }

    /// Submit from `from` and wait up to `timeout` for the delivery
    ///
    /// Returns the delivery record, or `None` if the message was rejected at
    /// the source or never arrived. Either way the outcome is counted.
    pub async fn send_and_wait(
        &mut self,
        from: &HardwareAddr,
        dest: Address,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> NodeResult<Option<Delivered>> {
        let node = self
            .node(from)
            .cloned()
            .ok_or_else(|| NodeError::Config(format!("{} is not in the mesh", from)))?;

        self.stats.submitted += 1;
        match node.submit(dest, payload).await {
            Ok(Delivery::Local) | Ok(Delivery::Forwarded { .. }) => {}
            Err(e) if e.is_unroutable() => {
                self.stats.unroutable += 1;
                return Ok(None);
            }
            Err(e) => {
                warn!(%dest, error = %e, "Submit failed");
                self.stats.failed += 1;
                return Ok(None);
            }
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.deliveries.recv()).await {
                Ok(Some(delivered)) if delivered.message.destination == dest => {
                    self.stats.delivered += 1;
                    return Ok(Some(delivered));
                }
                Ok(Some(other)) => {
                    debug!(at = %other.at, dest = %other.message.destination, "Unrelated delivery");
                }
                Ok(None) | Err(_) => {
                    self.stats.lost += 1;
                    return Ok(None);
                }
            }
        }
    }

    /// Close every link, wait for the receive loops and flush all state
    pub async fn shutdown(self) -> NodeResult<SimStats> {
        for member in self.members.values() {
            member.node.transport().close();
        }

        for (id, member) in self.members {
            match member.task.await {
                Ok(result) => result?,
                Err(e) => warn!(hw = %id, error = %e, "Receive loop panicked"),
            }
            member.node.shutdown()?;
        }

        Ok(self.stats)
    }

    /// Link address of every member
    pub fn members(&self) -> impl Iterator<Item = HardwareAddr> + '_ {
        self.members.values().map(|m| m.node.transport().local_addr())
    }
}
