//! Node configuration and deployment plans
//!
//! A [`NodeConfig`] describes one node. A [`MeshPlan`] describes a whole
//! deployment in TOML; every device loads the same plan and picks its own
//! entry by hardware address:
//!
//! ```toml
//! net_id = 111
//! key = "0102030405060708090a0b0c0d0e0f10"
//!
//! [[members]]
//! mac = "88:13:BF:0B:A6:6C"
//! address = [1, 1, 1]
//! neighbors = ["88:13:BF:0B:62:18"]
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use arbor_core::{Address, HardwareAddr};
use arbor_crypto::NetworkKey;
use arbor_routing::MAX_NEIGHBORS;
use arbor_storage::DEFAULT_FLUSH_INTERVAL;
use serde::Deserialize;

use crate::error::{NodeError, NodeResult};

/// An immediate neighbor: where to send, and which subtree it leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborConfig {
    pub hardware_addr: HardwareAddr,
    pub address: Address,
}

/// Configuration for a MeshNode
///
/// Neighbors keep their insertion order; the first one gets pin 1.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Network id stamped on every frame
    pub net_id: u8,
    /// Key shared by every member of the network
    pub key: NetworkKey,
    /// Our position in the tree
    pub address: Address,
    /// Our link-layer address
    pub hardware_addr: HardwareAddr,
    /// Immediate neighbors, in pin order
    pub neighbors: Vec<NeighborConfig>,
    /// Minimum time between persisting a neighbor's counters
    pub flush_interval: Duration,
}

impl NodeConfig {
    /// Create a configuration with no neighbors
    pub fn new(net_id: u8, key: NetworkKey, address: Address, hardware_addr: HardwareAddr) -> Self {
        Self {
            net_id,
            key,
            address,
            hardware_addr,
            neighbors: Vec::new(),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }

    /// Add a neighbor; it gets the next pin
    pub fn with_neighbor(mut self, hardware_addr: HardwareAddr, address: Address) -> Self {
        self.neighbors.push(NeighborConfig {
            hardware_addr,
            address,
        });
        self
    }

    /// Set the flush interval
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Distinct neighbor hardware addresses, in pin order
    pub fn neighbor_hardware_addrs(&self) -> Vec<HardwareAddr> {
        let mut seen = HashSet::new();
        self.neighbors
            .iter()
            .map(|n| n.hardware_addr)
            .filter(|hw| seen.insert(*hw))
            .collect()
    }
}

fn default_flush_interval_secs() -> u64 {
    DEFAULT_FLUSH_INTERVAL.as_secs()
}

/// One device in a plan
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemberPlan {
    /// Link-layer address, e.g. `"88:13:BF:0B:A6:6C"`
    pub mac: HardwareAddr,
    /// Tree address as an integer array
    pub address: Address,
    /// Hardware addresses of its neighbors, in pin order
    #[serde(default)]
    pub neighbors: Vec<HardwareAddr>,
}

/// A whole deployment: shared network settings plus every member
#[derive(Debug, Clone, Deserialize)]
pub struct MeshPlan {
    pub net_id: u8,
    /// 32 hex characters
    pub key: NetworkKey,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// Member that originates demo traffic, if any
    #[serde(default)]
    pub sender: Option<HardwareAddr>,
    pub members: Vec<MemberPlan>,
}

impl MeshPlan {
    /// Parse and validate a plan
    pub fn from_toml(s: &str) -> NodeResult<Self> {
        let plan: MeshPlan = toml::from_str(s)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Read and validate a plan file
    pub fn load(path: impl AsRef<Path>) -> NodeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    fn validate(&self) -> NodeResult<()> {
        let mut macs = HashSet::new();
        for member in &self.members {
            if !macs.insert(member.mac) {
                return Err(NodeError::Config(format!(
                    "duplicate member {}",
                    member.mac
                )));
            }
        }

        for member in &self.members {
            if member.neighbors.len() > MAX_NEIGHBORS {
                return Err(NodeError::Config(format!(
                    "{} has {} neighbors (max {})",
                    member.mac,
                    member.neighbors.len(),
                    MAX_NEIGHBORS
                )));
            }
            for neighbor in &member.neighbors {
                if *neighbor == member.mac {
                    return Err(NodeError::Config(format!(
                        "{} lists itself as a neighbor",
                        member.mac
                    )));
                }
                if !macs.contains(neighbor) {
                    return Err(NodeError::Config(format!(
                        "{} lists unknown neighbor {}",
                        member.mac, neighbor
                    )));
                }
            }
        }

        if let Some(sender) = self.sender {
            if !macs.contains(&sender) {
                return Err(NodeError::Config(format!("unknown sender {}", sender)));
            }
        }

        Ok(())
    }

    /// The member with this hardware address
    pub fn member(&self, hardware_addr: &HardwareAddr) -> Option<&MemberPlan> {
        self.members.iter().find(|m| m.mac == *hardware_addr)
    }

    /// Flush interval as a duration
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    /// Resolve the configuration of the device with this hardware address
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Config`] if the device is not part of the plan.
    pub fn node_config_for(&self, hardware_addr: &HardwareAddr) -> NodeResult<NodeConfig> {
        let member = self.member(hardware_addr).ok_or_else(|| {
            NodeError::Config(format!("{} is not a member of this plan", hardware_addr))
        })?;

        let mut config = NodeConfig::new(self.net_id, self.key.clone(), member.address, member.mac)
            .with_flush_interval(self.flush_interval());

        for neighbor in &member.neighbors {
            let peer = self.member(neighbor).ok_or_else(|| {
                NodeError::Config(format!("{} lists unknown neighbor {}", member.mac, neighbor))
            })?;
            config = config.with_neighbor(peer.mac, peer.address);
        }

        Ok(config)
    }
}
