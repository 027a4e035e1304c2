//! Node context injection for multi-node logging
//!
//! Several nodes often share one process (the simulator runs a whole mesh).
//! A [`NodeContextGuard`] marks the current thread as acting for one node so
//! that spans created in its scope carry that node's tree address and
//! hardware address.

use std::cell::RefCell;

use arbor_core::{Address, HardwareAddr};
use uuid::Uuid;

/// Node context data stored in thread-local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContextData {
    /// Tree address, e.g. `[1, 1]`
    pub address: String,
    /// Link-layer address, e.g. `88:13:BF:0B:A6:6C`
    pub hardware_addr: String,
    /// Unique instance ID for this node session
    pub instance_id: Uuid,
}

impl NodeContextData {
    pub fn new(address: &Address, hardware_addr: &HardwareAddr) -> Self {
        Self::with_instance_id(address, hardware_addr, Uuid::new_v4())
    }

    /// Keep a fixed instance ID, e.g. across a simulated restart
    pub fn with_instance_id(
        address: &Address,
        hardware_addr: &HardwareAddr,
        instance_id: Uuid,
    ) -> Self {
        Self {
            address: address.to_string(),
            hardware_addr: hardware_addr.to_string(),
            instance_id,
        }
    }
}

thread_local! {
    static NODE_CONTEXT: RefCell<Option<NodeContextData>> = const { RefCell::new(None) };
}

/// RAII guard for node context
///
/// Sets the node context for the current thread and restores the previous
/// one on drop. Do not hold it across an `.await`: the task may resume on
/// another thread.
///
/// ```ignore
/// let _guard = NodeContextGuard::new(&address, &hardware_addr);
/// let span = tracing::info_span!("node");
/// ```
pub struct NodeContextGuard {
    previous: Option<NodeContextData>,
}

impl NodeContextGuard {
    /// Act for the node at `address` with link address `hardware_addr`
    pub fn new(address: &Address, hardware_addr: &HardwareAddr) -> Self {
        Self::enter(NodeContextData::new(address, hardware_addr))
    }

    /// Install prepared context data
    pub fn enter(data: NodeContextData) -> Self {
        let previous = NODE_CONTEXT.with(|ctx| ctx.borrow_mut().replace(data));
        Self { previous }
    }

    /// Get the current node context (if any)
    pub fn current() -> Option<NodeContextData> {
        NODE_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    /// Get the current tree address (if set)
    pub fn current_address() -> Option<String> {
        Self::current().map(|ctx| ctx.address)
    }
}

impl Drop for NodeContextGuard {
    fn drop(&mut self) {
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}
