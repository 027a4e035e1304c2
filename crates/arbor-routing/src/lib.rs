//! # Arbor Routing
//!
//! Prefix-matching router for tree-addressed meshes.
//!
//! A node knows its own [`Address`](arbor_core::Address) and the subtree
//! prefixes of its immediate neighbors, nothing more. Every routing decision
//! is made from that local view, hop by hop.
//!
//! ## Core Components
//!
//! - [`route`]: Pure decision function (local / forward to pin / unroutable)
//! - [`NeighborTable`]: Immutable neighbor list with sequential pins
//! - [`TreeRouter`]: A node's address and table bundled together
//!
//! ## Example
//!
//! ```rust,ignore
//! use arbor_core::Address;
//! use arbor_routing::{NeighborTable, RouteDecision, TreeRouter};
//!
//! let table = NeighborTable::new([Address::root(), Address::new(&[1, 1])?])?;
//! let router = TreeRouter::new(Address::new(&[1])?, table);
//!
//! match router.route(&Address::new(&[1, 1])?) {
//!     RouteDecision::Local => { /* deliver */ }
//!     RouteDecision::Forward(pin) => { /* transmit to neighbor */ }
//!     RouteDecision::Unroutable => { /* report to caller */ }
//! }
//! ```

pub mod error;
pub mod router;
pub mod table;

// Re-export main types
pub use error::{RoutingError, RoutingResult};
pub use router::{RouteDecision, TreeRouter, best_neighbor, match_score, route};
pub use table::{MAX_NEIGHBORS, NeighborRoute, NeighborTable, Pin};
