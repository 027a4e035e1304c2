//! # Arbor Simulation
//!
//! Runs whole Arbor meshes inside one process. Each member of a
//! [`MeshPlan`](arbor_node::MeshPlan) becomes a real `MeshNode` on an
//! in-memory link, so routing, sealing and replay protection behave exactly
//! as they would over a radio.
//!
//! - **Mesh** (`mesh.rs`): Builds and runs the nodes of a plan
//! - **Scenarios** (`scenarios.rs`): The chain walkthrough and the random
//!   traffic loop used by `arbor-sim`

pub mod mesh;
pub mod scenarios;

pub use mesh::{Delivered, SimMesh, SimNode, SimStats};
pub use scenarios::{DELIVERY_TIMEOUT, chain_plan, run_chain_scenario, run_plan_scenario};
