//! # Arbor Core
//!
//! Core types, traits, and errors for the Arbor mesh stack.
//!
//! Arbor nodes live in a fixed logical tree. Every node owns a path-shaped
//! [`Address`] and only knows the subtree prefixes advertised by its
//! immediate neighbors. This crate holds the pieces every other crate shares,
//! so that the router, the codec and the node orchestrator can be tested
//! against in-memory collaborators and run unchanged over a real radio link.
//!
//! ## Key Types
//!
//! - [`Address`]: Bounded tree address (at most [`MAX_ADDRESS_DEPTH`] components)
//! - [`HardwareAddr`]: 6-byte link-layer address of a neighbor
//! - [`Message`]: Logical message routed between tree addresses
//!
//! ## Key Traits
//!
//! - [`LinkTransport`]: Connectionless, fixed-frame link layer
//! - [`Clock`]: Time abstraction for testable flush throttling

pub mod address;
pub mod error;
pub mod identity;
pub mod message;
pub mod mock_transport;
pub mod traits;
pub mod transport;

// Re-export main types
pub use address::*;
pub use error::*;
pub use identity::*;
pub use message::*;
pub use mock_transport::*;
pub use traits::*;
pub use transport::*;
