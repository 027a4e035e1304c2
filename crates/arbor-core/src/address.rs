//! Tree addresses
//!
//! An [`Address`] is the path from the root of the logical tree to a node,
//! e.g. `[]` for the root, `[1]` for its first child and `[1, 2]` for the
//! second child of `[1]`. Components are single bytes because each one is
//! carried as one byte on the wire.
//!
//! The depth limit of [`MAX_ADDRESS_DEPTH`] is a protocol invariant: the
//! frame header stores both address lengths in one byte, four bits each.

use std::fmt::{self, Debug, Display};

use serde::{Deserialize, Serialize};

use crate::error::AddressError;

/// Maximum number of components in an address
pub const MAX_ADDRESS_DEPTH: usize = 15;

/// Fixed-capacity path in the logical tree
///
/// Components beyond `len` are always zero, so the derived equality and
/// hashing are element-wise over the used prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Address {
    components: [u8; MAX_ADDRESS_DEPTH],
    len: u8,
}

impl Address {
    /// The root of the tree (empty address)
    pub const fn root() -> Self {
        Self {
            components: [0; MAX_ADDRESS_DEPTH],
            len: 0,
        }
    }

    /// Create an address from its components
    ///
    /// Fails if the path is deeper than [`MAX_ADDRESS_DEPTH`].
    pub fn new(components: &[u8]) -> Result<Self, AddressError> {
        if components.len() > MAX_ADDRESS_DEPTH {
            return Err(AddressError::TooDeep {
                depth: components.len(),
                max: MAX_ADDRESS_DEPTH,
            });
        }
        Ok(Self::truncated(components))
    }

    /// Create an address, keeping at most [`MAX_ADDRESS_DEPTH`] leading components
    pub fn truncated(components: &[u8]) -> Self {
        let len = components.len().min(MAX_ADDRESS_DEPTH);
        let mut buf = [0u8; MAX_ADDRESS_DEPTH];
        buf[..len].copy_from_slice(&components[..len]);
        Self {
            components: buf,
            len: len as u8,
        }
    }

    /// The used components
    pub fn components(&self) -> &[u8] {
        &self.components[..self.len as usize]
    }

    /// Number of components (depth in the tree)
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether this is the root address
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length of the longest shared leading run of components
    pub fn common_prefix_len(&self, other: &Address) -> usize {
        self.components()
            .iter()
            .zip(other.components())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Whether `self` is a strict prefix of `other`
    pub fn is_ancestor_of(&self, other: &Address) -> bool {
        self.len() < other.len() && other.components().starts_with(self.components())
    }

    /// Whether `other` is a strict prefix of `self`
    pub fn is_descendant_of(&self, other: &Address) -> bool {
        other.is_ancestor_of(self)
    }

    /// Address of the child `component` below this one
    pub fn child(&self, component: u8) -> Result<Self, AddressError> {
        if self.len() == MAX_ADDRESS_DEPTH {
            return Err(AddressError::TooDeep {
                depth: MAX_ADDRESS_DEPTH + 1,
                max: MAX_ADDRESS_DEPTH,
            });
        }
        let mut next = *self;
        next.components[self.len()] = component;
        next.len += 1;
        Ok(next)
    }

    /// Address of the parent, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.is_empty() {
            return None;
        }
        Some(Self::truncated(&self.components()[..self.len() - 1]))
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:?})", self.components())
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.components())
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = AddressError;

    fn try_from(components: &[u8]) -> Result<Self, Self::Error> {
        Self::new(components)
    }
}

impl TryFrom<Vec<u8>> for Address {
    type Error = AddressError;

    fn try_from(components: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(&components)
    }
}

impl From<Address> for Vec<u8> {
    fn from(address: Address) -> Self {
        address.components().to_vec()
    }
}
