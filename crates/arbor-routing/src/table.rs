//! Neighbor table
//!
//! The [`NeighborTable`] is the only routing state a node has: one entry per
//! immediate neighbor, holding the subtree prefix that neighbor advertises and
//! the pin (local handle) it was assigned. It is built once from static
//! configuration and never changes afterwards.

use arbor_core::Address;
use derive_more::Display;

use crate::error::{RoutingError, RoutingResult};

/// Maximum number of neighbors a table can hold
///
/// Pins are one byte wide and 0 and 255 are reserved.
pub const MAX_NEIGHBORS: usize = 254;

/// Local handle for a neighbor, in `1..=254`
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pin(u8);

impl Pin {
    /// Wrap a raw pin value, rejecting the reserved values 0 and 255
    pub fn new(value: u8) -> Option<Self> {
        (1..=MAX_NEIGHBORS as u8).contains(&value).then_some(Self(value))
    }

    /// Pin of the `index`-th table entry (zero-based)
    fn for_index(index: usize) -> Self {
        Self(index as u8 + 1)
    }

    /// Raw pin value
    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position in the table this pin refers to
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }
}

/// One immediate neighbor as the router sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborRoute {
    /// Address prefix the neighbor is responsible for
    pub subtree: Address,
    /// Handle used to resolve the neighbor at the link layer
    pub pin: Pin,
}

/// Immutable list of neighbors with sequential pins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborTable {
    routes: Vec<NeighborRoute>,
}

impl NeighborTable {
    /// Build a table, assigning pins `1, 2, ...` in iteration order
    pub fn new(subtrees: impl IntoIterator<Item = Address>) -> RoutingResult<Self> {
        let subtrees: Vec<Address> = subtrees.into_iter().collect();
        if subtrees.len() > MAX_NEIGHBORS {
            return Err(RoutingError::TooManyNeighbors {
                count: subtrees.len(),
                max: MAX_NEIGHBORS,
            });
        }

        let routes = subtrees
            .into_iter()
            .enumerate()
            .map(|(i, subtree)| NeighborRoute {
                subtree,
                pin: Pin::for_index(i),
            })
            .collect();

        Ok(Self { routes })
    }

    /// All entries in pin order
    pub fn routes(&self) -> &[NeighborRoute] {
        &self.routes
    }

    /// Look up the entry for a pin
    pub fn get(&self, pin: Pin) -> RoutingResult<&NeighborRoute> {
        self.routes
            .get(pin.index())
            .ok_or(RoutingError::UnknownPin(pin))
    }

    /// Number of neighbors
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(c: &[u8]) -> Address {
        Address::new(c).unwrap()
    }

    #[test]
    fn test_pins_are_sequential() {
        let table = NeighborTable::new([addr(&[]), addr(&[1, 1]), addr(&[1, 2])]).unwrap();

        let pins: Vec<u8> = table.routes().iter().map(|r| r.pin.get()).collect();
        assert_eq!(pins, vec![1, 2, 3]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_get_by_pin() {
        let table = NeighborTable::new([addr(&[2]), addr(&[3])]).unwrap();

        let second = table.routes()[1].pin;
        assert_eq!(table.get(second).unwrap().subtree, addr(&[3]));
        assert_eq!(second.index(), 1);
    }

    #[test]
    fn test_unknown_pin() {
        let small = NeighborTable::new([addr(&[2])]).unwrap();
        let big = NeighborTable::new([addr(&[2]), addr(&[3]), addr(&[4])]).unwrap();
        let foreign = big.routes()[2].pin;

        assert_eq!(small.get(foreign), Err(RoutingError::UnknownPin(foreign)));
    }

    #[test]
    fn test_too_many_neighbors() {
        let subtrees = (0..=MAX_NEIGHBORS).map(|i| addr(&[(i % 256) as u8]));
        let err = NeighborTable::new(subtrees).unwrap_err();
        assert_eq!(
            err,
            RoutingError::TooManyNeighbors {
                count: 255,
                max: 254
            }
        );

        let full = NeighborTable::new((0..MAX_NEIGHBORS).map(|i| addr(&[i as u8]))).unwrap();
        assert_eq!(full.routes().last().unwrap().pin.get(), 254);
    }

    #[test]
    fn test_reserved_pins_rejected() {
        assert!(Pin::new(0).is_none());
        assert!(Pin::new(255).is_none());
        assert_eq!(Pin::new(1).map(Pin::get), Some(1));
        assert_eq!(Pin::new(254).map(Pin::get), Some(254));
        assert_eq!(Pin::new(1).map(Pin::index), Some(0));
        assert_eq!(Pin::new(254).map(Pin::index), Some(MAX_NEIGHBORS - 1));
    }

    #[test]
    fn test_pin_display() {
        let table = NeighborTable::new([addr(&[9])]).unwrap();
        assert_eq!(table.routes()[0].pin.to_string(), "1");
    }
}
