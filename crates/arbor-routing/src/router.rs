//! Prefix-matching tree router
//!
//! Routing is decided from local knowledge only: the node's own address and
//! the subtree prefixes its immediate neighbors advertise.
//!
//! ## Routing Algorithm
//!
//! Every neighbor is scored by how well its subtree matches the destination:
//! the length of the shared prefix, minus the number of subtree components
//! past that prefix. The best-scoring neighbor is chosen (longer subtree
//! wins ties, then the earlier table entry). The node compares that against
//! its own score for the destination:
//!
//! 1. **LOCAL**: The destination is this node
//! 2. **ABSORB**: The destination is below this node and no neighbor below
//!    this node matches better, so the message is delivered here
//! 3. **UNROUTABLE**: No neighbor scores strictly better than this node
//! 4. **FORWARD**: Hand the message to the best neighbor

use arbor_core::Address;
use tracing::{debug, trace};

use crate::error::{RoutingError, RoutingResult};
use crate::table::{NeighborRoute, NeighborTable, Pin};

/// Outcome of a routing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Deliver to the application on this node
    Local,
    /// Transmit to the neighbor with this pin
    Forward(Pin),
    /// No neighbor is closer to the destination
    Unroutable,
}

impl RouteDecision {
    /// Convert into a result, treating `Unroutable` as an error
    pub fn into_result(self) -> RoutingResult<Option<Pin>> {
        match self {
            RouteDecision::Local => Ok(None),
            RouteDecision::Forward(pin) => Ok(Some(pin)),
            RouteDecision::Unroutable => Err(RoutingError::Unroutable),
        }
    }
}

/// Score of `subtree` as a route towards `dest`
///
/// Shared leading components count for the route, components of `subtree`
/// past the shared run count against it.
pub fn match_score(subtree: &Address, dest: &Address) -> i32 {
    let shared = subtree.common_prefix_len(dest) as i32;
    let excess = subtree.len() as i32 - shared;
    shared - excess
}

/// Pick the neighbor whose subtree best matches `dest`
///
/// Returns the entry and its score. A later entry replaces the current best
/// only with a strictly higher score, or an equal score and a strictly longer
/// subtree.
pub fn best_neighbor<'a>(
    dest: &Address,
    neighbors: &'a [NeighborRoute],
) -> Option<(&'a NeighborRoute, i32)> {
    let mut iter = neighbors.iter();
    let first = iter.next()?;
    let mut best = (first, match_score(&first.subtree, dest));

    for candidate in iter {
        let score = match_score(&candidate.subtree, dest);
        trace!(subtree = %candidate.subtree, pin = %candidate.pin, score, "Scored neighbor");
        if score > best.1 || (score == best.1 && candidate.subtree.len() > best.0.subtree.len()) {
            best = (candidate, score);
        }
    }

    Some(best)
}

/// Decide what to do with a message for `dest` at the node `you`
///
/// Pure function: the same inputs always give the same decision.
pub fn route(you: &Address, dest: &Address, neighbors: &[NeighborRoute]) -> RouteDecision {
    if dest == you {
        return RouteDecision::Local;
    }

    let Some((best, best_score)) = best_neighbor(dest, neighbors) else {
        debug!(%you, %dest, "No neighbors configured");
        return RouteDecision::Unroutable;
    };

    let own_score = match_score(you, dest);

    // A destination below us with no better-matching neighbor below us is
    // absorbed here, even if that exact node does not exist.
    if dest.is_descendant_of(you)
        && (!best.subtree.is_descendant_of(you) || best_score < own_score)
    {
        trace!(%you, %dest, best_score, own_score, "Absorbing descendant locally");
        return RouteDecision::Local;
    }

    if best_score <= own_score {
        debug!(%you, %dest, best_score, own_score, "No neighbor closer than self");
        return RouteDecision::Unroutable;
    }

    trace!(%you, %dest, pin = %best.pin, best_score, own_score, "Forwarding");
    RouteDecision::Forward(best.pin)
}

/// Router bound to one node's address and neighbor table
#[derive(Debug, Clone)]
pub struct TreeRouter {
    /// Our own address
    address: Address,
    /// Immediate neighbors
    table: NeighborTable,
}

impl TreeRouter {
    /// Create a router for the node at `address`
    pub fn new(address: Address, table: NeighborTable) -> Self {
        Self { address, table }
    }

    /// Our own address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The neighbor table
    pub fn table(&self) -> &NeighborTable {
        &self.table
    }

    /// Route a message for `dest`
    pub fn route(&self, dest: &Address) -> RouteDecision {
        route(&self.address, dest, self.table.routes())
    }

    /// Look up the neighbor behind a pin
    pub fn neighbor(&self, pin: Pin) -> RoutingResult<&NeighborRoute> {
        self.table.get(pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(c: &[u8]) -> Address {
        Address::new(c).unwrap()
    }

    fn table(subtrees: &[&[u8]]) -> NeighborTable {
        NeighborTable::new(subtrees.iter().map(|s| addr(s))).unwrap()
    }

    fn pin(n: u8) -> Pin {
        Pin::new(n).unwrap()
    }

    #[test]
    fn test_match_score() {
        assert_eq!(match_score(&addr(&[1]), &addr(&[1, 1])), 1);
        assert_eq!(match_score(&addr(&[1, 1]), &addr(&[1, 1])), 2);
        assert_eq!(match_score(&addr(&[1, 2]), &addr(&[1, 1])), 0);
        assert_eq!(match_score(&addr(&[2, 2]), &addr(&[1, 1])), -2);
        assert_eq!(match_score(&Address::root(), &addr(&[1, 1])), 0);
        assert_eq!(match_score(&addr(&[1, 1, 1]), &addr(&[1])), 0);
    }

    #[test]
    fn test_self_is_local() {
        let you = addr(&[1]);
        assert_eq!(route(&you, &you, &[]), RouteDecision::Local);
        assert_eq!(
            route(&you, &you, table(&[&[], &[1, 1]]).routes()),
            RouteDecision::Local
        );
    }

    #[test]
    fn test_empty_table_unroutable() {
        assert_eq!(
            route(&addr(&[1]), &addr(&[2]), &[]),
            RouteDecision::Unroutable
        );
        // Even a descendant cannot be absorbed without neighbors
        assert_eq!(
            route(&addr(&[1]), &addr(&[1, 1]), &[]),
            RouteDecision::Unroutable
        );
    }

    #[test]
    fn test_forward_down_the_tree() {
        // Node [1] with parent [] and child [1,1]
        let neighbors = table(&[&[], &[1, 1]]);
        assert_eq!(
            route(&addr(&[1]), &addr(&[1, 1]), neighbors.routes()),
            RouteDecision::Forward(pin(2))
        );
        assert_eq!(
            route(&addr(&[1]), &addr(&[1, 1, 5]), neighbors.routes()),
            RouteDecision::Forward(pin(2))
        );
    }

    #[test]
    fn test_forward_up_the_tree() {
        // Node [1,1] with parent [1]
        let neighbors = table(&[&[1]]);
        assert_eq!(
            route(&addr(&[1, 1]), &Address::root(), neighbors.routes()),
            RouteDecision::Forward(pin(1))
        );
        assert_eq!(
            route(&addr(&[1, 1]), &addr(&[1]), neighbors.routes()),
            RouteDecision::Forward(pin(1))
        );
    }

    #[test]
    fn test_root_forwards_to_child() {
        let neighbors = table(&[&[1]]);
        assert_eq!(
            route(&Address::root(), &addr(&[1, 1]), neighbors.routes()),
            RouteDecision::Forward(pin(1))
        );
    }

    #[test]
    fn test_sibling_goes_up_through_parent() {
        let neighbors = table(&[&[], &[1, 1]]);
        assert_eq!(
            route(&addr(&[1]), &addr(&[2]), neighbors.routes()),
            RouteDecision::Forward(pin(1))
        );
    }

    #[test]
    fn test_no_upward_route_is_unroutable() {
        // Node [1] only knows its child; nothing scores better than [1]
        // itself for an address outside its subtree.
        let neighbors = table(&[&[1, 1]]);
        assert_eq!(
            route(&addr(&[1]), &addr(&[2]), neighbors.routes()),
            RouteDecision::Unroutable
        );
        assert_eq!(
            route(&addr(&[1]), &Address::root(), neighbors.routes()),
            RouteDecision::Unroutable
        );
    }

    #[test]
    fn test_absorbs_unknown_descendant() {
        // [1,2] is below [1], but the only child is [1,1] which does not
        // match better than [1] itself. The message is delivered locally.
        let neighbors = table(&[&[], &[1, 1]]);
        assert_eq!(
            route(&addr(&[1]), &addr(&[1, 2]), neighbors.routes()),
            RouteDecision::Local
        );
    }

    #[test]
    fn test_absorbs_when_no_child_neighbor() {
        // Only the parent is known; any descendant is absorbed
        let neighbors = table(&[&[]]);
        assert_eq!(
            route(&addr(&[1]), &addr(&[1, 7, 3]), neighbors.routes()),
            RouteDecision::Local
        );
    }

    #[test]
    fn test_tie_prefers_longer_subtree() {
        // [1] and [1,1,9] both score 1 against [1,1,2]; the longer one wins
        let neighbors = table(&[&[1], &[1, 1, 9]]);
        assert_eq!(match_score(&addr(&[1]), &addr(&[1, 1, 2])), 1);
        assert_eq!(match_score(&addr(&[1, 1, 9]), &addr(&[1, 1, 2])), 1);

        let (best, _) = best_neighbor(&addr(&[1, 1, 2]), neighbors.routes()).unwrap();
        assert_eq!(best.pin, pin(2));
    }

    #[test]
    fn test_full_tie_prefers_earlier_entry() {
        let neighbors = table(&[&[2], &[3]]);
        let (best, score) = best_neighbor(&addr(&[4]), neighbors.routes()).unwrap();
        assert_eq!(best.pin, pin(1));
        assert_eq!(score, -1);
    }

    #[test]
    fn test_deterministic() {
        let neighbors = table(&[&[], &[1, 1], &[1, 2], &[1, 3, 4]]);
        let you = addr(&[1]);
        for dest in [addr(&[1, 3, 4, 1]), addr(&[9]), addr(&[1, 2]), Address::root()] {
            let first = route(&you, &dest, neighbors.routes());
            for _ in 0..10 {
                assert_eq!(route(&you, &dest, neighbors.routes()), first);
            }
        }
    }

    #[test]
    fn test_tree_router() {
        let router = TreeRouter::new(addr(&[1]), table(&[&[], &[1, 1]]));

        assert_eq!(router.address(), &addr(&[1]));
        assert_eq!(router.route(&addr(&[1])), RouteDecision::Local);
        assert_eq!(router.route(&Address::root()), RouteDecision::Forward(pin(1)));
        assert_eq!(router.route(&addr(&[1, 1])), RouteDecision::Forward(pin(2)));
        assert_eq!(router.neighbor(pin(2)).unwrap().subtree, addr(&[1, 1]));
        assert!(router.neighbor(pin(3)).is_err());
    }

    #[test]
    fn test_into_result() {
        assert_eq!(RouteDecision::Local.into_result(), Ok(None));
        assert_eq!(RouteDecision::Forward(pin(4)).into_result(), Ok(Some(pin(4))));
        assert_eq!(
            RouteDecision::Unroutable.into_result(),
            Err(RoutingError::Unroutable)
        );
    }
}
