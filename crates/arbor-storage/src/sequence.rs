//! Per-peer sequence numbers and replay rejection
//!
//! Every neighbor has two counters: the last sequence number we sent to it
//! and the last one we accepted from it. Both are mirrored to a
//! [`SequenceStore`] at most once per flush interval, so a restart can lose
//! up to one interval of progress. Counters are compared with wrapping
//! arithmetic, so they roll over cleanly after `u32::MAX`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use arbor_core::{Clock, HardwareAddr, SystemClock};
use tracing::{debug, trace, warn};

use crate::SequenceStore;
use crate::error::{SequenceError, SequenceResult};

/// Default time between persisting a peer's counters
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// Store key for the last sequence number sent to `peer`
pub fn send_key(peer: &HardwareAddr) -> String {
    format!("s_{}", peer.to_hex())
}

/// Store key for the last sequence number accepted from `peer`
pub fn seen_key(peer: &HardwareAddr) -> String {
    format!("r_{}", peer.to_hex())
}

/// Whether `seq` is ahead of `last_seen` in wrapping order
///
/// Anything within the next 2^31 - 1 values counts as newer.
pub fn is_newer(seq: u32, last_seen: u32) -> bool {
    (seq.wrapping_sub(last_seen) as i32) > 0
}

/// Counters for one neighbor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerSequenceState {
    pub peer: HardwareAddr,
    pub last_send: u32,
    pub last_seen: u32,
    pub last_flush: Instant,
}

/// Owns the counters of every configured neighbor
///
/// Peers are fixed at load time. Frames from any other sender are rejected
/// and never create state.
pub struct SequenceManager<S, C = SystemClock> {
    store: S,
    clock: C,
    flush_interval: Duration,
    peers: HashMap<HardwareAddr, PeerSequenceState>,
}

impl<S: SequenceStore, C: Clock> SequenceManager<S, C> {
    /// Seed counters for `peers` from the store
    ///
    /// Missing keys start at 0. Every peer's flush timer starts now.
    pub fn load(
        store: S,
        clock: C,
        peers: impl IntoIterator<Item = HardwareAddr>,
        flush_interval: Duration,
    ) -> SequenceResult<Self> {
        let now = clock.now();
        let mut states = HashMap::new();

        for peer in peers {
            let state = PeerSequenceState {
                peer,
                last_send: store.get(&send_key(&peer))?,
                last_seen: store.get(&seen_key(&peer))?,
                last_flush: now,
            };
            debug!(
                peer = %peer,
                last_send = state.last_send,
                last_seen = state.last_seen,
                "Loaded sequence state"
            );
            states.insert(peer, state);
        }

        Ok(Self {
            store,
            clock,
            flush_interval,
            peers: states,
        })
    }

    /// Allocate the next sequence number for a frame to `peer`
    ///
    /// The new value is not persisted until the next flush.
    pub fn next_send_seq(&mut self, peer: &HardwareAddr) -> SequenceResult<u32> {
        let state = self
            .peers
            .get_mut(peer)
            .ok_or(SequenceError::UnknownPeer(*peer))?;
        state.last_send = state.last_send.wrapping_add(1);
        trace!(peer = %peer, sequence = state.last_send, "Allocated send sequence");
        Ok(state.last_send)
    }

    /// Accept `seq` from `peer` if it is newer than anything seen before
    ///
    /// Returns `false` for replays, stale frames and unknown peers, without
    /// changing any state.
    pub fn accept_receive(&mut self, peer: &HardwareAddr, seq: u32) -> bool {
        let Some(state) = self.peers.get_mut(peer) else {
            trace!(peer = %peer, seq, "Sequence from unknown peer");
            return false;
        };

        if !is_newer(seq, state.last_seen) {
            debug!(peer = %peer, seq, last_seen = state.last_seen, "Rejected replayed sequence");
            return false;
        }

        state.last_seen = seq;
        true
    }

    /// Persist `peer`'s counters if the flush interval has elapsed
    ///
    /// Returns whether a write happened.
    pub fn maybe_flush(&mut self, peer: &HardwareAddr) -> SequenceResult<bool> {
        let now = self.clock.now();
        let state = self
            .peers
            .get_mut(peer)
            .ok_or(SequenceError::UnknownPeer(*peer))?;

        if now.saturating_duration_since(state.last_flush) < self.flush_interval {
            return Ok(false);
        }

        Self::write(&self.store, state)?;
        state.last_flush = now;
        Ok(true)
    }

    /// Persist every peer's counters regardless of the interval
    pub fn flush_all(&mut self) -> SequenceResult<()> {
        let now = self.clock.now();
        for state in self.peers.values_mut() {
            Self::write(&self.store, state)?;
            state.last_flush = now;
        }
        debug!(peers = self.peers.len(), "Flushed all sequence state");
        Ok(())
    }

    fn write(store: &S, state: &PeerSequenceState) -> SequenceResult<()> {
        let result = store
            .put(&send_key(&state.peer), state.last_send)
            .and_then(|_| store.put(&seen_key(&state.peer), state.last_seen));

        if let Err(e) = result {
            warn!(peer = %state.peer, error = %e, "Failed to persist sequence state");
            return Err(e.into());
        }

        trace!(
            peer = %state.peer,
            last_send = state.last_send,
            last_seen = state.last_seen,
            "Persisted sequence state"
        );
        Ok(())
    }

    /// Current counters for a peer
    pub fn state(&self, peer: &HardwareAddr) -> Option<&PeerSequenceState> {
        self.peers.get(peer)
    }

    /// Registered peers
    pub fn peers(&self) -> impl Iterator<Item = &HardwareAddr> {
        self.peers.keys()
    }

    /// The backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Time between flushes
    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }
}

#[cfg(test)]
mod tests {
    use arbor_core::ManualClock;

    use super::*;
    use crate::memory::InMemorySequenceStore;

    fn peer(n: u8) -> HardwareAddr {
        HardwareAddr::new([0x88, 0x13, 0xBF, 0x0B, 0x00, n])
    }

    fn manager(
        store: &InMemorySequenceStore,
        clock: &ManualClock,
    ) -> SequenceManager<InMemorySequenceStore, ManualClock> {
        SequenceManager::load(
            store.clone(),
            clock.clone(),
            [peer(1), peer(2)],
            DEFAULT_FLUSH_INTERVAL,
        )
        .unwrap()
    }

    #[test]
    fn test_keys() {
        let p = HardwareAddr::new([0xEC, 0xE3, 0x34, 0x9A, 0xAE, 0x74]);
        assert_eq!(send_key(&p), "s_ece3349aae74");
        assert_eq!(seen_key(&p), "r_ece3349aae74");
    }

    #[test]
    fn test_is_newer() {
        assert!(is_newer(1, 0));
        assert!(!is_newer(0, 0));
        assert!(!is_newer(5, 6));
        assert!(is_newer(0, u32::MAX));
        assert!(is_newer(0x7FFF_FFFF, 0));
        assert!(!is_newer(0x8000_0000, 0));
    }

    #[test]
    fn test_send_sequence_increments() {
        let store = InMemorySequenceStore::new();
        let clock = ManualClock::new();
        let mut mgr = manager(&store, &clock);

        assert_eq!(mgr.next_send_seq(&peer(1)).unwrap(), 1);
        assert_eq!(mgr.next_send_seq(&peer(1)).unwrap(), 2);
        assert_eq!(mgr.next_send_seq(&peer(2)).unwrap(), 1);
    }

    #[test]
    fn test_send_sequence_wraps() {
        let store = InMemorySequenceStore::new();
        store.put(&send_key(&peer(1)), u32::MAX).unwrap();
        let mut mgr = manager(&store, &ManualClock::new());

        assert_eq!(mgr.next_send_seq(&peer(1)).unwrap(), 0);
        assert_eq!(mgr.next_send_seq(&peer(1)).unwrap(), 1);
    }

    #[test]
    fn test_replay_rejected() {
        let store = InMemorySequenceStore::new();
        let mut mgr = manager(&store, &ManualClock::new());

        assert!(mgr.accept_receive(&peer(1), 1));
        assert!(!mgr.accept_receive(&peer(1), 1));
        assert!(mgr.accept_receive(&peer(1), 5));
        assert!(!mgr.accept_receive(&peer(1), 3));
        assert_eq!(mgr.state(&peer(1)).unwrap().last_seen, 5);

        // Peers are independent
        assert!(mgr.accept_receive(&peer(2), 1));
    }

    #[test]
    fn test_receive_wraparound() {
        let store = InMemorySequenceStore::new();
        store.put(&seen_key(&peer(1)), 0xFFFF_FFFF).unwrap();
        let mut mgr = manager(&store, &ManualClock::new());

        assert!(mgr.accept_receive(&peer(1), 5));
        assert!(!mgr.accept_receive(&peer(1), 0xFFFF_FFFE));
        assert_eq!(mgr.state(&peer(1)).unwrap().last_seen, 5);
    }

    #[test]
    fn test_unknown_peer() {
        let store = InMemorySequenceStore::new();
        let mut mgr = manager(&store, &ManualClock::new());
        let stranger = peer(99);

        assert!(matches!(
            mgr.next_send_seq(&stranger),
            Err(SequenceError::UnknownPeer(p)) if p == stranger
        ));
        assert!(!mgr.accept_receive(&stranger, 1));
        assert!(mgr.state(&stranger).is_none());
        assert!(mgr.maybe_flush(&stranger).is_err());
    }

    #[test]
    fn test_flush_throttled() {
        let store = InMemorySequenceStore::new();
        let clock = ManualClock::new();
        let mut mgr = manager(&store, &clock);

        mgr.next_send_seq(&peer(1)).unwrap();
        assert!(!mgr.maybe_flush(&peer(1)).unwrap());
        assert_eq!(store.write_count(), 0);

        clock.advance(Duration::from_secs(9));
        assert!(!mgr.maybe_flush(&peer(1)).unwrap());

        clock.advance(Duration::from_secs(1));
        assert!(mgr.maybe_flush(&peer(1)).unwrap());
        assert_eq!(store.get(&send_key(&peer(1))).unwrap(), 1);
        assert_eq!(store.get(&seen_key(&peer(1))).unwrap(), 0);
        assert_eq!(store.write_count(), 2);

        // Timer restarts after a flush
        assert!(!mgr.maybe_flush(&peer(1)).unwrap());
    }

    #[test]
    fn test_durability_bound() {
        let store = InMemorySequenceStore::new();
        let clock = ManualClock::new();
        let mut mgr = manager(&store, &clock);

        clock.advance(DEFAULT_FLUSH_INTERVAL);
        assert_eq!(mgr.next_send_seq(&peer(1)).unwrap(), 1);
        assert!(mgr.maybe_flush(&peer(1)).unwrap());

        // Three more sends inside the interval are never persisted
        for expected in 2..=4 {
            assert_eq!(mgr.next_send_seq(&peer(1)).unwrap(), expected);
            assert!(!mgr.maybe_flush(&peer(1)).unwrap());
        }

        // Restart without a flush
        drop(mgr);
        let mut restarted = manager(&store, &clock);
        assert_eq!(restarted.state(&peer(1)).unwrap().last_send, 1);
        assert_eq!(restarted.next_send_seq(&peer(1)).unwrap(), 2);
    }

    #[test]
    fn test_flush_all_persists_everything() {
        let store = InMemorySequenceStore::new();
        let clock = ManualClock::new();
        let mut mgr = manager(&store, &clock);

        mgr.next_send_seq(&peer(1)).unwrap();
        mgr.next_send_seq(&peer(1)).unwrap();
        mgr.accept_receive(&peer(2), 40);
        mgr.flush_all().unwrap();

        let restarted = manager(&store, &clock);
        assert_eq!(restarted.state(&peer(1)).unwrap().last_send, 2);
        assert_eq!(restarted.state(&peer(2)).unwrap().last_seen, 40);
    }
}
