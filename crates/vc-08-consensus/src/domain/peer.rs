//! Transient per-peer liveness state, refreshed every tick.

use shared_types::ValidatorId;
use std::collections::BTreeMap;

/// What the last tick learned about one peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerRuntimeStatus {
    pub reachable: bool,
    pub last_height: u64,
}

/// Liveness table for all registry peers.
#[derive(Debug, Clone, Default)]
pub struct PeerTable {
    peers: BTreeMap<ValidatorId, PeerRuntimeStatus>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful status exchange.
    pub fn record_reachable(&mut self, id: ValidatorId, last_height: u64) {
        self.peers.insert(
            id,
            PeerRuntimeStatus {
                reachable: true,
                last_height,
            },
        );
    }

    /// Record a failed ping or status exchange. The last known height is
    /// kept for diagnostics but no longer drives sync.
    pub fn record_unreachable(&mut self, id: ValidatorId) {
        self.peers.entry(id).or_default().reachable = false;
    }

    /// Stop treating a peer as ahead of `height` for the rest of the tick.
    pub fn demote(&mut self, id: &ValidatorId, height: u64) {
        if let Some(status) = self.peers.get_mut(id) {
            status.last_height = status.last_height.min(height);
        }
    }

    pub fn get(&self, id: &ValidatorId) -> Option<PeerRuntimeStatus> {
        self.peers.get(id).copied()
    }

    pub fn is_reachable(&self, id: &ValidatorId) -> bool {
        self.peers.get(id).is_some_and(|s| s.reachable)
    }

    pub fn reachable_count(&self) -> usize {
        self.peers.values().filter(|s| s.reachable).count()
    }

    pub fn reachable(&self) -> impl Iterator<Item = &ValidatorId> {
        self.peers
            .iter()
            .filter(|(_, s)| s.reachable)
            .map(|(id, _)| id)
    }

    /// Reachable peer with the highest reported height above `height`.
    pub fn best_ahead_of(&self, height: u64) -> Option<(ValidatorId, u64)> {
        self.peers
            .iter()
            .filter(|(_, s)| s.reachable && s.last_height > height)
            .max_by_key(|(_, s)| s.last_height)
            .map(|(id, s)| (*id, s.last_height))
    }
}
