//! # Candidate Arena
//!
//! Not-yet-confirmed blocks and their messages, grouped by height. Each
//! height holds the competing candidates keyed by block hash plus the
//! VIEWCHANGE requests for that height keyed by target view.
//!
//! Candidates are iterated in ascending hash order, which is the tie-break
//! order: when several candidates qualify, the smallest hash wins.
//!
//! A validator gets one statement per phase and view at each height: a
//! second PROPOSE, PREPARE or COMMIT for a different hash in the same view
//! is equivocation and is not stored. Together with the view horizon
//! applied at admission this bounds what one signer can make us hold.
//!
//! Everything at or below a confirmed height is evicted with
//! `prune_through`; nothing here is persisted.

use shared_types::{
    Block, ConfirmedBlock, ConsensusMessage, Hash, MessageSet, Phase, ValidatorId,
};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Result of offering a message to the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Accepted,
    /// Already held.
    Duplicate,
    /// The signer already made a different statement in this phase and view.
    Equivocation,
}

/// A proposed block (once its PROPOSE arrives) and its collected messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateBlock {
    pub block: Option<Block>,
    pub messages: MessageSet,
}

impl CandidateBlock {
    /// View the proposal was made in, if the proposal has been seen.
    pub fn proposal_view(&self) -> Option<u64> {
        self.messages.propose.as_ref().map(|m| m.view)
    }

    /// Whether the phase quorum has been reached.
    pub fn has_quorum(&self, phase: Phase, quorum: usize) -> bool {
        self.messages.count(phase) >= quorum
    }

    /// Certificate to persist alongside the block. The proposal's block
    /// payload is dropped; the certificate already sits next to the block.
    pub fn to_confirmed(&self) -> Option<ConfirmedBlock> {
        let block = self.block.clone()?;
        let mut messages = self.messages.clone();
        if let Some(propose) = messages.propose.as_mut() {
            propose.block = None;
        }
        messages.view_change.clear();
        Some(ConfirmedBlock::new(block, messages))
    }
}

#[derive(Debug, Clone, Default)]
struct HeightSlot {
    candidates: BTreeMap<Hash, CandidateBlock>,
    view_changes: BTreeMap<u64, MessageSet>,
    statements: BTreeMap<(Phase, u64, ValidatorId), Hash>,
}

/// Per-height store of candidate blocks.
#[derive(Debug, Clone, Default)]
pub struct CandidateArena {
    heights: BTreeMap<u64, HeightSlot>,
}

impl CandidateArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message.
    ///
    /// Callers verify signatures and membership first.
    pub fn insert(&mut self, message: ConsensusMessage) -> Insertion {
        let slot = self.heights.entry(message.seq).or_default();
        if message.phase == Phase::ViewChange {
            let inserted = slot
                .view_changes
                .entry(message.view)
                .or_default()
                .insert(message);
            return if inserted {
                Insertion::Accepted
            } else {
                Insertion::Duplicate
            };
        }

        match slot
            .statements
            .entry((message.phase, message.view, message.signer))
        {
            Entry::Occupied(held) if held.get() != &message.block_hash => {
                return Insertion::Equivocation;
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(free) => {
                free.insert(message.block_hash);
            }
        }

        let candidate = slot.candidates.entry(message.block_hash).or_default();
        if message.phase == Phase::Propose && candidate.block.is_none() {
            candidate.block = message.block.clone();
        }
        if candidate.messages.insert(message) {
            Insertion::Accepted
        } else {
            Insertion::Duplicate
        }
    }

    pub fn candidate(&self, height: u64, hash: &Hash) -> Option<&CandidateBlock> {
        self.heights.get(&height)?.candidates.get(hash)
    }

    /// Candidates at `height` in ascending hash order.
    pub fn candidates_at(&self, height: u64) -> impl Iterator<Item = (&Hash, &CandidateBlock)> {
        self.heights
            .get(&height)
            .into_iter()
            .flat_map(|slot| slot.candidates.iter())
    }

    /// Smallest-hash candidate at `height` that extends `parent` and holds
    /// a full certificate: `quorum` commits, plus `quorum` prepares when
    /// `require_prepare` is set.
    pub fn decided(
        &self,
        height: u64,
        parent: &Hash,
        quorum: usize,
        require_prepare: bool,
    ) -> Option<Hash> {
        self.candidates_at(height)
            .find(|(_, candidate)| {
                candidate
                    .block
                    .as_ref()
                    .is_some_and(|block| &block.prev_hash == parent)
                    && candidate.has_quorum(Phase::Commit, quorum)
                    && (!require_prepare || candidate.has_quorum(Phase::Prepare, quorum))
            })
            .map(|(hash, _)| *hash)
    }

    /// Number of VIEWCHANGE requests for `view` at `height` anchored on
    /// `anchor` (the last confirmed hash).
    pub fn view_change_votes(&self, height: u64, view: u64, anchor: &Hash) -> usize {
        self.heights
            .get(&height)
            .and_then(|slot| slot.view_changes.get(&view))
            .map(|set| set.view_change.values().filter(|m| &m.block_hash == anchor).count())
            .unwrap_or(0)
    }

    /// Highest view at `height` with at least `threshold` anchored requests.
    pub fn highest_view_with(&self, height: u64, anchor: &Hash, threshold: usize) -> Option<u64> {
        let slot = self.heights.get(&height)?;
        slot.view_changes
            .keys()
            .rev()
            .copied()
            .find(|view| self.view_change_votes(height, *view, anchor) >= threshold)
    }

    /// Every message held for `height`, for status gossip.
    pub fn messages_at(&self, height: u64) -> Vec<ConsensusMessage> {
        let Some(slot) = self.heights.get(&height) else {
            return Vec::new();
        };
        slot.candidates
            .values()
            .flat_map(|c| c.messages.iter())
            .chain(slot.view_changes.values().flat_map(|set| set.iter()))
            .cloned()
            .collect()
    }

    /// Count of PROPOSE, PREPARE and COMMIT messages at `height`.
    pub fn vote_count(&self, height: u64) -> usize {
        self.candidates_at(height)
            .map(|(_, c)| c.messages.len())
            .sum()
    }

    /// Evict every height `<= height`.
    pub fn prune_through(&mut self, height: u64) {
        self.heights = self.heights.split_off(&(height.saturating_add(1)));
    }

    /// Number of heights with pending state.
    pub fn height_count(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }
}
