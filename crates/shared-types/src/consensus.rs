//! # Consensus Entities
//!
//! Signed statements exchanged by validators while deciding a height, and
//! the aggregates built from them.
//!
//! A `ConsensusMessage` is an immutable fact: the signer asserts
//! `(phase, view, seq, block_hash)`. Messages are collected per candidate
//! block in a `MessageSet`, keyed by signer so that re-delivery never
//! inflates a quorum count.

use crate::entities::{Block, Hash, PublicKey, Signature, ValidatorId};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use shared_crypto::KeccakHasher;
use std::collections::BTreeMap;

/// Consensus message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Proposer announces a block (carries the block).
    Propose,
    /// Validator vouches for a proposal (three-phase only).
    Prepare,
    /// Validator commits to a block. In single-round agreement this is the
    /// only vote.
    Commit,
    /// Validator asks to rotate the proposer for the current height.
    ViewChange,
}

impl Phase {
    /// Domain-separation tag mixed into the signing digest.
    pub fn tag(&self) -> &'static [u8] {
        match self {
            Phase::Propose => b"PROPOSE",
            Phase::Prepare => b"PREPARE",
            Phase::Commit => b"COMMIT",
            Phase::ViewChange => b"VIEWCHANGE",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Tags are ASCII literals.
        f.write_str(std::str::from_utf8(self.tag()).unwrap_or("?"))
    }
}

/// A signed statement about a candidate block.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusMessage {
    /// Message kind.
    pub phase: Phase,
    /// Proposer-rotation round within the height.
    pub view: u64,
    /// Height being decided.
    pub seq: u64,
    /// Block the statement refers to. For `ViewChange` this is the hash of
    /// the last confirmed block the height builds on.
    pub block_hash: Hash,
    /// The proposed block; present only on `Propose`.
    pub block: Option<Block>,
    /// Signing validator.
    pub signer: PublicKey,
    /// Signature over `signing_digest(phase, view, seq, block_hash)`.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl ConsensusMessage {
    /// Digest a validator signs for `(phase, view, seq, block_hash)`.
    pub fn signing_digest(phase: Phase, view: u64, seq: u64, block_hash: &Hash) -> Hash {
        let mut hasher = KeccakHasher::new();
        hasher
            .update(phase.tag())
            .update_u64(view)
            .update_u64(seq)
            .update(block_hash);
        hasher.finalize()
    }

    /// Build and sign a message. `sign` receives the signing digest.
    pub fn sign_with(
        phase: Phase,
        view: u64,
        seq: u64,
        block_hash: Hash,
        block: Option<Block>,
        signer: PublicKey,
        sign: impl FnOnce(&Hash) -> Signature,
    ) -> Self {
        let digest = Self::signing_digest(phase, view, seq, &block_hash);
        Self {
            phase,
            view,
            seq,
            block_hash,
            block,
            signer,
            signature: sign(&digest),
        }
    }

    /// Digest this message's signature must cover.
    pub fn digest(&self) -> Hash {
        Self::signing_digest(self.phase, self.view, self.seq, &self.block_hash)
    }
}

/// Signed messages collected for one candidate block.
///
/// Insertion is idempotent: each signer occupies at most one slot per phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSet {
    /// The proposal, if it has been seen.
    pub propose: Option<ConsensusMessage>,
    /// PREPARE votes by signer.
    pub prepare: BTreeMap<ValidatorId, ConsensusMessage>,
    /// COMMIT votes by signer.
    pub commit: BTreeMap<ValidatorId, ConsensusMessage>,
    /// VIEWCHANGE requests by signer.
    pub view_change: BTreeMap<ValidatorId, ConsensusMessage>,
}

impl MessageSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message. Returns `false` when the slot was already taken.
    ///
    /// A first-seen message is never replaced, so a signer cannot revise a
    /// statement by re-sending it.
    pub fn insert(&mut self, message: ConsensusMessage) -> bool {
        let slot = match message.phase {
            Phase::Propose => {
                if self.propose.is_some() {
                    return false;
                }
                self.propose = Some(message);
                return true;
            }
            Phase::Prepare => &mut self.prepare,
            Phase::Commit => &mut self.commit,
            Phase::ViewChange => &mut self.view_change,
        };
        if slot.contains_key(&message.signer) {
            return false;
        }
        slot.insert(message.signer, message);
        true
    }

    /// Number of distinct signers for a phase.
    pub fn count(&self, phase: Phase) -> usize {
        match phase {
            Phase::Propose => usize::from(self.propose.is_some()),
            Phase::Prepare => self.prepare.len(),
            Phase::Commit => self.commit.len(),
            Phase::ViewChange => self.view_change.len(),
        }
    }

    /// Whether `signer` already has a message for `phase`.
    pub fn has_signed(&self, phase: Phase, signer: &ValidatorId) -> bool {
        match phase {
            Phase::Propose => self.propose.as_ref().is_some_and(|m| &m.signer == signer),
            Phase::Prepare => self.prepare.contains_key(signer),
            Phase::Commit => self.commit.contains_key(signer),
            Phase::ViewChange => self.view_change.contains_key(signer),
        }
    }

    /// All messages, proposal first.
    pub fn iter(&self) -> impl Iterator<Item = &ConsensusMessage> {
        self.propose
            .iter()
            .chain(self.prepare.values())
            .chain(self.commit.values())
            .chain(self.view_change.values())
    }

    /// Total number of messages across all phases.
    pub fn len(&self) -> usize {
        self.count(Phase::Propose) + self.prepare.len() + self.commit.len() + self.view_change.len()
    }

    /// True when no message has been collected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A finalized block with the messages proving its quorum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedBlock {
    /// The block.
    pub block: Block,
    /// Quorum certificate.
    pub messages: MessageSet,
}

impl ConfirmedBlock {
    /// Pair a block with its certificate.
    pub fn new(block: Block, messages: MessageSet) -> Self {
        Self { block, messages }
    }

    /// Hash of the confirmed block.
    pub fn hash(&self) -> Hash {
        self.block.hash()
    }

    /// Height of the confirmed block.
    pub fn height(&self) -> u64 {
        self.block.height
    }
}

/// Signed status report exchanged once per tick with every reachable peer.
///
/// Besides the sender's chain head it piggybacks every consensus message the
/// sender holds for the height it is deciding, so validators that missed a
/// broadcast still converge.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    /// Sender's last confirmed height.
    pub last_height: u64,
    /// Hash of the sender's last confirmed block.
    pub last_hash: Hash,
    /// Unconfirmed messages for `last_height + 1`.
    pub messages: Vec<ConsensusMessage>,
    /// Unix timestamp (ms) at creation.
    pub timestamp: u64,
    /// Sending validator.
    pub signer: PublicKey,
    /// Signature over `digest()`.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl NodeStatus {
    /// Build and sign a status report. `sign` receives the signing digest.
    pub fn sign_with(
        last_height: u64,
        last_hash: Hash,
        messages: Vec<ConsensusMessage>,
        timestamp: u64,
        signer: PublicKey,
        sign: impl FnOnce(&Hash) -> Signature,
    ) -> Self {
        let mut status = Self {
            last_height,
            last_hash,
            messages,
            timestamp,
            signer,
            signature: [0u8; 64],
        };
        status.signature = sign(&status.digest());
        status
    }

    /// Digest covering every field except the signature. Piggybacked
    /// messages are bound through their own digests and signatures.
    pub fn digest(&self) -> Hash {
        let mut hasher = KeccakHasher::new();
        hasher
            .update(b"STATUS")
            .update_u64(self.last_height)
            .update(&self.last_hash)
            .update_u64(self.timestamp)
            .update(&self.signer)
            .update_u64(self.messages.len() as u64);
        for message in &self.messages {
            hasher
                .update(&message.digest())
                .update(&message.signer)
                .update(&message.signature);
        }
        hasher.finalize()
    }
}
