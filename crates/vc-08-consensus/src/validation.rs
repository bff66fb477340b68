//! Stateless verification of messages, status reports and certificates.
//!
//! Nothing here consults the chain head or the candidate arena; callers
//! add the height and parent checks that need engine state.

use crate::domain::{ConsensusError, ConsensusResult, ValidatorRegistry};
use crate::ports::SignatureVerifier;
use shared_types::{
    short_hash, Block, ConfirmedBlock, ConsensusMessage, Hash, NodeStatus, Phase, ValidatorId,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Verifies signatures and structure against the registry.
#[derive(Clone)]
pub struct MessageValidator {
    registry: Arc<ValidatorRegistry>,
    verifier: Arc<dyn SignatureVerifier>,
    max_txs_per_block: usize,
}

impl MessageValidator {
    pub fn new(
        registry: Arc<ValidatorRegistry>,
        verifier: Arc<dyn SignatureVerifier>,
        max_txs_per_block: usize,
    ) -> Self {
        Self {
            registry,
            verifier,
            max_txs_per_block,
        }
    }

    fn require_member(&self, id: &ValidatorId) -> ConsensusResult<()> {
        if self.registry.is_member(id) {
            Ok(())
        } else {
            Err(ConsensusError::UnknownValidator(short_hash(id)))
        }
    }

    /// Check membership, the signature and, for PROPOSE, the carried block.
    pub fn verify_message(&self, message: &ConsensusMessage) -> ConsensusResult<()> {
        self.require_member(&message.signer)?;

        if !self
            .verifier
            .verify(&message.signer, &message.digest(), &message.signature)
        {
            return Err(ConsensusError::SignatureVerificationFailed {
                phase: message.phase,
                signer: short_hash(&message.signer),
            });
        }

        match (&message.phase, &message.block) {
            (Phase::Propose, Some(block)) => self.verify_proposal(message, block),
            (Phase::Propose, None) => Err(ConsensusError::InvalidProposal(
                "missing block payload".to_string(),
            )),
            (phase, Some(_)) => Err(ConsensusError::UnexpectedPayload(*phase)),
            (_, None) => Ok(()),
        }
    }

    fn verify_proposal(&self, message: &ConsensusMessage, block: &Block) -> ConsensusResult<()> {
        if block.hash() != message.block_hash {
            return Err(ConsensusError::InvalidProposal(
                "block hash does not match message".to_string(),
            ));
        }
        if block.height != message.seq {
            return Err(ConsensusError::InvalidProposal(format!(
                "block height {} for sequence {}",
                block.height, message.seq
            )));
        }
        if block.proposer != message.signer {
            return Err(ConsensusError::InvalidProposal(
                "block producer is not the message signer".to_string(),
            ));
        }
        if self.registry.proposer_for(message.seq, message.view) != &message.signer {
            return Err(ConsensusError::WrongProposer {
                seq: message.seq,
                view: message.view,
            });
        }
        self.verify_block(block)
    }

    /// Producer membership, producer signature and size limits.
    pub fn verify_block(&self, block: &Block) -> ConsensusResult<()> {
        self.require_member(&block.proposer)?;
        if block.transactions.len() > self.max_txs_per_block {
            return Err(ConsensusError::InvalidProposal(format!(
                "{} transactions exceeds limit {}",
                block.transactions.len(),
                self.max_txs_per_block
            )));
        }
        if !self
            .verifier
            .verify(&block.proposer, &block.hash(), &block.signature)
        {
            return Err(ConsensusError::InvalidProposal(
                "producer signature does not verify".to_string(),
            ));
        }
        Ok(())
    }

    /// Check a status report came from `expected` and is intact.
    pub fn verify_status(&self, status: &NodeStatus, expected: &ValidatorId) -> ConsensusResult<()> {
        if &status.signer != expected {
            return Err(ConsensusError::InvalidStatus(format!(
                "signed by {}, expected {}",
                short_hash(&status.signer),
                short_hash(expected)
            )));
        }
        self.require_member(&status.signer)?;
        if !self
            .verifier
            .verify(&status.signer, &status.digest(), &status.signature)
        {
            return Err(ConsensusError::InvalidStatus("bad signature".to_string()));
        }
        Ok(())
    }

    /// Verify a confirmed block's own signature and its quorum certificate.
    ///
    /// Only distinct members with a valid signature over this exact
    /// `(seq, hash)` count towards the quorum; anything else in the set is
    /// ignored rather than rejected.
    pub fn verify_certificate(&self, confirmed: &ConfirmedBlock) -> ConsensusResult<()> {
        let block = &confirmed.block;
        let height = block.height;
        let invalid = |reason: String| ConsensusError::InvalidCertificate { height, reason };

        if block.is_genesis() {
            return Err(invalid("genesis is never exchanged".to_string()));
        }
        self.verify_block(block)
            .map_err(|e| invalid(e.to_string()))?;

        let hash = block.hash();
        let quorum = self.registry.quorum_size();
        let commits = self.count_valid(&confirmed.messages.commit, Phase::Commit, height, &hash);
        if commits < quorum {
            return Err(invalid(format!("{commits} valid commits, need {quorum}")));
        }
        if self.registry.mode().uses_prepare() {
            let prepares =
                self.count_valid(&confirmed.messages.prepare, Phase::Prepare, height, &hash);
            if prepares < quorum {
                return Err(invalid(format!("{prepares} valid prepares, need {quorum}")));
            }
        }
        Ok(())
    }

    fn count_valid<'a>(
        &self,
        messages: impl IntoIterator<Item = (&'a ValidatorId, &'a ConsensusMessage)>,
        phase: Phase,
        height: u64,
        hash: &Hash,
    ) -> usize {
        messages
            .into_iter()
            .filter(|(signer, m)| {
                *signer == &m.signer
                    && m.phase == phase
                    && m.seq == height
                    && &m.block_hash == hash
                    && self.registry.is_member(&m.signer)
                    && self.verifier.verify(&m.signer, &m.digest(), &m.signature)
            })
            .map(|(signer, _)| *signer)
            .collect::<BTreeSet<_>>()
            .len()
    }
}
