//! Input from outside the validator set never influences agreement.

#[cfg(test)]
mod tests {
    use crate::harness::{genesis, marker, proposal, signed_by, vote, SimCluster};
    use shared_crypto::ValidatorKeyPair;
    use shared_types::{Block, ConfirmedBlock, MessageSet, Phase};
    use vc_08_consensus::{AgreementMode, ConsensusApi, ConsensusError};

    fn outsider() -> ValidatorKeyPair {
        ValidatorKeyPair::from_seed([0xEE; 32])
    }

    #[tokio::test]
    async fn test_message_from_non_member_is_dropped() {
        let cluster = SimCluster::new(4, AgreementMode::ThreePhase);
        let engine = &cluster.nodes[0].engine;
        let (block, _) = proposal(cluster.proposer_index(1, 0), 1, 0, genesis().hash(), marker(1));

        for phase in [Phase::Prepare, Phase::Commit, Phase::ViewChange] {
            let message = signed_by(&outsider(), phase, 0, 1, block.hash());
            let err = engine.handle_message(message).await.unwrap_err();
            assert!(matches!(err, ConsensusError::UnknownValidator(_)), "{phase}: {err}");
        }
        assert_eq!(engine.inbox_len(), 0);

        cluster.run_until(2, 60).await;
        let outsider_id = outsider().public_key();
        for height in 1..=2 {
            let certificate = engine.confirmed_at(height).unwrap().unwrap().messages;
            assert!(certificate.iter().all(|m| m.signer != outsider_id));
        }
    }

    #[tokio::test]
    async fn test_block_certified_by_non_members_is_rejected() {
        let cluster = SimCluster::new(4, AgreementMode::ThreePhase);
        let engine = &cluster.nodes[0].engine;

        // Producer and every signature come from outside the set.
        let keys = outsider();
        let block = Block::new(1, genesis().hash(), 1, keys.public_key(), vec![]);
        let signature = keys.sign(&block.hash());
        let block = block.with_signature(signature);
        let mut messages = MessageSet::new();
        for seed in 0xE0..0xE4u8 {
            let signer = ValidatorKeyPair::from_seed([seed; 32]);
            messages.insert(signed_by(&signer, Phase::Prepare, 0, 1, block.hash()));
            messages.insert(signed_by(&signer, Phase::Commit, 0, 1, block.hash()));
        }

        let err = engine
            .handle_confirmed_block(ConfirmedBlock::new(block, messages))
            .await
            .unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidCertificate { height: 1, .. }));
        assert_eq!(engine.current_height(), 0);
    }

    #[tokio::test]
    async fn test_outsider_signatures_do_not_fill_a_quorum() {
        let cluster = SimCluster::new(4, AgreementMode::ThreePhase);
        let engine = &cluster.nodes[0].engine;
        let proposer = cluster.proposer_index(1, 0);
        let (block, _) = proposal(proposer, 1, 0, genesis().hash(), marker(7));

        // Two genuine members plus two outsiders: below the quorum of 3.
        let mut messages = MessageSet::new();
        for index in [proposer, (proposer + 1) % 4] {
            messages.insert(vote(index, Phase::Prepare, 0, 1, block.hash()));
            messages.insert(vote(index, Phase::Commit, 0, 1, block.hash()));
        }
        for seed in [0xE1u8, 0xE2] {
            let signer = ValidatorKeyPair::from_seed([seed; 32]);
            messages.insert(signed_by(&signer, Phase::Prepare, 0, 1, block.hash()));
            messages.insert(signed_by(&signer, Phase::Commit, 0, 1, block.hash()));
        }

        let err = engine
            .handle_confirmed_block(ConfirmedBlock::new(block, messages))
            .await
            .unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidCertificate { .. }));
        engine.tick().await;
        assert_eq!(engine.current_height(), 0);
    }

    #[tokio::test]
    async fn test_proposal_from_unscheduled_member_is_rejected() {
        let cluster = SimCluster::new(4, AgreementMode::ThreePhase);
        let scheduled = cluster.proposer_index(1, 0);
        let impostor = (scheduled + 1) % 4;
        let (_, message) = proposal(impostor, 1, 0, genesis().hash(), marker(3));

        let err = cluster.nodes[scheduled]
            .engine
            .handle_message(message)
            .await
            .unwrap_err();
        assert!(matches!(err, ConsensusError::WrongProposer { seq: 1, view: 0 }));
    }
}
