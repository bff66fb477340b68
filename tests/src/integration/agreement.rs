//! Clusters of honest validators finalize a single chain.

#[cfg(test)]
mod tests {
    use crate::harness::{marker, SimCluster};
    use shared_types::{Phase, Transaction};
    use vc_08_consensus::{AgreementMode, ConsensusApi};

    #[tokio::test]
    async fn test_four_validators_quorum_three_reach_height_five() {
        let cluster = SimCluster::new(4, AgreementMode::ThreePhase);
        assert_eq!(cluster.quorum(), 3);

        cluster.run_until(5, 60).await;
        cluster.assert_no_fork();

        for node in &cluster.nodes {
            assert!(node.engine.is_active());
            let mut parent = node.engine.confirmed_at(0).unwrap().unwrap().hash();
            for height in 1..=5 {
                let confirmed = node.engine.confirmed_at(height).unwrap().unwrap();
                assert_eq!(confirmed.block.prev_hash, parent);
                assert!(confirmed.messages.count(Phase::Prepare) >= 3);
                assert!(confirmed.messages.count(Phase::Commit) >= 3);
                parent = confirmed.hash();
            }
            let heights = node.observer.heights();
            assert_eq!(&heights[..5], &[1, 2, 3, 4, 5]);
        }
    }

    #[tokio::test]
    async fn test_single_round_majority_of_five() {
        let cluster = SimCluster::new(5, AgreementMode::SingleRound);
        assert_eq!(cluster.quorum(), 3);

        cluster.run_until(3, 40).await;
        cluster.assert_no_fork();

        let block = cluster.nodes[2].engine.confirmed_at(3).unwrap().unwrap();
        assert_eq!(block.messages.count(Phase::Prepare), 0);
        assert!(block.messages.count(Phase::Commit) >= 3);
    }

    #[tokio::test]
    async fn test_submitted_transactions_are_finalized_once() {
        let cluster = SimCluster::new(4, AgreementMode::ThreePhase);
        let txs: Vec<Transaction> = (1..=3).flat_map(marker).collect();
        for node in &cluster.nodes {
            for tx in &txs {
                node.pool.submit(tx.clone());
            }
        }
        assert_eq!(
            cluster.nodes[0].engine.submit_candidate_transaction_set().await,
            txs
        );

        cluster.run_until(3, 60).await;

        let engine = &cluster.nodes[1].engine;
        let included: Vec<Transaction> = (1..=engine.current_height())
            .flat_map(|h| engine.confirmed_at(h).unwrap().unwrap().block.transactions)
            .collect();
        assert_eq!(included, txs);
        for node in &cluster.nodes {
            assert!(node.pool.is_empty());
            assert!(node.engine.submit_candidate_transaction_set().await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_one_crashed_validator_does_not_stop_progress() {
        let cluster = SimCluster::new(4, AgreementMode::ThreePhase);
        let crashed = cluster.proposer_index(1, 0);
        cluster.set_online(crashed, false);

        // Height 1's view-0 proposer is gone; a view change hands it on.
        cluster.run_until(3, 120).await;
        cluster.assert_no_fork();
        let survivor = &cluster.nodes[(crashed + 1) % 4];
        let block = survivor.engine.confirmed_at(1).unwrap().unwrap();
        assert_ne!(block.block.proposer, cluster.nodes[crashed].id);
        assert_eq!(cluster.nodes[crashed].engine.current_height(), 0);
    }
}
