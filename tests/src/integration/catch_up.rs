//! Validators that miss heights recover them from peers.

#[cfg(test)]
mod tests {
    use crate::harness::SimCluster;
    use vc_08_consensus::{AgreementMode, ConsensusApi};

    #[tokio::test]
    async fn test_offline_validator_falls_five_behind_then_syncs() {
        let cluster = SimCluster::new(4, AgreementMode::ThreePhase);
        cluster.run_until(1, 30).await;

        // With one of four offline the other three still form a quorum.
        let lagging = 3;
        cluster.set_online(lagging, false);
        let start = cluster.nodes[lagging].engine.current_height();
        cluster.run_until(start + 5, 200).await;
        let leader_height = cluster.nodes[0].engine.current_height();
        assert!(leader_height >= start + 5);
        assert_eq!(cluster.nodes[lagging].engine.current_height(), start);

        cluster.set_online(lagging, true);
        let node = &cluster.nodes[lagging];
        let mut synced = 0;
        for _ in 0..20 {
            let report = node.engine.tick().await;
            synced += report.synced;
            if node.engine.current_height() >= leader_height {
                break;
            }
        }
        assert!(synced >= 5, "synced only {synced} blocks");
        assert!(node.engine.current_height() >= leader_height);

        // Synced blocks are the ones the others finalized, certificates and all.
        for height in 1..=leader_height {
            assert_eq!(
                node.engine.confirmed_at(height).unwrap(),
                cluster.nodes[0].engine.confirmed_at(height).unwrap()
            );
        }
        cluster.assert_hook_sequence(node);

        // Back in step with the cluster afterwards.
        cluster.run_until(leader_height + 2, 80).await;
        cluster.assert_no_fork();
    }

    #[tokio::test]
    async fn test_restart_from_genesis_syncs_full_chain() {
        let cluster = SimCluster::new(4, AgreementMode::SingleRound);
        cluster.set_online(2, false);
        cluster.run_until(6, 120).await;

        cluster.set_online(2, true);
        let node = &cluster.nodes[2];
        assert_eq!(node.engine.current_height(), 0);
        for _ in 0..20 {
            node.engine.tick().await;
        }
        assert!(node.engine.current_height() >= 6);
        cluster.assert_no_fork();
    }
}
