//! When two candidates at a height are both certified, every validator
//! picks the one with the smaller hash, regardless of arrival order.

#[cfg(test)]
mod tests {
    use crate::harness::{genesis, marker, proposal, runtime, vote, SimCluster};
    use proptest::prelude::*;
    use shared_types::{ConsensusMessage, Hash, Phase};
    use vc_08_consensus::{AgreementMode, ConsensusApi};

    /// Two fully certified blocks at height 1, proposed in views 0 and 1,
    /// and the smaller of their hashes.
    fn certified_pair(cluster: &SimCluster, observer: usize, tags: (u64, u64)) -> (Vec<ConsensusMessage>, Hash) {
        let parent = genesis().hash();
        let mut messages = Vec::new();
        let mut hashes = Vec::new();
        for (view, tag) in [(0, tags.0), (1, tags.1)] {
            let proposer = cluster.proposer_index(1, view);
            let (block, propose) = proposal(proposer, 1, view, parent, marker(tag));
            messages.push(propose);
            for signer in (0..4).filter(|i| *i != observer) {
                messages.push(vote(signer, Phase::Prepare, view, 1, block.hash()));
                messages.push(vote(signer, Phase::Commit, view, 1, block.hash()));
            }
            hashes.push(block.hash());
        }
        let smallest = hashes.into_iter().min().unwrap();
        (messages, smallest)
    }

    /// Index that proposes in neither view 0 nor view 1 at height 1.
    fn bystander(cluster: &SimCluster) -> usize {
        let proposers = [cluster.proposer_index(1, 0), cluster.proposer_index(1, 1)];
        (0..4).find(|i| !proposers.contains(i)).unwrap()
    }

    /// Deliver the pair to an isolated validator in `order`; return what it
    /// finalized and the expected winner.
    fn finalize_in_order(tags: (u64, u64), order: &[usize]) -> (Hash, Hash) {
        runtime().block_on(async {
            let cluster = SimCluster::new(4, AgreementMode::ThreePhase);
            let observer = bystander(&cluster);
            cluster.isolate(observer);
            let (messages, smallest) = certified_pair(&cluster, observer, tags);

            let engine = &cluster.nodes[observer].engine;
            for index in order {
                engine.handle_message(messages[*index].clone()).await.unwrap();
            }
            let report = engine.tick().await;
            assert_eq!(report.finalized, vec![1]);
            (engine.confirmed_at(1).unwrap().unwrap().hash(), smallest)
        })
    }

    const MESSAGES: usize = 2 * (1 + 2 * 3);

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_smallest_certified_hash_wins(
            (a, b) in (any::<u64>(), any::<u64>()).prop_filter("distinct blocks", |(a, b)| a != b),
            order in Just((0..MESSAGES).collect::<Vec<usize>>()).prop_shuffle(),
        ) {
            let (finalized, smallest) = finalize_in_order((a, b), &order);
            prop_assert_eq!(finalized, smallest);

            let reversed: Vec<usize> = order.iter().rev().copied().collect();
            let (again, _) = finalize_in_order((a, b), &reversed);
            prop_assert_eq!(again, finalized);
        }
    }

    #[test]
    fn test_both_orders_pick_the_same_block() {
        let forward: Vec<usize> = (0..MESSAGES).collect();
        let backward: Vec<usize> = (0..MESSAGES).rev().collect();
        let (first, smallest) = finalize_in_order((10, 20), &forward);
        let (second, _) = finalize_in_order((10, 20), &backward);
        assert_eq!(first, smallest);
        assert_eq!(second, smallest);
    }
}
