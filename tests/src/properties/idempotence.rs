//! Re-delivering a message never counts twice towards a quorum.

#[cfg(test)]
mod tests {
    use crate::harness::{genesis, marker, proposal, runtime, vote, SimCluster};
    use proptest::prelude::*;
    use shared_types::{ConsensusMessage, Phase};
    use vc_08_consensus::{AgreementMode, ConsensusApi};

    /// Distinct signers, a repeat count per message (PROPOSE plus one
    /// PREPARE and one COMMIT per signer) and a delivery order.
    fn deliveries() -> impl Strategy<Value = (usize, Vec<usize>, Vec<usize>)> {
        (1..=3usize, prop::collection::vec(1..5usize, 7)).prop_flat_map(|(signers, repeats)| {
            let total = repeats[..1 + 2 * signers].iter().sum::<usize>();
            let order = Just((0..total).collect::<Vec<usize>>()).prop_shuffle();
            (Just(signers), Just(repeats), order)
        })
    }

    fn check(signers: usize, repeats: Vec<usize>, order: Vec<usize>) {
        runtime().block_on(async {
            let cluster = SimCluster::new(4, AgreementMode::ThreePhase);
            let proposer = cluster.proposer_index(1, 0);
            let observer = (proposer + 1) % 4;
            // Isolated, so it never adds a vote of its own.
            cluster.isolate(observer);

            let voters: Vec<usize> = (0..4).filter(|i| *i != observer).take(signers).collect();
            let (block, propose) = proposal(proposer, 1, 0, genesis().hash(), marker(9));
            let mut distinct = vec![propose];
            for voter in &voters {
                distinct.push(vote(*voter, Phase::Prepare, 0, 1, block.hash()));
                distinct.push(vote(*voter, Phase::Commit, 0, 1, block.hash()));
            }
            let copies: Vec<ConsensusMessage> = distinct
                .iter()
                .zip(&repeats)
                .flat_map(|(message, n)| std::iter::repeat(message.clone()).take(*n))
                .collect();

            let engine = &cluster.nodes[observer].engine;
            for index in order {
                engine.handle_message(copies[index].clone()).await.unwrap();
            }
            engine.tick().await;

            if signers >= cluster.quorum() {
                assert_eq!(engine.current_height(), 1);
                let certificate = engine.confirmed_at(1).unwrap().unwrap().messages;
                assert_eq!(certificate.count(Phase::Prepare), signers);
                assert_eq!(certificate.count(Phase::Commit), signers);
            } else {
                assert_eq!(engine.current_height(), 0);
            }
        });
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_duplicates_do_not_inflate_quorum((signers, repeats, order) in deliveries()) {
            check(signers, repeats, order);
        }
    }

    #[test]
    fn test_two_signers_repeated_never_finalize() {
        check(2, vec![4; 7], (0..4 * 5).rev().collect());
    }
}
