//! No two validators ever finalize different blocks at the same height,
//! whatever order messages arrive in, even with an equivocating proposer.

#[cfg(test)]
mod tests {
    use crate::harness::{genesis, marker, proposal, runtime, vote, SimCluster};
    use proptest::prelude::*;
    use shared_types::{ConsensusMessage, Phase};
    use vc_08_consensus::{AgreementMode, ConsensusApi};

    #[derive(Debug, Clone)]
    enum Step {
        /// Tick the honest validator at this position.
        Tick(usize),
        /// Deliver a held broadcast, optionally leaving a copy queued.
        Deliver { index: usize, keep: bool },
        /// Hand a forged message to an honest validator.
        Inject { message: usize, target: usize },
    }

    const FORGED: usize = 6;

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            3 => (0..3usize).prop_map(Step::Tick),
            4 => (any::<usize>(), prop::bool::weighted(0.2))
                .prop_map(|(index, keep)| Step::Deliver { index, keep }),
            2 => (0..FORGED, 0..3usize).prop_map(|(message, target)| Step::Inject { message, target }),
        ]
    }

    /// PROPOSE, PREPARE and COMMIT for two conflicting blocks at height 1.
    fn equivocation(byzantine: usize) -> Vec<ConsensusMessage> {
        let parent = genesis().hash();
        let mut messages = Vec::with_capacity(FORGED);
        for tag in [1, 2] {
            let (block, propose) = proposal(byzantine, 1, 0, parent, marker(tag));
            messages.push(propose);
            messages.push(vote(byzantine, Phase::Prepare, 0, 1, block.hash()));
            messages.push(vote(byzantine, Phase::Commit, 0, 1, block.hash()));
        }
        messages
    }

    fn run_schedule(mode: AgreementMode, steps: Vec<Step>) {
        runtime().block_on(async {
            let cluster = SimCluster::new(4, mode);
            let byzantine = cluster.proposer_index(1, 0);
            let honest: Vec<usize> = (0..4).filter(|i| *i != byzantine).collect();
            // The Byzantine validator speaks only through injected messages.
            cluster.set_online(byzantine, false);
            cluster.network.hold_broadcasts(true);
            let forged = equivocation(byzantine);

            for step in steps {
                match step {
                    Step::Tick(i) => {
                        cluster.nodes[honest[i]].engine.tick().await;
                    }
                    Step::Deliver { index, keep } => {
                        cluster.network.deliver(index, keep).await;
                    }
                    Step::Inject { message, target } => {
                        let engine = &cluster.nodes[honest[target]].engine;
                        let _ = engine.handle_message(forged[message].clone()).await;
                    }
                }
                cluster.assert_no_fork();
            }

            cluster.network.hold_broadcasts(false);
            for _ in 0..6 {
                cluster.network.deliver_all().await;
                cluster.tick_online().await;
            }
            cluster.assert_no_fork();
            for index in honest {
                cluster.assert_hook_sequence(&cluster.nodes[index]);
            }
        });
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_three_phase_never_forks(steps in prop::collection::vec(step(), 1..80)) {
            run_schedule(AgreementMode::ThreePhase, steps);
        }

        #[test]
        fn prop_single_round_never_forks(steps in prop::collection::vec(step(), 1..80)) {
            run_schedule(AgreementMode::SingleRound, steps);
        }
    }

    #[test]
    fn test_equivocating_proposer_cannot_split_honest_validators() {
        // Each honest validator first sees a different one of the two blocks.
        let steps = vec![
            Step::Inject { message: 0, target: 0 },
            Step::Inject { message: 3, target: 1 },
            Step::Inject { message: 0, target: 2 },
            Step::Tick(0),
            Step::Tick(1),
            Step::Tick(2),
            Step::Inject { message: 1, target: 0 },
            Step::Inject { message: 4, target: 1 },
            Step::Deliver { index: 0, keep: false },
            Step::Deliver { index: 1, keep: false },
            Step::Tick(0),
            Step::Tick(1),
            Step::Tick(2),
        ];
        run_schedule(AgreementMode::ThreePhase, steps);
    }
}
