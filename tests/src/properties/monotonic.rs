//! Confirmed height never decreases, through crashes, restarts and sync.

#[cfg(test)]
mod tests {
    use crate::harness::{runtime, SimCluster};
    use proptest::prelude::*;
    use vc_08_consensus::{AgreementMode, ConsensusApi};

    #[derive(Debug, Clone)]
    enum Event {
        Tick(usize),
        Round,
        Toggle(usize),
    }

    fn event() -> impl Strategy<Value = Event> {
        prop_oneof![
            4 => (0..4usize).prop_map(Event::Tick),
            3 => Just(Event::Round),
            1 => (0..4usize).prop_map(Event::Toggle),
        ]
    }

    fn run(mode: AgreementMode, events: Vec<Event>) {
        runtime().block_on(async {
            let cluster = SimCluster::new(4, mode);
            let mut online = [true; 4];
            let mut seen = cluster.heights();

            for event in events {
                match event {
                    Event::Tick(i) => {
                        if online[i] {
                            let report = cluster.nodes[i].engine.tick().await;
                            assert_eq!(report.height, cluster.nodes[i].engine.current_height());
                        }
                    }
                    Event::Round => cluster.tick_online().await,
                    Event::Toggle(i) => {
                        online[i] = !online[i];
                        cluster.set_online(i, online[i]);
                    }
                }

                let now = cluster.heights();
                for (before, after) in seen.iter().zip(&now) {
                    assert!(after >= before, "height went from {before} to {after}");
                }
                seen = now;
            }
            cluster.assert_no_fork();
        });
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_heights_never_decrease(events in prop::collection::vec(event(), 1..60)) {
            run(AgreementMode::ThreePhase, events);
        }

        #[test]
        fn prop_heights_never_decrease_single_round(events in prop::collection::vec(event(), 1..60)) {
            run(AgreementMode::SingleRound, events);
        }
    }
}
