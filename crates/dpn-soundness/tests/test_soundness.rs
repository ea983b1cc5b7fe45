//! End-to-end soundness checks and repairs of nets given as JSON

#[cfg(test)]
mod soundness_tests {
    use std::collections::BTreeSet;

    use dpn_constraints::{
        expressions::{ComparisonOp, Constraint, Domain, Variable},
        oracle::{ConstraintOracle, IntervalOracle},
    };
    use dpn_net::net::DataPetriNet;
    use dpn_parser::parse_net;
    use dpn_soundness::{
        analyzer::{SoundnessAnalyzer, SoundnessType, StateType},
        refinement::{BaseStructure, RefinementConfig, TransitionRefiner},
        repair::{RepairConfig, RepairOutcome, SoundnessRepairer},
    };
    use dpn_state_space::{ConstraintStateGraph, ReachabilityGraph};

    /// `i -t1-> p -t2-> o` with the given guards
    fn sequence(t1: &str, t2: &str) -> DataPetriNet {
        let json = format!(
            r#"{{
                "name": "sequence",
                "variables": [{{ "name": "x", "domain": "integer" }}],
                "places": [
                    {{ "id": "i", "tokens": 1 }},
                    {{ "id": "p" }},
                    {{ "id": "o", "final": true }}
                ],
                "transitions": [
                    {{ "id": "t1", "guard": "{t1}" }},
                    {{ "id": "t2", "guard": "{t2}" }}
                ],
                "arcs": [
                    {{ "source": "i", "target": "t1" }},
                    {{ "source": "t1", "target": "p" }},
                    {{ "source": "p", "target": "t2" }},
                    {{ "source": "t2", "target": "o" }}
                ]
            }}"#
        );
        parse_net(&json).unwrap()
    }

    /// Loop writing `x` until it reaches 10
    const LOOP: &str = r#"{
        "name": "loop",
        "variables": [{ "name": "x", "domain": "integer" }],
        "places": [
            { "id": "i", "tokens": 1 },
            { "id": "p" },
            { "id": "q" },
            { "id": "o", "final": true }
        ],
        "transitions": [
            { "id": "init" },
            { "id": "write", "guard": "x_w >= 0" },
            { "id": "check", "guard": "x_r < 10" },
            { "id": "finish", "guard": "x_r >= 10" }
        ],
        "arcs": [
            { "source": "i", "target": "init" },
            { "source": "init", "target": "p" },
            { "source": "p", "target": "write" },
            { "source": "write", "target": "q" },
            { "source": "q", "target": "check" },
            { "source": "check", "target": "p" },
            { "source": "q", "target": "finish" },
            { "source": "finish", "target": "o" }
        ]
    }"#;

    fn x_w() -> Variable {
        Variable::write("x", Domain::Integer)
    }

    #[test]
    fn test_sound_sequence() {
        let oracle = IntervalOracle::new();
        let net = sequence("x_w == 5", "x_r > 0");

        let mut graph = ConstraintStateGraph::new(&net, &oracle);
        graph.generate_graph();
        assert_eq!(graph.states().len(), 3);
        assert_eq!(graph.arcs().len(), 2);

        let props = SoundnessAnalyzer::analyze(&graph, SoundnessType::Classical);
        assert!(props.is_sound(), "{props}");
        assert!(props.boundedness());
        assert!(props.dead_transitions().is_empty());
        assert!(!props.has_deadlocks());
        assert_eq!(props.states_of_type(StateType::Final).count(), 1);

        let relaxed = SoundnessAnalyzer::new(&oracle).check(&net, SoundnessType::RelaxedLazy);
        assert!(relaxed.is_sound());
    }

    #[test]
    fn test_unreachable_final_marking() {
        let oracle = IntervalOracle::new();
        let net = sequence("x_w == 5", "x_r < 0");
        let analyzer = SoundnessAnalyzer::new(&oracle);

        let props = analyzer.check(&net, SoundnessType::Classical);
        assert!(!props.is_sound());
        assert_eq!(
            props.dead_transitions(),
            &BTreeSet::from(["t2".to_string()])
        );
        assert_eq!(props.deadlocks(), 1);
        assert_eq!(
            props
                .states_of_type(StateType::NoWayToFinalMarking)
                .count(),
            props.state_types().len()
        );

        let relaxed = analyzer.check(&net, SoundnessType::RelaxedLazy);
        assert!(!relaxed.is_sound());
        assert_eq!(
            relaxed.unfeasible_transitions(),
            &BTreeSet::from(["t1".to_string(), "t2".to_string()])
        );

        let result = SoundnessRepairer::new(&oracle, RepairConfig::default()).repair(&net);
        assert_eq!(result.outcome, RepairOutcome::Failed);
        assert!(!result.is_success());
        assert_eq!(result.net.transition_count(), 2);
    }

    #[test]
    fn test_isolated_transition_is_dead() {
        let oracle = IntervalOracle::new();
        let net = parse_net(
            r#"{
                "name": "isolated",
                "places": [
                    { "id": "i", "tokens": 1 },
                    { "id": "q" },
                    { "id": "o", "final": true }
                ],
                "transitions": [{ "id": "t" }, { "id": "never" }],
                "arcs": [
                    { "source": "i", "target": "t" },
                    { "source": "t", "target": "o" },
                    { "source": "q", "target": "never" },
                    { "source": "never", "target": "o" }
                ]
            }"#,
        )
        .unwrap();
        let analyzer = SoundnessAnalyzer::new(&oracle);

        for ty in [SoundnessType::Classical, SoundnessType::RelaxedLazy] {
            let props = analyzer.check(&net, ty);
            assert!(!props.is_sound(), "{ty} soundness must fail");
            assert!(props.dead_transitions().contains("never"));
        }
    }

    #[test]
    fn test_repair_of_sound_net_keeps_behavior() {
        let oracle = IntervalOracle::new();
        let net = sequence("x_w == 5", "x_r > 0");

        let result = SoundnessRepairer::new(&oracle, RepairConfig::default()).repair(&net);
        assert!(result.is_success());
        assert_eq!(result.repair_steps, 0);

        let mut before = ReachabilityGraph::new(&net, &oracle);
        before.generate_graph();
        let mut after = ReachabilityGraph::new(&result.net, &oracle);
        after.generate_graph();

        assert_eq!(before.states().len(), after.states().len());
        for (s, t) in before.states().iter().zip(after.states()) {
            assert_eq!(s.marking(), t.marking());
            assert!(oracle.are_equal(s.constraint(), t.constraint()));
        }
    }

    #[test]
    fn test_repair_only_tightens_guards() {
        let oracle = IntervalOracle::new();
        let net = sequence("x_w >= 0", "x_r > 5");

        let result = SoundnessRepairer::new(&oracle, RepairConfig::default()).repair(&net);
        assert!(result.is_success());
        assert_eq!(result.repair_steps, 1);
        assert!(oracle.are_equal(
            result.net.transition("t1").unwrap().guard().actual_constraint(),
            &Constraint::comparison(x_w(), ComparisonOp::Geq, 6)
        ));

        for t in result.net.transitions() {
            let original = net.transition(t.base_transition_id()).unwrap();
            assert!(oracle.implies(
                t.guard().actual_constraint(),
                original.guard().actual_constraint()
            ));
        }

        let props = SoundnessAnalyzer::new(&oracle).check(&result.net, SoundnessType::Classical);
        assert!(props.is_sound(), "{props}");
    }

    #[test]
    fn test_refinement_of_loop() {
        let oracle = IntervalOracle::new();
        let net = parse_net(LOOP).unwrap();

        for base_structure in [
            BaseStructure::ReachabilityGraph,
            BaseStructure::CoverabilityGraph,
        ] {
            let config = RefinementConfig {
                base_structure,
                ..RefinementConfig::default()
            };
            let result = TransitionRefiner::new(&oracle, config).refine(&net);

            assert_eq!(result.net.transition_count(), 5);
            assert_eq!(result.split_transitions.len(), 1);
            assert!(
                result
                    .net
                    .transitions()
                    .filter(|t| t.is_split())
                    .all(|t| t.base_transition_id() == "write")
            );

            let props =
                SoundnessAnalyzer::new(&oracle).check(&result.net, SoundnessType::Classical);
            assert!(props.is_sound(), "{props}");
        }
    }

    #[test]
    fn test_repair_merges_split_transitions() {
        let oracle = IntervalOracle::new();
        let net = parse_net(LOOP).unwrap();

        let result = SoundnessRepairer::new(&oracle, RepairConfig::default()).repair(&net);
        assert!(result.is_success());
        assert_eq!(result.repair_steps, 0);
        assert_eq!(result.net.transition_count(), 4);
        assert!(oracle.are_equal(
            result.net.transition("write").unwrap().guard().actual_constraint(),
            net.transition("write").unwrap().guard().actual_constraint()
        ));

        let config = RepairConfig {
            merge_split_transitions: false,
            ..RepairConfig::default()
        };
        let result = SoundnessRepairer::new(&oracle, config).repair(&net);
        assert!(result.is_success());
        assert_eq!(result.net.transition_count(), 5);
        assert!(result.net.transition("write").is_none());
    }
}
