//! Integration tests exploring small nets with every state-space variant

#[cfg(test)]
mod state_space_tests {
    use dpn_constraints::{
        expressions::{ComparisonOp, Constraint, Domain, Variable},
        fraction::Fraction,
        oracle::{ConstraintOracle, IntervalOracle},
    };
    use dpn_net::{
        guard::Guard,
        marking::TokenCount,
        net::{Arc, DataPetriNet, Place, Transition, builder::DataPetriNetBuilder},
    };
    use dpn_state_space::{
        ConstraintStateGraph, CoverabilityGraph, CoverabilityTree, ReachabilityGraph, StateSpace,
        coloring::Color,
        state::{CoverageKind, StateId},
        strategy::{ExplorationStrategy, StateSpaceKind},
    };

    fn x_r() -> Variable {
        Variable::read("x", Domain::Integer)
    }

    fn x_w() -> Variable {
        Variable::write("x", Domain::Integer)
    }

    fn net(
        places: Vec<Place>,
        transitions: Vec<Transition>,
        arcs: Vec<Arc>,
        initial_x: Option<i64>,
    ) -> DataPetriNet {
        DataPetriNetBuilder::new("test")
            .with_variable("x", Domain::Integer, initial_x.map(Fraction::from))
            .unwrap()
            .with_places(places)
            .unwrap()
            .initialize()
            .with_transitions(transitions)
            .unwrap()
            .with_arcs(arcs)
            .unwrap()
            .build()
    }

    fn sequence_net(t2_guard: Constraint) -> DataPetriNet {
        net(
            vec![
                Place::new("i", "i", 1, false),
                Place::new("p", "p", 0, false),
                Place::new("o", "o", 0, true),
            ],
            vec![
                Transition::new(
                    "t1",
                    "t1",
                    Guard::from(Constraint::comparison(x_w(), ComparisonOp::Eq, 5)),
                ),
                Transition::new("t2", "t2", Guard::from(t2_guard)),
            ],
            vec![
                Arc::from_place("i", "t1", 1),
                Arc::to_place("t1", "p", 1),
                Arc::from_place("p", "t2", 1),
                Arc::to_place("t2", "o", 1),
            ],
            Some(0),
        )
    }

    /// `i -t1-> p`, `p -t2-> p`, `p -t3-> o`
    fn loop_net() -> DataPetriNet {
        net(
            vec![
                Place::new("i", "i", 1, false),
                Place::new("p", "p", 0, false),
                Place::new("o", "o", 0, true),
            ],
            vec![
                Transition::new("t1", "t1", Guard::tautology()),
                Transition::new("t2", "t2", Guard::tautology()),
                Transition::new("t3", "t3", Guard::tautology()),
            ],
            vec![
                Arc::from_place("i", "t1", 1),
                Arc::to_place("t1", "p", 1),
                Arc::from_place("p", "t2", 1),
                Arc::to_place("t2", "p", 1),
                Arc::from_place("p", "t3", 1),
                Arc::to_place("t3", "o", 1),
            ],
            None,
        )
    }

    /// `p -t-> p + q`
    fn producer_net() -> DataPetriNet {
        net(
            vec![
                Place::new("p", "p", 1, false),
                Place::new("q", "q", 0, true),
            ],
            vec![Transition::new("t", "t", Guard::tautology())],
            vec![
                Arc::from_place("p", "t", 1),
                Arc::to_place("t", "p", 1),
                Arc::to_place("t", "q", 1),
            ],
            None,
        )
    }

    fn assert_states_satisfiable<S: ExplorationStrategy>(
        space: &StateSpace<'_, S, IntervalOracle>,
        oracle: &IntervalOracle,
    ) {
        for state in space.states() {
            assert!(
                oracle.can_be_satisfied(state.constraint()),
                "State {state} is unsatisfiable"
            );
        }
    }

    #[test]
    fn test_sequence_reachability_graph() {
        let net = sequence_net(Constraint::comparison(x_r(), ComparisonOp::Gt, 0));
        let oracle = IntervalOracle::new();
        let mut graph = ReachabilityGraph::new(&net, &oracle);
        graph.generate_graph();

        assert!(graph.is_full_graph());
        assert_eq!(graph.kind(), StateSpaceKind::ReachabilityGraph);
        assert_eq!(graph.states().len(), 3);
        assert_eq!(graph.arcs().len(), 2);
        assert!(graph.is_final_state(StateId::from_index(2)));
        assert!(oracle.are_equal(
            graph.state(StateId::from_index(2)).constraint(),
            &Constraint::comparison(x_r(), ComparisonOp::Eq, 5)
        ));
        assert!(graph.coloring().is_all_green());
        assert!(graph.find_cycles().is_empty());

        // generating twice does not change anything
        graph.generate_graph();
        assert_eq!(graph.states().len(), 3);
    }

    #[test]
    fn test_unsatisfiable_guard_blocks_transition() {
        let net = sequence_net(Constraint::comparison(x_r(), ComparisonOp::Lt, 0));
        let oracle = IntervalOracle::new();
        let mut graph = ConstraintStateGraph::new(&net, &oracle);
        graph.generate_graph();

        assert!(graph.is_full_graph());
        assert_eq!(graph.states().len(), 2);
        assert_eq!(graph.arcs().len(), 1);

        let coloring = graph.coloring();
        assert!(coloring.is_all_red());
    }

    #[test]
    fn test_constraint_graph_adds_silent_arcs() {
        let net = net(
            vec![
                Place::new("i", "i", 1, false),
                Place::new("p", "p", 0, false),
                Place::new("o", "o", 0, true),
            ],
            vec![
                Transition::new(
                    "t1",
                    "t1",
                    Guard::from(Constraint::comparison(x_w(), ComparisonOp::Geq, 0)),
                ),
                Transition::new(
                    "t2",
                    "t2",
                    Guard::from(Constraint::comparison(x_r(), ComparisonOp::Gt, 5)),
                ),
            ],
            vec![
                Arc::from_place("i", "t1", 1),
                Arc::to_place("t1", "p", 1),
                Arc::from_place("p", "t2", 1),
                Arc::to_place("t2", "o", 1),
            ],
            None,
        );
        let oracle = IntervalOracle::new();

        let mut reachability = ReachabilityGraph::new(&net, &oracle);
        reachability.generate_graph();
        assert_eq!(reachability.states().len(), 3);
        assert!(reachability.arcs().iter().all(|a| !a.transition.is_silent));

        let mut graph = ConstraintStateGraph::new(&net, &oracle);
        graph.generate_graph();
        assert_eq!(graph.states().len(), 4);
        assert_eq!(graph.arcs().len(), 3);
        assert_states_satisfiable(&graph, &oracle);

        let silent = graph
            .arcs()
            .iter()
            .find(|a| a.transition.is_silent)
            .unwrap();
        assert_eq!(silent.transition.id, "t2");
        let target = graph.state(silent.target);
        assert_eq!(target.marking(), graph.state(silent.source).marking());
        assert!(oracle.are_equal(
            target.constraint(),
            &(Constraint::comparison(x_r(), ComparisonOp::Geq, 0)
                & Constraint::comparison(x_r(), ComparisonOp::Leq, 5))
        ));

        let coloring = graph.coloring();
        assert_eq!(coloring.color(silent.source), Color::Green);
        assert_eq!(coloring.color(silent.target), Color::Red);
    }

    #[test]
    fn test_unbounded_net_aborts_reachability() {
        let net = producer_net();
        let oracle = IntervalOracle::new();

        let mut graph = ReachabilityGraph::new(&net, &oracle);
        graph.generate_graph();
        assert!(!graph.is_full_graph());

        let mut constraint_graph = ConstraintStateGraph::new(&net, &oracle);
        constraint_graph.generate_graph();
        assert!(!constraint_graph.is_full_graph());
    }

    #[test]
    fn test_unbounded_net_coverability_graph() {
        let net = producer_net();
        let oracle = IntervalOracle::new();

        let mut graph = CoverabilityGraph::new(&net, &oracle);
        graph.generate_graph();

        assert!(graph.is_full_graph());
        assert_eq!(graph.states().len(), 2);
        assert_eq!(graph.arcs().len(), 2);
        let accelerated = graph.state(StateId::from_index(1));
        assert_eq!(accelerated.marking().tokens("q"), TokenCount::Omega);
        assert_eq!(accelerated.marking().tokens("p"), TokenCount::Finite(1));

        let cycles = graph.find_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].states().len(), 1);
    }

    #[test]
    fn test_stop_on_covering_final_position() {
        let net = producer_net();
        let oracle = IntervalOracle::new();

        let mut graph =
            CoverabilityGraph::new(&net, &oracle).with_stop_on_covering_final_position(true);
        graph.generate_graph();

        assert!(!graph.is_full_graph());
    }

    #[test]
    fn test_coverability_tree_of_loop() {
        let net = loop_net();
        let oracle = IntervalOracle::new();
        let mut tree = CoverabilityTree::new(&net, &oracle);
        tree.generate_graph();

        assert!(tree.is_full_graph());
        assert!(tree.is_tree());
        assert_eq!(tree.states().len(), 4);

        let leaf = tree.state(StateId::from_index(2));
        assert_eq!(leaf.covering().kind, CoverageKind::NonstrictlyCovered);
        assert_eq!(leaf.covering().node, Some(StateId::from_index(1)));
        assert_eq!(tree.outgoing(leaf.id()).count(), 0);

        let coloring = tree.coloring();
        assert!(coloring.is_all_green());

        let cycles = tree.find_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].cycle_arcs().len(), 1);
        assert_eq!(cycles[0].output_arcs().len(), 2);
        assert_eq!(
            cycles[0].transitions().into_iter().collect::<Vec<_>>(),
            vec!["t2".to_string(), "t3".to_string()]
        );
    }

    #[test]
    fn test_loops_sharing_a_state_form_one_compound_cycle() {
        // two self loops `ta` and `tb` on `p`
        let net = net(
            vec![
                Place::new("i", "i", 1, false),
                Place::new("p", "p", 0, false),
                Place::new("o", "o", 0, true),
            ],
            vec![
                Transition::new("t1", "t1", Guard::tautology()),
                Transition::new("ta", "ta", Guard::tautology()),
                Transition::new("tb", "tb", Guard::tautology()),
                Transition::new("t3", "t3", Guard::tautology()),
            ],
            vec![
                Arc::from_place("i", "t1", 1),
                Arc::to_place("t1", "p", 1),
                Arc::from_place("p", "ta", 1),
                Arc::to_place("ta", "p", 1),
                Arc::from_place("p", "tb", 1),
                Arc::to_place("tb", "p", 1),
                Arc::from_place("p", "t3", 1),
                Arc::to_place("t3", "o", 1),
            ],
            None,
        );
        let oracle = IntervalOracle::new();
        let mut tree = CoverabilityTree::new(&net, &oracle);
        tree.generate_graph();

        let repeating = tree
            .states()
            .iter()
            .filter(|s| s.covering().kind == CoverageKind::NonstrictlyCovered)
            .count();
        assert_eq!(repeating, 2);

        let cycles = tree.find_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].states().len(), 3);
        assert_eq!(cycles[0].cycle_arcs().len(), 2);
        assert_eq!(
            cycles[0].transitions().into_iter().collect::<Vec<_>>(),
            vec!["t3".to_string(), "ta".to_string(), "tb".to_string()]
        );
    }

    #[test]
    fn test_reachability_graph_of_loop_has_self_loop() {
        let net = loop_net();
        let oracle = IntervalOracle::new();
        let mut graph = ReachabilityGraph::new(&net, &oracle);
        graph.generate_graph();

        assert!(graph.is_full_graph());
        assert_eq!(graph.states().len(), 3);
        assert_eq!(graph.arcs().len(), 3);

        let cycles = graph.find_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(
            cycles[0].states().iter().copied().collect::<Vec<_>>(),
            vec![StateId::from_index(1)]
        );
    }

    #[test]
    fn test_coverability_tree_of_unbounded_net() {
        let net = producer_net();
        let oracle = IntervalOracle::new();
        let mut tree = CoverabilityTree::new(&net, &oracle);
        tree.generate_graph();

        assert!(tree.is_full_graph());
        assert_eq!(tree.states().len(), 3);
        assert_eq!(
            tree.state(StateId::from_index(1)).covering().kind,
            CoverageKind::StrictlyCovered
        );
        assert_eq!(
            tree.state(StateId::from_index(2)).covering().kind,
            CoverageKind::NonstrictlyCovered
        );
        // the final marking [q] is never reached exactly
        assert!(tree.coloring().is_all_red());
    }

    /// Small deterministic pseudo random generator for net shapes
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: u64) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 33) % bound
        }
    }

    fn generated_net(seed: u64) -> DataPetriNet {
        let mut rng = Lcg(seed);
        let places = ["a", "b", "c"];
        let guards = [
            Constraint::True,
            Constraint::comparison(x_w(), ComparisonOp::Gt, 0),
            Constraint::comparison(x_r(), ComparisonOp::Leq, 3),
            Constraint::comparison(x_r(), ComparisonOp::Gt, 0)
                & Constraint::comparison(x_w(), ComparisonOp::Eq, 0),
        ];

        let mut transitions = Vec::new();
        let mut arcs = Vec::new();
        for t in 0..3 {
            let id = format!("t{t}");
            let guard = guards[rng.next(guards.len() as u64) as usize].clone();
            transitions.push(Transition::new(&id, &id, Guard::from(guard)));

            let input = places[rng.next(3) as usize];
            arcs.push(Arc::from_place(input, &id, 1));
            let outputs = rng.next(3);
            let mut used = Vec::new();
            for _ in 0..outputs {
                let output = places[rng.next(3) as usize];
                if !used.contains(&output) {
                    used.push(output);
                    arcs.push(Arc::to_place(&id, output, 1 + rng.next(2) as u32));
                }
            }
        }

        net(
            vec![
                Place::new("a", "a", 1, false),
                Place::new("b", "b", 0, false),
                Place::new("c", "c", 0, true),
            ],
            transitions,
            arcs,
            Some(1),
        )
    }

    #[test]
    fn test_coverability_structures_terminate_on_generated_nets() {
        for seed in 0..40 {
            let net = generated_net(seed);
            let oracle = IntervalOracle::new();

            let mut graph = CoverabilityGraph::new(&net, &oracle);
            graph.generate_graph();
            assert!(graph.is_full_graph(), "Graph of net {seed} is partial:\n{net}");
            assert_states_satisfiable(&graph, &oracle);

            let mut tree = CoverabilityTree::new(&net, &oracle);
            tree.generate_graph();
            assert!(tree.is_full_graph(), "Tree of net {seed} is partial:\n{net}");
            assert_states_satisfiable(&tree, &oracle);
            assert_eq!(tree.coloring().len(), tree.states().len());

            // the constraint graph explores exactly like the coverability
            // graph until the first acceleration, where it aborts instead
            let mut constraint_graph = ConstraintStateGraph::new(&net, &oracle);
            constraint_graph.generate_graph();
            assert_states_satisfiable(&constraint_graph, &oracle);
            let has_omega = graph.states().iter().any(|s| s.marking().has_omega());
            assert_eq!(has_omega, !constraint_graph.is_full_graph(), "net {seed}:\n{net}");
        }
    }
}
