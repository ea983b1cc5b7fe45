//! Generic state-space exploration
//!
//! [`StateSpace`] explores the symbolic state space of a [`DataPetriNet`]
//! depth-first. States are stored in an arena and referenced by [`StateId`];
//! ancestor sets, parent links and covered nodes are ids into that arena.
//! The [`ExplorationStrategy`] decides whether states are merged, whether
//! silent arcs are added and how strictly covered ancestors are handled.

use std::{
    collections::{BTreeMap, BTreeSet},
    marker::PhantomData,
};

use dpn_constraints::{expressions::Constraint, oracle::ConstraintOracle};
use dpn_net::{
    marking::{Marking, TokenCount},
    net::DataPetriNet,
    partial_ord::{PartialOrdCompResult, PartialOrder},
};
use log::{debug, info, trace};

use crate::{
    state::{CoverageKind, Covering, State, StateArc, StateId, TransitionRef},
    strategy::{CoveringPolicy, ExplorationStrategy, StateSpaceKind},
};

/// Symbolic state space of a Data Petri Net
///
/// The state space is empty until [`StateSpace::generate_graph`] has been
/// called.
///
/// # Example
///
/// ```
/// use dpn_constraints::oracle::IntervalOracle;
/// use dpn_net::{guard::Guard, net::{Arc, Place, Transition, builder::DataPetriNetBuilder}};
/// use dpn_state_space::ReachabilityGraph;
///
/// let net = DataPetriNetBuilder::new("single step")
///     .with_places(vec![Place::new("i", "i", 1, false), Place::new("o", "o", 0, true)]).unwrap()
///     .initialize()
///     .with_transition(Transition::new("t", "t", Guard::tautology())).unwrap()
///     .with_arcs(vec![Arc::from_place("i", "t", 1), Arc::to_place("t", "o", 1)]).unwrap()
///     .build();
///
/// let oracle = IntervalOracle::new();
/// let mut graph = ReachabilityGraph::new(&net, &oracle);
/// graph.generate_graph();
///
/// assert!(graph.is_full_graph());
/// assert_eq!(graph.states().len(), 2);
/// ```
#[derive(Debug)]
pub struct StateSpace<'a, S: ExplorationStrategy, O: ConstraintOracle> {
    net: &'a DataPetriNet,
    oracle: &'a O,
    states: Vec<State>,
    arcs: Vec<StateArc>,
    /// Indices into `arcs` per source state
    outgoing: Vec<Vec<usize>>,
    /// Indices into `arcs` per target state
    incoming: Vec<Vec<usize>>,
    /// States by marking, used to find mergeable states
    by_marking: BTreeMap<Marking, Vec<StateId>>,
    worklist: Vec<StateId>,
    final_marking: Marking,
    is_full_graph: bool,
    is_generated: bool,
    aborted: bool,
    stop_on_covering_final_position: bool,
    _strategy: PhantomData<S>,
}

impl<'a, S: ExplorationStrategy, O: ConstraintOracle> StateSpace<'a, S, O> {
    /// Create the state space of `net` containing only the initial state
    pub fn new(net: &'a DataPetriNet, oracle: &'a O) -> Self {
        let initial = State {
            id: StateId(0),
            marking: net.initial_marking(),
            constraint: oracle.simplify(&net.variables().initial_constraint()),
            ancestors: BTreeSet::new(),
            parent: None,
            covering: Covering::default(),
        };

        let mut by_marking: BTreeMap<Marking, Vec<StateId>> = BTreeMap::new();
        by_marking
            .entry(initial.marking.clone())
            .or_default()
            .push(initial.id);

        Self {
            net,
            oracle,
            states: vec![initial],
            arcs: Vec::new(),
            outgoing: vec![Vec::new()],
            incoming: vec![Vec::new()],
            by_marking,
            worklist: vec![StateId(0)],
            final_marking: net.final_marking(),
            is_full_graph: true,
            is_generated: false,
            aborted: false,
            stop_on_covering_final_position: false,
            _strategy: PhantomData,
        }
    }

    /// Abort the exploration as soon as a final place holds more than one
    /// token
    pub fn with_stop_on_covering_final_position(mut self, stop: bool) -> Self {
        self.stop_on_covering_final_position = stop;
        self
    }

    /// Explore the state space
    ///
    /// Calling this method again after the exploration finished has no
    /// effect.
    pub fn generate_graph(&mut self) {
        if self.is_generated {
            return;
        }
        info!("Starting generation of the {} of net '{}'", S::KIND, self.net.name());

        while let Some(current) = self.worklist.pop() {
            trace!("Expanding state {}", self.states[current.0]);
            self.expand(current);
            if self.aborted {
                self.worklist.clear();
            }
        }
        self.is_generated = true;

        info!(
            "Finished generation of the {} of net '{}': {} states, {} arcs, full graph: {}",
            S::KIND,
            self.net.name(),
            self.states.len(),
            self.arcs.len(),
            self.is_full_graph
        );
        self.oracle.log_statistics();
    }

    /// Compute all successors of `current`
    fn expand(&mut self, current: StateId) {
        let net = self.net;
        let oracle = self.oracle;

        for transition in net.transitions() {
            if self.aborted {
                return;
            }

            let preset = net.preset(transition.id());
            let state = &self.states[current.0];
            if !state.marking.enables(preset.iter().copied()) {
                continue;
            }
            let marking = state.marking.clone();
            let constraint = state.constraint.clone();
            let guard = transition.guard();

            let post = oracle.step(&constraint, guard.actual_constraint(), guard.write_vars());
            if oracle.can_be_satisfied(&post) {
                let successor = marking.fire(preset.iter().copied(), net.postset(transition.id()));
                self.insert_successor(
                    current,
                    TransitionRef::firing(transition),
                    successor,
                    oracle.simplify(&post),
                );
            }

            if S::SILENT_TRANSITIONS && !transition.is_silent() && !self.aborted {
                let read_condition = guard.read_condition(oracle);
                let negated = oracle.simplify(&(constraint.clone() & !read_condition));
                if oracle.can_be_satisfied(&negated) && !oracle.are_equal(&negated, &constraint) {
                    self.insert_successor(
                        current,
                        TransitionRef::negation_of(transition),
                        marking,
                        negated,
                    );
                }
            }
        }
    }

    /// States that are checked for covering when inserting a successor of
    /// `current`
    fn covering_scope(&self, current: StateId) -> Vec<StateId> {
        if S::MERGE_STATES {
            let state = &self.states[current.0];
            state
                .ancestors
                .iter()
                .copied()
                .chain(std::iter::once(current))
                .collect()
        } else {
            self.path_to_root(current)
        }
    }

    /// Insert the successor of `current` reached via `transition`, applying
    /// the covering policy of the strategy
    fn insert_successor(
        &mut self,
        current: StateId,
        transition: TransitionRef,
        mut marking: Marking,
        constraint: Constraint,
    ) {
        if self.stop_on_covering_final_position
            && self
                .net
                .final_places()
                .any(|p| marking.tokens(p) > TokenCount::Finite(1))
        {
            debug!(
                "Stopping exploration: marking {marking} puts more than one token into a final place"
            );
            self.is_full_graph = false;
            self.aborted = true;
            return;
        }

        let mut scope = self.covering_scope(current);
        let mut covering = Covering::default();

        match S::COVERING_POLICY {
            CoveringPolicy::Abort => {
                if let Some(ancestor) = self.find_covering_ancestor(
                    &marking,
                    &constraint,
                    &scope,
                    PartialOrdCompResult::GreaterThan,
                ) {
                    debug!(
                        "Net is unbounded: marking {marking} reached via {transition} strictly covers state {}",
                        self.states[ancestor.0]
                    );
                    self.is_full_graph = false;
                    self.aborted = true;
                    return;
                }
            }
            CoveringPolicy::Accelerate => {
                while let Some(ancestor) = self.find_covering_ancestor(
                    &marking,
                    &constraint,
                    &scope,
                    PartialOrdCompResult::GreaterThan,
                ) {
                    let (accelerated, places) = marking.accelerate(&self.states[ancestor.0].marking);
                    debug!(
                        "Accelerating places {} of marking {marking}, covered state {}",
                        places.join(", "),
                        self.states[ancestor.0]
                    );
                    marking = accelerated;
                    scope.retain(|s| *s != ancestor);
                    if covering.node.is_none() {
                        covering = Covering {
                            node: Some(ancestor),
                            kind: CoverageKind::StrictlyCovered,
                        };
                    }
                }
            }
        }

        if !S::MERGE_STATES {
            let scope = self.path_to_root(current);
            if let Some(covered) = self.find_covering_ancestor(
                &marking,
                &constraint,
                &scope,
                PartialOrdCompResult::Equal,
            ) {
                trace!("Marking {marking} repeats state {}", self.states[covered.0]);
                covering = Covering {
                    node: Some(covered),
                    kind: CoverageKind::NonstrictlyCovered,
                };
            }
        }

        self.add_new_state(current, transition, marking, constraint, covering);
    }

    /// Search `scope` for a state whose marking relates to `marking` by
    /// `required_order` and whose constraint is equivalent to `constraint`
    ///
    /// `required_order` is the result of comparing `marking` with the
    /// ancestor's marking.
    pub fn find_covering_ancestor(
        &self,
        marking: &Marking,
        constraint: &Constraint,
        scope: &[StateId],
        required_order: PartialOrdCompResult,
    ) -> Option<StateId> {
        scope.iter().copied().find(|id| {
            let ancestor = &self.states[id.0];
            marking.part_cmp(&ancestor.marking) == required_order
                && self.oracle.are_equal(constraint, &ancestor.constraint)
        })
    }

    /// Add the successor of `current` or, if states are merged, an arc to an
    /// existing state with equal marking and equivalent constraint
    fn add_new_state(
        &mut self,
        current: StateId,
        transition: TransitionRef,
        marking: Marking,
        constraint: Constraint,
        covering: Covering,
    ) -> StateId {
        let mut inherited = self.states[current.0].ancestors.clone();
        inherited.insert(current);

        if S::MERGE_STATES {
            let existing = self.by_marking.get(&marking).and_then(|candidates| {
                candidates
                    .iter()
                    .copied()
                    .find(|id| self.oracle.are_equal(&self.states[id.0].constraint, &constraint))
            });
            if let Some(existing) = existing {
                trace!("Merging successor via {transition} into {}", self.states[existing.0]);
                self.states[existing.0].ancestors.extend(inherited);
                self.push_arc(current, transition, existing);
                return existing;
            }
        }

        let id = StateId(self.states.len());
        let state = State {
            id,
            marking,
            constraint,
            ancestors: if S::MERGE_STATES {
                inherited
            } else {
                BTreeSet::new()
            },
            parent: Some(current),
            covering,
        };
        trace!("New state {state} via {transition}");

        self.by_marking
            .entry(state.marking.clone())
            .or_default()
            .push(id);
        self.states.push(state);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        self.push_arc(current, transition, id);

        if covering.kind != CoverageKind::NonstrictlyCovered {
            self.worklist.push(id);
        }
        id
    }

    fn push_arc(&mut self, source: StateId, transition: TransitionRef, target: StateId) {
        let arc = StateArc {
            source,
            transition,
            target,
        };
        if self.outgoing[source.0]
            .iter()
            .any(|i| self.arcs[*i] == arc)
        {
            return;
        }

        let index = self.arcs.len();
        self.arcs.push(arc);
        self.outgoing[source.0].push(index);
        self.incoming[target.0].push(index);
    }

    /// Parent chain from `state` up to and including the initial state
    pub fn path_to_root(&self, state: StateId) -> Vec<StateId> {
        let mut path = vec![state];
        let mut current = state;
        while let Some(parent) = self.states[current.0].parent {
            path.push(parent);
            current = parent;
        }
        path
    }

    /// Net the state space was generated for
    pub fn net(&self) -> &'a DataPetriNet {
        self.net
    }

    /// Oracle used during the exploration
    pub fn oracle(&self) -> &'a O {
        self.oracle
    }

    /// Kind of the state space
    pub fn kind(&self) -> StateSpaceKind {
        S::KIND
    }

    /// Check whether the state space is tree shaped
    pub fn is_tree(&self) -> bool {
        !S::MERGE_STATES
    }

    /// Whether the exploration finished without being aborted
    pub fn is_full_graph(&self) -> bool {
        self.is_full_graph
    }

    /// Id of the initial state
    pub fn initial_state(&self) -> StateId {
        StateId(0)
    }

    /// All states, indexed by their id
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// State with id `id`
    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.0]
    }

    /// All arcs
    pub fn arcs(&self) -> &[StateArc] {
        &self.arcs
    }

    /// Arcs leaving `state`
    pub fn outgoing(&self, state: StateId) -> impl Iterator<Item = &StateArc> {
        self.outgoing[state.0].iter().map(|i| &self.arcs[*i])
    }

    /// Arcs entering `state`
    pub fn incoming(&self, state: StateId) -> impl Iterator<Item = &StateArc> {
        self.incoming[state.0].iter().map(|i| &self.arcs[*i])
    }

    /// Final marking of the net
    pub fn final_marking(&self) -> &Marking {
        &self.final_marking
    }

    /// Check whether the marking of `state` is the final marking
    pub fn is_final_state(&self, state: StateId) -> bool {
        self.states[state.0].marking.is_final(&self.final_marking)
    }
}
