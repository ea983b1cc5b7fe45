//! Soundness analysis
//!
//! The [`SoundnessAnalyzer`] assigns [`StateType`]s to the states of an
//! explored state space and derives the soundness verdict from them. A net is
//! classically sound if its state space is finite, every state can reach the
//! final marking, no state marks the final places while leaving other tokens
//! behind, and every transition can fire. Relaxed lazy soundness only
//! requires that every transition can fire on some run that still reaches
//! the final marking.

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt,
    str::FromStr,
};

#[cfg(feature = "config_deserialize")]
use serde::Deserialize;

use dpn_constraints::oracle::ConstraintOracle;
use dpn_net::{TransitionId, net::DataPetriNet};
use dpn_state_space::{
    ConstraintStateGraph, CoverabilityGraph, StateSpace,
    state::{CoverageKind, StateId},
    strategy::ExplorationStrategy,
};
use log::{debug, info};

use crate::ConfigurationError;

/// Notion of soundness to check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config_deserialize", derive(Deserialize))]
#[cfg_attr(feature = "config_deserialize", serde(rename_all = "kebab-case"))]
pub enum SoundnessType {
    /// Boundedness, no deadlocks, proper completion and no dead transitions
    #[default]
    Classical,
    /// Every transition can fire on some run reaching the final marking
    RelaxedLazy,
}

impl FromStr for SoundnessType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "classical" => Ok(SoundnessType::Classical),
            "relaxed-lazy" | "relaxedlazy" | "relaxed_lazy" => Ok(SoundnessType::RelaxedLazy),
            _ => Err(ConfigurationError::invalid_value(
                "soundness_type",
                s,
                "'classical' or 'relaxed-lazy'",
            )),
        }
    }
}

impl fmt::Display for SoundnessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundnessType::Classical => write!(f, "classical"),
            SoundnessType::RelaxedLazy => write!(f, "relaxed-lazy"),
        }
    }
}

/// Classification of a single state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateType {
    /// The initial state
    Initial,
    /// The marking is the final marking
    Final,
    /// The final places are marked but tokens remain elsewhere or in excess
    UncleanFinal,
    /// No transition can fire and the state is not final
    Deadlock,
    /// The final marking cannot be reached from the state
    NoWayToFinalMarking,
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateType::Initial => write!(f, "initial"),
            StateType::Final => write!(f, "final"),
            StateType::UncleanFinal => write!(f, "unclean final"),
            StateType::Deadlock => write!(f, "deadlock"),
            StateType::NoWayToFinalMarking => write!(f, "no way to final marking"),
        }
    }
}

/// Result of a soundness analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundnessProperties {
    soundness_type: SoundnessType,
    state_types: BTreeMap<StateId, BTreeSet<StateType>>,
    boundedness: bool,
    dead_transitions: BTreeSet<TransitionId>,
    unfeasible_transitions: BTreeSet<TransitionId>,
    is_sound: bool,
}

impl SoundnessProperties {
    /// Notion of soundness that was checked
    pub fn soundness_type(&self) -> SoundnessType {
        self.soundness_type
    }

    /// Types of every explored state
    pub fn state_types(&self) -> &BTreeMap<StateId, BTreeSet<StateType>> {
        &self.state_types
    }

    /// Check whether `state` has type `ty`
    pub fn has_type(&self, state: StateId, ty: StateType) -> bool {
        self.state_types
            .get(&state)
            .is_some_and(|types| types.contains(&ty))
    }

    /// States having type `ty`
    pub fn states_of_type(&self, ty: StateType) -> impl Iterator<Item = StateId> {
        self.state_types
            .iter()
            .filter(move |(_, types)| types.contains(&ty))
            .map(|(id, _)| *id)
    }

    /// Whether the explored state space is finite and free of ω
    pub fn boundedness(&self) -> bool {
        self.boundedness
    }

    /// Base transitions that never fire
    pub fn dead_transitions(&self) -> &BTreeSet<TransitionId> {
        &self.dead_transitions
    }

    /// Base transitions that are dead or only lead to states from which the
    /// final marking is unreachable
    pub fn unfeasible_transitions(&self) -> &BTreeSet<TransitionId> {
        &self.unfeasible_transitions
    }

    /// Number of deadlock states
    pub fn deadlocks(&self) -> usize {
        self.states_of_type(StateType::Deadlock).count()
    }

    /// Whether some state is a deadlock
    pub fn has_deadlocks(&self) -> bool {
        self.deadlocks() > 0
    }

    /// Verdict
    pub fn is_sound(&self) -> bool {
        self.is_sound
    }
}

impl fmt::Display for SoundnessProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.is_sound { "sound" } else { "not sound" };
        write!(
            f,
            "{} {verdict}: bounded: {}, deadlocks: {}, dead transitions: [{}]",
            self.soundness_type,
            self.boundedness,
            self.deadlocks(),
            self.dead_transitions
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

/// Analyzer computing [`SoundnessProperties`]
#[derive(Debug)]
pub struct SoundnessAnalyzer<'a, O: ConstraintOracle> {
    oracle: &'a O,
}

impl<'a, O: ConstraintOracle> SoundnessAnalyzer<'a, O> {
    /// Create a new analyzer answering constraint queries with `oracle`
    pub fn new(oracle: &'a O) -> Self {
        Self { oracle }
    }

    /// Explore the state space of `net` and check soundness of type
    /// `soundness_type`
    ///
    /// Classical soundness is checked on the constraint graph, relaxed lazy
    /// soundness on the coverability graph.
    pub fn check(&self, net: &DataPetriNet, soundness_type: SoundnessType) -> SoundnessProperties {
        info!("Checking {soundness_type} soundness of net '{}'", net.name());
        match soundness_type {
            SoundnessType::Classical => {
                let mut graph = ConstraintStateGraph::new(net, self.oracle);
                graph.generate_graph();
                Self::analyze(&graph, soundness_type)
            }
            SoundnessType::RelaxedLazy => {
                let mut graph = CoverabilityGraph::new(net, self.oracle);
                graph.generate_graph();
                Self::analyze(&graph, soundness_type)
            }
        }
    }

    /// Analyze an already explored state space
    pub fn analyze<S: ExplorationStrategy>(
        space: &StateSpace<'_, S, O>,
        soundness_type: SoundnessType,
    ) -> SoundnessProperties {
        let net = space.net();
        let final_marking = space.final_marking();

        let can_reach_final = Self::states_reaching_final(space);
        let mut state_types = BTreeMap::new();
        for state in space.states() {
            let id = state.id();
            let mut types = BTreeSet::new();

            if id == space.initial_state() {
                types.insert(StateType::Initial);
            }
            if state.marking().is_final(final_marking) {
                types.insert(StateType::Final);
            } else if state.marking().strictly_covers_final(final_marking) {
                types.insert(StateType::UncleanFinal);
            }

            let has_successor = space.outgoing(id).next().is_some()
                || state.covering().kind == CoverageKind::NonstrictlyCovered;
            if !has_successor
                && !types.contains(&StateType::Final)
                && !types.contains(&StateType::UncleanFinal)
            {
                types.insert(StateType::Deadlock);
            }
            if !can_reach_final.contains(&id) {
                types.insert(StateType::NoWayToFinalMarking);
            }

            state_types.insert(id, types);
        }

        let fired = space
            .arcs()
            .iter()
            .filter(|arc| arc.transition.fires())
            .map(|arc| arc.transition.base_id.clone())
            .collect::<BTreeSet<_>>();
        let dead_transitions = net
            .transitions()
            .map(|t| t.base_transition_id().clone())
            .filter(|id| !fired.contains(id))
            .collect::<BTreeSet<_>>();

        let boundedness =
            space.is_full_graph() && !space.states().iter().any(|s| s.marking().has_omega());

        // a transition is feasible if one of its firings keeps the final
        // marking reachable
        let feasible = space
            .arcs()
            .iter()
            .filter(|arc| arc.transition.fires() && can_reach_final.contains(&arc.target))
            .map(|arc| arc.transition.base_id.clone())
            .collect::<BTreeSet<_>>();
        let unfeasible_transitions = net
            .transitions()
            .map(|t| t.base_transition_id().clone())
            .filter(|id| !feasible.contains(id))
            .chain(dead_transitions.iter().cloned())
            .collect::<BTreeSet<_>>();

        let has_type = |ty: StateType| state_types.values().any(|types| types.contains(&ty));
        let is_sound = match soundness_type {
            SoundnessType::Classical => {
                boundedness
                    && !has_type(StateType::Deadlock)
                    && !has_type(StateType::NoWayToFinalMarking)
                    && !has_type(StateType::UncleanFinal)
                    && dead_transitions.is_empty()
            }
            SoundnessType::RelaxedLazy => unfeasible_transitions.is_empty(),
        };

        let properties = SoundnessProperties {
            soundness_type,
            state_types,
            boundedness,
            dead_transitions,
            unfeasible_transitions,
            is_sound,
        };
        info!(
            "Analyzed {} of net '{}' with {} states: {properties}",
            space.kind(),
            net.name(),
            space.states().len()
        );
        properties
    }

    /// States from which a final state can be reached, found by a backward
    /// search from the final states
    ///
    /// A leaf repeating an ancestor continues like the repeated state.
    fn states_reaching_final<S: ExplorationStrategy>(
        space: &StateSpace<'_, S, O>,
    ) -> BTreeSet<StateId> {
        let mut covered_by: BTreeMap<StateId, Vec<StateId>> = BTreeMap::new();
        for state in space.states() {
            let covering = state.covering();
            if let (CoverageKind::NonstrictlyCovered, Some(node)) = (covering.kind, covering.node) {
                covered_by.entry(node).or_default().push(state.id());
            }
        }

        let mut reached = space
            .states()
            .iter()
            .map(|s| s.id())
            .filter(|id| space.is_final_state(*id))
            .collect::<BTreeSet<_>>();
        let mut queue = reached.iter().copied().collect::<VecDeque<_>>();

        while let Some(id) = queue.pop_front() {
            let predecessors = space
                .incoming(id)
                .map(|arc| arc.source)
                .chain(covered_by.get(&id).into_iter().flatten().copied());
            for pred in predecessors {
                if reached.insert(pred) {
                    queue.push_back(pred);
                }
            }
        }

        debug!(
            "{} of {} states can reach the final marking",
            reached.len(),
            space.states().len()
        );
        reached
    }
}
