//! Symbolic states and arcs of a state space

use std::{collections::BTreeSet, fmt};

use dpn_constraints::expressions::Constraint;
use dpn_net::{TransitionId, marking::Marking, net::Transition};

/// Index of a state in the arena of its state space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub(crate) usize);

impl StateId {
    /// Id of the state at position `index` of the arena
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Position of the state in the arena
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Classification of a leaf of a coverability tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CoverageKind {
    /// Ordinary state
    #[default]
    NonCovered,
    /// Marking strictly dominates an ancestor with an equivalent constraint;
    /// the growing places have been accelerated to ω
    StrictlyCovered,
    /// Marking and constraint coincide with an ancestor; the state is a leaf
    /// that repeats the covered node
    NonstrictlyCovered,
}

/// Covering information of a state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Covering {
    /// State covered by this state
    pub node: Option<StateId>,
    /// Kind of the covering
    pub kind: CoverageKind,
}

/// Symbolic state: a marking together with a satisfiable constraint over the
/// read instances of the net's variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub(crate) id: StateId,
    pub(crate) marking: Marking,
    pub(crate) constraint: Constraint,
    /// States from which this state is reachable (graph variants)
    pub(crate) ancestors: BTreeSet<StateId>,
    /// Parent in the tree variant
    pub(crate) parent: Option<StateId>,
    pub(crate) covering: Covering,
}

impl State {
    /// Id of the state
    pub fn id(&self) -> StateId {
        self.id
    }

    /// Marking of the state
    pub fn marking(&self) -> &Marking {
        &self.marking
    }

    /// Constraint over the read variables
    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// States from which this state has been reached
    pub fn ancestors(&self) -> &BTreeSet<StateId> {
        &self.ancestors
    }

    /// Parent state in a coverability tree
    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }

    /// Covering information
    pub fn covering(&self) -> Covering {
        self.covering
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {{{}}}", self.id, self.marking, self.constraint)
    }
}

/// Reference to the transition labelling a state-space arc
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionRef {
    /// Id of the transition
    pub id: TransitionId,
    /// Id of the transition before refinement
    pub base_id: TransitionId,
    /// Whether the arc is unobservable
    pub is_silent: bool,
    /// Whether the arc records that the guard of `id` did not hold, i.e. the
    /// transition did not fire
    pub negated: bool,
}

impl TransitionRef {
    /// Reference to firing `transition`
    pub fn firing(transition: &Transition) -> Self {
        Self {
            id: transition.id().clone(),
            base_id: transition.base_transition_id().clone(),
            is_silent: transition.is_silent(),
            negated: false,
        }
    }

    /// Reference to the silent branch in which the guard of `transition` did
    /// not hold
    pub fn negation_of(transition: &Transition) -> Self {
        Self {
            is_silent: true,
            negated: true,
            ..Self::firing(transition)
        }
    }

    /// Check whether the arc fires the referenced transition
    pub fn fires(&self) -> bool {
        !self.negated
    }
}

impl fmt::Display for TransitionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "τ(¬{})", self.id)
        } else if self.is_silent {
            write!(f, "τ({})", self.id)
        } else {
            write!(f, "{}", self.id)
        }
    }
}

/// Arc between two states
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateArc {
    /// Source state
    pub source: StateId,
    /// Transition labelling the arc
    pub transition: TransitionRef,
    /// Target state
    pub target: StateId,
}

impl fmt::Display for StateArc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -{}-> {}", self.source, self.transition, self.target)
    }
}
