//! Exploration strategies
//!
//! The four state-space variants only differ in a handful of decisions made
//! by the shared engine. Each variant is a zero-sized type implementing
//! [`ExplorationStrategy`].

use std::fmt;

/// Reaction to a new state whose marking strictly dominates an ancestor with
/// an equivalent constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoveringPolicy {
    /// Stop the exploration and report the state space as partial
    Abort,
    /// Set the growing places to ω and continue
    Accelerate,
}

/// Kind of an explored state space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateSpaceKind {
    /// Reachability graph
    ReachabilityGraph,
    /// Reachability graph with silent transitions
    ConstraintGraph,
    /// Karp-Miller style coverability graph
    CoverabilityGraph,
    /// Coverability tree
    CoverabilityTree,
}

impl fmt::Display for StateSpaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateSpaceKind::ReachabilityGraph => write!(f, "reachability graph"),
            StateSpaceKind::ConstraintGraph => write!(f, "constraint graph"),
            StateSpaceKind::CoverabilityGraph => write!(f, "coverability graph"),
            StateSpaceKind::CoverabilityTree => write!(f, "coverability tree"),
        }
    }
}

/// Decisions distinguishing the state-space variants
pub trait ExplorationStrategy {
    /// Kind of the state space produced by this strategy
    const KIND: StateSpaceKind;
    /// Merge states with equal marking and equivalent constraint; if disabled
    /// the state space is a tree
    const MERGE_STATES: bool;
    /// Add silent arcs for the branches in which a guard does not hold
    const SILENT_TRANSITIONS: bool;
    /// Reaction to strictly covered ancestors
    const COVERING_POLICY: CoveringPolicy;
}

/// Plain reachability graph
#[derive(Debug, Clone, Copy, Default)]
pub struct Reachability;

impl ExplorationStrategy for Reachability {
    const KIND: StateSpaceKind = StateSpaceKind::ReachabilityGraph;
    const MERGE_STATES: bool = true;
    const SILENT_TRANSITIONS: bool = false;
    const COVERING_POLICY: CoveringPolicy = CoveringPolicy::Abort;
}

/// Reachability graph with silent transitions
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintGraph;

impl ExplorationStrategy for ConstraintGraph {
    const KIND: StateSpaceKind = StateSpaceKind::ConstraintGraph;
    const MERGE_STATES: bool = true;
    const SILENT_TRANSITIONS: bool = true;
    const COVERING_POLICY: CoveringPolicy = CoveringPolicy::Abort;
}

/// Coverability graph with silent transitions
#[derive(Debug, Clone, Copy, Default)]
pub struct Coverability;

impl ExplorationStrategy for Coverability {
    const KIND: StateSpaceKind = StateSpaceKind::CoverabilityGraph;
    const MERGE_STATES: bool = true;
    const SILENT_TRANSITIONS: bool = true;
    const COVERING_POLICY: CoveringPolicy = CoveringPolicy::Accelerate;
}

/// Coverability tree with silent transitions
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverabilityTree;

impl ExplorationStrategy for CoverabilityTree {
    const KIND: StateSpaceKind = StateSpaceKind::CoverabilityTree;
    const MERGE_STATES: bool = false;
    const SILENT_TRANSITIONS: bool = true;
    const COVERING_POLICY: CoveringPolicy = CoveringPolicy::Accelerate;
}
