//! Cycle detection on explored state spaces
//!
//! For graphs a cycle is a maximal set of mutually reachable states. For
//! coverability trees every repeating leaf closes a cycle back to the state
//! it repeats. Cycles sharing a state are merged into compound cycles, so a
//! data dependency crossing two overlapping loops ends up in one cycle.

use std::collections::{BTreeSet, VecDeque};

use dpn_constraints::oracle::ConstraintOracle;
use dpn_net::TransitionId;
use log::debug;

use crate::{
    StateSpace,
    state::{CoverageKind, StateArc, StateId},
    strategy::ExplorationStrategy,
};

/// Cycle in a state space
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cycle {
    states: BTreeSet<StateId>,
    /// Arcs with both endpoints on the cycle
    cycle_arcs: BTreeSet<StateArc>,
    /// Arcs leaving any state of the cycle, including the cycle arcs
    output_arcs: BTreeSet<StateArc>,
}

impl Cycle {
    /// States on the cycle
    pub fn states(&self) -> &BTreeSet<StateId> {
        &self.states
    }

    /// Arcs between states of the cycle
    pub fn cycle_arcs(&self) -> &BTreeSet<StateArc> {
        &self.cycle_arcs
    }

    /// All arcs leaving a state of the cycle
    pub fn output_arcs(&self) -> &BTreeSet<StateArc> {
        &self.output_arcs
    }

    /// Ids of the transitions fired on cycle or output arcs
    pub fn transitions(&self) -> BTreeSet<TransitionId> {
        self.cycle_arcs
            .iter()
            .chain(self.output_arcs.iter())
            .filter(|arc| arc.transition.fires())
            .map(|arc| arc.transition.id.clone())
            .collect()
    }

    fn merge(&mut self, other: Cycle) {
        self.states.extend(other.states);
        self.cycle_arcs.extend(other.cycle_arcs);
        self.output_arcs.extend(other.output_arcs);
    }
}

impl<S: ExplorationStrategy, O: ConstraintOracle> StateSpace<'_, S, O> {
    /// Find all compound cycles of the state space
    pub fn find_cycles(&self) -> Vec<Cycle> {
        let cycles = if self.is_tree() {
            self.tree_cycles()
        } else {
            self.graph_cycles()
        };
        let elementary = cycles.len();

        let compound = merge_overlapping(cycles);
        debug!(
            "Found {elementary} cycles in the {}, merged into {} compound cycles",
            self.kind(),
            compound.len()
        );
        compound
    }

    fn cycle_from_states(&self, states: BTreeSet<StateId>, cycle_arcs: BTreeSet<StateArc>) -> Cycle {
        let output_arcs = states
            .iter()
            .flat_map(|s| self.outgoing(*s))
            .cloned()
            .collect();
        Cycle {
            states,
            cycle_arcs,
            output_arcs,
        }
    }

    /// States reachable from `start` in at least one step
    fn reachable_from(&self, start: StateId) -> BTreeSet<StateId> {
        let mut reached = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(id) = queue.pop_front() {
            for arc in self.outgoing(id) {
                if reached.insert(arc.target) {
                    queue.push_back(arc.target);
                }
            }
        }
        reached
    }

    fn graph_cycles(&self) -> Vec<Cycle> {
        let reach = self
            .states()
            .iter()
            .map(|s| self.reachable_from(s.id()))
            .collect::<Vec<_>>();

        let mut assigned = BTreeSet::new();
        let mut cycles = Vec::new();
        for state in self.states() {
            let id = state.id();
            if assigned.contains(&id) || !reach[id.index()].contains(&id) {
                continue;
            }

            let component = reach[id.index()]
                .iter()
                .copied()
                .filter(|other| reach[other.index()].contains(&id))
                .collect::<BTreeSet<_>>();
            assigned.extend(component.iter().copied());

            let cycle_arcs = self
                .arcs()
                .iter()
                .filter(|arc| component.contains(&arc.source) && component.contains(&arc.target))
                .cloned()
                .collect();
            cycles.push(self.cycle_from_states(component, cycle_arcs));
        }
        cycles
    }

    fn tree_cycles(&self) -> Vec<Cycle> {
        let mut cycles = Vec::new();
        for leaf in self.states() {
            let covering = leaf.covering();
            let (CoverageKind::NonstrictlyCovered, Some(covered)) = (covering.kind, covering.node)
            else {
                continue;
            };

            let mut states = BTreeSet::new();
            let mut cycle_arcs = BTreeSet::new();
            let mut current = leaf.id();
            states.insert(current);
            while current != covered {
                let Some(parent) = self.state(current).parent() else {
                    break;
                };
                cycle_arcs.extend(self.outgoing(parent).filter(|a| a.target == current).cloned());
                states.insert(parent);
                current = parent;
            }
            cycles.push(self.cycle_from_states(states, cycle_arcs));
        }
        cycles
    }
}

/// Merge cycles sharing at least one state until all cycles are disjoint
fn merge_overlapping(cycles: Vec<Cycle>) -> Vec<Cycle> {
    let mut merged: Vec<Cycle> = Vec::new();
    for mut cycle in cycles {
        loop {
            let Some(pos) = merged
                .iter()
                .position(|m| !m.states.is_disjoint(&cycle.states))
            else {
                break;
            };
            cycle.merge(merged.swap_remove(pos));
        }
        merged.push(cycle);
    }
    merged
}
