//! Transition refinement
//!
//! A transition `t` writing variables that are read by another transition
//! `u` on the same cycle is split into variants, one for every satisfiable
//! combination of `u`'s conditions on the values `t` writes. Afterwards every
//! variant writes values on which `u`'s condition is fixed, which keeps the
//! number of distinct constraints reached on the cycle finite. The union of
//! the variants' guards is the original guard, so the behavior of the net is
//! unchanged.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

#[cfg(feature = "config_deserialize")]
use serde::Deserialize;

use dpn_constraints::{
    expressions::{Constraint, VariableMap, VariableRole},
    oracle::ConstraintOracle,
};
use dpn_net::{
    TransitionId,
    net::{DataPetriNet, Transition},
};
use dpn_state_space::{
    CoverabilityGraph, ReachabilityGraph, cycles::Cycle, strategy::StateSpaceKind,
};
use log::{debug, info, warn};

use crate::ConfigurationError;

/// State space whose cycles drive the refinement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config_deserialize", derive(Deserialize))]
#[cfg_attr(feature = "config_deserialize", serde(rename_all = "kebab-case"))]
pub enum BaseStructure {
    /// Reachability graph, aborted when the net turns out to be unbounded
    #[default]
    ReachabilityGraph,
    /// Coverability graph
    CoverabilityGraph,
}

impl FromStr for BaseStructure {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reachability-graph" | "reachability_graph" | "reachability" => {
                Ok(BaseStructure::ReachabilityGraph)
            }
            "coverability-graph" | "coverability_graph" | "coverability" => {
                Ok(BaseStructure::CoverabilityGraph)
            }
            _ => Err(ConfigurationError::invalid_value(
                "base_structure",
                s,
                "'reachability-graph' or 'coverability-graph'",
            )),
        }
    }
}

impl fmt::Display for BaseStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseStructure::ReachabilityGraph => write!(f, "reachability-graph"),
            BaseStructure::CoverabilityGraph => write!(f, "coverability-graph"),
        }
    }
}

/// Configuration of the [`TransitionRefiner`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config_deserialize", derive(Deserialize))]
pub struct RefinementConfig {
    /// State space whose cycles are used
    #[cfg_attr(feature = "config_deserialize", serde(default))]
    pub base_structure: BaseStructure,
    /// Maximal number of refinement rounds
    #[cfg_attr(
        feature = "config_deserialize",
        serde(default = "default_max_refinement_iterations")
    )]
    pub max_iterations: usize,
    /// Maximal number of conditions a single transition is split on, no
    /// limit if `None`
    #[cfg_attr(feature = "config_deserialize", serde(default))]
    pub max_split_conditions: Option<usize>,
}

/// Default number of refinement rounds
fn default_max_refinement_iterations() -> usize {
    10
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            base_structure: BaseStructure::default(),
            max_iterations: default_max_refinement_iterations(),
            max_split_conditions: None,
        }
    }
}

/// Result of a refinement
#[derive(Debug, Clone)]
pub struct RefinementResult {
    /// Refined net
    pub net: DataPetriNet,
    /// Kind of state space used to find the cycles
    pub base_structure_kind: StateSpaceKind,
    /// Number of refinement rounds
    pub iterations: usize,
    /// Transitions that were split, with the ids of their variants
    pub split_transitions: BTreeMap<TransitionId, Vec<TransitionId>>,
    /// Transitions that depended on more conditions than
    /// [`RefinementConfig::max_split_conditions`] and were only split on the
    /// first ones
    pub truncated_transitions: BTreeSet<TransitionId>,
}

/// Outcome of a single refinement round
#[derive(Debug, Clone)]
pub struct RefinementRound {
    /// Net after the round
    pub net: DataPetriNet,
    /// Transitions that were split, with the ids of their variants
    pub splits: BTreeMap<TransitionId, Vec<TransitionId>>,
    /// Transitions whose split conditions were cut
    pub truncated: BTreeSet<TransitionId>,
}

/// Refiner splitting transitions on cycles
#[derive(Debug)]
pub struct TransitionRefiner<'a, O: ConstraintOracle> {
    oracle: &'a O,
    config: RefinementConfig,
}

impl<'a, O: ConstraintOracle> TransitionRefiner<'a, O> {
    /// Create a new refiner
    pub fn new(oracle: &'a O, config: RefinementConfig) -> Self {
        Self { oracle, config }
    }

    /// Explore the base structure of `net` and return its cycles together
    /// with whether the exploration completed
    fn cycles_of(&self, net: &DataPetriNet) -> (Vec<Cycle>, bool) {
        match self.config.base_structure {
            BaseStructure::ReachabilityGraph => {
                let mut graph = ReachabilityGraph::new(net, self.oracle);
                graph.generate_graph();
                (graph.find_cycles(), graph.is_full_graph())
            }
            BaseStructure::CoverabilityGraph => {
                let mut graph = CoverabilityGraph::new(net, self.oracle);
                graph.generate_graph();
                (graph.find_cycles(), graph.is_full_graph())
            }
        }
    }

    /// Refine `net` until the number of transitions no longer changes
    pub fn refine(&self, net: &DataPetriNet) -> RefinementResult {
        let mut current = net.clone();
        let mut split_transitions = BTreeMap::new();
        let mut truncated_transitions = BTreeSet::new();
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            let (cycles, is_full_graph) = self.cycles_of(&current);
            if iterations > 0
                && is_full_graph
                && self.config.base_structure == BaseStructure::ReachabilityGraph
            {
                debug!("Reachability graph of the refined net is complete");
                break;
            }
            iterations += 1;

            let round = self.refine_on_cycles(&current, &cycles);
            truncated_transitions.extend(round.truncated);
            if round.net.transition_count() == current.transition_count() {
                break;
            }
            split_transitions.extend(round.splits);
            current = round.net;
        }

        if iterations >= self.config.max_iterations {
            warn!(
                "Refinement of net '{}' stopped after {iterations} rounds",
                net.name()
            );
        }
        if !truncated_transitions.is_empty() {
            warn!(
                "Split conditions of {} transitions were cut to {:?}",
                truncated_transitions.len(),
                self.config.max_split_conditions
            );
        }
        info!(
            "Refined net '{}' in {iterations} rounds on the {}: {} transitions split, {} transitions in total",
            net.name(),
            self.config.base_structure,
            split_transitions.len(),
            current.transition_count()
        );

        RefinementResult {
            net: current,
            base_structure_kind: match self.config.base_structure {
                BaseStructure::ReachabilityGraph => StateSpaceKind::ReachabilityGraph,
                BaseStructure::CoverabilityGraph => StateSpaceKind::CoverabilityGraph,
            },
            iterations,
            split_transitions,
            truncated_transitions,
        }
    }

    /// Compute for every transition writing variables the transitions on a
    /// common cycle reading them, closed transitively
    pub fn must_refine_with(
        net: &DataPetriNet,
        cycles: &[Cycle],
    ) -> BTreeMap<TransitionId, BTreeSet<TransitionId>> {
        let mut relation: BTreeMap<TransitionId, BTreeSet<TransitionId>> = BTreeMap::new();

        for cycle in cycles {
            let transitions = cycle
                .transitions()
                .into_iter()
                .filter_map(|id| net.transition(&id))
                .collect::<Vec<_>>();

            for t in transitions.iter() {
                let writes = t.guard().write_vars();
                if writes.is_empty() {
                    continue;
                }
                for u in transitions.iter().filter(|u| u.id() != t.id()) {
                    if u.guard().read_vars().keys().any(|v| writes.contains_key(v)) {
                        relation
                            .entry(t.id().clone())
                            .or_default()
                            .insert(u.id().clone());
                    }
                }
            }
        }

        let size = |r: &BTreeMap<TransitionId, BTreeSet<TransitionId>>| {
            r.values().map(|s| s.len()).sum::<usize>()
        };
        loop {
            let before = size(&relation);
            let snapshot = relation.clone();
            for (t, related) in relation.iter_mut() {
                let indirect = related
                    .iter()
                    .filter_map(|u| snapshot.get(u))
                    .flatten()
                    .filter(|v| *v != t)
                    .cloned()
                    .collect::<Vec<_>>();
                related.extend(indirect);
            }
            if size(&relation) == before {
                break;
            }
        }

        relation
    }

    /// Condition of `u` on the values written by `t`, over `t`'s write
    /// instances
    fn condition_on_writes(&self, u: &Transition, writes: &VariableMap) -> Constraint {
        let read_condition = u.guard().read_condition(self.oracle);
        let foreign = u
            .guard()
            .read_vars()
            .iter()
            .filter(|(name, _)| !writes.contains_key(*name))
            .map(|(name, domain)| (name.clone(), *domain))
            .collect::<VariableMap>();

        let projected = if foreign.is_empty() {
            read_condition
        } else {
            self.oracle
                .project(&read_condition, &foreign, VariableRole::Read)
        };
        self.oracle
            .simplify(&projected)
            .rename_role(writes, VariableRole::Read, VariableRole::Write)
    }

    /// Conditions `t` has to be split on
    fn split_conditions(&self, t: &Transition, related: &[&Transition]) -> Vec<Constraint> {
        let guard = t.guard().actual_constraint();
        let writes = t.guard().write_vars();

        let mut conditions: Vec<Constraint> = Vec::new();
        for u in related {
            let condition = self.condition_on_writes(u, writes);
            if condition.is_true() || condition.is_false() {
                continue;
            }
            // conditions fixed by the guard do not distinguish any firing
            if !self
                .oracle
                .can_be_satisfied(&(guard.clone() & condition.clone()))
                || self.oracle.implies(guard, &condition)
            {
                continue;
            }
            let negated = !condition.clone();
            if conditions.iter().any(|c| {
                self.oracle.are_equal(c, &condition) || self.oracle.are_equal(c, &negated)
            }) {
                continue;
            }
            conditions.push(condition);
        }
        conditions
    }

    /// Split `t` on every satisfiable sign combination of `conditions`
    ///
    /// Returns `None` if at most one combination is satisfiable.
    fn split(&self, t: &Transition, conditions: &[Constraint]) -> Option<Vec<Transition>> {
        let guard = t.guard().actual_constraint();

        // unsatisfiable prefixes are dropped before they are extended, the
        // first condition varies fastest
        let mut combinations = vec![Constraint::True];
        for condition in conditions.iter().rev() {
            let negated = !condition.clone();
            combinations = combinations
                .into_iter()
                .flat_map(|c| [c.clone() & negated.clone(), c & condition.clone()])
                .filter(|c| self.oracle.can_be_satisfied(&(guard.clone() & c.clone())))
                .collect();
        }
        let variants = combinations
            .iter()
            .map(|c| self.oracle.simplify(c))
            .collect::<Vec<_>>();

        if variants.len() <= 1 {
            return None;
        }
        Some(
            variants
                .into_iter()
                .enumerate()
                .map(|(i, combination)| {
                    t.split(i, t.guard().refined(combination).simplified(self.oracle))
                })
                .collect(),
        )
    }

    /// Perform one refinement round based on `cycles`
    pub fn refine_on_cycles(
        &self,
        net: &DataPetriNet,
        cycles: &[Cycle],
    ) -> RefinementRound {
        let relation = Self::must_refine_with(net, cycles);
        let mut refined = net.clone();
        let mut splits = BTreeMap::new();
        let mut truncated = BTreeSet::new();

        for (t_id, related) in relation.iter() {
            let Some(t) = net.transition(t_id) else {
                continue;
            };
            let related = related
                .iter()
                .filter_map(|u| net.transition(u))
                .collect::<Vec<_>>();

            let mut conditions = self.split_conditions(t, &related);
            if let Some(max) = self.config.max_split_conditions {
                if conditions.len() > max {
                    debug!(
                        "Transition '{t_id}' depends on {} conditions, only splitting on the first {max}",
                        conditions.len()
                    );
                    conditions.truncate(max);
                    truncated.insert(t_id.clone());
                }
            }
            if conditions.is_empty() {
                continue;
            }
            let Some(variants) = self.split(t, &conditions) else {
                continue;
            };

            debug!(
                "Splitting transition '{t_id}' into {} variants on {} conditions",
                variants.len(),
                conditions.len()
            );
            splits.insert(
                t_id.clone(),
                variants.iter().map(|v| v.id().clone()).collect(),
            );
            refined.replace_transition(t_id, variants);
        }

        RefinementRound {
            net: refined,
            splits,
            truncated,
        }
    }
}
