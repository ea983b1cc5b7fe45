//! Guard repair
//!
//! The [`SoundnessRepairer`] tightens transition guards until every state of
//! the coverability tree of the net can still reach the final marking. Each
//! round colors the tree; for every green state with a red child, the
//! transition leading there is restricted to exclude the red child's
//! constraint. Silent arcs are attributed to the closest non-silent
//! transition above them.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    time::{Duration, Instant},
};

#[cfg(feature = "config_deserialize")]
use serde::Deserialize;

use dpn_constraints::{
    expressions::{Constraint, VariableRole},
    oracle::ConstraintOracle,
};
use dpn_net::{TransitionId, guard::Guard, net::DataPetriNet};
use dpn_state_space::{
    CoverabilityTree,
    coloring::Coloring,
    state::{StateArc, StateId},
};
use log::{debug, info, warn};

use crate::{
    ConfigurationError,
    refinement::{RefinementConfig, TransitionRefiner},
};

/// Configuration of the [`SoundnessRepairer`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config_deserialize", derive(Deserialize))]
pub struct RepairConfig {
    /// Merge split transitions back after a successful repair
    #[cfg_attr(feature = "config_deserialize", serde(default = "default_true"))]
    pub merge_split_transitions: bool,
    /// Maximal number of rounds before the repair is inconclusive
    #[cfg_attr(
        feature = "config_deserialize",
        serde(default = "default_max_repair_iterations")
    )]
    pub max_iterations: usize,
    /// Configuration of the refinement performed between repair rounds
    #[cfg_attr(feature = "config_deserialize", serde(default))]
    pub refinement: RefinementConfig,
}

#[cfg(feature = "config_deserialize")]
fn default_true() -> bool {
    true
}

fn default_max_repair_iterations() -> usize {
    50
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            merge_split_transitions: true,
            max_iterations: default_max_repair_iterations(),
            refinement: RefinementConfig::default(),
        }
    }
}

impl RepairConfig {
    /// Build a configuration from key/value pairs
    ///
    /// Accepted keys are `merge_split_transitions`, `max_iterations`,
    /// `base_structure`, `max_refinement_iterations` and
    /// `max_split_conditions` (a number or `none`). Keys that are not given
    /// keep their default value.
    pub fn from_parameters(parameters: &[(&str, &str)]) -> Result<Self, ConfigurationError> {
        RepairConfig::default().with_parameters(parameters)
    }

    /// Override the options named in `parameters`
    pub fn with_parameters(self, parameters: &[(&str, &str)]) -> Result<Self, ConfigurationError> {
        let mut config = self;

        for (key, value) in parameters {
            match *key {
                "merge_split_transitions" => {
                    config.merge_split_transitions = value.trim().parse().map_err(|_| {
                        ConfigurationError::invalid_value(key, value, "'true' or 'false'")
                    })?;
                }
                "max_iterations" => {
                    config.max_iterations = value.trim().parse().map_err(|_| {
                        ConfigurationError::invalid_value(key, value, "a non-negative integer")
                    })?;
                }
                "base_structure" => {
                    config.refinement.base_structure = value.parse()?;
                }
                "max_refinement_iterations" => {
                    config.refinement.max_iterations = value.trim().parse().map_err(|_| {
                        ConfigurationError::invalid_value(key, value, "a non-negative integer")
                    })?;
                }
                "max_split_conditions" => {
                    config.refinement.max_split_conditions = match value.trim() {
                        "none" => None,
                        limit => Some(limit.parse().map_err(|_| {
                            ConfigurationError::invalid_value(
                                key,
                                value,
                                "a non-negative integer or 'none'",
                            )
                        })?),
                    };
                }
                _ => return Err(ConfigurationError::UnknownParameter(key.to_string())),
            }
        }

        Ok(config)
    }
}

/// Outcome of a repair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepairOutcome {
    /// The repaired net is sound
    Succeeded,
    /// No guard tightening can make the net sound
    Failed,
    /// The maximal number of rounds was reached
    Inconclusive,
}

impl fmt::Display for RepairOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairOutcome::Succeeded => write!(f, "succeeded"),
            RepairOutcome::Failed => write!(f, "failed"),
            RepairOutcome::Inconclusive => write!(f, "inconclusive"),
        }
    }
}

/// Guard of a transition before and after the repair
#[derive(Debug, Clone, PartialEq)]
pub struct GuardChange {
    /// Repaired transition
    pub transition: TransitionId,
    /// Constraint before the repair
    pub before: Constraint,
    /// Constraint after the repair
    pub after: Constraint,
}

/// Result of a repair
#[derive(Debug, Clone)]
pub struct RepairResult {
    /// Outcome of the repair
    pub outcome: RepairOutcome,
    /// Number of repair steps that changed at least one guard
    pub repair_steps: usize,
    /// Time spent
    pub repair_time: Duration,
    /// Repaired net, or the input net if the repair did not succeed
    pub net: DataPetriNet,
    /// Guards changed by the repair
    pub guard_changes: Vec<GuardChange>,
}

impl RepairResult {
    /// Check whether the repair succeeded
    pub fn is_success(&self) -> bool {
        self.outcome == RepairOutcome::Succeeded
    }
}

/// Restrictions collected for one transition during a repair step
#[derive(Debug, Default)]
struct PendingUpdate {
    /// Negated constraints of red states reached through the transition
    conjuncts: Vec<Constraint>,
    /// Sources of the arcs the restrictions were derived from
    sources: BTreeSet<StateId>,
}

/// Repairer tightening guards until the net is sound
#[derive(Debug)]
pub struct SoundnessRepairer<'a, O: ConstraintOracle> {
    oracle: &'a O,
    config: RepairConfig,
}

impl<'a, O: ConstraintOracle> SoundnessRepairer<'a, O> {
    /// Create a new repairer
    pub fn new(oracle: &'a O, config: RepairConfig) -> Self {
        Self { oracle, config }
    }

    /// Repair `net`
    ///
    /// The input net is never modified. If no repair is found, the result
    /// carries a copy of the input net.
    pub fn repair(&self, net: &DataPetriNet) -> RepairResult {
        let start = Instant::now();
        let refiner = TransitionRefiner::new(self.oracle, self.config.refinement.clone());

        let mut current = net.clone();
        let mut refine = true;
        let mut previous_all_green = false;
        let mut repair_steps = 0;
        let mut iteration = 0;
        let mut fired = BTreeSet::new();

        let outcome = loop {
            if iteration >= self.config.max_iterations {
                warn!(
                    "Repair of net '{}' stopped after {iteration} rounds",
                    net.name()
                );
                break RepairOutcome::Inconclusive;
            }
            iteration += 1;

            if refine {
                let refined = refiner.refine(&current);
                if refined.net.transition_count() != current.transition_count() {
                    debug!(
                        "Round {iteration}: adopting refined net with {} transitions",
                        refined.net.transition_count()
                    );
                    current = refined.net;
                }
                refine = false;
            }

            let step = {
                let mut tree = CoverabilityTree::new(&current, self.oracle);
                tree.generate_graph();
                let coloring = tree.coloring();

                if coloring.is_all_green() {
                    if previous_all_green {
                        fired = tree
                            .arcs()
                            .iter()
                            .filter(|arc| arc.transition.fires())
                            .map(|arc| arc.transition.id.clone())
                            .collect();
                        break RepairOutcome::Succeeded;
                    }
                    debug!("Round {iteration}: all states are green");
                    previous_all_green = true;
                    refine = true;
                    continue;
                }
                previous_all_green = false;

                if coloring.is_all_red() {
                    info!(
                        "Round {iteration}: no state reaches the final marking, net '{}' cannot be repaired",
                        net.name()
                    );
                    break RepairOutcome::Failed;
                }

                self.repair_step(&tree, &coloring)
            };

            if step.is_empty() {
                info!(
                    "Round {iteration}: no guard of net '{}' can be tightened further",
                    net.name()
                );
                break RepairOutcome::Failed;
            }
            for (id, guard) in step {
                debug!("Round {iteration}: new guard of '{id}' is {guard}");
                current.set_guard(&id, guard);
            }
            repair_steps += 1;
        };

        let repair_time = start.elapsed();
        info!(
            "Repair of net '{}' {outcome} after {repair_steps} repair steps in {} ms",
            net.name(),
            repair_time.as_millis()
        );

        if outcome != RepairOutcome::Succeeded {
            return RepairResult {
                outcome,
                repair_steps,
                repair_time,
                net: net.clone(),
                guard_changes: Vec::new(),
            };
        }

        self.clean_up(&mut current, &fired);
        let guard_changes = current
            .transitions()
            .filter(|t| t.guard().is_repaired())
            .map(|t| GuardChange {
                transition: t.id().clone(),
                before: t.guard().constraint_before_update().clone(),
                after: t.guard().actual_constraint().clone(),
            })
            .collect();

        RepairResult {
            outcome,
            repair_steps,
            repair_time,
            net: current,
            guard_changes,
        }
    }

    /// Arc through which the firing behind `arc` is attributed
    ///
    /// Silent arcs are followed upwards through the tree until a non-silent
    /// arc is found. Returns `None` if the root is reached first.
    fn attributed_arc<'t>(
        tree: &'t CoverabilityTree<'_, O>,
        arc: &'t StateArc,
    ) -> Option<&'t StateArc> {
        let mut current = arc;
        while current.transition.is_silent {
            current = tree.incoming(current.source).next()?;
        }
        Some(current)
    }

    /// Compute the new guards of one repair step
    ///
    /// Tightenings that do not change any successor constraint are dropped.
    fn repair_step(
        &self,
        tree: &CoverabilityTree<'_, O>,
        coloring: &Coloring,
    ) -> BTreeMap<TransitionId, Guard> {
        let net = tree.net();
        let mut pending: BTreeMap<TransitionId, PendingUpdate> = BTreeMap::new();

        for green in coloring.green_states() {
            for arc in tree
                .outgoing(green)
                .filter(|arc| !coloring.is_green(arc.target))
            {
                let Some(attributed) = Self::attributed_arc(tree, arc) else {
                    debug!(
                        "Red state {} is only reached through silent transitions",
                        arc.target
                    );
                    continue;
                };
                let Some(transition) = net.transition(&attributed.transition.id) else {
                    continue;
                };

                let red = tree.state(arc.target).constraint();
                let excluded = red.rename_role(
                    transition.guard().write_vars(),
                    VariableRole::Read,
                    VariableRole::Write,
                );

                let update = pending.entry(transition.id().clone()).or_default();
                update.conjuncts.push(!excluded);
                update.sources.insert(attributed.source);
            }
        }

        let mut updates = BTreeMap::new();
        for (id, update) in pending {
            let Some(transition) = net.transition(&id) else {
                continue;
            };
            let old = transition.guard();
            let tightened = self.oracle.simplify(
                &(old.actual_constraint().clone() & Constraint::conjunction(update.conjuncts)),
            );
            let new = old.repaired(tightened);

            let unchanged = update.sources.iter().all(|source| {
                let before = tree.state(*source).constraint();
                self.oracle.are_equal(
                    &self
                        .oracle
                        .step(before, old.actual_constraint(), old.write_vars()),
                    &self
                        .oracle
                        .step(before, new.actual_constraint(), new.write_vars()),
                )
            });
            if unchanged {
                debug!("Restoring guard of '{id}': tightening has no effect");
                continue;
            }
            updates.insert(id, new);
        }

        updates
    }

    /// Remove what the successful repair made unreachable
    fn clean_up(&self, net: &mut DataPetriNet, fired: &BTreeSet<TransitionId>) {
        net.retain_transitions(|t| fired.contains(t.id()));
        net.remove_isolated_places();
        if self.config.merge_split_transitions {
            net.merge_split_transitions(self.oracle);
        }
    }
}
