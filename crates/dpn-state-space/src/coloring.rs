//! Green/red coloring of explored state spaces
//!
//! A state is green if the final marking can still be reached from it. For
//! graphs this is decided by a backward search from the final states. For
//! coverability trees the search follows the tree: paths to final states are
//! green, and a repeating leaf becomes green once the state it repeats is
//! green.

use std::{collections::VecDeque, fmt};

use dpn_constraints::oracle::ConstraintOracle;
use log::debug;

use crate::{
    StateSpace,
    state::{CoverageKind, StateId},
    strategy::ExplorationStrategy,
};

/// Color of a state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// The final marking is reachable
    Green,
    /// The final marking is not reachable
    Red,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Green => write!(f, "green"),
            Color::Red => write!(f, "red"),
        }
    }
}

/// Color of every state of a state space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coloring {
    colors: Vec<Color>,
}

impl Coloring {
    /// Color of `state`
    pub fn color(&self, state: StateId) -> Color {
        self.colors[state.index()]
    }

    /// Check whether `state` is green
    pub fn is_green(&self, state: StateId) -> bool {
        self.color(state) == Color::Green
    }

    /// Check whether every state is green
    pub fn is_all_green(&self) -> bool {
        self.colors.iter().all(|c| *c == Color::Green)
    }

    /// Check whether every state is red
    pub fn is_all_red(&self) -> bool {
        self.colors.iter().all(|c| *c == Color::Red)
    }

    /// Ids of the green states
    pub fn green_states(&self) -> impl Iterator<Item = StateId> {
        self.colors
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == Color::Green)
            .map(|(i, _)| StateId(i))
    }

    /// Number of colored states
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Check whether no state is colored
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl<S: ExplorationStrategy, O: ConstraintOracle> StateSpace<'_, S, O> {
    /// Color the explored states
    pub fn coloring(&self) -> Coloring {
        let mut colors = vec![Color::Red; self.states().len()];

        if self.is_tree() {
            self.color_tree(&mut colors);
        } else {
            self.color_graph(&mut colors);
        }

        let green = colors.iter().filter(|c| **c == Color::Green).count();
        debug!(
            "Colored {} of {}: {green} green, {} red",
            self.states().len(),
            self.kind(),
            colors.len() - green
        );
        Coloring { colors }
    }

    /// Color `state` and its parents green until a green state is reached
    fn color_path_green(&self, state: StateId, colors: &mut [Color]) {
        let mut current = Some(state);
        while let Some(id) = current {
            if colors[id.index()] == Color::Green {
                return;
            }
            colors[id.index()] = Color::Green;
            current = self.state(id).parent();
        }
    }

    fn color_tree(&self, colors: &mut [Color]) {
        for state in self.states() {
            if self.is_final_state(state.id()) {
                self.color_path_green(state.id(), colors);
            }
        }

        loop {
            let mut changed = false;
            for state in self.states() {
                let covering = state.covering();
                if covering.kind != CoverageKind::NonstrictlyCovered
                    || colors[state.id().index()] == Color::Green
                {
                    continue;
                }
                if let Some(covered) = covering.node
                    && colors[covered.index()] == Color::Green
                {
                    self.color_path_green(state.id(), colors);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn color_graph(&self, colors: &mut [Color]) {
        let mut queue = self
            .states()
            .iter()
            .map(|s| s.id())
            .filter(|id| self.is_final_state(*id))
            .collect::<VecDeque<_>>();
        for id in queue.iter() {
            colors[id.index()] = Color::Green;
        }

        while let Some(id) = queue.pop_front() {
            for arc in self.incoming(id) {
                if colors[arc.source.index()] == Color::Red {
                    colors[arc.source.index()] = Color::Green;
                    queue.push_back(arc.source);
                }
            }
        }
    }
}
