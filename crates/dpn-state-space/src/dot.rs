//! Visualization of explored state spaces in DOT format
//!
//! This module provides the trait [`ToDOT`] for exporting state spaces into
//! the [DOT format](https://graphviz.org/doc/info/lang.html), which can be
//! rendered using tools like [Graphviz](https://graphviz.org/). Silent arcs
//! are dashed; when a [`Coloring`] is supplied, states are filled green or
//! red.

use dpn_constraints::oracle::ConstraintOracle;

use crate::{
    StateSpace,
    coloring::{Color, Coloring},
    state::CoverageKind,
    strategy::ExplorationStrategy,
};

/// Font options shared by the whole graph
const GRAPH_OPTIONS: &str = "\
rankdir=TB \
fontname=\"Helvetica,Arial,sans-serif\" \
node [fontname=\"Helvetica,Arial,sans-serif\", shape = box] \
edge [fontname=\"Helvetica,Arial,sans-serif\"];";

/// Options of the initial state
const INITIAL_STATE_OPTIONS: &str = "peripheries = 2";
/// Options of states repeating an ancestor
const COVERED_STATE_OPTIONS: &str = "style = dashed";
/// Options of silent arcs
const SILENT_ARC_OPTIONS: &str = "style = dashed";

/// Objects implementing this trait can be visualized with graphviz
///
/// This trait is only available if the `dot` feature is enabled.
pub trait ToDOT {
    /// Get the state space in DOT format
    fn get_dot_graph(&self) -> String;

    /// Get the state space in DOT format with states filled by `coloring`
    fn get_colored_dot_graph(&self, coloring: &Coloring) -> String;
}

fn escape(label: impl ToString) -> String {
    label.to_string().replace('"', "\\\"")
}

impl<S: ExplorationStrategy, O: ConstraintOracle> StateSpace<'_, S, O> {
    fn encode(&self, coloring: Option<&Coloring>) -> String {
        let mut out = format!("digraph \"{}\" {{\n    {GRAPH_OPTIONS}\n", escape(self.net().name()));

        for state in self.states() {
            let mut options = vec![format!(
                "label = \"{}\\n{}\\n{}\"",
                state.id(),
                escape(state.marking()),
                escape(state.constraint())
            )];
            if state.id() == self.initial_state() {
                options.push(INITIAL_STATE_OPTIONS.to_string());
            }
            if state.covering().kind == CoverageKind::NonstrictlyCovered {
                options.push(COVERED_STATE_OPTIONS.to_string());
            }
            if let Some(coloring) = coloring {
                let fill = match coloring.color(state.id()) {
                    Color::Green => "palegreen",
                    Color::Red => "lightcoral",
                };
                options.push(format!("style = filled, fillcolor = {fill}"));
            }
            out += &format!("    {} [{}];\n", state.id(), options.join(", "));
        }

        for arc in self.arcs() {
            let mut options = vec![format!("label = \"{}\"", escape(&arc.transition))];
            if arc.transition.is_silent {
                options.push(SILENT_ARC_OPTIONS.to_string());
            }
            out += &format!(
                "    {} -> {} [{}];\n",
                arc.source,
                arc.target,
                options.join(", ")
            );
        }

        for state in self.states() {
            let covering = state.covering();
            if let (CoverageKind::NonstrictlyCovered, Some(covered)) = (covering.kind, covering.node) {
                out += &format!("    {} -> {covered} [style = dotted];\n", state.id());
            }
        }

        out += "}";
        out
    }
}

impl<S: ExplorationStrategy, O: ConstraintOracle> ToDOT for StateSpace<'_, S, O> {
    fn get_dot_graph(&self) -> String {
        self.encode(None)
    }

    fn get_colored_dot_graph(&self, coloring: &Coloring) -> String {
        self.encode(Some(coloring))
    }
}

#[cfg(test)]
mod tests {
    use dpn_constraints::oracle::IntervalOracle;
    use dpn_net::{
        guard::Guard,
        net::{Arc, Place, Transition, builder::DataPetriNetBuilder},
    };

    use super::*;
    use crate::CoverabilityTree;

    #[test]
    fn test_dot_contains_states_and_arcs() {
        let net = DataPetriNetBuilder::new("dot")
            .with_places(vec![
                Place::new("i", "i", 1, false),
                Place::new("o", "o", 0, true),
            ])
            .unwrap()
            .initialize()
            .with_transition(Transition::new("t", "t", Guard::tautology()))
            .unwrap()
            .with_arcs(vec![Arc::from_place("i", "t", 1), Arc::to_place("t", "o", 1)])
            .unwrap()
            .build();
        let oracle = IntervalOracle::new();
        let mut tree = CoverabilityTree::new(&net, &oracle);
        tree.generate_graph();

        let dot = tree.get_colored_dot_graph(&tree.coloring());
        assert!(dot.starts_with("digraph \"dot\""));
        assert!(dot.contains("s0 -> s1 [label = \"t\"]"));
        assert!(dot.contains("palegreen"));
        assert!(!dot.contains("lightcoral"));
    }
}
