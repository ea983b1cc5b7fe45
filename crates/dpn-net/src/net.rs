//! Places, transitions, arcs and the [`DataPetriNet`] aggregate
//!
//! A [`DataPetriNet`] can only be constructed through the
//! [`builder::DataPetriNetBuilder`], which validates that all components are
//! consistent. The transformations used by refinement and repair operate on
//! owned clones of a net, so earlier versions stay valid for comparison and
//! rollback.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use dpn_constraints::oracle::ConstraintOracle;
use log::debug;

use crate::{
    PlaceId, TransitionId,
    guard::Guard,
    marking::{Marking, TokenCount},
    variables::VariableStore,
};

pub mod builder;

/// Place of a Data Petri Net
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Place {
    id: PlaceId,
    label: String,
    tokens: u32,
    is_final: bool,
}

impl Place {
    /// Create a new place
    pub fn new(id: impl ToString, label: impl ToString, tokens: u32, is_final: bool) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            tokens,
            is_final,
        }
    }

    /// Identifier of the place
    pub fn id(&self) -> &PlaceId {
        &self.id
    }

    /// Display label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Initial number of tokens
    pub fn tokens(&self) -> u32 {
        self.tokens
    }

    /// Check whether the place belongs to the final marking
    pub fn is_final(&self) -> bool {
        self.is_final
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Transition of a Data Petri Net
///
/// Two transitions are equal iff their ids are equal.
#[derive(Debug, Clone)]
pub struct Transition {
    id: TransitionId,
    label: String,
    guard: Guard,
    is_silent: bool,
    base_transition_id: TransitionId,
    is_split: bool,
}

impl Transition {
    /// Create a new visible transition
    pub fn new(id: impl ToString, label: impl ToString, guard: Guard) -> Self {
        let id = id.to_string();
        Self {
            base_transition_id: id.clone(),
            id,
            label: label.to_string(),
            guard,
            is_silent: false,
            is_split: false,
        }
    }

    /// Create a new silent (τ) transition
    pub fn silent(id: impl ToString, label: impl ToString, guard: Guard) -> Self {
        Self {
            is_silent: true,
            ..Self::new(id, label, guard)
        }
    }

    /// Set the id of the transition this transition was derived from
    pub fn with_base_transition_id(mut self, base: impl ToString) -> Self {
        self.base_transition_id = base.to_string();
        self.is_split = self.base_transition_id != self.id;
        self
    }

    /// Identifier of the transition
    pub fn id(&self) -> &TransitionId {
        &self.id
    }

    /// Display label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Guard of the transition
    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Check whether the transition is silent
    pub fn is_silent(&self) -> bool {
        self.is_silent
    }

    /// Id of the transition before any refinement
    pub fn base_transition_id(&self) -> &TransitionId {
        &self.base_transition_id
    }

    /// Check whether the transition was created by splitting another one
    pub fn is_split(&self) -> bool {
        self.is_split
    }

    /// Copy of the transition with a new guard
    pub fn with_guard(&self, guard: Guard) -> Self {
        Self {
            guard,
            ..self.clone()
        }
    }

    /// Split variant `index` of this transition with guard `guard`
    ///
    /// The variant keeps the base id of this transition.
    pub fn split(&self, index: usize, guard: Guard) -> Self {
        Self {
            id: format!("{}.{index}", self.id),
            label: self.label.clone(),
            guard,
            is_silent: self.is_silent,
            base_transition_id: self.base_transition_id.clone(),
            is_split: true,
        }
    }
}

impl PartialEq for Transition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Transition {}

impl std::hash::Hash for Transition {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_silent {
            write!(f, "τ{}: {}", self.id, self.guard)
        } else {
            write!(f, "{}: {}", self.id, self.guard)
        }
    }
}

/// Node of the net graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Node {
    /// Place with the given id
    Place(PlaceId),
    /// Transition with the given id
    Transition(TransitionId),
}

impl Node {
    /// Id of the node
    pub fn id(&self) -> &str {
        match self {
            Node::Place(id) | Node::Transition(id) => id,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Weighted arc between a place and a transition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Arc {
    source: Node,
    target: Node,
    weight: u32,
}

impl Arc {
    /// Create a new arc
    pub fn new(source: Node, target: Node, weight: u32) -> Self {
        Self {
            source,
            target,
            weight,
        }
    }

    /// Arc from place `place` into transition `transition`
    pub fn from_place(place: impl ToString, transition: impl ToString, weight: u32) -> Self {
        Self::new(
            Node::Place(place.to_string()),
            Node::Transition(transition.to_string()),
            weight,
        )
    }

    /// Arc from transition `transition` into place `place`
    pub fn to_place(transition: impl ToString, place: impl ToString, weight: u32) -> Self {
        Self::new(
            Node::Transition(transition.to_string()),
            Node::Place(place.to_string()),
            weight,
        )
    }

    /// Source node
    pub fn source(&self) -> &Node {
        &self.source
    }

    /// Target node
    pub fn target(&self) -> &Node {
        &self.target
    }

    /// Weight of the arc
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Check whether the arc is connected to `transition`
    fn touches_transition(&self, transition: &str) -> bool {
        matches!(&self.source, Node::Transition(t) if t == transition)
            || matches!(&self.target, Node::Transition(t) if t == transition)
    }

    /// Copy of the arc with the transition end replaced by `transition`
    fn retargeted(&self, transition: &str) -> Self {
        let replace = |node: &Node| match node {
            Node::Transition(_) => Node::Transition(transition.to_string()),
            place => place.clone(),
        };
        Self::new(replace(&self.source), replace(&self.target), self.weight)
    }
}

impl fmt::Display for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weight == 1 {
            write!(f, "{} -> {}", self.source, self.target)
        } else {
            write!(f, "{} -{}-> {}", self.source, self.weight, self.target)
        }
    }
}

/// Data Petri Net
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPetriNet {
    name: String,
    places: BTreeMap<PlaceId, Place>,
    transitions: BTreeMap<TransitionId, Transition>,
    arcs: Vec<Arc>,
    variables: VariableStore,
}

impl DataPetriNet {
    /// Name of the net
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All places, ordered by id
    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }

    /// Place with id `id`
    pub fn place(&self, id: &str) -> Option<&Place> {
        self.places.get(id)
    }

    /// All transitions, ordered by id
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    /// Transition with id `id`
    pub fn transition(&self, id: &str) -> Option<&Transition> {
        self.transitions.get(id)
    }

    /// Number of transitions
    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// All arcs
    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    /// Declared variables
    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    /// Input places of `transition` with the arc weights
    pub fn preset(&self, transition: &str) -> Vec<(&PlaceId, u32)> {
        self.arcs
            .iter()
            .filter_map(|arc| match (&arc.source, &arc.target) {
                (Node::Place(p), Node::Transition(t)) if t == transition => Some((p, arc.weight)),
                _ => None,
            })
            .collect()
    }

    /// Output places of `transition` with the arc weights
    pub fn postset(&self, transition: &str) -> Vec<(&PlaceId, u32)> {
        self.arcs
            .iter()
            .filter_map(|arc| match (&arc.source, &arc.target) {
                (Node::Transition(t), Node::Place(p)) if t == transition => Some((p, arc.weight)),
                _ => None,
            })
            .collect()
    }

    /// Marking given by the initial tokens of all places
    pub fn initial_marking(&self) -> Marking {
        Marking::new(
            self.places
                .values()
                .map(|p| (p.id.clone(), TokenCount::Finite(p.tokens))),
        )
    }

    /// One token in every final place and no token elsewhere
    pub fn final_marking(&self) -> Marking {
        Marking::new(
            self.places
                .values()
                .map(|p| (p.id.clone(), TokenCount::Finite(u32::from(p.is_final)))),
        )
    }

    /// Ids of the final places
    pub fn final_places(&self) -> impl Iterator<Item = &PlaceId> {
        self.places.values().filter(|p| p.is_final).map(|p| &p.id)
    }

    /// Replace the guard of transition `id`
    ///
    /// Returns `false` if the transition does not exist.
    pub fn set_guard(&mut self, id: &str, guard: Guard) -> bool {
        match self.transitions.get_mut(id) {
            Some(t) => {
                t.guard = guard;
                true
            }
            None => false,
        }
    }

    /// Replace transition `id` by `replacements`
    ///
    /// Every arc of the replaced transition is duplicated for each
    /// replacement.
    pub fn replace_transition(&mut self, id: &str, replacements: Vec<Transition>) {
        if self.transitions.remove(id).is_none() {
            return;
        }

        let (old_arcs, mut arcs): (Vec<_>, Vec<_>) = self
            .arcs
            .drain(..)
            .partition(|arc| arc.touches_transition(id));
        for t in replacements.iter() {
            arcs.extend(old_arcs.iter().map(|arc| arc.retargeted(&t.id)));
        }
        self.arcs = arcs;

        for t in replacements {
            debug!("Replacing transition '{id}' by '{t}'");
            self.transitions.insert(t.id.clone(), t);
        }
    }

    /// Remove all transitions not satisfying `keep` together with their arcs
    pub fn retain_transitions(&mut self, mut keep: impl FnMut(&Transition) -> bool) {
        let removed = self
            .transitions
            .values()
            .filter(|t| !keep(t))
            .map(|t| t.id.clone())
            .collect::<BTreeSet<_>>();

        for id in removed.iter() {
            debug!("Removing transition '{id}'");
            self.transitions.remove(id);
        }
        self.arcs
            .retain(|arc| !removed.iter().any(|id| arc.touches_transition(id)));
    }

    /// Remove all places that are not connected to any arc
    ///
    /// Places holding initial tokens or belonging to the final marking are
    /// kept.
    pub fn remove_isolated_places(&mut self) {
        let connected = self
            .arcs
            .iter()
            .flat_map(|arc| [&arc.source, &arc.target])
            .filter_map(|node| match node {
                Node::Place(p) => Some(p.clone()),
                Node::Transition(_) => None,
            })
            .collect::<BTreeSet<_>>();

        self.places.retain(|id, place| {
            let keep = connected.contains(id) || place.tokens > 0 || place.is_final;
            if !keep {
                debug!("Removing isolated place '{id}'");
            }
            keep
        });
    }

    /// Merge every group of split transitions sharing a base transition into
    /// a single transition
    ///
    /// The merged transition takes the base id and the simplified
    /// disjunction of the group's guards. Groups whose members do not share
    /// the same preset and postset are left untouched.
    pub fn merge_split_transitions<O: ConstraintOracle>(&mut self, oracle: &O) {
        let mut groups: BTreeMap<TransitionId, Vec<TransitionId>> = BTreeMap::new();
        for t in self.transitions.values().filter(|t| t.is_split) {
            groups
                .entry(t.base_transition_id.clone())
                .or_default()
                .push(t.id.clone());
        }

        for (base, members) in groups {
            let Some(first) = members.first() else {
                continue;
            };
            let mut preset = self.preset(first);
            preset.sort();
            let mut postset = self.postset(first);
            postset.sort();
            let same_arcs = members.iter().all(|m| {
                let mut pre = self.preset(m);
                pre.sort();
                let mut post = self.postset(m);
                post.sort();
                pre == preset && post == postset
            });
            if !same_arcs {
                debug!("Not merging split transitions of '{base}': arcs differ");
                continue;
            }

            let Some(guard) = Guard::merged(
                members.iter().filter_map(|m| self.transitions.get(m)).map(|t| &t.guard),
                oracle,
            ) else {
                continue;
            };
            let Some(template) = self.transitions.get(first) else {
                continue;
            };
            let merged = Transition {
                id: base.clone(),
                label: template.label.clone(),
                guard,
                is_silent: template.is_silent,
                base_transition_id: base.clone(),
                is_split: false,
            };

            debug!(
                "Merging split transitions {} into '{merged}'",
                members.join(", ")
            );
            self.replace_transition(first, vec![merged]);
            self.retain_transitions(|t| !members.contains(&t.id));
        }
    }
}

impl fmt::Display for DataPetriNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "net {} {{", self.name)?;
        for (name, decl) in self.variables.iter() {
            match decl.initial_value() {
                Some(v) => writeln!(f, "    var {name}: {} = {v};", decl.domain())?,
                None => writeln!(f, "    var {name}: {};", decl.domain())?,
            }
        }
        for place in self.places.values() {
            let final_flag = if place.is_final { " final" } else { "" };
            writeln!(f, "    place {}[{}]{final_flag};", place.id, place.tokens)?;
        }
        for transition in self.transitions.values() {
            writeln!(f, "    transition {transition};")?;
        }
        for arc in self.arcs.iter() {
            writeln!(f, "    {arc};")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use dpn_constraints::{
        expressions::{ComparisonOp, Constraint, Domain, Variable},
        fraction::Fraction,
        oracle::IntervalOracle,
    };

    use super::{builder::DataPetriNetBuilder, *};

    fn x_r() -> Variable {
        Variable::read("x", Domain::Integer)
    }

    fn sequence_net() -> DataPetriNet {
        DataPetriNetBuilder::new("sequence")
            .with_variable("x", Domain::Integer, Some(Fraction::from(0)))
            .unwrap()
            .with_places(vec![
                Place::new("i", "start", 1, false),
                Place::new("p", "middle", 0, false),
                Place::new("o", "end", 0, true),
                Place::new("unused", "unused", 0, false),
            ])
            .unwrap()
            .initialize()
            .with_transitions(vec![
                Transition::new(
                    "t1",
                    "write",
                    Guard::from(Constraint::comparison(
                        Variable::write("x", Domain::Integer),
                        ComparisonOp::Eq,
                        5,
                    )),
                ),
                Transition::new(
                    "t2",
                    "read",
                    Guard::from(Constraint::comparison(x_r(), ComparisonOp::Gt, 0)),
                ),
            ])
            .unwrap()
            .with_arcs(vec![
                Arc::from_place("i", "t1", 1),
                Arc::to_place("t1", "p", 1),
                Arc::from_place("p", "t2", 1),
                Arc::to_place("t2", "o", 1),
            ])
            .unwrap()
            .build()
    }

    #[test]
    fn test_presets_and_markings() {
        let net = sequence_net();

        let i = "i".to_string();
        let p = "p".to_string();
        assert_eq!(net.preset("t1"), vec![(&i, 1)]);
        assert_eq!(net.postset("t1"), vec![(&p, 1)]);

        assert_eq!(net.initial_marking().tokens("i"), TokenCount::Finite(1));
        assert_eq!(net.final_marking().tokens("o"), TokenCount::Finite(1));
        assert_eq!(net.final_marking().tokens("i"), TokenCount::Finite(0));
        assert_eq!(net.final_places().collect::<Vec<_>>(), vec!["o"]);
    }

    #[test]
    fn test_transition_equality_by_id() {
        let a = Transition::new("t", "a", Guard::tautology());
        let b = Transition::new(
            "t",
            "b",
            Guard::from(Constraint::comparison(x_r(), ComparisonOp::Gt, 0)),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_replace_and_merge_split_transitions() {
        let oracle = IntervalOracle::new();
        let mut net = sequence_net();
        let t2 = net.transition("t2").unwrap().clone();

        let pos = t2.split(
            0,
            t2.guard()
                .refined(Constraint::comparison(x_r(), ComparisonOp::Gt, 10)),
        );
        let neg = t2.split(
            1,
            t2.guard()
                .refined(Constraint::comparison(x_r(), ComparisonOp::Leq, 10)),
        );
        net.replace_transition("t2", vec![pos, neg]);

        assert!(net.transition("t2").is_none());
        assert_eq!(net.transition_count(), 3);
        assert_eq!(net.transition("t2.0").unwrap().base_transition_id(), "t2");
        assert!(net.transition("t2.1").unwrap().is_split());
        assert_eq!(net.preset("t2.1").len(), 1);
        assert_eq!(net.arcs().len(), 6);

        net.merge_split_transitions(&oracle);
        assert_eq!(net.transition_count(), 2);
        let merged = net.transition("t2").unwrap();
        assert!(!merged.is_split());
        assert!(oracle.are_equal(
            merged.guard().actual_constraint(),
            &Constraint::comparison(x_r(), ComparisonOp::Gt, 0)
        ));
        assert_eq!(net.arcs().len(), 4);
    }

    #[test]
    fn test_retain_and_remove_isolated() {
        let mut net = sequence_net();
        net.retain_transitions(|t| t.id() != "t2");
        assert_eq!(net.arcs().len(), 2);

        net.remove_isolated_places();
        assert!(net.place("unused").is_none());
        assert!(net.place("o").is_some());
        assert!(net.place("p").is_some());
    }
}
