//! Factory methods for building a valid [`DataPetriNet`]
//!
//! The builder ensures that all guards only use declared variables with the
//! declared domain, that identifiers are unique and that every arc connects
//! a place with a transition.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use dpn_constraints::{
    expressions::{Domain, Variable},
    fraction::Fraction,
};

use super::{Arc, DataPetriNet, Node, Place, Transition};
use crate::variables::{VariableDeclaration, VariableStore};

/// Builder for constructing a [`DataPetriNet`]
///
/// The builder has two stages: in the first stage variables and places are
/// declared. Calling [`DataPetriNetBuilder::initialize`] turns the builder
/// into an [`InitializedDataPetriNetBuilder`], which accepts transitions and
/// arcs. Transitions have to be added before the arcs connected to them.
///
/// # Example
///
/// ```
/// use dpn_constraints::expressions::{ComparisonOp, Constraint, Domain, Variable};
/// use dpn_net::{guard::Guard, net::{Arc, Place, Transition, builder::DataPetriNetBuilder}};
///
/// let net = DataPetriNetBuilder::new("example")
///     .with_variable("x", Domain::Integer, None).unwrap()
///     .with_places(vec![
///         Place::new("i", "start", 1, false),
///         Place::new("o", "end", 0, true),
///     ]).unwrap()
///     .initialize()
///     .with_transition(Transition::new(
///         "t",
///         "write x",
///         Guard::from(Constraint::comparison(
///             Variable::write("x", Domain::Integer),
///             ComparisonOp::Eq,
///             1,
///         )),
///     )).unwrap()
///     .with_arcs(vec![Arc::from_place("i", "t", 1), Arc::to_place("t", "o", 1)]).unwrap()
///     .build();
///
/// assert_eq!(net.transition_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPetriNetBuilder {
    name: String,
    variables: VariableStore,
    places: BTreeMap<String, Place>,
}

impl DataPetriNetBuilder {
    /// Create a new builder for a net named `name`
    pub fn new(name: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            variables: VariableStore::default(),
            places: BTreeMap::new(),
        }
    }

    /// Checks whether a name is already used by a variable or place
    fn check_for_name_clash(&self, name: &str) -> bool {
        self.variables.get(name).is_some() || self.places.contains_key(name)
    }

    /// Declare a variable
    ///
    /// Returns an error if a variable of the same name was already declared,
    /// the name is taken by a place, or the initial value does not belong to
    /// the domain.
    pub fn with_variable(
        mut self,
        name: impl ToString,
        domain: Domain,
        initial_value: Option<Fraction>,
    ) -> Result<Self, BuilderError> {
        let name = name.to_string();
        if self.variables.get(&name).is_some() {
            return Err(BuilderError::DuplicateVariable(name));
        }
        if self.check_for_name_clash(&name) {
            return Err(BuilderError::NameClash(name));
        }
        if let Some(value) = initial_value {
            let fits = match domain {
                Domain::Bool => value == Fraction::zero() || value == Fraction::one(),
                Domain::Integer => value.is_integer(),
                Domain::Real => true,
            };
            if !fits {
                return Err(BuilderError::MalformedVariable(
                    name,
                    format!("Initial value {value} is not of domain {domain}"),
                ));
            }
        }

        self.variables
            .declare(name, VariableDeclaration::new(domain, initial_value));
        Ok(self)
    }

    /// Declare multiple variables
    pub fn with_variables(
        self,
        variables: impl IntoIterator<Item = (String, Domain, Option<Fraction>)>,
    ) -> Result<Self, BuilderError> {
        variables
            .into_iter()
            .try_fold(self, |b, (name, domain, init)| {
                b.with_variable(name, domain, init)
            })
    }

    /// Add a place
    pub fn with_place(mut self, place: Place) -> Result<Self, BuilderError> {
        if self.places.contains_key(place.id()) {
            return Err(BuilderError::DuplicatePlace(place.id().clone()));
        }
        if self.check_for_name_clash(place.id()) {
            return Err(BuilderError::NameClash(place.id().clone()));
        }

        self.places.insert(place.id().clone(), place);
        Ok(self)
    }

    /// Add multiple places
    pub fn with_places(self, places: impl IntoIterator<Item = Place>) -> Result<Self, BuilderError> {
        places.into_iter().try_fold(self, |b, p| b.with_place(p))
    }

    /// Check whether variable `name` has been declared
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.get(name).is_some()
    }

    /// Check whether place `id` has been added
    pub fn has_place(&self, id: &str) -> bool {
        self.places.contains_key(id)
    }

    /// Complete the first stage
    pub fn initialize(self) -> InitializedDataPetriNetBuilder {
        InitializedDataPetriNetBuilder {
            net: DataPetriNet {
                name: self.name,
                places: self.places,
                transitions: BTreeMap::new(),
                arcs: Vec::new(),
                variables: self.variables,
            },
            arc_ends: BTreeSet::new(),
        }
    }
}

/// Second stage of the [`DataPetriNetBuilder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializedDataPetriNetBuilder {
    net: DataPetriNet,
    arc_ends: BTreeSet<(Node, Node)>,
}

impl InitializedDataPetriNetBuilder {
    /// Check that `var` is declared with the same domain
    fn check_variable(&self, var: &Variable, transition: &Transition) -> Result<(), BuilderError> {
        match self.net.variables.domain_of(var.name()) {
            None => Err(BuilderError::UnknownComponent(format!(
                "Variable '{}' in guard of transition '{}'",
                var.name(),
                transition.id()
            ))),
            Some(domain) if domain != var.domain() => Err(BuilderError::MalformedTransition(
                Box::new(transition.clone()),
                format!(
                    "Variable '{}' is declared as {domain} but used as {}",
                    var.name(),
                    var.domain()
                ),
            )),
            Some(_) => Ok(()),
        }
    }

    /// Add a transition
    ///
    /// Returns an error if the id is taken or the guard uses undeclared
    /// variables or variables of the wrong domain.
    pub fn with_transition(mut self, transition: Transition) -> Result<Self, BuilderError> {
        if let Some(existing) = self.net.transitions.get(transition.id()) {
            return Err(BuilderError::DuplicateTransition(
                Box::new(existing.clone()),
                Box::new(transition),
            ));
        }
        if self.net.places.contains_key(transition.id())
            || self.net.variables.get(transition.id()).is_some()
        {
            return Err(BuilderError::NameClash(transition.id().clone()));
        }

        for var in transition.guard().actual_constraint().variables() {
            self.check_variable(&var, &transition)?;
        }
        for (name, domain) in transition.guard().write_vars() {
            self.check_variable(&Variable::write(name, *domain), &transition)?;
        }

        self.net
            .transitions
            .insert(transition.id().clone(), transition);
        Ok(self)
    }

    /// Add multiple transitions
    pub fn with_transitions(
        self,
        transitions: impl IntoIterator<Item = Transition>,
    ) -> Result<Self, BuilderError> {
        transitions
            .into_iter()
            .try_fold(self, |b, t| b.with_transition(t))
    }

    fn check_node(&self, node: &Node) -> Result<(), BuilderError> {
        let known = match node {
            Node::Place(p) => self.net.places.contains_key(p),
            Node::Transition(t) => self.net.transitions.contains_key(t),
        };
        if known {
            Ok(())
        } else {
            Err(BuilderError::UnknownComponent(format!("Node '{node}'")))
        }
    }

    /// Add an arc
    ///
    /// Both endpoints must already be part of the net, one of them a place
    /// and the other one a transition, and the weight must be positive.
    pub fn with_arc(mut self, arc: Arc) -> Result<Self, BuilderError> {
        if arc.weight() == 0 {
            return Err(BuilderError::MalformedArc(
                Box::new(arc),
                "Weight must be positive".into(),
            ));
        }
        if matches!(
            (arc.source(), arc.target()),
            (Node::Place(_), Node::Place(_)) | (Node::Transition(_), Node::Transition(_))
        ) {
            return Err(BuilderError::MalformedArc(
                Box::new(arc),
                "Arcs must connect a place and a transition".into(),
            ));
        }
        self.check_node(arc.source())?;
        self.check_node(arc.target())?;

        if !self
            .arc_ends
            .insert((arc.source().clone(), arc.target().clone()))
        {
            return Err(BuilderError::DuplicateArc(Box::new(arc)));
        }

        self.net.arcs.push(arc);
        Ok(self)
    }

    /// Add multiple arcs
    pub fn with_arcs(self, arcs: impl IntoIterator<Item = Arc>) -> Result<Self, BuilderError> {
        arcs.into_iter().try_fold(self, |b, a| b.with_arc(a))
    }

    /// Check whether transition `id` has been added
    pub fn has_transition(&self, id: &str) -> bool {
        self.net.transitions.contains_key(id)
    }

    /// Complete the construction of the net
    pub fn build(self) -> DataPetriNet {
        self.net
    }
}

/// Errors that can occur while building a [`DataPetriNet`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderError {
    /// A variable with the same name was declared multiple times
    DuplicateVariable(String),
    /// A place with the same id was added multiple times
    DuplicatePlace(String),
    /// A transition with the same id was added multiple times
    DuplicateTransition(Box<Transition>, Box<Transition>),
    /// An arc between the same nodes was added multiple times
    DuplicateArc(Box<Arc>),
    /// A variable declaration is malformed
    MalformedVariable(String, String),
    /// A transition is malformed
    MalformedTransition(Box<Transition>, String),
    /// An arc is malformed
    MalformedArc(Box<Arc>, String),
    /// The same name was used multiple times for different components
    NameClash(String),
    /// An unknown component was referenced
    UnknownComponent(String),
}

impl std::error::Error for BuilderError {}

impl fmt::Display for BuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderError::DuplicateVariable(var) => write!(f, "Duplicate variable: {var}"),
            BuilderError::DuplicatePlace(place) => write!(f, "Duplicate place: {place}"),
            BuilderError::DuplicateTransition(t1, t2) => {
                write!(
                    f,
                    "Duplicate transition id {} appearing in transition {} and {}",
                    t1.id(),
                    t1,
                    t2
                )
            }
            BuilderError::DuplicateArc(arc) => write!(f, "Duplicate arc: {arc}"),
            BuilderError::MalformedVariable(var, msg) => {
                write!(f, "Malformed variable {var}: {msg}")
            }
            BuilderError::MalformedTransition(t, msg) => {
                write!(f, "Malformed transition {}: {msg} Transition: {t}", t.id())
            }
            BuilderError::MalformedArc(arc, msg) => write!(f, "Malformed arc: {msg}: {arc}"),
            BuilderError::NameClash(name) => write!(f, "Name {name} already taken"),
            BuilderError::UnknownComponent(c) => write!(f, "Unknown component: {c}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use dpn_constraints::expressions::{ComparisonOp, Constraint};

    use super::*;
    use crate::guard::Guard;

    fn places_builder() -> InitializedDataPetriNetBuilder {
        DataPetriNetBuilder::new("test")
            .with_variable("x", Domain::Integer, None)
            .unwrap()
            .with_places(vec![
                Place::new("i", "i", 1, false),
                Place::new("o", "o", 0, true),
            ])
            .unwrap()
            .initialize()
    }

    #[test]
    fn test_duplicate_variable_and_place() {
        let builder = DataPetriNetBuilder::new("test")
            .with_variable("x", Domain::Integer, None)
            .unwrap();
        assert_eq!(
            builder.clone().with_variable("x", Domain::Real, None),
            Err(BuilderError::DuplicateVariable("x".into()))
        );
        assert_eq!(
            builder.with_place(Place::new("x", "x", 0, false)),
            Err(BuilderError::NameClash("x".into()))
        );
    }

    #[test]
    fn test_initial_value_must_fit_domain() {
        let res = DataPetriNetBuilder::new("test").with_variable(
            "x",
            Domain::Integer,
            Some(Fraction::new(1, 2, false)),
        );
        assert!(matches!(res, Err(BuilderError::MalformedVariable(_, _))));

        let res =
            DataPetriNetBuilder::new("test").with_variable("b", Domain::Bool, Some(2.into()));
        assert!(matches!(res, Err(BuilderError::MalformedVariable(_, _))));
    }

    #[test]
    fn test_guard_variables_are_checked() {
        let unknown = Transition::new(
            "t",
            "t",
            Guard::from(Constraint::comparison(
                Variable::read("y", Domain::Integer),
                ComparisonOp::Gt,
                0,
            )),
        );
        assert!(matches!(
            places_builder().with_transition(unknown),
            Err(BuilderError::UnknownComponent(_))
        ));

        let wrong_domain = Transition::new(
            "t",
            "t",
            Guard::from(Constraint::comparison(
                Variable::read("x", Domain::Real),
                ComparisonOp::Gt,
                0,
            )),
        );
        assert!(matches!(
            places_builder().with_transition(wrong_domain),
            Err(BuilderError::MalformedTransition(_, _))
        ));
    }

    #[test]
    fn test_arcs_are_checked() {
        let builder = places_builder()
            .with_transition(Transition::new("t", "t", Guard::tautology()))
            .unwrap();

        assert!(matches!(
            builder.clone().with_arc(Arc::from_place("i", "t", 0)),
            Err(BuilderError::MalformedArc(_, _))
        ));
        assert!(matches!(
            builder.clone().with_arc(Arc::new(
                Node::Place("i".into()),
                Node::Place("o".into()),
                1
            )),
            Err(BuilderError::MalformedArc(_, _))
        ));
        assert!(matches!(
            builder.clone().with_arc(Arc::from_place("missing", "t", 1)),
            Err(BuilderError::UnknownComponent(_))
        ));
        assert!(matches!(
            builder
                .clone()
                .with_arc(Arc::from_place("i", "t", 1))
                .unwrap()
                .with_arc(Arc::from_place("i", "t", 2)),
            Err(BuilderError::DuplicateArc(_))
        ));

        let net = builder
            .with_arcs(vec![Arc::from_place("i", "t", 1), Arc::to_place("t", "o", 1)])
            .unwrap()
            .build();
        assert_eq!(net.arcs().len(), 2);
    }

    #[test]
    fn test_duplicate_transition() {
        let res = places_builder()
            .with_transition(Transition::new("t", "a", Guard::tautology()))
            .unwrap()
            .with_transition(Transition::new("t", "b", Guard::tautology()));
        assert!(matches!(res, Err(BuilderError::DuplicateTransition(_, _))));
        assert!(
            places_builder()
                .with_transition(Transition::new("i", "clash", Guard::tautology()))
                .is_err()
        );
    }
}
