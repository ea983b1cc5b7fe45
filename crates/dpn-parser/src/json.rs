//! JSON description of Data Petri Nets
//!
//! A net is described by its variables, places, transitions and arcs:
//!
//! ```json
//! {
//!   "name": "approval",
//!   "variables": [{ "name": "amount", "domain": "real", "initial": 0 }],
//!   "places": [
//!     { "id": "i", "tokens": 1 },
//!     { "id": "o", "final": true }
//!   ],
//!   "transitions": [{ "id": "t", "guard": "amount_w > 0" }],
//!   "arcs": [
//!     { "source": "i", "target": "t" },
//!     { "source": "t", "target": "o" }
//!   ]
//! }
//! ```
//!
//! Guards use the syntax of [`crate::guard`]. Omitted labels default to the
//! id, omitted guards to `true` and omitted arc weights to 1.

use std::str::FromStr;

use dpn_constraints::{
    expressions::{Constraint, Domain, VariableMap},
    fraction::Fraction,
};
use dpn_net::{
    guard::Guard,
    net::{Arc, DataPetriNet, Node, Place, Transition, builder::DataPetriNetBuilder},
};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ParseError, guard::parse_guard};

/// Description of a variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescription {
    /// Name of the variable
    pub name: String,
    /// Domain: `bool`, `integer` or `real`
    pub domain: String,
    /// Initial value, unconstrained if missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<Value>,
}

/// Description of a place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceDescription {
    /// Id of the place
    pub id: String,
    /// Label, defaults to the id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Number of tokens in the initial marking
    #[serde(default)]
    pub tokens: u32,
    /// Whether the place belongs to the final marking
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

/// Description of a transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDescription {
    /// Id of the transition
    pub id: String,
    /// Label, defaults to the id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Guard, defaults to `true`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    /// Whether the transition is silent
    #[serde(default)]
    pub silent: bool,
    /// Id of the transition this transition was split from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// Variables written without being constrained by the guard
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub writes: Vec<String>,
}

/// Description of an arc
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcDescription {
    /// Id of the source place or transition
    pub source: String,
    /// Id of the target place or transition
    pub target: String,
    /// Number of tokens moved
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// Description of a Data Petri Net
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetDescription {
    /// Name of the net
    pub name: String,
    /// Declared variables
    #[serde(default)]
    pub variables: Vec<VariableDescription>,
    /// Places
    #[serde(default)]
    pub places: Vec<PlaceDescription>,
    /// Transitions
    #[serde(default)]
    pub transitions: Vec<TransitionDescription>,
    /// Arcs
    #[serde(default)]
    pub arcs: Vec<ArcDescription>,
}

/// Parse a net from its JSON description
pub fn parse_net(input: &str) -> Result<DataPetriNet, ParseError> {
    let description: NetDescription = serde_json::from_str(input)?;
    description.into_net()
}

impl FromStr for NetDescription {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

impl NetDescription {
    /// Describe `net`
    pub fn from_net(net: &DataPetriNet) -> Self {
        let variables = net
            .variables()
            .iter()
            .map(|(name, declaration)| VariableDescription {
                name: name.clone(),
                domain: declaration.domain().to_string(),
                initial: declaration
                    .initial_value()
                    .map(|value| initial_to_json(declaration.domain(), value)),
            })
            .collect();

        let places = net
            .places()
            .map(|p| PlaceDescription {
                id: p.id().clone(),
                label: (p.label() != p.id()).then(|| p.label().to_string()),
                tokens: p.tokens(),
                is_final: p.is_final(),
            })
            .collect();

        let transitions = net
            .transitions()
            .map(|t| {
                let guard = t.guard().actual_constraint();
                let mentioned = guard.write_vars();
                TransitionDescription {
                    id: t.id().clone(),
                    label: (t.label() != t.id()).then(|| t.label().to_string()),
                    guard: (!guard.is_true()).then(|| guard.to_string()),
                    silent: t.is_silent(),
                    base: (t.base_transition_id() != t.id())
                        .then(|| t.base_transition_id().clone()),
                    writes: t
                        .guard()
                        .write_vars()
                        .keys()
                        .filter(|name| !mentioned.contains_key(*name))
                        .cloned()
                        .collect(),
                }
            })
            .collect();

        let arcs = net
            .arcs()
            .iter()
            .map(|arc| ArcDescription {
                source: arc.source().id().to_string(),
                target: arc.target().id().to_string(),
                weight: arc.weight(),
            })
            .collect();

        Self {
            name: net.name().to_string(),
            variables,
            places,
            transitions,
            arcs,
        }
    }

    /// Serialize the description as pretty printed JSON
    pub fn to_json(&self) -> Result<String, ParseError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the described net
    pub fn into_net(self) -> Result<DataPetriNet, ParseError> {
        let mut builder = DataPetriNetBuilder::new(&self.name);
        let mut declared = VariableMap::new();

        for var in self.variables {
            let domain = Domain::from_str(&var.domain).map_err(|e| ParseError::Component {
                component: var.name.clone(),
                message: e.to_string(),
            })?;
            let initial = var
                .initial
                .as_ref()
                .map(|value| initial_from_json(&var.name, value))
                .transpose()?;
            declared.insert(var.name.clone(), domain);
            builder = builder.with_variable(var.name, domain, initial)?;
        }

        let place_ids = self
            .places
            .iter()
            .map(|p| p.id.clone())
            .collect::<Vec<_>>();
        builder = builder.with_places(self.places.into_iter().map(|p| {
            let label = p.label.unwrap_or_else(|| p.id.clone());
            Place::new(p.id, label, p.tokens, p.is_final)
        }))?;

        let mut builder = builder.initialize();
        for t in self.transitions {
            let constraint = match &t.guard {
                Some(text) => parse_guard(text, &declared)?,
                None => Constraint::True,
            };

            let mut writes = VariableMap::new();
            for name in t.writes.iter() {
                let Some(domain) = declared.get(name) else {
                    return Err(ParseError::Component {
                        component: t.id.clone(),
                        message: format!("Unknown written variable '{name}'"),
                    });
                };
                writes.insert(name.clone(), *domain);
            }

            let guard = Guard::from(constraint).with_writes(writes);
            let label = t.label.clone().unwrap_or_else(|| t.id.clone());
            let mut transition = if t.silent {
                Transition::silent(&t.id, label, guard)
            } else {
                Transition::new(&t.id, label, guard)
            };
            if let Some(base) = t.base {
                transition = transition.with_base_transition_id(base);
            }
            builder = builder.with_transition(transition)?;
        }

        for arc in self.arcs {
            let arc = if place_ids.contains(&arc.source) {
                Arc::new(
                    Node::Place(arc.source),
                    Node::Transition(arc.target),
                    arc.weight,
                )
            } else {
                Arc::new(
                    Node::Transition(arc.source),
                    Node::Place(arc.target),
                    arc.weight,
                )
            };
            builder = builder.with_arc(arc)?;
        }

        let net = builder.build();
        debug!(
            "Parsed net '{}' with {} transitions",
            net.name(),
            net.transition_count()
        );
        Ok(net)
    }
}

/// Convert the JSON initial value of variable `name`
fn initial_from_json(name: &str, value: &Value) -> Result<Fraction, ParseError> {
    let invalid = || ParseError::Component {
        component: name.to_string(),
        message: format!("Invalid initial value {value}"),
    };

    match value {
        Value::Bool(b) => Ok(Fraction::from(*b)),
        Value::Number(n) => Fraction::from_str(&n.to_string()).map_err(|_| invalid()),
        Value::String(s) => Fraction::from_str(s).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// Convert an initial value into JSON
fn initial_to_json(domain: Domain, value: Fraction) -> Value {
    match domain {
        Domain::Bool => Value::Bool(value != Fraction::zero()),
        Domain::Integer | Domain::Real if value.is_integer() => {
            let magnitude = value.numerator() as i64;
            Value::from(if value.is_negative() {
                -magnitude
            } else {
                magnitude
            })
        }
        Domain::Integer | Domain::Real => Value::String(value.to_string()),
    }
}
