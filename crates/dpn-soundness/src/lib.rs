//! Soundness of Data Petri Nets
//!
//! This crate decides whether a [`dpn_net::net::DataPetriNet`] is sound and
//! tries to repair unsound nets by tightening transition guards.
//!
//! - [`analyzer::SoundnessAnalyzer`] classifies the states of an explored
//!   state space and computes the classical and the relaxed lazy soundness
//!   verdicts.
//! - [`refinement::TransitionRefiner`] splits transitions on cycles into
//!   variants with disjoint guards, so that every transition reading a
//!   variable sees finitely many cases of its written values.
//! - [`repair::SoundnessRepairer`] alternates refinement, coloring of a
//!   coverability tree and guard tightening until the net is sound or no
//!   repair is possible.

use std::fmt;

pub mod analyzer;
pub mod refinement;
pub mod repair;

/// Error raised for malformed settings passed to the analyzer, refiner or
/// repairer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The parameter with the given name is not known
    UnknownParameter(String),
    /// The value of a parameter could not be parsed
    InvalidValue {
        /// Name of the parameter
        parameter: String,
        /// Value that could not be parsed
        value: String,
        /// Description of the accepted values
        expected: String,
    },
}

impl ConfigurationError {
    pub(crate) fn invalid_value(
        parameter: impl ToString,
        value: impl ToString,
        expected: impl ToString,
    ) -> Self {
        ConfigurationError::InvalidValue {
            parameter: parameter.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }
}

impl std::error::Error for ConfigurationError {}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::UnknownParameter(name) => write!(f, "Unknown parameter: {name}"),
            ConfigurationError::InvalidValue {
                parameter,
                value,
                expected,
            } => write!(
                f,
                "Invalid value '{value}' for parameter '{parameter}', expected {expected}"
            ),
        }
    }
}
