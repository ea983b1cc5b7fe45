//! Parsers for Data Petri Nets
//!
//! This crate contains the input/output boundary of the toolsuite:
//! - [`guard`] parses guard expressions such as `x_w > 0 && !ok_r`,
//! - [`json`] reads and writes the JSON description of a net.

use std::fmt;

use dpn_net::net::builder::BuilderError;

// The pest derive generates errors as the doc comments are missing
#[allow(missing_docs)]
pub mod guard;

pub mod json;

pub use json::{NetDescription, parse_net};

/// Error raised when a net or one of its guards cannot be parsed
#[derive(Debug)]
pub enum ParseError {
    /// The guard could not be parsed
    Guard {
        /// Text of the guard
        guard: String,
        /// Description of the problem
        message: String,
    },
    /// The input is not a valid JSON net description
    Json(serde_json::Error),
    /// A component of the net is malformed
    Component {
        /// Name of the component
        component: String,
        /// Description of the problem
        message: String,
    },
    /// The described net is malformed
    Net(BuilderError),
}

impl std::error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Guard { guard, message } => {
                write!(f, "Failed to parse guard '{guard}': {message}")
            }
            ParseError::Json(err) => write!(f, "Invalid net description: {err}"),
            ParseError::Component { component, message } => {
                write!(f, "Malformed component '{component}': {message}")
            }
            ParseError::Net(err) => write!(f, "Malformed net: {err}"),
        }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(value: serde_json::Error) -> Self {
        ParseError::Json(value)
    }
}

impl From<BuilderError> for ParseError {
    fn from(value: BuilderError) -> Self {
        ParseError::Net(value)
    }
}
