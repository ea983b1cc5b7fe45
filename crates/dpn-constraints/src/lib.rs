//! Constraint formulas and the constraint oracle
//!
//! This crate defines the data constraints attached to transitions of a Data
//! Petri Net and to the symbolic states of its state spaces:
//! - [`expressions`] contains variables, their roles and domains, and the
//!   [`expressions::Constraint`] type,
//! - [`fraction`] contains the rational constants used in constraints,
//! - [`interval`] and [`region`] implement the interval algebra constraints
//!   are decided with,
//! - [`oracle`] defines the [`oracle::ConstraintOracle`] interface consumed by
//!   the verification engine and its implementation
//!   [`oracle::IntervalOracle`].

pub mod expressions;
pub mod fraction;
pub mod interval;
pub mod oracle;
pub mod region;
