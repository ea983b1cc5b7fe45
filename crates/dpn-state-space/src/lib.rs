//! Symbolic state spaces of Data Petri Nets
//!
//! This crate explores the state space of a [`dpn_net::net::DataPetriNet`].
//! A state pairs a marking with a constraint over the variable values that
//! are possible when the marking is reached. All variants share one engine,
//! [`StateSpace`], and differ in the [`strategy::ExplorationStrategy`] they
//! are instantiated with:
//!
//! - [`ReachabilityGraph`]: merges equal states and aborts as soon as the net
//!   turns out to be unbounded.
//! - [`ConstraintStateGraph`]: like the reachability graph, but additionally
//!   records silent arcs for the case that a guard does not hold.
//! - [`CoverabilityGraph`]: accelerates growing places to ω instead of
//!   aborting, hence always terminates.
//! - [`CoverabilityTree`]: does not merge states and cuts off leaves that
//!   repeat an ancestor; its coloring guides the repair of a net.
//!
//! On top of the explored structures the crate provides the green/red
//! [`coloring::Coloring`] and the detection of [`cycles::Cycle`]s.

pub mod coloring;
pub mod cycles;
#[cfg(feature = "dot")]
pub mod dot;
mod engine;
pub mod state;
pub mod strategy;

pub use engine::StateSpace;

/// Reachability graph without silent transitions
pub type ReachabilityGraph<'a, O> = StateSpace<'a, strategy::Reachability, O>;

/// Reachability graph with silent transitions
pub type ConstraintStateGraph<'a, O> = StateSpace<'a, strategy::ConstraintGraph, O>;

/// Coverability graph with silent transitions
pub type CoverabilityGraph<'a, O> = StateSpace<'a, strategy::Coverability, O>;

/// Coverability tree with silent transitions
pub type CoverabilityTree<'a, O> = StateSpace<'a, strategy::CoverabilityTree, O>;
