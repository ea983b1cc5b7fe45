//! Data model of Data Petri Nets
//!
//! A Data Petri Net (DPN) extends a place/transition net with data variables.
//! Every transition carries a [`guard::Guard`], a constraint over the values
//! of the variables before firing (read instances, `x_r`) and the values it
//! writes (write instances, `x_w`).
//!
//! This crate provides the net structure ([`net::DataPetriNet`] together with
//! its builder), guards with their modification history, markings that may
//! contain ω and the partial order used to compare them.

pub mod guard;
pub mod marking;
pub mod net;
pub mod partial_ord;
pub mod variables;

/// Identifier of a place
pub type PlaceId = String;

/// Identifier of a transition
pub type TransitionId = String;
