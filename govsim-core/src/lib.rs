//! # govsim core
//!
//! Deterministic state engine for a turn-based governance simulation.
//!
//! A player picks a labelled choice at each narrative node; every choice
//! carries a [`Delta`] that reshapes a shared numeric world state. This crate
//! owns that world state and every transition over it:
//!
//! - **Delta application**: context-scaled metric changes, regional
//!   propagation, map-object activation, irreversibility relaxation
//!   ([`delta`]).
//! - **Memory decay**: the assumption bank fades unless reaffirmed
//!   ([`decay`]).
//! - **Reducer**: the single entry point mapping an [`Action`] to a new
//!   [`State`] ([`reducer`]).
//! - **Selectors**: read-only views for presentation layers
//!   ([`selectors`]).
//!
//! ## Determinism Contract
//!
//! Every transition is a pure function over an immutable snapshot. Replaying
//! the same ordered action log from the same initial state reproduces
//! bit-identical states, audit trail included. Nothing in the engine reads a
//! clock or a random source; timestamps arrive inside action payloads.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod decay;
pub mod delta;
pub mod error;
pub mod outcome;
pub mod persistence;
pub mod reducer;
pub mod scenario;
pub mod scoring;
pub mod selectors;
pub mod state;
pub mod telemetry;
pub mod types;

pub use config::SimConfig;
pub use delta::{Delta, apply_delta};
pub use error::SimError;
pub use reducer::{Action, ChoicePayload, Reducer};
pub use state::State;
pub use types::*;
