//! # govsim host
//!
//! The application half of the simulation. `govsim-core` owns the state and
//! its transitions; this crate drives them from scenario content:
//!
//! - [`session`] resolves scenario nodes into `CHOOSE_OPTION` actions,
//!   moves between nodes and phases, and unlocks milestones.
//! - [`milestones`] holds the `Milestone` seam and the built-in catalogue.
//! - [`log`] records and replays raw action logs.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod log;
pub mod milestones;
pub mod session;

pub use log::ActionLog;
pub use milestones::{Milestone, MilestoneKind, standard_milestones};
pub use session::{ChoiceInput, ChoiceOutcome, Session};
