//! Ordered action logs.
//!
//! An [`ActionLog`] is the list of actions dispatched against a state, in
//! order. Because the reducer is pure and payloads carry their own
//! timestamps, replaying a log from the same initial state reproduces the
//! same final state bit for bit.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{Level, debug, span};

use govsim_core::error::Result;
use govsim_core::outcome::OutcomeClassifier;
use govsim_core::telemetry::spans;
use govsim_core::{Action, Reducer, State};

/// Dispatched actions, oldest first. Serializes as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionLog {
    actions: Vec<Action>,
}

impl ActionLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action.
    pub fn record(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Dispatch `action` against `state`, record it and return the result.
    pub fn dispatch<C: OutcomeClassifier>(
        &mut self,
        reducer: &Reducer<C>,
        state: &State,
        action: Action,
    ) -> State {
        let next = reducer.dispatch(state, &action);
        self.record(action);
        next
    }

    /// Recorded actions.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Number of recorded actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Re-run every action from `initial`.
    #[must_use]
    pub fn replay<C: OutcomeClassifier>(&self, initial: &State, reducer: &Reducer<C>) -> State {
        let span = span!(Level::DEBUG, spans::REPLAY, actions = self.actions.len());
        let _enter = span.enter();
        let state = self
            .actions
            .iter()
            .fold(initial.clone(), |state, action| reducer.dispatch(&state, action));
        debug!(turn = state.turn, audit = state.audit_trail.len(), "action log replayed");
        state
    }

    /// Parse a log from JSON.
    ///
    /// # Errors
    /// `SimError::Serialization` on malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the log to pretty JSON.
    ///
    /// # Errors
    /// `SimError::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a log from a JSON file.
    ///
    /// # Errors
    /// `SimError::Io` or `SimError::Serialization`.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Write the log to a JSON file.
    ///
    /// # Errors
    /// `SimError::Io` or `SimError::Serialization`.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl FromIterator<Action> for ActionLog {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self { actions: iter.into_iter().collect() }
    }
}
