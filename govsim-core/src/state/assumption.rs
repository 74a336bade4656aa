//! Assumption: one free-text rationale statement in the assumption bank.

use serde::{Deserialize, Serialize};

use crate::types::Turn;

/// A banked assumption whose strength fades unless reaffirmed.
///
/// Assumptions are never deleted. "Degraded" is a read-time classification
/// against a threshold, not a stored state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assumption {
    /// The statement as the player entered it.
    pub text: String,
    /// Turn the assumption was recorded on.
    pub created_turn: Turn,
    /// Last turn it was explicitly reaffirmed on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reaffirmed_turn: Option<Turn>,
    /// Current strength, 0–1.
    pub strength: f64,
}

impl Assumption {
    /// Record a new assumption at the given strength.
    #[must_use]
    pub fn new(text: impl Into<String>, created_turn: Turn, strength: f64) -> Self {
        Self {
            text: text.into(),
            created_turn,
            last_reaffirmed_turn: None,
            strength: strength.clamp(0.0, 1.0),
        }
    }

    /// Whether strength has fallen below `threshold`.
    #[must_use]
    pub fn is_degraded(&self, threshold: f64) -> bool {
        self.strength < threshold
    }
}
