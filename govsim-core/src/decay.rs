//! Memory Decay Engine: institutional memory of the assumption bank.
//!
//! Every turn each banked assumption either fades by a fixed step or, if it
//! was reaffirmed on exactly that turn, is boosted instead:
//!
//!   reaffirmed this turn:  s' = min(1, s + boost)
//!   otherwise:             s' = max(0, s − decay)
//!
//! With the default tuning (decay 0.05, boost 0.2) an assumption left alone
//! for k turns has strength `max(0, 1 − 0.05k)` and counts as degraded once
//! it drops below 0.3, i.e. after 15 quiet turns.
//!
//! Nothing here ever removes an assumption.

use tracing::debug;

use crate::config::MemoryConfig;
use crate::state::{Assumption, State};
use crate::types::Turn;

/// Strength after one decay step.
#[must_use]
pub fn decayed_strength(strength: f64, reaffirmed_now: bool, config: &MemoryConfig) -> f64 {
    if reaffirmed_now {
        boosted_strength(strength, config)
    } else {
        (strength - config.decay_rate).max(0.0)
    }
}

/// Strength after a reaffirmation boost.
#[must_use]
pub fn boosted_strength(strength: f64, config: &MemoryConfig) -> f64 {
    (strength + config.reaffirm_boost).min(1.0)
}

/// Run one decay pass with the default tuning.
#[must_use]
pub fn memory_decay(state: &State) -> State {
    memory_decay_with(state, &MemoryConfig::default())
}

/// Run one decay pass over the assumption bank at `state.turn`.
#[must_use]
pub fn memory_decay_with(state: &State, config: &MemoryConfig) -> State {
    let mut next = state.clone();
    let mut boosted = 0_usize;
    for assumption in &mut next.memory.assumptions_bank {
        let reaffirmed_now = assumption.last_reaffirmed_turn == Some(state.turn);
        boosted += usize::from(reaffirmed_now);
        assumption.strength = decayed_strength(assumption.strength, reaffirmed_now, config);
    }
    debug!(
        turn = state.turn,
        assumptions = next.memory.assumptions_bank.len(),
        boosted,
        "memory decay pass"
    );
    next
}

/// Reaffirm every assumption whose text equals `text`, with the default tuning.
#[must_use]
pub fn reaffirm_assumption(state: &State, text: &str, turn: Turn) -> State {
    reaffirm_assumption_with(state, text, turn, &MemoryConfig::default())
}

/// Reaffirm every assumption whose text equals `text` exactly: stamp
/// `last_reaffirmed_turn` and apply the boost.
#[must_use]
pub fn reaffirm_assumption_with(
    state: &State,
    text: &str,
    turn: Turn,
    config: &MemoryConfig,
) -> State {
    let mut next = state.clone();
    for assumption in next.memory.assumptions_bank.iter_mut().filter(|a| a.text == text) {
        assumption.last_reaffirmed_turn = Some(turn);
        assumption.strength = boosted_strength(assumption.strength, config);
    }
    next
}

/// Append a new assumption at full strength.
#[must_use]
pub fn add_assumption(state: &State, text: &str, turn: Turn) -> State {
    add_assumption_with(state, text, turn, &MemoryConfig::default())
}

/// Append a new assumption at the configured initial strength. Duplicate
/// texts are kept as separate entries.
#[must_use]
pub fn add_assumption_with(state: &State, text: &str, turn: Turn, config: &MemoryConfig) -> State {
    let mut next = state.clone();
    next.memory
        .assumptions_bank
        .push(Assumption::new(text, turn, config.initial_strength));
    next
}
