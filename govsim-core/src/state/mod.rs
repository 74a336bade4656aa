//! The simulation data model and the [`State`] aggregate root.
//!
//! Every transition produces a new `State` value; nothing in the engine
//! mutates a previous snapshot.

pub mod assumption;
pub mod audit;
pub mod map;
pub mod metrics;

pub use assumption::Assumption;
pub use audit::AuditRecord;
pub use map::{ArcDatum, HubDatum, MapState, RegionValues, RingDatum};
pub use metrics::{
    MeasuredMetrics, MetricKey, Metrics, Polarity, UnmeasuredMetrics, WELFARE_ADOPTION_CEILING,
};

use serde::{Deserialize, Serialize};

use crate::types::{LossKind, Severity, Turn, VictoryKind};

/// Institutional memory: the bank of free-text assumptions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssumptionMemory {
    /// Assumptions in the order they were recorded. Duplicates by text are
    /// kept as separate entries.
    pub assumptions_bank: Vec<Assumption>,
}

/// Presentation and terminal flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flags {
    /// Set by the host once the final node is reached.
    pub is_complete: bool,
    /// Debug overlay toggle.
    pub show_debug: bool,
}

/// An unlocked historical figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GreatPerson {
    /// Unique id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Optional quotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    /// Turn the figure was unlocked on.
    pub unlocked_turn: Turn,
}

/// A pending random event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEvent {
    /// Id used to resolve the event.
    pub id: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Turn the event fired on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_turn: Option<Turn>,
    /// Host-defined event body, stored verbatim.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

/// A loss condition that is approaching or met, stamped with its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossWarning {
    /// Which condition.
    #[serde(rename = "type")]
    pub kind: LossKind,
    /// How close it is.
    pub severity: Severity,
    /// Turn it was observed on.
    pub turn: Turn,
}

/// Aggregate root of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    /// Turn counter; equals `audit_trail.len()` after every choice.
    pub turn: Turn,
    /// Node the player is looking at.
    pub current_node_id: String,
    /// Phase the current node belongs to.
    pub phase_id: String,
    /// Live metrics.
    pub metrics: Metrics,
    /// Baseline captured at initialisation, never mutated afterwards.
    pub initial_metrics: Metrics,
    /// Regional values and globe objects.
    pub map: MapState,
    /// One record per choice made.
    pub audit_trail: Vec<AuditRecord>,
    /// The assumption bank.
    pub memory: AssumptionMemory,
    /// Terminal and debug flags.
    pub flags: Flags,
    /// Unlocked figures, unique by id.
    #[serde(default)]
    pub great_people: Vec<GreatPerson>,
    /// Unlocked achievement ids.
    #[serde(default)]
    pub achievements: Vec<String>,
    /// Completed wonder ids.
    #[serde(default)]
    pub completed_wonders: Vec<String>,
    /// Researched tech ids.
    #[serde(default)]
    pub researched_techs: Vec<String>,
    /// Events awaiting resolution.
    #[serde(default)]
    pub active_events: Vec<ActiveEvent>,
    /// Victory recorded by the host, if any.
    #[serde(default)]
    pub victory_type: Option<VictoryKind>,
    /// Classifier output from the latest choice.
    #[serde(default)]
    pub loss_warnings: Vec<LossWarning>,
    /// Classifier output from the latest choice.
    #[serde(default)]
    pub loss_conditions_met: Vec<LossKind>,
    /// Player's name for personalisation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
}

impl State {
    /// Fresh turn-0 state positioned at `node_id` with `metrics` as both the
    /// live values and the baseline.
    #[must_use]
    pub fn new(
        node_id: impl Into<String>,
        phase_id: impl Into<String>,
        metrics: Metrics,
        map: MapState,
    ) -> Self {
        Self {
            turn: 0,
            current_node_id: node_id.into(),
            phase_id: phase_id.into(),
            metrics,
            initial_metrics: metrics,
            map,
            audit_trail: Vec::new(),
            memory: AssumptionMemory::default(),
            flags: Flags::default(),
            great_people: Vec::new(),
            achievements: Vec::new(),
            completed_wonders: Vec::new(),
            researched_techs: Vec::new(),
            active_events: Vec::new(),
            victory_type: None,
            loss_warnings: Vec::new(),
            loss_conditions_met: Vec::new(),
            player_name: None,
        }
    }

    /// Banked assumptions.
    #[must_use]
    pub fn assumptions(&self) -> &[Assumption] {
        &self.memory.assumptions_bank
    }

    /// Serialize the whole state to JSON.
    ///
    /// # Errors
    /// Returns `SimError::Serialization` if encoding fails.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize a state from JSON.
    ///
    /// # Errors
    /// Returns `SimError::Serialization` if the JSON does not describe a state.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared builders for unit tests across the crate.

    use super::*;

    pub fn metrics() -> Metrics {
        Metrics {
            measured: MeasuredMetrics {
                production_efficiency: 0.5,
                cost_per_unit: 0.3,
                welfare_incident_rate: 0.1,
                welfare_standard_adoption: 0.5,
            },
            unmeasured: UnmeasuredMetrics {
                welfare_debt: 0.1,
                enforcement_gap: 0.1,
                regulatory_capture: 0.2,
                sentience_knowledge_gap: 0.2,
                system_irreversibility: 0.1,
            },
        }
    }

    pub fn state() -> State {
        let mut map = MapState::default();
        for (code, value) in [("USA", 0.3), ("CAN", 0.2), ("MEX", 0.25), ("GBR", 0.4)] {
            map.region_values.insert(code.into(), value);
        }
        State::new("N01_INITIAL", "P1_DEPLOY", metrics(), map)
    }
}
