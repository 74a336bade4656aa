//! Scenario content contracts and the turn-0 state builder.
//!
//! Content is authored as JSON (`phases → nodes → choices`). The engine only
//! consumes each choice's [`Delta`] and the node/choice identifiers; prose
//! fields are carried for hosts and never interpreted here.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::delta::Delta;
use crate::error::{Result, SimError};
use crate::state::{
    MapState, MeasuredMetrics, MetricKey, Metrics, Polarity, State, UnmeasuredMetrics,
    WELFARE_ADOPTION_CEILING,
};
use crate::types::RegionCode;

/// Node used when a scenario has no nodes.
pub const FALLBACK_NODE: &str = "N01_INITIAL";
/// Phase used when a scenario has no phases.
pub const FALLBACK_PHASE: &str = "P1_DEPLOY";

// ---------------------------------------------------------------------------
// Content Types
// ---------------------------------------------------------------------------

/// A complete scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Content version string.
    pub version: String,
    /// Phases in play order.
    pub phases: Vec<Phase>,
}

/// A group of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// Phase id, e.g. `P1_DEPLOY`.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Nodes in this phase.
    pub nodes: Vec<Node>,
}

/// One decision point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Node id, e.g. `N01_INITIAL`.
    pub id: String,
    /// Display title.
    pub title: String,
    /// The question put to the player.
    #[serde(default)]
    pub prompt: String,
    /// Background text.
    #[serde(default)]
    pub context: String,
    /// Available options.
    pub choices: Vec<Choice>,
    /// Real-world references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub case_studies: Vec<CaseStudy>,
}

/// One option at a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    /// Button label.
    pub label: String,
    /// Effect when chosen.
    pub delta: Delta,
    /// Where the story goes next.
    pub next_node_id: String,
    /// Authoring metadata, hidden from players.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<ChoiceQuality>,
}

/// Authoring-only grading of a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ChoiceQuality {
    Best,
    Good,
    Neutral,
    Poor,
    Terrible,
}

/// A real-world reference attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudy {
    /// Title.
    pub title: String,
    /// Summary.
    pub description: String,
    /// Remaining optional fields (source, url, year, doi, ...), kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Scenario {
    /// Parse scenario JSON.
    ///
    /// # Errors
    /// `SimError::Serialization` on malformed JSON, `SimError::InvalidContent`
    /// if node ids are duplicated.
    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.validate()?;
        info!(
            version = %scenario.version,
            phases = scenario.phases.len(),
            nodes = scenario.nodes().count(),
            "scenario loaded"
        );
        Ok(scenario)
    }

    /// Check structural consistency.
    ///
    /// # Errors
    /// `SimError::InvalidContent` on a duplicated node id.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for node in self.nodes() {
            if !seen.insert(node.id.as_str()) {
                return Err(SimError::InvalidContent(format!("duplicate node id {}", node.id)));
            }
        }
        Ok(())
    }

    /// Every node, in play order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.phases.iter().flat_map(|p| p.nodes.iter())
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.nodes().find(|n| n.id == id)
    }

    /// Id of the phase that contains `node_id`.
    #[must_use]
    pub fn phase_of_node(&self, node_id: &str) -> Option<&str> {
        self.phases
            .iter()
            .find(|p| p.nodes.iter().any(|n| n.id == node_id))
            .map(|p| p.id.as_str())
    }

    /// First node of the first phase.
    #[must_use]
    pub fn first_node(&self) -> Option<&Node> {
        self.phases.first().and_then(|p| p.nodes.first())
    }
}

impl Choice {
    /// The "what we did not measure" sentence for this choice.
    #[must_use]
    pub fn unmeasured_impact(&self) -> String {
        const PHRASES: [(MetricKey, &str); 5] = [
            (MetricKey::WelfareDebt, "welfare debt"),
            (MetricKey::EnforcementGap, "enforcement gap"),
            (MetricKey::RegulatoryCapture, "regulatory capture"),
            (MetricKey::SentienceKnowledgeGap, "knowledge gaps about animal sentience"),
            (MetricKey::SystemIrreversibility, "system irreversibility"),
        ];
        let parts: Vec<String> = PHRASES
            .iter()
            .filter_map(|(key, phrase)| {
                let change = self.delta.metric(*key).filter(|v| *v != 0.0 && v.is_finite())?;
                let verb = if change > 0.0 { "increased" } else { "reduced" };
                Some(format!("{verb} {phrase}"))
            })
            .collect();
        if parts.is_empty() {
            "No significant unmeasured impacts detected.".to_string()
        } else {
            format!("This decision {}.", parts.join(", "))
        }
    }
}

// ---------------------------------------------------------------------------
// Variations
// ---------------------------------------------------------------------------

/// Difficulty level; scales how favourable the starting metrics are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Difficulty {
    VeryEasy,
    Easy,
    #[default]
    Medium,
    Hard,
    VeryHard,
}

impl Difficulty {
    /// Multiplier applied to "good" metrics; "bad" ones use `2 − m`.
    #[must_use]
    pub fn multiplier(self) -> f64 {
        match self {
            Self::VeryEasy => 1.4,
            Self::Easy => 1.2,
            Self::Medium => 1.0,
            Self::Hard => 0.8,
            Self::VeryHard => 0.6,
        }
    }
}

/// Narrative starting situation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartingCondition {
    /// Baseline.
    #[default]
    Default,
    /// Better measured outcomes, lower hidden costs.
    Optimistic,
    /// Worse on every front.
    Pessimistic,
    /// Slight improvements across the board.
    Balanced,
    /// High debt, weak enforcement, locked-in systems.
    Crisis,
    /// Improving, but irreversibility is high.
    Transition,
    /// Strong start with lingering knowledge gaps.
    Innovation,
}

impl StartingCondition {
    /// `(metric, factor)` pairs this condition applies.
    #[must_use]
    pub fn factors(self) -> &'static [(MetricKey, f64)] {
        use MetricKey::{
            EnforcementGap as Gap, ProductionEfficiency as Pe, RegulatoryCapture as Capture,
            SentienceKnowledgeGap as Knowledge, SystemIrreversibility as Irrev,
            WelfareDebt as Debt, WelfareIncidentRate as Incident,
            WelfareStandardAdoption as Adoption,
        };
        match self {
            Self::Default => &[],
            Self::Optimistic => &[
                (Pe, 1.3),
                (Adoption, 1.5),
                (Incident, 0.7),
                (Debt, 0.5),
                (Gap, 0.6),
                (Capture, 0.7),
            ],
            Self::Pessimistic => &[
                (Pe, 0.7),
                (Adoption, 0.5),
                (Incident, 1.5),
                (Debt, 1.5),
                (Gap, 1.4),
                (Capture, 1.3),
            ],
            Self::Balanced => &[(Pe, 1.1), (Adoption, 1.2), (Debt, 0.9), (Gap, 0.9)],
            Self::Crisis => &[
                (Pe, 0.6),
                (Adoption, 0.4),
                (Incident, 1.8),
                (Debt, 1.8),
                (Gap, 1.7),
                (Capture, 1.6),
                (Irrev, 1.5),
            ],
            Self::Transition => &[(Pe, 1.15), (Adoption, 1.3), (Debt, 0.85), (Gap, 0.9), (Irrev, 1.2)],
            Self::Innovation => &[
                (Pe, 1.25),
                (Adoption, 1.4),
                (Incident, 0.8),
                (Debt, 0.7),
                (Gap, 0.75),
                (Knowledge, 1.3),
            ],
        }
    }
}

/// Clamp a starting value into its range; adoption tops out at the ceiling.
fn bounded(key: MetricKey, value: f64) -> f64 {
    match key {
        MetricKey::WelfareStandardAdoption => value.clamp(0.0, WELFARE_ADOPTION_CEILING),
        _ => key.clamp(value),
    }
}

// ---------------------------------------------------------------------------
// Initial State
// ---------------------------------------------------------------------------

/// Metrics before any variation is applied.
#[must_use]
pub fn baseline_metrics() -> Metrics {
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

/// Scale metrics by difficulty. Higher-is-better metrics take `m`, the rest
/// take `2 − m`.
#[must_use]
pub fn apply_difficulty(metrics: Metrics, difficulty: Difficulty) -> Metrics {
    let m = difficulty.multiplier();
    let mut out = metrics;
    for key in MetricKey::ALL {
        let factor = match key.polarity() {
            Polarity::HigherIsBetter => m,
            Polarity::LowerIsBetter => 2.0 - m,
        };
        out.set(key, bounded(key, metrics.get(key) * factor));
    }
    out
}

/// Apply a starting condition's factors.
#[must_use]
pub fn apply_starting_condition(metrics: Metrics, condition: StartingCondition) -> Metrics {
    let mut out = metrics;
    for (key, factor) in condition.factors() {
        out.set(*key, bounded(*key, metrics.get(*key) * factor));
    }
    out
}

/// Regional values every new game starts with.
pub const BASELINE_REGIONS: [(&str, f64); 32] = [
    // Americas
    ("USA", 0.3),
    ("CAN", 0.2),
    ("MEX", 0.25),
    ("ARG", 0.32),
    ("CHL", 0.3),
    ("BRA", 0.4),
    // Europe
    ("GBR", 0.4),
    ("FRA", 0.35),
    ("DEU", 0.3),
    ("ITA", 0.35),
    ("ESP", 0.32),
    ("NLD", 0.42),
    ("POL", 0.28),
    ("SWE", 0.48),
    ("DNK", 0.4),
    // Asia
    ("IND", 0.5),
    ("CHN", 0.45),
    ("JPN", 0.32),
    ("KOR", 0.3),
    ("THA", 0.28),
    ("IDN", 0.3),
    ("PHL", 0.28),
    ("MYS", 0.3),
    // Africa & Middle East
    ("ZAF", 0.35),
    ("EGY", 0.28),
    ("KEN", 0.3),
    ("NGA", 0.28),
    ("SAU", 0.3),
    ("TUR", 0.32),
    ("ISR", 0.35),
    // Oceania
    ("AUS", 0.3),
    ("NZL", 0.45),
];

/// Build the turn-0 state for a scenario.
#[must_use]
pub fn initial_state(
    scenario: &Scenario,
    difficulty: Difficulty,
    condition: StartingCondition,
) -> State {
    let metrics = apply_starting_condition(apply_difficulty(baseline_metrics(), difficulty), condition);
    let map = MapState {
        region_values: BASELINE_REGIONS
            .iter()
            .map(|(code, value)| (RegionCode::from(*code), *value))
            .collect(),
        ..MapState::default()
    };

    let node_id = scenario.first_node().map_or(FALLBACK_NODE, |n| n.id.as_str());
    let phase_id = scenario.phases.first().map_or(FALLBACK_PHASE, |p| p.id.as_str());
    info!(?difficulty, ?condition, node = node_id, "initial state built");
    State::new(node_id, phase_id, metrics, map)
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::VeryEasy => "very easy",
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::VeryHard => "very hard",
        };
        f.write_str(s)
    }
}
