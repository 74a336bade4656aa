//! The reducer: one entry point from [`Action`] to a new [`State`].
//!
//! `CHOOSE_OPTION` runs as an explicit pipeline of named [`Stage`]s in the
//! fixed order of [`CHOOSE_PIPELINE`]. Each stage reads the working state
//! left by the previous one, plus the untouched state the action started
//! from. Reordering the stages changes numeric results, so the order is a
//! constant and is tested.
//!
//! Every other action is a small structural edit. Unlock actions are
//! idempotent by id.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Level, debug, span};

use crate::config::SimConfig;
use crate::decay::{add_assumption_with, memory_decay_with};
use crate::delta::{Delta, RegionGraph, apply_delta_with};
use crate::outcome::{OutcomeClassifier, StandardClassifier};
use crate::state::{ActiveEvent, AuditRecord, GreatPerson, LossWarning, State};
use crate::telemetry::{SimCounters, TransitionMonitor, spans};
use crate::types::MapMode;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Everything that can happen to a session.
///
/// Serializes as `{"type": "CHOOSE_OPTION", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Action {
    /// Replace the state wholesale.
    Init {
        /// State to install.
        initial_state: Box<State>,
    },
    /// Make a choice at the current node.
    ChooseOption(Box<ChoicePayload>),
    /// Flip the debug overlay.
    ToggleDebug,
    /// Replace the state wholesale.
    Reset {
        /// State to install.
        initial_state: Box<State>,
    },
    /// Switch the globe layer.
    SetMapMode {
        /// New layer.
        mode: MapMode,
    },
    /// Record a figure, once per id.
    UnlockGreatPerson {
        /// The figure.
        person: GreatPerson,
    },
    /// Record an achievement, once per id.
    UnlockAchievement {
        /// Achievement id.
        achievement_id: String,
    },
    /// Record a wonder, once per id.
    CompleteWonder {
        /// Wonder id.
        wonder_id: String,
    },
    /// Record a tech, once per id.
    ResearchTech {
        /// Tech id.
        tech_id: String,
    },
    /// Queue an event.
    TriggerEvent {
        /// The event.
        event: ActiveEvent,
    },
    /// Drop every queued event with this id.
    ResolveEvent {
        /// Event id.
        event_id: String,
        /// Option the player picked, informational only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        choice_index: Option<usize>,
    },
    /// Set the player's display name.
    SetPlayerName {
        /// Name.
        player_name: String,
    },
}

impl Action {
    /// Wire name of the action.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "INIT",
            Self::ChooseOption(_) => "CHOOSE_OPTION",
            Self::ToggleDebug => "TOGGLE_DEBUG",
            Self::Reset { .. } => "RESET",
            Self::SetMapMode { .. } => "SET_MAP_MODE",
            Self::UnlockGreatPerson { .. } => "UNLOCK_GREAT_PERSON",
            Self::UnlockAchievement { .. } => "UNLOCK_ACHIEVEMENT",
            Self::CompleteWonder { .. } => "COMPLETE_WONDER",
            Self::ResearchTech { .. } => "RESEARCH_TECH",
            Self::TriggerEvent { .. } => "TRIGGER_EVENT",
            Self::ResolveEvent { .. } => "RESOLVE_EVENT",
            Self::SetPlayerName { .. } => "SET_PLAYER_NAME",
        }
    }
}

/// Payload of `CHOOSE_OPTION`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoicePayload {
    /// Host-assigned choice id, e.g. `C2`.
    pub choice_id: String,
    /// Who owns the decision.
    pub owner_role: String,
    /// Free-text rationale.
    pub rationale: String,
    /// Free-text assumptions; recorded in the bank when not blank.
    pub assumptions: String,
    /// Effect of the choice.
    pub delta: Delta,
    /// Title of the node the choice was made at.
    pub node_title: String,
    /// Label of the chosen option.
    pub chosen_label: String,
    /// Phase the choice was made in.
    pub phase_id: String,
    /// Rendered unmeasured-impact sentence.
    pub unmeasured_impact: String,
    /// Wall-clock time, supplied by the host so replay is exact.
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Choice Pipeline
// ---------------------------------------------------------------------------

/// One step of `CHOOSE_OPTION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Decay the assumption bank at the current turn.
    DecayMemory,
    /// Bank the payload's assumptions at the starting turn.
    RecordAssumption,
    /// Apply the choice's delta.
    ApplyDelta,
    /// Append the audit record with a metrics snapshot.
    AppendAudit,
    /// Increment the turn.
    AdvanceTurn,
    /// Store loss conditions and warnings for the new state.
    Classify,
}

/// Stage order for `CHOOSE_OPTION`.
pub const CHOOSE_PIPELINE: [Stage; 6] = [
    Stage::DecayMemory,
    Stage::RecordAssumption,
    Stage::ApplyDelta,
    Stage::AppendAudit,
    Stage::AdvanceTurn,
    Stage::Classify,
];

impl Stage {
    /// Name used in traces.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::DecayMemory => "decay_memory",
            Self::RecordAssumption => "record_assumption",
            Self::ApplyDelta => "apply_delta",
            Self::AppendAudit => "append_audit",
            Self::AdvanceTurn => "advance_turn",
            Self::Classify => "classify",
        }
    }
}

/// What the stages may read besides the working state.
struct ChoiceContext<'a> {
    /// State the action was dispatched against.
    origin: &'a State,
    payload: &'a ChoicePayload,
}

// ---------------------------------------------------------------------------
// Reducer
// ---------------------------------------------------------------------------

/// Pure state machine over [`State`].
///
/// Holds tuning, the region graph and the outcome classifier. Counters and
/// the transition monitor are shared handles and never influence results.
pub struct Reducer<C = StandardClassifier> {
    config: SimConfig,
    graph: RegionGraph,
    classifier: C,
    counters: Arc<SimCounters>,
    monitor: Arc<TransitionMonitor>,
}

impl Reducer<StandardClassifier> {
    /// Reducer with the standard classifier.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self::with_classifier(config, StandardClassifier)
    }
}

impl Default for Reducer<StandardClassifier> {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl<C: OutcomeClassifier> Reducer<C> {
    /// Reducer with a custom classifier.
    #[must_use]
    pub fn with_classifier(config: SimConfig, classifier: C) -> Self {
        let monitor = TransitionMonitor::new(config.telemetry.log_slow_transitions_ms);
        Self {
            config,
            graph: RegionGraph::standard().clone(),
            classifier,
            counters: Arc::new(SimCounters::new()),
            monitor: Arc::new(monitor),
        }
    }

    /// Replace the region graph.
    #[must_use]
    pub fn with_graph(mut self, graph: RegionGraph) -> Self {
        self.graph = graph;
        self
    }

    /// Share counters with another component (e.g. a save store).
    #[must_use]
    pub fn with_counters(mut self, counters: Arc<SimCounters>) -> Self {
        self.counters = counters;
        self
    }

    /// Tuning in use.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Runtime counters.
    #[must_use]
    pub fn counters(&self) -> &Arc<SimCounters> {
        &self.counters
    }

    /// Transition latency history.
    #[must_use]
    pub fn monitor(&self) -> &TransitionMonitor {
        &self.monitor
    }

    /// The classifier consulted after each choice.
    #[must_use]
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Compute the state that follows `state` under `action`.
    #[must_use]
    pub fn dispatch(&self, state: &State, action: &Action) -> State {
        let kind = action.kind();
        let span = span!(Level::DEBUG, spans::DISPATCH, action = kind, turn = state.turn);
        let _enter = span.enter();
        let _timing = self.monitor.begin(kind);
        SimCounters::add(&self.counters.actions_dispatched, 1);

        match action {
            Action::Init { initial_state } | Action::Reset { initial_state } => {
                initial_state.as_ref().clone()
            }
            Action::ChooseOption(payload) => self.choose(state, payload),
            Action::ToggleDebug => {
                let mut next = state.clone();
                next.flags.show_debug = !next.flags.show_debug;
                next
            }
            Action::SetMapMode { mode } => {
                let mut next = state.clone();
                next.map.mode = *mode;
                next
            }
            Action::UnlockGreatPerson { person } => {
                let mut next = state.clone();
                if !next.great_people.iter().any(|p| p.id == person.id) {
                    next.great_people.push(person.clone());
                }
                next
            }
            Action::UnlockAchievement { achievement_id } => {
                unlock(state, achievement_id, |s| &mut s.achievements)
            }
            Action::CompleteWonder { wonder_id } => {
                unlock(state, wonder_id, |s| &mut s.completed_wonders)
            }
            Action::ResearchTech { tech_id } => unlock(state, tech_id, |s| &mut s.researched_techs),
            Action::TriggerEvent { event } => {
                let mut next = state.clone();
                next.active_events.push(event.clone());
                next
            }
            Action::ResolveEvent { event_id, .. } => {
                let mut next = state.clone();
                next.active_events.retain(|e| e.id != *event_id);
                next
            }
            Action::SetPlayerName { player_name } => {
                let mut next = state.clone();
                next.player_name = Some(player_name.clone());
                next
            }
        }
    }

    fn choose(&self, state: &State, payload: &ChoicePayload) -> State {
        let ctx = ChoiceContext { origin: state, payload };
        let next = CHOOSE_PIPELINE
            .into_iter()
            .fold(state.clone(), |working, stage| self.run_stage(stage, &ctx, working));
        SimCounters::add(&self.counters.choices_applied, 1);
        debug!(
            turn = next.turn,
            node = %state.current_node_id,
            choice = %payload.choice_id,
            losses = next.loss_conditions_met.len(),
            "choice applied"
        );
        next
    }

    fn run_stage(&self, stage: Stage, ctx: &ChoiceContext<'_>, working: State) -> State {
        let span = span!(Level::TRACE, spans::STAGE, stage = stage.name());
        let _enter = span.enter();

        match stage {
            Stage::DecayMemory => {
                SimCounters::add(&self.counters.decay_passes, 1);
                memory_decay_with(&working, &self.config.memory)
            }
            Stage::RecordAssumption => {
                let text = &ctx.payload.assumptions;
                if text.trim().is_empty() {
                    return working;
                }
                SimCounters::add(&self.counters.assumptions_recorded, 1);
                add_assumption_with(&working, text, ctx.origin.turn, &self.config.memory)
            }
            Stage::ApplyDelta => {
                let (next, report) =
                    apply_delta_with(&working, &ctx.payload.delta, &self.config, &self.graph);
                SimCounters::add(&self.counters.coerced_values, u64::from(report.coerced_values));
                SimCounters::add(
                    &self.counters.propagated_writes,
                    u64::from(report.propagated_writes),
                );
                next
            }
            Stage::AppendAudit => {
                let mut next = working;
                let p = ctx.payload;
                next.audit_trail.push(AuditRecord {
                    turn: next.turn + 1,
                    phase_id: p.phase_id.clone(),
                    node_id: ctx.origin.current_node_id.clone(),
                    node_title: p.node_title.clone(),
                    choice_id: p.choice_id.clone(),
                    chosen_label: p.chosen_label.clone(),
                    owner_role: p.owner_role.clone(),
                    rationale: p.rationale.clone(),
                    assumptions: p.assumptions.clone(),
                    unmeasured_impact: p.unmeasured_impact.clone(),
                    timestamp: p.timestamp,
                    metrics_snapshot: next.metrics,
                });
                next
            }
            Stage::AdvanceTurn => {
                let mut next = working;
                next.turn += 1;
                next
            }
            Stage::Classify => {
                let mut next = working;
                next.loss_conditions_met = self.classifier.loss_conditions(&next);
                next.loss_warnings = self
                    .classifier
                    .loss_warnings(&next)
                    .into_iter()
                    .map(|w| LossWarning { kind: w.kind, severity: w.severity, turn: next.turn })
                    .collect();
                next
            }
        }
    }
}

/// Append `id` to the collection `field` selects unless it is already there.
fn unlock(state: &State, id: &str, field: impl Fn(&mut State) -> &mut Vec<String>) -> State {
    let mut next = state.clone();
    let ids = field(&mut next);
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
    }
    next
}
