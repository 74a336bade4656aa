//! A play session: scenario content, the reducer and the live state.
//!
//! The session is the host half of a choice. The reducer turns a
//! `CHOOSE_OPTION` payload into a new state; the session builds that payload
//! from the scenario, then does the work the reducer deliberately leaves
//! out:
//!
//! 1. resolve the current node and the chosen option
//! 2. dispatch `CHOOSE_OPTION`
//! 3. reaffirm banked assumptions when asked to
//! 4. move to the option's next node and its phase; flag completion
//! 5. unlock newly met milestones
//!
//! Every choice is kept in a transcript so the session can be rebuilt
//! exactly with [`Session::replay`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Level, debug, info, span, warn};

use govsim_core::decay::reaffirm_assumption_with;
use govsim_core::error::{Result, SimError};
use govsim_core::outcome::{OutcomeClassifier, StandardClassifier};
use govsim_core::scenario::{Node, Scenario};
use govsim_core::telemetry::spans;
use govsim_core::{Action, ChoicePayload, Reducer, State};

use crate::milestones::{Milestone, MilestoneKind};

/// One player decision, as the host receives it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceInput {
    /// Zero-based index into the current node's choices.
    pub index: usize,
    /// Who owns the decision.
    #[serde(default)]
    pub owner_role: String,
    /// Free-text rationale.
    #[serde(default)]
    pub rationale: String,
    /// Free-text assumptions.
    #[serde(default)]
    pub assumptions: String,
    /// Reaffirm every banked assumption after this choice.
    #[serde(default)]
    pub preserve_assumptions: bool,
    /// When the decision was made.
    pub timestamp: DateTime<Utc>,
}

/// What a choice unlocked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceOutcome {
    /// Achievement ids unlocked.
    pub achievements: Vec<String>,
    /// Wonder completed, if any.
    pub wonder: Option<String>,
    /// Great person unlocked, if any.
    pub great_person: Option<String>,
    /// Tech ids researched.
    pub techs: Vec<String>,
}

/// A running scenario.
pub struct Session<C: OutcomeClassifier = StandardClassifier> {
    scenario: Scenario,
    reducer: Reducer<C>,
    initial: State,
    state: State,
    milestones: Vec<Box<dyn Milestone>>,
    transcript: Vec<ChoiceInput>,
    last_outcome: ChoiceOutcome,
}

impl<C: OutcomeClassifier> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("turn", &self.state.turn)
            .field("node", &self.state.current_node_id)
            .field("milestones", &self.milestones.len())
            .field("choices", &self.transcript.len())
            .finish_non_exhaustive()
    }
}

impl<C: OutcomeClassifier> Session<C> {
    /// Start a session from `initial_state`. No milestones are registered.
    #[must_use]
    pub fn new(scenario: Scenario, initial_state: State, reducer: Reducer<C>) -> Self {
        info!(
            node = %initial_state.current_node_id,
            phase = %initial_state.phase_id,
            "session started"
        );
        Self {
            scenario,
            reducer,
            initial: initial_state.clone(),
            state: initial_state,
            milestones: Vec::new(),
            transcript: Vec::new(),
            last_outcome: ChoiceOutcome::default(),
        }
    }

    /// Register milestones to check after every choice.
    #[must_use]
    pub fn with_milestones(mut self, milestones: Vec<Box<dyn Milestone>>) -> Self {
        self.milestones = milestones;
        self
    }

    /// Rebuild a session by replaying `transcript` from `initial_state`.
    ///
    /// # Errors
    /// Whatever [`Session::choose`] returns for the first bad input.
    pub fn replay(
        scenario: Scenario,
        initial_state: State,
        reducer: Reducer<C>,
        milestones: Vec<Box<dyn Milestone>>,
        transcript: &[ChoiceInput],
    ) -> Result<Self> {
        let span = span!(Level::DEBUG, spans::REPLAY, choices = transcript.len());
        let _enter = span.enter();
        let mut session = Self::new(scenario, initial_state, reducer).with_milestones(milestones);
        for input in transcript {
            session.choose(input.clone())?;
        }
        Ok(session)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Live state.
    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }

    /// State the session started from.
    #[must_use]
    pub fn initial_state(&self) -> &State {
        &self.initial
    }

    /// Scenario content.
    #[must_use]
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// The reducer.
    #[must_use]
    pub fn reducer(&self) -> &Reducer<C> {
        &self.reducer
    }

    /// Every choice made so far.
    #[must_use]
    pub fn transcript(&self) -> &[ChoiceInput] {
        &self.transcript
    }

    /// Unlocks from the most recent choice.
    #[must_use]
    pub fn last_outcome(&self) -> &ChoiceOutcome {
        &self.last_outcome
    }

    /// Node the player is at, if the scenario has it.
    #[must_use]
    pub fn current_node(&self) -> Option<&Node> {
        self.scenario.node_by_id(&self.state.current_node_id)
    }

    /// Whether the completion node has been reached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.flags.is_complete
    }

    /// Dispatch a non-choice action straight to the reducer.
    pub fn dispatch(&mut self, action: &Action) -> &State {
        self.state = self.reducer.dispatch(&self.state, action);
        &self.state
    }

    // ------------------------------------------------------------------
    // Choosing
    // ------------------------------------------------------------------

    /// Make a choice at the current node.
    ///
    /// # Errors
    /// [`SimError::UnknownNode`] if the current node is not in the scenario,
    /// [`SimError::UnknownChoice`] if `input.index` is out of range. The
    /// state is untouched on error.
    pub fn choose(&mut self, input: ChoiceInput) -> Result<&State> {
        let span = span!(Level::DEBUG, spans::SESSION_CHOOSE, turn = self.state.turn, index = input.index);
        let _enter = span.enter();

        let node_id = self.state.current_node_id.clone();
        let Some(node) = self.scenario.node_by_id(&node_id) else {
            warn!(node = %node_id, "current node is not in the scenario");
            return Err(SimError::UnknownNode(node_id));
        };
        let Some(choice) = node.choices.get(input.index) else {
            warn!(node = %node_id, index = input.index, "choice index out of range");
            return Err(SimError::UnknownChoice { node: node_id, index: input.index });
        };

        let phase_id = self
            .scenario
            .phase_of_node(&node_id)
            .unwrap_or(&self.state.phase_id)
            .to_string();
        let payload = ChoicePayload {
            choice_id: format!("C{}", input.index + 1),
            owner_role: input.owner_role.clone(),
            rationale: input.rationale.clone(),
            assumptions: input.assumptions.clone(),
            delta: choice.delta.clone(),
            node_title: node.title.clone(),
            chosen_label: choice.label.clone(),
            phase_id: phase_id.clone(),
            unmeasured_impact: choice.unmeasured_impact(),
            timestamp: input.timestamp,
        };
        let next_node_id = choice.next_node_id.clone();

        let mut next = self.reducer.dispatch(&self.state, &Action::ChooseOption(Box::new(payload)));

        if input.preserve_assumptions {
            next = self.reaffirm_all(next);
        }

        next.phase_id = self
            .scenario
            .phase_of_node(&next_node_id)
            .map_or(phase_id, str::to_string);
        next.flags.is_complete = next_node_id == self.reducer.config().general.completion_node;
        next.current_node_id = next_node_id;

        let (next, outcome) = self.unlock_milestones(next);
        debug!(
            turn = next.turn,
            node = %next.current_node_id,
            complete = next.flags.is_complete,
            achievements = outcome.achievements.len(),
            "choice resolved"
        );
        if next.flags.is_complete {
            info!(turn = next.turn, "scenario complete");
        }

        self.state = next;
        self.last_outcome = outcome;
        self.transcript.push(input);
        Ok(&self.state)
    }

    /// Reaffirm every banked entry by its text at the state's turn. A text
    /// banked k times is reaffirmed k times, so each copy gets k boosts.
    fn reaffirm_all(&self, state: State) -> State {
        let texts: Vec<String> = state.assumptions().iter().map(|a| a.text.clone()).collect();
        let turn = state.turn;
        texts.iter().fold(state, |s, text| {
            reaffirm_assumption_with(&s, text, turn, &self.reducer.config().memory)
        })
    }

    /// Unlock every newly met achievement and tech, and at most one wonder
    /// and one great person (effect applied first). The rest wait for a
    /// later turn.
    fn unlock_milestones(&self, mut state: State) -> (State, ChoiceOutcome) {
        let mut outcome = ChoiceOutcome::default();
        let newly_met: Vec<&dyn Milestone> = self
            .milestones
            .iter()
            .map(|m| &**m)
            .filter(|m| m.is_newly_met(&state))
            .collect();

        for m in &newly_met {
            let once = match m.kind() {
                MilestoneKind::Achievement | MilestoneKind::Tech => false,
                MilestoneKind::Wonder => outcome.wonder.is_some(),
                MilestoneKind::GreatPerson => outcome.great_person.is_some(),
            };
            if once {
                continue;
            }
            let unlock = m.unlock_action(&state);
            state = self.reducer.dispatch(&m.apply(&state), &unlock);
            let id = m.id().to_string();
            info!(milestone = %id, kind = ?m.kind(), turn = state.turn, "milestone unlocked");
            match m.kind() {
                MilestoneKind::Achievement => outcome.achievements.push(id),
                MilestoneKind::Tech => outcome.techs.push(id),
                MilestoneKind::Wonder => outcome.wonder = Some(id),
                MilestoneKind::GreatPerson => outcome.great_person = Some(id),
            }
        }
        (state, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milestones::{CatalogueMilestone, Effect};
    use govsim_core::SimConfig;
    use govsim_core::scenario::{Difficulty, StartingCondition, initial_state};
    use govsim_core::state::MetricKey;

    const SCENARIO: &str = r#"{
        "version": "1.0",
        "phases": [
            {"id": "P1_DEPLOY", "title": "Deploy", "nodes": [
                {"id": "N01_INITIAL", "title": "Opening", "choices": [
                    {"label": "Push standards", "delta": {"metrics": {"unmeasured": {"welfareDebt": -0.05}}}, "nextNodeId": "N02_MID"},
                    {"label": "Stall", "delta": {}, "nextNodeId": "N16_COMPLETE"}
                ]}
            ]},
            {"id": "P2_SCALE", "title": "Scale", "nodes": [
                {"id": "N02_MID", "title": "Middle", "choices": [
                    {"label": "Finish", "delta": {}, "nextNodeId": "N16_COMPLETE"}
                ]}
            ]}
        ]
    }"#;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).expect("valid timestamp")
    }

    fn input(index: usize, assumptions: &str, preserve: bool, secs: i64) -> ChoiceInput {
        ChoiceInput {
            index,
            owner_role: "minister".into(),
            rationale: "because".into(),
            assumptions: assumptions.into(),
            preserve_assumptions: preserve,
            timestamp: at(secs),
        }
    }

    fn session() -> Session {
        let scenario = Scenario::from_json(SCENARIO).expect("scenario");
        let state = initial_state(&scenario, Difficulty::Medium, StartingCondition::Default);
        Session::new(scenario, state, Reducer::new(SimConfig::default()))
    }

    #[test]
    fn choice_moves_to_next_node_and_phase() {
        let mut s = session();
        let state = s.choose(input(0, "", false, 1)).expect("choose");
        assert_eq!(state.turn, 1);
        assert_eq!(state.current_node_id, "N02_MID");
        assert_eq!(state.phase_id, "P2_SCALE");
        assert!(!state.flags.is_complete);
        let record = &state.audit_trail[0];
        assert_eq!(record.choice_id, "C1");
        assert_eq!(record.node_title, "Opening");
        assert_eq!(record.chosen_label, "Push standards");
        assert_eq!(record.phase_id, "P1_DEPLOY");
        assert_eq!(record.unmeasured_impact, "This decision reduced welfare debt.");
    }

    #[test]
    fn unknown_target_node_keeps_previous_phase() {
        let mut s = session();
        let state = s.choose(input(1, "", false, 1)).expect("choose");
        assert_eq!(state.current_node_id, "N16_COMPLETE");
        assert_eq!(state.phase_id, "P1_DEPLOY");
        assert!(state.flags.is_complete);
        assert!(s.is_complete());
    }

    #[test]
    fn bad_index_is_an_error_and_leaves_state() {
        let mut s = session();
        let before = s.state().clone();
        let err = s.choose(input(7, "", false, 1)).expect_err("out of range");
        assert!(matches!(err, SimError::UnknownChoice { index: 7, .. }));
        assert_eq!(s.state(), &before);
        assert!(s.transcript().is_empty());
    }

    #[test]
    fn unknown_current_node_is_an_error() {
        let mut s = session();
        s.choose(input(1, "", false, 1)).expect("choose");
        assert!(matches!(s.choose(input(0, "", false, 2)), Err(SimError::UnknownNode(_))));
    }

    #[test]
    fn preserve_reaffirms_banked_assumptions() {
        let mut s = session();
        s.choose(input(0, "demand holds", false, 1)).expect("choose");
        let state = s.choose(input(0, "", true, 2)).expect("choose");
        let a = &state.assumptions()[0];
        assert_eq!(a.last_reaffirmed_turn, Some(2));
        // 1.0, decayed to 0.95, boosted back to 1.0.
        assert!((a.strength - 1.0).abs() < 1e-12);
    }

    #[test]
    fn duplicate_texts_are_reaffirmed_per_entry() {
        let mut s = session();
        s.dispatch(&Action::Init {
            initial_state: Box::new({
                let mut st = s.state().clone();
                st = govsim_core::decay::add_assumption(&st, "same", 0);
                st = govsim_core::decay::add_assumption(&st, "same", 0);
                st = govsim_core::decay::add_assumption(&st, "other", 0);
                for a in &mut st.memory.assumptions_bank {
                    a.strength = 0.3;
                }
                st
            }),
        });
        let state = s.choose(input(0, "", true, 1)).expect("choose");
        let bank = state.assumptions();
        // 0.3 − 0.05, then one boost per entry sharing the text.
        assert!((bank[0].strength - 0.65).abs() < 1e-12);
        assert!((bank[1].strength - 0.65).abs() < 1e-12);
        assert!((bank[2].strength - 0.45).abs() < 1e-12);
        assert!(bank.iter().all(|a| a.last_reaffirmed_turn == Some(1)));
    }

    fn wonder(id: &'static str) -> Box<dyn Milestone> {
        Box::new(CatalogueMilestone {
            id,
            kind: MilestoneKind::Wonder,
            title: id,
            description: "",
            quote: None,
            condition: |s| s.turn >= 1,
            effect: Effect { metrics: &[(MetricKey::WelfareDebt, -0.05)], regions: &[] },
        })
    }

    fn achievement(id: &'static str) -> Box<dyn Milestone> {
        Box::new(CatalogueMilestone {
            id,
            kind: MilestoneKind::Achievement,
            title: id,
            description: "",
            quote: None,
            condition: |s| s.turn >= 1,
            effect: Effect::NONE,
        })
    }

    #[test]
    fn one_wonder_per_turn_every_achievement() {
        let mut s = session().with_milestones(vec![
            wonder("w1"),
            wonder("w2"),
            achievement("a1"),
            achievement("a2"),
        ]);
        let debt_before_effects = {
            let mut probe = session();
            probe.choose(input(0, "", false, 1)).expect("choose");
            probe.state().metrics.unmeasured.welfare_debt
        };

        let state = s.choose(input(0, "", false, 1)).expect("choose").clone();
        assert_eq!(state.completed_wonders, ["w1"]);
        assert_eq!(state.achievements, ["a1", "a2"]);
        assert!((state.metrics.unmeasured.welfare_debt - (debt_before_effects - 0.05)).abs() < 1e-12);
        assert_eq!(s.last_outcome().wonder.as_deref(), Some("w1"));

        let state = s.choose(input(0, "", false, 2)).expect("choose");
        assert_eq!(state.completed_wonders, ["w1", "w2"]);
        assert_eq!(state.achievements, ["a1", "a2"]);
        assert!(s.last_outcome().achievements.is_empty());
    }

    #[test]
    fn replay_rebuilds_the_same_state() {
        let mut s = session().with_milestones(crate::milestones::standard_milestones());
        s.choose(input(0, "prices hold", false, 10)).expect("choose");
        s.choose(input(0, "", true, 20)).expect("choose");

        let scenario = Scenario::from_json(SCENARIO).expect("scenario");
        let rebuilt = Session::replay(
            scenario,
            s.initial_state().clone(),
            Reducer::default(),
            crate::milestones::standard_milestones(),
            s.transcript(),
        )
        .expect("replay");
        assert_eq!(rebuilt.state(), s.state());
    }
}
