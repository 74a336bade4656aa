//! End-to-end engine flows: scenario content through the reducer, into the
//! save store and back.

use chrono::{DateTime, Utc};

use govsim_core::config::PersistenceConfig;
use govsim_core::delta::RingSpawn;
use govsim_core::persistence::SaveStore;
use govsim_core::scenario::{Difficulty, Scenario, StartingCondition, initial_state};
use govsim_core::scoring::Scorecard;
use govsim_core::selectors;
use govsim_core::{Action, ChoicePayload, Delta, LossKind, Reducer, RingEventType, State};

const SCENARIO: &str = r#"{
    "version": "1.0",
    "phases": [
        {
            "id": "P1_DEPLOY",
            "title": "Deploy",
            "nodes": [
                {
                    "id": "N01_INITIAL",
                    "title": "Opening",
                    "prompt": "A new protocol is ready.",
                    "choices": [
                        {
                            "label": "Roll out everywhere",
                            "delta": {
                                "metrics": {
                                    "measured": {"productionEfficiency": 0.2, "welfareStandardAdoption": 0.4},
                                    "unmeasured": {"welfareDebt": 0.15, "enforcementGap": 0.1}
                                },
                                "map": {
                                    "regionValues": {"USA": 0.2},
                                    "activateArcs": ["arc_supply_1"],
                                    "spawnRings": [{"lat": 38.9, "lng": -77.0, "eventType": "policy_shift", "ttl": 2}]
                                }
                            },
                            "nextNodeId": "N02_AUDIT"
                        },
                        {"label": "Pilot first", "delta": {}, "nextNodeId": "N02_AUDIT"}
                    ]
                }
            ]
        },
        {
            "id": "P2_SCALE",
            "title": "Scale",
            "nodes": [
                {
                    "id": "N02_AUDIT",
                    "title": "Audit",
                    "choices": [
                        {
                            "label": "Fund inspectors",
                            "delta": {"metrics": {"unmeasured": {"enforcementGap": -0.2, "regulatoryCapture": -0.1}}},
                            "nextNodeId": "N16_COMPLETE"
                        }
                    ]
                }
            ]
        }
    ]
}"#;

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).expect("valid timestamp")
}

fn payload(scenario: &Scenario, state: &State, index: usize, assumptions: &str, secs: i64) -> ChoicePayload {
    let node = scenario.node_by_id(&state.current_node_id).expect("node");
    let choice = &node.choices[index];
    ChoicePayload {
        choice_id: format!("C{}", index + 1),
        owner_role: "regulator".into(),
        rationale: "test".into(),
        assumptions: assumptions.into(),
        delta: choice.delta.clone(),
        node_title: node.title.clone(),
        chosen_label: choice.label.clone(),
        phase_id: scenario.phase_of_node(&node.id).unwrap_or(&state.phase_id).to_string(),
        unmeasured_impact: choice.unmeasured_impact(),
        timestamp: at(secs),
    }
}

/// Dispatch a choice and move to its target node, as a host would.
fn play(reducer: &Reducer, scenario: &Scenario, state: &State, index: usize, assumptions: &str, secs: i64) -> State {
    let p = payload(scenario, state, index, assumptions, secs);
    let next_node = scenario.node_by_id(&state.current_node_id).expect("node").choices[index]
        .next_node_id
        .clone();
    let mut next = reducer.dispatch(state, &Action::ChooseOption(Box::new(p)));
    next.phase_id = scenario.phase_of_node(&next_node).unwrap_or(&next.phase_id).to_string();
    next.current_node_id = next_node;
    next
}

fn two_turns(reducer: &Reducer) -> (Scenario, State) {
    let scenario = Scenario::from_json(SCENARIO).expect("scenario");
    let s0 = initial_state(&scenario, Difficulty::Medium, StartingCondition::Default);
    let s1 = play(reducer, &scenario, &s0, 0, "markets self-correct", 100);
    let s2 = play(reducer, &scenario, &s1, 0, "", 200);
    (scenario, s2)
}

// ---------------------------------------------------------------------------
// Scenario flow
// ---------------------------------------------------------------------------

#[test]
fn scenario_flow_builds_audit_trail() {
    let reducer = Reducer::default();
    let (_, s2) = two_turns(&reducer);

    assert_eq!(s2.turn, 2);
    assert_eq!(s2.audit_trail.len(), 2);
    assert_eq!(s2.current_node_id, "N16_COMPLETE");
    assert_eq!(s2.audit_trail[0].node_id, "N01_INITIAL");
    assert_eq!(s2.audit_trail[0].phase_id, "P1_DEPLOY");
    assert_eq!(s2.audit_trail[1].node_id, "N02_AUDIT");
    assert_eq!(s2.audit_trail[1].phase_id, "P2_SCALE");
    assert_eq!(
        s2.audit_trail[0].unmeasured_impact,
        "This decision increased welfare debt, increased enforcement gap."
    );
    for (i, record) in s2.audit_trail.iter().enumerate() {
        assert_eq!(record.turn as usize, i + 1);
    }
}

#[test]
fn assumption_recorded_then_decays() {
    let reducer = Reducer::default();
    let (_, s2) = two_turns(&reducer);

    assert_eq!(s2.assumptions().len(), 1);
    let a = &s2.assumptions()[0];
    assert_eq!(a.text, "markets self-correct");
    assert_eq!(a.created_turn, 0);
    // Recorded at full strength on turn 1, decayed once on turn 2.
    assert!((a.strength - 0.95).abs() < 1e-9);
}

#[test]
fn map_objects_follow_the_delta() {
    let reducer = Reducer::default();
    let (_, s2) = two_turns(&reducer);

    assert_eq!(s2.map.active_arcs.len(), 1);
    assert_eq!(s2.map.active_arcs[0].id, "arc_supply_1");
    assert_eq!(s2.map.active_rings.len(), 1);
    let ring = &s2.map.active_rings[0];
    assert_eq!(ring.id, "ring_0_0_0");
    assert_eq!(ring.event_type, RingEventType::PolicyShift);
    // Created at turn 0 with ttl 2: gone by turn 2.
    assert!(selectors::active_rings(&s2).is_empty());
}

#[test]
fn initial_metrics_never_change() {
    let reducer = Reducer::default();
    let scenario = Scenario::from_json(SCENARIO).expect("scenario");
    let s0 = initial_state(&scenario, Difficulty::Hard, StartingCondition::Crisis);
    let s1 = play(&reducer, &scenario, &s0, 0, "", 1);
    assert_eq!(s1.initial_metrics, s0.initial_metrics);
    assert_ne!(s1.metrics, s0.metrics);
}

#[test]
fn crisis_start_trends_towards_loss() {
    let reducer = Reducer::default();
    let mut state = initial_state(
        &Scenario::from_json(SCENARIO).expect("scenario"),
        Difficulty::VeryHard,
        StartingCondition::Crisis,
    );
    let pressure = Delta::default()
        .with_metric(govsim_core::state::MetricKey::WelfareDebt, 0.3)
        .with_metric(govsim_core::state::MetricKey::EnforcementGap, 0.3)
        .with_metric(govsim_core::state::MetricKey::RegulatoryCapture, 0.3);
    for turn in 0..6 {
        let p = ChoicePayload { delta: pressure.clone(), timestamp: at(turn), ..ChoicePayload::default() };
        state = reducer.dispatch(&state, &Action::ChooseOption(Box::new(p)));
    }
    assert!(state.loss_conditions_met.contains(&LossKind::DebtCrisis));
    assert!(state.loss_warnings.iter().all(|w| w.turn == 6));
    let card = Scorecard::of(&state);
    assert!(card.governance_debt > 0.6);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn save_and_load_mid_game_is_identical() {
    let reducer = Reducer::default();
    let (_, s2) = two_turns(&reducer);

    let dir = tempfile::tempdir().expect("tempdir");
    let store = SaveStore::open(dir.path().join("saves.db"), &PersistenceConfig::default())
        .expect("open");
    let id = store.save(&s2, "after audit").expect("save");
    let loaded = store.load(&id).expect("load").expect("present");
    assert_eq!(loaded, s2);
    assert_eq!(loaded.to_json().expect("json"), s2.to_json().expect("json"));
}

#[test]
fn loaded_state_continues_like_the_original() {
    let reducer = Reducer::default();
    let scenario = Scenario::from_json(SCENARIO).expect("scenario");
    let s0 = initial_state(&scenario, Difficulty::Medium, StartingCondition::Default);
    let s1 = play(&reducer, &scenario, &s0, 0, "x", 10);

    let store = SaveStore::open_in_memory(&PersistenceConfig::default()).expect("open");
    let id = store.save(&s1, "turn one").expect("save");
    let restored = store.load(&id).expect("load").expect("present");

    let a = play(&reducer, &scenario, &s1, 0, "y", 20);
    let b = play(&reducer, &scenario, &restored, 0, "y", 20);
    assert_eq!(a, b);
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn replaying_an_action_log_is_bit_identical() {
    let scenario = Scenario::from_json(SCENARIO).expect("scenario");
    let s0 = initial_state(&scenario, Difficulty::Easy, StartingCondition::Innovation);
    let ring = RingSpawn { lat: 1.0, lng: 2.0, event_type: RingEventType::WelfareIncident, ttl: 3 };
    let actions = vec![
        Action::Init { initial_state: Box::new(s0.clone()) },
        Action::SetPlayerName { player_name: "Ada".into() },
        Action::ChooseOption(Box::new(ChoicePayload {
            assumptions: "demand is stable".into(),
            delta: Delta::default().with_region("USA", 0.3).with_hub("hub_eu").with_ring(ring),
            timestamp: at(5),
            ..ChoicePayload::default()
        })),
        Action::ToggleDebug,
        Action::ChooseOption(Box::new(ChoicePayload { timestamp: at(6), ..ChoicePayload::default() })),
    ];

    let run = |reducer: &Reducer| {
        actions.iter().fold(s0.clone(), |s, a| reducer.dispatch(&s, a))
    };
    let first = run(&Reducer::default());
    let second = run(&Reducer::default());
    assert_eq!(first, second);
    assert_eq!(first.to_json().expect("json"), second.to_json().expect("json"));
    assert_eq!(first.turn, 2);
    assert_eq!(first.player_name.as_deref(), Some("Ada"));
}

#[test]
fn action_log_survives_json() {
    let actions = vec![
        Action::ToggleDebug,
        Action::ChooseOption(Box::new(ChoicePayload {
            choice_id: "C1".into(),
            delta: Delta::default().with_region("CAN", -0.1),
            timestamp: at(42),
            ..ChoicePayload::default()
        })),
    ];
    let json = serde_json::to_string(&actions).expect("serialize");
    let back: Vec<Action> = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, actions);
}
