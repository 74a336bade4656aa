//! Property-based tests for the engine.
//!
//! Uses `proptest` to check the invariants every transition must keep,
//! whatever the authored deltas look like: metrics stay in range, replays
//! are exact, turn and audit trail advance together, regional writes stay
//! inside the tracked set.

use std::collections::BTreeSet;

use chrono::DateTime;
use proptest::prelude::*;

use govsim_core::config::{IrreversibilityConfig, MemoryConfig};
use govsim_core::decay;
use govsim_core::delta::relax_irreversibility;
use govsim_core::scenario::baseline_metrics;
use govsim_core::state::{MapState, MetricKey, Metrics};
use govsim_core::{Action, ChoicePayload, Delta, RegionCode, State, apply_delta};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

const REGIONS: [&str; 8] = ["USA", "CAN", "MEX", "GBR", "FRA", "DEU", "BRA", "IND"];

fn arb_metrics() -> impl Strategy<Value = Metrics> {
    proptest::collection::vec(0.0..1.0f64, 9).prop_map(|values| {
        let mut m = baseline_metrics();
        for (key, v) in MetricKey::ALL.into_iter().zip(values) {
            let upper = key.upper_bound().unwrap_or(3.0);
            m.set(key, v * upper);
        }
        m
    })
}

fn arb_state() -> impl Strategy<Value = State> {
    (arb_metrics(), proptest::collection::btree_map(0..REGIONS.len(), 0.0..1.0f64, 0..6)).prop_map(
        |(metrics, regions)| {
            let map = MapState {
                region_values: regions
                    .into_iter()
                    .map(|(i, v)| (RegionCode::from(REGIONS[i]), v))
                    .collect(),
                ..MapState::default()
            };
            State::new("N01_INITIAL", "P1_DEPLOY", metrics, map)
        },
    )
}

fn arb_delta() -> impl Strategy<Value = Delta> {
    (
        proptest::collection::vec(proptest::option::of(-2.0..2.0f64), 9),
        proptest::collection::btree_map(0..REGIONS.len(), -1.0..1.0f64, 0..4),
    )
        .prop_map(|(changes, regions)| {
            let mut delta = Delta::default();
            for (key, change) in MetricKey::ALL.into_iter().zip(changes) {
                if let Some(change) = change {
                    delta = delta.with_metric(key, change);
                }
            }
            for (i, adj) in regions {
                delta = delta.with_region(REGIONS[i], adj);
            }
            delta
        })
}

fn choose(delta: Delta, secs: i64) -> Action {
    Action::ChooseOption(Box::new(ChoicePayload {
        delta,
        assumptions: format!("assumption {secs}"),
        timestamp: DateTime::from_timestamp(secs, 0).unwrap_or_default(),
        ..ChoicePayload::default()
    }))
}

fn in_range(m: &Metrics) -> bool {
    MetricKey::ALL.into_iter().all(|key| {
        let v = m.get(key);
        v >= 0.0 && key.upper_bound().is_none_or(|upper| v <= upper)
    })
}

// ---------------------------------------------------------------------------
// Property: metrics and regions stay in range
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn apply_delta_keeps_metrics_in_range(state in arb_state(), delta in arb_delta()) {
        let next = apply_delta(&state, &delta);
        prop_assert!(in_range(&next.metrics));
        for v in next.map.region_values.values() {
            prop_assert!((0.0..=1.0).contains(v));
        }
    }
}

// ---------------------------------------------------------------------------
// Property: regional writes never leave the tracked set plus direct targets
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn regional_writes_are_contained(state in arb_state(), delta in arb_delta()) {
        let next = apply_delta(&state, &delta);
        let mut allowed: BTreeSet<&RegionCode> = state.map.region_values.keys().collect();
        if let Some(map) = &delta.map {
            allowed.extend(map.region_values.keys());
        }
        for code in next.map.region_values.keys() {
            prop_assert!(allowed.contains(code), "unexpected region {code}");
        }
    }
}

// ---------------------------------------------------------------------------
// Property: same input, same output
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn apply_delta_is_deterministic(state in arb_state(), delta in arb_delta()) {
        let a = apply_delta(&state, &delta);
        let b = apply_delta(&state, &delta);
        prop_assert_eq!(a, b);
    }
}

proptest! {
    #[test]
    fn replay_is_bit_identical(
        state in arb_state(),
        deltas in proptest::collection::vec(arb_delta(), 1..8),
    ) {
        let actions: Vec<Action> = deltas
            .into_iter()
            .enumerate()
            .map(|(i, d)| choose(d, i64::try_from(i).unwrap_or(0)))
            .collect();
        let reducer = govsim_core::Reducer::default();
        let run = || actions.iter().fold(state.clone(), |s, a| reducer.dispatch(&s, a));
        let first = run();
        let second = run();
        prop_assert_eq!(first.to_json().expect("json"), second.to_json().expect("json"));
    }
}

// ---------------------------------------------------------------------------
// Property: turn and audit trail advance in lock-step
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn turn_tracks_audit_trail(
        state in arb_state(),
        deltas in proptest::collection::vec(arb_delta(), 0..10),
    ) {
        let reducer = govsim_core::Reducer::default();
        let mut s = state;
        for (i, d) in deltas.into_iter().enumerate() {
            s = reducer.dispatch(&s, &choose(d, i64::try_from(i).unwrap_or(0)));
            s = reducer.dispatch(&s, &Action::ToggleDebug);
            prop_assert_eq!(s.turn as usize, s.audit_trail.len());
            prop_assert_eq!(s.audit_trail.last().map(|r| r.turn), Some(s.turn));
        }
    }
}

// ---------------------------------------------------------------------------
// Property: non-finite inputs behave like zero
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn non_finite_change_is_ignored(state in arb_state(), key_index in 0..9usize) {
        let key = MetricKey::ALL[key_index];
        let with_nan = apply_delta(&state, &Delta::default().with_metric(key, f64::NAN));
        let with_zero = apply_delta(&state, &Delta::default().with_metric(key, 0.0));
        prop_assert_eq!(with_nan, with_zero);
    }
}

// ---------------------------------------------------------------------------
// Property: decay follows max(0, 1 - decay·k) when left alone
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn quiet_decay_is_linear(turns in 0..40u32) {
        let config = MemoryConfig::default();
        let mut s = decay::add_assumption(&State::new("N", "P", baseline_metrics(), MapState::default()), "x", 0);
        for t in 0..turns {
            s.turn = t + 1;
            s = decay::memory_decay_with(&s, &config);
        }
        let expected = (1.0 - config.decay_rate * f64::from(turns)).max(0.0);
        prop_assert!((s.assumptions()[0].strength - expected).abs() < 1e-9);
    }
}

proptest! {
    #[test]
    fn decay_never_leaves_unit_interval(strength in 0.0..1.0f64, reaffirmed in any::<bool>()) {
        let next = decay::decayed_strength(strength, reaffirmed, &MemoryConfig::default());
        prop_assert!((0.0..=1.0).contains(&next));
    }
}

// ---------------------------------------------------------------------------
// Property: irreversibility only ever moves toward its target
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn irreversibility_relaxes_toward_target(metrics in arb_metrics()) {
        let tuning = IrreversibilityConfig::default();
        let u = &metrics.unmeasured;
        let target = (u.welfare_debt * tuning.debt_weight + u.enforcement_gap * tuning.enforcement_weight)
            .clamp(0.0, 1.0);
        let before = (u.system_irreversibility - target).abs();
        let after = (relax_irreversibility(&metrics, &tuning) - target).abs();
        prop_assert!(after <= before + 1e-12);
    }
}
