//! govsim engine benchmarks
//!
//! Targets a full turn stays well inside an interactive frame:
//!   apply_delta_40_regions ......... < 20μs
//!   memory_decay_100_assumptions ... < 20μs
//!   choose_option_full_pipeline .... < 100μs
//!   selectors_200_catalogue ........ < 50μs

use chrono::DateTime;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use govsim_core::decay;
use govsim_core::delta::RingSpawn;
use govsim_core::scenario::baseline_metrics;
use govsim_core::selectors;
use govsim_core::state::{ArcDatum, HubDatum, MapState, MetricKey};
use govsim_core::{Action, ChoicePayload, Delta, Reducer, RingEventType, State};

const REGIONS: [&str; 40] = [
    "USA", "CAN", "MEX", "BRA", "ARG", "CHL", "COL", "PER", "GBR", "FRA", "DEU", "ESP", "ITA",
    "NLD", "BEL", "POL", "SWE", "NOR", "DNK", "FIN", "RUS", "UKR", "TUR", "EGY", "NGA", "ZAF",
    "KEN", "ETH", "IND", "PAK", "BGD", "CHN", "JPN", "KOR", "IDN", "THA", "VNM", "PHL", "AUS",
    "NZL",
];

fn make_state() -> State {
    let map = MapState {
        region_values: REGIONS
            .iter()
            .enumerate()
            .map(|(i, code)| ((*code).into(), (i as f64 / 40.0).clamp(0.0, 1.0)))
            .collect(),
        ..MapState::default()
    };
    State::new("N01_INITIAL", "P1_DEPLOY", baseline_metrics(), map)
}

fn make_delta(i: usize) -> Delta {
    Delta::default()
        .with_metric(MetricKey::ProductionEfficiency, 0.05)
        .with_metric(MetricKey::WelfareStandardAdoption, 0.1)
        .with_metric(MetricKey::WelfareDebt, 0.03)
        .with_metric(MetricKey::EnforcementGap, -0.02)
        .with_region(REGIONS[i % REGIONS.len()], 0.1)
        .with_region(REGIONS[(i + 7) % REGIONS.len()], -0.05)
        .with_arc(format!("arc_{}", i % 50))
        .with_hub(format!("hub_{}", i % 50))
        .with_ring(RingSpawn {
            lat: 10.0,
            lng: 20.0,
            event_type: RingEventType::PolicyShift,
            ttl: 3,
        })
}

fn make_choice(i: usize) -> Action {
    Action::ChooseOption(Box::new(ChoicePayload {
        choice_id: "C1".into(),
        owner_role: "regulator".into(),
        assumptions: format!("assumption {}", i % 10),
        delta: make_delta(i),
        chosen_label: "Expand standards".into(),
        timestamp: DateTime::from_timestamp(i64::try_from(i).unwrap_or(0), 0).unwrap_or_default(),
        ..ChoicePayload::default()
    }))
}

/// Benchmark: one delta over a 40-region map (target: < 20μs).
fn bench_apply_delta(c: &mut Criterion) {
    let state = make_state();
    let delta = make_delta(3);

    c.bench_function("apply_delta_40_regions", |b| {
        b.iter(|| {
            let next = govsim_core::apply_delta(black_box(&state), black_box(&delta));
            black_box(next);
        });
    });
}

/// Benchmark: decay pass over a full assumptions bank (target: < 20μs).
fn bench_memory_decay(c: &mut Criterion) {
    let mut state = make_state();
    for i in 0..100 {
        state = decay::add_assumption(&state, &format!("assumption {i}"), i);
    }
    state.turn = 120;

    c.bench_function("memory_decay_100_assumptions", |b| {
        b.iter(|| {
            let next = decay::memory_decay(black_box(&state));
            black_box(next);
        });
    });
}

/// Benchmark: whole CHOOSE_OPTION pipeline after 30 turns of history
/// (target: < 100μs).
fn bench_choose_option(c: &mut Criterion) {
    let reducer = Reducer::default();
    let state = (0..30).fold(make_state(), |s, i| reducer.dispatch(&s, &make_choice(i)));
    let action = make_choice(31);

    c.bench_function("choose_option_full_pipeline", |b| {
        b.iter(|| {
            let next = reducer.dispatch(black_box(&state), black_box(&action));
            black_box(next);
        });
    });
}

/// Benchmark: arc and hub selectors against a 200-entry catalogue
/// (target: < 50μs).
fn bench_selectors(c: &mut Criterion) {
    let reducer = Reducer::default();
    let state = (0..30).fold(make_state(), |s, i| reducer.dispatch(&s, &make_choice(i)));
    let arcs: Vec<ArcDatum> = (0..200)
        .map(|i| ArcDatum::placeholder(&format!("arc_{i}"), "catalogue"))
        .collect();
    let hubs: Vec<HubDatum> = (0..200)
        .map(|i| HubDatum::placeholder(&format!("hub_{i}"), "catalogue"))
        .collect();

    c.bench_function("selectors_200_catalogue", |b| {
        b.iter(|| {
            let a = selectors::active_arcs(black_box(&state), black_box(&arcs));
            let h = selectors::active_hubs(black_box(&state), black_box(&hubs));
            black_box((a, h));
        });
    });
}

criterion_group!(
    benches,
    bench_apply_delta,
    bench_memory_decay,
    bench_choose_option,
    bench_selectors,
);
criterion_main!(benches);
