//! Delta Application Engine.
//!
//! A [`Delta`] is the authored effect of one choice. Applying it to a
//! [`State`] runs, in order:
//!
//! 1. Context-scaled metric changes ([`scaling`]), then clamping.
//! 2. Direct region writes with spill-over to tracked neighbours
//!    ([`propagation`]).
//! 3. Arc / hub activation and ring spawning.
//! 4. Irreversibility relaxation toward its debt/enforcement target.
//!
//! The engine is total. Non-finite numbers in a delta are treated as zero
//! and reported through [`DeltaReport`].

pub mod propagation;
pub mod scaling;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::config::{IrreversibilityConfig, SimConfig};
use crate::state::{ArcDatum, HubDatum, MapState, MetricKey, Metrics, RingDatum, State};
use crate::types::{RegionCode, RingEventType, Turn};

pub use propagation::RegionGraph;
pub use scaling::{effective_change, scale_by_context};

// ---------------------------------------------------------------------------
// Delta Types
// ---------------------------------------------------------------------------

/// Authored effect of a choice. Every part is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delta {
    /// Metric changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsDelta>,
    /// Regional and globe changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<MapDelta>,
    /// Content-level lock ids. Carried through, not interpreted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locks: Vec<String>,
}

/// Changes to either metric family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsDelta {
    /// Measured-family changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured: Option<MeasuredDelta>,
    /// Unmeasured-family changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unmeasured: Option<UnmeasuredDelta>,
}

/// Raw changes to measured metrics. Unknown keys are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MeasuredDelta {
    /// Change to `productionEfficiency`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_efficiency: Option<f64>,
    /// Change to `costPerUnit`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_unit: Option<f64>,
    /// Change to `welfareIncidentRate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welfare_incident_rate: Option<f64>,
    /// Change to `welfareStandardAdoption`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welfare_standard_adoption: Option<f64>,
}

/// Raw changes to unmeasured metrics. Unknown keys are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UnmeasuredDelta {
    /// Change to `welfareDebt`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welfare_debt: Option<f64>,
    /// Change to `enforcementGap`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforcement_gap: Option<f64>,
    /// Change to `regulatoryCapture`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulatory_capture: Option<f64>,
    /// Change to `sentienceKnowledgeGap`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentience_knowledge_gap: Option<f64>,
    /// Change to `systemIrreversibility`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_irreversibility: Option<f64>,
}

/// Regional and globe changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDelta {
    /// Additive adjustments per region, applied in authored order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub region_values: IndexMap<RegionCode, f64>,
    /// Arc ids to activate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activate_arcs: Vec<String>,
    /// Hub ids to activate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activate_hubs: Vec<String>,
    /// Event markers to spawn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spawn_rings: Vec<RingSpawn>,
}

/// Ring template carried by a delta; id and turn are stamped on apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RingSpawn {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// What happened.
    pub event_type: RingEventType,
    /// Lifetime in turns.
    pub ttl: Turn,
}

impl Delta {
    /// Raw change for one metric, if the delta carries it.
    #[must_use]
    pub fn metric(&self, key: MetricKey) -> Option<f64> {
        let metrics = self.metrics.as_ref()?;
        if key.is_measured() {
            let m = metrics.measured.as_ref()?;
            match key {
                MetricKey::ProductionEfficiency => m.production_efficiency,
                MetricKey::CostPerUnit => m.cost_per_unit,
                MetricKey::WelfareIncidentRate => m.welfare_incident_rate,
                _ => m.welfare_standard_adoption,
            }
        } else {
            let u = metrics.unmeasured.as_ref()?;
            match key {
                MetricKey::WelfareDebt => u.welfare_debt,
                MetricKey::EnforcementGap => u.enforcement_gap,
                MetricKey::RegulatoryCapture => u.regulatory_capture,
                MetricKey::SentienceKnowledgeGap => u.sentience_knowledge_gap,
                _ => u.system_irreversibility,
            }
        }
    }

    /// Builder: set the raw change for one metric.
    #[must_use]
    pub fn with_metric(mut self, key: MetricKey, value: f64) -> Self {
        let metrics = self.metrics.get_or_insert_with(MetricsDelta::default);
        if key.is_measured() {
            let m = metrics.measured.get_or_insert_with(MeasuredDelta::default);
            let slot = match key {
                MetricKey::ProductionEfficiency => &mut m.production_efficiency,
                MetricKey::CostPerUnit => &mut m.cost_per_unit,
                MetricKey::WelfareIncidentRate => &mut m.welfare_incident_rate,
                _ => &mut m.welfare_standard_adoption,
            };
            *slot = Some(value);
        } else {
            let u = metrics.unmeasured.get_or_insert_with(UnmeasuredDelta::default);
            let slot = match key {
                MetricKey::WelfareDebt => &mut u.welfare_debt,
                MetricKey::EnforcementGap => &mut u.enforcement_gap,
                MetricKey::RegulatoryCapture => &mut u.regulatory_capture,
                MetricKey::SentienceKnowledgeGap => &mut u.sentience_knowledge_gap,
                _ => &mut u.system_irreversibility,
            };
            *slot = Some(value);
        }
        self
    }

    /// Builder: add a regional adjustment.
    #[must_use]
    pub fn with_region(mut self, code: impl Into<String>, adjustment: f64) -> Self {
        self.map
            .get_or_insert_with(MapDelta::default)
            .region_values
            .insert(RegionCode::new(code), adjustment);
        self
    }

    /// Builder: activate an arc.
    #[must_use]
    pub fn with_arc(mut self, id: impl Into<String>) -> Self {
        self.map.get_or_insert_with(MapDelta::default).activate_arcs.push(id.into());
        self
    }

    /// Builder: activate a hub.
    #[must_use]
    pub fn with_hub(mut self, id: impl Into<String>) -> Self {
        self.map.get_or_insert_with(MapDelta::default).activate_hubs.push(id.into());
        self
    }

    /// Builder: spawn a ring.
    #[must_use]
    pub fn with_ring(mut self, spawn: RingSpawn) -> Self {
        self.map.get_or_insert_with(MapDelta::default).spawn_rings.push(spawn);
        self
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// What happened while applying a delta, for counters and tracing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaReport {
    /// Non-finite inputs replaced by zero.
    pub coerced_values: u32,
    /// Direct region writes.
    pub region_writes: u32,
    /// Neighbour writes caused by spill-over.
    pub propagated_writes: u32,
    /// Arcs newly added.
    pub arcs_activated: u32,
    /// Hubs newly added.
    pub hubs_activated: u32,
    /// Rings appended.
    pub rings_spawned: u32,
}

/// Apply `delta` with the default tuning and the standard region graph.
#[must_use]
pub fn apply_delta(state: &State, delta: &Delta) -> State {
    apply_delta_with(state, delta, &SimConfig::default(), RegionGraph::standard()).0
}

/// Apply `delta` with explicit tuning and region graph.
///
/// Returns the new state and a report of what the application touched.
#[must_use]
pub fn apply_delta_with(
    state: &State,
    delta: &Delta,
    config: &SimConfig,
    graph: &RegionGraph,
) -> (State, DeltaReport) {
    let mut report = DeltaReport::default();
    let mut next = state.clone();

    next.metrics = apply_metrics(&state.metrics, delta, &mut report);

    if let Some(map_delta) = &delta.map {
        apply_regions(
            &mut next.map,
            &map_delta.region_values,
            config.propagation.spill_factor,
            graph,
            &mut report,
        );
        activate_arcs(&mut next.map, &map_delta.activate_arcs, &state.current_node_id, &mut report);
        activate_hubs(&mut next.map, &map_delta.activate_hubs, &state.current_node_id, &mut report);
        spawn_rings(
            &mut next.map,
            &map_delta.spawn_rings,
            state.turn,
            &state.current_node_id,
            &mut report,
        );
    }

    next.metrics.unmeasured.system_irreversibility =
        relax_irreversibility(&next.metrics, &config.irreversibility);

    trace!(
        turn = state.turn,
        coerced = report.coerced_values,
        propagated = report.propagated_writes,
        rings = report.rings_spawned,
        "delta applied"
    );
    (next, report)
}

/// Replace a non-finite input with zero, counting the coercion.
fn finite_or_zero(value: f64, field: &str, report: &mut DeltaReport) -> f64 {
    if value.is_finite() {
        value
    } else {
        warn!(field, value, "non-finite delta value treated as zero");
        report.coerced_values += 1;
        0.0
    }
}

fn apply_metrics(current: &Metrics, delta: &Delta, report: &mut DeltaReport) -> Metrics {
    let mut next = *current;
    for key in MetricKey::ALL {
        let Some(raw) = delta.metric(key) else { continue };
        let raw = finite_or_zero(raw, key.field_name(), report);
        let change = effective_change(key, raw, current);
        next.set(key, current.get(key) + change);
    }
    next.clamped()
}

fn apply_regions(
    map: &mut MapState,
    adjustments: &IndexMap<RegionCode, f64>,
    spill_factor: f64,
    graph: &RegionGraph,
    report: &mut DeltaReport,
) {
    for (code, raw) in adjustments {
        let adjustment = finite_or_zero(*raw, code.as_str(), report);
        let current = map.region_values.get(code).copied().unwrap_or(0.0);
        map.region_values.insert(code.clone(), (current + adjustment).clamp(0.0, 1.0));
        report.region_writes += 1;

        if adjustment <= 0.0 {
            continue;
        }
        let spill = adjustment * spill_factor;
        for neighbour in graph.neighbours(code) {
            // Untracked neighbours stay untracked.
            if let Some(value) = map.region_values.get_mut(neighbour) {
                *value = (*value + spill).clamp(0.0, 1.0);
                report.propagated_writes += 1;
            }
        }
    }
}

fn activate_arcs(map: &mut MapState, ids: &[String], node_id: &str, report: &mut DeltaReport) {
    for id in ids {
        match map.active_arcs.iter_mut().find(|arc| arc.id == *id) {
            Some(arc) => {
                arc.triggered_by_node_id.get_or_insert_with(|| node_id.to_string());
            }
            None => {
                map.active_arcs.push(ArcDatum::placeholder(id, node_id));
                report.arcs_activated += 1;
            }
        }
    }
}

fn activate_hubs(map: &mut MapState, ids: &[String], node_id: &str, report: &mut DeltaReport) {
    for id in ids {
        match map.active_hubs.iter_mut().find(|hub| hub.id == *id) {
            Some(hub) => {
                hub.triggered_by_node_id.get_or_insert_with(|| node_id.to_string());
            }
            None => {
                map.active_hubs.push(HubDatum::placeholder(id, node_id));
                report.hubs_activated += 1;
            }
        }
    }
}

fn spawn_rings(
    map: &mut MapState,
    spawns: &[RingSpawn],
    turn: Turn,
    node_id: &str,
    report: &mut DeltaReport,
) {
    let sequence = map.active_rings.len();
    for (index, spawn) in spawns.iter().enumerate() {
        map.active_rings.push(RingDatum {
            id: format!("ring_{turn}_{index}_{sequence}"),
            lat: finite_or_zero(spawn.lat, "lat", report),
            lng: finite_or_zero(spawn.lng, "lng", report),
            event_type: spawn.event_type,
            ttl: spawn.ttl,
            created_turn: turn,
            triggered_by_node_id: Some(node_id.to_string()),
        });
        report.rings_spawned += 1;
    }
}

/// Move irreversibility a fraction of the way toward its target.
///
/// `target = clamp01(debt_weight·debt + enforcement_weight·gap)`.
#[must_use]
pub fn relax_irreversibility(metrics: &Metrics, tuning: &IrreversibilityConfig) -> f64 {
    let u = &metrics.unmeasured;
    let target = (u.welfare_debt * tuning.debt_weight
        + u.enforcement_gap * tuning.enforcement_weight)
        .clamp(0.0, 1.0);
    let current = u.system_irreversibility;
    MetricKey::SystemIrreversibility.clamp(current + (target - current) * tuning.relaxation_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fixtures;

    const EPS: f64 = 1e-9;

    fn spawn(ttl: Turn) -> RingSpawn {
        RingSpawn { lat: 10.0, lng: 20.0, event_type: RingEventType::WelfareIncident, ttl }
    }

    #[test]
    fn production_efficiency_scenario() {
        let state = fixtures::state();
        let delta = Delta::default().with_metric(MetricKey::ProductionEfficiency, 0.2);
        let next = apply_delta(&state, &delta);
        assert!((next.metrics.measured.production_efficiency - 0.65).abs() < EPS);
    }

    #[test]
    fn apply_does_not_touch_input() {
        let state = fixtures::state();
        let before = state.clone();
        let delta = Delta::default()
            .with_metric(MetricKey::WelfareDebt, 0.3)
            .with_region("USA", 0.2)
            .with_ring(spawn(2));
        let _ = apply_delta(&state, &delta);
        assert_eq!(state, before);
    }

    #[test]
    fn irreversibility_relaxes_toward_target() {
        let mut state = fixtures::state();
        state.metrics.unmeasured.welfare_debt = 0.8;
        state.metrics.unmeasured.enforcement_gap = 0.6;
        state.metrics.unmeasured.system_irreversibility = 0.0;
        let next = apply_delta(&state, &Delta::default());
        assert!((next.metrics.unmeasured.system_irreversibility - 0.215).abs() < EPS);
    }

    #[test]
    fn irreversibility_can_fall() {
        let mut state = fixtures::state();
        state.metrics.unmeasured.welfare_debt = 0.0;
        state.metrics.unmeasured.enforcement_gap = 0.0;
        state.metrics.unmeasured.system_irreversibility = 0.8;
        let next = apply_delta(&state, &Delta::default());
        assert!((next.metrics.unmeasured.system_irreversibility - 0.6).abs() < EPS);
    }

    #[test]
    fn metrics_are_clamped() {
        let state = fixtures::state();
        let delta = Delta::default()
            .with_metric(MetricKey::CostPerUnit, -5.0)
            .with_metric(MetricKey::WelfareDebt, 5.0)
            .with_metric(MetricKey::WelfareStandardAdoption, 50.0);
        let next = apply_delta(&state, &delta);
        assert!(next.metrics.measured.cost_per_unit.abs() < EPS);
        assert!((next.metrics.unmeasured.welfare_debt - 1.0).abs() < EPS);
        // Adoption has no upper clamp.
        assert!(next.metrics.measured.welfare_standard_adoption > 3.0);
    }

    #[test]
    fn non_finite_values_are_zero() {
        let state = fixtures::state();
        let delta = Delta::default()
            .with_metric(MetricKey::ProductionEfficiency, f64::NAN)
            .with_metric(MetricKey::CostPerUnit, f64::INFINITY)
            .with_region("USA", f64::NEG_INFINITY);
        let (next, report) =
            apply_delta_with(&state, &delta, &SimConfig::default(), RegionGraph::standard());
        assert_eq!(report.coerced_values, 3);
        assert!((next.metrics.measured.production_efficiency - 0.5).abs() < EPS);
        assert!((next.metrics.measured.cost_per_unit - 0.3).abs() < EPS);
        assert_eq!(next.map.region_value(&"USA".into()), Some(0.3));
    }

    #[test]
    fn positive_region_adjustment_spills_to_tracked_neighbours() {
        let state = fixtures::state();
        let next = apply_delta(&state, &Delta::default().with_region("USA", 0.1));
        let v = |c: &str| next.map.region_value(&c.into()).unwrap_or(f64::NAN);
        assert!((v("USA") - 0.4).abs() < EPS);
        assert!((v("CAN") - 0.23).abs() < EPS);
        assert!((v("MEX") - 0.28).abs() < EPS);
        // GBR is tracked but not a USA neighbour.
        assert!((v("GBR") - 0.4).abs() < EPS);
    }

    #[test]
    fn region_adjustments_follow_authored_order() {
        // USA spills 0.03 into CAN first, then the CAN cut clamps at zero.
        let delta: Delta =
            serde_json::from_str(r#"{"map": {"regionValues": {"USA": 0.1, "CAN": -0.5}}}"#)
                .expect("delta");
        let next = apply_delta(&fixtures::state(), &delta);
        assert_eq!(next.map.region_value(&"CAN".into()), Some(0.0));
        assert!((next.map.region_value(&"USA".into()).unwrap_or(f64::NAN) - 0.4).abs() < EPS);

        // Authored the other way round, the cut lands first and the spill survives.
        let delta = Delta::default().with_region("CAN", -0.5).with_region("USA", 0.1);
        let next = apply_delta(&fixtures::state(), &delta);
        assert!((next.map.region_value(&"CAN".into()).unwrap_or(f64::NAN) - 0.03).abs() < EPS);
    }

    #[test]
    fn negative_adjustment_does_not_spill() {
        let state = fixtures::state();
        let next = apply_delta(&state, &Delta::default().with_region("USA", -0.1));
        assert_eq!(next.map.region_value(&"CAN".into()), Some(0.2));
        assert!((next.map.region_value(&"USA".into()).unwrap_or(f64::NAN) - 0.2).abs() < EPS);
    }

    #[test]
    fn propagation_never_creates_entries() {
        let mut map = MapState::default();
        map.region_values.insert("A".into(), 0.5);
        let state = State::new("N", "P", fixtures::metrics(), map);
        let graph = RegionGraph::from_table(&[("A", &["B"])]);
        let delta = Delta::default().with_region("A", 0.1);
        let (next, report) = apply_delta_with(&state, &delta, &SimConfig::default(), &graph);
        assert!(!next.map.is_tracked(&"B".into()));
        assert_eq!(report.propagated_writes, 0);
    }

    #[test]
    fn direct_write_starts_tracking() {
        let state = fixtures::state();
        let next = apply_delta(&state, &Delta::default().with_region("NZL", 0.2));
        assert!((next.map.region_value(&"NZL".into()).unwrap_or(f64::NAN) - 0.2).abs() < EPS);
        // AUS is NZL's neighbour but untracked here.
        assert!(!next.map.is_tracked(&"AUS".into()));
    }

    #[test]
    fn region_writes_clamp() {
        let state = fixtures::state();
        let next = apply_delta(&state, &Delta::default().with_region("GBR", 2.0));
        assert_eq!(next.map.region_value(&"GBR".into()), Some(1.0));
    }

    #[test]
    fn arcs_activate_once() {
        let state = fixtures::state();
        let delta = Delta::default().with_arc("a1").with_arc("a1").with_hub("h1");
        let once = apply_delta(&state, &delta);
        let twice = apply_delta(&once, &delta);
        assert_eq!(twice.map.active_arcs.len(), 1);
        assert_eq!(twice.map.active_hubs.len(), 1);
        assert_eq!(twice.map.active_arcs[0].triggered_by_node_id.as_deref(), Some("N01_INITIAL"));
    }

    #[test]
    fn existing_arc_keeps_first_trigger() {
        let mut state = fixtures::state();
        let mut arc = ArcDatum::placeholder("a1", "N00");
        state.map.active_arcs.push(arc.clone());
        arc.id = "a2".to_string();
        arc.triggered_by_node_id = None;
        state.map.active_arcs.push(arc);

        let next = apply_delta(&state, &Delta::default().with_arc("a1").with_arc("a2"));
        assert_eq!(next.map.active_arcs[0].triggered_by_node_id.as_deref(), Some("N00"));
        assert_eq!(next.map.active_arcs[1].triggered_by_node_id.as_deref(), Some("N01_INITIAL"));
    }

    #[test]
    fn rings_stamp_pre_delta_turn_with_unique_ids() {
        let mut state = fixtures::state();
        state.turn = 4;
        let delta = Delta::default().with_ring(spawn(3)).with_ring(spawn(1));
        let once = apply_delta(&state, &delta);
        let twice = apply_delta(&once, &delta);

        let ids: Vec<&str> = twice.map.active_rings.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["ring_4_0_0", "ring_4_1_0", "ring_4_0_2", "ring_4_1_2"]);
        assert!(twice.map.active_rings.iter().all(|r| r.created_turn == 4));
    }

    #[test]
    fn config_overrides_spill_factor() {
        let state = fixtures::state();
        let mut config = SimConfig::default();
        config.propagation.spill_factor = 0.0;
        let delta = Delta::default().with_region("USA", 0.1);
        let (next, _) = apply_delta_with(&state, &delta, &config, RegionGraph::standard());
        assert_eq!(next.map.region_value(&"CAN".into()), Some(0.2));
    }

    #[test]
    fn unknown_metric_key_is_rejected() {
        let json = r#"{"metrics":{"measured":{"productionEficiency":0.1}}}"#;
        assert!(serde_json::from_str::<Delta>(json).is_err());
    }

    #[test]
    fn delta_parses_content_shape() {
        let json = r#"{
            "metrics": {"measured": {"costPerUnit": -0.1}, "unmeasured": {"welfareDebt": 0.05}},
            "map": {
                "regionValues": {"USA": 0.1},
                "activateArcs": ["arc_1"],
                "spawnRings": [{"lat": 1.0, "lng": 2.0, "eventType": "policy_shift", "ttl": 3}]
            }
        }"#;
        let delta: Delta = serde_json::from_str(json).expect("parse");
        assert_eq!(delta.metric(MetricKey::CostPerUnit), Some(-0.1));
        assert_eq!(delta.metric(MetricKey::WelfareDebt), Some(0.05));
        assert_eq!(delta.metric(MetricKey::EnforcementGap), None);
        assert_eq!(delta.map.as_ref().map(|m| m.spawn_rings.len()), Some(1));
    }
}
