//! Aggregate indices over the metric families and regional map.

use serde::Serialize;

use crate::state::{MapState, MeasuredMetrics, State, UnmeasuredMetrics, WELFARE_ADOPTION_CEILING};

/// Weighted summary of what the organisation measures, 0–1, higher is better.
///
/// `0.3·PE + 0.3·min(1, WSA/3) + 0.2·(1 − cost) + 0.2·(1 − incident)`
#[must_use]
pub fn measured_success_index(m: &MeasuredMetrics) -> f64 {
    let adoption = (m.welfare_standard_adoption / WELFARE_ADOPTION_CEILING).min(1.0);
    m.production_efficiency * 0.3
        + adoption * 0.3
        + (1.0 - m.cost_per_unit) * 0.2
        + (1.0 - m.welfare_incident_rate) * 0.2
}

/// Weighted summary of hidden costs, 0–1, lower is better.
#[must_use]
pub fn governance_debt_index(u: &UnmeasuredMetrics) -> f64 {
    u.welfare_debt * 0.25
        + u.enforcement_gap * 0.25
        + u.regulatory_capture * 0.15
        + u.sentience_knowledge_gap * 0.15
        + u.system_irreversibility * 0.2
}

/// Mean value over tracked regions. `None` when nothing is tracked.
#[must_use]
pub fn average_region_value(map: &MapState) -> Option<f64> {
    if map.region_values.is_empty() {
        return None;
    }
    let sum: f64 = map.region_values.values().sum();
    #[allow(clippy::cast_precision_loss)]
    Some(sum / map.region_values.len() as f64)
}

/// Number of tracked regions whose value satisfies `pred`.
#[must_use]
pub fn count_regions(map: &MapState, pred: impl Fn(f64) -> bool) -> usize {
    map.region_values.values().filter(|v| pred(**v)).count()
}

/// All indices at once, for reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scorecard {
    /// Measured Success Index.
    pub measured_success: f64,
    /// Governance Debt Index.
    pub governance_debt: f64,
    /// Mean regional value, if any region is tracked.
    pub average_region: Option<f64>,
}

impl Scorecard {
    /// Compute every index for `state`.
    #[must_use]
    pub fn of(state: &State) -> Self {
        Self {
            measured_success: measured_success_index(&state.metrics.measured),
            governance_debt: governance_debt_index(&state.metrics.unmeasured),
            average_region: average_region_value(&state.map),
        }
    }
}
