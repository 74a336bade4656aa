//! Loss and victory classification.
//!
//! The reducer calls an [`OutcomeClassifier`] once per choice and stores
//! what it returns on the new state. [`StandardClassifier`] implements the
//! five standard loss conditions; each has a hard condition and a softer
//! warning threshold.
//!
//! | Kind | Condition | Warning |
//! |------|-----------|---------|
//! | welfare collapse | avg < 0.2, incident > 0.6, ≥ 3 regions < 0.2 | avg < 0.3, incident > 0.5, ≥ 2 regions < 0.3 |
//! | debt crisis | GDI > 0.75 or (debt > 0.8 and irrev > 0.7) | GDI > 0.6 or (debt > 0.65 and irrev > 0.6) |
//! | enforcement failure | gap > 0.7, capture > 0.6, incident > 0.5 | gap > 0.55, capture > 0.5, incident > 0.4 |
//! | irreversibility lock | irrev > 0.85, avg < 0.4 | irrev > 0.7, avg < 0.5 |
//! | regulatory capture | capture > 0.75, gap > 0.6, debt > 0.7 | capture > 0.6, gap > 0.5, debt > 0.55 |

use serde::{Deserialize, Serialize};

use crate::scoring::{average_region_value, count_regions, governance_debt_index, measured_success_index};
use crate::state::State;
use crate::types::{LossKind, Severity, VictoryKind};

/// A loss condition that is met or approaching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossSignal {
    /// Which condition.
    #[serde(rename = "type")]
    pub kind: LossKind,
    /// `Critical` when met, `Warning` when approaching.
    pub severity: Severity,
}

/// Classifies a post-choice state.
pub trait OutcomeClassifier {
    /// Loss conditions currently met.
    fn loss_conditions(&self, state: &State) -> Vec<LossKind>;

    /// Loss conditions met or approaching.
    fn loss_warnings(&self, state: &State) -> Vec<LossSignal>;
}

/// The five standard loss conditions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardClassifier;

/// Classifies nothing. For hosts that run their own outcome logic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOutcomes;

impl OutcomeClassifier for NoOutcomes {
    fn loss_conditions(&self, _state: &State) -> Vec<LossKind> {
        Vec::new()
    }

    fn loss_warnings(&self, _state: &State) -> Vec<LossSignal> {
        Vec::new()
    }
}

impl StandardClassifier {
    /// Whether the hard condition for `kind` holds.
    #[must_use]
    pub fn is_met(kind: LossKind, state: &State) -> bool {
        let u = &state.metrics.unmeasured;
        let incident = state.metrics.measured.welfare_incident_rate;
        let avg = average_region_value(&state.map);
        match kind {
            LossKind::WelfareCollapse => avg.is_some_and(|avg| {
                avg < 0.2 && incident > 0.6 && count_regions(&state.map, |v| v < 0.2) >= 3
            }),
            LossKind::DebtCrisis => {
                governance_debt_index(u) > 0.75
                    || (u.welfare_debt > 0.8 && u.system_irreversibility > 0.7)
            }
            LossKind::EnforcementFailure => {
                u.enforcement_gap > 0.7 && u.regulatory_capture > 0.6 && incident > 0.5
            }
            LossKind::IrreversibilityLock => avg.is_some_and(|avg| {
                u.system_irreversibility > 0.85
                    && (1.0 - u.system_irreversibility) < 0.15
                    && avg < 0.4
            }),
            LossKind::RegulatoryCapture => {
                u.regulatory_capture > 0.75 && u.enforcement_gap > 0.6 && u.welfare_debt > 0.7
            }
        }
    }

    /// Whether the warning threshold for `kind` holds.
    #[must_use]
    pub fn is_approaching(kind: LossKind, state: &State) -> bool {
        let u = &state.metrics.unmeasured;
        let incident = state.metrics.measured.welfare_incident_rate;
        let avg = average_region_value(&state.map);
        match kind {
            LossKind::WelfareCollapse => avg.is_some_and(|avg| {
                avg < 0.3 && incident > 0.5 && count_regions(&state.map, |v| v < 0.3) >= 2
            }),
            LossKind::DebtCrisis => {
                governance_debt_index(u) > 0.6
                    || (u.welfare_debt > 0.65 && u.system_irreversibility > 0.6)
            }
            LossKind::EnforcementFailure => {
                u.enforcement_gap > 0.55 && u.regulatory_capture > 0.5 && incident > 0.4
            }
            LossKind::IrreversibilityLock => avg.is_some_and(|avg| {
                u.system_irreversibility > 0.7
                    && (1.0 - u.system_irreversibility) < 0.25
                    && avg < 0.5
            }),
            LossKind::RegulatoryCapture => {
                u.regulatory_capture > 0.6 && u.enforcement_gap > 0.5 && u.welfare_debt > 0.55
            }
        }
    }
}

impl OutcomeClassifier for StandardClassifier {
    fn loss_conditions(&self, state: &State) -> Vec<LossKind> {
        LossKind::ALL.into_iter().filter(|kind| Self::is_met(*kind, state)).collect()
    }

    fn loss_warnings(&self, state: &State) -> Vec<LossSignal> {
        LossKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let severity = if Self::is_met(kind, state) {
                    Severity::Critical
                } else if Self::is_approaching(kind, state) {
                    Severity::Warning
                } else {
                    return None;
                };
                Some(LossSignal { kind, severity })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Victory
// ---------------------------------------------------------------------------

/// Whether the victory condition for `kind` holds.
#[must_use]
pub fn victory_met(kind: VictoryKind, state: &State) -> bool {
    let msi = measured_success_index(&state.metrics.measured);
    let gdi = governance_debt_index(&state.metrics.unmeasured);
    let u = &state.metrics.unmeasured;
    let avg = average_region_value(&state.map);
    match kind {
        VictoryKind::Welfare => avg.is_some_and(|avg| {
            msi > 0.75 && avg > 0.6 && count_regions(&state.map, |v| v > 0.7) >= 5
        }),
        VictoryKind::Debt => gdi < 0.25 && msi > 0.5,
        VictoryKind::Enforcement => avg.is_some_and(|avg| {
            u.enforcement_gap < 0.15 && u.regulatory_capture < 0.2 && avg > 0.5
        }),
        VictoryKind::Balance => avg.is_some_and(|avg| {
            msi > 0.65
                && gdi < 0.35
                && u.enforcement_gap < 0.25
                && avg > 0.55
                && u.regulatory_capture < 0.3
                && u.sentience_knowledge_gap < 0.3
        }),
    }
}

/// First victory reached, checking the most demanding path first.
#[must_use]
pub fn victory(state: &State) -> Option<VictoryKind> {
    [VictoryKind::Balance, VictoryKind::Enforcement, VictoryKind::Debt, VictoryKind::Welfare]
        .into_iter()
        .find(|kind| victory_met(*kind, state))
}
