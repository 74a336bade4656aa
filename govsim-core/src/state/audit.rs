//! Audit records, the append-only decision log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::Metrics;
use crate::types::Turn;

/// One turn's decision and the metrics it produced.
///
/// `metrics_snapshot` is an owned copy taken after the delta was applied, so
/// later transitions can never reach back into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Turn number this record closes (1-based).
    pub turn: Turn,
    /// Phase the decision was made in.
    pub phase_id: String,
    /// Node the decision was made at.
    pub node_id: String,
    /// Title of that node.
    pub node_title: String,
    /// Host-assigned choice identifier (e.g. `C2`).
    #[serde(default)]
    pub choice_id: String,
    /// Label of the chosen option.
    pub chosen_label: String,
    /// Who owns the decision.
    pub owner_role: String,
    /// Free-text rationale.
    pub rationale: String,
    /// Free-text assumptions as entered this turn.
    pub assumptions: String,
    /// "What we did not measure".
    pub unmeasured_impact: String,
    /// Host-supplied wall-clock time of the decision.
    pub timestamp: DateTime<Utc>,
    /// Metrics right after this turn's delta.
    pub metrics_snapshot: Metrics,
}
