//! Read-only views over [`State`] for presentation layers.
//!
//! Arc and hub visibility is a two-branch strategy decided by
//! [`arc_activation`] / [`hub_activation`]:
//!
//! - **Explicit**: something has been activated; show the catalogue
//!   entries whose ids are in the active set.
//! - **Fallback**: nothing activated yet but the world state is "loud"
//!   enough (debt > 0.3 for arcs, adoption > 0.5 for hubs); show the first
//!   few catalogue entries.
//!
//! All functions are cheap enough to call every frame.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::state::{ArcDatum, Assumption, HubDatum, RingDatum, State, WELFARE_ADOPTION_CEILING};

/// Debt above which arcs appear without explicit activation.
pub const ARC_FALLBACK_DEBT: f64 = 0.3;
/// Adoption above which hubs appear without explicit activation.
pub const HUB_FALLBACK_ADOPTION: f64 = 0.5;
/// Strength below which an assumption counts as degraded.
pub const DEGRADED_THRESHOLD: f64 = 0.3;

/// Which catalogue entries are visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation<'a> {
    /// Entries whose id is in the set.
    Explicit(BTreeSet<&'a str>),
    /// The first `n` entries.
    Fallback(usize),
}

impl Activation<'_> {
    /// Apply the strategy to a catalogue, preserving catalogue order.
    pub fn select<'c, T>(&self, catalogue: &'c [T], id: impl Fn(&T) -> &str) -> Vec<&'c T> {
        match self {
            Self::Explicit(ids) => catalogue.iter().filter(|item| ids.contains(id(*item))).collect(),
            Self::Fallback(n) => catalogue.iter().take(*n).collect(),
        }
    }
}

/// Arc visibility strategy for `state`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn arc_activation(state: &State) -> Activation<'_> {
    let debt = state.metrics.unmeasured.welfare_debt;
    if state.map.active_arcs.is_empty() && debt > ARC_FALLBACK_DEBT {
        Activation::Fallback((debt * 5.0).floor() as usize)
    } else {
        Activation::Explicit(state.map.active_arcs.iter().map(|a| a.id.as_str()).collect())
    }
}

/// Hub visibility strategy for `state`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn hub_activation(state: &State) -> Activation<'_> {
    let adoption = state.metrics.measured.welfare_standard_adoption;
    if state.map.active_hubs.is_empty() && adoption > HUB_FALLBACK_ADOPTION {
        Activation::Fallback(adoption.floor() as usize)
    } else {
        Activation::Explicit(state.map.active_hubs.iter().map(|h| h.id.as_str()).collect())
    }
}

/// Arc weight multiplier: `1 + 2·debt`.
#[must_use]
pub fn arc_weight_multiplier(state: &State) -> f64 {
    1.0 + state.metrics.unmeasured.welfare_debt * 2.0
}

/// Visible arcs with debt-scaled weights.
#[must_use]
pub fn active_arcs(state: &State, catalogue: &[ArcDatum]) -> Vec<ArcDatum> {
    let multiplier = arc_weight_multiplier(state);
    arc_activation(state)
        .select(catalogue, |arc| arc.id.as_str())
        .into_iter()
        .map(|arc| ArcDatum { base_weight: arc.base_weight * multiplier, ..arc.clone() })
        .collect()
}

/// A hub with render scaling attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubView {
    /// Catalogue entry.
    #[serde(flatten)]
    pub hub: HubDatum,
    /// `0.5 + 0.5·capture`.
    pub size: f64,
    /// `0.5 + 0.5·(adoption / 3)`.
    pub brightness: f64,
}

/// Visible hubs with capture/adoption-driven scaling.
#[must_use]
pub fn active_hubs(state: &State, catalogue: &[HubDatum]) -> Vec<HubView> {
    let size = 0.5 + state.metrics.unmeasured.regulatory_capture * 0.5;
    let brightness =
        0.5 + (state.metrics.measured.welfare_standard_adoption / WELFARE_ADOPTION_CEILING) * 0.5;
    hub_activation(state)
        .select(catalogue, |hub| hub.id.as_str())
        .into_iter()
        .map(|hub| HubView { hub: hub.clone(), size, brightness })
        .collect()
}

/// Rings that have not expired at the current turn.
#[must_use]
pub fn active_rings(state: &State) -> Vec<&RingDatum> {
    state.map.active_rings.iter().filter(|r| !r.is_expired(state.turn)).collect()
}

/// Assumptions below [`DEGRADED_THRESHOLD`].
#[must_use]
pub fn degraded_assumptions(state: &State) -> Vec<&Assumption> {
    degraded_assumptions_with(state, DEGRADED_THRESHOLD)
}

/// Assumptions below `threshold`.
#[must_use]
pub fn degraded_assumptions_with(state: &State, threshold: f64) -> Vec<&Assumption> {
    state.assumptions().iter().filter(|a| a.is_degraded(threshold)).collect()
}
