//! Regional values and globe objects (arcs, hubs, rings).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ArcKind, MapMode, RegionCode, RingEventType, Turn};

/// Sparse per-region welfare values.
///
/// A missing key means the region is not tracked yet. It is not the same as
/// a tracked region at zero, and the engine never fills one in on its own.
pub type RegionValues = BTreeMap<RegionCode, f64>;

/// Everything the globe shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapState {
    /// Display layer.
    pub mode: MapMode,
    /// Sparse regional values in 0–1.
    pub region_values: RegionValues,
    /// Activated flows, unique by id.
    pub active_arcs: Vec<ArcDatum>,
    /// Activated hubs, unique by id.
    pub active_hubs: Vec<HubDatum>,
    /// Event markers. Never removed; expiry is decided at read time.
    pub active_rings: Vec<RingDatum>,
}

impl MapState {
    /// Value of a tracked region.
    #[must_use]
    pub fn region_value(&self, code: &RegionCode) -> Option<f64> {
        self.region_values.get(code).copied()
    }

    /// Whether the region is tracked.
    #[must_use]
    pub fn is_tracked(&self, code: &RegionCode) -> bool {
        self.region_values.contains_key(code)
    }
}

/// A flow between two points on the globe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcDatum {
    /// Catalogue id.
    pub id: String,
    /// Origin latitude.
    pub start_lat: f64,
    /// Origin longitude.
    pub start_lng: f64,
    /// Destination latitude.
    pub end_lat: f64,
    /// Destination longitude.
    pub end_lng: f64,
    /// Flow kind.
    #[serde(rename = "type")]
    pub kind: ArcKind,
    /// Rendering weight before state scaling.
    pub base_weight: f64,
    /// Display label.
    pub label: String,
    /// Node whose choice first activated this arc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by_node_id: Option<String>,
}

impl ArcDatum {
    /// Stand-in for an arc whose geometry lives in the flow catalogue.
    #[must_use]
    pub fn placeholder(id: &str, triggered_by: &str) -> Self {
        Self {
            id: id.to_string(),
            start_lat: 0.0,
            start_lng: 0.0,
            end_lat: 0.0,
            end_lng: 0.0,
            kind: ArcKind::SupplyChain,
            base_weight: 0.5,
            label: id.to_string(),
            triggered_by_node_id: Some(triggered_by.to_string()),
        }
    }
}

/// A point of interest on the globe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubDatum {
    /// Catalogue id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Region the hub sits in (may be empty for placeholders).
    pub iso3: String,
    /// Free-form hub category.
    #[serde(rename = "type")]
    pub kind: String,
    /// Node whose choice first activated this hub.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by_node_id: Option<String>,
}

impl HubDatum {
    /// Stand-in for a hub whose details live in the hub catalogue.
    #[must_use]
    pub fn placeholder(id: &str, triggered_by: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            lat: 0.0,
            lng: 0.0,
            iso3: String::new(),
            kind: "unknown".to_string(),
            triggered_by_node_id: Some(triggered_by.to_string()),
        }
    }
}

/// A time-limited event marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RingDatum {
    /// Synthesized unique id.
    pub id: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// What happened.
    pub event_type: RingEventType,
    /// Lifetime in turns.
    pub ttl: Turn,
    /// Turn the ring was spawned on.
    pub created_turn: Turn,
    /// Node whose choice spawned the ring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by_node_id: Option<String>,
}

impl RingDatum {
    /// A ring expires once `turn - created_turn >= ttl`.
    #[must_use]
    pub fn is_expired(&self, turn: Turn) -> bool {
        turn.saturating_sub(self.created_turn) >= self.ttl
    }
}
