//! Regional influence graph.
//!
//! A positive adjustment to one region spills a fraction of itself onto the
//! regions listed as its neighbours here. Edges are directed and hand
//! authored (trading partners, regional blocs); they are not required to be
//! symmetric.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::types::RegionCode;

/// Directed adjacency table keyed by region code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionGraph {
    edges: BTreeMap<RegionCode, Vec<RegionCode>>,
}

static STANDARD: LazyLock<RegionGraph> = LazyLock::new(|| RegionGraph::from_table(STANDARD_TABLE));

/// Authored influence table.
const STANDARD_TABLE: &[(&str, &[&str])] = &[
    // North America
    ("USA", &["CAN", "MEX"]),
    ("CAN", &["USA", "MEX"]),
    ("MEX", &["USA", "CAN"]),
    // Europe
    ("GBR", &["IRL", "FRA", "DEU", "NLD", "BEL"]),
    ("FRA", &["GBR", "DEU", "ESP", "ITA", "BEL", "CHE"]),
    ("DEU", &["FRA", "AUT", "POL", "CZE", "NLD", "BEL", "CHE"]),
    ("ITA", &["FRA", "ESP", "AUT", "CHE"]),
    ("ESP", &["FRA", "ITA", "PRT"]),
    ("NLD", &["BEL", "DEU", "GBR"]),
    ("BEL", &["FRA", "DEU", "NLD"]),
    ("POL", &["DEU", "CZE", "SVK"]),
    ("SWE", &["DNK", "NOR", "FIN"]),
    ("DNK", &["SWE", "NOR", "DEU"]),
    // Asia
    ("CHN", &["JPN", "KOR", "THA", "IDN", "MYS", "PHL", "VNM"]),
    ("JPN", &["CHN", "KOR", "THA"]),
    ("KOR", &["CHN", "JPN"]),
    ("IND", &["PAK", "BGD", "LKA", "NPL"]),
    ("THA", &["VNM", "MYS", "IDN", "PHL"]),
    ("IDN", &["MYS", "THA", "PHL", "SGP"]),
    ("MYS", &["SGP", "IDN", "THA"]),
    ("PHL", &["IDN", "THA", "VNM"]),
    // South America
    ("BRA", &["ARG", "CHL", "URY", "PRY"]),
    ("ARG", &["BRA", "CHL", "URY"]),
    ("CHL", &["ARG", "PER", "BOL"]),
    // Oceania
    ("AUS", &["NZL"]),
    ("NZL", &["AUS"]),
    // Africa & Middle East
    ("ZAF", &["BWA", "ZWE", "MOZ", "NAM"]),
    ("EGY", &["LBY", "SDN", "JOR", "ISR"]),
    ("SAU", &["ARE", "KWT", "BHR", "OMN", "QAT"]),
    ("TUR", &["GRC", "BGR", "GEO", "ARM"]),
    ("ISR", &["JOR", "LBN", "EGY"]),
];

impl RegionGraph {
    /// The authored world table, built once.
    #[must_use]
    pub fn standard() -> &'static Self {
        &STANDARD
    }

    /// Build a graph from `(region, neighbours)` rows.
    #[must_use]
    pub fn from_table(table: &[(&str, &[&str])]) -> Self {
        let edges = table
            .iter()
            .map(|(from, to)| {
                (
                    RegionCode::from(*from),
                    to.iter().map(|code| RegionCode::from(*code)).collect(),
                )
            })
            .collect();
        Self { edges }
    }

    /// Add (or replace) the outgoing edges of one region.
    pub fn insert(&mut self, from: RegionCode, to: Vec<RegionCode>) {
        self.edges.insert(from, to);
    }

    /// Regions influenced by `code`. Empty when the region has no entry.
    #[must_use]
    pub fn neighbours(&self, code: &RegionCode) -> &[RegionCode] {
        self.edges.get(code).map_or(&[], Vec::as_slice)
    }

    /// Number of regions with outgoing edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no edges at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_is_directed() {
        let g = RegionGraph::standard();
        // GBR influences IRL but IRL has no outgoing row.
        assert!(g.neighbours(&"GBR".into()).contains(&"IRL".into()));
        assert!(g.neighbours(&"IRL".into()).is_empty());
    }

    #[test]
    fn standard_table_row_count() {
        assert_eq!(RegionGraph::standard().len(), STANDARD_TABLE.len());
    }

    #[test]
    fn unknown_region_has_no_neighbours() {
        assert!(RegionGraph::standard().neighbours(&"XXX".into()).is_empty());
    }

    #[test]
    fn custom_graph_insert() {
        let mut g = RegionGraph::default();
        assert!(g.is_empty());
        g.insert("A".into(), vec!["B".into()]);
        assert_eq!(g.neighbours(&"A".into()), &[RegionCode::from("B")]);
    }
}
