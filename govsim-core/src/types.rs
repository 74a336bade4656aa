//! Core identifier and enumeration types shared across the engine.
//!
//! All types are serializable with the same JSON shape the scenario content
//! and saved games use.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Turn counter. Starts at 0 and only advances through `CHOOSE_OPTION`.
pub type Turn = u32;

/// ISO-3166 alpha-3 style code for a tracked region (e.g. `"USA"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionCode(pub String);

impl RegionCode {
    /// Create a region code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Borrow the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RegionCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a stored save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaveId(pub Uuid);

impl SaveId {
    /// Create a new random save ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SaveId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SaveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Map Enumerations
// ---------------------------------------------------------------------------

/// Which layer the globe renders. Has no effect on engine logic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MapMode {
    /// Regional welfare standard adoption.
    #[default]
    WelfareStandards,
    /// Accumulated welfare debt.
    WelfareDebt,
    /// Enforcement coverage.
    Enforcement,
}

/// What kind of flow an arc represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcKind {
    /// Goods moving between regions.
    #[default]
    SupplyChain,
    /// Policy diffusion.
    RegulatoryFlow,
    /// Joint research.
    ResearchCollaboration,
    /// Commercial pressure.
    MarketInfluence,
    /// Advocacy and welfare organisations.
    WelfareNetwork,
}

/// What kind of event a ring marks on the globe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingEventType {
    /// A notable policy change.
    PolicyShift,
    /// A welfare incident.
    WelfareIncident,
    /// A regulator reacting.
    RegulatoryResponse,
    /// A market moving.
    MarketChange,
    /// New scientific understanding.
    ResearchBreakthrough,
    /// Public campaign or outcry.
    PublicPressure,
}

// ---------------------------------------------------------------------------
// Outcome Enumerations
// ---------------------------------------------------------------------------

/// The five ways a run can be lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    /// Regional welfare collapsed while incidents climbed.
    WelfareCollapse,
    /// Governance debt became unsustainable.
    DebtCrisis,
    /// Policy no longer translates into practice.
    EnforcementFailure,
    /// The system is locked in beyond rollback.
    IrreversibilityLock,
    /// Industry controls its own regulation.
    RegulatoryCapture,
}

impl LossKind {
    /// Every loss kind, in evaluation order.
    pub const ALL: [Self; 5] = [
        Self::WelfareCollapse,
        Self::DebtCrisis,
        Self::EnforcementFailure,
        Self::IrreversibilityLock,
        Self::RegulatoryCapture,
    ];

    /// Human-readable name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::WelfareCollapse => "Welfare Collapse",
            Self::DebtCrisis => "Governance Debt Crisis",
            Self::EnforcementFailure => "Enforcement Failure",
            Self::IrreversibilityLock => "System Irreversibility Lock",
            Self::RegulatoryCapture => "Regulatory Capture",
        }
    }
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The four ways a run can be won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VictoryKind {
    /// High welfare everywhere while staying efficient.
    Welfare,
    /// Hidden costs kept low with reasonable standards.
    Debt,
    /// Policy reliably becomes practice.
    Enforcement,
    /// Every metric in a good range.
    Balance,
}

/// How close a loss condition is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Approaching the threshold.
    Warning,
    /// Threshold crossed.
    Critical,
}
