//! Measured and unmeasured metric families.
//!
//! Measured metrics are what an organisation tracks and optimises; the
//! unmeasured family are hidden governance costs that quietly accumulate.

use serde::{Deserialize, Serialize};

/// Ceiling of `welfareStandardAdoption`, used to normalise it for scaling.
pub const WELFARE_ADOPTION_CEILING: f64 = 3.0;

/// Outcomes an organisation measures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasuredMetrics {
    /// Output per unit input, 0–1, higher is better.
    pub production_efficiency: f64,
    /// Production cost, 0–1, lower is better.
    pub cost_per_unit: f64,
    /// Disease, injury and mortality, 0–1, lower is better.
    pub welfare_incident_rate: f64,
    /// Adoption of welfare standards, 0–3, higher is better.
    pub welfare_standard_adoption: f64,
}

/// Hidden governance costs. All lie in 0–1 and lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmeasuredMetrics {
    /// Accumulated welfare compromises.
    pub welfare_debt: f64,
    /// Delay between policy and enforcement.
    pub enforcement_gap: f64,
    /// Industry influence on policy.
    pub regulatory_capture: f64,
    /// Gaps in understanding animal needs.
    pub sentience_knowledge_gap: f64,
    /// How locked-in harmful systems are. Derived from debt and
    /// enforcement gap by relaxation after every delta.
    pub system_irreversibility: f64,
}

/// Both metric families.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Tracked outcomes.
    pub measured: MeasuredMetrics,
    /// Hidden costs.
    pub unmeasured: UnmeasuredMetrics,
}

impl Metrics {
    /// Read a single metric.
    #[must_use]
    pub fn get(&self, key: MetricKey) -> f64 {
        match key {
            MetricKey::ProductionEfficiency => self.measured.production_efficiency,
            MetricKey::CostPerUnit => self.measured.cost_per_unit,
            MetricKey::WelfareIncidentRate => self.measured.welfare_incident_rate,
            MetricKey::WelfareStandardAdoption => self.measured.welfare_standard_adoption,
            MetricKey::WelfareDebt => self.unmeasured.welfare_debt,
            MetricKey::EnforcementGap => self.unmeasured.enforcement_gap,
            MetricKey::RegulatoryCapture => self.unmeasured.regulatory_capture,
            MetricKey::SentienceKnowledgeGap => self.unmeasured.sentience_knowledge_gap,
            MetricKey::SystemIrreversibility => self.unmeasured.system_irreversibility,
        }
    }

    /// Overwrite a single metric. No clamping happens here.
    pub fn set(&mut self, key: MetricKey, value: f64) {
        let slot = match key {
            MetricKey::ProductionEfficiency => &mut self.measured.production_efficiency,
            MetricKey::CostPerUnit => &mut self.measured.cost_per_unit,
            MetricKey::WelfareIncidentRate => &mut self.measured.welfare_incident_rate,
            MetricKey::WelfareStandardAdoption => &mut self.measured.welfare_standard_adoption,
            MetricKey::WelfareDebt => &mut self.unmeasured.welfare_debt,
            MetricKey::EnforcementGap => &mut self.unmeasured.enforcement_gap,
            MetricKey::RegulatoryCapture => &mut self.unmeasured.regulatory_capture,
            MetricKey::SentienceKnowledgeGap => &mut self.unmeasured.sentience_knowledge_gap,
            MetricKey::SystemIrreversibility => &mut self.unmeasured.system_irreversibility,
        };
        *slot = value;
    }

    /// Clamp every metric into its declared range.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        for key in MetricKey::ALL {
            let value = key.clamp(self.get(key));
            self.set(key, value);
        }
        self
    }
}

/// Whether a larger value is an improvement or a regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Larger is better.
    HigherIsBetter,
    /// Smaller is better.
    LowerIsBetter,
}

/// Names every metric field, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKey {
    /// `measured.productionEfficiency`
    ProductionEfficiency,
    /// `measured.costPerUnit`
    CostPerUnit,
    /// `measured.welfareIncidentRate`
    WelfareIncidentRate,
    /// `measured.welfareStandardAdoption`
    WelfareStandardAdoption,
    /// `unmeasured.welfareDebt`
    WelfareDebt,
    /// `unmeasured.enforcementGap`
    EnforcementGap,
    /// `unmeasured.regulatoryCapture`
    RegulatoryCapture,
    /// `unmeasured.sentienceKnowledgeGap`
    SentienceKnowledgeGap,
    /// `unmeasured.systemIrreversibility`
    SystemIrreversibility,
}

impl MetricKey {
    /// Every metric, measured family first.
    pub const ALL: [Self; 9] = [
        Self::ProductionEfficiency,
        Self::CostPerUnit,
        Self::WelfareIncidentRate,
        Self::WelfareStandardAdoption,
        Self::WelfareDebt,
        Self::EnforcementGap,
        Self::RegulatoryCapture,
        Self::SentienceKnowledgeGap,
        Self::SystemIrreversibility,
    ];

    /// Direction of improvement.
    #[must_use]
    pub fn polarity(self) -> Polarity {
        match self {
            Self::ProductionEfficiency | Self::WelfareStandardAdoption => Polarity::HigherIsBetter,
            _ => Polarity::LowerIsBetter,
        }
    }

    /// Upper clamp bound. Adoption is only bounded below.
    #[must_use]
    pub fn upper_bound(self) -> Option<f64> {
        match self {
            Self::WelfareStandardAdoption => None,
            _ => Some(1.0),
        }
    }

    /// Clamp a value into this metric's declared range. NaN becomes 0.
    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        if value.is_nan() {
            return 0.0;
        }
        match self.upper_bound() {
            Some(upper) => value.clamp(0.0, upper),
            None => value.max(0.0),
        }
    }

    /// Whether this metric belongs to the measured family.
    #[must_use]
    pub fn is_measured(self) -> bool {
        matches!(
            self,
            Self::ProductionEfficiency
                | Self::CostPerUnit
                | Self::WelfareIncidentRate
                | Self::WelfareStandardAdoption
        )
    }

    /// The camelCase field name used in content and saves.
    #[must_use]
    pub fn field_name(self) -> &'static str {
        match self {
            Self::ProductionEfficiency => "productionEfficiency",
            Self::CostPerUnit => "costPerUnit",
            Self::WelfareIncidentRate => "welfareIncidentRate",
            Self::WelfareStandardAdoption => "welfareStandardAdoption",
            Self::WelfareDebt => "welfareDebt",
            Self::EnforcementGap => "enforcementGap",
            Self::RegulatoryCapture => "regulatoryCapture",
            Self::SentienceKnowledgeGap => "sentienceKnowledgeGap",
            Self::SystemIrreversibility => "systemIrreversibility",
        }
    }
}
