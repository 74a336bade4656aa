//! Milestones: achievements, wonders, great people and techs.
//!
//! A milestone is a predicate over [`State`] plus an optional effect. The
//! reducer only records unlocks; deciding *when* something unlocks and
//! applying its effect is host work, done by the session after each choice.
//!
//! [`standard_milestones`] is the built-in catalogue. Hosts can supply their
//! own [`Milestone`] implementations instead.

use govsim_core::state::{GreatPerson, MetricKey};
use govsim_core::{Action, RegionCode, State};
use govsim_core::scoring::{
    average_region_value, count_regions, governance_debt_index, measured_success_index,
};

/// What a milestone unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MilestoneKind {
    /// Recorded in `achievements`; every newly met one unlocks.
    Achievement,
    /// Recorded in `completed_wonders`; one per turn, with its effect.
    Wonder,
    /// Recorded in `great_people`; one per turn, with its effect.
    GreatPerson,
    /// Recorded in `researched_techs`; every newly met one unlocks.
    Tech,
}

impl MilestoneKind {
    /// Whether `id` is already recorded on `state` for this kind.
    #[must_use]
    pub fn is_recorded(self, id: &str, state: &State) -> bool {
        match self {
            Self::Achievement => state.achievements.iter().any(|a| a == id),
            Self::Wonder => state.completed_wonders.iter().any(|w| w == id),
            Self::GreatPerson => state.great_people.iter().any(|p| p.id == id),
            Self::Tech => state.researched_techs.iter().any(|t| t == id),
        }
    }
}

/// A host-side unlockable.
pub trait Milestone: Send + Sync {
    /// Stable id, recorded on the state once unlocked.
    fn id(&self) -> &str;

    /// Which collection the unlock lands in.
    fn kind(&self) -> MilestoneKind;

    /// Whether the unlock condition holds.
    fn is_met(&self, state: &State) -> bool;

    /// Apply the milestone's effect. Defaults to no effect.
    fn apply(&self, state: &State) -> State {
        state.clone()
    }

    /// The action that records the unlock.
    fn unlock_action(&self, state: &State) -> Action {
        let id = self.id().to_string();
        match self.kind() {
            MilestoneKind::Achievement => Action::UnlockAchievement { achievement_id: id },
            MilestoneKind::Wonder => Action::CompleteWonder { wonder_id: id },
            MilestoneKind::Tech => Action::ResearchTech { tech_id: id },
            MilestoneKind::GreatPerson => Action::UnlockGreatPerson {
                person: GreatPerson {
                    title: id.clone(),
                    id,
                    description: String::new(),
                    quote: None,
                    unlocked_turn: state.turn,
                },
            },
        }
    }

    /// Met and not yet recorded.
    fn is_newly_met(&self, state: &State) -> bool {
        !self.kind().is_recorded(self.id(), state) && self.is_met(state)
    }
}

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

/// Additive metric and regional adjustments, clamped into range.
///
/// Unlike a choice delta there is no context scaling and no propagation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Effect {
    /// Metric adjustments.
    pub metrics: &'static [(MetricKey, f64)],
    /// Regional adjustments; an untracked region starts from 0.
    pub regions: &'static [(&'static str, f64)],
}

impl Effect {
    /// No change.
    pub const NONE: Self = Self { metrics: &[], regions: &[] };

    /// Apply to a copy of `state`.
    #[must_use]
    pub fn apply(&self, state: &State) -> State {
        let mut next = state.clone();
        for (key, change) in self.metrics {
            let value = key.clamp(next.metrics.get(*key) + change);
            next.metrics.set(*key, value);
        }
        for (code, change) in self.regions {
            let slot = next.map.region_values.entry(RegionCode::from(*code)).or_insert(0.0);
            *slot = (*slot + change).clamp(0.0, 1.0);
        }
        next
    }
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

/// A catalogue milestone: fixed text, a predicate and an effect.
#[derive(Clone)]
pub struct CatalogueMilestone {
    /// Stable id.
    pub id: &'static str,
    /// Which collection it lands in.
    pub kind: MilestoneKind,
    /// Display title.
    pub title: &'static str,
    /// Display description.
    pub description: &'static str,
    /// Quotation, great people only.
    pub quote: Option<&'static str>,
    /// Unlock condition.
    pub condition: fn(&State) -> bool,
    /// Effect applied on unlock.
    pub effect: Effect,
}

impl std::fmt::Debug for CatalogueMilestone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogueMilestone")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("effect", &self.effect)
            .finish_non_exhaustive()
    }
}

impl Milestone for CatalogueMilestone {
    fn id(&self) -> &str {
        self.id
    }

    fn kind(&self) -> MilestoneKind {
        self.kind
    }

    fn is_met(&self, state: &State) -> bool {
        (self.condition)(state)
    }

    fn apply(&self, state: &State) -> State {
        self.effect.apply(state)
    }

    fn unlock_action(&self, state: &State) -> Action {
        match self.kind {
            MilestoneKind::GreatPerson => Action::UnlockGreatPerson {
                person: GreatPerson {
                    id: self.id.to_string(),
                    title: self.title.to_string(),
                    description: self.description.to_string(),
                    quote: self.quote.map(str::to_string),
                    unlocked_turn: state.turn,
                },
            },
            MilestoneKind::Achievement => Action::UnlockAchievement { achievement_id: self.id.to_string() },
            MilestoneKind::Wonder => Action::CompleteWonder { wonder_id: self.id.to_string() },
            MilestoneKind::Tech => Action::ResearchTech { tech_id: self.id.to_string() },
        }
    }
}

/// Number of audit records whose rationale (and, if `labels`, chosen label)
/// mentions any of `keywords`, case-insensitively.
#[must_use]
pub fn decisions_mentioning(state: &State, keywords: &[&str], labels: bool) -> usize {
    state
        .audit_trail
        .iter()
        .filter(|record| {
            let rationale = record.rationale.to_lowercase();
            let label = record.chosen_label.to_lowercase();
            keywords
                .iter()
                .any(|k| rationale.contains(k) || (labels && label.contains(k)))
        })
        .count()
}

fn high_regions(state: &State) -> usize {
    count_regions(&state.map, |v| v > 0.7)
}

/// The built-in achievements, wonders and great people.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn standard_milestones() -> Vec<Box<dyn Milestone>> {
    use MetricKey::{
        CostPerUnit, EnforcementGap, ProductionEfficiency, RegulatoryCapture,
        SentienceKnowledgeGap, SystemIrreversibility, WelfareDebt, WelfareStandardAdoption,
    };

    let entries = [
        // Achievements
        CatalogueMilestone {
            id: "ethical_pioneer",
            kind: MilestoneKind::Achievement,
            title: "Ethical Pioneer",
            description: "Always chose the highest welfare option in every decision",
            quote: None,
            condition: |s| {
                const WORDS: [&str; 5] = ["welfare", "standard", "protect", "recognize", "broad"];
                s.audit_trail.len() >= 5 && decisions_mentioning(s, &WORDS, true) == s.audit_trail.len()
            },
            effect: Effect::NONE,
        },
        CatalogueMilestone {
            id: "pragmatic_governor",
            kind: MilestoneKind::Achievement,
            title: "Pragmatic Governor",
            description: "Balanced all concerns across measured and unmeasured metrics",
            quote: None,
            condition: |s| {
                measured_success_index(&s.metrics.measured) > 0.6
                    && governance_debt_index(&s.metrics.unmeasured) < 0.4
                    && s.audit_trail.len() >= 8
            },
            effect: Effect::NONE,
        },
        CatalogueMilestone {
            id: "research_champion",
            kind: MilestoneKind::Achievement,
            title: "Research Champion",
            description: "Prioritized knowledge gaps and research throughout",
            quote: None,
            condition: |s| {
                const WORDS: [&str; 5] = ["research", "knowledge", "understanding", "study", "science"];
                decisions_mentioning(s, &WORDS, true) >= 4
                    && s.metrics.unmeasured.sentience_knowledge_gap < 0.25
            },
            effect: Effect::NONE,
        },
        CatalogueMilestone {
            id: "debt_eliminator",
            kind: MilestoneKind::Achievement,
            title: "Debt Eliminator",
            description: "Minimized welfare debt throughout the scenario",
            quote: None,
            condition: |s| {
                governance_debt_index(&s.metrics.unmeasured) < 0.2
                    && s.metrics.unmeasured.welfare_debt < 0.15
            },
            effect: Effect::NONE,
        },
        CatalogueMilestone {
            id: "enforcement_master",
            kind: MilestoneKind::Achievement,
            title: "Enforcement Master",
            description: "Achieved minimal enforcement gaps",
            quote: None,
            condition: |s| {
                s.metrics.unmeasured.enforcement_gap < 0.15
                    && s.metrics.unmeasured.regulatory_capture < 0.2
            },
            effect: Effect::NONE,
        },
        CatalogueMilestone {
            id: "efficiency_expert",
            kind: MilestoneKind::Achievement,
            title: "Efficiency Expert",
            description: "Maintained high production efficiency throughout",
            quote: None,
            condition: |s| {
                s.metrics.measured.production_efficiency > 0.75
                    && s.metrics.measured.cost_per_unit < 0.3
            },
            effect: Effect::NONE,
        },
        CatalogueMilestone {
            id: "global_leader",
            kind: MilestoneKind::Achievement,
            title: "Global Leader",
            description: "Achieved high welfare standards in 7+ countries",
            quote: None,
            condition: |s| high_regions(s) >= 7,
            effect: Effect::NONE,
        },
        CatalogueMilestone {
            id: "balanced_approach",
            kind: MilestoneKind::Achievement,
            title: "Balanced Approach",
            description: "Achieved balance victory - all metrics in good ranges",
            quote: None,
            condition: |s| govsim_core::outcome::victory_met(govsim_core::VictoryKind::Balance, s),
            effect: Effect::NONE,
        },
        CatalogueMilestone {
            id: "rapid_decision_maker",
            kind: MilestoneKind::Achievement,
            title: "Rapid Decision Maker",
            description: "Completed the scenario in under 15 turns",
            quote: None,
            condition: |s| s.turn <= 15 && s.flags.is_complete,
            effect: Effect::NONE,
        },
        CatalogueMilestone {
            id: "thoughtful_planner",
            kind: MilestoneKind::Achievement,
            title: "Thoughtful Planner",
            description: "Maintained assumptions throughout with minimal degradation",
            quote: None,
            condition: |s| {
                let bank = s.assumptions();
                bank.len() >= 5 && bank.iter().filter(|a| a.strength > 0.7).count() >= 3
            },
            effect: Effect::NONE,
        },
        // Wonders
        CatalogueMilestone {
            id: "global_welfare_accord",
            kind: MilestoneKind::Wonder,
            title: "Global Welfare Accord",
            description: "A landmark international agreement establishing universal welfare standards.",
            quote: None,
            condition: |s| {
                high_regions(s) >= 5 && average_region_value(&s.map).is_some_and(|avg| avg > 0.65)
            },
            effect: Effect {
                metrics: &[(EnforcementGap, -0.1)],
                regions: &[
                    ("USA", 0.05),
                    ("CAN", 0.05),
                    ("MEX", 0.05),
                    ("GBR", 0.05),
                    ("FRA", 0.05),
                    ("DEU", 0.05),
                    ("IND", 0.05),
                    ("CHN", 0.05),
                    ("BRA", 0.05),
                    ("ZAF", 0.05),
                    ("AUS", 0.05),
                ],
            },
        },
        CatalogueMilestone {
            id: "sentience_recognition_treaty",
            kind: MilestoneKind::Wonder,
            title: "Sentience Recognition Treaty",
            description: "A global treaty formally recognizing animal sentience as a foundation for all welfare policy.",
            quote: None,
            condition: |s| {
                s.metrics.unmeasured.sentience_knowledge_gap < 0.2
                    && s.metrics.measured.welfare_standard_adoption > 1.5
            },
            effect: Effect {
                metrics: &[(SentienceKnowledgeGap, -0.15), (WelfareStandardAdoption, 0.3)],
                regions: &[],
            },
        },
        CatalogueMilestone {
            id: "alternative_protein_revolution",
            kind: MilestoneKind::Wonder,
            title: "Alternative Protein Revolution",
            description: "A breakthrough in alternative protein technologies that reduces reliance on traditional animal agriculture.",
            quote: None,
            condition: |s| {
                s.metrics.unmeasured.welfare_debt < 0.25
                    && s.metrics.measured.production_efficiency > 0.7
                    && s.metrics.measured.cost_per_unit < 0.35
            },
            effect: Effect {
                metrics: &[
                    (WelfareDebt, -0.12),
                    (SystemIrreversibility, -0.1),
                    (ProductionEfficiency, 0.1),
                    (CostPerUnit, -0.05),
                ],
                regions: &[],
            },
        },
        CatalogueMilestone {
            id: "enforcement_network",
            kind: MilestoneKind::Wonder,
            title: "Global Enforcement Network",
            description: "An international network of enforcement agencies working across borders.",
            quote: None,
            condition: |s| {
                s.metrics.unmeasured.enforcement_gap < 0.2
                    && s.metrics.unmeasured.regulatory_capture < 0.25
                    && s.map.active_arcs.len() >= 10
            },
            effect: Effect {
                metrics: &[(EnforcementGap, -0.12), (RegulatoryCapture, -0.08)],
                regions: &[],
            },
        },
        CatalogueMilestone {
            id: "welfare_research_institute",
            kind: MilestoneKind::Wonder,
            title: "International Welfare Research Institute",
            description: "A research institution dedicated to advancing animal welfare science.",
            quote: None,
            condition: |s| {
                s.metrics.unmeasured.sentience_knowledge_gap < 0.2
                    && s.metrics.measured.welfare_standard_adoption > 1.2
                    && decisions_mentioning(s, &["research", "science"], false) >= 4
            },
            effect: Effect {
                metrics: &[(SentienceKnowledgeGap, -0.1), (WelfareStandardAdoption, 0.2)],
                regions: &[],
            },
        },
        CatalogueMilestone {
            id: "transition_fund",
            kind: MilestoneKind::Wonder,
            title: "Global Transition Fund",
            description: "An international fund supporting the transition to higher welfare systems.",
            quote: None,
            condition: |s| {
                s.metrics.measured.cost_per_unit < 0.4
                    && s.metrics.unmeasured.welfare_debt < 0.3
                    && s.metrics.measured.production_efficiency > 0.6
            },
            effect: Effect {
                metrics: &[(CostPerUnit, -0.08), (ProductionEfficiency, 0.05), (WelfareDebt, -0.08)],
                regions: &[],
            },
        },
        // Great people
        CatalogueMilestone {
            id: "the_primatologist",
            kind: MilestoneKind::GreatPerson,
            title: "The Primatologist",
            description: "A researcher whose work on animal cognition reshaped our understanding of sentience.",
            quote: Some("Understanding animal minds is the foundation of ethical governance."),
            condition: |s| {
                const WORDS: [&str; 6] =
                    ["research", "knowledge", "understanding", "study", "science", "sentience"];
                decisions_mentioning(s, &WORDS, true) >= 3
                    && s.metrics.unmeasured.sentience_knowledge_gap < 0.3
            },
            effect: Effect { metrics: &[(SentienceKnowledgeGap, -0.15)], regions: &[] },
        },
        CatalogueMilestone {
            id: "the_welfare_engineer",
            kind: MilestoneKind::GreatPerson,
            title: "The Welfare Engineer",
            description: "An innovator who designs humane systems that balance welfare with production needs.",
            quote: Some("Good design serves both animals and producers."),
            condition: |s| {
                let welfare = s
                    .audit_trail
                    .iter()
                    .filter(|r| {
                        let label = r.chosen_label.to_lowercase();
                        label.contains("welfare") || label.contains("standard")
                    })
                    .count();
                welfare >= 3 && s.metrics.measured.production_efficiency > 0.5
            },
            effect: Effect {
                metrics: &[(WelfareStandardAdoption, 0.2), (ProductionEfficiency, 0.05)],
                regions: &[],
            },
        },
        CatalogueMilestone {
            id: "the_ethicist",
            kind: MilestoneKind::GreatPerson,
            title: "The Ethicist",
            description: "A philosopher who keeps moral questions at the centre of policy.",
            quote: None,
            condition: |s| {
                const WORDS: [&str; 6] = ["ethic", "moral", "right", "wrong", "value", "principle"];
                decisions_mentioning(s, &WORDS, true) >= 3 && s.metrics.unmeasured.welfare_debt < 0.4
            },
            effect: Effect { metrics: &[(WelfareDebt, -0.12)], regions: &[] },
        },
        CatalogueMilestone {
            id: "the_conservationist",
            kind: MilestoneKind::GreatPerson,
            title: "The Conservationist",
            description: "A voice for ecosystems and the wider impacts of agricultural policy.",
            quote: None,
            condition: |s| {
                const WORDS: [&str; 5] =
                    ["ecosystem", "wildlife", "conservation", "biodiversity", "environment"];
                decisions_mentioning(s, &WORDS, true) >= 2
            },
            effect: Effect {
                metrics: &[(WelfareDebt, -0.08), (WelfareStandardAdoption, 0.1)],
                regions: &[],
            },
        },
        CatalogueMilestone {
            id: "the_policy_architect",
            kind: MilestoneKind::GreatPerson,
            title: "The Policy Architect",
            description: "A governance expert who turns policy into enforceable practice.",
            quote: None,
            condition: |s| {
                const WORDS: [&str; 6] =
                    ["enforcement", "regulation", "policy", "governance", "compliance", "oversight"];
                decisions_mentioning(s, &WORDS, true) >= 3
                    && s.metrics.unmeasured.enforcement_gap < 0.3
            },
            effect: Effect {
                metrics: &[(EnforcementGap, -0.12), (RegulatoryCapture, -0.05)],
                regions: &[],
            },
        },
        CatalogueMilestone {
            id: "the_transition_specialist",
            kind: MilestoneKind::GreatPerson,
            title: "The Transition Specialist",
            description: "A practitioner who guides industries through change without locking in debt.",
            quote: None,
            condition: |s| {
                const WORDS: [&str; 5] = ["transition", "alternative", "change", "transform", "adapt"];
                decisions_mentioning(s, &WORDS, true) >= 2
                    && s.metrics.unmeasured.welfare_debt < 0.3
                    && s.metrics.unmeasured.system_irreversibility < 0.4
            },
            effect: Effect {
                metrics: &[(WelfareDebt, -0.1), (SystemIrreversibility, -0.08)],
                regions: &[],
            },
        },
    ];

    entries.into_iter().map(|m| Box::new(m) as Box<dyn Milestone>).collect()
}
