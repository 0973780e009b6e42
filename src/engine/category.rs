// src/engine/category.rs

//! Keyword categorisation. Each scheme is a priority-ordered rule table over
//! the lower-cased `"{topic} {prompt}"` text; the first matching rule wins and
//! unmatched questions fall into the scheme's `other` bucket.

use std::fmt::Debug;
use std::hash::Hash;

use serde::Serialize;

use crate::models::question::Question;

const ELASTICITY: &[&str] = &["elasticity", "ped", "pes", "inelastic", "elastic "];

/// A topic-balance scheme.
pub trait Category: Copy + Eq + Hash + Debug + Serialize + 'static {
    /// Rules in priority order.
    const RULES: &'static [(Self, &'static [&'static str])];
    /// Categories visited by the round-robin walk, in order.
    const ROUND_ROBIN: &'static [Self];
    /// Every bucket, in the order leftovers are pooled.
    const BUCKETS: &'static [Self];
    const FALLBACK: Self;

    fn label(self) -> &'static str;

    fn classify(topic: &str, prompt: &str) -> Self {
        let text = format!("{} {}", topic, prompt).to_lowercase();
        Self::RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(Self::FALLBACK)
    }

    fn of(question: &Question) -> Self {
        Self::classify(&question.topic, &question.prompt)
    }
}

/// Scheme used by legacy sets, the generic balanced session and exam-type
/// sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LegacyCategory {
    #[serde(rename = "demand/supply")]
    DemandSupply,
    #[serde(rename = "elasticity")]
    Elasticity,
    #[serde(rename = "intervention")]
    Intervention,
    #[serde(rename = "equilibrium")]
    Equilibrium,
    #[serde(rename = "structure")]
    Structure,
    #[serde(rename = "other")]
    Other,
}

impl Category for LegacyCategory {
    const RULES: &'static [(Self, &'static [&'static str])] = &[
        (LegacyCategory::Elasticity, ELASTICITY),
        (
            LegacyCategory::Intervention,
            &[
                "tax",
                "subsidy",
                "price ceiling",
                "price floor",
                "minimum wage",
                "rent",
                "intervention",
                "regulation",
                "government",
            ],
        ),
        (
            LegacyCategory::Equilibrium,
            &["equilibrium", "surplus", "shortage", "market clearing"],
        ),
        (
            LegacyCategory::Structure,
            &[
                "monopoly",
                "oligopoly",
                "perfect competition",
                "monopolistic",
                "market structure",
                "price taker",
                "price maker",
            ],
        ),
        (
            LegacyCategory::DemandSupply,
            &[
                "demand",
                "supply",
                "substitute",
                "complement",
                "normal good",
                "inferior good",
                "income",
                "preferences",
                "tastes",
                "scarcity",
            ],
        ),
    ];
    const ROUND_ROBIN: &'static [Self] = &[
        LegacyCategory::DemandSupply,
        LegacyCategory::Elasticity,
        LegacyCategory::Intervention,
        LegacyCategory::Equilibrium,
        LegacyCategory::Structure,
    ];
    const BUCKETS: &'static [Self] = &[
        LegacyCategory::DemandSupply,
        LegacyCategory::Elasticity,
        LegacyCategory::Intervention,
        LegacyCategory::Equilibrium,
        LegacyCategory::Structure,
        LegacyCategory::Other,
    ];
    const FALLBACK: Self = LegacyCategory::Other;

    fn label(self) -> &'static str {
        match self {
            LegacyCategory::DemandSupply => "demand/supply",
            LegacyCategory::Elasticity => "elasticity",
            LegacyCategory::Intervention => "intervention",
            LegacyCategory::Equilibrium => "equilibrium",
            LegacyCategory::Structure => "structure",
            LegacyCategory::Other => "other",
        }
    }
}

/// Five-way scheme for the exam 1 multiple-choice paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Exam1Category {
    #[serde(rename = "fundamentals")]
    Fundamentals,
    #[serde(rename = "demand/supply")]
    DemandSupply,
    #[serde(rename = "elasticity")]
    Elasticity,
    #[serde(rename = "equilibrium/signals")]
    EquilibriumSignals,
    #[serde(rename = "other")]
    Other,
}

impl Category for Exam1Category {
    const RULES: &'static [(Self, &'static [&'static str])] = &[
        (Exam1Category::Elasticity, ELASTICITY),
        (
            Exam1Category::EquilibriumSignals,
            &[
                "equilibrium",
                "surplus",
                "shortage",
                "market clearing",
                "signal",
                "information",
                "adverse selection",
                "rationing",
                "incentive",
            ],
        ),
        (
            Exam1Category::DemandSupply,
            &[
                "demand",
                "supply",
                "substitute",
                "complement",
                "normal good",
                "inferior good",
                "income",
                "preferences",
                "tastes",
            ],
        ),
        (
            Exam1Category::Fundamentals,
            &[
                "scarcity",
                "opportunity cost",
                "production possibilit",
                "ppf",
                "economic problem",
                "factors of production",
                "trade-off",
            ],
        ),
    ];
    const ROUND_ROBIN: &'static [Self] = &[
        Exam1Category::Fundamentals,
        Exam1Category::DemandSupply,
        Exam1Category::Elasticity,
        Exam1Category::EquilibriumSignals,
        Exam1Category::Other,
    ];
    const BUCKETS: &'static [Self] = Self::ROUND_ROBIN;
    const FALLBACK: Self = Exam1Category::Other;

    fn label(self) -> &'static str {
        match self {
            Exam1Category::Fundamentals => "fundamentals",
            Exam1Category::DemandSupply => "demand/supply",
            Exam1Category::Elasticity => "elasticity",
            Exam1Category::EquilibriumSignals => "equilibrium/signals",
            Exam1Category::Other => "other",
        }
    }
}

/// Six-way scheme for the first full simulated paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FullSimCategory {
    Fundamentals,
    Demand,
    Supply,
    Elasticity,
    MarketOutcomes,
    Other,
}

impl Category for FullSimCategory {
    const RULES: &'static [(Self, &'static [&'static str])] = &[
        (FullSimCategory::Elasticity, ELASTICITY),
        (
            FullSimCategory::MarketOutcomes,
            &[
                "equilibrium",
                "surplus",
                "shortage",
                "market clearing",
                "tax",
                "subsidy",
                "price ceiling",
                "price floor",
                "minimum wage",
                "government",
            ],
        ),
        (
            FullSimCategory::Supply,
            &["supply", "producer", "cost of production", "technology"],
        ),
        (
            FullSimCategory::Demand,
            &[
                "demand",
                "consumer",
                "substitute",
                "complement",
                "normal good",
                "inferior good",
                "income",
                "tastes",
            ],
        ),
        (
            FullSimCategory::Fundamentals,
            &[
                "scarcity",
                "opportunity cost",
                "production possibilit",
                "ppf",
                "economic problem",
                "factors of production",
                "trade-off",
            ],
        ),
    ];
    const ROUND_ROBIN: &'static [Self] = &[
        FullSimCategory::Fundamentals,
        FullSimCategory::Demand,
        FullSimCategory::Supply,
        FullSimCategory::Elasticity,
        FullSimCategory::MarketOutcomes,
        FullSimCategory::Other,
    ];
    const BUCKETS: &'static [Self] = Self::ROUND_ROBIN;
    const FALLBACK: Self = FullSimCategory::Other;

    fn label(self) -> &'static str {
        match self {
            FullSimCategory::Fundamentals => "fundamentals",
            FullSimCategory::Demand => "demand",
            FullSimCategory::Supply => "supply",
            FullSimCategory::Elasticity => "elasticity",
            FullSimCategory::MarketOutcomes => "market_outcomes",
            FullSimCategory::Other => "other",
        }
    }
}

/// Scheme for the written full simulation, which enforces minimums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FullSim2Category {
    Fundamentals,
    Demand,
    Supply,
    ShiftTrap,
    Other,
}

impl Category for FullSim2Category {
    const RULES: &'static [(Self, &'static [&'static str])] = &[
        (
            FullSim2Category::ShiftTrap,
            &[
                "shift",
                "movement along",
                "change in quantity demanded",
                "change in quantity supplied",
                "extension",
                "contraction",
            ],
        ),
        (
            FullSim2Category::Fundamentals,
            &[
                "scarcity",
                "opportunity cost",
                "production possibilit",
                "ppf",
                "economic problem",
                "factors of production",
                "trade-off",
            ],
        ),
        (
            FullSim2Category::Supply,
            &["supply", "producer", "cost of production"],
        ),
        (
            FullSim2Category::Demand,
            &[
                "demand",
                "consumer",
                "substitute",
                "complement",
                "normal good",
                "inferior good",
                "income",
            ],
        ),
    ];
    const ROUND_ROBIN: &'static [Self] = &[
        FullSim2Category::Fundamentals,
        FullSim2Category::Demand,
        FullSim2Category::Supply,
        FullSim2Category::ShiftTrap,
        FullSim2Category::Other,
    ];
    const BUCKETS: &'static [Self] = Self::ROUND_ROBIN;
    const FALLBACK: Self = FullSim2Category::Other;

    fn label(self) -> &'static str {
        match self {
            FullSim2Category::Fundamentals => "fundamentals",
            FullSim2Category::Demand => "demand",
            FullSim2Category::Supply => "supply",
            FullSim2Category::ShiftTrap => "shift_trap",
            FullSim2Category::Other => "other",
        }
    }
}
