//! Settlement tiers and the spending tables that drive garrison generation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{RandomiserError, Result};

/// Settlement size, ordered from smallest to largest. The position in
/// [`Tier::ALL`] is the tier index used for budget scaling.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Village,
    Town,
    LargeTown,
    City,
    LargeCity,
    HugeCity,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::Village,
        Tier::Town,
        Tier::LargeTown,
        Tier::City,
        Tier::LargeCity,
        Tier::HugeCity,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn label(self) -> &'static str {
        match self {
            Tier::Village => "village",
            Tier::Town => "town",
            Tier::LargeTown => "large_town",
            Tier::City => "city",
            Tier::LargeCity => "large_city",
            Tier::HugeCity => "huge_city",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tier {
    type Err = RandomiserError;

    fn from_str(s: &str) -> Result<Self> {
        Tier::ALL
            .into_iter()
            .find(|tier| tier.label() == s)
            .ok_or_else(|| RandomiserError::UnknownTier(s.to_string()))
    }
}

/// Spending curve for a single tier.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierProfile {
    pub base_budget: u32,
    pub budget_increment: u32,
    /// Per-attempt continuation chance of the rare phase (geometric policy).
    pub rare_probability: f64,
    /// Per-attempt continuation chance of the uncommon phase (geometric policy).
    pub uncommon_probability: f64,
    /// Chance of a general leading the garrison.
    pub general_probability: f64,
    /// Attempt caps for the capped-count policy.
    pub max_rare: u32,
    pub max_uncommon: u32,
}

/// Serialized form of one tier table row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TierEntry {
    pub tier: Tier,
    #[serde(flatten)]
    pub profile: TierProfile,
}

/// One [`TierProfile`] for every [`Tier`], in tier order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TierEntry>", into = "Vec<TierEntry>")]
pub struct TierTable {
    profiles: [TierProfile; 6],
}

fn check_probability(tier: Tier, name: &str, p: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(RandomiserError::Config(format!(
            "{name} for tier {tier} must lie within [0, 1], got {p}"
        )));
    }
    Ok(())
}

impl TierTable {
    /// Build a table from `(tier, profile)` pairs. Every tier must appear
    /// exactly once, probabilities must lie within `[0, 1]` and the budget
    /// may not shrink as the tier grows.
    pub fn new(entries: impl IntoIterator<Item = (Tier, TierProfile)>) -> Result<Self> {
        let mut slots: [Option<TierProfile>; 6] = [None; 6];

        for (tier, profile) in entries {
            let slot = &mut slots[tier.index()];
            if slot.is_some() {
                return Err(RandomiserError::Config(format!(
                    "tier {tier} appears more than once in the tier table"
                )));
            }
            check_probability(tier, "rare_probability", profile.rare_probability)?;
            check_probability(tier, "uncommon_probability", profile.uncommon_probability)?;
            check_probability(tier, "general_probability", profile.general_probability)?;
            *slot = Some(profile);
        }

        let mut profiles = DEFAULT_PROFILES;
        let mut previous_budget: Option<u32> = None;
        for tier in Tier::ALL {
            let profile = slots[tier.index()].ok_or_else(|| {
                RandomiserError::Config(format!("tier {tier} is missing from the tier table"))
            })?;

            let budget = profile
                .budget_increment
                .checked_mul(tier.index() as u32)
                .and_then(|extra| extra.checked_add(profile.base_budget))
                .ok_or_else(|| {
                    RandomiserError::Config(format!("budget for tier {tier} overflows"))
                })?;
            if previous_budget.is_some_and(|prev| budget < prev) {
                return Err(RandomiserError::Config(format!(
                    "budget for tier {tier} ({budget}) is smaller than the previous tier's"
                )));
            }
            previous_budget = Some(budget);
            profiles[tier.index()] = profile;
        }

        Ok(Self { profiles })
    }

    pub fn profile(&self, tier: Tier) -> &TierProfile {
        &self.profiles[tier.index()]
    }

    /// `base_budget + budget_increment * tier_index`.
    pub fn budget(&self, tier: Tier) -> u32 {
        let p = self.profile(tier);
        p.base_budget + p.budget_increment * tier.index() as u32
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tier, &TierProfile)> {
        Tier::ALL.into_iter().zip(self.profiles.iter())
    }
}

impl TryFrom<Vec<TierEntry>> for TierTable {
    type Error = RandomiserError;

    fn try_from(entries: Vec<TierEntry>) -> Result<Self> {
        TierTable::new(entries.into_iter().map(|e| (e.tier, e.profile)))
    }
}

impl From<TierTable> for Vec<TierEntry> {
    fn from(table: TierTable) -> Self {
        table
            .iter()
            .map(|(tier, profile)| TierEntry {
                tier,
                profile: *profile,
            })
            .collect()
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            profiles: DEFAULT_PROFILES,
        }
    }
}

const fn profile(
    rare_probability: f64,
    uncommon_probability: f64,
    general_probability: f64,
    max_rare: u32,
    max_uncommon: u32,
) -> TierProfile {
    TierProfile {
        base_budget: 4,
        budget_increment: 2,
        rare_probability,
        uncommon_probability,
        general_probability,
        max_rare,
        max_uncommon,
    }
}

// village, town, large_town, city, large_city, huge_city
const DEFAULT_PROFILES: [TierProfile; 6] = [
    profile(0.10, 0.40, 0.00, 0, 0),
    profile(0.15, 0.50, 0.05, 0, 1),
    profile(0.25, 0.60, 0.10, 0, 2),
    profile(0.35, 0.65, 0.25, 1, 3),
    profile(0.45, 0.70, 0.50, 2, 4),
    profile(0.55, 0.75, 0.75, 3, 5),
];

/// How the rare and uncommon phases decide whether to keep buying.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhasePolicy {
    /// At most `max_rare` / `max_uncommon` attempts, each passing while a
    /// uniform draw stays below `gate`.
    CappedCount { gate: f64 },
    /// No attempt cap; each attempt passes while a uniform draw stays below
    /// the tier's rare / uncommon probability.
    Geometric,
}

pub const CLASSIC_GATE: f64 = 0.9;

fn default_generals() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GarrisonConfigEntry")]
pub struct GarrisonConfig {
    pub policy: PhasePolicy,
    /// Whether a garrison may be led by a general.
    pub generals: bool,
    pub tiers: TierTable,
}

/// Unvalidated form of a [`GarrisonConfig`] document.
#[derive(Deserialize)]
struct GarrisonConfigEntry {
    policy: PhasePolicy,
    #[serde(default = "default_generals")]
    generals: bool,
    tiers: TierTable,
}

impl TryFrom<GarrisonConfigEntry> for GarrisonConfig {
    type Error = RandomiserError;

    fn try_from(entry: GarrisonConfigEntry) -> Result<Self> {
        GarrisonConfig::new(entry.policy, entry.generals, entry.tiers)
    }
}

impl GarrisonConfig {
    pub fn new(policy: PhasePolicy, generals: bool, tiers: TierTable) -> Result<Self> {
        if let PhasePolicy::CappedCount { gate } = policy {
            if !(0.0..=1.0).contains(&gate) {
                return Err(RandomiserError::Config(format!(
                    "capped-count gate must lie within [0, 1], got {gate}"
                )));
            }
        }
        Ok(Self {
            policy,
            generals,
            tiers,
        })
    }

    /// First-generation tables: capped attempts behind a fixed 0.9 gate and
    /// no generals. The attempt caps keep their original values, so the
    /// average garrison shrinks from large_town to city.
    pub fn classic() -> Self {
        Self {
            policy: PhasePolicy::CappedCount { gate: CLASSIC_GATE },
            generals: false,
            tiers: TierTable::default(),
        }
    }

    pub fn from_json(src: &str) -> Result<Self> {
        Ok(serde_json::from_str(src)?)
    }
}

impl Default for GarrisonConfig {
    fn default() -> Self {
        Self {
            policy: PhasePolicy::Geometric,
            generals: true,
            tiers: TierTable::default(),
        }
    }
}
