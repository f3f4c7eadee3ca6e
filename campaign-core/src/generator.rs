//! Points-based garrison generation for ownerless settlements.
//!
//! A garrison is bought out of a budget that grows with the settlement tier.
//! Purchases happen in a fixed order: an optional general, then rares, then
//! uncommons, and whatever budget is left goes on standard units.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::{FactionTemplate, Rank, UnitCatalog};
use crate::config::{GarrisonConfig, PhasePolicy, Tier, TierProfile};
use crate::Result;

/// Units generated for one settlement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Garrison {
    pub tier: Tier,
    /// Budget the garrison was bought from.
    pub budget: u32,
    pub general: Option<String>,
    pub rares: Vec<String>,
    pub uncommons: Vec<String>,
    pub standards: Vec<String>,
}

impl Garrison {
    /// Units in army order: general, rares, uncommons, standards.
    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.general
            .iter()
            .chain(&self.rares)
            .chain(&self.uncommons)
            .chain(&self.standards)
            .map(String::as_str)
    }

    pub fn into_units(self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.general);
        out.extend(self.rares);
        out.extend(self.uncommons);
        out.extend(self.standards);
        out
    }

    /// Points spent on this garrison.
    pub fn cost(&self) -> u32 {
        u32::from(self.general.is_some()) * Rank::General.cost()
            + self.rares.len() as u32 * Rank::Rare.cost()
            + self.uncommons.len() as u32 * Rank::Uncommon.cost()
            + self.standards.len() as u32 * Rank::Standard.cost()
    }

    pub fn len(&self) -> usize {
        usize::from(self.general.is_some())
            + self.rares.len()
            + self.uncommons.len()
            + self.standards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct GarrisonGenerator {
    catalog: UnitCatalog,
    config: GarrisonConfig,
}

impl GarrisonGenerator {
    pub fn new(catalog: UnitCatalog, config: GarrisonConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &GarrisonConfig {
        &self.config
    }

    /// Generate a garrison for `faction` at the settlement tier named by
    /// `tier`. Fails with `UnknownFaction` / `UnknownTier` on a bad key.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        faction: &str,
        tier: &str,
        rng: &mut R,
    ) -> Result<Garrison> {
        let template = self.catalog.get(faction)?;
        let tier: Tier = tier.parse()?;
        let garrison = self.generate_from(template, tier, rng);

        tracing::debug!(
            faction,
            %tier,
            budget = garrison.budget,
            cost = garrison.cost(),
            units = garrison.len(),
            "generated garrison"
        );
        Ok(garrison)
    }

    pub fn generate_for_tier<R: Rng + ?Sized>(
        &self,
        faction: &str,
        tier: Tier,
        rng: &mut R,
    ) -> Result<Garrison> {
        let template = self.catalog.get(faction)?;
        Ok(self.generate_from(template, tier, rng))
    }

    fn generate_from<R: Rng + ?Sized>(
        &self,
        template: &FactionTemplate,
        tier: Tier,
        rng: &mut R,
    ) -> Garrison {
        let profile = self.config.tiers.profile(tier);
        let budget = self.config.tiers.budget(tier);
        let mut points = budget;

        let general = if self.config.generals {
            draw_general(template, profile, &mut points, rng)
        } else {
            None
        };

        let rares = self.buy_phase(
            template.units(Rank::Rare),
            Rank::Rare,
            profile.max_rare,
            profile.rare_probability,
            &mut points,
            rng,
        );
        let uncommons = self.buy_phase(
            template.units(Rank::Uncommon),
            Rank::Uncommon,
            profile.max_uncommon,
            profile.uncommon_probability,
            &mut points,
            rng,
        );

        // Standards cost one point each, so the rest of the budget buys
        // exactly `points` of them.
        let pool = template.units(Rank::Standard);
        let mut standards = Vec::new();
        if !pool.is_empty() {
            standards.reserve(points as usize);
            for _ in 0..points {
                if let Some(unit) = pool.choose(rng) {
                    standards.push(unit.clone());
                }
            }
            points = 0;
        }
        standards.sort();

        tracing::trace!(remaining = points, "garrison budget left over");

        Garrison {
            tier,
            budget,
            general,
            rares,
            uncommons,
            standards,
        }
    }

    /// Shared loop for the rare and uncommon phases. Stops at the first
    /// failed gate or as soon as the budget no longer covers one unit. An
    /// empty pool skips the phase without touching the rng.
    fn buy_phase<R: Rng + ?Sized>(
        &self,
        pool: &[String],
        rank: Rank,
        max_count: u32,
        probability: f64,
        points: &mut u32,
        rng: &mut R,
    ) -> Vec<String> {
        let mut bought = Vec::new();
        if pool.is_empty() {
            return bought;
        }

        let cost = rank.cost();
        match self.config.policy {
            PhasePolicy::CappedCount { gate } => {
                for _ in 0..max_count {
                    if !try_buy(pool, cost, gate, points, &mut bought, rng) {
                        break;
                    }
                }
            }
            PhasePolicy::Geometric => {
                while try_buy(pool, cost, probability, points, &mut bought, rng) {}
            }
        }

        bought.sort();
        bought
    }
}

/// One purchase attempt: the gate draw comes first, then the budget check.
fn try_buy<R: Rng + ?Sized>(
    pool: &[String],
    cost: u32,
    threshold: f64,
    points: &mut u32,
    bought: &mut Vec<String>,
    rng: &mut R,
) -> bool {
    if rng.gen::<f64>() >= threshold || *points < cost {
        return false;
    }
    match pool.choose(rng) {
        Some(unit) => {
            bought.push(unit.clone());
            *points -= cost;
            true
        }
        None => false,
    }
}

fn draw_general<R: Rng + ?Sized>(
    template: &FactionTemplate,
    profile: &TierProfile,
    points: &mut u32,
    rng: &mut R,
) -> Option<String> {
    let pool = template.units(Rank::General);
    if pool.is_empty() || *points < Rank::General.cost() {
        return None;
    }
    if rng.gen::<f64>() >= profile.general_probability {
        return None;
    }
    let unit = pool.choose(rng)?.clone();
    *points -= Rank::General.cost();
    Some(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TierTable;
    use crate::RandomiserError;
    use rand::{rngs::StdRng, SeedableRng};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn rebels() -> FactionTemplate {
        FactionTemplate {
            standard: names(&["peasant", "peasant", "militia"]),
            uncommon: names(&["spearman"]),
            rare: names(&["knight"]),
            general: names(&["captain"]),
        }
    }

    fn generator_with(template: FactionTemplate, config: GarrisonConfig) -> GarrisonGenerator {
        let mut catalog = UnitCatalog::new();
        catalog.insert("rebels", template).unwrap();
        GarrisonGenerator::new(catalog, config)
    }

    fn city_scenario_config() -> GarrisonConfig {
        let tiers = TierTable::new(Tier::ALL.into_iter().map(|tier| {
            let (max_rare, max_uncommon) = match tier {
                Tier::City => (1, 1),
                _ => (0, 0),
            };
            (
                tier,
                TierProfile {
                    base_budget: 5,
                    budget_increment: 3,
                    rare_probability: 0.5,
                    uncommon_probability: 0.5,
                    general_probability: 0.0,
                    max_rare,
                    max_uncommon,
                },
            )
        }))
        .unwrap();
        GarrisonConfig::new(PhasePolicy::CappedCount { gate: 0.9 }, false, tiers).unwrap()
    }

    #[test]
    fn city_scenario_respects_caps_and_budget() {
        let generator = generator_with(rebels(), city_scenario_config());
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let g = generator.generate("rebels", "city", &mut rng).unwrap();
            assert_eq!(g.budget, 14);
            assert!(g.general.is_none());
            assert!(g.rares.len() <= 1);
            assert!(g.uncommons.len() <= 1);
            assert!(g.rares.iter().all(|u| u == "knight"));
            assert!(g.uncommons.iter().all(|u| u == "spearman"));
            assert!(g.standards.iter().all(|u| u == "peasant" || u == "militia"));
            // A non-empty standard pool soaks up the remainder exactly.
            assert_eq!(g.cost(), 14);
        }
    }

    #[test]
    fn unknown_faction_and_tier_are_errors() {
        let generator = generator_with(rebels(), GarrisonConfig::default());
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            generator.generate("romans", "city", &mut rng),
            Err(RandomiserError::UnknownFaction(_))
        ));
        assert!(matches!(
            generator.generate("rebels", "fortress", &mut rng),
            Err(RandomiserError::UnknownTier(_))
        ));
    }

    #[test]
    fn same_seed_same_garrison() {
        let generator = generator_with(rebels(), GarrisonConfig::default());
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            Tier::ALL
                .iter()
                .map(|tier| generator.generate_for_tier("rebels", *tier, &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn classic_village_never_has_rares_or_uncommons() {
        let generator = generator_with(rebels(), GarrisonConfig::classic());
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let g = generator.generate("rebels", "village", &mut rng).unwrap();
            assert!(g.rares.is_empty());
            assert!(g.uncommons.is_empty());
            assert!(g.general.is_none());
            assert_eq!(g.standards.len(), 4);
        }
    }

    #[test]
    fn geometric_village_can_still_roll_a_rare() {
        let generator = generator_with(rebels(), GarrisonConfig::default());
        let mut rng = StdRng::seed_from_u64(3);
        let rolled = (0..500)
            .map(|_| generator.generate("rebels", "village", &mut rng).unwrap())
            .filter(|g| !g.rares.is_empty())
            .count();
        assert!(rolled > 0);
        assert!(rolled < 500);
    }

    #[test]
    fn empty_rank_lists_are_skipped() {
        let template = FactionTemplate {
            standard: names(&["levy"]),
            ..FactionTemplate::default()
        };
        let generator = generator_with(template, GarrisonConfig::default());

        let mut rng = StdRng::seed_from_u64(11);
        let g = generator.generate("rebels", "huge_city", &mut rng).unwrap();
        assert!(g.general.is_none());
        assert!(g.rares.is_empty());
        assert!(g.uncommons.is_empty());
        assert_eq!(g.standards, vec!["levy".to_string(); 14]);
    }

    #[test]
    fn empty_template_yields_empty_garrison() {
        let generator = generator_with(FactionTemplate::default(), GarrisonConfig::default());
        let mut rng = StdRng::seed_from_u64(5);
        let g = generator.generate("rebels", "city", &mut rng).unwrap();
        assert!(g.is_empty());
        assert_eq!(g.cost(), 0);
        assert_eq!(g.budget, 10);
    }

    #[test]
    fn certain_rares_spend_the_whole_budget_on_rares() {
        let defaults = TierTable::default();
        let profiles = defaults.iter().map(|(tier, p)| {
            let mut p = *p;
            p.rare_probability = 1.0;
            p.uncommon_probability = 0.0;
            p.general_probability = 1.0;
            (tier, p)
        });
        let tiers = TierTable::new(profiles).unwrap();
        let config = GarrisonConfig::new(PhasePolicy::Geometric, true, tiers).unwrap();
        let generator = generator_with(rebels(), config);
        let mut rng = StdRng::seed_from_u64(9);

        // huge_city: 14 points, general 3, then rares while at least 3 remain.
        let g = generator.generate("rebels", "huge_city", &mut rng).unwrap();
        assert_eq!(g.general.as_deref(), Some("captain"));
        assert_eq!(g.rares.len(), 3);
        assert!(g.uncommons.is_empty());
        assert_eq!(g.standards.len(), 2);
        assert_eq!(g.cost(), 14);
    }

    #[test]
    fn units_are_in_army_order() {
        let g = Garrison {
            tier: Tier::City,
            budget: 12,
            general: Some("captain".into()),
            rares: names(&["knight"]),
            uncommons: names(&["archer", "spearman"]),
            standards: names(&["militia", "peasant"]),
        };
        let units: Vec<&str> = g.units().collect();
        assert_eq!(units, vec!["captain", "knight", "archer", "spearman", "militia", "peasant"]);
        assert_eq!(g.cost(), 12);
        assert_eq!(g.clone().into_units().len(), 6);
    }
}
