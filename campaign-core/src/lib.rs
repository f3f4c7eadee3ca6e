use rand::{rngs::StdRng, SeedableRng};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

pub mod army;
pub mod catalog;
pub mod config;
pub mod generator;
pub mod strat;

pub use catalog::{FactionTemplate, Rank, UnitCatalog};
pub use config::{GarrisonConfig, PhasePolicy, Tier, TierProfile, TierTable};
pub use generator::{Garrison, GarrisonGenerator};

/// Faction that owns every ownerless settlement in a campaign script.
pub const DEFAULT_REBEL_FACTION: &str = "slave";

#[derive(Debug, Clone)]
pub struct RandomiserSettings {
    pub seed: u64,
    pub templates_path: PathBuf,
    pub tiers_path: Option<PathBuf>,
    pub strat_path: Option<PathBuf>,
    pub rebel_faction: String,
    /// Catalog key used for the rebel settlements; falls back to
    /// `rebel_faction` when unset.
    pub template_faction: Option<String>,
    pub requests: Vec<GarrisonRequest>,
    pub classic: bool,
}

/// A single explicit `faction:tier` garrison request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GarrisonRequest {
    pub faction: String,
    pub tier: String,
}

impl std::str::FromStr for GarrisonRequest {
    type Err = RandomiserError;

    fn from_str(s: &str) -> Result<Self> {
        let (faction, tier) = s.split_once(':').ok_or_else(|| {
            RandomiserError::Config(format!(
                "garrison request '{s}' is not of the form FACTION:TIER"
            ))
        })?;
        let faction = faction.trim();
        let tier = tier.trim();
        if faction.is_empty() || tier.is_empty() {
            return Err(RandomiserError::Config(format!(
                "garrison request '{s}' is missing a faction or tier"
            )));
        }
        Ok(Self {
            faction: faction.to_string(),
            tier: tier.to_string(),
        })
    }
}

#[derive(Debug, Error)]
pub enum RandomiserError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unknown faction: {0}")]
    UnknownFaction(String),
    #[error("unknown settlement tier: {0}")]
    UnknownTier(String),
}

pub type Result<T> = std::result::Result<T, RandomiserError>;

fn load_config(settings: &RandomiserSettings) -> Result<GarrisonConfig> {
    match &settings.tiers_path {
        Some(path) => {
            if !path.exists() {
                return Err(RandomiserError::Config(format!(
                    "Tier table does not exist: {}",
                    path.display()
                )));
            }
            GarrisonConfig::from_json(&fs::read_to_string(path)?)
        }
        None if settings.classic => Ok(GarrisonConfig::classic()),
        None => Ok(GarrisonConfig::default()),
    }
}

/// Loads the templates, then generates and renders one army record per
/// explicit request followed by one per rebel-held settlement in the
/// campaign script.
pub fn run(settings: RandomiserSettings) -> Result<String> {
    if !settings.templates_path.exists() {
        return Err(RandomiserError::Config(format!(
            "Templates path does not exist: {}",
            settings.templates_path.display()
        )));
    }

    let catalog = UnitCatalog::load(&settings.templates_path)?;
    let config = load_config(&settings)?;
    tracing::info!(
        factions = catalog.len(),
        policy = ?config.policy,
        generals = config.generals,
        "loaded garrison templates"
    );

    let generator = GarrisonGenerator::new(catalog, config);
    let mut rng = StdRng::seed_from_u64(settings.seed);

    let mut out = format!("; campaign randomiser seed: {}\n", settings.seed);
    let mut generated = 0usize;

    for request in &settings.requests {
        let garrison = generator.generate(&request.faction, &request.tier, &mut rng)?;
        out.push_str(&format!("; {} {}\n", request.faction, request.tier));
        out.push_str(&army::render_army(&garrison));
        out.push('\n');
        generated += 1;
    }

    if let Some(strat_path) = &settings.strat_path {
        let text = fs::read_to_string(strat_path)?;
        let sections = strat::split_factions(&text);
        let rebels = sections
            .factions
            .iter()
            .find(|block| {
                strat::faction_name(block).is_some_and(|name| name == settings.rebel_faction)
            })
            .ok_or_else(|| {
                RandomiserError::Config(format!(
                    "faction '{}' not found in {}",
                    settings.rebel_faction,
                    strat_path.display()
                ))
            })?;

        let template_faction = settings
            .template_faction
            .as_deref()
            .unwrap_or(&settings.rebel_faction);

        for settlement in strat::settlements(rebels)? {
            let garrison = generator.generate(template_faction, &settlement.tier, &mut rng)?;
            out.push_str(&format!("; {} {}\n", settlement.region, settlement.tier));
            out.push_str(&army::render_army(&garrison));
            out.push('\n');
            generated += 1;
        }
    }

    tracing::info!(seed = settings.seed, garrisons = generated, "generation finished");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_garrison_request() {
        let req: GarrisonRequest = "greek_cities:large_town".parse().unwrap();
        assert_eq!(req.faction, "greek_cities");
        assert_eq!(req.tier, "large_town");
    }

    #[test]
    fn rejects_request_without_separator() {
        let err = "greek_cities".parse::<GarrisonRequest>().unwrap_err();
        assert!(matches!(err, RandomiserError::Config(_)));

        let err = "greek_cities:".parse::<GarrisonRequest>().unwrap_err();
        assert!(matches!(err, RandomiserError::Config(_)));
    }

    #[test]
    fn run_rejects_missing_templates_path() {
        let settings = RandomiserSettings {
            seed: 1,
            templates_path: PathBuf::from("/definitely/not/a/templates/dir"),
            tiers_path: None,
            strat_path: None,
            rebel_faction: DEFAULT_REBEL_FACTION.to_string(),
            template_faction: None,
            requests: Vec::new(),
            classic: false,
        };
        assert!(matches!(run(settings), Err(RandomiserError::Config(_))));
    }
}
