use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::{RandomiserError, Result};

/// Eligibility class of a garrison unit.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Rank {
    Standard,
    Uncommon,
    Rare,
    General,
}

impl Rank {
    pub const ALL: [Rank; 4] = [Rank::Standard, Rank::Uncommon, Rank::Rare, Rank::General];

    /// Budget points deducted for one unit of this rank. Generals cost the
    /// same as rares.
    pub const fn cost(self) -> u32 {
        match self {
            Rank::Standard => 1,
            Rank::Uncommon => 2,
            Rank::Rare | Rank::General => 3,
        }
    }

    /// Section header used in template files.
    pub const fn tag(self) -> &'static str {
        match self {
            Rank::Standard => "#STANDARD",
            Rank::Uncommon => "#UNCOMMON",
            Rank::Rare => "#RARE",
            Rank::General => "#GENERAL",
        }
    }

    fn from_tag(tag: &str) -> Option<Rank> {
        Rank::ALL.into_iter().find(|rank| rank.tag() == tag)
    }
}

/// Unit pools for one faction, one ordered list per rank. Repeated entries
/// are kept so that they are drawn more often.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FactionTemplate {
    pub standard: Vec<String>,
    pub uncommon: Vec<String>,
    pub rare: Vec<String>,
    pub general: Vec<String>,
}

impl FactionTemplate {
    pub fn units(&self, rank: Rank) -> &[String] {
        match rank {
            Rank::Standard => &self.standard,
            Rank::Uncommon => &self.uncommon,
            Rank::Rare => &self.rare,
            Rank::General => &self.general,
        }
    }

    fn units_mut(&mut self, rank: Rank) -> &mut Vec<String> {
        match rank {
            Rank::Standard => &mut self.standard,
            Rank::Uncommon => &mut self.uncommon,
            Rank::Rare => &mut self.rare,
            Rank::General => &mut self.general,
        }
    }

    /// Parse a template file body. Every rank section starts with its tag
    /// on a line of its own; sections may appear in any order or be left
    /// out entirely.
    pub fn parse(src: &str) -> std::result::Result<Self, String> {
        let mut template = FactionTemplate::default();
        let mut current: Option<Rank> = None;
        let mut seen: Vec<Rank> = Vec::new();

        for (idx, raw_line) in src.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('#') {
                let rank = Rank::from_tag(line)
                    .ok_or_else(|| format!("unknown rank tag '{line}' on line {line_no}"))?;
                if seen.contains(&rank) {
                    return Err(format!("rank tag '{line}' repeated on line {line_no}"));
                }
                seen.push(rank);
                current = Some(rank);
                continue;
            }

            match current {
                Some(rank) => template.units_mut(rank).push(line.to_string()),
                None => {
                    return Err(format!(
                        "unit '{line}' on line {line_no} appears before any rank tag"
                    ))
                }
            }
        }

        Ok(template)
    }
}

/// Faction name → unit template, loaded once at startup.
#[derive(Clone, Debug, Default)]
pub struct UnitCatalog {
    factions: BTreeMap<String, FactionTemplate>,
}

impl UnitCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.txt` file directly under `dir`. The faction key is the
    /// file name without its extension.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(RandomiserError::Config(format!(
                "Templates directory does not exist: {}",
                dir.display()
            )));
        }

        let mut catalog = UnitCatalog::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                RandomiserError::Config(format!(
                    "could not read templates directory {}: {e}",
                    dir.display()
                ))
            })?;
            let path = entry.path();

            let is_template = entry.file_type().is_file()
                && path.extension().is_some_and(|ext| ext == "txt")
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_template {
                tracing::debug!(path = %path.display(), "skipping non-template file");
                continue;
            }

            let faction = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();

            let src = fs::read_to_string(path)?;
            let template = FactionTemplate::parse(&src).map_err(|msg| {
                RandomiserError::Config(format!("{}: {msg}", path.display()))
            })?;

            catalog.insert(faction, template)?;
        }

        if catalog.is_empty() {
            return Err(RandomiserError::Config(format!(
                "no faction templates found in {}",
                dir.display()
            )));
        }

        tracing::debug!(factions = ?catalog.faction_names().collect::<Vec<_>>(), "catalog loaded");
        Ok(catalog)
    }

    pub fn insert(&mut self, faction: impl Into<String>, template: FactionTemplate) -> Result<()> {
        let faction = faction.into();
        if self.factions.contains_key(&faction) {
            return Err(RandomiserError::Config(format!(
                "duplicate faction template '{faction}'"
            )));
        }
        self.factions.insert(faction, template);
        Ok(())
    }

    pub fn get(&self, faction: &str) -> Result<&FactionTemplate> {
        self.factions
            .get(faction)
            .ok_or_else(|| RandomiserError::UnknownFaction(faction.to_string()))
    }

    pub fn faction_names(&self) -> impl Iterator<Item = &str> {
        self.factions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }
}
