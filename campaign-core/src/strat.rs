//! Pulls the garrison inputs (faction names, settlement regions and tiers)
//! out of a campaign start script. Only the handful of keys the generator
//! needs are read; everything else in the script is left alone.

use crate::{RandomiserError, Result};

/// A campaign script cut into its three top-level parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratSections<'a> {
    /// Campaign settings before the first faction.
    pub preamble: &'a str,
    /// One block per faction, each starting at its `faction` line.
    pub factions: Vec<&'a str>,
    /// Attitudes and relationships after the last faction.
    pub diplomacy: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementEntry {
    pub region: String,
    pub tier: String,
}

fn strip_comment(line: &str) -> &str {
    line.split(';').next().unwrap_or("").trim()
}

fn keyword_rest<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Track brace depth across one line; `opened` is set on the first `{`.
fn count_braces(line: &str, depth: &mut usize, opened: &mut bool) -> Result<()> {
    for ch in line.chars() {
        match ch {
            '{' => {
                *depth += 1;
                *opened = true;
            }
            '}' => {
                *depth = depth.checked_sub(1).ok_or_else(|| {
                    RandomiserError::Config("unbalanced '}' in settlement block".to_string())
                })?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn is_diplomacy_line(line: &str) -> bool {
    keyword_rest(line, "core_attitudes").is_some()
        || keyword_rest(line, "faction_relationships").is_some()
}

pub fn split_factions(text: &str) -> StratSections<'_> {
    let mut first_faction: Option<usize> = None;
    let mut starts: Vec<usize> = Vec::new();
    let mut diplomacy_start = text.len();

    let mut offset = 0usize;
    for raw_line in text.split_inclusive('\n') {
        let line = strip_comment(raw_line);
        if is_diplomacy_line(line) {
            diplomacy_start = offset;
            break;
        }
        if keyword_rest(line, "faction").is_some() {
            first_faction.get_or_insert(offset);
            starts.push(offset);
        }
        offset += raw_line.len();
    }

    let preamble_end = first_faction.unwrap_or(diplomacy_start);
    let mut factions = Vec::with_capacity(starts.len());
    for (idx, &start) in starts.iter().enumerate() {
        let end = starts.get(idx + 1).copied().unwrap_or(diplomacy_start);
        factions.push(&text[start..end]);
    }

    StratSections {
        preamble: &text[..preamble_end],
        factions,
        diplomacy: &text[diplomacy_start..],
    }
}

/// Internal name of the faction a block belongs to, e.g. `slave` for
/// `faction slave, balanced smith`.
pub fn faction_name(block: &str) -> Option<&str> {
    block.lines().map(strip_comment).find_map(|line| {
        let rest = keyword_rest(line, "faction")?;
        let name = rest.split(',').next()?.trim();
        (!name.is_empty()).then_some(name)
    })
}

/// Region and tier of every settlement in a faction block. Only keys at
/// the top level of a settlement block are read, so `level` lines inside
/// nested building blocks are ignored.
pub fn settlements(block: &str) -> Result<Vec<SettlementEntry>> {
    let mut out = Vec::new();
    let mut lines = block.lines().map(strip_comment);

    while let Some(line) = lines.next() {
        let Some(header_rest) = keyword_rest(line, "settlement") else {
            continue;
        };

        let mut depth = 0usize;
        let mut opened = false;
        let mut level: Option<&str> = None;
        let mut region: Option<&str> = None;

        // The opening brace may share the header line: `settlement {`.
        count_braces(header_rest, &mut depth, &mut opened)?;
        let mut closed = opened && depth == 0;

        for line in lines.by_ref() {
            if closed {
                break;
            }

            if depth == 1 {
                let mut parts = line.split_whitespace();
                match parts.next() {
                    Some("level") => level = parts.next(),
                    Some("region") => region = parts.next(),
                    _ => {}
                }
            }

            count_braces(line, &mut depth, &mut opened)?;
            closed = opened && depth == 0;
        }

        if !closed {
            return Err(RandomiserError::Config(
                "settlement block is not terminated".to_string(),
            ));
        }

        let region = region.ok_or_else(|| {
            RandomiserError::Config("settlement block has no region".to_string())
        })?;
        let tier = level.ok_or_else(|| {
            RandomiserError::Config(format!("settlement in region {region} has no level"))
        })?;

        out.push(SettlementEntry {
            region: region.to_string(),
            tier: tier.to_string(),
        });
    }

    Ok(out)
}
