use crate::generator::Garrison;

/// Experience, armour and weapon upgrades given to every generated unit.
const UNIT_SUFFIX: &str = "exp 0 armour 0 weapon_lvl 0";

pub fn format_unit_line(unit: &str) -> String {
    format!("unit\t\t{unit}\t\t{UNIT_SUFFIX}\n")
}

/// Append one unit line per identifier to an existing army block.
pub fn append_units<'a>(block: &mut String, units: impl IntoIterator<Item = &'a str>) {
    if !block.is_empty() && !block.ends_with('\n') {
        block.push('\n');
    }
    for unit in units {
        block.push_str(&format_unit_line(unit));
    }
}

/// A complete `army` record for the garrison, in army order.
pub fn render_army(garrison: &Garrison) -> String {
    let mut block = String::from("army\n");
    append_units(&mut block, garrison.units());
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tier;

    #[test]
    fn renders_units_in_order() {
        let garrison = Garrison {
            tier: Tier::Town,
            budget: 6,
            general: None,
            rares: Vec::new(),
            uncommons: vec!["archers".into()],
            standards: vec!["peasants".into(), "peasants".into()],
        };
        let text = render_army(&garrison);
        assert_eq!(
            text,
            "army\n\
             unit\t\tarchers\t\texp 0 armour 0 weapon_lvl 0\n\
             unit\t\tpeasants\t\texp 0 armour 0 weapon_lvl 0\n\
             unit\t\tpeasants\t\texp 0 armour 0 weapon_lvl 0\n"
        );
    }

    #[test]
    fn appends_after_unterminated_block() {
        let mut block = String::from("army");
        append_units(&mut block, ["hoplites"]);
        assert_eq!(block, "army\nunit\t\thoplites\t\texp 0 armour 0 weapon_lvl 0\n");
    }
}
