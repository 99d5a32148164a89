//! Reads `$name: value;` definitions from a preprocessor variables file into
//! lookup tables for the substitution pass.

use crate::style::color::{color_key, HEX_LITERAL};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$([A-Za-z0-9_-]+)\s*:\s*([^;]+);").expect("variable assignment pattern")
});

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["'][^"']+["']"#).expect("quoted pattern"));

/// Flags that may trail a value and do not belong to it.
const VALUE_FLAGS: &[&str] = &["!default", "!global"];

/// Colour and font lookups built from a variables file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTable {
    /// Canonical 6-digit hex key to symbolic name (`$brand-blue`).
    colors: HashMap<String, String>,
    /// Font literal to symbolic name, in definition order.
    fonts: Vec<(String, String)>,
}

impl VariableTable {
    /// Parses `source`. Lines that are not assignments are skipped; later
    /// definitions of the same colour or font replace earlier ones.
    pub fn parse(source: &str) -> Self {
        let mut table = VariableTable::default();

        for caps in ASSIGNMENT.captures_iter(source) {
            let name = format!("${}", &caps[1]);
            let value = strip_flags(caps[2].trim());

            if is_hex_color(value) {
                match color_key(value) {
                    Some(key) => {
                        table.colors.insert(key, name);
                    }
                    None => log::debug!("{}: {} is not an opaque colour, skipped", name, value),
                }
            } else if value.contains("sans-serif")
                || value.contains("serif")
                || QUOTED.is_match(value)
            {
                let unquoted = value.replace(['"', '\''], "");
                table.insert_font(unquoted, &name);
                table.insert_font(value.to_string(), &name);
            }
        }

        log::info!(
            "Loaded {} colour mappings and {} font mappings",
            table.colors.len(),
            table.fonts.len()
        );
        table
    }

    fn insert_font(&mut self, literal: String, name: &str) {
        match self.fonts.iter_mut().find(|(existing, _)| *existing == literal) {
            Some(entry) => entry.1 = name.to_string(),
            None => self.fonts.push((literal, name.to_string())),
        }
    }

    /// The symbolic name for any spelling of a colour (`#F00`, `rgb(255,0,0)`, ...).
    pub fn color_name(&self, literal: &str) -> Option<&str> {
        color_key(literal).and_then(|key| self.colors.get(&key).map(String::as_str))
    }

    /// Font literals with their names, longest literal first so that a
    /// quoted family list is replaced before any of its parts.
    pub fn fonts_longest_first(&self) -> Vec<(&str, &str)> {
        let mut fonts: Vec<(&str, &str)> = self
            .fonts
            .iter()
            .map(|(literal, name)| (literal.as_str(), name.as_str()))
            .collect();
        fonts.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        fonts
    }

    pub fn color_count(&self) -> usize {
        self.colors.len()
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty() && self.fonts.is_empty()
    }
}

fn strip_flags(value: &str) -> &str {
    let mut value = value;
    for flag in VALUE_FLAGS {
        if let Some(head) = value.strip_suffix(flag) {
            value = head.trim_end();
        }
    }
    value
}

fn is_hex_color(value: &str) -> bool {
    HEX_LITERAL
        .find(value)
        .map(|m| m.start() == 0 && m.end() == value.len())
        .unwrap_or(false)
}
