//! Canonical keys for style rules.
//!
//! Two rules with the same key are treated as the same rule when deciding
//! whether a theme rule is library code. The key is a pure function of the
//! selector and declarations; source position and comments never reach it.

use crate::style::color::{normalize_hex, normalize_color_function, HEX_LITERAL, RGB_LITERAL};
use crate::style::owned_css::{OwnedDeclaration, OwnedRule};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Separates the selector from the declarations, and declarations from each other.
pub const KEY_DELIMITER: char = '|';

static COMBINATOR_SPACING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*([>+~,])\s*").expect("combinator pattern"));

/// A zero length with a unit, delimited on both sides. Group 1 and 3 are the delimiters.
static ZERO_LENGTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(^|[\s,(/])-?0+(?:\.0+)?(?:px|r?em|%|ex|ch|vw|vh|vmin|vmax|pt|pc|cm|mm|in|q)([\s,)/]|$)",
    )
    .expect("zero length pattern")
});

static CALC_PADDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s+|\s+\)").expect("calc padding pattern"));

/// Normalized selector + declarations of one rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the canonical key of `rule`.
///
/// Declarations are ordered by property name with a stable sort: moving
/// `color` before `margin` does not change the key, but two `color`
/// declarations keep their relative order, because for a repeated property
/// the later one wins (`color: red; color: var(--c)` is a fallback, the
/// reverse is not).
pub fn canonicalize(rule: &OwnedRule) -> CanonicalKey {
    canonicalize_parts(&rule.selector, &rule.declarations)
}

pub fn canonicalize_parts(selector: &str, declarations: &[OwnedDeclaration]) -> CanonicalKey {
    let mut entries: Vec<(String, String)> = declarations
        .iter()
        .map(|decl| {
            let mut value = normalize_value(&decl.value);
            if decl.important {
                value.push_str(" !important");
            }
            (normalize_property(&decl.property), value)
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut key = normalize_selector(selector);
    key.push(KEY_DELIMITER);
    let joined: Vec<String> = entries
        .into_iter()
        .map(|(property, value)| format!("{}:{}", property, value))
        .collect();
    key.push_str(&joined.join(&KEY_DELIMITER.to_string()));
    CanonicalKey(key)
}

/// Trims, collapses whitespace, drops spacing around `>`, `+`, `~` and group
/// commas, and lower-cases.
pub fn normalize_selector(selector: &str) -> String {
    let collapsed = collapse_whitespace(selector);
    COMBINATOR_SPACING
        .replace_all(&collapsed, "$1")
        .to_lowercase()
}

fn normalize_property(property: &str) -> String {
    if property.starts_with("--") {
        property.trim().to_string()
    } else {
        property.trim().to_ascii_lowercase()
    }
}

/// Collapses whitespace, normalizes hex colours, `rgb()`/`rgba()` spacing,
/// `calc()` padding and unit-bearing zeros.
pub fn normalize_value(value: &str) -> String {
    let collapsed = collapse_whitespace(value);
    let hex = HEX_LITERAL.replace_all(&collapsed, |caps: &regex::Captures| normalize_hex(&caps[0]));
    let rgb = RGB_LITERAL.replace_all(&hex, |caps: &regex::Captures| {
        normalize_color_function(&caps[0])
    });
    let calc = normalize_calc(&rgb);
    strip_zero_units(&calc)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes padding just inside the parentheses of every `calc(...)`.
fn normalize_calc(value: &str) -> String {
    let lower = value.to_ascii_lowercase();
    if !lower.contains("calc(") {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut cursor = 0;
    while let Some(found) = lower[cursor..].find("calc(") {
        let open = cursor + found + "calc".len();
        out.push_str(&value[cursor..open]);
        let close = matching_paren(value, open).unwrap_or(value.len() - 1);
        out.push_str(&CALC_PADDING.replace_all(&value[open..=close], |caps: &regex::Captures| {
            caps[0].trim().to_string()
        }));
        cursor = close + 1;
    }
    out.push_str(&value[cursor..]);
    out
}

/// Byte index of the `)` closing the `(` at `open`.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in text[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// `0px`, `0em`, `0%` and friends become `0`. Adjacent zeros share a
/// delimiter, so the replacement runs until the text stops changing.
fn strip_zero_units(value: &str) -> String {
    let mut current = value.to_string();
    loop {
        let next = ZERO_LENGTH.replace_all(&current, "${1}0${2}").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}
