//! Structural comparison of two snapshots of the same stylesheet.
//!
//! The differ proves that a transformation preserved a stylesheet: only hex
//! colour spelling is normalized before comparing, and selectors are matched
//! by their literal text rather than by canonical key.

use crate::error::Result;
use crate::parser::css_reader::parse_stylesheet;
use crate::style::color::normalize_hex_literals;
use crate::style::owned_css::OwnedRule;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Properties whose change can alter what is rendered.
pub const VISUAL_PROPERTIES: &[&str] = &[
    "color",
    "background",
    "background-color",
    "background-image",
    "background-position",
    "background-size",
    "background-repeat",
    "border",
    "border-color",
    "border-width",
    "border-style",
    "border-radius",
    "border-top",
    "border-right",
    "border-bottom",
    "border-left",
    "border-top-color",
    "border-right-color",
    "border-bottom-color",
    "border-left-color",
    "width",
    "height",
    "min-width",
    "max-width",
    "min-height",
    "max-height",
    "margin",
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "padding",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    "font",
    "font-family",
    "font-size",
    "font-weight",
    "font-style",
    "line-height",
    "text-align",
    "text-decoration",
    "text-transform",
    "letter-spacing",
    "word-spacing",
    "display",
    "visibility",
    "opacity",
    "position",
    "top",
    "right",
    "bottom",
    "left",
    "float",
    "clear",
    "z-index",
    "overflow",
    "overflow-x",
    "overflow-y",
    "flex",
    "flex-direction",
    "flex-wrap",
    "justify-content",
    "align-items",
    "align-content",
    "grid",
    "grid-template",
    "grid-gap",
    "gap",
    "transform",
    "transition",
    "animation",
    "box-shadow",
    "text-shadow",
    "outline",
    "cursor",
];

/// The allow-list deciding whether a difference is critical. Custom
/// properties (`--*`) are always critical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalProperties {
    names: BTreeSet<String>,
}

impl Default for CriticalProperties {
    fn default() -> Self {
        CriticalProperties {
            names: VISUAL_PROPERTIES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl CriticalProperties {
    /// The default list plus `extra`.
    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.names
            .extend(extra.into_iter().map(|p| p.as_ref().trim().to_ascii_lowercase()));
        self
    }

    pub fn is_critical(&self, property: &str) -> bool {
        property.starts_with("--") || self.names.contains(&property.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffKind {
    RemovedSelector,
    AddedSelector,
    RemovedProperty,
    AddedProperty,
    ChangedValue,
}

impl DiffKind {
    pub const ALL: [DiffKind; 5] = [
        DiffKind::RemovedSelector,
        DiffKind::AddedSelector,
        DiffKind::RemovedProperty,
        DiffKind::AddedProperty,
        DiffKind::ChangedValue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiffKind::RemovedSelector => "REMOVED_SELECTOR",
            DiffKind::AddedSelector => "ADDED_SELECTOR",
            DiffKind::RemovedProperty => "REMOVED_PROPERTY",
            DiffKind::AddedProperty => "ADDED_PROPERTY",
            DiffKind::ChangedValue => "CHANGED_VALUE",
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub kind: DiffKind,
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    pub critical: bool,
    /// How many blocks the selector had, for selector-level entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<usize>,
}

/// Three-way outcome of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Byte-equal after hex normalization.
    Identical,
    /// Differences exist but none is critical.
    Pass,
    /// At least one critical difference.
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Identical => f.write_str("identical"),
            Verdict::Pass => f.write_str("pass"),
            Verdict::Fail => f.write_str("fail"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub identical: bool,
    pub entries: Vec<DiffEntry>,
    pub before_rules: usize,
    pub after_rules: usize,
}

impl DiffReport {
    fn identical() -> Self {
        DiffReport {
            identical: true,
            entries: Vec::new(),
            before_rules: 0,
            after_rules: 0,
        }
    }

    pub fn critical(&self) -> impl Iterator<Item = &DiffEntry> {
        self.entries.iter().filter(|entry| entry.critical)
    }

    pub fn critical_count(&self) -> usize {
        self.critical().count()
    }

    pub fn verdict(&self) -> Verdict {
        if self.identical {
            Verdict::Identical
        } else if self.critical_count() > 0 {
            Verdict::Fail
        } else {
            Verdict::Pass
        }
    }
}

/// One side of a comparison: a name used in parse errors and the text.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub origin: &'a str,
    pub css: &'a str,
}

/// Compares `before` with `after`.
pub fn diff(
    before: Snapshot<'_>,
    after: Snapshot<'_>,
    critical: &CriticalProperties,
) -> Result<DiffReport> {
    let before_text = normalize_hex_literals(before.css);
    let after_text = normalize_hex_literals(after.css);
    if before_text == after_text {
        log::info!("Stylesheets are identical after hex normalization");
        return Ok(DiffReport::identical());
    }

    log::info!("Parsing stylesheets for a structural comparison");
    let before_sheet = parse_stylesheet(&before_text, before.origin)?;
    let after_sheet = parse_stylesheet(&after_text, after.origin)?;
    let before_rules = before_sheet.rules();
    let after_rules = after_sheet.rules();
    log::info!(
        "{}: {} rules, {}: {} rules",
        before.origin,
        before_rules.len(),
        after.origin,
        after_rules.len()
    );

    let before_groups = SelectorGroups::new(&before_rules);
    let after_groups = SelectorGroups::new(&after_rules);
    let mut entries = Vec::new();

    for (selector, blocks) in before_groups.iter() {
        if after_groups.get(selector).is_none() {
            entries.push(selector_entry(DiffKind::RemovedSelector, selector, blocks.len()));
        }
    }
    for (selector, blocks) in after_groups.iter() {
        if before_groups.get(selector).is_none() {
            entries.push(selector_entry(DiffKind::AddedSelector, selector, blocks.len()));
        }
    }
    for (selector, before_blocks) in before_groups.iter() {
        let Some(after_blocks) = after_groups.get(selector) else {
            continue;
        };
        for idx in 0..before_blocks.len().max(after_blocks.len()) {
            compare_blocks(
                selector,
                before_blocks.get(idx).copied(),
                after_blocks.get(idx).copied(),
                critical,
                &mut entries,
            );
        }
    }

    Ok(DiffReport {
        identical: false,
        entries,
        before_rules: before_rules.len(),
        after_rules: after_rules.len(),
    })
}

fn selector_entry(kind: DiffKind, selector: &str, blocks: usize) -> DiffEntry {
    DiffEntry {
        kind,
        selector: selector.to_string(),
        property: None,
        old_value: None,
        new_value: None,
        critical: true,
        blocks: Some(blocks),
    }
}

/// Compares two blocks of the same selector. A missing block counts as an
/// empty one.
fn compare_blocks(
    selector: &str,
    before: Option<&OwnedRule>,
    after: Option<&OwnedRule>,
    critical: &CriticalProperties,
    entries: &mut Vec<DiffEntry>,
) {
    let before_decls = declaration_map(before);
    let after_decls = declaration_map(after);
    let lookup = |decls: &[(String, String)], property: &str| {
        decls
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.clone())
    };

    for (property, old_value) in &before_decls {
        let entry = |kind, new_value| DiffEntry {
            kind,
            selector: selector.to_string(),
            property: Some(property.clone()),
            old_value: Some(old_value.clone()),
            new_value,
            critical: critical.is_critical(property),
            blocks: None,
        };
        match lookup(&after_decls, property) {
            None => entries.push(entry(DiffKind::RemovedProperty, None)),
            Some(new_value) if new_value != *old_value => {
                entries.push(entry(DiffKind::ChangedValue, Some(new_value)))
            }
            Some(_) => {}
        }
    }

    for (property, new_value) in &after_decls {
        if lookup(&before_decls, property).is_none() {
            entries.push(DiffEntry {
                kind: DiffKind::AddedProperty,
                selector: selector.to_string(),
                property: Some(property.clone()),
                old_value: None,
                new_value: Some(new_value.clone()),
                critical: critical.is_critical(property),
                blocks: None,
            });
        }
    }
}

/// Property to whitespace-collapsed value, ordered by first appearance; a
/// repeated property keeps its first position and its last value.
fn declaration_map(rule: Option<&OwnedRule>) -> Vec<(String, String)> {
    let mut map: Vec<(String, String)> = Vec::new();
    for decl in rule.map(|r| r.declarations.as_slice()).unwrap_or_default() {
        let value = decl.full_value().split_whitespace().collect::<Vec<_>>().join(" ");
        match map.iter_mut().find(|(p, _)| *p == decl.property) {
            Some(slot) => slot.1 = value,
            None => map.push((decl.property.clone(), value)),
        }
    }
    map
}

/// Rules grouped by literal selector text, selectors in first-seen order.
struct SelectorGroups<'a> {
    order: Vec<&'a str>,
    blocks: HashMap<&'a str, Vec<&'a OwnedRule>>,
}

impl<'a> SelectorGroups<'a> {
    fn new(rules: &[&'a OwnedRule]) -> Self {
        let mut order = Vec::new();
        let mut blocks: HashMap<&'a str, Vec<&'a OwnedRule>> = HashMap::new();
        for rule in rules {
            let selector = rule.selector.as_str();
            blocks
                .entry(selector)
                .or_insert_with(|| {
                    order.push(selector);
                    Vec::new()
                })
                .push(*rule);
        }
        SelectorGroups { order, blocks }
    }

    fn get(&self, selector: &str) -> Option<&Vec<&'a OwnedRule>> {
        self.blocks.get(selector)
    }

    fn iter(&self) -> impl Iterator<Item = (&'a str, &Vec<&'a OwnedRule>)> + '_ {
        self.order
            .iter()
            .filter_map(move |selector| self.blocks.get(selector).map(|b| (*selector, b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(before: &str, after: &str) -> DiffReport {
        diff(
            Snapshot {
                origin: "before.css",
                css: before,
            },
            Snapshot {
                origin: "after.css",
                css: after,
            },
            &CriticalProperties::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_hex_spelling_is_identical() {
        let report = run(".a { color: #FFF; }", ".a { color: #ffffff; }");
        assert!(report.identical);
        assert!(report.entries.is_empty());
        assert_eq!(report.verdict(), Verdict::Identical);
    }

    #[test]
    fn test_colour_change_is_critical() {
        let report = run(".a { color: red; }", ".a { color: blue; }");
        assert_eq!(report.verdict(), Verdict::Fail);
        assert_eq!(
            report.entries,
            vec![DiffEntry {
                kind: DiffKind::ChangedValue,
                selector: ".a".to_string(),
                property: Some("color".to_string()),
                old_value: Some("red".to_string()),
                new_value: Some("blue".to_string()),
                critical: true,
                blocks: None,
            }]
        );
    }

    #[test]
    fn test_unlisted_property_is_not_critical() {
        let report = run(
            ".a { -webkit-tap-highlight-color: red; }",
            ".a { -webkit-tap-highlight-color: blue; }",
        );
        assert_eq!(report.verdict(), Verdict::Pass);
        assert_eq!(report.entries.len(), 1);
        assert!(!report.entries[0].critical);
    }

    #[test]
    fn test_custom_property_is_critical() {
        let report = run(":root { --gap: 1rem; }", ":root { --gap: 2rem; }");
        assert_eq!(report.verdict(), Verdict::Fail);
    }

    #[test]
    fn test_formatting_only_is_a_pass() {
        let report = run(".a{color:red}", ".a {\n  color: red;\n}\n");
        assert!(!report.identical);
        assert!(report.entries.is_empty());
        assert_eq!(report.verdict(), Verdict::Pass);
    }

    #[test]
    fn test_value_spacing_is_not_a_change() {
        let report = run(".a { margin: 0  auto; }", ".a { margin: 0 auto; }");
        assert!(report.entries.is_empty());
        assert_eq!(report.verdict(), Verdict::Pass);

        let report = run(
            ".a { box-shadow: 0 0 1px red,\n    0 0 2px blue; }",
            ".a { box-shadow: 0 0 1px red, 0 0 2px blue; }",
        );
        assert!(report.entries.is_empty());
        assert_eq!(report.verdict(), Verdict::Pass);
    }

    #[test]
    fn test_changed_value_is_reported_collapsed() {
        let report = run(".a { margin: 0\n  auto; }", ".a { margin: 1px  auto; }");
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].old_value.as_deref(), Some("0 auto"));
        assert_eq!(report.entries[0].new_value.as_deref(), Some("1px auto"));
    }

    #[test]
    fn test_four_digit_ids_are_not_rewritten() {
        let report = run("#face { color: red; }", "#face { color: blue; }");
        assert_eq!(report.entries[0].selector, "#face");

        let report = run("#CAFE .a { color: #ABC; }", "#cafe .a { color: #aabbcc; }");
        assert_eq!(report.verdict(), Verdict::Identical);
    }

    #[test]
    fn test_selectors_and_properties() {
        let report = run(
            ".a { color: red; } .gone { top: 0; }",
            ".a { color: red; cursor: pointer; zoom: 1; } .new { left: 0; }",
        );
        let kinds: Vec<(DiffKind, &str)> = report
            .entries
            .iter()
            .map(|e| (e.kind, e.selector.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (DiffKind::RemovedSelector, ".gone"),
                (DiffKind::AddedSelector, ".new"),
                (DiffKind::AddedProperty, ".a"),
                (DiffKind::AddedProperty, ".a"),
            ]
        );
        assert_eq!(report.critical_count(), 3);
        assert_eq!(report.before_rules, 2);
        assert_eq!(report.after_rules, 2);
    }

    #[test]
    fn test_extra_blocks_compare_against_nothing() {
        let report = run(
            ".a { color: red; } .a { margin: 0; }",
            ".a { color: red; }",
        );
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].kind, DiffKind::RemovedProperty);
        assert_eq!(report.entries[0].property.as_deref(), Some("margin"));
    }

    #[test]
    fn test_repeated_property_last_value_wins() {
        let report = run(
            ".a { color: red; color: var(--c); }",
            ".a { color: var(--c); }",
        );
        assert!(report.entries.is_empty());
    }

    #[test]
    fn test_extra_critical_properties() {
        let critical = CriticalProperties::default().with_extra(["Clip-Path"]);
        assert!(critical.is_critical("clip-path"));
        assert!(!CriticalProperties::default().is_critical("clip-path"));
        assert_eq!(critical.len(), VISUAL_PROPERTIES.len() + 1);
    }
}
