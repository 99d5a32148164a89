//! Structural patterns that recognise library selectors without an exact
//! rule match (grid utilities, slider internals, vendor pseudo-elements).
//!
//! Every pattern is judged against one member of a selector group. A group
//! is library code only when each member matches some pattern.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ------------------------------
/// 1. Selector pieces
/// ------------------------------

/// An attribute condition like `[data-whatinput='mouse']`; only the name matters here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    pub value: Option<String>,
}

/// One compound selector: `input.search[type=text]::-webkit-search-cancel-button`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeSelector>,
    /// Pseudo-classes and pseudo-elements with their colons, e.g. `::before`.
    pub pseudos: Vec<String>,
}

impl CompoundSelector {
    fn has_class_or_id(&self) -> bool {
        self.id.is_some() || !self.classes.is_empty()
    }
}

/// Splits a selector group on commas that are not inside `()`, `[]` or quotes.
pub fn split_selector_group(selector: &str) -> Vec<String> {
    split_top_level(selector, |ch| ch == ',')
        .into_iter()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Splits one complex selector into its compounds, dropping the combinators.
/// `.a > .b + .c d` gives `[".a", ".b", ".c", "d"]`.
pub fn split_compounds(selector: &str) -> Vec<String> {
    split_top_level(selector, |ch| ch.is_whitespace() || ch == '>' || ch == '+' || ch == '~')
        .into_iter()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn split_top_level<F>(text: &str, is_separator: F) -> Vec<&str>
where
    F: Fn(char) -> bool,
{
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            // `~=` inside brackets never reaches here because depth > 0.
            _ if depth == 0 && is_separator(ch) => {
                parts.push(&text[start..i]);
                start = i + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Parse a compound selector string, e.g. "div.red#header[disabled]:hover::before"
pub fn parse_compound_selector(selector: &str) -> CompoundSelector {
    let mut compound = CompoundSelector::default();
    let mut chars = selector.chars().peekable();
    let mut buffer = String::new();

    // If first char is alphabetic or '*' assume tag.
    if let Some(&ch) = chars.peek() {
        if ch.is_alphabetic() || ch == '*' {
            while let Some(&ch) = chars.peek() {
                if ch == '#' || ch == '.' || ch == '[' || ch == ':' {
                    break;
                }
                buffer.push(ch);
                chars.next();
            }
            if !buffer.is_empty() && buffer != "*" {
                compound.tag = Some(buffer.clone());
            }
            buffer.clear();
        }
    }

    while let Some(ch) = chars.next() {
        match ch {
            '#' | '.' => {
                while let Some(&next) = chars.peek() {
                    if next == '.' || next == '#' || next == '[' || next == ':' {
                        break;
                    }
                    buffer.push(next);
                    chars.next();
                }
                if !buffer.is_empty() {
                    if ch == '#' {
                        compound.id = Some(buffer.clone());
                    } else {
                        compound.classes.push(buffer.clone());
                    }
                }
                buffer.clear();
            }
            '[' => {
                let mut depth = 1;
                for next in chars.by_ref() {
                    match next {
                        '[' => depth += 1,
                        ']' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    buffer.push(next);
                }
                compound.attributes.push(parse_attribute(&buffer));
                buffer.clear();
            }
            ':' => {
                buffer.push(':');
                if chars.peek() == Some(&':') {
                    buffer.push(':');
                    chars.next();
                }
                let mut depth = 0;
                while let Some(&next) = chars.peek() {
                    if depth == 0 && (next == '.' || next == '#' || next == '[' || next == ':') {
                        break;
                    }
                    match next {
                        '(' => depth += 1,
                        ')' => depth -= 1,
                        _ => {}
                    }
                    buffer.push(next);
                    chars.next();
                }
                compound.pseudos.push(buffer.clone());
                buffer.clear();
            }
            _ => {}
        }
    }

    compound
}

/// `data-x='y'` or `data-x^="y"` or `disabled`, without the brackets.
fn parse_attribute(inner: &str) -> AttributeSelector {
    let inner = inner.trim();
    let name_end = inner
        .find(|c: char| matches!(c, '=' | '~' | '|' | '^' | '$' | '*') || c.is_whitespace())
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_string();
    let value = inner[name_end..]
        .find('=')
        .map(|eq| {
            inner[name_end + eq + 1..]
                .trim()
                .trim_matches(|c: char| c == '"' || c == '\'')
                .to_string()
        });
    AttributeSelector { name, value }
}

/// ------------------------------
/// 2. Patterns
/// ------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Pattern {
    /// A class of the leading compound starts with `prefix` (`slick-`).
    ClassPrefix { prefix: String },
    /// A class of the leading compound is `prefix`, an optional `[a-z-]`
    /// infix, then digits: `small-6`, `medium-offset-2`, `large-up-3`.
    NumericSuffix { prefix: String },
    /// A member with no class or id whose last compound has a pseudo starting
    /// with `prefix` after its colons: `input::-webkit-search-decoration`.
    PseudoElement { prefix: String },
    /// The leading compound has an attribute selector named `name`.
    Attribute { name: String },
    /// The leading compound carries exactly this class or id (`.cell`, `#x`).
    Root { selector: String },
}

impl Pattern {
    /// Does this pattern recognise `member` (one selector of a group)?
    pub fn matches(&self, member: &str) -> bool {
        let member = member.trim().to_lowercase();
        let compounds = split_compounds(&member);
        let Some(leading) = compounds.first().map(|c| parse_compound_selector(c)) else {
            return false;
        };

        match self {
            Pattern::ClassPrefix { prefix } => leading
                .classes
                .iter()
                .any(|class| class.starts_with(prefix.as_str())),
            Pattern::NumericSuffix { prefix } => leading
                .classes
                .iter()
                .any(|class| is_numeric_utility(class, prefix)),
            Pattern::PseudoElement { prefix } => {
                let parsed: Vec<CompoundSelector> =
                    compounds.iter().map(|c| parse_compound_selector(c)).collect();
                if parsed.iter().any(CompoundSelector::has_class_or_id) {
                    return false;
                }
                parsed.last().is_some_and(|last| {
                    last.pseudos
                        .iter()
                        .any(|pseudo| pseudo.trim_start_matches(':').starts_with(prefix.as_str()))
                })
            }
            Pattern::Attribute { name } => leading.attributes.iter().any(|attr| attr.name == *name),
            Pattern::Root { selector } => {
                if let Some(class) = selector.strip_prefix('.') {
                    leading.classes.iter().any(|c| c == class)
                } else if let Some(id) = selector.strip_prefix('#') {
                    leading.id.as_deref() == Some(id)
                } else {
                    leading.tag.as_deref() == Some(selector.as_str())
                }
            }
        }
    }
}

fn is_numeric_utility(class: &str, prefix: &str) -> bool {
    let Some(rest) = class.strip_prefix(prefix) else {
        return false;
    };
    let digits_start = rest
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(rest.len());
    let (infix, digits) = rest.split_at(digits_start);
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && infix.chars().all(|c| c.is_ascii_lowercase() || c == '-')
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::ClassPrefix { prefix } => write!(f, "class-prefix .{}*", prefix),
            Pattern::NumericSuffix { prefix } => write!(f, "numeric-suffix .{}N", prefix),
            Pattern::PseudoElement { prefix } => write!(f, "pseudo-element ::{}*", prefix),
            Pattern::Attribute { name } => write!(f, "attribute [{}]", name),
            Pattern::Root { selector } => write!(f, "root {}", selector),
        }
    }
}

/// An ordered list of patterns, read-only for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternTable {
    patterns: Vec<Pattern>,
}

impl PatternTable {
    pub fn new(patterns: Vec<Pattern>) -> Self {
        PatternTable { patterns }
    }

    /// A table that recognises nothing.
    pub fn empty() -> Self {
        PatternTable::new(Vec::new())
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// First pattern (in table order) recognising `member`.
    pub fn match_member(&self, member: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|pattern| pattern.matches(member))
    }

    /// The pattern that made a whole group library code: `Some` only if every
    /// member of the group is recognised. The first member's pattern is reported.
    pub fn match_group(&self, selector: &str) -> Option<&Pattern> {
        let members = split_selector_group(selector);
        let mut first = None;
        for member in &members {
            let pattern = self.match_member(member)?;
            first.get_or_insert(pattern);
        }
        first
    }
}

impl Default for PatternTable {
    /// Grid and utility classes, slider internals and vendor pseudo-elements.
    fn default() -> Self {
        let class_prefix = |p: &str| Pattern::ClassPrefix {
            prefix: p.to_string(),
        };
        let numeric = |p: &str| Pattern::NumericSuffix {
            prefix: p.to_string(),
        };
        let pseudo = |p: &str| Pattern::PseudoElement {
            prefix: p.to_string(),
        };

        PatternTable::new(vec![
            class_prefix("grid-"),
            Pattern::Root {
                selector: ".cell".to_string(),
            },
            numeric("small-"),
            numeric("medium-"),
            numeric("large-"),
            numeric("xlarge-"),
            numeric("xxlarge-"),
            class_prefix("slick-"),
            class_prefix("tabs__"),
            pseudo("-webkit-"),
            pseudo("-moz-"),
            pseudo("-ms-"),
            Pattern::Attribute {
                name: "data-whatinput".to_string(),
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_prefix(p: &str) -> Pattern {
        Pattern::ClassPrefix {
            prefix: p.to_string(),
        }
    }

    #[test]
    fn test_parse_compound_selector() {
        let compound = parse_compound_selector("input.search#q[type='text']:not(.a):hover::-moz-focus-inner");
        assert_eq!(compound.tag.as_deref(), Some("input"));
        assert_eq!(compound.id.as_deref(), Some("q"));
        assert_eq!(compound.classes, vec!["search".to_string()]);
        assert_eq!(compound.attributes[0].name, "type");
        assert_eq!(compound.attributes[0].value.as_deref(), Some("text"));
        assert_eq!(
            compound.pseudos,
            vec![
                ":not(.a)".to_string(),
                ":hover".to_string(),
                "::-moz-focus-inner".to_string()
            ]
        );
    }

    #[test]
    fn test_group_and_compound_splitting() {
        assert_eq!(
            split_selector_group(".a:not(.b, .c), .d[title='x,y']"),
            vec![".a:not(.b, .c)".to_string(), ".d[title='x,y']".to_string()]
        );
        assert_eq!(
            split_compounds(".a > .b+.c  d[class~=x]"),
            vec![".a", ".b", ".c", "d[class~=x]"]
        );
    }

    #[test]
    fn test_class_prefix_looks_at_leading_compound() {
        let pattern = class_prefix("slick-");
        assert!(pattern.matches(".slick-slider .slick-list"));
        assert!(pattern.matches(".slick-track:after"));
        assert!(!pattern.matches(".site-carousel .slick-list"));
    }

    #[test]
    fn test_numeric_suffix() {
        let pattern = Pattern::NumericSuffix {
            prefix: "medium-".to_string(),
        };
        assert!(pattern.matches(".medium-6"));
        assert!(pattern.matches(".medium-offset-2"));
        assert!(pattern.matches(".medium-up-3 > .cell"));
        assert!(!pattern.matches(".grid-x > .medium-6"));
        assert!(!pattern.matches(".medium-6-wide"));
        assert!(!pattern.matches(".medium-text"));
    }

    #[test]
    fn test_pseudo_element_requires_bare_selector() {
        let pattern = Pattern::PseudoElement {
            prefix: "-webkit-".to_string(),
        };
        assert!(pattern.matches("[type=search]::-webkit-search-cancel-button"));
        assert!(pattern.matches("::-webkit-input-placeholder"));
        assert!(!pattern.matches(".site-search input::-webkit-input-placeholder"));
    }

    #[test]
    fn test_attribute_and_root() {
        let attribute = Pattern::Attribute {
            name: "data-whatinput".to_string(),
        };
        assert!(attribute.matches("[data-whatinput='mouse'] button"));
        assert!(!attribute.matches(".site-nav [data-whatinput]"));

        let root = Pattern::Root {
            selector: ".cell".to_string(),
        };
        assert!(root.matches(".cell.auto"));
        assert!(!root.matches(".cellar"));
    }

    #[test]
    fn test_group_requires_every_member() {
        let table = PatternTable::new(vec![class_prefix("known-lib")]);
        assert!(table.match_group(".known-lib, .custom-widget").is_none());
        assert_eq!(
            table.match_group(".known-lib, .known-lib-item > a"),
            Some(&class_prefix("known-lib"))
        );
    }

    #[test]
    fn test_group_members_may_match_different_patterns() {
        let table = PatternTable::default();
        assert!(table
            .match_group(".slick-list, .grid-x, .small-12, input::-moz-focus-inner")
            .is_some());
        assert!(PatternTable::empty().match_group(".slick-list").is_none());
    }
}
