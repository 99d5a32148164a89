use crate::error::Result;
use crate::parser::comments::strip_preserved_comments;
use crate::parser::css_reader::parse_stylesheet;
use crate::style::canonical::{canonicalize, CanonicalKey};
use crate::style::owned_css::OwnedStylesheet;
use std::collections::HashSet;

/// One reference stylesheet: a name for messages plus its text.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceSource<'a> {
    pub origin: &'a str,
    pub css: &'a str,
}

/// Canonical keys of every rule already known from library stylesheets.
///
/// Built once per run; there is no way to add keys after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    keys: HashSet<CanonicalKey>,
}

impl ReferenceSet {
    /// Parses each source and collects the key of every rule, including rules
    /// nested in `@media`, `@supports` and similar blocks.
    pub fn build(sources: &[ReferenceSource<'_>], strip_preserved: bool) -> Result<Self> {
        let mut sheets = Vec::with_capacity(sources.len());
        for source in sources {
            let sheet = if strip_preserved {
                parse_stylesheet(&strip_preserved_comments(source.css), source.origin)?
            } else {
                parse_stylesheet(source.css, source.origin)?
            };
            log::debug!("{}: {} reference rules", source.origin, sheet.rule_count());
            sheets.push(sheet);
        }

        let set = Self::from_sheets(&sheets);
        log::info!("Built reference set with {} unique rules", set.len());
        Ok(set)
    }

    pub fn from_sheets(sheets: &[OwnedStylesheet]) -> Self {
        let keys = sheets
            .iter()
            .flat_map(|sheet| sheet.rules())
            .map(canonicalize)
            .collect();
        ReferenceSet { keys }
    }

    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
