//! Run settings, read once from an optional TOML file and passed by
//! reference to every stage.

use crate::error::{ReconcileError, Result};
use crate::style::css_diff::CriticalProperties;
use crate::style::patterns::{Pattern, PatternTable};
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_REFERENCE_LABEL: &str = "the reference libraries";

/// Settings file layout. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SettingsFile {
    reference_label: Option<String>,
    custom_selectors: Vec<String>,
    extra_critical_properties: Vec<String>,
    patterns: Option<Vec<Pattern>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Names the reference libraries in headers and audits.
    pub reference_label: String,
    pub patterns: PatternTable,
    pub critical: CriticalProperties,
    /// Regular expressions selecting theme rules when splitting a reference
    /// out of a compiled theme.
    pub custom_selectors: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            reference_label: DEFAULT_REFERENCE_LABEL.to_string(),
            patterns: PatternTable::default(),
            critical: CriticalProperties::default(),
            custom_selectors: Vec::new(),
        }
    }
}

impl Settings {
    /// Library defaults when `path` is `None`.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Settings::load(path),
            None => Ok(Settings::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ReconcileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Settings::from_toml(&text, path)?;
        log::info!(
            "Loaded settings from {} ({} patterns, {} custom selectors)",
            path.display(),
            settings.patterns.patterns().len(),
            settings.custom_selectors.len()
        );
        Ok(settings)
    }

    /// Parses `text`; `path` only names the file in errors.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self> {
        let file: SettingsFile = toml::from_str(text).map_err(|err| ReconcileError::Config {
            path: path.to_path_buf(),
            message: err.message().to_string(),
        })?;

        let settings = Settings {
            reference_label: file
                .reference_label
                .unwrap_or_else(|| DEFAULT_REFERENCE_LABEL.to_string()),
            patterns: file.patterns.map(PatternTable::new).unwrap_or_default(),
            critical: CriticalProperties::default().with_extra(&file.extra_critical_properties),
            custom_selectors: file.custom_selectors,
        };
        settings.custom_selector_regexes()?;
        Ok(settings)
    }

    /// Compiles `custom_selectors`.
    pub fn custom_selector_regexes(&self) -> Result<Vec<Regex>> {
        self.custom_selectors
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ReconcileError::Regex {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }
}
