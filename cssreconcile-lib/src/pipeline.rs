//! File-level entry points: each reads its inputs, runs the stages and
//! writes its outputs. Nothing is written before every input is found.

use crate::config::Settings;
use crate::error::{MissingInput, ReconcileError, Result};
use crate::parser::css_reader::parse_stylesheet;
use crate::report;
use crate::style::classifier;
use crate::style::css_diff::{self, DiffReport, Snapshot};
use crate::style::patterns::PatternTable;
use crate::style::reference_set::{ReferenceSet, ReferenceSource};
use crate::style::substitute;
use crate::style::variables::VariableTable;
use chrono::{Local, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// An input that must exist before a run starts.
#[derive(Debug, Clone)]
pub struct RequiredInput<'a> {
    pub label: &'a str,
    pub path: &'a Path,
    pub hint: Option<&'a str>,
}

/// Checks every input and reports all the missing ones at once.
pub fn require_inputs(inputs: &[RequiredInput<'_>]) -> Result<()> {
    let missing: Vec<MissingInput> = inputs
        .iter()
        .filter(|input| !input.path.is_file())
        .map(|input| MissingInput {
            label: input.label.to_string(),
            path: input.path.to_path_buf(),
            hint: input.hint.map(str::to_string),
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReconcileError::MissingInputs(missing))
    }
}

fn read(path: &Path) -> Result<String> {
    log::info!("Reading {}", path.display());
    fs::read_to_string(path).map_err(|source| ReconcileError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|source| ReconcileError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Wrote {} ({:.2} KB)",
        path.display(),
        content.len() as f64 / 1024.0
    );
    Ok(())
}

fn file_info(path: &Path, content: &str) -> report::FileInfo {
    let bytes = fs::metadata(path)
        .map(|meta| meta.len())
        .unwrap_or(content.len() as u64);
    report::FileInfo::new(path.display().to_string(), bytes)
}

pub mod extract {
    use super::*;

    #[derive(Debug, Clone)]
    pub struct ExtractOptions {
        /// Compiled theme stylesheet.
        pub stylesheet: PathBuf,
        /// Library stylesheets whose rules are removed from the theme.
        pub references: Vec<PathBuf>,
        /// `$name: value;` definitions used for substitution.
        pub variables: Option<PathBuf>,
        pub output: PathBuf,
        pub audit: PathBuf,
        /// Drop `/*! ... */` blocks from references before parsing.
        pub strip_preserved_comments: bool,
        /// Also remove rules recognised by the pattern table.
        pub use_patterns: bool,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ExtractSummary {
        pub original_rules: usize,
        pub kept: usize,
        pub exact: usize,
        pub pattern: usize,
        pub pruned_at_rules: usize,
        pub replacements: usize,
        pub output_bytes: usize,
    }

    pub fn run(options: &ExtractOptions, settings: &Settings) -> Result<ExtractSummary> {
        let mut inputs = vec![RequiredInput {
            label: "Theme stylesheet",
            path: &options.stylesheet,
            hint: Some("compile the theme first"),
        }];
        for reference in &options.references {
            inputs.push(RequiredInput {
                label: "Reference stylesheet",
                path: reference,
                hint: Some("build it with `cssreconcile bundle` or `cssreconcile split`"),
            });
        }
        if let Some(variables) = &options.variables {
            inputs.push(RequiredInput {
                label: "Variables file",
                path: variables,
                hint: None,
            });
        }
        require_inputs(&inputs)?;

        let theme_css = read(&options.stylesheet)?;
        let reference_texts = options
            .references
            .iter()
            .map(|path| read(path).map(|css| (path.display().to_string(), css)))
            .collect::<Result<Vec<_>>>()?;
        let variables = match &options.variables {
            Some(path) => VariableTable::parse(&read(path)?),
            None => VariableTable::default(),
        };

        let sources: Vec<ReferenceSource<'_>> = reference_texts
            .iter()
            .map(|(origin, css)| ReferenceSource {
                origin: origin.as_str(),
                css: css.as_str(),
            })
            .collect();
        let reference = ReferenceSet::build(&sources, options.strip_preserved_comments)?;

        let origin = options.stylesheet.display().to_string();
        let sheet = parse_stylesheet(&theme_css, &origin)?;
        let empty = PatternTable::empty();
        let patterns = if options.use_patterns {
            &settings.patterns
        } else {
            &empty
        };
        let classification = classifier::classify(sheet, &reference, patterns);

        let today = Local::now().date_naive();
        write(
            &options.audit,
            &report::audit_text(&classification, &settings.reference_label, today),
        )?;

        let mut summary = ExtractSummary {
            original_rules: classification.original_count,
            kept: classification.kept_count(),
            exact: classification.exact_count(),
            pattern: classification.pattern_count(),
            pruned_at_rules: classification.pruned_at_rules,
            replacements: 0,
            output_bytes: 0,
        };
        let mut kept = classification.kept;
        summary.replacements = substitute::substitute(&mut kept, &variables);

        let file_name = options
            .stylesheet
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(origin);
        let mut output = report::output_header(&file_name, &settings.reference_label, today);
        output.push_str(&kept.to_string());
        write(&options.output, &output)?;

        summary.output_bytes = output.len();
        Ok(summary)
    }
}

pub mod validate {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum ReportFormat {
        #[default]
        Text,
        Json,
    }

    #[derive(Debug, Clone)]
    pub struct ValidateOptions {
        pub before: PathBuf,
        pub after: PathBuf,
        pub report: PathBuf,
        pub format: ReportFormat,
    }

    /// Compares the two snapshots and writes the report. A failing verdict
    /// is a normal return; only I/O and parse problems are errors.
    pub fn run(options: &ValidateOptions, settings: &Settings) -> Result<DiffReport> {
        require_inputs(&[
            RequiredInput {
                label: "Before stylesheet",
                path: &options.before,
                hint: Some("keep a copy of the stylesheet before transforming it"),
            },
            RequiredInput {
                label: "After stylesheet",
                path: &options.after,
                hint: None,
            },
        ])?;

        let before_css = read(&options.before)?;
        let after_css = read(&options.after)?;
        let before_name = options.before.display().to_string();
        let after_name = options.after.display().to_string();

        let diff = css_diff::diff(
            Snapshot {
                origin: &before_name,
                css: &before_css,
            },
            Snapshot {
                origin: &after_name,
                css: &after_css,
            },
            &settings.critical,
        )?;

        let before = file_info(&options.before, &before_css);
        let after = file_info(&options.after, &after_css);
        let rendered = match options.format {
            ReportFormat::Text => report::diff_text(&diff, &before, &after, Utc::now()),
            ReportFormat::Json => report::diff_json(&diff, &before, &after, Utc::now())?,
        };
        write(&options.report, &rendered)?;

        log::info!(
            "Verdict: {} ({} differences, {} critical)",
            diff.verdict(),
            diff.entries.len(),
            diff.critical_count()
        );
        Ok(diff)
    }
}

pub mod bundle {
    use super::*;

    /// One library stylesheet and the name printed in its banner.
    #[derive(Debug, Clone)]
    pub struct BundleSource {
        pub name: String,
        pub path: PathBuf,
    }

    impl BundleSource {
        /// Uses the file name as the banner name.
        pub fn from_path(path: PathBuf) -> Self {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            BundleSource { name, path }
        }
    }

    /// Concatenates `sources` into `output`, each under a banner naming it.
    /// Returns the number of bytes written.
    pub fn run(sources: &[BundleSource], output: &Path) -> Result<usize> {
        let inputs: Vec<RequiredInput<'_>> = sources
            .iter()
            .map(|source| RequiredInput {
                label: &source.name,
                path: &source.path,
                hint: None,
            })
            .collect();
        require_inputs(&inputs)?;

        let mut combined = String::new();
        for source in sources {
            let css = read(&source.path)?;
            combined.push_str(&banner(&source.name));
            combined.push_str(&css);
            combined.push_str("\n\n");
        }
        write(output, &combined)?;
        Ok(combined.len())
    }

    fn banner(name: &str) -> String {
        let line = "=".repeat(40);
        format!(
            "\n/* {line}\n   {}\n   {line} */\n\n",
            name.replace("*/", "* /"),
            line = line
        )
    }
}

pub mod split {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SplitSummary {
        pub kept: usize,
        pub dropped: usize,
        pub pruned_at_rules: usize,
    }

    /// Writes to `output` the rules of `stylesheet` whose selector matches
    /// none of the configured custom selectors.
    pub fn run(stylesheet: &Path, output: &Path, settings: &Settings) -> Result<SplitSummary> {
        require_inputs(&[RequiredInput {
            label: "Theme stylesheet",
            path: stylesheet,
            hint: Some("compile the theme first"),
        }])?;

        let custom = settings.custom_selector_regexes()?;
        if custom.is_empty() {
            log::warn!("No custom selectors configured, every rule is kept as library code");
        }

        let origin = stylesheet.display().to_string();
        let sheet = parse_stylesheet(&read(stylesheet)?, &origin)?;
        let partition = classifier::partition_rules(sheet, |rule| {
            custom
                .iter()
                .find(|regex| regex.is_match(&rule.selector))
                .map(|regex| regex.as_str().to_string())
        });

        let summary = SplitSummary {
            kept: partition.kept_count(),
            dropped: partition.removed.len(),
            pruned_at_rules: partition.pruned_at_rules,
        };
        log::info!(
            "Library rules: {}, custom rules skipped: {}",
            summary.kept,
            summary.dropped
        );

        let file_name = stylesheet
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(origin);
        let mut text = format!(
            "/**\n * {label} Reference\n * Extracted from {file} on {date}\n *\n * Library rules: {kept}\n * Custom rules skipped: {dropped}\n */\n\n",
            label = settings.reference_label.replace("*/", "* /"),
            file = file_name.replace("*/", "* /"),
            date = Local::now().date_naive().format("%Y-%m-%d"),
            kept = summary.kept,
            dropped = summary.dropped,
        );
        text.push_str(&partition.kept.to_string());
        write(output, &text)?;
        Ok(summary)
    }
}
