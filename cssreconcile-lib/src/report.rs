//! Text and JSON renderings of extraction and validation results.

use crate::error::Result;
use crate::style::classifier::{Classification, RemovedRule};
use crate::style::css_diff::{DiffEntry, DiffKind, DiffReport, Verdict};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Entries of one kind shown in a text report before the rest are summarised.
pub const MAX_SHOWN_PER_KIND: usize = 20;

const RULE_WIDTH: usize = 80;

/// A file named in a report, with its size on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub path: String,
    pub bytes: u64,
}

impl FileInfo {
    pub fn new(path: impl Into<String>, bytes: u64) -> Self {
        FileInfo {
            path: path.into(),
            bytes,
        }
    }

    fn kilobytes(&self) -> String {
        format!("{:.2} KB", self.bytes as f64 / 1024.0)
    }
}

/// Comment block written at the top of an extracted stylesheet.
pub fn output_header(source: &str, label: &str, generated: NaiveDate) -> String {
    format!(
        "/**\n * Theme Customizations\n * Extracted from {source}\n * Auto-generated on {date}\n *\n * This file contains only theme-specific styles.\n * {label} styles have been removed.\n * Colors and fonts have been replaced with variables where defined.\n */\n\n",
        source = sanitize_comment(source),
        label = sanitize_comment(label),
        date = generated.format("%Y-%m-%d"),
    )
}

/// The audit of every removed rule, each preceded by the reason it was
/// removed and wrapped in the at-rules it sat in.
pub fn audit_text(classification: &Classification, label: &str, generated: NaiveDate) -> String {
    let mut out = format!(
        "/**\n * Library Rules Removed During Extraction\n * Generated on {date}\n *\n * These {total} rules matched {label}\n * and were filtered out as library code.\n *\n *   Exact matches:   {exact}\n *   Pattern matches: {pattern}\n *   Empty at-rules pruned: {pruned}\n *\n * Review this file to ensure no customizations were accidentally removed.\n */\n",
        date = generated.format("%Y-%m-%d"),
        total = classification.removed.len(),
        label = sanitize_comment(label),
        exact = classification.exact_count(),
        pattern = classification.pattern_count(),
        pruned = classification.pruned_at_rules,
    );

    for removed in &classification.removed {
        out.push('\n');
        out.push_str(&format!("/* {} */\n", sanitize_comment(&removed.reason.to_string())));
        out.push_str(&wrap_in_context(removed));
    }
    out
}

fn wrap_in_context<R>(removed: &RemovedRule<R>) -> String {
    let mut out = String::new();
    for (depth, header) in removed.context.iter().enumerate() {
        out.push_str(&format!("{}{} {{\n", "  ".repeat(depth), header));
    }
    let pad = "  ".repeat(removed.context.len());
    for line in removed.rule.to_string().lines() {
        out.push_str(&pad);
        out.push_str(line);
        out.push('\n');
    }
    for depth in (0..removed.context.len()).rev() {
        out.push_str(&format!("{}}}\n", "  ".repeat(depth)));
    }
    out
}

/// `*/` would end the comment early.
fn sanitize_comment(text: &str) -> String {
    text.replace("*/", "* /")
}

/// Human-readable validation report.
pub fn diff_text(
    report: &DiffReport,
    before: &FileInfo,
    after: &FileInfo,
    generated: DateTime<Utc>,
) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        rule.clone(),
        "CSS VALIDATION REPORT".to_string(),
        format!("Generated: {}", generated.to_rfc3339()),
        rule.clone(),
        String::new(),
        "FILE INFORMATION:".to_string(),
        format!("  Before: {} ({})", before.path, before.kilobytes()),
        format!("  After:  {} ({})", after.path, after.kilobytes()),
        String::new(),
    ];

    match report.verdict() {
        Verdict::Identical => {
            lines.push("✓ VALIDATION PASSED".to_string());
            lines.push(String::new());
            lines.push("The CSS files are identical after hex color normalization.".to_string());
            lines.push("No visual changes detected.".to_string());
        }
        verdict => {
            lines.push("RULE COUNT:".to_string());
            lines.push(format!("  Before: {} rules", group_thousands(report.before_rules)));
            lines.push(format!("  After:  {} rules", group_thousands(report.after_rules)));
            lines.push(String::new());

            if verdict == Verdict::Pass {
                lines.push("✓ NO CRITICAL DIFFERENCES".to_string());
                lines.push(String::new());
                lines.push(format!(
                    "Found {} non-critical differences (formatting/order only).",
                    report.entries.len()
                ));
            } else {
                lines.push("✗ CRITICAL DIFFERENCES FOUND".to_string());
                lines.push(String::new());
                lines.push(format!("Total differences: {}", report.entries.len()));
                lines.push(format!("Critical differences: {}", report.critical_count()));
                lines.push(String::new());
                lines.push("-".repeat(RULE_WIDTH));
                lines.push("CRITICAL DIFFERENCES (affect visual rendering):".to_string());
                lines.push("-".repeat(RULE_WIDTH));
                lines.push(String::new());
                let critical: Vec<&DiffEntry> = report.critical().collect();
                push_grouped(&mut lines, &critical);
            }
        }
    }

    lines.push(rule);
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn push_grouped(lines: &mut Vec<String>, entries: &[&DiffEntry]) {
    for kind in DiffKind::ALL {
        let of_kind: Vec<&&DiffEntry> = entries.iter().filter(|e| e.kind == kind).collect();
        if of_kind.is_empty() {
            continue;
        }

        lines.push(format!("{}: {} occurrences", kind, of_kind.len()));
        lines.push(String::new());
        for entry in of_kind.iter().take(MAX_SHOWN_PER_KIND) {
            lines.push(format!("  Selector: {}", entry.selector));
            if let Some(blocks) = entry.blocks {
                lines.push(format!("  Blocks: {}", blocks));
            }
            if let Some(property) = &entry.property {
                lines.push(format!("  Property: {}", property));
            }
            if let Some(old) = &entry.old_value {
                lines.push(format!("  Old: {}", old));
            }
            if let Some(new) = &entry.new_value {
                lines.push(format!("  New: {}", new));
            }
            lines.push(String::new());
        }
        if of_kind.len() > MAX_SHOWN_PER_KIND {
            lines.push(format!("  ... and {} more", of_kind.len() - MAX_SHOWN_PER_KIND));
            lines.push(String::new());
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated: String,
    verdict: Verdict,
    before: &'a FileInfo,
    after: &'a FileInfo,
    critical_differences: usize,
    #[serde(flatten)]
    report: &'a DiffReport,
}

/// The whole report, every entry included, as pretty-printed JSON.
pub fn diff_json(
    report: &DiffReport,
    before: &FileInfo,
    after: &FileInfo,
    generated: DateTime<Utc>,
) -> Result<String> {
    let json = JsonReport {
        generated: generated.to_rfc3339(),
        verdict: report.verdict(),
        before,
        after,
        critical_differences: report.critical_count(),
        report,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

/// `1234567` as `1,234,567`.
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::css_reader::parse_stylesheet;
    use crate::style::classifier::classify;
    use crate::style::css_diff::{diff, CriticalProperties, Snapshot};
    use crate::style::patterns::PatternTable;
    use crate::style::reference_set::{ReferenceSet, ReferenceSource};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    fn files() -> (FileInfo, FileInfo) {
        (FileInfo::new("before.css", 2048), FileInfo::new("after.css", 1536))
    }

    fn report(before: &str, after: &str) -> DiffReport {
        diff(
            Snapshot { origin: "before.css", css: before },
            Snapshot { origin: "after.css", css: after },
            &CriticalProperties::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_audit_lists_rules_with_reason_and_context() {
        let reference = ReferenceSet::build(
            &[ReferenceSource { origin: "ref.css", css: ".button { color: #fff; }" }],
            false,
        )
        .unwrap();
        let sheet = parse_stylesheet(
            ".button { color: #fff; }\n@media print { .slick-dots { display: none; } .keep { color: red; } }",
            "theme.css",
        )
        .unwrap();
        let classification = classify(sheet, &reference, &PatternTable::default());

        let audit = audit_text(&classification, "the framework", date());
        assert!(audit.contains(" * Generated on 2024-03-09\n"));
        assert!(audit.contains(" *   Exact matches:   1\n"));
        assert!(audit.contains(" *   Pattern matches: 1\n"));
        assert!(audit.ends_with(
            "/* exact-match */\n.button {\n  color: #fff;\n}\n\n/* pattern: class-prefix .slick-* */\n@media print {\n  .slick-dots {\n    display: none;\n  }\n}\n"
        ));
    }

    #[test]
    fn test_identical_report() {
        let (before, after) = files();
        let text = diff_text(&report(".a{}", ".a{}"), &before, &after, Utc::now());
        assert!(text.contains("✓ VALIDATION PASSED"));
        assert!(text.contains("  Before: before.css (2.00 KB)"));
        assert!(text.contains("  After:  after.css (1.50 KB)"));
    }

    #[test]
    fn test_failing_report_truncates_each_kind() {
        let before: String = (0..25).map(|i| format!(".s{} {{ color: red; }}\n", i)).collect();
        let (b, a) = files();
        let generated = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let text = diff_text(&report(&before, ".x { color: red; }"), &b, &a, generated);

        assert!(text.contains("Generated: 2024-03-09T12:00:00+00:00"));
        assert!(text.contains("✗ CRITICAL DIFFERENCES FOUND"));
        assert!(text.contains("REMOVED_SELECTOR: 25 occurrences"));
        assert!(text.contains("ADDED_SELECTOR: 1 occurrences"));
        assert!(text.contains("  ... and 5 more"));
        assert_eq!(text.matches("  Selector: .s").count(), MAX_SHOWN_PER_KIND);
    }

    #[test]
    fn test_passing_report_counts_non_critical() {
        let (b, a) = files();
        let text = diff_text(
            &report(".a { zoom: 1; }", ".a { zoom: 2; }"),
            &b,
            &a,
            Utc::now(),
        );
        assert!(text.contains("✓ NO CRITICAL DIFFERENCES"));
        assert!(text.contains("Found 1 non-critical differences"));
    }

    #[test]
    fn test_json_report() {
        let (b, a) = files();
        let json = diff_json(&report(".a { color: red; }", ".a { color: blue; }"), &b, &a, Utc::now())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["verdict"], "fail");
        assert_eq!(value["critical_differences"], 1);
        assert_eq!(value["entries"][0]["kind"], "CHANGED_VALUE");
        assert_eq!(value["entries"][0]["new_value"], "blue");
        assert!(value["entries"][0].get("blocks").is_none());
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_header_cannot_close_early() {
        let header = output_header("theme*/.css", "Lib", date());
        assert!(header.contains("Extracted from theme* /.css"));
    }
}
