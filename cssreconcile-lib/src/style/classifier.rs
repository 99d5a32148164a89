//! Splits a theme stylesheet into the rules it adds and the rules it only
//! repeats from library stylesheets.

use crate::style::canonical::canonicalize;
use crate::style::owned_css::{AtRuleBody, OwnedAtRule, OwnedNode, OwnedRule, OwnedStylesheet};
use crate::style::patterns::{Pattern, PatternTable};
use crate::style::reference_set::ReferenceSet;
use std::fmt;

/// Why a rule was taken out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalReason {
    /// Same canonical key as a reference rule.
    ExactMatch,
    /// Every member of the selector group matched the pattern table.
    Pattern(Pattern),
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalReason::ExactMatch => f.write_str("exact-match"),
            RemovalReason::Pattern(pattern) => write!(f, "pattern: {}", pattern),
        }
    }
}

/// A rule taken out of the tree, with the at-rule headers it sat in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedRule<R> {
    pub rule: OwnedRule,
    pub reason: R,
    /// Outermost first, e.g. `["@media screen", "@supports (display: grid)"]`.
    pub context: Vec<String>,
}

/// Result of walking a stylesheet with a keep/remove decision per rule.
#[derive(Debug, Clone)]
pub struct Partition<R> {
    pub kept: OwnedStylesheet,
    /// In source order.
    pub removed: Vec<RemovedRule<R>>,
    pub original_count: usize,
    /// At-rules dropped because nothing was left inside them.
    pub pruned_at_rules: usize,
}

impl<R> Partition<R> {
    pub fn kept_count(&self) -> usize {
        self.kept.rule_count()
    }
}

pub type Classification = Partition<RemovalReason>;

impl Classification {
    pub fn exact_count(&self) -> usize {
        self.removed
            .iter()
            .filter(|r| r.reason == RemovalReason::ExactMatch)
            .count()
    }

    pub fn pattern_count(&self) -> usize {
        self.removed.len() - self.exact_count()
    }
}

/// Removes every rule of `sheet` that the reference set or the pattern table
/// identifies as library code, then prunes empty at-rules.
///
/// The exact match is tried first; patterns only see rules the reference set
/// does not know.
pub fn classify(
    sheet: OwnedStylesheet,
    reference: &ReferenceSet,
    patterns: &PatternTable,
) -> Classification {
    let classification = partition_rules(sheet, |rule| {
        if reference.contains(&canonicalize(rule)) {
            log::debug!("exact-match: {}", rule.selector);
            return Some(RemovalReason::ExactMatch);
        }
        patterns.match_group(&rule.selector).map(|pattern| {
            log::debug!("{}: {}", pattern, rule.selector);
            RemovalReason::Pattern(pattern.clone())
        })
    });

    log::info!(
        "Removed {} library rules ({} exact, {} pattern), kept {} custom rules",
        classification.removed.len(),
        classification.exact_count(),
        classification.pattern_count(),
        classification.kept_count()
    );
    classification
}

/// Walks `sheet` in source order, removing each rule for which `decide`
/// returns a reason. Rules inside block at-rules are visited too.
pub fn partition_rules<R, F>(sheet: OwnedStylesheet, mut decide: F) -> Partition<R>
where
    F: FnMut(&OwnedRule) -> Option<R>,
{
    let original_count = sheet.rule_count();
    let mut removed = Vec::new();
    let mut context = Vec::new();
    let nodes = partition_nodes(sheet.nodes, &mut decide, &mut context, &mut removed);

    let mut kept = OwnedStylesheet { nodes };
    let pruned_at_rules = prune_empty_at_rules(&mut kept);
    if pruned_at_rules > 0 {
        log::info!("Removed {} empty at-rules", pruned_at_rules);
    }

    Partition {
        kept,
        removed,
        original_count,
        pruned_at_rules,
    }
}

fn partition_nodes<R, F>(
    nodes: Vec<OwnedNode>,
    decide: &mut F,
    context: &mut Vec<String>,
    removed: &mut Vec<RemovedRule<R>>,
) -> Vec<OwnedNode>
where
    F: FnMut(&OwnedRule) -> Option<R>,
{
    let mut kept = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            OwnedNode::Rule(rule) => match decide(&rule) {
                Some(reason) => removed.push(RemovedRule {
                    rule,
                    reason,
                    context: context.clone(),
                }),
                None => kept.push(OwnedNode::Rule(rule)),
            },
            OwnedNode::AtRule(mut at_rule) => {
                let header = at_rule.header();
                match std::mem::replace(&mut at_rule.body, AtRuleBody::Statement) {
                    AtRuleBody::Nodes(children) => {
                        context.push(header);
                        at_rule.body =
                            AtRuleBody::Nodes(partition_nodes(children, decide, context, removed));
                        context.pop();
                    }
                    other => at_rule.body = other,
                }
                kept.push(OwnedNode::AtRule(at_rule));
            }
        }
    }
    kept
}

/// Drops block at-rules left with nothing inside, repeating until a pass
/// removes nothing. Dropping an inner `@supports` can empty its `@media`, so
/// at most depth + 1 passes are needed.
pub fn prune_empty_at_rules(sheet: &mut OwnedStylesheet) -> usize {
    let max_passes = sheet.depth() + 1;
    let mut total = 0;
    for _ in 0..max_passes {
        let removed = prune_pass(&mut sheet.nodes);
        total += removed;
        if removed == 0 {
            break;
        }
    }
    total
}

fn prune_pass(nodes: &mut Vec<OwnedNode>) -> usize {
    let before = nodes.len();
    nodes.retain(|node| !matches!(node, OwnedNode::AtRule(at_rule) if at_rule.is_empty_block()));
    let mut removed = before - nodes.len();

    for node in nodes.iter_mut() {
        if let OwnedNode::AtRule(OwnedAtRule {
            body: AtRuleBody::Nodes(children),
            ..
        }) = node
        {
            removed += prune_pass(children);
        }
    }
    removed
}
