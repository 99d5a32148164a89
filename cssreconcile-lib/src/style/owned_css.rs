// src/style/owned_css.rs: the fully-owned stylesheet tree every stage works on.
use std::fmt;

/// At-rules whose block holds declarations rather than nested rules.
pub const DECLARATION_AT_RULES: &[&str] = &[
    "font-face",
    "page",
    "counter-style",
    "property",
    "viewport",
    "-ms-viewport",
    "font-palette-values",
];

/// A parsed stylesheet: top-level rules and at-rules in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedStylesheet {
    pub nodes: Vec<OwnedNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnedNode {
    Rule(OwnedRule),
    AtRule(OwnedAtRule),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedRule {
    /// Raw selector text, e.g. ".card > h2, .card > h3"
    pub selector: String,
    /// Declarations in source order; duplicates are kept.
    pub declarations: Vec<OwnedDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedDeclaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedAtRule {
    /// Name without the `@`, e.g. "media".
    pub name: String,
    /// Raw prelude, e.g. "screen and (min-width: 40em)".
    pub prelude: String,
    pub body: AtRuleBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtRuleBody {
    /// `@charset "UTF-8";`, `@import url(x.css);`
    Statement,
    Declarations(Vec<OwnedDeclaration>),
    Nodes(Vec<OwnedNode>),
}

impl OwnedDeclaration {
    pub fn new(property: &str, value: &str) -> Self {
        OwnedDeclaration {
            property: property.to_string(),
            value: value.to_string(),
            important: false,
        }
    }

    /// The value as written in a stylesheet, including `!important`.
    pub fn full_value(&self) -> String {
        if self.important {
            format!("{} !important", self.value)
        } else {
            self.value.clone()
        }
    }
}

impl OwnedRule {
    pub fn new(selector: &str, declarations: Vec<OwnedDeclaration>) -> Self {
        OwnedRule {
            selector: selector.to_string(),
            declarations,
        }
    }
}

impl OwnedAtRule {
    /// True for a block at-rule that no longer holds anything.
    pub fn is_empty_block(&self) -> bool {
        match &self.body {
            AtRuleBody::Statement => false,
            AtRuleBody::Declarations(decls) => decls.is_empty(),
            AtRuleBody::Nodes(nodes) => nodes.is_empty(),
        }
    }

    /// `@media screen` style header.
    pub fn header(&self) -> String {
        if self.prelude.is_empty() {
            format!("@{}", self.name)
        } else {
            format!("@{} {}", self.name, self.prelude)
        }
    }
}

impl OwnedStylesheet {
    /// Every style rule in source order, including rules nested in at-rules.
    pub fn rules(&self) -> Vec<&OwnedRule> {
        let mut out = Vec::new();
        collect_rules(&self.nodes, &mut out);
        out
    }

    pub fn rule_count(&self) -> usize {
        self.rules().len()
    }

    /// Visit every declaration mutably, including those of `@font-face` blocks.
    pub fn for_each_declaration_mut<F>(&mut self, mut visit: F)
    where
        F: FnMut(&mut OwnedDeclaration),
    {
        visit_declarations_mut(&mut self.nodes, &mut visit);
    }

    /// Nesting depth of at-rules; a flat sheet has depth 0.
    pub fn depth(&self) -> usize {
        nodes_depth(&self.nodes)
    }
}

fn collect_rules<'a>(nodes: &'a [OwnedNode], out: &mut Vec<&'a OwnedRule>) {
    for node in nodes {
        match node {
            OwnedNode::Rule(rule) => out.push(rule),
            OwnedNode::AtRule(at_rule) => {
                if let AtRuleBody::Nodes(children) = &at_rule.body {
                    collect_rules(children, out);
                }
            }
        }
    }
}

fn visit_declarations_mut<F>(nodes: &mut [OwnedNode], visit: &mut F)
where
    F: FnMut(&mut OwnedDeclaration),
{
    for node in nodes {
        match node {
            OwnedNode::Rule(rule) => rule.declarations.iter_mut().for_each(&mut *visit),
            OwnedNode::AtRule(at_rule) => match &mut at_rule.body {
                AtRuleBody::Statement => {}
                AtRuleBody::Declarations(decls) => decls.iter_mut().for_each(&mut *visit),
                AtRuleBody::Nodes(children) => visit_declarations_mut(children, visit),
            },
        }
    }
}

fn nodes_depth(nodes: &[OwnedNode]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            OwnedNode::AtRule(OwnedAtRule {
                body: AtRuleBody::Nodes(children),
                ..
            }) => 1 + nodes_depth(children),
            OwnedNode::AtRule(_) => 1,
            OwnedNode::Rule(_) => 0,
        })
        .max()
        .unwrap_or(0)
}

fn write_declarations(
    f: &mut fmt::Formatter<'_>,
    decls: &[OwnedDeclaration],
    indent: usize,
) -> fmt::Result {
    let pad = "  ".repeat(indent);
    for decl in decls {
        writeln!(f, "{}{}: {};", pad, decl.property, decl.full_value())?;
    }
    Ok(())
}

fn write_rule(f: &mut fmt::Formatter<'_>, rule: &OwnedRule, indent: usize) -> fmt::Result {
    let pad = "  ".repeat(indent);
    writeln!(f, "{}{} {{", pad, rule.selector)?;
    write_declarations(f, &rule.declarations, indent + 1)?;
    writeln!(f, "{}}}", pad)
}

fn write_nodes(f: &mut fmt::Formatter<'_>, nodes: &[OwnedNode], indent: usize) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 && indent == 0 {
            writeln!(f)?;
        }
        match node {
            OwnedNode::Rule(rule) => write_rule(f, rule, indent)?,
            OwnedNode::AtRule(at_rule) => write_at_rule(f, at_rule, indent)?,
        }
    }
    Ok(())
}

fn write_at_rule(f: &mut fmt::Formatter<'_>, at_rule: &OwnedAtRule, indent: usize) -> fmt::Result {
    let pad = "  ".repeat(indent);
    match &at_rule.body {
        AtRuleBody::Statement => writeln!(f, "{}{};", pad, at_rule.header()),
        AtRuleBody::Declarations(decls) => {
            writeln!(f, "{}{} {{", pad, at_rule.header())?;
            write_declarations(f, decls, indent + 1)?;
            writeln!(f, "{}}}", pad)
        }
        AtRuleBody::Nodes(children) => {
            writeln!(f, "{}{} {{", pad, at_rule.header())?;
            write_nodes(f, children, indent + 1)?;
            writeln!(f, "{}}}", pad)
        }
    }
}

impl fmt::Display for OwnedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_rule(f, self, 0)
    }
}

impl fmt::Display for OwnedAtRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_at_rule(f, self, 0)
    }
}

impl fmt::Display for OwnedStylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_nodes(f, &self.nodes, 0)
    }
}
