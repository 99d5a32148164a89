//! This module turns stylesheet text into an [`OwnedStylesheet`].
//!
//! It uses `cssparser` for tokenizing and rule/declaration splitting, and keeps
//! selectors and values as raw source text: nothing is re-serialized, so the
//! colour literals, units and spacing that later stages compare and rewrite
//! are exactly what the author (or compiler) wrote.

use crate::error::{ReconcileError, Result};
use crate::parser::comments::strip_comments;
use crate::style::owned_css::{
    AtRuleBody, OwnedAtRule, OwnedDeclaration, OwnedNode, OwnedRule, OwnedStylesheet,
    DECLARATION_AT_RULES,
};
use cssparser::{
    AtRuleParser, BasicParseErrorKind, CowRcStr, DeclarationParser, ParseError, ParseErrorKind,
    Parser, ParserInput, ParserState, QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser,
    StyleSheetParser, Token,
};
use once_cell::sync::Lazy;
use regex::Regex;

/// A `@charset` statement opening the stylesheet, after whitespace and comments.
static LEADING_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(?:\s|/\*.*?\*/)*@charset\s+([^;{]*?)\s*;").expect("charset pattern")
});

/// Parses `css` into an owned tree. `origin` names the input in error messages.
///
/// Any error reported by the tokenizer-level parser aborts the whole parse:
/// a partially understood stylesheet is never handed to later stages.
pub fn parse_stylesheet(css: &str, origin: &str) -> Result<OwnedStylesheet> {
    let css = css.strip_prefix('\u{feff}').unwrap_or(css);
    let mut nodes = Vec::new();

    // StyleSheetParser consumes a leading @charset without reporting it.
    if let Some(caps) = LEADING_CHARSET.captures(css) {
        nodes.push(OwnedNode::AtRule(OwnedAtRule {
            name: "charset".to_string(),
            prelude: caps[1].to_string(),
            body: AtRuleBody::Statement,
        }));
    }

    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut builder = SheetBuilder;

    for item in StyleSheetParser::new(&mut parser, &mut builder) {
        match item {
            Ok(node) => nodes.push(node),
            Err((error, fragment)) => return Err(to_reconcile_error(origin, error, fragment)),
        }
    }

    log::debug!("{}: parsed {} top-level nodes", origin, nodes.len());
    Ok(OwnedStylesheet { nodes })
}

fn to_reconcile_error(origin: &str, error: ParseError<'_, ()>, fragment: &str) -> ReconcileError {
    let message = match &error.kind {
        ParseErrorKind::Basic(BasicParseErrorKind::UnexpectedToken(Token::Delim('*'))) => {
            "star hack (`*property: value`) is not supported; strip it from the stylesheet"
                .to_string()
        }
        ParseErrorKind::Basic(BasicParseErrorKind::UnexpectedToken(token)) => {
            format!("unexpected token {:?}", token)
        }
        ParseErrorKind::Basic(BasicParseErrorKind::EndOfInput) => "unexpected end of input".to_string(),
        ParseErrorKind::Basic(BasicParseErrorKind::AtRuleInvalid(name)) => {
            format!("unsupported at-rule @{}", name)
        }
        ParseErrorKind::Basic(BasicParseErrorKind::AtRuleBodyInvalid) => "invalid at-rule body".to_string(),
        ParseErrorKind::Basic(BasicParseErrorKind::QualifiedRuleInvalid) => {
            "rule not allowed here".to_string()
        }
        other => format!("{:?}", other),
    };

    let mut fragment = fragment.trim().to_string();
    if fragment.len() > 80 {
        let cut = (0..=80).rev().find(|i| fragment.is_char_boundary(*i)).unwrap_or(0);
        fragment.truncate(cut);
        fragment.push_str("...");
    }

    ReconcileError::Parse {
        origin: origin.to_string(),
        line: error.location.line + 1,
        column: error.location.column,
        message,
        fragment,
    }
}

/// Consumes the rest of the current (delimited) input and returns it without comments.
fn raw_remainder<'i>(input: &mut Parser<'i, '_>) -> String {
    let start = input.position();
    while input.next_including_whitespace_and_comments().is_ok() {}
    strip_comments(input.slice_from(start)).trim().to_string()
}

/// Splits a trailing `!important` (any spacing or case) off a raw value.
fn split_important(raw: &str) -> (String, bool) {
    let trimmed = raw.trim();
    if let Some(bang) = trimmed.rfind('!') {
        if trimmed[bang + 1..].trim().eq_ignore_ascii_case("important") {
            return (trimmed[..bang].trim_end().to_string(), true);
        }
    }
    (trimmed.to_string(), false)
}

fn property_name(name: &str) -> String {
    if name.starts_with("--") {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}

fn parse_declaration_block<'i>(
    input: &mut Parser<'i, '_>,
) -> std::result::Result<Vec<OwnedDeclaration>, ParseError<'i, ()>> {
    let mut collector = DeclarationCollector;
    let mut declarations = Vec::new();
    for item in RuleBodyParser::new(input, &mut collector) {
        declarations.push(item.map_err(|(error, _)| error)?);
    }
    Ok(declarations)
}

fn parse_rule_list<'i>(
    input: &mut Parser<'i, '_>,
    builder: &mut SheetBuilder,
) -> std::result::Result<Vec<OwnedNode>, ParseError<'i, ()>> {
    let mut nodes = Vec::new();
    for item in RuleBodyParser::new(input, builder) {
        nodes.push(item.map_err(|(error, _)| error)?);
    }
    Ok(nodes)
}

/// Builds rules and at-rules, both at the top level and inside block at-rules.
struct SheetBuilder;

impl<'i> QualifiedRuleParser<'i> for SheetBuilder {
    type Prelude = String;
    type QualifiedRule = OwnedNode;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Ok(raw_remainder(input))
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let declarations = parse_declaration_block(input)?;
        Ok(OwnedNode::Rule(OwnedRule {
            selector: prelude,
            declarations,
        }))
    }
}

impl<'i> AtRuleParser<'i> for SheetBuilder {
    /// (name, raw prelude)
    type Prelude = (String, String);
    type AtRule = OwnedNode;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Ok((name.to_string(), raw_remainder(input)))
    }

    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
    ) -> std::result::Result<Self::AtRule, ()> {
        let (name, prelude) = prelude;
        Ok(OwnedNode::AtRule(OwnedAtRule {
            name,
            prelude,
            body: AtRuleBody::Statement,
        }))
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::AtRule, ParseError<'i, Self::Error>> {
        let (name, prelude) = prelude;
        let lower = name.to_ascii_lowercase();
        let body = if DECLARATION_AT_RULES.contains(&lower.as_str()) {
            AtRuleBody::Declarations(parse_declaration_block(input)?)
        } else {
            AtRuleBody::Nodes(parse_rule_list(input, self)?)
        };
        Ok(OwnedNode::AtRule(OwnedAtRule {
            name,
            prelude,
            body,
        }))
    }
}

impl<'i> DeclarationParser<'i> for SheetBuilder {
    type Declaration = OwnedNode;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _declaration_start: &ParserState,
    ) -> std::result::Result<Self::Declaration, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> RuleBodyItemParser<'i, OwnedNode, ()> for SheetBuilder {
    fn parse_declarations(&self) -> bool {
        false
    }

    fn parse_qualified(&self) -> bool {
        true
    }
}

/// Collects `property: value` pairs from a rule or `@font-face` style block.
struct DeclarationCollector;

impl<'i> DeclarationParser<'i> for DeclarationCollector {
    type Declaration = OwnedDeclaration;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _declaration_start: &ParserState,
    ) -> std::result::Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let (value, important) = split_important(&raw_remainder(input));
        Ok(OwnedDeclaration {
            property: property_name(&name),
            value,
            important,
        })
    }
}

impl<'i> AtRuleParser<'i> for DeclarationCollector {
    type Prelude = ();
    type AtRule = OwnedDeclaration;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::Prelude, ParseError<'i, Self::Error>> {
        // Nested at-rules inside a declaration block are not compiled CSS.
        Err(input.new_error(BasicParseErrorKind::AtRuleInvalid(name)))
    }

    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
    ) -> std::result::Result<Self::AtRule, ()> {
        Err(())
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::AtRule, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::AtRuleBodyInvalid))
    }
}

impl<'i> QualifiedRuleParser<'i> for DeclarationCollector {
    type Prelude = ();
    type QualifiedRule = OwnedDeclaration;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }
}

impl<'i> RuleBodyItemParser<'i, OwnedDeclaration, ()> for DeclarationCollector {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn first_rule(sheet: &OwnedStylesheet) -> &OwnedRule {
        sheet.rules()[0]
    }

    #[test]
    fn test_keeps_raw_values() {
        let sheet = parse_stylesheet(
            ".a  >  .b { color: #1A73E8; margin: 0px  auto; background: rgb(255,0,0) }",
            "test.css",
        )
        .unwrap();
        let rule = first_rule(&sheet);

        assert_eq!(rule.selector, ".a  >  .b");
        assert_eq!(
            rule.declarations,
            vec![
                OwnedDeclaration::new("color", "#1A73E8"),
                OwnedDeclaration::new("margin", "0px  auto"),
                OwnedDeclaration::new("background", "rgb(255,0,0)"),
            ]
        );
    }

    #[test]
    fn test_important_and_property_case() {
        let sheet = parse_stylesheet(
            "p { COLOR: red ! IMPORTANT; --Brand: blue; width: 1px!important }",
            "test.css",
        )
        .unwrap();
        let decls = &first_rule(&sheet).declarations;

        assert_eq!(decls[0].property, "color");
        assert_eq!(decls[0].value, "red");
        assert!(decls[0].important);
        assert_eq!(decls[1].property, "--Brand");
        assert!(!decls[1].important);
        assert_eq!(decls[2].value, "1px");
        assert!(decls[2].important);
    }

    #[test]
    fn test_duplicate_declarations_are_kept() {
        let sheet =
            parse_stylesheet(".a { color: red; color: var(--c); }", "test.css").unwrap();
        assert_eq!(first_rule(&sheet).declarations.len(), 2);
    }

    #[test]
    fn test_at_rule_bodies() {
        let css = r#"
            @import url("base.css");
            @media screen and (min-width: 40em) {
                @supports (display: grid) { .grid { display: grid; } }
                .a:hover { color: red; }
            }
            @font-face { font-family: "Icons"; src: url(icons.woff); }
            @keyframes spin { from { transform: rotate(0deg); } 50% { opacity: .5 } }
        "#;
        let sheet = parse_stylesheet(css, "test.css").unwrap();

        assert_eq!(sheet.nodes.len(), 4);
        match &sheet.nodes[0] {
            OwnedNode::AtRule(at) => {
                assert_eq!(at.name, "import");
                assert_eq!(at.prelude, "url(\"base.css\")");
                assert_eq!(at.body, AtRuleBody::Statement);
            }
            other => panic!("expected @import, got {:?}", other),
        }
        match &sheet.nodes[2] {
            OwnedNode::AtRule(at) => match &at.body {
                AtRuleBody::Declarations(decls) => assert_eq!(decls.len(), 2),
                other => panic!("expected declarations, got {:?}", other),
            },
            other => panic!("expected @font-face, got {:?}", other),
        }

        let selectors: Vec<&str> = sheet.rules().iter().map(|r| r.selector.as_str()).collect();
        assert_eq!(selectors, vec![".grid", ".a:hover", "from", "50%"]);
    }

    #[test]
    fn test_comments_are_not_part_of_values() {
        let sheet = parse_stylesheet(
            "/* header */ .a /* sel */ { color: red /* why */; }",
            "test.css",
        )
        .unwrap();
        let rule = first_rule(&sheet);
        assert_eq!(rule.selector, ".a");
        assert_eq!(rule.declarations[0].value, "red");
    }

    #[test]
    fn test_irregular_rule_is_a_hard_failure() {
        let err = parse_stylesheet(".a { color: red; }\n.b { *zoom: 1; }", "broken.css").unwrap_err();
        match err {
            ReconcileError::Parse { origin, line, .. } => {
                assert_eq!(origin, "broken.css");
                assert_eq!(line, 2);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_star_hack_is_named_in_the_error() {
        let err = parse_stylesheet(".a{*zoom:1}", "library.css").unwrap_err();
        assert!(err.to_string().contains("star hack"), "{}", err);
    }

    #[test]
    fn test_leading_charset_is_kept() {
        let sheet = parse_stylesheet("@charset \"UTF-8\";.a{color:red}", "test.css").unwrap();
        assert_eq!(
            sheet.to_string(),
            "@charset \"UTF-8\";\n\n.a {\n  color: red;\n}\n"
        );

        let sheet = parse_stylesheet("/* built */\n@charset 'utf-8';\n.a{color:red}", "test.css").unwrap();
        assert_eq!(sheet.nodes.len(), 2);
        match &sheet.nodes[0] {
            OwnedNode::AtRule(at) => {
                assert_eq!(at.name, "charset");
                assert_eq!(at.prelude, "'utf-8'");
                assert_eq!(at.body, AtRuleBody::Statement);
            }
            other => panic!("expected @charset, got {:?}", other),
        }
    }

    #[test]
    fn test_byte_order_mark_is_dropped() {
        let sheet = parse_stylesheet("\u{feff}.a{color:red}", "test.css").unwrap();
        assert_eq!(first_rule(&sheet).selector, ".a");

        let sheet = parse_stylesheet("\u{feff}@charset \"UTF-8\";\n.a{color:red}", "test.css").unwrap();
        assert_eq!(sheet.nodes.len(), 2);
        assert_eq!(first_rule(&sheet).selector, ".a");
    }
}
