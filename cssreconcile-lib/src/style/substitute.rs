//! Replaces colour and font literals in declaration values with the names
//! from a [`VariableTable`].

use crate::style::color::{HEX_LITERAL, RGB_LITERAL};
use crate::style::owned_css::OwnedStylesheet;
use crate::style::variables::VariableTable;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// A symbolic name wrapped in quotes, left behind when a quoted family was
/// replaced inside a larger list.
static QUOTED_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["'](\$[A-Za-z0-9_-]+)["']"#).expect("quoted name pattern"));

const FONT_PROPERTIES: &[&str] = &["font", "font-family"];

/// Rewrites every declaration of `sheet` in place and returns how many
/// literals were replaced.
pub fn substitute(sheet: &mut OwnedStylesheet, table: &VariableTable) -> usize {
    if table.is_empty() {
        log::warn!("Variable table is empty, values are left as written");
        return 0;
    }

    let mut total = 0;
    sheet.for_each_declaration_mut(|decl| {
        let (value, count) = substitute_value(&decl.property, &decl.value, table);
        if count > 0 {
            log::debug!("{}: {} -> {}", decl.property, decl.value, value);
            decl.value = value;
            total += count;
        }
    });

    log::info!("Replaced {} literal values with variables", total);
    total
}

/// Substitutes one value. Colours are replaced in every property; font
/// literals only in `font` and `font-family`.
pub fn substitute_value(property: &str, value: &str, table: &VariableTable) -> (String, usize) {
    let mut count = 0;

    let replaced = HEX_LITERAL.replace_all(value, |caps: &Captures| match table.color_name(&caps[0]) {
        Some(name) => {
            count += 1;
            name.to_string()
        }
        None => caps[0].to_string(),
    });
    let mut replaced = RGB_LITERAL
        .replace_all(&replaced, |caps: &Captures| match table.color_name(&caps[0]) {
            Some(name) => {
                count += 1;
                name.to_string()
            }
            None => caps[0].to_string(),
        })
        .into_owned();

    if FONT_PROPERTIES.contains(&property.to_ascii_lowercase().as_str()) {
        for (literal, name) in table.fonts_longest_first() {
            let (next, n) = replace_bounded(&replaced, literal, name);
            if n > 0 {
                replaced = next;
                count += n;
            }
        }
        replaced = QUOTED_NAME.replace_all(&replaced, "$1").into_owned();
    }

    (replaced, count)
}

/// Replaces occurrences of `needle` that are not glued to identifier
/// characters, so `serif` inside `sans-serif` or `$serif-stack` is left alone.
fn replace_bounded(haystack: &str, needle: &str, replacement: &str) -> (String, usize) {
    if needle.is_empty() {
        return (haystack.to_string(), 0);
    }

    let mut out = String::with_capacity(haystack.len());
    let mut count = 0;
    let mut cursor = 0;
    while let Some(found) = haystack[cursor..].find(needle) {
        let start = cursor + found;
        let end = start + needle.len();
        let open = haystack[..start].chars().next_back().map_or(true, |c| !is_ident_char(c));
        let close = haystack[end..].chars().next().map_or(true, |c| !is_ident_char(c));

        if open && close {
            out.push_str(&haystack[cursor..start]);
            out.push_str(replacement);
            count += 1;
            cursor = end;
        } else {
            let step = start + haystack[start..].chars().next().map_or(1, char::len_utf8);
            out.push_str(&haystack[cursor..step]);
            cursor = step;
        }
    }
    out.push_str(&haystack[cursor..]);
    (out, count)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::css_reader::parse_stylesheet;
    use pretty_assertions::assert_eq;

    const VARIABLES: &str = r#"
$brand-blue: #1a73e8;
$white: #fff;
$body-font: "Open Sans", Helvetica, sans-serif;
$serif-stack: Georgia, serif;
"#;

    #[test]
    fn test_brand_colour_is_substituted() {
        let table = VariableTable::parse(VARIABLES);
        let mut sheet = parse_stylesheet("a { color: #1A73E8; }", "theme.css").unwrap();
        assert_eq!(substitute(&mut sheet, &table), 1);
        assert_eq!(sheet.to_string(), "a {\n  color: $brand-blue;\n}\n");
    }

    #[test]
    fn test_every_colour_spelling() {
        let table = VariableTable::parse(VARIABLES);
        let (value, count) = substitute_value(
            "box-shadow",
            "0 0 2px rgb(26, 115, 232), inset 0 1px rgba(255,255,255,1), 0 0 #FFFFFF",
            &table,
        );
        assert_eq!(value, "0 0 2px $brand-blue, inset 0 1px $white, 0 0 $white");
        assert_eq!(count, 3);
    }

    #[test]
    fn test_unknown_and_translucent_colours_stay() {
        let table = VariableTable::parse(VARIABLES);
        let (value, count) =
            substitute_value("background", "#123456 rgba(26, 115, 232, 0.5)", &table);
        assert_eq!(value, "#123456 rgba(26, 115, 232, 0.5)");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_font_families() {
        let table = VariableTable::parse(VARIABLES);
        let (quoted, _) =
            substitute_value("font-family", r#""Open Sans", Helvetica, sans-serif"#, &table);
        assert_eq!(quoted, "$body-font");

        let (shorthand, _) = substitute_value(
            "font",
            "700 1rem/1.5 Open Sans, Helvetica, sans-serif",
            &table,
        );
        assert_eq!(shorthand, "700 1rem/1.5 $body-font");

        let (other, count) = substitute_value("content", "\"Georgia, serif\"", &table);
        assert_eq!(other, "\"Georgia, serif\"");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_quotes_around_names_are_stripped() {
        let table = VariableTable::parse("$serif-stack: Georgia, serif;");
        let (value, _) = substitute_value("font-family", "'Georgia, serif'", &table);
        assert_eq!(value, "$serif-stack");
    }

    #[test]
    fn test_second_pass_replaces_nothing() {
        let table = VariableTable::parse(VARIABLES);
        let css = r#"
            .a { color: #1a73e8; border-color: rgb(255, 255, 255); }
            .b { font-family: Georgia, serif; }
            @font-face { font-family: "Open Sans", Helvetica, sans-serif; }
        "#;
        let mut sheet = parse_stylesheet(css, "theme.css").unwrap();
        assert_eq!(substitute(&mut sheet, &table), 4);
        let once = sheet.clone();
        assert_eq!(substitute(&mut sheet, &table), 0);
        assert_eq!(sheet, once);
    }

    #[test]
    fn test_replace_bounded() {
        assert_eq!(
            replace_bounded("serif, sans-serif", "serif", "$s"),
            ("$s, sans-serif".to_string(), 1)
        );
        assert_eq!(replace_bounded("$serif-stack", "serif", "$s").1, 0);
    }
}
