//! Colour literal normalization shared by the canonicalizer, the variable
//! mapper and the differ.

use once_cell::sync::Lazy;
use regex::Regex;

/// Hex literals inside arbitrary text. The trailing boundary keeps `#abcdefgh`
/// (not a colour) from matching as `#abcdef`.
pub static HEX_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#[0-9a-fA-F]{3,8}\b").expect("hex literal pattern"));

/// `rgb(...)` / `rgba(...)` literals inside arbitrary text.
pub static RGB_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\brgba?\([^)]*\)").expect("rgb literal pattern"));

/// Lower-cases a hex colour and expands the short forms:
/// `#ABC` becomes `#aabbcc`, `#abcd` becomes `#aabbccdd`.
pub fn normalize_hex(hex: &str) -> String {
    let lower = hex.to_ascii_lowercase();
    let digits = lower.trim_start_matches('#');
    match digits.len() {
        3 | 4 => {
            let mut out = String::with_capacity(digits.len() * 2 + 1);
            out.push('#');
            for ch in digits.chars() {
                out.push(ch);
                out.push(ch);
            }
            out
        }
        _ => format!("#{}", digits),
    }
}

/// Lower-cases every hex literal in `text` and expands only the 3-digit
/// form, leaving the rest untouched. Four-digit runs keep their length:
/// `#face` is as often an id selector as a colour.
pub fn normalize_hex_literals(text: &str) -> String {
    HEX_LITERAL
        .replace_all(text, |caps: &regex::Captures| {
            let hex = &caps[0];
            if hex.len() == 4 {
                normalize_hex(hex)
            } else {
                hex.to_ascii_lowercase()
            }
        })
        .into_owned()
}

/// Normalizes the spelling of an `rgb()`/`rgba()` literal: lower-case name,
/// no padding inside the parentheses and `", "` between components.
pub fn normalize_color_function(literal: &str) -> String {
    let Some(open) = literal.find('(') else {
        return literal.to_string();
    };
    let name = literal[..open].trim().to_ascii_lowercase();
    let inner = literal[open + 1..].trim_end().trim_end_matches(')');
    let parts: Vec<String> = inner
        .split(',')
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    format!("{}({})", name, parts.join(", "))
}

/// Resolves a colour literal to its canonical key: lower-case 6-digit hex.
///
/// Accepts `#rgb`, `#rrggbb`, `#rrggbbff`, and opaque `rgb()`/`rgba()` in
/// comma or space syntax. Anything translucent or unparseable has no key.
pub fn color_key(literal: &str) -> Option<String> {
    let literal = literal.trim();
    if literal.starts_with('#') {
        let hex = normalize_hex(literal);
        let digits = &hex[1..];
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return match digits.len() {
            6 => Some(hex),
            8 if digits.ends_with("ff") => Some(format!("#{}", &digits[..6])),
            _ => None,
        };
    }

    let lower = literal.to_ascii_lowercase();
    let inner = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts: Vec<&str> = inner
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();

    let channels = match parts.as_slice() {
        [r, g, b] => [*r, *g, *b],
        [r, g, b, alpha] if is_opaque(alpha) => [*r, *g, *b],
        _ => return None,
    };

    let mut hex = String::from("#");
    for channel in channels {
        let value: u8 = channel.parse().ok()?;
        hex.push_str(&format!("{:02x}", value));
    }
    Some(hex)
}

fn is_opaque(alpha: &str) -> bool {
    if let Some(percent) = alpha.strip_suffix('%') {
        return percent.parse::<f32>().map(|p| p >= 100.0).unwrap_or(false);
    }
    alpha.parse::<f32>().map(|a| a >= 1.0).unwrap_or(false)
}
