//! Comment filtering for raw stylesheet text.
//!
//! Both filters understand quoted strings, so a `/*` inside `content: "/*"`
//! is left alone.

/// Removes preserved comments (`/*! ... */`) from a whole stylesheet.
///
/// Compilers keep these verbatim, sometimes in the middle of a rule body,
/// so they are dropped before the text reaches the parser.
pub fn strip_preserved_comments(css: &str) -> String {
    strip_comments_where(css, |body| body.starts_with('!'))
}

/// Removes every comment from a raw selector or value fragment.
pub fn strip_comments(fragment: &str) -> String {
    if !fragment.contains("/*") {
        return fragment.to_string();
    }
    strip_comments_where(fragment, |_| true)
}

/// Copies `text`, skipping each comment whose body satisfies `should_strip`.
/// An unterminated comment runs to the end of the input, as in CSS.
fn strip_comments_where<F>(text: &str, should_strip: F) -> String
where
    F: Fn(&str) -> bool,
{
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut rest = text;

    while !rest.is_empty() {
        if let Some(q) = quote {
            let mut chars = rest.char_indices();
            let mut consumed = rest.len();
            while let Some((i, ch)) = chars.next() {
                if ch == '\\' {
                    chars.next();
                    continue;
                }
                if ch == q {
                    consumed = i + ch.len_utf8();
                    quote = None;
                    break;
                }
            }
            out.push_str(&rest[..consumed]);
            rest = &rest[consumed..];
            continue;
        }

        if rest.starts_with("/*") {
            let body_and_tail = &rest[2..];
            let (body, next) = match body_and_tail.find("*/") {
                Some(end) => (&body_and_tail[..end], &body_and_tail[end + 2..]),
                None => (body_and_tail, ""),
            };
            if !should_strip(body) {
                out.push_str(&rest[..rest.len() - next.len()]);
            }
            rest = next;
            continue;
        }

        let ch = rest.chars().next().unwrap_or_default();
        if ch == '"' || ch == '\'' {
            quote = Some(ch);
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    out
}
