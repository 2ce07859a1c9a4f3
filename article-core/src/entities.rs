//! HTML entity table and escaping helpers

use std::borrow::Cow;

use pulldown_cmark_escape::{escape_href, escape_html_body_text};

/// Named entities understood when reading HTML back into Markdown.
/// Read-only; lookups are linear since the table is small.
const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", "\u{00A0}"),
    ("mdash", "\u{2014}"),
    ("ndash", "\u{2013}"),
    ("hellip", "\u{2026}"),
    ("copy", "\u{00A9}"),
    ("reg", "\u{00AE}"),
    ("trade", "\u{2122}"),
    ("lsquo", "\u{2018}"),
    ("rsquo", "\u{2019}"),
    ("ldquo", "\u{201C}"),
    ("rdquo", "\u{201D}"),
    ("laquo", "\u{00AB}"),
    ("raquo", "\u{00BB}"),
    ("bull", "\u{2022}"),
    ("middot", "\u{00B7}"),
    ("deg", "\u{00B0}"),
    ("plusmn", "\u{00B1}"),
    ("times", "\u{00D7}"),
    ("divide", "\u{00F7}"),
    ("sect", "\u{00A7}"),
    ("para", "\u{00B6}"),
    ("euro", "\u{20AC}"),
    ("pound", "\u{00A3}"),
    ("yen", "\u{00A5}"),
    ("cent", "\u{00A2}"),
    ("larr", "\u{2190}"),
    ("rarr", "\u{2192}"),
    ("uarr", "\u{2191}"),
    ("darr", "\u{2193}"),
    ("harr", "\u{2194}"),
    ("frac12", "\u{00BD}"),
    ("frac14", "\u{00BC}"),
    ("frac34", "\u{00BE}"),
    ("iexcl", "\u{00A1}"),
    ("iquest", "\u{00BF}"),
    ("shy", "\u{00AD}"),
    ("ensp", "\u{2002}"),
    ("emsp", "\u{2003}"),
    ("thinsp", "\u{2009}"),
];

/// Longest entity body we bother looking for a terminating `;`
const MAX_ENTITY_LEN: usize = 32;

/// Look up a named entity (without `&` and `;`)
pub fn lookup_entity(name: &str) -> Option<&'static str> {
    NAMED_ENTITIES
        .iter()
        .find(|(entity, _)| *entity == name)
        .map(|(_, value)| *value)
}

/// Decode named and numeric character references.
///
/// Unknown names and malformed references are left exactly as written.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];

        match decode_reference(after) {
            Some((decoded, consumed)) => {
                out.push_str(&decoded);
                rest = &after[consumed..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

/// Decode the reference that follows an `&`. Returns the replacement and the
/// number of bytes consumed (including the `;`).
fn decode_reference(after: &str) -> Option<(String, usize)> {
    let semi = after
        .char_indices()
        .take(MAX_ENTITY_LEN)
        .find(|&(_, c)| c == ';')
        .map(|(i, _)| i)?;
    let body = &after[..semi];

    if let Some(numeric) = body.strip_prefix('#') {
        let hex = numeric
            .strip_prefix('x')
            .or_else(|| numeric.strip_prefix('X'));
        let code = if let Some(hex) = hex {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            numeric.parse::<u32>().ok()?
        };
        let ch = char::from_u32(code).filter(|&c| c != '\0')?;
        return Some((ch.to_string(), semi + 1));
    }

    if body.is_empty() || !body.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    lookup_entity(body).map(|value| (value.to_string(), semi + 1))
}

/// Escape text for use as HTML element content
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    escape_html_body_text(&mut out, input)
        .map(|()| out)
        .unwrap_or_default()
}

/// Escape text for use inside a quoted attribute value
pub fn escape_attr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    pulldown_cmark_escape::escape_html(&mut out, input)
        .map(|()| out)
        .unwrap_or_default()
}

/// Escape a link or image destination for an `href`/`src` attribute
pub fn escape_url(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    escape_href(&mut out, input).map(|()| out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_common_entities() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&lt;p&gt;"), "<p>");
        assert_eq!(decode_entities("&quot;hi&quot;"), "\"hi\"");
        assert_eq!(decode_entities("x&mdash;y&ndash;z"), "x\u{2014}y\u{2013}z");
        assert_eq!(decode_entities("&copy; &reg; &trade;"), "\u{a9} \u{ae} \u{2122}");
        assert_eq!(decode_entities("a&nbsp;b"), "a\u{a0}b");
    }

    #[test]
    fn test_decode_numeric() {
        assert_eq!(decode_entities("&#39;"), "'");
        assert_eq!(decode_entities("&#x27;&#X41;"), "'A");
        assert_eq!(decode_entities("&#0;"), "&#0;");
        assert_eq!(decode_entities("&#xZZ;"), "&#xZZ;");
    }

    #[test]
    fn test_unknown_entities_pass_through() {
        assert_eq!(decode_entities("&bogus; &amp"), "&bogus; &amp");
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
        assert_eq!(decode_entities("&&amp;"), "&&");
    }

    #[test]
    fn test_no_ampersand_borrows() {
        assert!(matches!(decode_entities("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape_html("<a & b>"), "&lt;a &amp; b&gt;");
        assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
        assert_eq!(escape_attr("it's"), "it&#39;s");
    }

    #[test]
    fn test_escape_url() {
        assert_eq!(escape_url("https://x.org/?a=1&b=2"), "https://x.org/?a=1&amp;b=2");
        assert_eq!(escape_url("a b\"<c>"), "a%20b%22%3Cc%3E");
        assert_eq!(escape_url("/caf\u{e9}"), "/caf%C3%A9");
        assert_eq!(escape_url("javascript:alert(1)"), "javascript:alert(1)");
    }
}
