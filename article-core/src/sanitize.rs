//! Denylist HTML sanitizer for preview rendering
//!
//! The sanitizer removes the executable constructs it knows about and
//! leaves every other byte of the markup alone:
//! - `<script>` elements, including nested and unterminated ones
//! - `on*` event handler attributes
//! - `javascript:` URLs in `href` / `xlink:href` (replaced with `#`)
//! - `data:` URLs in `src` (replaced with an empty value)
//! - a tag left unterminated at the end of the input
//!
//! It is not an allowlist and does not promise complete XSS protection
//! against arbitrary markup. Passes repeat until the output stops
//! changing, so sanitizing twice gives the same result as sanitizing once.

use log::{debug, warn};

use crate::entities::decode_entities;
use crate::html::{find_ignore_ascii_case, Attribute, Token, Tokenizer};
use crate::security::SecurityEvent;

const SOURCE: &str = "sanitizer";

/// Upper bound on fixpoint passes; clean input settles after one
const MAX_PASSES: usize = 16;

/// Clean HTML for preview
pub fn sanitize_html(html: &str) -> String {
    sanitize_html_with_report(html).0
}

/// Clean HTML and describe everything that was removed or rewritten
pub fn sanitize_html_with_report(html: &str) -> (String, Vec<SecurityEvent>) {
    let mut events = Vec::new();
    let mut current = html.to_string();

    for pass in 0..MAX_PASSES {
        let next = sanitize_pass(&current, &mut events);
        if next == current {
            debug!("sanitize settled after {} pass(es)", pass + 1);
            break;
        }
        current = next;
    }

    (current, events)
}

fn sanitize_pass(html: &str, events: &mut Vec<SecurityEvent>) -> String {
    let without_scripts = strip_scripts(html, events);
    rewrite_attributes(&without_scripts, events)
}

fn report(events: &mut Vec<SecurityEvent>, message: String) {
    warn!("{}", message);
    events.push(SecurityEvent::warning(message, SOURCE));
}

/// Byte offset of the next `<script` start tag (not `<scripts` etc.)
fn find_script_open(html: &str, from: usize) -> Option<usize> {
    let mut from = from;
    while let Some(pos) = find_ignore_ascii_case(html, "<script", from) {
        let after = html.as_bytes().get(pos + "<script".len());
        match after {
            None => return Some(pos),
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => return Some(pos),
            Some(_) => from = pos + 1,
        }
    }
    None
}

/// Remove script elements until none remain, then any stray `</script>` tags
fn strip_scripts(html: &str, events: &mut Vec<SecurityEvent>) -> String {
    let mut out = html.to_string();

    while let Some(start) = find_script_open(&out, 0) {
        let end = match find_ignore_ascii_case(&out, "</script", start + 1) {
            Some(close) => out[close..]
                .find('>')
                .map(|i| close + i + 1)
                .unwrap_or(out.len()),
            None => out.len(),
        };
        out.replace_range(start..end, "");
        report(events, "Removed <script> element".to_string());
    }

    while let Some(start) = find_ignore_ascii_case(&out, "</script", 0) {
        let end = out[start..]
            .find('>')
            .map(|i| start + i + 1)
            .unwrap_or(out.len());
        out.replace_range(start..end, "");
        report(events, "Removed stray </script> tag".to_string());
    }

    out
}

/// What to do with one attribute
enum AttrVerdict {
    Keep,
    Drop,
    Replace(&'static str),
}

fn is_event_handler(name: &str) -> bool {
    name.len() > 2 && name.starts_with("on")
}

/// Strip whitespace and control characters, including the ones browsers
/// ignore inside a URL scheme, and decode entities before comparing
fn normalized_url(value: &str) -> String {
    decode_entities(value)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn judge(attr: &Attribute) -> AttrVerdict {
    let name = attr.name.as_str();
    if is_event_handler(name) {
        return AttrVerdict::Drop;
    }
    match name {
        "href" | "xlink:href" if normalized_url(&attr.decoded_value()).starts_with("javascript:") => {
            AttrVerdict::Replace("#")
        }
        "src" if normalized_url(&attr.decoded_value()).starts_with("data:") => {
            AttrVerdict::Replace("")
        }
        _ => AttrVerdict::Keep,
    }
}

/// Re-emit the markup, rebuilding only start tags with unsafe attributes
fn rewrite_attributes(html: &str, events: &mut Vec<SecurityEvent>) -> String {
    let mut out = String::with_capacity(html.len());
    let mut consumed = 0;

    for token in Tokenizer::new(html) {
        let span = token.span();
        consumed = span.end;

        let Token::StartTag {
            name,
            attrs,
            self_closing,
            ..
        } = &token
        else {
            out.push_str(&html[span]);
            continue;
        };

        let verdicts: Vec<AttrVerdict> = attrs.iter().map(judge).collect();
        if verdicts.iter().all(|v| matches!(v, AttrVerdict::Keep)) {
            out.push_str(&html[span]);
            continue;
        }

        out.push('<');
        out.push_str(name);
        for (attr, verdict) in attrs.iter().zip(&verdicts) {
            match verdict {
                AttrVerdict::Keep => {
                    out.push(' ');
                    out.push_str(&html[attr.span.clone()]);
                }
                AttrVerdict::Drop => {
                    report(
                        events,
                        format!("Removed event handler attribute {} on <{}>", attr.name, name),
                    );
                }
                AttrVerdict::Replace(value) => {
                    report(
                        events,
                        format!("Neutralized {} URL on <{}>", attr.name, name),
                    );
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    out.push_str(value);
                    out.push('"');
                }
            }
        }
        out.push_str(if *self_closing { " />" } else { ">" });
    }

    if consumed < html.len() {
        report(events, "Dropped unterminated tag at end of input".to_string());
    }

    out
}
