//! Inline span transcoding (bold, italic, strikethrough, code, links, images)
//!
//! Markdown to HTML runs as a series of rewrite passes. Code spans, images
//! and links are swapped out for placeholders as soon as they are rendered,
//! so the emphasis passes that follow can never touch a URL or the inside
//! of a code span.

use log::trace;

use crate::entities::{decode_entities, escape_attr, escape_html, escape_url};
use crate::html::Node;

const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

/// Rendered fragments hidden from later passes
#[derive(Default)]
struct Protected {
    fragments: Vec<String>,
}

impl Protected {
    fn hide(&mut self, html: String) -> String {
        let idx = self.fragments.len();
        self.fragments.push(html);
        format!("{}{}{}", PLACEHOLDER_OPEN, idx, PLACEHOLDER_CLOSE)
    }

    fn restore(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find(PLACEHOLDER_OPEN) {
            out.push_str(&rest[..open]);
            let after = &rest[open + PLACEHOLDER_OPEN.len_utf8()..];
            let fragment = after.find(PLACEHOLDER_CLOSE).and_then(|close| {
                let idx: usize = after[..close].parse().ok()?;
                let fragment = self.fragments.get(idx)?;
                Some((fragment, close))
            });

            match fragment {
                Some((fragment, close)) => {
                    // Fragments may themselves hold placeholders (code inside a link)
                    out.push_str(&self.restore(fragment));
                    rest = &after[close + PLACEHOLDER_CLOSE.len_utf8()..];
                }
                None => {
                    out.push(PLACEHOLDER_OPEN);
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Convert the inline Markdown of a single block's text to HTML
pub fn markdown_inline_to_html(text: &str) -> String {
    let mut protected = Protected::default();

    let text = protect_marker_chars(text, &mut protected);
    let text = protect_code_spans(&text, &mut protected);
    let text = protect_escapes(&text, &mut protected);
    let text = replace_bracketed(&text, BracketKind::Image, &mut protected);
    let text = replace_bracketed(&text, BracketKind::Link, &mut protected);
    let text = apply_emphasis(&text);

    let html = protected.restore(&text);
    trace!("inline {:?} -> {:?}", text, html);
    html
}

/// Bold, italic and strikethrough, in that order
fn apply_emphasis(text: &str) -> String {
    let text = wrap_delimited(text, "**", "strong", false);
    let text = wrap_delimited(&text, "__", "strong", true);
    let text = wrap_delimited(&text, "*", "em", false);
    let text = wrap_delimited(&text, "_", "em", true);
    wrap_delimited(&text, "~~", "del", false)
}

/// Hide marker characters already present in the input so they restore as text
fn protect_marker_chars(text: &str, protected: &mut Protected) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == PLACEHOLDER_OPEN {
            out.push_str(&protected.hide(c.to_string()));
        } else {
            out.push(c);
        }
    }
    out
}

/// `\\*` and friends: any escaped ASCII punctuation is emitted literally
fn protect_escapes(text: &str, protected: &mut Protected) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(&next) if c == '\\' && next.is_ascii_punctuation() => {
                chars.next();
                out.push_str(&protected.hide(escape_html(&next.to_string())));
            }
            _ => out.push(c),
        }
    }
    out
}

fn protect_code_spans(text: &str, protected: &mut Protected) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('`') {
        out.push_str(&rest[..open]);
        let run = backtick_run(&rest[open..]);
        let body_start = open + run;

        match find_backtick_run(&rest[body_start..], run) {
            Some(close) => {
                let mut code = &rest[body_start..body_start + close];
                if code.len() >= 2 && code.starts_with(' ') && code.ends_with(' ') {
                    code = &code[1..code.len() - 1];
                }
                let html = format!("<code>{}</code>", escape_html(code));
                out.push_str(&protected.hide(html));
                rest = &rest[body_start + close + run..];
            }
            None => {
                out.push_str(&rest[open..body_start]);
                rest = &rest[body_start..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn backtick_run(s: &str) -> usize {
    s.bytes().take_while(|&b| b == b'`').count()
}

/// Offset of the next backtick run of exactly `len` characters
fn find_backtick_run(s: &str, len: usize) -> Option<usize> {
    let mut offset = 0;
    while let Some(i) = s[offset..].find('`') {
        let start = offset + i;
        let run = backtick_run(&s[start..]);
        if run == len {
            return Some(start);
        }
        offset = start + run;
    }
    None
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BracketKind {
    Image,
    Link,
}

/// Replace `![alt](url "title")` or `[text](url "title")` constructs
fn replace_bracketed(text: &str, kind: BracketKind, protected: &mut Protected) -> String {
    let opener = match kind {
        BracketKind::Image => "![",
        BracketKind::Link => "[",
    };
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find(opener) {
        let label_start = open + opener.len();
        let parsed = parse_bracketed(&rest[label_start..]);

        match parsed {
            Some((label, dest, consumed)) => {
                out.push_str(&rest[..open]);
                let (url, title) = split_destination(dest);
                let plain = |s: &str| decode_entities(&protected.restore(s)).into_owned();
                let title_attr = title
                    .map(|t| format!(" title=\"{}\"", escape_attr(&plain(t))))
                    .unwrap_or_default();
                let html = match kind {
                    BracketKind::Image => format!(
                        "<img src=\"{}\" alt=\"{}\"{} />",
                        escape_url(&plain(url)),
                        escape_attr(&plain(label)),
                        title_attr
                    ),
                    BracketKind::Link => format!(
                        "<a href=\"{}\"{}>{}</a>",
                        escape_url(&plain(url)),
                        title_attr,
                        apply_emphasis(label)
                    ),
                };
                out.push_str(&protected.hide(html));
                rest = &rest[label_start + consumed..];
            }
            None => {
                out.push_str(&rest[..label_start]);
                rest = &rest[label_start..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Parse `label](dest)` and return (label, dest, bytes consumed)
fn parse_bracketed(s: &str) -> Option<(&str, &str, usize)> {
    let close = s.find(']')?;
    let label = &s[..close];
    if label.contains('[') {
        return None;
    }
    let after = &s[close + 1..];
    if !after.starts_with('(') {
        return None;
    }
    let dest_end = after.find(')')?;
    let dest = after[1..dest_end].trim();
    Some((label, dest, close + 1 + dest_end + 1))
}

/// Split `url "title"` into its parts
fn split_destination(dest: &str) -> (&str, Option<&str>) {
    if let Some(space) = dest.find(char::is_whitespace) {
        let title = dest[space..].trim();
        if title.len() >= 2 && title.starts_with('"') && title.ends_with('"') {
            return (&dest[..space], Some(&title[1..title.len() - 1]));
        }
    }
    (dest, None)
}

/// Wrap text between paired delimiters in `<tag>`.
///
/// Content must be non-empty and may not start or end with whitespace.
/// With `word_bound` the delimiters only count outside words, which keeps
/// `snake_case_names` literal.
fn wrap_delimited(text: &str, delim: &str, tag: &str, word_bound: bool) -> String {
    let delim_char = delim.chars().next().unwrap_or('*');
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find(delim) {
        let content_start = open + delim.len();

        let opens = {
            let before = rest[..open].chars().next_back();
            let first = rest[content_start..].chars().next();
            match first {
                None => false,
                Some(c) if c.is_whitespace() => false,
                Some(_) => !(word_bound && before.is_some_and(char::is_alphanumeric)),
            }
        };

        let close = opens
            .then(|| find_closing(rest, content_start, delim, delim_char, word_bound))
            .flatten();

        match close {
            Some(close) => {
                out.push_str(&rest[..open]);
                out.push('<');
                out.push_str(tag);
                out.push('>');
                out.push_str(&rest[content_start..close]);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
                rest = &rest[close + delim.len()..];
            }
            None => {
                out.push_str(&rest[..content_start]);
                rest = &rest[content_start..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn find_closing(
    s: &str,
    content_start: usize,
    delim: &str,
    delim_char: char,
    word_bound: bool,
) -> Option<usize> {
    let first_len = s[content_start..].chars().next()?.len_utf8();
    let mut from = content_start + first_len;

    while let Some(i) = s[from..].find(delim) {
        let mut close = from + i;
        // Prefer the end of a run so `***x***` nests instead of tangling
        while s[close + delim.len()..].starts_with(delim_char) {
            close += delim_char.len_utf8();
        }

        let before = s[..close].chars().next_back();
        let after = s[close + delim.len()..].chars().next();
        let valid = !before.is_some_and(char::is_whitespace)
            && !(word_bound && after.is_some_and(char::is_alphanumeric));
        if valid {
            return Some(close);
        }
        from = close + delim.len();
    }
    None
}

/// Render inline HTML nodes back to Markdown
pub fn inline_markdown(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        push_inline(node, &mut out);
    }
    out
}

pub(crate) fn push_inline(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => {
            let collapsed = collapse_whitespace(text);
            let text = if out.ends_with(' ') || out.ends_with('\n') {
                collapsed.trim_start_matches(' ')
            } else {
                collapsed.as_str()
            };
            let at_line_start = out.is_empty() || out.ends_with('\n');
            let before = out.chars().next_back();
            out.push_str(&escape_markdown(text, at_line_start, before));
        }
        Node::Element(el) => match el.name.as_str() {
            "strong" | "b" => push_wrapped(out, "**", "**", &el.children),
            "em" | "i" => push_wrapped(out, "*", "*", &el.children),
            "del" | "s" | "strike" => push_wrapped(out, "~~", "~~", &el.children),
            "u" => push_wrapped(out, "<u>", "</u>", &el.children),
            "code" => push_code_span(out, &el.text_content()),
            "a" => {
                let label = inline_markdown(&el.children);
                match el.attr("href") {
                    Some(href) => {
                        out.push('[');
                        out.push_str(label.trim());
                        out.push_str("](");
                        out.push_str(href);
                        if let Some(title) = el.attr("title") {
                            out.push_str(" \"");
                            out.push_str(title);
                            out.push('"');
                        }
                        out.push(')');
                    }
                    None => out.push_str(&label),
                }
            }
            "img" => {
                out.push_str("![");
                out.push_str(el.attr("alt").unwrap_or(""));
                out.push_str("](");
                out.push_str(el.attr("src").unwrap_or(""));
                if let Some(title) = el.attr("title") {
                    out.push_str(" \"");
                    out.push_str(title);
                    out.push('"');
                }
                out.push(')');
            }
            "br" => out.push('\n'),
            "input" | "script" | "style" => {}
            _ => {
                for child in &el.children {
                    push_inline(child, out);
                }
            }
        },
    }
}

/// Emit `open inner close`, keeping surrounding whitespace outside the markers
fn push_wrapped(out: &mut String, open: &str, close: &str, children: &[Node]) {
    let inner = inline_markdown(children);
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        out.push_str(&inner);
        return;
    }
    if inner.starts_with(char::is_whitespace) && !out.ends_with(' ') {
        out.push(' ');
    }
    out.push_str(open);
    out.push_str(trimmed);
    out.push_str(close);
    if inner.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

fn push_code_span(out: &mut String, code: &str) {
    let longest = code
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest + 1);
    let pad = if code.starts_with('`') || code.ends_with('`') {
        " "
    } else {
        ""
    };
    out.push_str(&fence);
    out.push_str(pad);
    out.push_str(code);
    out.push_str(pad);
    out.push_str(&fence);
}

/// Backslash-escape text that would otherwise read back as Markdown syntax
fn escape_markdown(text: &str, at_line_start: bool, before: Option<char>) -> String {
    let chars: Vec<char> = text.chars().collect();
    let lead = chars.iter().take_while(|&&c| c == ' ').count();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        let prev = if i == 0 { before } else { Some(chars[i - 1]) };
        let next = chars.get(i + 1).copied();
        let line_start = at_line_start && i == lead;
        let escape = match c {
            '\\' | '*' | '[' | '<' => true,
            '_' => !(prev.is_some_and(char::is_alphanumeric) && next.is_some_and(char::is_alphanumeric)),
            '~' => prev == Some('~') || next == Some('~'),
            '#' | '>' => line_start,
            '-' => line_start && next.map_or(true, |n| n == ' ' || n == '-'),
            '.' => {
                at_line_start
                    && i > lead
                    && chars[lead..i].iter().all(char::is_ascii_digit)
                    && next.map_or(true, |n| n == ' ')
            }
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
