//! Table of Contents extraction from Markdown

use ropey::Rope;
use std::collections::{HashMap, HashSet};

/// A heading in a markdown article
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub line: usize,
    pub anchor: String,
}

/// Extract ATX headings, skipping fenced code blocks.
///
/// Anchors match the `id` attributes written by the block parser for the
/// same document.
pub fn extract_headings(rope: &Rope) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut anchors = AnchorSet::default();
    let mut fence: Option<(char, usize)> = None;

    for (line_idx, line) in rope.lines().enumerate() {
        let line_str: String = line.chunks().collect();
        let trimmed = line_str.trim_end();

        if let Some(open) = fence {
            if is_closing_fence(trimmed, open) {
                fence = None;
            }
            continue;
        }
        if let Some((ch, len, _)) = parse_fence(trimmed) {
            fence = Some((ch, len));
            continue;
        }

        if let Some((level, text)) = parse_atx_heading(trimmed) {
            headings.push(Heading {
                level: level as u8,
                text: text.to_string(),
                line: line_idx,
                anchor: anchors.unique(text),
            });
        }
    }

    headings
}

/// Parse an ATX heading, returning its level and text.
///
/// Requires 1-6 `#` followed by whitespace and non-empty text. A closing
/// run of `#` is dropped.
pub(crate) fn parse_atx_heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with('#') {
        return None;
    }

    let hash_count = trimmed.chars().take_while(|&c| c == '#').count();
    if hash_count > 6 {
        return None;
    }

    let rest = &trimmed[hash_count..];
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }

    let mut text = rest.trim();
    let without_closing = text.trim_end_matches('#');
    if without_closing.len() < text.len()
        && without_closing.ends_with(char::is_whitespace)
    {
        text = without_closing.trim_end();
    }

    if text.is_empty() {
        None
    } else {
        Some((hash_count, text))
    }
}

/// Parse an opening code fence: (fence char, fence length, language)
pub(crate) fn parse_fence(line: &str) -> Option<(char, usize, Option<&str>)> {
    let trimmed = line.trim_start();
    let ch = trimmed.chars().next().filter(|&c| c == '`' || c == '~')?;
    let len = trimmed.chars().take_while(|&c| c == ch).count();
    if len < 3 {
        return None;
    }
    let info = trimmed[len..].trim();
    if ch == '`' && info.contains('`') {
        return None;
    }
    let lang = info.split_whitespace().next();
    Some((ch, len, lang))
}

pub(crate) fn is_closing_fence(line: &str, (ch, len): (char, usize)) -> bool {
    let trimmed = line.trim();
    let run = trimmed.chars().take_while(|&c| c == ch).count();
    run >= len && run == trimmed.chars().count()
}

/// Create an anchor from heading text
pub fn make_anchor(text: &str) -> String {
    let mut anchor = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() || c == '_' {
            anchor.push(c);
        } else if (c.is_whitespace() || c == '-') && !anchor.ends_with('-') {
            anchor.push('-');
        }
    }

    let anchor = anchor.trim_matches('-');
    if anchor.is_empty() {
        "section".to_string()
    } else {
        anchor.to_string()
    }
}

/// Hands out unique anchors for one document (`intro`, `intro-1`, ...)
#[derive(Debug, Default)]
pub struct AnchorSet {
    next_suffix: HashMap<String, usize>,
    used: HashSet<String>,
}

impl AnchorSet {
    pub fn unique(&mut self, text: &str) -> String {
        let base = make_anchor(text);
        let suffix = self.next_suffix.entry(base.clone()).or_insert(0);
        loop {
            let candidate = if *suffix == 0 {
                base.clone()
            } else {
                format!("{}-{}", base, suffix)
            };
            *suffix += 1;
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Render headings as a nested Markdown list of anchor links
pub fn render_toc(headings: &[Heading]) -> String {
    let base = headings.iter().map(|h| h.level).min().unwrap_or(1);
    headings
        .iter()
        .map(|h| {
            let indent = "  ".repeat(usize::from(h.level - base));
            format!("{}- [{}](#{})", indent, h.text, h.anchor)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
