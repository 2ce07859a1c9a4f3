//! Toolbar action engine
//!
//! Given the content, a selection and an action, compute the new content and
//! the new selection. All offsets are character offsets; edits are applied
//! to a `Rope` as one replacement of the selected range.

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use log::debug;
use ropey::Rope;
use serde::{Deserialize, Serialize};

use crate::block::{parse_list_item, ListKind};
use crate::entities::{escape_attr, escape_url};
use crate::mode::EditorMode;
use crate::selection::TextSelection;
use crate::toc::parse_atx_heading;

const TEXT_PLACEHOLDER: &str = "text";
const LINK_TEXT_PLACEHOLDER: &str = "link text";
const IMAGE_ALT_PLACEHOLDER: &str = "image";
const URL_PLACEHOLDER: &str = "https://";

/// A formatting command issued from the toolbar or a shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolbarAction {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    H1,
    H2,
    H3,
    Ul,
    Ol,
    Quote,
    CodeBlock,
    Hr,
    Link,
    Image,
}

impl ToolbarAction {
    pub const ALL: [ToolbarAction; 15] = [
        ToolbarAction::Bold,
        ToolbarAction::Italic,
        ToolbarAction::Underline,
        ToolbarAction::Strikethrough,
        ToolbarAction::Code,
        ToolbarAction::H1,
        ToolbarAction::H2,
        ToolbarAction::H3,
        ToolbarAction::Ul,
        ToolbarAction::Ol,
        ToolbarAction::Quote,
        ToolbarAction::CodeBlock,
        ToolbarAction::Hr,
        ToolbarAction::Link,
        ToolbarAction::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolbarAction::Bold => "bold",
            ToolbarAction::Italic => "italic",
            ToolbarAction::Underline => "underline",
            ToolbarAction::Strikethrough => "strikethrough",
            ToolbarAction::Code => "code",
            ToolbarAction::H1 => "h1",
            ToolbarAction::H2 => "h2",
            ToolbarAction::H3 => "h3",
            ToolbarAction::Ul => "ul",
            ToolbarAction::Ol => "ol",
            ToolbarAction::Quote => "quote",
            ToolbarAction::CodeBlock => "codeblock",
            ToolbarAction::Hr => "hr",
            ToolbarAction::Link => "link",
            ToolbarAction::Image => "image",
        }
    }

    /// Inline actions wrap a span within a line
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            ToolbarAction::Bold
                | ToolbarAction::Italic
                | ToolbarAction::Underline
                | ToolbarAction::Strikethrough
                | ToolbarAction::Code
        )
    }
}

impl fmt::Display for ToolbarAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolbarAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        match ToolbarAction::ALL.iter().find(|action| action.as_str() == name) {
            Some(action) => Ok(*action),
            None => anyhow::bail!("Unknown toolbar action: {}", s),
        }
    }
}

/// Input to the engine
#[derive(Debug, Clone)]
pub struct ToolbarOptions<'a> {
    pub content: &'a str,
    pub selection: TextSelection,
    pub mode: EditorMode,
    pub action: ToolbarAction,
    /// Link target or image source
    pub url: Option<&'a str>,
    /// Image alt text
    pub alt: Option<&'a str>,
}

/// Output of the engine; `new_selection_start <= new_selection_end <= len(new_content)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarActionResult {
    pub new_content: String,
    pub new_selection_start: usize,
    pub new_selection_end: usize,
}

/// Replace `range` with `text` and select `select` (relative to the start of `text`)
struct Edit {
    range: Range<usize>,
    text: String,
    select: Range<usize>,
}

/// Text under construction, tracking its length in chars
#[derive(Default)]
struct Snippet {
    text: String,
    len: usize,
}

impl Snippet {
    fn push(&mut self, s: &str) -> Range<usize> {
        let start = self.len;
        self.text.push_str(s);
        self.len += s.chars().count();
        start..self.len
    }

    fn into_edit(self, range: Range<usize>, select: Range<usize>) -> Edit {
        Edit {
            range,
            text: self.text,
            select,
        }
    }
}

/// Apply a toolbar action
pub fn apply_toolbar_action(options: &ToolbarOptions<'_>) -> ToolbarActionResult {
    let selection = options.selection.clamp_to(options.content);
    let mut rope = Rope::from_str(options.content);

    let edit = match options.action {
        ToolbarAction::Bold
        | ToolbarAction::Italic
        | ToolbarAction::Underline
        | ToolbarAction::Strikethrough
        | ToolbarAction::Code => inline_edit(options.action, options.mode, &selection),
        ToolbarAction::H1
        | ToolbarAction::H2
        | ToolbarAction::H3
        | ToolbarAction::Ul
        | ToolbarAction::Ol
        | ToolbarAction::Quote
        | ToolbarAction::CodeBlock => block_edit(&rope, options.action, options.mode, &selection),
        ToolbarAction::Hr => rule_edit(&rope, options.mode, &selection),
        ToolbarAction::Link => link_edit(options, &selection),
        ToolbarAction::Image => image_edit(options, &selection),
    };

    debug!(
        "{} ({}) replaces chars {:?} with {} chars",
        options.action,
        options.mode,
        edit.range,
        edit.text.chars().count()
    );

    let start = edit.range.start;
    rope.remove(edit.range);
    rope.insert(start, &edit.text);

    ToolbarActionResult {
        new_content: rope.to_string(),
        new_selection_start: start + edit.select.start,
        new_selection_end: start + edit.select.end,
    }
}

/// Apply an action given by name; unknown names leave everything unchanged
pub fn apply_named_toolbar_action(
    content: &str,
    selection: &TextSelection,
    mode: EditorMode,
    name: &str,
    url: Option<&str>,
    alt: Option<&str>,
) -> ToolbarActionResult {
    match name.parse::<ToolbarAction>() {
        Ok(action) => apply_toolbar_action(&ToolbarOptions {
            content,
            selection: selection.clone(),
            mode,
            action,
            url,
            alt,
        }),
        Err(err) => {
            debug!("{}; content left unchanged", err);
            let selection = selection.clamp_to(content);
            ToolbarActionResult {
                new_content: content.to_string(),
                new_selection_start: selection.start,
                new_selection_end: selection.end,
            }
        }
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.is_empty())
}

fn selected_or<'a>(selection: &'a TextSelection, fallback: &'a str) -> &'a str {
    if selection.is_empty() {
        fallback
    } else {
        &selection.text
    }
}

fn at_line_start(rope: &Rope, pos: usize) -> bool {
    pos == 0 || rope.get_char(pos - 1) == Some('\n')
}

fn inline_markers(action: ToolbarAction, mode: EditorMode) -> (String, String) {
    match mode {
        EditorMode::Html => {
            let tag = match action {
                ToolbarAction::Bold => "strong",
                ToolbarAction::Italic => "em",
                ToolbarAction::Underline => "u",
                ToolbarAction::Strikethrough => "del",
                _ => "code",
            };
            (format!("<{}>", tag), format!("</{}>", tag))
        }
        EditorMode::Markdown => {
            let (open, close) = match action {
                ToolbarAction::Bold => ("**", "**"),
                ToolbarAction::Italic => ("*", "*"),
                // No markdown underline; only the opening tag is emitted
                ToolbarAction::Underline => ("<u>", ""),
                ToolbarAction::Strikethrough => ("~~", "~~"),
                _ => ("`", "`"),
            };
            (open.to_string(), close.to_string())
        }
    }
}

fn inline_edit(action: ToolbarAction, mode: EditorMode, selection: &TextSelection) -> Edit {
    let (open, close) = inline_markers(action, mode);
    let mut snippet = Snippet::default();
    snippet.push(&open);
    let select = snippet.push(selected_or(selection, TEXT_PLACEHOLDER));
    snippet.push(&close);
    snippet.into_edit(selection.start..selection.end, select)
}

fn block_edit(
    rope: &Rope,
    action: ToolbarAction,
    mode: EditorMode,
    selection: &TextSelection,
) -> Edit {
    let mut snippet = Snippet::default();
    if !at_line_start(rope, selection.start) {
        snippet.push("\n");
    }
    let select = match mode {
        EditorMode::Html => html_block(&mut snippet, action, selection),
        EditorMode::Markdown => markdown_block(&mut snippet, action, selection),
    };
    snippet.into_edit(selection.start..selection.end, select)
}

fn html_block(snippet: &mut Snippet, action: ToolbarAction, selection: &TextSelection) -> Range<usize> {
    match action {
        ToolbarAction::Ul | ToolbarAction::Ol => {
            let tag = if action == ToolbarAction::Ul { "ul" } else { "ol" };
            let mut items: Vec<&str> = selection
                .text
                .split('\n')
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect();
            if items.is_empty() {
                items.push("List item");
            }

            snippet.push(&format!("<{}>\n", tag));
            let mut select: Option<Range<usize>> = None;
            for item in items {
                snippet.push("<li>");
                let range = snippet.push(item);
                select = Some(match select {
                    Some(first) => first.start..range.end,
                    None => range,
                });
                snippet.push("</li>\n");
            }
            snippet.push(&format!("</{}>", tag));
            select.unwrap_or_default()
        }
        _ => {
            let (tag, placeholder) = match action {
                ToolbarAction::H1 => ("h1", "Heading"),
                ToolbarAction::H2 => ("h2", "Heading"),
                ToolbarAction::H3 => ("h3", "Heading"),
                ToolbarAction::Quote => ("blockquote", "Quote"),
                _ => ("pre", "code"),
            };
            if tag == "pre" {
                snippet.push("<pre><code>");
                let select = snippet.push(selected_or(selection, placeholder));
                snippet.push("</code></pre>");
                select
            } else {
                snippet.push(&format!("<{}>", tag));
                let select = snippet.push(selected_or(selection, placeholder));
                snippet.push(&format!("</{}>", tag));
                select
            }
        }
    }
}

fn line_marker(action: ToolbarAction, number: usize) -> String {
    match action {
        ToolbarAction::H1 => "# ".to_string(),
        ToolbarAction::H2 => "## ".to_string(),
        ToolbarAction::H3 => "### ".to_string(),
        ToolbarAction::Ul => "- ".to_string(),
        ToolbarAction::Ol => format!("{}. ", number),
        _ => "> ".to_string(),
    }
}

/// Line text once a marker of the same family as `action` is swapped out.
/// Headings replace headings and lists replace lists, keeping a task box.
/// Anything else, quotes included, is prefixed untouched.
fn block_line_text(action: ToolbarAction, line: &str) -> Cow<'_, str> {
    match action {
        ToolbarAction::H1 | ToolbarAction::H2 | ToolbarAction::H3 => {
            match parse_atx_heading(line) {
                Some((_, text)) => Cow::Borrowed(text),
                None => Cow::Borrowed(line),
            }
        }
        ToolbarAction::Ul | ToolbarAction::Ol => match parse_list_item(line) {
            Some(item) if item.kind == ListKind::Task => {
                let mark = if item.checked { 'x' } else { ' ' };
                Cow::Owned(format!("[{}] {}", mark, item.text))
            }
            Some(item) => Cow::Borrowed(item.text),
            None => Cow::Borrowed(line),
        },
        _ => Cow::Borrowed(line),
    }
}

fn markdown_block(
    snippet: &mut Snippet,
    action: ToolbarAction,
    selection: &TextSelection,
) -> Range<usize> {
    if action == ToolbarAction::CodeBlock {
        let longest_run = selection
            .text
            .split(|c| c != '`')
            .map(str::len)
            .max()
            .unwrap_or(0);
        let fence = "`".repeat((longest_run + 1).max(3));
        snippet.push(&fence);
        snippet.push("\n");
        let select = snippet.push(&selection.text);
        snippet.push("\n");
        snippet.push(&fence);
        return select;
    }

    if selection.text.trim().is_empty() {
        let marker = snippet.push(&line_marker(action, 1));
        return marker.end..marker.end;
    }

    let mut number = 0;
    let mut first_text: Option<usize> = None;
    for (i, line) in selection.text.split('\n').enumerate() {
        if i > 0 {
            snippet.push("\n");
        }
        if line.trim().is_empty() {
            snippet.push(line);
            continue;
        }
        number += 1;
        let marker = snippet.push(&line_marker(action, number));
        first_text.get_or_insert(marker.end);
        snippet.push(&block_line_text(action, line));
    }
    first_text.unwrap_or(0)..snippet.len
}

fn rule_edit(rope: &Rope, mode: EditorMode, selection: &TextSelection) -> Edit {
    let pos = selection.end;
    let mut snippet = Snippet::default();

    match mode {
        EditorMode::Html => {
            if !at_line_start(rope, pos) {
                snippet.push("\n");
            }
            snippet.push("<hr />\n");
        }
        EditorMode::Markdown => {
            let before = if pos == 0 {
                ""
            } else if rope.get_char(pos - 1) != Some('\n') {
                "\n\n"
            } else if pos == 1 || rope.get_char(pos - 2) == Some('\n') {
                ""
            } else {
                "\n"
            };
            snippet.push(before);
            snippet.push("---\n");
            if rope.get_char(pos).is_some_and(|c| c != '\n') {
                snippet.push("\n");
            }
        }
    }

    let end = snippet.len;
    snippet.into_edit(pos..pos, end..end)
}

fn link_edit(options: &ToolbarOptions<'_>, selection: &TextSelection) -> Edit {
    let label = selected_or(selection, LINK_TEXT_PLACEHOLDER);
    let url = non_empty(options.url);
    let href = url.unwrap_or(URL_PLACEHOLDER);

    let mut snippet = Snippet::default();
    let (label_range, url_range) = match options.mode {
        EditorMode::Html => {
            snippet.push("<a href=\"");
            let url_range = snippet.push(&escape_url(href));
            snippet.push("\">");
            let label_range = snippet.push(label);
            snippet.push("</a>");
            (label_range, url_range)
        }
        EditorMode::Markdown => {
            snippet.push("[");
            let label_range = snippet.push(label);
            snippet.push("](");
            let url_range = snippet.push(href);
            snippet.push(")");
            (label_range, url_range)
        }
    };

    let select = if url.is_some() { label_range } else { url_range };
    snippet.into_edit(selection.start..selection.end, select)
}

fn image_edit(options: &ToolbarOptions<'_>, selection: &TextSelection) -> Edit {
    let alt = non_empty(options.alt).unwrap_or_else(|| selected_or(selection, IMAGE_ALT_PLACEHOLDER));
    let url = non_empty(options.url);
    let src = url.unwrap_or(URL_PLACEHOLDER);

    let mut snippet = Snippet::default();
    let (alt_range, url_range) = match options.mode {
        EditorMode::Html => {
            snippet.push("<img src=\"");
            let url_range = snippet.push(&escape_url(src));
            snippet.push("\" alt=\"");
            let alt_range = snippet.push(&escape_attr(alt));
            snippet.push("\" />");
            (alt_range, url_range)
        }
        EditorMode::Markdown => {
            snippet.push("![");
            let alt_range = snippet.push(alt);
            snippet.push("](");
            let url_range = snippet.push(src);
            snippet.push(")");
            (alt_range, url_range)
        }
    };

    let select = if url.is_some() { alt_range } else { url_range };
    snippet.into_edit(selection.start..selection.end, select)
}
