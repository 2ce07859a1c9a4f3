//! Markdown to HTML block parser
//!
//! The parser is a small state machine driven one line at a time. Each
//! line either extends the open block or flushes it and opens a new one.
//! The state lives in a [`BlockParser`] built fresh for every call to
//! [`markdown_to_html`].

use log::{debug, trace};
use std::mem;

use crate::entities::{escape_attr, escape_html};
use crate::inline::markdown_inline_to_html;
use crate::toc::{is_closing_fence, parse_atx_heading, parse_fence, AnchorSet};

/// Convert a Markdown document to HTML.
///
/// Blank input yields an empty string.
pub fn markdown_to_html(markdown: &str) -> String {
    if markdown.trim().is_empty() {
        return String::new();
    }

    let mut parser = BlockParser::default();
    parser.feed(markdown);
    let html = parser.finish();
    debug!(
        "markdown_to_html: {} bytes in, {} bytes out",
        markdown.len(),
        html.len()
    );
    html
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered,
    Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ListFrame {
    kind: ListKind,
    indent: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    fn as_str(&self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
        }
    }
}

#[derive(Debug, Default)]
struct TableBuilder {
    header: Vec<String>,
    aligns: Vec<Option<Align>>,
    rows: Vec<Vec<String>>,
    awaiting_separator: bool,
}

/// Parser state between lines
#[derive(Debug, Default)]
enum BlockState {
    #[default]
    Idle,
    Paragraph(Vec<String>),
    List {
        frames: Vec<ListFrame>,
        html: String,
    },
    Blockquote(Vec<String>),
    Code {
        fence: (char, usize),
        lang: Option<String>,
        lines: Vec<String>,
    },
    Table(TableBuilder),
}

impl BlockState {
    fn name(&self) -> &'static str {
        match self {
            BlockState::Idle => "idle",
            BlockState::Paragraph(_) => "paragraph",
            BlockState::List { .. } => "list",
            BlockState::Blockquote(_) => "blockquote",
            BlockState::Code { .. } => "code",
            BlockState::Table(_) => "table",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListItem<'a> {
    pub kind: ListKind,
    pub indent: usize,
    pub number: Option<u64>,
    pub checked: bool,
    pub text: &'a str,
}

/// What a single line starts, judged without any parser state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    Heading { level: usize, text: &'a str },
    Rule,
    Fence { fence: (char, usize), lang: Option<&'a str> },
    Quote(&'a str),
    ListItem(ListItem<'a>),
    TableHeader,
    Text(&'a str),
}

/// Classify a line. `next` is needed to recognise a table header.
pub fn classify<'a>(line: &'a str, next: Option<&str>) -> LineKind<'a> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if let Some((ch, len, lang)) = parse_fence(line) {
        return LineKind::Fence {
            fence: (ch, len),
            lang,
        };
    }
    if let Some((level, text)) = parse_atx_heading(line) {
        return LineKind::Heading { level, text };
    }
    if is_rule(line) {
        return LineKind::Rule;
    }
    if let Some(item) = parse_list_item(line) {
        return LineKind::ListItem(item);
    }
    if let Some(rest) = strip_quote_marker(line) {
        return LineKind::Quote(rest);
    }
    if is_table_row(line) && next.is_some_and(is_separator_row) {
        return LineKind::TableHeader;
    }
    LineKind::Text(line.trim())
}

/// Line-at-a-time block parser
#[derive(Debug, Default)]
pub struct BlockParser {
    state: BlockState,
    blocks: Vec<String>,
    anchors: AnchorSet,
}

impl BlockParser {
    fn with_anchors(anchors: AnchorSet) -> Self {
        Self {
            anchors,
            ..Self::default()
        }
    }

    /// Feed a whole document
    pub fn feed(&mut self, markdown: &str) {
        let lines: Vec<&str> = markdown.lines().collect();
        for (idx, line) in lines.iter().enumerate() {
            self.step(line, lines.get(idx + 1).copied());
        }
    }

    /// Advance the state machine by one line
    pub fn step(&mut self, line: &str, next: Option<&str>) {
        trace!("[{}] {:?}", self.state.name(), line);

        if self.continue_raw_block(line) {
            return;
        }

        let kind = classify(line, next);
        match (&mut self.state, &kind) {
            (BlockState::Paragraph(lines), LineKind::Text(text)) => {
                lines.push(text.to_string());
                return;
            }
            (BlockState::List { .. }, LineKind::Blank) => return,
            (BlockState::List { frames, html }, LineKind::ListItem(item)) => {
                push_list_item(frames, html, item);
                return;
            }
            (BlockState::Blockquote(lines), LineKind::Quote(rest)) => {
                lines.push(rest.to_string());
                return;
            }
            _ => {}
        }

        self.flush();
        self.open(kind, line);
    }

    /// Code and table blocks look at the raw line before classification
    fn continue_raw_block(&mut self, line: &str) -> bool {
        match &mut self.state {
            BlockState::Code { fence, lines, .. } => {
                if !is_closing_fence(line, *fence) {
                    lines.push(line.to_string());
                    return true;
                }
            }
            BlockState::Table(table) if table.awaiting_separator => {
                table.aligns = split_cells(line).iter().map(|c| parse_align(c)).collect();
                table.awaiting_separator = false;
                return true;
            }
            BlockState::Table(table) if is_table_row(line) => {
                table.rows.push(split_cells(line));
                return true;
            }
            _ => return false,
        }

        // Closing fence
        self.flush();
        true
    }

    fn open(&mut self, kind: LineKind<'_>, line: &str) {
        match kind {
            LineKind::Blank => {}
            LineKind::Heading { level, text } => {
                let anchor = self.anchors.unique(text);
                self.blocks.push(format!(
                    "<h{level} id=\"{}\">{}</h{level}>",
                    escape_attr(&anchor),
                    markdown_inline_to_html(text),
                ));
            }
            LineKind::Rule => self.blocks.push("<hr />".to_string()),
            LineKind::Fence { fence, lang } => {
                self.state = BlockState::Code {
                    fence,
                    lang: lang.map(str::to_string),
                    lines: Vec::new(),
                };
            }
            LineKind::Quote(rest) => {
                self.state = BlockState::Blockquote(vec![rest.to_string()]);
            }
            LineKind::ListItem(item) => {
                let mut frames = Vec::new();
                let mut html = String::new();
                push_list_item(&mut frames, &mut html, &item);
                self.state = BlockState::List { frames, html };
            }
            LineKind::TableHeader => {
                self.state = BlockState::Table(TableBuilder {
                    header: split_cells(line),
                    awaiting_separator: true,
                    ..TableBuilder::default()
                });
            }
            LineKind::Text(text) => {
                self.state = BlockState::Paragraph(vec![text.to_string()]);
            }
        }
    }

    /// Close the open block, if any, and return to idle
    fn flush(&mut self) {
        let state = mem::take(&mut self.state);
        trace!("flush {}", state.name());
        match state {
            BlockState::Idle => {}
            BlockState::Paragraph(lines) => {
                let body = lines
                    .iter()
                    .map(|line| markdown_inline_to_html(line))
                    .collect::<Vec<_>>()
                    .join("<br />\n");
                self.blocks.push(format!("<p>{}</p>", body));
            }
            BlockState::List { frames, mut html } => {
                for frame in frames.iter().rev() {
                    close_list(&mut html, frame.kind);
                }
                self.blocks.push(html.trim_end().to_string());
            }
            BlockState::Blockquote(lines) => {
                let mut inner = BlockParser::with_anchors(mem::take(&mut self.anchors));
                inner.feed(&lines.join("\n"));
                self.anchors = mem::take(&mut inner.anchors);
                let body = inner.finish();
                if body.is_empty() {
                    self.blocks.push("<blockquote></blockquote>".to_string());
                } else {
                    self.blocks
                        .push(format!("<blockquote>\n{}\n</blockquote>", body));
                }
            }
            BlockState::Code { lang, lines, .. } => {
                let code = escape_html(&lines.join("\n"));
                let html = match lang {
                    Some(lang) => format!(
                        "<pre><code class=\"language-{}\">{}</code></pre>",
                        escape_attr(&lang),
                        code
                    ),
                    None => format!("<pre><code>{}</code></pre>", code),
                };
                self.blocks.push(html);
            }
            BlockState::Table(table) => self.blocks.push(render_table(&table)),
        }
    }

    /// Flush the last block and join everything
    pub fn finish(mut self) -> String {
        self.flush();
        self.blocks.join("\n")
    }
}

fn open_list(html: &mut String, item: &ListItem<'_>) {
    match item.kind {
        ListKind::Unordered => html.push_str("<ul>\n"),
        ListKind::Task => html.push_str("<ul class=\"task-list\">\n"),
        ListKind::Ordered => match item.number {
            Some(n) if n != 1 => html.push_str(&format!("<ol start=\"{}\">\n", n)),
            _ => html.push_str("<ol>\n"),
        },
    }
}

fn close_list(html: &mut String, kind: ListKind) {
    html.push_str("</li>\n");
    match kind {
        ListKind::Ordered => html.push_str("</ol>\n"),
        ListKind::Unordered | ListKind::Task => html.push_str("</ul>\n"),
    }
}

fn open_item(html: &mut String, item: &ListItem<'_>) {
    match item.kind {
        ListKind::Task => {
            html.push_str("<li class=\"task-list-item\"><input type=\"checkbox\"");
            if item.checked {
                html.push_str(" checked");
            }
            html.push_str(" disabled /> ");
        }
        ListKind::Unordered | ListKind::Ordered => html.push_str("<li>"),
    }
    html.push_str(&markdown_inline_to_html(item.text));
}

/// Place a list item relative to the open lists.
///
/// Deeper indentation nests inside the open item, shallower indentation
/// closes lists back to the matching depth, and a kind change at the same
/// depth starts a new list.
fn push_list_item(frames: &mut Vec<ListFrame>, html: &mut String, item: &ListItem<'_>) {
    let frame = ListFrame {
        kind: item.kind,
        indent: item.indent,
    };

    loop {
        match frames.last().copied() {
            None => {
                open_list(html, item);
                frames.push(frame);
                break;
            }
            Some(top) if item.indent > top.indent => {
                html.push('\n');
                open_list(html, item);
                frames.push(frame);
                break;
            }
            Some(top) if item.indent == top.indent && top.kind == item.kind => {
                html.push_str("</li>\n");
                break;
            }
            Some(top) => {
                close_list(html, top.kind);
                frames.pop();
                if item.indent == top.indent {
                    open_list(html, item);
                    frames.push(frame);
                    break;
                }
            }
        }
    }

    open_item(html, item);
}

const BULLETS: &[char] = &['-', '*'];
const MARKER_GAP: &[char] = &[' ', '\t'];

/// Leading whitespace width, counting a tab as four columns
fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Recognise `- item`, `* item`, `1. item` and `- [x] item`
pub fn parse_list_item(line: &str) -> Option<ListItem<'_>> {
    let indent = indent_width(line);
    let rest = line.trim_start();

    if let Some(after) = rest.strip_prefix(BULLETS) {
        if !after.starts_with(MARKER_GAP) {
            return None;
        }
        let text = after.trim_start();
        if let Some((checked, task_text)) = parse_task_marker(text) {
            return Some(ListItem {
                kind: ListKind::Task,
                indent,
                number: None,
                checked,
                text: task_text,
            });
        }
        return Some(ListItem {
            kind: ListKind::Unordered,
            indent,
            number: None,
            checked: false,
            text: text.trim_end(),
        });
    }

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let after = rest[digits..].strip_prefix('.')?;
    if !after.starts_with(MARKER_GAP) {
        return None;
    }
    Some(ListItem {
        kind: ListKind::Ordered,
        indent,
        number: rest[..digits].parse().ok(),
        checked: false,
        text: after.trim(),
    })
}

fn parse_task_marker(text: &str) -> Option<(bool, &str)> {
    let checked = match text.get(..3)? {
        "[ ]" => false,
        "[x]" | "[X]" => true,
        _ => return None,
    };
    let after = &text[3..];
    if !after.starts_with(MARKER_GAP) {
        return None;
    }
    Some((checked, after.trim()))
}

/// `---`, `***` or `___`, three or more, spaces allowed between
fn is_rule(line: &str) -> bool {
    let mut marks = line.chars().filter(|c| !c.is_whitespace());
    let Some(first) = marks.next() else {
        return false;
    };
    if !matches!(first, '-' | '*' | '_') {
        return false;
    }
    let mut count = 1;
    for c in marks {
        if c != first {
            return false;
        }
        count += 1;
    }
    count >= 3
}

/// Strip one `>` and an optional following space
fn strip_quote_marker(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

fn is_table_row(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

fn is_separator_row(line: &str) -> bool {
    if !line.contains('|') || !line.contains('-') {
        return false;
    }
    split_cells(line).iter().all(|cell| {
        let body = cell.trim_start_matches(':').trim_end_matches(':');
        !body.is_empty() && body.chars().all(|c| c == '-')
    })
}

fn parse_align(cell: &str) -> Option<Align> {
    match (cell.starts_with(':'), cell.ends_with(':')) {
        (true, true) => Some(Align::Center),
        (true, false) => Some(Align::Left),
        (false, true) => Some(Align::Right),
        (false, false) => None,
    }
}

/// Split `| a | b |` into trimmed cells, honouring `\|` escapes
fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = match trimmed.strip_suffix('|') {
        Some(inner) if !inner.ends_with('\\') => inner,
        _ => trimmed,
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

fn render_table(table: &TableBuilder) -> String {
    let columns = table.header.len();
    let mut html = String::from("<table>\n<thead>\n<tr>\n");

    for (idx, cell) in table.header.iter().enumerate() {
        push_cell(&mut html, "th", cell, table.aligns.get(idx).copied().flatten());
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for row in &table.rows {
        html.push_str("<tr>\n");
        for idx in 0..columns {
            let cell = row.get(idx).map(String::as_str).unwrap_or("");
            push_cell(&mut html, "td", cell, table.aligns.get(idx).copied().flatten());
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>");
    html
}

fn push_cell(html: &mut String, tag: &str, text: &str, align: Option<Align>) {
    match align {
        Some(align) => html.push_str(&format!(
            "<{tag} style=\"text-align: {}\">{}</{tag}>\n",
            align.as_str(),
            markdown_inline_to_html(text)
        )),
        None => html.push_str(&format!("<{tag}>{}</{tag}>\n", markdown_inline_to_html(text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(markdown_to_html(""), "");
        assert_eq!(markdown_to_html("  \n\t\n"), "");
    }

    #[test]
    fn test_headings() {
        let html = markdown_to_html("# Title");
        assert!(html.starts_with("<h1"));
        assert!(html.contains(">Title</h1>"));

        for level in 1..=6 {
            let md = format!("{} Heading", "#".repeat(level));
            let html = markdown_to_html(&md);
            assert!(html.starts_with(&format!("<h{}", level)));
            assert!(html.ends_with(&format!("Heading</h{}>", level)));
        }
    }

    #[test]
    fn test_heading_ids_are_unique() {
        let html = markdown_to_html("# Intro\n\n# Intro");
        assert!(html.contains("id=\"intro\""));
        assert!(html.contains("id=\"intro-1\""));

        let html = markdown_to_html("# A\n# A\n# A-1");
        assert_eq!(
            html,
            "<h1 id=\"a\">A</h1>\n<h1 id=\"a-1\">A</h1>\n<h1 id=\"a-1-1\">A-1</h1>"
        );
    }

    #[test]
    fn test_hash_only_heading_text() {
        assert_eq!(markdown_to_html("# #"), "<h1 id=\"section\">#</h1>");
    }

    #[test]
    fn test_paragraph_line_breaks() {
        assert_eq!(
            markdown_to_html("one\ntwo\n\nthree"),
            "<p>one<br />\ntwo</p>\n<p>three</p>"
        );
    }

    #[test]
    fn test_horizontal_rules() {
        for rule in ["---", "***", "___", "-----", "* * *"] {
            assert_eq!(markdown_to_html(rule), "<hr />", "rule {:?}", rule);
        }
        let html = markdown_to_html("- a\n---\n- b");
        assert_eq!(html.matches("<ul>").count(), 2);
    }

    #[test]
    fn test_nested_unordered_list() {
        let html = markdown_to_html("- a\n  - b\n- c");
        assert_eq!(
            html,
            "<ul>\n<li>a\n<ul>\n<li>b</li>\n</ul>\n</li>\n<li>c</li>\n</ul>"
        );
    }

    #[test]
    fn test_list_type_change_same_level() {
        let html = markdown_to_html("- a\n1. b");
        assert_eq!(html, "<ul>\n<li>a</li>\n</ul>\n<ol>\n<li>b</li>\n</ol>");
    }

    #[test]
    fn test_dedent_closes_nested_lists() {
        let html = markdown_to_html("1. a\n   - b\n     - c\n2. d");
        assert_eq!(html.matches("<ol>").count(), 1);
        assert_eq!(html.matches("<ul>").count(), 2);
        assert!(html.ends_with("<li>d</li>\n</ol>"));
    }

    #[test]
    fn test_ordered_start() {
        let html = markdown_to_html("3. c\n4. d");
        assert!(html.starts_with("<ol start=\"3\">"));
    }

    #[test]
    fn test_task_items() {
        let html = markdown_to_html("- [ ] todo\n- [x] done");
        assert!(html.starts_with("<ul class=\"task-list\">"));
        assert!(html.contains("<input type=\"checkbox\" disabled /> todo"));
        assert!(html.contains("<input type=\"checkbox\" checked disabled /> done"));
    }

    #[test]
    fn test_blank_line_keeps_list_open() {
        let html = markdown_to_html("- a\n\n- b\n\ntext");
        assert_eq!(html.matches("<ul>").count(), 1);
        assert!(html.ends_with("<p>text</p>"));
    }

    #[test]
    fn test_toc_links_in_list() {
        let html = markdown_to_html("- [Setup](#setup)");
        assert_eq!(html, "<ul>\n<li><a href=\"#setup\">Setup</a></li>\n</ul>");
    }

    #[test]
    fn test_code_block_is_verbatim() {
        let md = "```rust\nlet x = **y** < 3;\n# not heading\n```";
        assert_eq!(
            markdown_to_html(md),
            "<pre><code class=\"language-rust\">let x = **y** &lt; 3;\n# not heading</code></pre>"
        );
        assert_eq!(markdown_to_html("```\nplain\n```"), "<pre><code>plain</code></pre>");
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let html = markdown_to_html("```\na\n\nb");
        assert_eq!(html, "<pre><code>a\n\nb</code></pre>");
    }

    #[test]
    fn test_tilde_fence_needs_tilde_close() {
        let html = markdown_to_html("~~~\n```\n~~~\nafter");
        assert_eq!(html, "<pre><code>```</code></pre>\n<p>after</p>");
    }

    #[test]
    fn test_blockquote_merge_and_nesting() {
        let html = markdown_to_html("> one\n> two\n>> deep");
        assert_eq!(html.matches("<blockquote>").count(), 2);
        assert!(html.contains("<p>one<br />\ntwo</p>"));
        assert!(html.contains("<p>deep</p>"));
    }

    #[test]
    fn test_blockquote_ends_at_blank_line() {
        let html = markdown_to_html("> quote\n\nafter");
        assert_eq!(html, "<blockquote>\n<p>quote</p>\n</blockquote>\n<p>after</p>");
    }

    #[test]
    fn test_table() {
        let md = "| a | b |\n|---|:-:|\n| 1 | 2 |\n| 3 |\n| 4 | 5 | 6 |";
        let html = markdown_to_html(md);
        assert!(html.starts_with("<table>\n<thead>\n<tr>\n<th>a</th>\n"));
        assert!(html.contains("<th style=\"text-align: center\">b</th>"));
        assert_eq!(html.matches("<tr>").count(), 4);
        assert_eq!(html.matches("<td").count(), 6);
        assert!(!html.contains(">6<"));
        assert!(html.ends_with("</tbody>\n</table>"));
    }

    #[test]
    fn test_pipe_line_without_separator_is_text() {
        assert_eq!(markdown_to_html("| not a table |"), "<p>| not a table |</p>");
    }

    #[test]
    fn test_inline_applied_to_blocks() {
        let html = markdown_to_html("## **Bold** heading\n\n- *item*");
        assert!(html.contains("<strong>Bold</strong> heading</h2>"));
        assert!(html.contains("<li><em>item</em></li>"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("", None), LineKind::Blank);
        assert_eq!(classify("---", None), LineKind::Rule);
        assert_eq!(classify("| a |", Some("|---|")), LineKind::TableHeader);
        assert_eq!(classify("| a |", None), LineKind::Text("| a |"));
        assert!(matches!(classify("> q", None), LineKind::Quote("q")));
        assert!(matches!(
            classify("  3. x", None),
            LineKind::ListItem(ListItem { kind: ListKind::Ordered, indent: 2, number: Some(3), .. })
        ));
        assert_eq!(classify("*not a list*", None), LineKind::Text("*not a list*"));
    }
}
