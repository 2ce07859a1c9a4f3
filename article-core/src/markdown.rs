//! HTML to Markdown block transcoder

use log::debug;

use crate::html::{parse_fragment, Element, Node};
use crate::inline::{inline_markdown, push_inline};

/// Elements rendered as blocks of their own
const BLOCK_ELEMENTS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "blockquote", "hr", "ul", "ol", "pre", "table",
];

/// Containers whose children are rendered as blocks in place
const TRANSPARENT_CONTAINERS: &[&str] = &[
    "address", "article", "aside", "body", "details", "div", "dl", "dd", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "header", "html", "li", "main", "nav", "section",
    "summary",
];

/// Elements whose content never reaches the Markdown
const DROPPED_ELEMENTS: &[&str] = &["head", "script", "style", "template", "title"];

/// Convert an HTML fragment or document to Markdown.
///
/// Blank input yields an empty string.
pub fn html_to_markdown(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let nodes = parse_fragment(html);
    let mut blocks = Vec::new();
    render_blocks(&nodes, &mut blocks);
    let markdown = blocks.join("\n\n");
    debug!(
        "html_to_markdown: {} bytes in, {} blocks, {} bytes out",
        html.len(),
        blocks.len(),
        markdown.len()
    );
    markdown
}

fn is_block(el: &Element) -> bool {
    let name = el.name.as_str();
    BLOCK_ELEMENTS.contains(&name)
        || TRANSPARENT_CONTAINERS.contains(&name)
        || DROPPED_ELEMENTS.contains(&name)
}

fn render_blocks(nodes: &[Node], blocks: &mut Vec<String>) {
    let mut pending = String::new();

    for node in nodes {
        match node {
            Node::Element(el) if is_block(el) => {
                flush_paragraph(&mut pending, blocks);
                render_block(el, blocks);
            }
            _ => push_inline(node, &mut pending),
        }
    }

    flush_paragraph(&mut pending, blocks);
}

fn flush_paragraph(pending: &mut String, blocks: &mut Vec<String>) {
    let text = tidy_lines(pending);
    pending.clear();
    if !text.is_empty() {
        blocks.push(text);
    }
}

/// Trim each line and drop leading/trailing empty lines
fn tidy_lines(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').map(str::trim).collect();
    let first = lines.iter().position(|l| !l.is_empty());
    let last = lines.iter().rposition(|l| !l.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => lines[first..=last].join("\n"),
        _ => String::new(),
    }
}

/// Inline content of an element flattened to a single line
fn single_line(nodes: &[Node]) -> String {
    tidy_lines(&inline_markdown(nodes))
        .split('\n')
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_block(el: &Element, blocks: &mut Vec<String>) {
    match el.name.as_str() {
        name @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6") => {
            let level = usize::from(name.as_bytes()[1] - b'0');
            let text = single_line(&el.children);
            if !text.is_empty() {
                blocks.push(format!("{} {}", "#".repeat(level), text));
            }
        }
        "p" => {
            let mut text = String::new();
            for child in &el.children {
                push_inline(child, &mut text);
            }
            flush_paragraph(&mut text, blocks);
        }
        "hr" => blocks.push("---".to_string()),
        "blockquote" => {
            let mut inner = Vec::new();
            render_blocks(&el.children, &mut inner);
            let quoted = inner
                .join("\n\n")
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {}", line)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            blocks.push(if quoted.is_empty() {
                ">".to_string()
            } else {
                quoted
            });
        }
        "ul" | "ol" => {
            let mut lines = Vec::new();
            render_list(el, 0, &mut lines);
            if !lines.is_empty() {
                blocks.push(lines.join("\n"));
            }
        }
        "pre" => blocks.push(render_code_block(el)),
        "table" => {
            if let Some(table) = render_table(el) {
                blocks.push(table);
            }
        }
        name if DROPPED_ELEMENTS.contains(&name) => {}
        _ => render_blocks(&el.children, blocks),
    }
}

/// Render a list as `- item` / `N. item` lines, nesting by two spaces per level
fn render_list(list: &Element, depth: usize, lines: &mut Vec<String>) {
    let ordered = list.name == "ol";
    let mut number: u64 = list
        .attr("start")
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(1);
    let indent = "  ".repeat(depth);

    for item in list.child_elements().filter(|el| el.name == "li") {
        let marker = if ordered {
            let marker = format!("{}. ", number);
            number += 1;
            marker
        } else {
            "- ".to_string()
        };

        let task = task_marker(item);
        let mut text = String::new();
        let mut nested = Vec::new();
        collect_item(item, depth, &mut text, &mut nested);

        let text = tidy_lines(&text).split('\n').collect::<Vec<_>>().join(" ");
        lines.push(format!("{}{}{}{}", indent, marker, task, text.trim()));
        lines.extend(nested);
    }
}

/// Split a list item into its inline text and the lines of nested blocks
fn collect_item(item: &Element, depth: usize, text: &mut String, nested: &mut Vec<String>) {
    for child in &item.children {
        match child {
            Node::Element(el) if el.name == "ul" || el.name == "ol" => {
                render_list(el, depth + 1, nested);
            }
            Node::Element(el) if el.name == "p" => {
                if !text.trim().is_empty() {
                    text.push(' ');
                }
                for grandchild in &el.children {
                    push_inline(grandchild, text);
                }
            }
            Node::Element(el) if is_block(el) => {
                let mut inner = Vec::new();
                render_block(el, &mut inner);
                let pad = "  ".repeat(depth + 1);
                for line in inner.join("\n\n").lines() {
                    nested.push(format!("{}{}", pad, line));
                }
            }
            _ => push_inline(child, text),
        }
    }
}

/// `[x] ` / `[ ] ` when the item holds a checkbox, either directly or in its first paragraph
fn task_marker(item: &Element) -> &'static str {
    let is_checkbox = |el: &Element| {
        el.name == "input"
            && el
                .attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("checkbox"))
    };
    let checkbox = item.child_elements().find(|el| is_checkbox(el)).or_else(|| {
        item.child_elements()
            .find(|el| el.name == "p")
            .and_then(|p| p.child_elements().find(|el| is_checkbox(el)))
    });

    match checkbox {
        Some(input) if input.has_attr("checked") => "[x] ",
        Some(_) => "[ ] ",
        None => "",
    }
}

fn render_code_block(pre: &Element) -> String {
    let code_el = pre.child_elements().find(|el| el.name == "code");
    let lang = code_el
        .and_then(|el| el.attr("class"))
        .and_then(|class| {
            class.split_whitespace().find_map(|c| {
                c.strip_prefix("language-")
                    .or_else(|| c.strip_prefix("lang-"))
            })
        })
        .unwrap_or("");

    let text = match code_el {
        Some(code) => code.text_content(),
        None => pre.text_content(),
    };
    let text = text.strip_suffix('\n').unwrap_or(&text);

    let longest = text
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest.max(2) + 1);
    format!("{}{}\n{}\n{}", fence, lang, text, fence)
}

struct Cell {
    text: String,
    header: bool,
    align: Option<&'static str>,
}

fn collect_rows(el: &Element, rows: &mut Vec<Vec<Cell>>) {
    for child in el.child_elements() {
        match child.name.as_str() {
            "thead" | "tbody" | "tfoot" => collect_rows(child, rows),
            "tr" => {
                let cells = child
                    .child_elements()
                    .filter(|c| c.name == "th" || c.name == "td")
                    .map(|c| Cell {
                        text: single_line(&c.children).replace('|', "\\|"),
                        header: c.name == "th",
                        align: cell_align(c),
                    })
                    .collect();
                rows.push(cells);
            }
            _ => {}
        }
    }
}

fn cell_align(cell: &Element) -> Option<&'static str> {
    let from_style = cell.attr("style").and_then(|style| {
        style.split(';').find_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            (prop.trim().eq_ignore_ascii_case("text-align")).then(|| value.trim())
        })
    });
    let value = from_style.or_else(|| cell.attr("align"))?;
    match value.to_ascii_lowercase().as_str() {
        "left" => Some("left"),
        "center" => Some("center"),
        "right" => Some("right"),
        _ => None,
    }
}

/// Pipe table. The first row is the header; body rows are padded or
/// truncated to its width.
fn render_table(table: &Element) -> Option<String> {
    let mut rows = Vec::new();
    collect_rows(table, &mut rows);
    let mut rows = rows.into_iter().filter(|row| !row.is_empty());
    let header = rows.next()?;
    let columns = header.len();

    let mut lines = Vec::new();
    lines.push(pipe_row(header.iter().map(|c| c.text.as_str())));
    lines.push(pipe_row(header.iter().map(|c| match c.align {
        Some("left") => ":---",
        Some("center") => ":---:",
        Some("right") => "---:",
        _ => "---",
    })));

    for row in rows {
        let cells = (0..columns).map(|idx| row.get(idx).map(|c| c.text.as_str()).unwrap_or(""));
        lines.push(pipe_row(cells));
    }

    debug!(
        "table: {} columns, header cells {}",
        columns,
        if header.iter().all(|c| c.header) { "th" } else { "td" }
    );
    Some(lines.join("\n"))
}

fn pipe_row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    let mut line = String::from("|");
    for cell in cells {
        line.push(' ');
        line.push_str(cell);
        line.push_str(" |");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(html_to_markdown(""), "");
        assert_eq!(html_to_markdown("   "), "");
    }

    #[test]
    fn test_inline_only() {
        assert_eq!(html_to_markdown("<strong>bold</strong>"), "**bold**");
    }

    #[test]
    fn test_headings() {
        assert_eq!(html_to_markdown("<h1>Title</h1>"), "# Title");
        assert_eq!(
            html_to_markdown("<h3 id=\"x\">Sub <em>it</em></h3>"),
            "### Sub *it*"
        );
        assert_eq!(html_to_markdown("<h6>Six</h6>"), "###### Six");
    }

    #[test]
    fn test_paragraphs_and_breaks() {
        assert_eq!(
            html_to_markdown("<p>one<br />two</p>\n<p>three</p>"),
            "one\ntwo\n\nthree"
        );
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(
            html_to_markdown("<p>a &amp; b &mdash; &copy; &unknown;</p>"),
            "a & b \u{2014} \u{a9} &unknown;"
        );
    }

    #[test]
    fn test_rule() {
        assert_eq!(html_to_markdown("<p>a</p><hr><p>b</p>"), "a\n\n---\n\nb");
        assert_eq!(html_to_markdown("<hr />"), "---");
    }

    #[test]
    fn test_nested_blockquote() {
        assert_eq!(
            html_to_markdown("<blockquote><p>a</p><blockquote><p>b</p></blockquote></blockquote>"),
            "> a\n>\n> > b"
        );
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            html_to_markdown("<ul><li>a</li><li>b</li></ul>"),
            "- a\n- b"
        );
        assert_eq!(
            html_to_markdown("<ol><li>a</li><li>b</li></ol><ol><li>c</li></ol>"),
            "1. a\n2. b\n\n1. c"
        );
        assert_eq!(
            html_to_markdown("<ol start=\"4\"><li>d</li></ol>"),
            "4. d"
        );
    }

    #[test]
    fn test_nested_list() {
        assert_eq!(
            html_to_markdown("<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>"),
            "- a\n  - b\n- c"
        );
    }

    #[test]
    fn test_task_list() {
        let html = "<ul class=\"task-list\"><li><input type=\"checkbox\" checked disabled /> done</li>\
                    <li><input type=\"checkbox\"> todo</li></ul>";
        assert_eq!(html_to_markdown(html), "- [x] done\n- [ ] todo");
    }

    #[test]
    fn test_code_block() {
        assert_eq!(
            html_to_markdown("<pre><code class=\"language-rust\">fn main() {}\n</code></pre>"),
            "```rust\nfn main() {}\n```"
        );
        assert_eq!(
            html_to_markdown("<pre><code>a &lt; b</code></pre>"),
            "```\na < b\n```"
        );
    }

    #[test]
    fn test_table() {
        let html = "<table><thead><tr><th>a</th><th style=\"text-align: right\">b</th></tr></thead>\
                    <tbody><tr><td>1</td><td>2</td></tr><tr><td>3</td></tr></tbody></table>";
        assert_eq!(
            html_to_markdown(html),
            "| a | b |\n| --- | ---: |\n| 1 | 2 |\n| 3 |  |"
        );
    }

    #[test]
    fn test_links_and_images() {
        assert_eq!(
            html_to_markdown("<p><a href=\"https://x.org\">x</a> <img src=\"a.png\" alt=\"A\"></p>"),
            "[x](https://x.org) ![A](a.png)"
        );
    }

    #[test]
    fn test_scripts_and_head_dropped() {
        assert_eq!(
            html_to_markdown("<html><head><title>T</title></head><body><p>x</p><script>y()</script></body></html>"),
            "x"
        );
    }

    #[test]
    fn test_literal_markers_survive_round_trip() {
        for html in ["<p>*x*</p>", "<p>1. x</p>", "<p># x</p>", "<p>[a](b)</p>"] {
            let markdown = html_to_markdown(html);
            assert_eq!(crate::block::markdown_to_html(&markdown), html, "{:?}", markdown);
        }
        assert_eq!(html_to_markdown("<p>*x*</p>"), "\\*x\\*");
        assert_eq!(html_to_markdown("<p>1. x</p>"), "1\\. x");
    }

    #[test]
    fn test_div_is_transparent() {
        assert_eq!(html_to_markdown("<div><h2>A</h2>text</div>"), "## A\n\ntext");
    }
}
