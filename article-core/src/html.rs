//! Lightweight HTML tokenizer and fragment tree
//!
//! This is not a conforming HTML5 parser. It understands enough of the
//! syntax to read back the markup produced by the editor and by ordinary
//! hand-written articles:
//! - start/end tags with quoted, unquoted and bare attributes
//! - comments, doctype and processing instructions
//! - void elements and `/>` self-closing syntax
//! - raw text inside `script` and `style`
//! - implicit closing of `p` and `li`
//!
//! Tokens carry their source spans so callers can re-emit untouched markup
//! byte for byte.

use std::borrow::Cow;
use std::ops::Range;

use crate::entities::decode_entities;

/// Elements that never have content or an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose start implicitly closes an open `<p>`
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "ul",
];

/// Elements whose content is raw text up to the matching end tag
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// An attribute as written in a start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased attribute name
    pub name: String,
    /// Value as written, without quotes and without entity decoding
    pub value: Option<String>,
    /// Source span of the whole `name="value"` text
    pub span: Range<usize>,
}

impl Attribute {
    pub fn decoded_value(&self) -> Cow<'_, str> {
        match &self.value {
            Some(value) => decode_entities(value),
            None => Cow::Borrowed(""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag {
        name: String,
        attrs: Vec<Attribute>,
        self_closing: bool,
        span: Range<usize>,
    },
    EndTag {
        name: String,
        span: Range<usize>,
    },
    Text(Range<usize>),
    /// Comments, doctype declarations and processing instructions
    Comment(Range<usize>),
}

impl Token {
    pub fn span(&self) -> Range<usize> {
        match self {
            Token::StartTag { span, .. } | Token::EndTag { span, .. } => span.clone(),
            Token::Text(span) | Token::Comment(span) => span.clone(),
        }
    }
}

/// Streaming tokenizer over an HTML fragment.
///
/// A tag left unterminated at end of input produces no token; the
/// remaining input is dropped.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    raw_text: Option<&'static str>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            raw_text: None,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn next_raw_text(&mut self, element: &'static str) -> Option<Token> {
        let start = self.pos;
        let close = format!("</{}", element);
        let end = find_ignore_ascii_case(self.input, &close, start).unwrap_or(self.input.len());
        self.pos = end;
        (end > start).then(|| Token::Text(start..end))
    }

    /// `skip` is 1 when the text starts with a literal `<`
    fn next_text(&mut self, skip: usize) -> Token {
        let start = self.pos;
        let from = start + skip;
        let end = self.input[from..]
            .find('<')
            .map(|i| from + i)
            .unwrap_or(self.input.len());
        self.pos = end;
        Token::Text(start..end)
    }

    fn next_comment(&mut self) -> Token {
        let start = self.pos;
        let end = if self.input[start..].starts_with("<!--") {
            self.input[start + 4..]
                .find("-->")
                .map(|i| start + 4 + i + 3)
                .unwrap_or(self.input.len())
        } else {
            self.input[start..]
                .find('>')
                .map(|i| start + i + 1)
                .unwrap_or(self.input.len())
        };
        self.pos = end;
        Token::Comment(start..end)
    }

    fn next_end_tag(&mut self) -> Option<Token> {
        let start = self.pos;
        let name_start = start + 2;
        let name_end = scan_name(self.bytes(), name_start);
        let name = self.input[name_start..name_end].to_ascii_lowercase();
        match self.input[name_end..].find('>') {
            Some(i) => {
                self.pos = name_end + i + 1;
                Some(Token::EndTag {
                    name,
                    span: start..self.pos,
                })
            }
            None => {
                self.pos = self.input.len();
                None
            }
        }
    }

    fn next_start_tag(&mut self) -> Option<Token> {
        let bytes = self.bytes();
        let start = self.pos;
        let name_end = scan_name(bytes, start + 1);
        let name = self.input[start + 1..name_end].to_ascii_lowercase();
        let mut attrs = Vec::new();
        let mut i = name_end;
        let mut self_closing = false;

        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= bytes.len() {
                self.pos = bytes.len();
                return None;
            }
            match bytes[i] {
                b'>' => {
                    i += 1;
                    break;
                }
                b'/' if bytes.get(i + 1) == Some(&b'>') => {
                    self_closing = true;
                    i += 2;
                    break;
                }
                b'/' => {
                    i += 1;
                    continue;
                }
                _ => {}
            }

            let attr_start = i;
            // A leading '=' belongs to the name
            i += 1;
            while i < bytes.len() && !is_attr_name_end(bytes[i]) {
                i += 1;
            }
            let attr_name = self.input[attr_start..i].to_ascii_lowercase();
            let name_end = i;

            let mut j = i;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'=' {
                j += 1;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                if j >= bytes.len() {
                    self.pos = bytes.len();
                    return None;
                }
                let value = match bytes[j] {
                    quote @ (b'"' | b'\'') => {
                        let value_start = j + 1;
                        let close = bytes[value_start..].iter().position(|&b| b == quote);
                        match close {
                            Some(len) => {
                                j = value_start + len + 1;
                                &self.input[value_start..value_start + len]
                            }
                            None => {
                                self.pos = bytes.len();
                                return None;
                            }
                        }
                    }
                    _ => {
                        let value_start = j;
                        while j < bytes.len()
                            && !bytes[j].is_ascii_whitespace()
                            && bytes[j] != b'>'
                        {
                            j += 1;
                        }
                        &self.input[value_start..j]
                    }
                };
                attrs.push(Attribute {
                    name: attr_name,
                    value: Some(value.to_string()),
                    span: attr_start..j,
                });
                i = j;
            } else {
                attrs.push(Attribute {
                    name: attr_name,
                    value: None,
                    span: attr_start..name_end,
                });
            }
        }

        self.pos = i;
        if !self_closing {
            self.raw_text = RAW_TEXT_ELEMENTS.iter().copied().find(|&raw| raw == name);
        }
        Some(Token::StartTag {
            name,
            attrs,
            self_closing,
            span: start..i,
        })
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if self.pos >= self.input.len() {
                return None;
            }

            if let Some(element) = self.raw_text.take() {
                match self.next_raw_text(element) {
                    Some(token) => return Some(token),
                    None => continue,
                }
            }

            let rest = &self.bytes()[self.pos..];
            if rest[0] != b'<' {
                return Some(self.next_text(0));
            }

            let second = rest.get(1).copied();
            let third = rest.get(2).copied();
            return match second {
                Some(b'!') | Some(b'?') => Some(self.next_comment()),
                Some(b'/') if third.is_some_and(|b| b.is_ascii_alphabetic()) => self.next_end_tag(),
                Some(b) if b.is_ascii_alphabetic() => self.next_start_tag(),
                _ => Some(self.next_text(1)),
            };
        }
    }
}

/// Tokenize a fragment into a vector
pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).collect()
}

fn scan_name(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len()
        && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-' || bytes[i] == b':')
    {
        i += 1;
    }
    i
}

fn is_attr_name_end(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'=' || b == b'>' || b == b'/'
}

/// Byte offset of `needle` in `haystack` at or after `from`, ignoring ASCII case
pub fn find_ignore_ascii_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    (from..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// A node of a parsed fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Text with entities already decoded
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// Attributes with decoded values; bare attributes have an empty value
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn new(name: impl Into<String>, attrs: Vec<(String, String)>) -> Self {
        Self {
            name: name.into(),
            attrs,
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(key, _)| key == name)
    }

    /// Iterate over child elements, skipping text
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text of all descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => collect_text(&el.children, out),
        }
    }
}

/// Parse an HTML fragment into a forest of nodes.
///
/// Unmatched end tags are ignored; elements left open at the end are
/// closed implicitly.
pub fn parse_fragment(input: &str) -> Vec<Node> {
    let mut stack = vec![Element::new("#root", Vec::new())];

    for token in Tokenizer::new(input) {
        match token {
            Token::StartTag {
                name,
                attrs,
                self_closing,
                ..
            } => {
                if CLOSES_PARAGRAPH.contains(&name.as_str()) && top_name(&stack) == "p" {
                    close_top(&mut stack);
                }
                if name == "li" && top_name(&stack) == "li" {
                    close_top(&mut stack);
                }

                let attrs = attrs
                    .iter()
                    .map(|attr| (attr.name.clone(), attr.decoded_value().into_owned()))
                    .collect();
                let element = Element::new(name, attrs);

                if self_closing || is_void_element(&element.name) {
                    push_child(&mut stack, Node::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Token::EndTag { name, .. } => {
                if let Some(found) = stack.iter().skip(1).rposition(|el| el.name == name) {
                    let index = found + 1;
                    while stack.len() > index {
                        close_top(&mut stack);
                    }
                }
            }
            Token::Text(span) => {
                let text = decode_entities(&input[span]).into_owned();
                push_child(&mut stack, Node::Text(text));
            }
            Token::Comment(_) => {}
        }
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn top_name(stack: &[Element]) -> &str {
    stack.last().map(|el| el.name.as_str()).unwrap_or("")
}

fn push_child(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        if let (Node::Text(text), Some(Node::Text(prev))) = (&node, parent.children.last_mut()) {
            prev.push_str(text);
            return;
        }
        parent.children.push(node);
    }
}

fn close_top(stack: &mut Vec<Element>) {
    if stack.len() <= 1 {
        return;
    }
    if let Some(element) = stack.pop() {
        push_child(stack, Node::Element(element));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &Node) -> &Element {
        match node {
            Node::Element(el) => el,
            Node::Text(text) => panic!("expected element, got text {:?}", text),
        }
    }

    #[test]
    fn test_tokenize_spans_cover_input() {
        let input = "<p class=\"x\">Hi <b>there</b><!-- note --></p>";
        let tokens = tokenize(input);
        let rebuilt: String = tokens.iter().map(|t| &input[t.span()]).collect();
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn test_attribute_forms() {
        let tokens = tokenize("<input type=checkbox checked data-x='a>b' id=\"z\">");
        match &tokens[0] {
            Token::StartTag { name, attrs, .. } => {
                assert_eq!(name, "input");
                assert_eq!(attrs.len(), 4);
                assert_eq!(attrs[0].value.as_deref(), Some("checkbox"));
                assert_eq!(attrs[1].name, "checked");
                assert_eq!(attrs[1].value, None);
                assert_eq!(attrs[2].value.as_deref(), Some("a>b"));
                assert_eq!(attrs[3].value.as_deref(), Some("z"));
            }
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn test_uppercase_names_are_lowercased() {
        let tokens = tokenize("<A HREF=\"x\">y</A>");
        assert!(matches!(&tokens[0], Token::StartTag { name, attrs, .. } if name == "a" && attrs[0].name == "href"));
        assert!(matches!(&tokens[2], Token::EndTag { name, .. } if name == "a"));
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let tokens = tokenize("a < b");
        assert!(tokens.iter().all(|t| matches!(t, Token::Text(_))));
    }

    #[test]
    fn test_unterminated_tag_is_dropped() {
        let input = "ok <a href=\"x";
        let tokens = tokenize(input);
        assert_eq!(tokens.len(), 1);
        assert_eq!(&input[tokens[0].span()], "ok ");
    }

    #[test]
    fn test_script_content_is_raw_text() {
        let input = "<script>if (a < b) { x(\"<p>\") }</script>";
        let tokens = tokenize(input);
        assert_eq!(tokens.len(), 3);
        assert!(matches!(&tokens[1], Token::Text(span) if input[span.clone()].contains("<p>")));
    }

    #[test]
    fn test_parse_nested_tree() {
        let nodes = parse_fragment("<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>");
        assert_eq!(nodes.len(), 1);
        let ul = element(&nodes[0]);
        assert_eq!(ul.name, "ul");
        assert_eq!(ul.child_elements().count(), 2);
        let first = ul.child_elements().next().unwrap();
        assert!(first.child_elements().any(|el| el.name == "ul"));
    }

    #[test]
    fn test_implicit_close() {
        let nodes = parse_fragment("<p>one<p>two<ul><li>a<li>b</ul>");
        let names: Vec<_> = nodes.iter().map(|n| element(n).name.as_str()).collect();
        assert_eq!(names, ["p", "p", "ul"]);
        assert_eq!(element(&nodes[2]).child_elements().count(), 2);
    }

    #[test]
    fn test_void_and_entities() {
        let nodes = parse_fragment("a&amp;b<br>c<img src=\"x.png\" alt=\"&quot;q&quot;\">");
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0], Node::Text("a&b".to_string()));
        assert_eq!(element(&nodes[1]).name, "br");
        assert_eq!(element(&nodes[3]).attr("alt"), Some("\"q\""));
    }

    #[test]
    fn test_stray_end_tag_ignored() {
        let nodes = parse_fragment("<p>x</span>y</p>");
        assert_eq!(element(&nodes[0]).text_content(), "xy");
    }
}
