//! Editable tree: the node structure behind a rich-text editing surface.
//!
//! The exporter only reads this tree. It can be built directly with the
//! builder methods, deserialized from JSON (with the `serde` feature), or
//! read from the HTML an editing surface produces with
//! [`parse_editable_html`].

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;

use crate::error::TreeError;

/// Tag of the element wrapping a parsed fragment.
const FRAGMENT_TAG: &str = "body";

/// Elements that never have content in HTML, even when written `<br>`.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

static ENTITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([a-zA-Z][a-zA-Z0-9]*);").expect("invalid entity regex"));

/// A node of the editable tree.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "value", rename_all = "lowercase")
)]
pub enum EditableNode {
    /// Raw characters.
    Text(String),
    /// An element with attributes and children.
    Element(EditableElement),
}

/// An element node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EditableElement {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes by lowercase name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub attrs: BTreeMap<String, String>,
    /// Child nodes in document order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<EditableNode>,
}

impl EditableNode {
    /// Create a text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// The element, if this is an element node.
    #[must_use]
    pub fn as_element(&self) -> Option<&EditableElement> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }

    /// Concatenated text of this node and its descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Element(element) => element.collect_text(out),
        }
    }
}

impl From<EditableElement> for EditableNode {
    fn from(element: EditableElement) -> Self {
        Self::Element(element)
    }
}

impl EditableElement {
    /// Create an element with no attributes or children.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Set an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Append child nodes.
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = EditableNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Append a text child.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(EditableNode::Text(text.into()));
        self
    }

    /// Attribute value by name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Value of an inline style property, e.g. `style("font-weight")`.
    ///
    /// Property names compare case-insensitively and the last declaration
    /// wins, as in CSS.
    #[must_use]
    pub fn style(&self, property: &str) -> Option<&str> {
        self.attr("style")?
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .filter(|(name, _)| name.trim().eq_ignore_ascii_case(property))
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
            .last()
    }

    /// Concatenated text of all descendants. Line breaks count as newlines.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if self.tag == "br" {
            out.push('\n');
            return;
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

/// Read editing-surface HTML into an editable tree.
///
/// The result is a `body` element wrapping the fragment. Reading is lenient:
/// void elements need no closing slash, attributes may be unquoted or have no
/// value, stray closing tags are ignored, mismatched ones close the nearest
/// matching element and anything left open is closed at the end.
///
/// # Errors
///
/// Returns an error if the input is not readable as markup at all, such as
/// an unterminated tag or attribute.
///
/// # Example
///
/// ```
/// use bb_markup::parse_editable_html;
///
/// let tree = parse_editable_html("<b>Hi</b><br>there").unwrap();
/// assert_eq!(tree.text_content(), "Hi\nthere");
/// ```
pub fn parse_editable_html(html: &str) -> Result<EditableNode, TreeError> {
    let html = convert_html_entities(html);
    let mut reader = Reader::from_str(&html);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;

    let mut stack = vec![EditableElement::new(FRAGMENT_TAG)];

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let element = decode_element(&reader, &e);
                if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                    push_child(&mut stack, element.into());
                } else {
                    stack.push(element);
                }
            }
            Event::Empty(e) => {
                let element = decode_element(&reader, &e);
                push_child(&mut stack, element.into());
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                push_text(&mut stack, &text);
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?;
                push_text(&mut stack, &decode_entity(&entity));
            }
            Event::CData(e) => {
                push_text(&mut stack, &String::from_utf8_lossy(&e));
            }
            Event::End(e) => {
                let name = decode_name(&reader, e.name().as_ref()).to_ascii_lowercase();
                close_element(&mut stack, &name);
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if stack.len() > 1 {
        tracing::debug!(count = stack.len() - 1, "Closing elements left open in editor HTML");
    }
    while stack.len() > 1 {
        pop_into_parent(&mut stack);
    }
    let fragment = stack.pop().unwrap_or_else(|| EditableElement::new(FRAGMENT_TAG));
    Ok(fragment.into())
}

/// Close the most recent open element named `name`, and everything inside it.
fn close_element(stack: &mut Vec<EditableElement>, name: &str) {
    let Some(depth) = stack.iter().rposition(|element| element.tag == name) else {
        tracing::trace!(tag = name, "Ignoring stray closing tag");
        return;
    };
    if depth == 0 {
        return;
    }
    while stack.len() > depth {
        pop_into_parent(stack);
    }
}

fn pop_into_parent(stack: &mut Vec<EditableElement>) {
    if let Some(element) = stack.pop() {
        push_child(stack, element.into());
    }
}

fn push_child(stack: &mut [EditableElement], node: EditableNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Append text, merging with a preceding text node.
fn push_text(stack: &mut [EditableElement], text: &str) {
    if text.is_empty() {
        return;
    }
    let Some(parent) = stack.last_mut() else {
        return;
    };
    if let Some(EditableNode::Text(last)) = parent.children.last_mut() {
        last.push_str(text);
    } else {
        parent.children.push(EditableNode::Text(text.to_owned()));
    }
}

fn decode_element(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> EditableElement {
    let tag = decode_name(reader, e.name().as_ref());
    let mut element = EditableElement::new(&tag);
    for attr in e.html_attributes().flatten() {
        let key = decode_name(reader, attr.key.as_ref()).to_ascii_lowercase();
        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            Cow::into_owned,
        );
        element.attrs.insert(key, value);
    }
    element
}

fn decode_name(reader: &Reader<&[u8]>, name: &[u8]) -> String {
    reader
        .decoder()
        .decode(name)
        .map_or_else(|_| String::from_utf8_lossy(name).into_owned(), Cow::into_owned)
}

/// Decode an entity reference body such as `lt` or `#91`.
fn decode_entity(entity: &str) -> String {
    let decoded = match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        s => s.strip_prefix('#').and_then(|code| {
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => code.parse::<u32>().ok(),
            };
            value.and_then(char::from_u32)
        }),
    };
    decoded.map_or_else(|| format!("&{entity};"), String::from)
}

/// Replace HTML named entities the XML reader does not know.
fn convert_html_entities(html: &str) -> Cow<'_, str> {
    ENTITY_PATTERN.replace_all(html, |caps: &regex::Captures<'_>| {
        html_entity(&caps[1]).map_or_else(|| caps[0].to_owned(), str::to_owned)
    })
}

fn html_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "nbsp" => "\u{00a0}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "zwnj" => "\u{200c}",
        "zwj" => "\u{200d}",
        "shy" => "\u{00ad}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "hellip" => "\u{2026}",
        "bull" => "\u{2022}",
        "middot" => "\u{00b7}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "laquo" => "\u{00ab}",
        "raquo" => "\u{00bb}",
        "copy" => "\u{00a9}",
        "reg" => "\u{00ae}",
        "trade" => "\u{2122}",
        "deg" => "\u{00b0}",
        "times" => "\u{00d7}",
        "divide" => "\u{00f7}",
        "plusmn" => "\u{00b1}",
        "euro" => "\u{20ac}",
        "pound" => "\u{00a3}",
        "yen" => "\u{00a5}",
        "cent" => "\u{00a2}",
        "sect" => "\u{00a7}",
        "para" => "\u{00b6}",
        "larr" => "\u{2190}",
        "rarr" => "\u{2192}",
        "uarr" => "\u{2191}",
        "darr" => "\u{2193}",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> EditableElement {
        match parse_editable_html(html).unwrap() {
            EditableNode::Element(element) => element,
            EditableNode::Text(text) => panic!("expected fragment element, got text {text:?}"),
        }
    }

    #[test]
    fn test_builders() {
        let node = EditableElement::new("SPAN")
            .with_attr("Style", "color: red")
            .with_text("x");
        assert_eq!(node.tag, "span");
        assert_eq!(node.attr("style"), Some("color: red"));
        assert_eq!(node.children, vec![EditableNode::text("x")]);
    }

    #[test]
    fn test_style_lookup() {
        let node = EditableElement::new("span")
            .with_attr("style", "Font-Weight: bold; color:#f00 ; color: blue;");
        assert_eq!(node.style("font-weight"), Some("bold"));
        assert_eq!(node.style("color"), Some("blue"));
        assert_eq!(node.style("text-align"), None);
        assert_eq!(EditableElement::new("b").style("color"), None);
    }

    #[test]
    fn test_text_content_counts_breaks() {
        let node = EditableElement::new("pre").with_children([
            EditableNode::text("a"),
            EditableElement::new("br").into(),
            EditableElement::new("b").with_text("b").into(),
        ]);
        assert_eq!(node.text_content(), "a\nb");
    }

    #[test]
    fn test_parse_simple() {
        let root = parse("<b>Hello</b> world");
        assert_eq!(root.tag, "body");
        assert_eq!(
            root.children,
            vec![
                EditableElement::new("b").with_text("Hello").into(),
                EditableNode::text(" world"),
            ]
        );
    }

    #[test]
    fn test_parse_void_elements() {
        let root = parse(r#"a<br>b<img src="x.png">c<br/>"#);
        let tags: Vec<_> = root
            .children
            .iter()
            .filter_map(|n| n.as_element().map(|e| e.tag.as_str()))
            .collect();
        assert_eq!(tags, vec!["br", "img", "br"]);
        assert_eq!(root.text_content(), "a\nbc\n");
    }

    #[test]
    fn test_parse_attributes() {
        let root = parse(r#"<iframe src='a?b=1&amp;c=2' allowfullscreen width=500></iframe>"#);
        let iframe = root.children[0].as_element().unwrap();
        assert_eq!(iframe.attr("src"), Some("a?b=1&c=2"));
        assert_eq!(iframe.attr("allowfullscreen"), Some(""));
        assert_eq!(iframe.attr("width"), Some("500"));
    }

    #[test]
    fn test_parse_entities() {
        let root = parse("a&nbsp;b &lt;c&gt; &#91;d&#93; &#x41; &unknown;");
        assert_eq!(root.text_content(), "a\u{a0}b <c> [d] A &unknown;");
    }

    #[test]
    fn test_parse_merges_adjacent_text() {
        let root = parse("a &amp; b");
        assert_eq!(root.children, vec![EditableNode::text("a & b")]);
    }

    #[test]
    fn test_parse_uppercase_tags() {
        let root = parse("<B>x</B>");
        assert_eq!(root.children[0].as_element().unwrap().tag, "b");
    }

    #[test]
    fn test_parse_unclosed_elements() {
        let root = parse("<div><b>x");
        assert_eq!(
            root.children,
            vec![
                EditableElement::new("div")
                    .with_children([EditableElement::new("b").with_text("x").into()])
                    .into()
            ]
        );
    }

    #[test]
    fn test_parse_mismatched_close() {
        // </div> closes the <b> opened inside it.
        let root = parse("<div><b>x</div>y");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[1], EditableNode::text("y"));
    }

    #[test]
    fn test_parse_stray_close_ignored() {
        let root = parse("a</b>b");
        assert_eq!(root.children, vec![EditableNode::text("ab")]);
    }

    #[test]
    fn test_parse_comments_ignored() {
        let root = parse("a<!-- note -->b");
        assert_eq!(root.text_content(), "ab");
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse("").children.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_json_shape() {
        let node: EditableNode = EditableElement::new("b").with_text("x").into();
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "element",
                "value": {
                    "tag": "b",
                    "attrs": {},
                    "children": [{"type": "text", "value": "x"}]
                }
            })
        );
        let back: EditableNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }
}
