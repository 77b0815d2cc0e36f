//! Editable tree to markup.
//!
//! A post-order walk: children are serialized first, then the element's tag
//! and inline style decide which wrappers go around them. Editing surfaces
//! express the same formatting either way (`<b>` or `font-weight: bold`),
//! so both are read. Wrappers are applied innermost first in the order bold,
//! italic, underline, strike, color, alignment, and a wrapper already
//! enclosing the whole content is not applied twice.
//!
//! Block output (alignment, quotes, code, video) ends with one newline after
//! its closer. The final cleanup caps blank lines at one outside code bodies,
//! drops a block's trailing newline when an enclosing closer follows directly,
//! and trims the result. A block newline followed by anything else is kept:
//! the importer absorbs exactly that newline again, which keeps repeated edit
//! cycles stable.
//!
//! Leaf bodies cannot carry their own closer. Brackets in image sources are
//! percent-encoded and `[/code]` is removed from code text.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::grammar::{BLOCK_TAGS, Tag};
use crate::sanitize::{normalize_color, rgb_to_hex, sanitize_color, sanitize_url, youtube_video_id};
use crate::token::{Token, Tokenizer};
use crate::tree::{EditableElement, EditableNode};

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("invalid newline regex"));

static NEWLINE_BEFORE_CLOSER: LazyLock<Regex> = LazyLock::new(|| {
    let names = BLOCK_TAGS.join("|");
    Regex::new(&format!(r"(?i)(\[/(?:{names})\])\n(\[/)")).expect("invalid block closer regex")
});

static CODE_CLOSER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[/code\]").expect("invalid code closer regex"));

/// Elements whose content is never exported.
const DROPPED_ELEMENTS: &[&str] = &["script", "style", "template", "head", "title"];

/// Exporter options.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExportOptions {
    /// Document ink colors. Text in one of these counts as uncolored.
    pub default_colors: Vec<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            default_colors: vec!["#000000".to_owned(), "#ffffff".to_owned()],
        }
    }
}

/// Serializes an editable tree back to markup.
///
/// # Example
///
/// ```
/// use bb_markup::{EditableElement, EditableNode, ExportOptions, Exporter};
///
/// let tree: EditableNode = EditableElement::new("div")
///     .with_attr("style", "text-align: center")
///     .with_children([EditableElement::new("strong").with_text("Hi").into()])
///     .into();
///
/// let exporter = Exporter::new(ExportOptions::default());
/// assert_eq!(exporter.export(&tree), "[center][b]Hi[/b][/center]");
/// ```
#[derive(Clone, Debug)]
pub struct Exporter {
    /// Default colors in canonical `#rrggbb` form.
    default_colors: Vec<String>,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(ExportOptions::default())
    }
}

impl Exporter {
    /// Create an exporter. Invalid default colors are ignored.
    #[must_use]
    pub fn new(options: ExportOptions) -> Self {
        let default_colors = options
            .default_colors
            .iter()
            .filter_map(|color| normalize_color(color))
            .collect();
        Self { default_colors }
    }

    /// Serialize a tree to markup.
    #[must_use]
    pub fn export(&self, node: &EditableNode) -> String {
        let raw = self.node(node);
        cleanup(&raw)
    }

    fn node(&self, node: &EditableNode) -> String {
        match node {
            EditableNode::Text(text) => text.replace('\u{a0}', " "),
            EditableNode::Element(element) => self.element(element),
        }
    }

    fn element(&self, element: &EditableElement) -> String {
        let tag = element.tag.as_str();
        match tag {
            "br" => return "\n".to_owned(),
            "img" => return image(element),
            "iframe" => return video(element),
            "pre" => return code(element),
            _ if DROPPED_ELEMENTS.contains(&tag) => return String::new(),
            _ => {}
        }

        let content = self.children(element);
        let content = match tag {
            "a" => link(element, content),
            "blockquote" => quote(element, &content),
            _ => content,
        };
        self.apply_wrappers(element, content)
    }

    /// Concatenate children, turning plain line containers into line breaks.
    fn children(&self, element: &EditableElement) -> String {
        let mut out = String::new();
        let mut pending_break = false;

        for child in &element.children {
            let piece = self.node(child);
            if is_line_container(child) {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                pending_break = !piece.is_empty() && !piece.ends_with('\n');
            } else if !piece.is_empty() {
                if pending_break && !piece.starts_with('\n') {
                    out.push('\n');
                }
                pending_break = false;
            }
            out.push_str(&piece);
        }
        out
    }

    fn apply_wrappers(&self, element: &EditableElement, content: String) -> String {
        if content.is_empty() {
            return content;
        }

        let mut out = content;
        if is_bold(element) {
            out = wrap_inline(out, Tag::Bold, None);
        }
        if is_italic(element) {
            out = wrap_inline(out, Tag::Italic, None);
        }
        if has_decoration(element, &["u", "ins"], "underline") {
            out = wrap_inline(out, Tag::Underline, None);
        }
        if has_decoration(element, &["s", "strike", "del"], "line-through") {
            out = wrap_inline(out, Tag::Strike, None);
        }
        if let Some(color) = self.color(element) {
            out = wrap_inline(out, Tag::Color, Some(&color));
        }
        if let Some(align) = alignment(element) {
            out = wrap_block(out, align);
        }
        out
    }

    /// Explicit, non-default text color of an element.
    fn color(&self, element: &EditableElement) -> Option<String> {
        let raw = element.style("color").or_else(|| {
            (element.tag == "font")
                .then(|| element.attr("color"))
                .flatten()
        })?;

        let color = rgb_to_hex(raw).or_else(|| sanitize_color(raw))?;
        let canonical = normalize_color(&color)?;
        if self.default_colors.contains(&canonical) {
            tracing::trace!(color = %color, "Skipping default ink color");
            return None;
        }
        Some(color)
    }
}

/// Serialize a tree with default options.
///
/// # Example
///
/// ```
/// use bb_markup::{EditableElement, to_markup};
///
/// let tree = EditableElement::new("b").with_text("x").into();
/// assert_eq!(to_markup(&tree), "[b]x[/b]");
/// ```
#[must_use]
pub fn to_markup(node: &EditableNode) -> String {
    Exporter::default().export(node)
}

fn image(element: &EditableElement) -> String {
    match element.attr("src").and_then(sanitize_url) {
        Some(src) => format!("[img]{}[/img]", encode_brackets(&src)),
        None => {
            tracing::debug!("Dropping image without a safe source");
            String::new()
        }
    }
}

fn video(element: &EditableElement) -> String {
    let id = element
        .attr("src")
        .filter(|src| src.contains('/'))
        .and_then(youtube_video_id);
    match id {
        Some(id) => format!("[youtube]{id}[/youtube]\n"),
        None => {
            tracing::debug!("Dropping frame that is not a video embed");
            String::new()
        }
    }
}

fn link(element: &EditableElement, content: String) -> String {
    let Some(href) = element.attr("href").and_then(sanitize_url) else {
        return content;
    };
    if href == "#" {
        return format!("[url]{content}[/url]");
    }
    format!("[url={}]{content}[/url]", encode_brackets(&href))
}

fn quote(element: &EditableElement, content: &str) -> String {
    let author = element
        .attr("data-author")
        .map(|author| author.replace(['[', ']', '\n'], ""))
        .filter(|author| !author.trim().is_empty());
    let content = content.trim_end_matches('\n');
    match author {
        Some(author) => format!("[quote={}]{content}[/quote]\n", author.trim()),
        None => format!("[quote]{content}[/quote]\n"),
    }
}

fn code(element: &EditableElement) -> String {
    let mut text = element.text_content();
    loop {
        match CODE_CLOSER.replace_all(&text, "") {
            Cow::Borrowed(_) => return format!("[code]{text}[/code]\n"),
            Cow::Owned(stripped) => {
                tracing::debug!("Removing code closer from code text");
                text = stripped;
            }
        }
    }
}

fn encode_brackets(url: &str) -> String {
    url.replace('[', "%5B").replace(']', "%5D")
}

fn is_bold(element: &EditableElement) -> bool {
    if matches!(element.tag.as_str(), "b" | "strong") {
        return true;
    }
    element.style("font-weight").is_some_and(|weight| {
        let weight = weight.to_ascii_lowercase();
        weight == "bold" || weight == "bolder" || weight.parse::<u16>().is_ok_and(|w| w >= 600)
    })
}

fn is_italic(element: &EditableElement) -> bool {
    matches!(element.tag.as_str(), "i" | "em")
        || element.style("font-style").is_some_and(|style| {
            let style = style.to_ascii_lowercase();
            style == "italic" || style == "oblique"
        })
}

fn has_decoration(element: &EditableElement, tags: &[&str], line: &str) -> bool {
    tags.contains(&element.tag.as_str())
        || ["text-decoration", "text-decoration-line"]
            .iter()
            .filter_map(|property| element.style(property))
            .any(|value| value.to_ascii_lowercase().contains(line))
}

fn alignment(element: &EditableElement) -> Option<Tag> {
    let by_name = |value: &str| Tag::from_name(value.trim()).filter(|tag| tag.alignment().is_some());

    element
        .style("text-align")
        .and_then(by_name)
        .or_else(|| element.attr("align").and_then(by_name))
        .or_else(|| (element.tag == "center").then_some(Tag::Center))
}

/// A `div`/`p` without alignment: a line of its own, not a block tag.
fn is_line_container(node: &EditableNode) -> bool {
    node.as_element()
        .is_some_and(|element| matches!(element.tag.as_str(), "div" | "p") && alignment(element).is_none())
}

fn wrap_inline(content: String, tag: Tag, attribute: Option<&str>) -> String {
    if is_wrapped(&content, tag) {
        return content;
    }
    let name = tag.name();
    match attribute {
        Some(value) => format!("[{name}={value}]{content}[/{name}]"),
        None => format!("[{name}]{content}[/{name}]"),
    }
}

fn wrap_block(content: String, tag: Tag) -> String {
    let inner = content.trim_end_matches('\n');
    if is_wrapped(inner, tag) {
        return content;
    }
    let name = tag.name();
    format!("[{name}]{inner}[/{name}]\n")
}

/// Whether `content` is one `tag` pair enclosing everything.
///
/// `[b]x[/b][b]y[/b]` starts and ends with the tag but is two pairs, so it
/// is not wrapped.
fn is_wrapped(content: &str, tag: Tag) -> bool {
    let mut tokens = Tokenizer::new(content).peekable();
    let opens = |name: &str| Tag::from_name(name) == Some(tag);

    if !matches!(tokens.next(), Some(Token::Open { name, .. }) if opens(name)) {
        return false;
    }

    let mut depth = 1usize;
    while let Some(token) = tokens.next() {
        match token {
            Token::Open { name, .. } if opens(name) => depth += 1,
            Token::Close { name, .. } if opens(name) => {
                depth -= 1;
                if depth == 0 {
                    return tokens.peek().is_none();
                }
            }
            _ => {}
        }
    }
    false
}

/// Normalize newlines outside code blocks and trim the result.
fn cleanup(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut stretch = String::new();
    let mut after_code = false;

    for token in Tokenizer::new(raw) {
        match token {
            Token::Leaf {
                tag: Tag::Code,
                raw,
                ..
            } => {
                out.push_str(&normalize_stretch(&stretch, after_code));
                stretch.clear();
                out.push_str(raw);
                after_code = true;
            }
            Token::Text(text) => stretch.push_str(text),
            Token::Open { raw, .. } | Token::Close { raw, .. } | Token::Leaf { raw, .. } => {
                stretch.push_str(raw);
            }
        }
    }
    out.push_str(&normalize_stretch(&stretch, after_code));
    out.trim().to_owned()
}

fn normalize_stretch(stretch: &str, after_code: bool) -> String {
    let stretch = match stretch.strip_prefix('\n') {
        Some(rest) if after_code && rest.starts_with("[/") => rest,
        _ => stretch,
    };
    let mut text = EXCESS_NEWLINES.replace_all(stretch, "\n\n").into_owned();
    // Matches consume the next closer's `[/`, so a chain needs several passes.
    loop {
        match NEWLINE_BEFORE_CLOSER.replace_all(&text, "$1$2") {
            Cow::Borrowed(_) => return text,
            Cow::Owned(stripped) => text = stripped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(tag: &str) -> EditableElement {
        EditableElement::new(tag)
    }

    fn export(node: impl Into<EditableNode>) -> String {
        to_markup(&node.into())
    }

    #[test]
    fn test_text_is_literal() {
        assert_eq!(to_markup(&EditableNode::text("a [b] <c>")), "a [b] <c>");
    }

    #[test]
    fn test_semantic_tags() {
        let tree = el("body").with_children([
            el("strong").with_text("a").into(),
            el("em").with_text("b").into(),
            el("u").with_text("c").into(),
            el("del").with_text("d").into(),
        ]);
        assert_eq!(export(tree), "[b]a[/b][i]b[/i][u]c[/u][s]d[/s]");
    }

    #[test]
    fn test_style_formatting() {
        let span = el("span")
            .with_attr(
                "style",
                "font-weight: 700; font-style: italic; text-decoration: underline line-through",
            )
            .with_text("x");
        assert_eq!(export(span), "[s][u][i][b]x[/b][/i][/u][/s]");
    }

    #[test]
    fn test_normal_weight_is_not_bold() {
        let span = el("span").with_attr("style", "font-weight: 400").with_text("x");
        assert_eq!(export(span), "x");
    }

    #[test]
    fn test_no_double_wrap() {
        let tree = el("b").with_children([el("strong").with_text("x").into()]);
        assert_eq!(export(tree), "[b]x[/b]");

        let styled = el("b").with_attr("style", "font-weight: bold").with_text("x");
        assert_eq!(export(styled), "[b]x[/b]");
    }

    #[test]
    fn test_sibling_pairs_are_wrapped() {
        let tree = el("b").with_children([
            el("b").with_text("x").into(),
            EditableNode::text(" "),
            el("b").with_text("y").into(),
        ]);
        assert_eq!(export(tree), "[b][b]x[/b] [b]y[/b][/b]");
    }

    #[test]
    fn test_color_rgb_to_hex() {
        let span = el("span").with_attr("style", "color: rgb(255, 0, 0)").with_text("x");
        assert_eq!(export(span), "[color=#ff0000]x[/color]");
    }

    #[test]
    fn test_default_colors_ignored() {
        for color in ["#000", "rgb(0, 0, 0)", "black", "#FFFFFF"] {
            let span = el("span").with_attr("style", format!("color: {color}")).with_text("x");
            assert_eq!(export(span), "x", "color {color}");
        }
    }

    #[test]
    fn test_custom_default_colors() {
        let exporter = Exporter::new(ExportOptions {
            default_colors: vec!["#333333".to_owned()],
        });
        let gray = el("span").with_attr("style", "color: #333").with_text("x").into();
        let black = el("span").with_attr("style", "color: #000").with_text("x").into();
        assert_eq!(exporter.export(&gray), "x");
        assert_eq!(exporter.export(&black), "[color=#000]x[/color]");
    }

    #[test]
    fn test_invalid_color_ignored() {
        let span = el("span").with_attr("style", "color: expression(x)").with_text("x");
        assert_eq!(export(span), "x");
    }

    #[test]
    fn test_font_color() {
        let font = el("font").with_attr("color", "#00ff00").with_text("x");
        assert_eq!(export(font), "[color=#00ff00]x[/color]");
    }

    #[test]
    fn test_color_wraps_formatting() {
        let span = el("b").with_attr("style", "color: #f00").with_text("x");
        assert_eq!(export(span), "[color=#f00][b]x[/b][/color]");
    }

    #[test]
    fn test_alignment_sources() {
        let styled = el("div").with_attr("style", "text-align: right").with_text("x");
        assert_eq!(export(styled), "[right]x[/right]");

        let attr = el("p").with_attr("align", "justify").with_text("x");
        assert_eq!(export(attr), "[justify]x[/justify]");

        assert_eq!(export(el("center").with_text("x")), "[center]x[/center]");
    }

    #[test]
    fn test_block_newline_outside_closer() {
        let tree = el("body").with_children([
            el("div").with_attr("style", "text-align: center").with_text("a").into(),
            EditableNode::text("b"),
        ]);
        assert_eq!(export(tree), "[center]a[/center]\nb");
    }

    #[test]
    fn test_nested_block_newline_stripped() {
        let tree = el("blockquote").with_children([
            el("div").with_attr("style", "text-align: center").with_text("a").into(),
        ]);
        assert_eq!(export(tree), "[quote][center]a[/center][/quote]");
    }

    #[test]
    fn test_nested_quotes_have_no_inner_newlines() {
        let tree = el("blockquote").with_children([el("blockquote")
            .with_children([el("blockquote").with_text("x").into()])
            .into()]);
        assert_eq!(export(tree), "[quote][quote][quote]x[/quote][/quote][/quote]");
    }

    #[test]
    fn test_quote_trailing_breaks_trimmed() {
        let quote = el("blockquote").with_children([
            EditableNode::text("x"),
            el("br").into(),
            el("br").into(),
        ]);
        assert_eq!(export(quote), "[quote]x[/quote]");
    }

    #[test]
    fn test_cleanup_strips_every_newline_in_closer_chain() {
        let raw = "[quote][center][quote]x[/quote]\n[/center]\n[/quote]\n[/quote]\n";
        let cleaned = cleanup(raw);
        assert_eq!(cleaned, "[quote][center][quote]x[/quote][/center][/quote][/quote]");
        assert_eq!(cleanup(&cleaned), cleaned);
    }

    #[test]
    fn test_cleanup_keeps_newline_before_text() {
        assert_eq!(cleanup("[center]a[/center]\nb\n"), "[center]a[/center]\nb");
    }

    #[test]
    fn test_line_containers() {
        let tree = el("body").with_children([
            EditableNode::text("a"),
            el("div").with_text("b").into(),
            el("div").with_children([el("br").into()]).into(),
            el("div").with_text("c").into(),
            EditableNode::text("d"),
        ]);
        assert_eq!(export(tree), "a\nb\n\nc\nd");
    }

    #[test]
    fn test_excess_blank_lines_collapsed() {
        let tree = el("body").with_children([
            EditableNode::text("a"),
            el("br").into(),
            el("br").into(),
            el("br").into(),
            el("br").into(),
            EditableNode::text("b"),
        ]);
        assert_eq!(export(tree), "a\n\nb");
    }

    #[test]
    fn test_result_trimmed() {
        let tree = el("body").with_children([
            el("br").into(),
            EditableNode::text("  x  "),
            el("br").into(),
        ]);
        assert_eq!(export(tree), "x");
    }

    #[test]
    fn test_link() {
        let a = el("a").with_attr("href", "https://example.com").with_text("x");
        assert_eq!(export(a), "[url=https://example.com]x[/url]");

        let hash = el("a").with_attr("href", "#").with_text("x");
        assert_eq!(export(hash), "[url]x[/url]");

        let brackets = el("a").with_attr("href", "https://x.test/a[1]").with_text("x");
        assert_eq!(export(brackets), "[url=https://x.test/a%5B1%5D]x[/url]");
    }

    #[test]
    fn test_unsafe_link_degrades_to_label() {
        let a = el("a").with_attr("href", "javascript:alert(1)").with_text("x");
        assert_eq!(export(a), "x");
        assert_eq!(export(el("a").with_text("x")), "x");
    }

    #[test]
    fn test_image() {
        let img = el("img").with_attr("src", "https://example.com/a.png");
        assert_eq!(export(img), "[img]https://example.com/a.png[/img]");
        assert_eq!(export(el("img").with_attr("src", "javascript:x")), "");
        assert_eq!(export(el("img")), "");
    }

    #[test]
    fn test_video() {
        let frame = el("iframe").with_attr("src", "https://www.youtube-nocookie.com/embed/abc_123");
        assert_eq!(export(frame), "[youtube]abc_123[/youtube]");
        assert_eq!(export(el("iframe").with_attr("src", "https://evil.test/x")), "");
    }

    #[test]
    fn test_quote() {
        assert_eq!(export(el("blockquote").with_text("x")), "[quote]x[/quote]");
        let attributed = el("blockquote").with_attr("data-author", "Al]ice").with_text("x");
        assert_eq!(export(attributed), "[quote=Alice]x[/quote]");
    }

    #[test]
    fn test_pre_uses_raw_text() {
        let pre = el("pre").with_children([
            EditableNode::text("[b]x[/b]"),
            el("br").into(),
            el("b").with_text("y").into(),
        ]);
        assert_eq!(export(pre), "[code][b]x[/b]\ny[/code]");
    }

    #[test]
    fn test_image_source_cannot_close_leaf() {
        let img = el("img").with_attr("src", "https://x.test/a[/img].png");
        assert_eq!(export(img), "[img]https://x.test/a%5B/img%5D.png[/img]");
    }

    #[test]
    fn test_code_text_cannot_close_leaf() {
        assert_eq!(
            export(el("pre").with_text("a[/code]b[/CODE]c")),
            "[code]abc[/code]"
        );
        assert_eq!(export(el("pre").with_text("x[/co[/code]de]")), "[code]x[/code]");
    }

    #[test]
    fn test_code_newlines_not_collapsed() {
        let tree = el("body").with_children([
            el("pre").with_text("a\n\n\n\nb").into(),
            el("br").into(),
            el("br").into(),
            el("br").into(),
            EditableNode::text("c"),
        ]);
        assert_eq!(export(tree), "[code]a\n\n\n\nb[/code]\n\nc");
    }

    #[test]
    fn test_code_newline_before_closer_stripped() {
        let tree = el("blockquote").with_children([el("pre").with_text("x").into()]);
        assert_eq!(export(tree), "[quote][code]x[/code][/quote]");
    }

    #[test]
    fn test_dropped_elements() {
        let tree = el("body").with_children([
            el("script").with_text("alert(1)").into(),
            EditableNode::text("x"),
        ]);
        assert_eq!(export(tree), "x");
    }

    #[test]
    fn test_empty_formatting_dropped() {
        assert_eq!(export(el("b")), "");
    }

    #[test]
    fn test_nbsp_becomes_space() {
        assert_eq!(to_markup(&EditableNode::text("a\u{a0}b")), "a b");
    }

    #[test]
    fn test_is_wrapped() {
        assert!(is_wrapped("[b]x[/b]", Tag::Bold));
        assert!(is_wrapped("[b][b]x[/b][/b]", Tag::Bold));
        assert!(!is_wrapped("[b]x[/b][b]y[/b]", Tag::Bold));
        assert!(!is_wrapped("[i]x[/i]", Tag::Bold));
        assert!(is_wrapped("[color=red]x[/color]", Tag::Color));
        assert!(!is_wrapped("[b]x", Tag::Bold));
    }
}
