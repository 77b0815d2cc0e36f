//! Markup to sanitized HTML for read-only display.
//!
//! # Algorithm
//!
//! The renderer walks the token stream once, keeping a stack of open
//! container tags:
//!
//! - An opening tag emits its HTML and is pushed.
//! - A closing tag pops down to the most recent open tag of the same name,
//!   closing everything opened after it. With no such tag it is literal text.
//! - Unknown tags are literal text.
//! - Leaf tags are rendered whole and parked behind a placeholder.
//! - Text is escaped and newlines become `<br>`. One leading newline is
//!   dropped after a block tag closes, since the block already breaks the line.
//!
//! Whatever is still open at end of input is closed, so the output is always
//! balanced.

use std::borrow::Cow;

use crate::grammar::Tag;
use crate::placeholder::Placeholders;
use crate::sanitize::escape_html;
use crate::token::{Token, Tokenizer};

/// Rendering options shared by the renderer and the editor importer.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderOptions {
    /// Host serving embedded video frames.
    pub youtube_host: String,
    /// `rel` attribute for outbound links.
    pub link_rel: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            youtube_host: "www.youtube-nocookie.com".to_owned(),
            link_rel: "noopener noreferrer nofollow".to_owned(),
        }
    }
}

/// Converts markup to display HTML.
///
/// The renderer holds only its options; every call to
/// [`render`](Self::render) owns its own stack and placeholder map, so a
/// single renderer can be shared across threads.
///
/// # Example
///
/// ```
/// use bb_markup::{RenderOptions, Renderer};
///
/// let renderer = Renderer::new(RenderOptions::default());
/// let html = renderer.render("[b]bold[/b] and [i]italic");
/// assert_eq!(html, "<strong>bold</strong> and <em>italic</em>");
/// ```
#[derive(Clone, Debug, Default)]
pub struct Renderer {
    options: RenderOptions,
}

/// An open container tag on the render stack.
#[derive(Debug)]
struct OpenTag<'a> {
    tag: Tag,
    attr: Option<&'a str>,
}

impl Renderer {
    /// Create a renderer with the given options.
    #[must_use]
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Options this renderer was built with.
    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render markup to sanitized HTML. Never fails.
    #[must_use]
    pub fn render(&self, markup: &str) -> String {
        let source = normalize_newlines(markup);
        let mut out = String::with_capacity(source.len() + source.len() / 2);
        let mut stack: Vec<OpenTag<'_>> = Vec::new();
        let mut placeholders = Placeholders::new();
        let mut after_block_close = false;

        for token in Tokenizer::new(&source) {
            after_block_close = match token {
                Token::Text(text) => {
                    let text = if after_block_close {
                        text.strip_prefix('\n').unwrap_or(text)
                    } else {
                        text
                    };
                    push_text(&mut out, text);
                    false
                }
                Token::Open { name, attr, raw } => {
                    match Tag::from_name(name).filter(|tag| !tag.is_leaf()) {
                        Some(tag) => {
                            out.push_str(&tag.open(attr, &self.options));
                            stack.push(OpenTag { tag, attr });
                        }
                        None => push_text(&mut out, raw),
                    }
                    false
                }
                Token::Close { name, raw } => close_tag(&mut out, &mut stack, name, raw),
                Token::Leaf { tag, body, raw } => match tag.render_leaf(body, &self.options) {
                    Some(html) => {
                        out.push_str(&placeholders.insert(html));
                        tag.is_block()
                    }
                    None => {
                        tracing::debug!(tag = tag.name(), "Leaf body rejected, rendering literally");
                        push_text(&mut out, raw);
                        false
                    }
                },
            };
        }

        if !stack.is_empty() {
            tracing::debug!(count = stack.len(), "Closing tags left open at end of input");
        }
        while let Some(open) = stack.pop() {
            out.push_str(open.tag.close(open.attr));
        }

        tracing::trace!(leaves = placeholders.len(), "Restoring leaf placeholders");
        placeholders.restore(&mut out);
        out
    }
}

/// Render markup with default options.
///
/// # Example
///
/// ```
/// let html = bb_markup::render("[foo]text[/foo]");
/// assert_eq!(html, "[foo]text[/foo]");
/// ```
#[must_use]
pub fn render(markup: &str) -> String {
    Renderer::default().render(markup)
}

/// Handle a closing tag. Returns whether a block tag was closed.
fn close_tag(out: &mut String, stack: &mut Vec<OpenTag<'_>>, name: &str, raw: &str) -> bool {
    let position = Tag::from_name(name)
        .and_then(|tag| stack.iter().rposition(|open| open.tag == tag));

    let Some(depth) = position else {
        tracing::debug!(tag = name, "Unmatched closing tag rendered as text");
        push_text(out, raw);
        return false;
    };

    let dangling = stack.len() - depth - 1;
    if dangling > 0 {
        tracing::debug!(tag = name, count = dangling, "Auto-closing tags opened inside");
    }

    let mut last = None;
    for open in stack.drain(depth..).rev() {
        out.push_str(open.tag.close(open.attr));
        last = Some(open.tag);
    }
    last.is_some_and(Tag::is_block)
}

/// Escape a text run and turn its newlines into line breaks.
fn push_text(out: &mut String, text: &str) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("<br>");
        }
        out.push_str(&escape_html(line));
    }
}

/// Normalize `\r\n` and lone `\r` line endings to `\n`.
pub(crate) fn normalize_newlines(markup: &str) -> Cow<'_, str> {
    if markup.contains('\r') {
        Cow::Owned(markup.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(render(""), "");
    }

    #[test]
    fn test_plain_text_escaped() {
        assert_eq!(render("a < b & c"), "a &lt; b &amp; c");
    }

    #[test]
    fn test_newlines_become_breaks() {
        assert_eq!(render("one\ntwo\r\nthree"), "one<br>two<br>three");
    }

    #[test]
    fn test_nested_inline() {
        assert_eq!(
            render("[b][i]x[/i][/b]"),
            "<strong><em>x</em></strong>"
        );
    }

    #[test]
    fn test_case_insensitive_tags() {
        assert_eq!(render("[B]x[/b]"), "<strong>x</strong>");
    }

    #[test]
    fn test_misordered_close_auto_unwinds() {
        // [/b] closes the dangling [i] first; the trailing [/i] has nothing to match.
        assert_eq!(
            render("[b][i]text[/b][/i]"),
            "<strong><em>text</em></strong>[/i]"
        );
    }

    #[test]
    fn test_unclosed_tags_closed_at_end() {
        assert_eq!(
            render("[quote][b]x"),
            r#"<blockquote class="bb-quote"><strong>x</strong></blockquote>"#
        );
    }

    #[test]
    fn test_stray_close_is_literal() {
        assert_eq!(render("x[/b]y"), "x[/b]y");
    }

    #[test]
    fn test_unknown_tag_passthrough() {
        assert_eq!(render("[foo]text[/foo]"), "[foo]text[/foo]");
        assert_eq!(render("[foo=<x>]"), "[foo=&lt;x&gt;]");
    }

    #[test]
    fn test_newline_after_block_close_dropped_once() {
        assert_eq!(
            render("[center]a[/center]\n\nb"),
            r#"<div class="bb-align" style="text-align: center;">a</div><br>b"#
        );
    }

    #[test]
    fn test_newline_after_inline_close_kept() {
        assert_eq!(render("[b]a[/b]\nb"), "<strong>a</strong><br>b");
    }

    #[test]
    fn test_newline_after_block_leaf_dropped() {
        assert_eq!(
            render("[code]x[/code]\ny"),
            r#"<pre class="bb-code"><code>x</code></pre>y"#
        );
    }

    #[test]
    fn test_newline_after_img_kept() {
        assert_eq!(
            render("[img]/a.png[/img]\ny"),
            r#"<img class="bb-img" src="/a.png" alt="" loading="lazy"><br>y"#
        );
    }

    #[test]
    fn test_leaf_inside_container() {
        assert_eq!(
            render("[quote][code]<b>[/code][/quote]"),
            r#"<blockquote class="bb-quote"><pre class="bb-code"><code>&lt;b&gt;</code></pre></blockquote>"#
        );
    }

    #[test]
    fn test_unclosed_leaf_is_literal() {
        assert_eq!(render("[code]x"), "[code]x");
    }

    #[test]
    fn test_rejected_leaf_is_literal() {
        assert_eq!(
            render("[img]javascript:alert(1)[/img]"),
            "[img]javascript:alert(1)[/img]"
        );
    }

    #[test]
    fn test_placeholder_lookalike_in_text_is_escaped() {
        assert_eq!(render("<bb-leaf-0>"), "&lt;bb-leaf-0&gt;");
    }

    #[test]
    fn test_color_invalid_has_no_style() {
        assert_eq!(render("[color=alert(1)]x[/color]"), "x");
    }

    #[test]
    fn test_custom_options() {
        let renderer = Renderer::new(RenderOptions {
            youtube_host: "www.youtube.com".to_owned(),
            link_rel: "noopener noreferrer".to_owned(),
        });
        let html = renderer.render("[url=https://a.test]a[/url][youtube]abc[/youtube]");
        assert!(html.contains(r#"rel="noopener noreferrer""#));
        assert!(html.contains("https://www.youtube.com/embed/abc"));
    }

    #[test]
    fn test_normalize_newlines() {
        assert_eq!(normalize_newlines("a\r\nb\rc"), "a\nb\nc");
        assert!(matches!(normalize_newlines("a\nb"), Cow::Borrowed(_)));
    }
}
