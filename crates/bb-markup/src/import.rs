//! Markup to editable HTML, used to seed a rich-text editing surface.
//!
//! Unlike the renderer this is a non-validating converter: container tags
//! are rewritten by a fixed, ordered list of pair substitutions, and anything
//! that does not pair up stays as literal text for the author to fix.
//!
//! Leaf tags are converted first, through the same scanner the renderer
//! uses. Their output has `[`, `]` and newlines encoded as character
//! references, so the container substitutions that follow cannot reach into
//! a code block.
//!
//! The output is XHTML-compatible (`<br />`, `<img ... />`) so it can be read
//! back with [`parse_editable_html`](crate::parse_editable_html).

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::grammar::{IFRAME_ALLOW, Tag};
use crate::render::{RenderOptions, normalize_newlines};
use crate::sanitize::{escape_html, sanitize_color, sanitize_url, youtube_video_id};
use crate::token::{Token, Tokenizer, strip_quotes};

/// How a matched tag pair is rewritten.
enum Replace {
    /// Wrap the body (capture 1) in fixed HTML.
    Wrap {
        open: &'static str,
        close: &'static str,
    },
    /// Build the HTML from the attribute (capture 1) and body (capture 2).
    WithAttr(fn(&str, &str) -> String),
}

/// One entry of the substitution table.
struct Substitution {
    pattern: Regex,
    replace: Replace,
}

impl Substitution {
    fn wrap(name: &str, open: &'static str, close: &'static str) -> Self {
        Self {
            pattern: Regex::new(&format!(r"(?is)\[{name}\](.*?)\[/{name}\]"))
                .expect("invalid substitution regex"),
            replace: Replace::Wrap { open, close },
        }
    }

    fn with_attr(name: &str, build: fn(&str, &str) -> String) -> Self {
        Self {
            pattern: Regex::new(&format!(r"(?is)\[{name}=([^\]]*)\](.*?)\[/{name}\]"))
                .expect("invalid substitution regex"),
            replace: Replace::WithAttr(build),
        }
    }

    /// Apply until no pair is left, so nested pairs of the same tag resolve.
    fn apply(&self, mut text: String) -> String {
        let rewrite = |caps: &Captures<'_>| match self.replace {
            Replace::Wrap { open, close } => format!("{open}{}{close}", &caps[1]),
            Replace::WithAttr(build) => build(&caps[1], &caps[2]),
        };
        loop {
            match self.pattern.replace_all(&text, rewrite) {
                Cow::Borrowed(_) => return text,
                Cow::Owned(next) => text = next,
            }
        }
    }
}

/// Container substitutions, in application order.
static SUBSTITUTIONS: LazyLock<Vec<Substitution>> = LazyLock::new(|| {
    vec![
        Substitution::wrap("b", "<b>", "</b>"),
        Substitution::wrap("i", "<i>", "</i>"),
        Substitution::wrap("u", "<u>", "</u>"),
        Substitution::wrap("s", "<s>", "</s>"),
        Substitution::with_attr("color", color_span),
        Substitution::with_attr("url", link),
        Substitution::wrap("url", r##"<a href="#">"##, "</a>"),
        Substitution::wrap("center", r#"<div style="text-align: center;">"#, "</div>"),
        Substitution::wrap("left", r#"<div style="text-align: left;">"#, "</div>"),
        Substitution::wrap("right", r#"<div style="text-align: right;">"#, "</div>"),
        Substitution::wrap("justify", r#"<div style="text-align: justify;">"#, "</div>"),
        Substitution::with_attr("quote", attributed_quote),
        Substitution::wrap("quote", "<blockquote>", "</blockquote>"),
    ]
});

/// Converts markup to editing-surface HTML.
///
/// # Example
///
/// ```
/// use bb_markup::{Importer, RenderOptions};
///
/// let importer = Importer::new(RenderOptions::default());
/// assert_eq!(
///     importer.import("[b]Hi[/b]\nthere"),
///     "<b>Hi</b><br />there"
/// );
/// ```
#[derive(Clone, Debug, Default)]
pub struct Importer {
    options: RenderOptions,
}

impl Importer {
    /// Create an importer with the given options.
    #[must_use]
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Convert markup to an editable HTML seed.
    #[must_use]
    pub fn import(&self, markup: &str) -> String {
        let source = normalize_newlines(markup);
        let mut seeded = String::with_capacity(source.len() + source.len() / 2);
        let mut after_block_close = false;

        for token in Tokenizer::new(&source) {
            after_block_close = match token {
                Token::Text(text) => {
                    let text = if after_block_close {
                        text.strip_prefix('\n').unwrap_or(text)
                    } else {
                        text
                    };
                    seeded.push_str(&escape_html(text));
                    false
                }
                Token::Open { raw, .. } => {
                    seeded.push_str(&escape_html(raw));
                    false
                }
                Token::Close { name, raw } => {
                    seeded.push_str(&escape_html(raw));
                    Tag::from_name(name).is_some_and(Tag::is_block)
                }
                Token::Leaf { tag, body, raw } => match self.leaf(tag, body) {
                    Some(html) => {
                        seeded.push_str(&html);
                        tag.is_block()
                    }
                    None => {
                        seeded.push_str(&encode_opaque(&escape_html(raw)));
                        false
                    }
                },
            };
        }

        let seeded = SUBSTITUTIONS
            .iter()
            .fold(seeded, |text, substitution| substitution.apply(text));

        seeded.replace('\n', "<br />")
    }

    fn leaf(&self, tag: Tag, body: &str) -> Option<String> {
        match tag {
            Tag::Code => Some(format!("<pre>{}</pre>", encode_opaque(&escape_html(body)))),
            Tag::Img => {
                let src = sanitize_url(body.trim())?;
                Some(format!(r#"<img src="{}" />"#, encode_opaque(&escape_html(&src))))
            }
            Tag::Youtube => {
                let id = youtube_video_id(body)?;
                Some(format!(
                    r#"<iframe src="https://{}/embed/{id}" frameborder="0" allow="{IFRAME_ALLOW}" allowfullscreen=""></iframe>"#,
                    encode_opaque(&escape_html(&self.options.youtube_host))
                ))
            }
            _ => None,
        }
    }
}

/// Convert markup to an editable HTML seed with default options.
///
/// # Example
///
/// ```
/// assert_eq!(
///     bb_markup::to_editable("[center]Hi[/center]\nnext"),
///     r#"<div style="text-align: center;">Hi</div>next"#
/// );
/// ```
#[must_use]
pub fn to_editable(markup: &str) -> String {
    Importer::default().import(markup)
}

fn color_span(attr: &str, body: &str) -> String {
    match sanitize_color(&clean_attr(attr)) {
        Some(color) => format!(r#"<span style="color: {};">{body}</span>"#, escape_html(&color)),
        None => body.to_owned(),
    }
}

fn link(attr: &str, body: &str) -> String {
    let href = sanitize_url(&clean_attr(attr)).unwrap_or_else(|| "#".to_owned());
    format!(r#"<a href="{}">{body}</a>"#, escape_html(&href))
}

fn attributed_quote(attr: &str, body: &str) -> String {
    let author = clean_attr(attr);
    let author = author.trim();
    if author.is_empty() {
        format!("<blockquote>{body}</blockquote>")
    } else {
        format!(
            r#"<blockquote data-author="{}">{body}</blockquote>"#,
            escape_html(author)
        )
    }
}

/// Recover an attribute value from already-escaped text.
fn clean_attr(escaped: &str) -> String {
    let value = unescape_html(escaped);
    strip_quotes(value.trim()).to_owned()
}

fn unescape_html(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Hide brackets and newlines of escaped text from later substitutions.
fn encode_opaque(escaped: &str) -> String {
    escaped
        .replace('[', "&#91;")
        .replace(']', "&#93;")
        .replace('\n', "&#10;")
}
