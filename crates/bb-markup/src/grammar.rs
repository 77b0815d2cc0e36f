//! The fixed BBCode tag table.
//!
//! Every conversion in this crate (renderer, importer, exporter) resolves tag
//! names through [`Tag`], so adding a tag here is the one place where the
//! three directions are kept in lockstep.

use std::fmt::Write;

use crate::render::RenderOptions;
use crate::sanitize::{escape_html, sanitize_color, sanitize_url, youtube_video_id};

/// Names of tags that render as block containers.
///
/// A newline directly after the closer of one of these tags is absorbed by
/// the block's own line break.
pub const BLOCK_TAGS: &[&str] = &[
    "center", "left", "right", "justify", "quote", "code", "youtube",
];

/// Permissions granted to embedded video frames.
pub(crate) const IFRAME_ALLOW: &str =
    "accelerometer; clipboard-write; encrypted-media; gyroscope; picture-in-picture";

/// A supported markup tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Bold,
    Italic,
    Underline,
    Strike,
    Center,
    Left,
    Right,
    Justify,
    Quote,
    Url,
    Color,
    Code,
    Img,
    Youtube,
}

impl Tag {
    /// Every supported tag, in grammar order.
    pub const ALL: [Tag; 14] = [
        Tag::Bold,
        Tag::Italic,
        Tag::Underline,
        Tag::Strike,
        Tag::Center,
        Tag::Left,
        Tag::Right,
        Tag::Justify,
        Tag::Quote,
        Tag::Url,
        Tag::Color,
        Tag::Code,
        Tag::Img,
        Tag::Youtube,
    ];

    /// Look up a tag by name, ignoring ASCII case.
    ///
    /// # Example
    ///
    /// ```
    /// use bb_markup::Tag;
    ///
    /// assert_eq!(Tag::from_name("B"), Some(Tag::Bold));
    /// assert_eq!(Tag::from_name("youtube"), Some(Tag::Youtube));
    /// assert_eq!(Tag::from_name("foo"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.name().eq_ignore_ascii_case(name))
    }

    /// Canonical lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Tag::Bold => "b",
            Tag::Italic => "i",
            Tag::Underline => "u",
            Tag::Strike => "s",
            Tag::Center => "center",
            Tag::Left => "left",
            Tag::Right => "right",
            Tag::Justify => "justify",
            Tag::Quote => "quote",
            Tag::Url => "url",
            Tag::Color => "color",
            Tag::Code => "code",
            Tag::Img => "img",
            Tag::Youtube => "youtube",
        }
    }

    /// Leaf tags carry an opaque body that is never parsed as markup.
    #[must_use]
    pub fn is_leaf(self) -> bool {
        matches!(self, Tag::Code | Tag::Img | Tag::Youtube)
    }

    /// Block tags render as block containers.
    #[must_use]
    pub fn is_block(self) -> bool {
        BLOCK_TAGS.contains(&self.name())
    }

    /// Whether the `[tag=value]` form carries meaning for this tag.
    #[must_use]
    pub fn takes_attribute(self) -> bool {
        matches!(self, Tag::Quote | Tag::Url | Tag::Color)
    }

    /// Alignment keyword for the alignment tags.
    #[must_use]
    pub fn alignment(self) -> Option<&'static str> {
        match self {
            Tag::Center | Tag::Left | Tag::Right | Tag::Justify => Some(self.name()),
            _ => None,
        }
    }

    /// Opening HTML for a container tag.
    ///
    /// Attribute values are sanitized here: an invalid color yields no
    /// wrapper at all, an unsafe or missing link target becomes `#`.
    #[must_use]
    pub fn open(self, attribute: Option<&str>, options: &RenderOptions) -> String {
        match self {
            Tag::Bold => "<strong>".to_owned(),
            Tag::Italic => "<em>".to_owned(),
            Tag::Underline => "<u>".to_owned(),
            Tag::Strike => "<s>".to_owned(),
            Tag::Center | Tag::Left | Tag::Right | Tag::Justify => {
                format!(r#"<div class="bb-align" style="text-align: {};">"#, self.name())
            }
            Tag::Quote => match attribute.map(str::trim).filter(|a| !a.is_empty()) {
                Some(author) => format!(
                    r#"<blockquote class="bb-quote"><div class="bb-quote-author">{} wrote:</div>"#,
                    escape_html(author)
                ),
                None => r#"<blockquote class="bb-quote">"#.to_owned(),
            },
            Tag::Url => {
                let href = attribute.and_then(sanitize_url).unwrap_or_else(|| "#".to_owned());
                format!(
                    r#"<a href="{}" target="_blank" rel="{}">"#,
                    escape_html(&href),
                    escape_html(&options.link_rel)
                )
            }
            Tag::Color => match attribute.and_then(sanitize_color) {
                Some(color) => format!(r#"<span style="color: {color};">"#),
                None => String::new(),
            },
            // Leaf tags are rendered whole by `render_leaf`.
            Tag::Code | Tag::Img | Tag::Youtube => String::new(),
        }
    }

    /// Closing HTML matching [`open`](Self::open) for the same attribute.
    #[must_use]
    pub fn close(self, attribute: Option<&str>) -> &'static str {
        match self {
            Tag::Bold => "</strong>",
            Tag::Italic => "</em>",
            Tag::Underline => "</u>",
            Tag::Strike => "</s>",
            Tag::Center | Tag::Left | Tag::Right | Tag::Justify => "</div>",
            Tag::Quote => "</blockquote>",
            Tag::Url => "</a>",
            Tag::Color => {
                if attribute.and_then(sanitize_color).is_some() {
                    "</span>"
                } else {
                    ""
                }
            }
            Tag::Code | Tag::Img | Tag::Youtube => "",
        }
    }

    /// Full HTML for a leaf tag with the given raw body.
    ///
    /// Returns `None` when the body is unusable (unsafe image URL, unknown
    /// video id); callers render the source text literally instead.
    #[must_use]
    pub fn render_leaf(self, body: &str, options: &RenderOptions) -> Option<String> {
        let mut out = String::new();
        match self {
            Tag::Code => {
                write!(
                    out,
                    r#"<pre class="bb-code"><code>{}</code></pre>"#,
                    escape_html(body)
                )
                .unwrap();
            }
            Tag::Img => {
                let src = sanitize_url(body.trim())?;
                write!(
                    out,
                    r#"<img class="bb-img" src="{}" alt="" loading="lazy">"#,
                    escape_html(&src)
                )
                .unwrap();
            }
            Tag::Youtube => {
                let id = youtube_video_id(body)?;
                write!(
                    out,
                    r#"<div class="bb-youtube"><iframe src="https://{}/embed/{id}" title="YouTube video" frameborder="0" allow="{IFRAME_ALLOW}" referrerpolicy="strict-origin-when-cross-origin" allowfullscreen></iframe></div>"#,
                    escape_html(&options.youtube_host)
                )
                .unwrap();
            }
            _ => return None,
        }
        Some(out)
    }
}
