//! Escaping and attribute sanitizers.
//!
//! Attribute values coming from markup are never trusted: URLs are checked
//! against a scheme allow-list and colors against a fixed grammar. A rejected
//! value is reported as `None`; callers degrade the surrounding tag.

use std::sync::LazyLock;

use regex::Regex;

/// URL schemes allowed in links and images.
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto", "ftp"];

/// Named colors accepted by `[color=...]`, with their hex equivalents.
const NAMED_COLORS: &[(&str, &str)] = &[
    ("aqua", "#00ffff"),
    ("beige", "#f5f5dc"),
    ("black", "#000000"),
    ("blue", "#0000ff"),
    ("brown", "#a52a2a"),
    ("chocolate", "#d2691e"),
    ("coral", "#ff7f50"),
    ("crimson", "#dc143c"),
    ("cyan", "#00ffff"),
    ("darkblue", "#00008b"),
    ("darkgreen", "#006400"),
    ("darkorange", "#ff8c00"),
    ("darkred", "#8b0000"),
    ("fuchsia", "#ff00ff"),
    ("gold", "#ffd700"),
    ("gray", "#808080"),
    ("green", "#008000"),
    ("grey", "#808080"),
    ("indigo", "#4b0082"),
    ("khaki", "#f0e68c"),
    ("lightblue", "#add8e6"),
    ("lightgreen", "#90ee90"),
    ("lime", "#00ff00"),
    ("magenta", "#ff00ff"),
    ("maroon", "#800000"),
    ("navy", "#000080"),
    ("olive", "#808000"),
    ("orange", "#ffa500"),
    ("orchid", "#da70d6"),
    ("pink", "#ffc0cb"),
    ("plum", "#dda0dd"),
    ("purple", "#800080"),
    ("red", "#ff0000"),
    ("salmon", "#fa8072"),
    ("silver", "#c0c0c0"),
    ("skyblue", "#87ceeb"),
    ("tan", "#d2b48c"),
    ("teal", "#008080"),
    ("tomato", "#ff6347"),
    ("turquoise", "#40e0d0"),
    ("violet", "#ee82ee"),
    ("white", "#ffffff"),
    ("yellow", "#ffff00"),
];

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").expect("invalid hex regex")
});

static RGB_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*(?:\d+(?:\.\d+)?|\.\d+)%?\s*)?\)$",
    )
    .expect("invalid rgb regex")
});

static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("invalid video id regex"));

static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:https?:)?(?://)?(?:www\.|m\.)?(?:youtube(?:-nocookie)?\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/)|youtu\.be/)([A-Za-z0-9_-]{1,64})(?:[?&#/].*)?$",
    )
    .expect("invalid video url regex")
});

/// Escape HTML special characters for text and attribute positions.
///
/// # Example
///
/// ```
/// use bb_markup::escape_html;
///
/// assert_eq!(escape_html(r#"<a href="x">"#), "&lt;a href=&quot;x&quot;&gt;");
/// ```
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Check a link or image URL against the scheme allow-list.
///
/// Relative and protocol-relative URLs have no scheme and are allowed.
/// Whitespace and control characters are ignored while detecting the scheme,
/// since browsers strip them too (`java\tscript:` is still `javascript:`).
///
/// # Example
///
/// ```
/// use bb_markup::sanitize_url;
///
/// assert_eq!(sanitize_url(" https://example.com "), Some("https://example.com".to_owned()));
/// assert_eq!(sanitize_url("/forum/thread/1"), Some("/forum/thread/1".to_owned()));
/// assert_eq!(sanitize_url("javascript:alert(1)"), None);
/// ```
pub fn sanitize_url(raw: &str) -> Option<String> {
    let url = raw.trim();
    if url.is_empty() {
        return None;
    }

    let squeezed: String = url
        .chars()
        .filter(|c| !c.is_ascii_control() && !c.is_whitespace())
        .collect();

    if let Some(end) = squeezed.find([':', '/', '?', '#'])
        && squeezed[end..].starts_with(':')
    {
        let scheme = squeezed[..end].to_ascii_lowercase();
        if !ALLOWED_SCHEMES.contains(&scheme.as_str()) {
            tracing::debug!(scheme = %scheme, "Rejected URL with disallowed scheme");
            return None;
        }
    }

    Some(url.to_owned())
}

/// Validate a color value.
///
/// Accepts hex (`#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`), `rgb()`/`rgba()`
/// with components in `0..=255`, and a fixed set of named colors. The value
/// is returned trimmed; names are lowercased.
///
/// # Example
///
/// ```
/// use bb_markup::sanitize_color;
///
/// assert_eq!(sanitize_color("#FF0000"), Some("#FF0000".to_owned()));
/// assert_eq!(sanitize_color("Red"), Some("red".to_owned()));
/// assert_eq!(sanitize_color("alert(1)"), None);
/// ```
pub fn sanitize_color(raw: &str) -> Option<String> {
    let value = raw.trim();

    if HEX_COLOR.is_match(value) {
        return Some(value.to_owned());
    }
    if rgb_components(value).is_some() {
        return Some(value.to_owned());
    }

    let name = value.to_ascii_lowercase();
    if NAMED_COLORS.iter().any(|(n, _)| *n == name) {
        return Some(name);
    }

    tracing::debug!(value = %value, "Rejected invalid color value");
    None
}

/// Convert an `rgb(r, g, b)` / `rgba(r, g, b, a)` triple to `#rrggbb`.
///
/// Alpha is dropped. Returns `None` for anything that is not such a triple.
///
/// # Example
///
/// ```
/// use bb_markup::rgb_to_hex;
///
/// assert_eq!(rgb_to_hex("rgb(255, 0, 16)"), Some("#ff0010".to_owned()));
/// assert_eq!(rgb_to_hex("#ff0010"), None);
/// ```
pub fn rgb_to_hex(value: &str) -> Option<String> {
    let (r, g, b) = rgb_components(value.trim())?;
    Some(format!("#{r:02x}{g:02x}{b:02x}"))
}

/// Canonicalize a valid color to lowercase `#rrggbb`.
///
/// Used to compare colors regardless of notation. Short hex forms are
/// expanded and alpha channels dropped.
pub fn normalize_color(raw: &str) -> Option<String> {
    let value = sanitize_color(raw)?;

    if let Some(hex) = rgb_to_hex(&value) {
        return Some(hex);
    }

    if let Some(digits) = value.strip_prefix('#') {
        let digits = digits.to_ascii_lowercase();
        let expanded = match digits.len() {
            3 | 4 => digits.chars().take(3).flat_map(|c| [c, c]).collect(),
            _ => digits[..6].to_owned(),
        };
        return Some(format!("#{expanded}"));
    }

    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, hex)| (*hex).to_owned())
}

/// Extract a YouTube video id from a bare id or a watch/embed/short URL.
///
/// # Example
///
/// ```
/// use bb_markup::youtube_video_id;
///
/// assert_eq!(youtube_video_id("dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_owned()));
/// assert_eq!(
///     youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10"),
///     Some("dQw4w9WgXcQ".to_owned())
/// );
/// assert_eq!(youtube_video_id("not an id"), None);
/// ```
pub fn youtube_video_id(raw: &str) -> Option<String> {
    let value = raw.trim();
    if VIDEO_ID.is_match(value) {
        return Some(value.to_owned());
    }
    VIDEO_URL
        .captures(value)
        .map(|caps| caps[1].to_owned())
}

fn rgb_components(value: &str) -> Option<(u8, u8, u8)> {
    let caps = RGB_COLOR.captures(value)?;
    let r = caps[1].parse::<u8>().ok()?;
    let g = caps[2].parse::<u8>().ok()?;
    let b = caps[3].parse::<u8>().ok()?;
    Some((r, g, b))
}
