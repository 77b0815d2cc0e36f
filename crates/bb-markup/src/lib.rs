//! BBCode markup conversion engine.
//!
//! Translates between user-authored bracket markup (`[b]`, `[url=...]`,
//! `[quote]`, ...) and two HTML representations:
//!
//! - [`Renderer`]: markup to sanitized display HTML. Never fails; malformed
//!   input degrades to literal text or is auto-closed.
//! - [`Importer`]: markup to the HTML that seeds a rich-text editing surface.
//! - [`Exporter`]: an [`EditableNode`] tree from the editing surface back to
//!   markup.
//!
//! All three resolve tags through the one [`Tag`] table, so that exporting
//! an imported document and rendering it again is visually stable.
//!
//! # Architecture
//!
//! The renderer and importer share a single forward scanner that recognizes
//! leaf tags (`code`, `img`, `youtube`) as one token kind, so leaf bodies are
//! never re-parsed as markup. Rendered leaf HTML is parked behind
//! placeholder tokens until the rest of the document is assembled.
//!
//! Every conversion is a pure function of its input and options. Renderers,
//! importers and exporters hold no per-call state and can be shared across
//! threads.
//!
//! # Example
//!
//! ```
//! use bb_markup::{parse_editable_html, render, to_editable, to_markup};
//!
//! let markup = "[b]Hello[/b] [url=https://example.com]link[/url]";
//! assert!(render(markup).starts_with("<strong>Hello</strong> <a href=\"https://example.com\""));
//!
//! let tree = parse_editable_html(&to_editable(markup)).unwrap();
//! assert_eq!(to_markup(&tree), markup);
//! ```

mod error;
mod export;
mod grammar;
mod import;
mod placeholder;
mod render;
mod sanitize;
mod token;
mod tree;

pub use error::TreeError;
pub use export::{ExportOptions, Exporter, to_markup};
pub use grammar::{BLOCK_TAGS, Tag};
pub use import::{Importer, to_editable};
pub use render::{RenderOptions, Renderer, render};
pub use sanitize::{
    escape_html, normalize_color, rgb_to_hex, sanitize_color, sanitize_url, youtube_video_id,
};
pub use tree::{EditableElement, EditableNode, parse_editable_html};
