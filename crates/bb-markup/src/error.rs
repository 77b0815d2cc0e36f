//! Error types for reading editing-surface HTML.

/// Error while reading an editable tree from HTML.
///
/// The conversions themselves never fail; this only covers turning editor
/// HTML into an [`EditableNode`](crate::EditableNode).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TreeError {
    /// Markup could not be read even leniently.
    #[error("HTML parse error")]
    Xml(#[from] quick_xml::Error),

    /// Text or a name was not valid in the document encoding.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
}
