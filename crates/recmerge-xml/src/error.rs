//! Error types for the XML layer.

use recmerge_engine::EngineError;

/// Errors that abort parsing, writing or loading a document. Merge
/// conflicts are never reported through this type.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// The input is not well-formed XML.
    #[error("malformed xml: {0}")]
    Syntax(#[from] quick_xml::Error),

    /// An attribute could not be read.
    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// Names or text were not valid UTF-8.
    #[error("invalid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The input contains no element at all.
    #[error("document has no root element")]
    NoRootElement,

    /// A second top-level element follows the root.
    #[error("document has more than one root element: <{0}>")]
    MultipleRoots(String),

    /// The input ended inside an element.
    #[error("document ended inside <{0}>")]
    UnexpectedEof(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A revision's contents could not be retrieved.
    #[error("revision error: {0}")]
    Revision(#[from] EngineError),
}

/// Convenience alias for XML results.
pub type XmlResult<T> = Result<T, XmlError>;
