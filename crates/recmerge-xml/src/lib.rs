//! # recmerge-xml
//!
//! XML front end for the record merge engine. Documents are parsed into
//! [`recmerge_engine::Node`] trees with quick-xml, merged or diffed by the
//! engine, and written back with two-space indentation.
//!
//! [`RecordFileHandler`] packages the merge, diff and presentation entry
//! points as a [`recmerge_core::FileTypeHandler`].

pub mod differ;
pub mod error;
pub mod handler;
pub mod merger;
pub mod parse;
pub mod write;

pub use differ::RecordDiffer;
pub use error::{XmlError, XmlResult};
pub use handler::RecordFileHandler;
pub use merger::{MergeOutcome, XmlMerger};
pub use parse::parse_document;
pub use write::{write_document, write_fragment};
