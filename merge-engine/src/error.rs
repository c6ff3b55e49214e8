//! Error types for the engine.
//!
//! Merging and diffing never fail on content; only retrieving a revision's
//! contents from a repository can.

/// Errors raised while resolving revision handles.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The repository has no contents for the path at that changeset.
    #[error("no contents for {path} at revision {changeset}")]
    RevisionNotFound { path: String, changeset: String },

    /// The handle points at a revision that has not been committed yet.
    #[error("cannot read {path}: revision is unknown")]
    UnknownRevision { path: String },
}

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;
