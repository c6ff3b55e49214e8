//! Revision handles: a file path pinned to a changeset of some repository.
//!
//! Repository access itself is a collaborator; the engine only needs to ask
//! for a file's contents at a changeset.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// What happened to a file in a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Added,
    Modified,
    Deleted,
    Unknown,
}

/// Changeset a handle refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Revision {
    Known(String),
    /// Placeholder for reports produced before the result is committed.
    Unknown,
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Known(id) => f.write_str(id),
            Revision::Unknown => f.write_str("unknown"),
        }
    }
}

/// A file as it exists in one revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileInRevision {
    pub path: String,
    pub revision: Revision,
    pub action: FileAction,
}

impl FileInRevision {
    pub fn new(path: impl Into<String>, changeset: impl Into<String>, action: FileAction) -> Self {
        Self {
            path: path.into(),
            revision: Revision::Known(changeset.into()),
            action,
        }
    }

    pub fn unknown(path: impl Into<String>, action: FileAction) -> Self {
        Self {
            path: path.into(),
            revision: Revision::Unknown,
            action,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.revision == Revision::Unknown
    }

    pub fn get_contents(&self, repository: &dyn Repository) -> EngineResult<String> {
        match &self.revision {
            Revision::Known(changeset) => repository.contents_at(&self.path, changeset),
            Revision::Unknown => Err(EngineError::UnknownRevision {
                path: self.path.clone(),
            }),
        }
    }
}

impl fmt::Display for FileInRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.revision)
    }
}

/// Read access to file contents at a changeset.
pub trait Repository {
    fn contents_at(&self, path: &str, changeset: &str) -> EngineResult<String>;
}

/// Repository backed by a map, for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRepository {
    files: HashMap<(String, String), String>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        path: impl Into<String>,
        changeset: impl Into<String>,
        contents: impl Into<String>,
    ) {
        self.files
            .insert((path.into(), changeset.into()), contents.into());
    }
}

impl Repository for InMemoryRepository {
    fn contents_at(&self, path: &str, changeset: &str) -> EngineResult<String> {
        self.files
            .get(&(path.to_string(), changeset.to_string()))
            .cloned()
            .ok_or_else(|| EngineError::RevisionNotFound {
                path: path.to_string(),
                changeset: changeset.to_string(),
            })
    }
}
