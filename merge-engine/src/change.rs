//! Change reports produced by diffing two snapshots.
//!
//! Unlike conflicts, a change implies no resolution: it records that a
//! record was added, deleted or changed between a parent and a child
//! revision.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::node::Node;
use crate::revision::{FileAction, FileInRevision};

/// The closed set of change variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeKind {
    /// Record exists only in the child snapshot.
    Addition { child: Node },
    /// Record was tombstoned in the child (`child` is the tombstoned copy) or
    /// is missing from it altogether (`child` is `None`).
    Deletion { parent: Node, child: Option<Node> },
    /// Record exists in both and differs; what changed is not computed.
    ChangedRecord { parent: Node, child: Node },
}

/// A change together with its revision provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeReport {
    #[serde(flatten)]
    pub kind: ChangeKind,
    pub parent_revision: Option<FileInRevision>,
    pub child_revision: Option<FileInRevision>,
    /// Locator a UI can use to navigate to the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ChangeReport {
    pub fn addition(child_revision: Option<FileInRevision>, child: Node) -> Self {
        Self {
            kind: ChangeKind::Addition { child },
            parent_revision: None,
            child_revision,
            url: None,
        }
    }

    /// An addition observed while merging, before the result has a revision.
    pub fn addition_mid_merge(path: impl Into<String>, child: Node) -> Self {
        Self::addition(
            Some(FileInRevision::unknown(path, FileAction::Modified)),
            child,
        )
    }

    pub fn deletion(
        parent_revision: Option<FileInRevision>,
        child_revision: Option<FileInRevision>,
        parent: Node,
        child: Option<Node>,
    ) -> Self {
        Self {
            kind: ChangeKind::Deletion { parent, child },
            parent_revision,
            child_revision,
            url: None,
        }
    }

    pub fn changed_record(
        parent_revision: Option<FileInRevision>,
        child_revision: Option<FileInRevision>,
        parent: Node,
        child: Node,
    ) -> Self {
        Self {
            kind: ChangeKind::ChangedRecord { parent, child },
            parent_revision,
            child_revision,
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn action_label(&self) -> &'static str {
        match self.kind {
            ChangeKind::Addition { .. } => "Added",
            ChangeKind::Deletion { .. } => "Deleted",
            ChangeKind::ChangedRecord { .. } => "Changed",
        }
    }

    pub fn parent_node(&self) -> Option<&Node> {
        match &self.kind {
            ChangeKind::Addition { .. } => None,
            ChangeKind::Deletion { parent, .. } | ChangeKind::ChangedRecord { parent, .. } => {
                Some(parent)
            }
        }
    }

    pub fn child_node(&self) -> Option<&Node> {
        match &self.kind {
            ChangeKind::Addition { child } | ChangeKind::ChangedRecord { child, .. } => Some(child),
            ChangeKind::Deletion { child, .. } => child.as_ref(),
        }
    }

    /// Key of the record this report is about.
    pub fn record_id(&self, identity: &dyn Identity) -> Option<String> {
        self.child_node()
            .or(self.parent_node())
            .and_then(|node| identity.id_of(node))
    }

    pub fn description(&self) -> String {
        match &self.kind {
            ChangeKind::Addition { child } => format!("Added a <{}>", child.name),
            ChangeKind::Deletion { parent, .. } => format!("Deleted a <{}>", parent.name),
            ChangeKind::ChangedRecord { child, .. } => format!("Changed a <{}>", child.name),
        }
    }
}
