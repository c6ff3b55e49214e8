//! Two-way record diff.
//!
//! Compares the records of a child snapshot against its parent snapshot and
//! reports additions, deletions and changed records. The forward pass walks
//! the child snapshot; the backward pass reports parent records the forward
//! pass never visited. Reports keep snapshot order and are not sorted.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::change::ChangeReport;
use crate::identity::Identity;
use crate::listener::{ChangeAndConflictAccumulator, MergeEventListener};
use crate::node::Node;
use crate::revision::FileInRevision;

pub struct TwoWayDiffer {
    identity: Arc<dyn Identity>,
    tombstone_attribute: String,
    parent_revision: Option<FileInRevision>,
    child_revision: Option<FileInRevision>,
}

impl TwoWayDiffer {
    pub fn new(identity: Arc<dyn Identity>, tombstone_attribute: impl Into<String>) -> Self {
        Self {
            identity,
            tombstone_attribute: tombstone_attribute.into(),
            parent_revision: None,
            child_revision: None,
        }
    }

    pub fn with_revisions(mut self, parent: FileInRevision, child: FileInRevision) -> Self {
        self.parent_revision = Some(parent);
        self.child_revision = Some(child);
        self
    }

    /// A record is tombstoned when it carries a non-empty deletion marker.
    pub fn is_tombstoned(&self, node: &Node) -> bool {
        node.attr(&self.tombstone_attribute)
            .is_some_and(|value| !value.trim().is_empty())
    }

    pub fn report_differences(
        &self,
        parent: &[Node],
        child: &[Node],
        listener: &mut dyn MergeEventListener,
    ) {
        let parent_index = self.identity.index_by_identity(parent);
        let mut visited: HashSet<String> = HashSet::with_capacity(child.len());

        for child_node in child {
            let Some(id) = self.identity.id_of(child_node) else {
                warn!(element = %child_node.name, "skipping child record without identity");
                continue;
            };
            let parent_node = parent_index.get(&id).copied();
            if let Some(report) = self.compare(parent_node, child_node, &id) {
                listener.change_occurred(&report);
            }
            visited.insert(id);
        }

        // Records removed outright rather than tombstoned.
        for parent_node in parent {
            let Some(id) = self.identity.id_of(parent_node) else {
                continue;
            };
            if !visited.contains(&id) {
                debug!(id = %id, "record missing from child snapshot");
                listener.change_occurred(&ChangeReport::deletion(
                    self.parent_revision.clone(),
                    self.child_revision.clone(),
                    parent_node.clone(),
                    None,
                ));
            }
        }
    }

    /// Run the diff and return the reports in order.
    pub fn collect(&self, parent: &[Node], child: &[Node]) -> Vec<ChangeReport> {
        let mut accumulator = ChangeAndConflictAccumulator::new();
        self.report_differences(parent, child, &mut accumulator);
        accumulator.changes
    }

    fn compare(
        &self,
        parent_node: Option<&Node>,
        child_node: &Node,
        id: &str,
    ) -> Option<ChangeReport> {
        let child_tombstoned = self.is_tombstoned(child_node);
        let Some(parent_node) = parent_node else {
            // Created and deleted again before it was ever committed.
            if child_tombstoned {
                debug!(id, "ignoring tombstoned record with no parent copy");
                return None;
            }
            return Some(ChangeReport::addition(
                self.child_revision.clone(),
                child_node.clone(),
            ));
        };

        if self.identity.structurally_equal(parent_node, child_node) {
            return None;
        }
        if child_tombstoned {
            return Some(ChangeReport::deletion(
                self.parent_revision.clone(),
                self.child_revision.clone(),
                parent_node.clone(),
                Some(child_node.clone()),
            ));
        }
        Some(ChangeReport::changed_record(
            self.parent_revision.clone(),
            self.child_revision.clone(),
            parent_node.clone(),
            child_node.clone(),
        ))
    }
}
