//! Three-way node merge.
//!
//! Given `ours`, `theirs` and their common `ancestor`, the merger rewrites
//! `ours` in place into the merged result. Each element is merged in three
//! steps:
//! - **Attributes**: per attribute name, ours wins ties and conflicts are
//!   reported
//! - **Text**: trimmed text content is classified the same way as a single
//!   attribute value
//! - **Children**: children are aligned by identity (not position); records
//!   present on one side only are resolved like attribute presence, records
//!   present on both sides are merged recursively. The text following a
//!   matched child (its tail) is merged like text, so mixed content keeps
//!   its order
//!
//! Conflicting edits never abort the merge. Each conflict is decided by the
//! active [`MergePolicy`] and reported to the listener.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::conflict::{Conflict, ConflictKind, Winner};
use crate::identity::{AttributeIdentity, Identity};
use crate::listener::{
    ChangeAndConflictAccumulator, ContextDescriptor, DispatchingListener, MergeEventListener,
    NullListener,
};
use crate::node::Node;
use crate::policy::{DefaultPolicy, MergePolicy};

/// Conflicts collected by [`NodeMerger::merge_collect`].
#[derive(Debug, Default)]
pub struct NodeMergeResult {
    pub conflicts: Vec<Conflict>,
}

/// Key used to align children across the three revisions.
///
/// Children with an identity are matched by it. Children without one are
/// matched by element name and their rank among same-named siblings that
/// also lack an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ChildKey {
    name: String,
    id: Option<String>,
    rank: usize,
}

pub struct NodeMerger {
    identity: Arc<dyn Identity>,
    policy: Arc<dyn MergePolicy>,
}

impl NodeMerger {
    pub fn new(identity: Arc<dyn Identity>, policy: Arc<dyn MergePolicy>) -> Self {
        Self { identity, policy }
    }

    pub fn with_identity(identity: Arc<dyn Identity>) -> Self {
        Self::new(identity, Arc::new(DefaultPolicy))
    }

    pub fn policy(&self) -> &dyn MergePolicy {
        self.policy.as_ref()
    }

    pub fn identity(&self) -> &dyn Identity {
        self.identity.as_ref()
    }

    /// Merge `theirs` into `ours`, reporting to `listener` (events are
    /// discarded when none is given).
    pub fn merge(
        &self,
        ours: &mut Node,
        theirs: &Node,
        ancestor: Option<&Node>,
        listener: Option<&mut dyn MergeEventListener>,
    ) {
        let path = ours.name.clone();
        match listener {
            Some(listener) => self.merge_node(ours, theirs, ancestor, &path, listener),
            None => self.merge_node(ours, theirs, ancestor, &path, &mut NullListener),
        }
    }

    /// Merge and return the conflicts instead of streaming them.
    pub fn merge_collect(
        &self,
        ours: &mut Node,
        theirs: &Node,
        ancestor: Option<&Node>,
    ) -> NodeMergeResult {
        let mut accumulator = ChangeAndConflictAccumulator::new();
        {
            let mut dispatcher = DispatchingListener::new();
            dispatcher.add_listener(&mut accumulator);
            self.merge(ours, theirs, ancestor, Some(&mut dispatcher));
        }
        NodeMergeResult {
            conflicts: accumulator.conflicts,
        }
    }

    fn merge_node(
        &self,
        ours: &mut Node,
        theirs: &Node,
        ancestor: Option<&Node>,
        path: &str,
        listener: &mut dyn MergeEventListener,
    ) {
        listener.entering_context(&ContextDescriptor::new(&ours.name, path));
        self.merge_attributes(ours, theirs, ancestor, path, listener);
        self.merge_text(ours, theirs, ancestor, path, listener);
        self.merge_children(ours, theirs, ancestor, path, listener);
    }

    fn merge_attributes(
        &self,
        ours: &mut Node,
        theirs: &Node,
        ancestor: Option<&Node>,
        path: &str,
        listener: &mut dyn MergeEventListener,
    ) {
        for their_attr in &theirs.attributes {
            let name = their_attr.name.as_str();
            let theirs_value = their_attr.value.as_str();
            let ours_value = ours.attr(name).map(str::to_string);
            let ancestor_value = ancestor.and_then(|a| a.attr(name));

            match (ours_value.as_deref(), ancestor_value) {
                // Only they introduced it.
                (None, None) => ours.set_attr(name, theirs_value),
                // We deleted it, they left it alone.
                (None, Some(base)) if base == theirs_value => {}
                // We deleted it, they changed it.
                (None, Some(base)) => {
                    let conflict = Conflict::new(
                        ConflictKind::RemovedVsEditedAttribute,
                        name,
                        None,
                        Some(theirs_value.to_string()),
                        Some(base.to_string()),
                    );
                    if self.report(conflict, path, listener) == Winner::Theirs {
                        ours.set_attr(name, theirs_value);
                    }
                }
                (Some(mine), _) if mine == theirs_value => {}
                // Both introduced it with different values.
                (Some(mine), None) => {
                    let conflict = Conflict::new(
                        ConflictKind::BothEditedAttribute,
                        name,
                        Some(mine.to_string()),
                        Some(theirs_value.to_string()),
                        None,
                    );
                    if self.report(conflict, path, listener) == Winner::Theirs {
                        ours.set_attr(name, theirs_value);
                    }
                }
                // We never touched it, so take their change.
                (Some(mine), Some(base)) if mine == base => ours.set_attr(name, theirs_value),
                // Only we changed it.
                (Some(_), Some(base)) if base == theirs_value => {}
                (Some(mine), Some(base)) => {
                    let conflict = Conflict::new(
                        ConflictKind::BothEditedAttribute,
                        name,
                        Some(mine.to_string()),
                        Some(theirs_value.to_string()),
                        Some(base.to_string()),
                    );
                    if self.report(conflict, path, listener) == Winner::Theirs {
                        ours.set_attr(name, theirs_value);
                    }
                }
            }
        }

        // Their deletions.
        let ours_snapshot = ours.attributes.clone();
        for our_attr in &ours_snapshot {
            if theirs.has_attr(&our_attr.name) {
                continue;
            }
            let Some(base) = ancestor.and_then(|a| a.attr(&our_attr.name)) else {
                continue;
            };
            if our_attr.value == base {
                ours.remove_attr(&our_attr.name);
                continue;
            }
            let conflict = Conflict::new(
                ConflictKind::RemovedVsEditedAttribute,
                our_attr.name.as_str(),
                Some(our_attr.value.clone()),
                None,
                Some(base.to_string()),
            );
            if self.report(conflict, path, listener) == Winner::Theirs {
                ours.remove_attr(&our_attr.name);
            }
        }
    }

    fn merge_text(
        &self,
        ours: &mut Node,
        theirs: &Node,
        ancestor: Option<&Node>,
        path: &str,
        listener: &mut dyn MergeEventListener,
    ) {
        let field = ours.name.clone();
        let base = ancestor.map(Node::trimmed_text);
        self.merge_text_slot(&mut ours.text, &theirs.text, base, &field, path, listener);
    }

    /// Merge the text following a matched child, inside its parent's content.
    fn merge_tail(
        &self,
        ours: &mut Node,
        theirs: &Node,
        ancestor: Option<&Node>,
        path: &str,
        listener: &mut dyn MergeEventListener,
    ) {
        if ours.trimmed_tail() == theirs.trimmed_tail() {
            return;
        }
        let field = format!("{} tail", ours.name);
        let base = ancestor.map(Node::trimmed_tail);
        self.merge_text_slot(&mut ours.tail, &theirs.tail, base, &field, path, listener);
    }

    /// Trimmed values are classified; the untrimmed winner is kept.
    fn merge_text_slot(
        &self,
        ours: &mut Option<String>,
        theirs: &Option<String>,
        base: Option<&str>,
        field: &str,
        path: &str,
        listener: &mut dyn MergeEventListener,
    ) {
        let mine = trimmed(ours).to_string();
        let other = trimmed(theirs);

        if mine == other {
            return;
        }

        let kind = if mine.is_empty() {
            match base {
                // We never had text.
                None | Some("") => {
                    *ours = theirs.clone();
                    return;
                }
                // We deleted it and they left it alone.
                Some(base) if base == other => return,
                Some(_) => ConflictKind::RemovedVsEditedText,
            }
        } else if base.is_none_or(|base| base != mine) {
            if other.is_empty() {
                ConflictKind::RemovedVsEditedText
            } else if base == Some(other) {
                // Only we edited it.
                return;
            } else {
                ConflictKind::BothEditedText
            }
        } else {
            // We never edited it.
            *ours = theirs.clone();
            return;
        };

        let conflict = Conflict::new(
            kind,
            field,
            non_empty(&mine),
            non_empty(other),
            base.and_then(non_empty),
        );
        if self.report(conflict, path, listener) == Winner::Theirs {
            *ours = theirs.clone();
        }
    }

    fn merge_children(
        &self,
        ours: &mut Node,
        theirs: &Node,
        ancestor: Option<&Node>,
        path: &str,
        listener: &mut dyn MergeEventListener,
    ) {
        let ancestor_children: &[Node] = ancestor.map(|a| a.children.as_slice()).unwrap_or(&[]);
        let their_keys = self.child_keys(&theirs.children);
        let their_index = key_index(&their_keys);
        let ancestor_keys = self.child_keys(ancestor_children);
        let ancestor_index = key_index(&ancestor_keys);
        let our_keys = self.child_keys(&ours.children);
        let our_index = key_index(&our_keys);

        // Records taken from theirs, keyed by the index of the original
        // child of ours they go before. New records follow the counterpart
        // of their preceding sibling in theirs.
        let mut insertions: Vec<(usize, Node)> = Vec::new();
        let mut slot = 0;
        for (their_child, key) in theirs.children.iter().zip(&their_keys) {
            let ancestor_child = ancestor_index.get(key).map(|&i| &ancestor_children[i]);

            if let Some(&idx) = our_index.get(key) {
                slot = idx + 1;
                let child_path = child_path(path, key);
                let our_child = &mut ours.children[idx];
                self.merge_tail(our_child, their_child, ancestor_child, path, listener);
                if self.identity.structurally_equal(our_child, their_child) {
                    continue;
                }
                self.merge_node(our_child, their_child, ancestor_child, &child_path, listener);
                continue;
            }

            match ancestor_child {
                None => {
                    debug!(path, element = %key.name, "adopting record added by theirs");
                    insertions.push((slot, their_child.clone()));
                }
                Some(base) if self.identity.structurally_equal(base, their_child) => {
                    debug!(path, element = %key.name, "keeping our deletion of record");
                }
                Some(base) => {
                    let conflict = Conflict::new(
                        ConflictKind::RemovedVsEditedElement,
                        key.name.as_str(),
                        None,
                        Some(their_child.to_string()),
                        Some(base.to_string()),
                    );
                    if self.report(conflict, &child_path(path, key), listener) == Winner::Theirs {
                        insertions.push((slot, their_child.clone()));
                    }
                }
            }
        }

        // Records we hold that they do not.
        let mut removed = vec![false; ours.children.len()];
        for (idx, key) in our_keys.iter().enumerate() {
            if their_index.contains_key(key) {
                continue;
            }
            let Some(base) = ancestor_index.get(key).map(|&i| &ancestor_children[i]) else {
                // Only we added it.
                continue;
            };
            let our_child = &ours.children[idx];
            if self.identity.structurally_equal(our_child, base) {
                debug!(path, element = %key.name, "accepting their deletion of record");
                removed[idx] = true;
                continue;
            }
            let conflict = Conflict::new(
                ConflictKind::RemovedVsEditedElement,
                key.name.as_str(),
                Some(our_child.to_string()),
                None,
                Some(base.to_string()),
            );
            if self.report(conflict, &child_path(path, key), listener) == Winner::Theirs {
                removed[idx] = true;
            }
        }

        if insertions.is_empty() && !removed.contains(&true) {
            return;
        }
        insertions.sort_by_key(|(slot, _)| *slot);
        let mut pending = insertions.into_iter().peekable();
        let original = std::mem::take(&mut ours.children);
        let mut merged = Vec::with_capacity(original.len() + pending.len());
        for (idx, child) in original.into_iter().enumerate() {
            while let Some((_, node)) = pending.next_if(|(slot, _)| *slot <= idx) {
                merged.push(node);
            }
            if !removed[idx] {
                merged.push(child);
            }
        }
        merged.extend(pending.map(|(_, node)| node));
        ours.children = merged;
    }

    /// Let the policy decide a conflict, then report it.
    fn report(
        &self,
        conflict: Conflict,
        path: &str,
        listener: &mut dyn MergeEventListener,
    ) -> Winner {
        let winner = self.policy.winner(&conflict);
        let conflict = conflict
            .in_context(path)
            .decided_by(self.policy.name(), winner);
        debug!(
            path,
            kind = %conflict.kind,
            field = %conflict.field,
            winner = %winner,
            "merge conflict"
        );
        listener.conflict_occurred(&conflict);
        winner
    }

    fn child_keys(&self, children: &[Node]) -> Vec<ChildKey> {
        let mut unkeyed: HashMap<&str, usize> = HashMap::new();
        children
            .iter()
            .map(|child| {
                let id = self.identity.id_of(child);
                let rank = if id.is_some() {
                    0
                } else {
                    let seen = unkeyed.entry(child.name.as_str()).or_insert(0);
                    *seen += 1;
                    *seen - 1
                };
                ChildKey {
                    name: child.name.clone(),
                    id,
                    rank,
                }
            })
            .collect()
    }
}

impl Default for NodeMerger {
    fn default() -> Self {
        Self::with_identity(Arc::new(AttributeIdentity::default()))
    }
}

/// Position of each key; the first child holding a key wins.
fn key_index(keys: &[ChildKey]) -> HashMap<&ChildKey, usize> {
    let mut index = HashMap::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        index.entry(key).or_insert(i);
    }
    index
}

fn child_path(parent: &str, key: &ChildKey) -> String {
    match &key.id {
        Some(id) => format!("{parent}/{}[{id}]", key.name),
        None if key.rank > 0 => format!("{parent}/{}[#{}]", key.name, key.rank + 1),
        None => format!("{parent}/{}", key.name),
    }
}

fn trimmed(slot: &Option<String>) -> &str {
    slot.as_deref().map(str::trim).unwrap_or("")
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}
