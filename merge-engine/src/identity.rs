//! Record identity.
//!
//! Records are matched across revisions by a stable key rather than by
//! document position. The key lookup is pluggable so that each record format
//! can decide which attribute carries it.

use std::collections::HashMap;

use crate::node::Node;

/// Identity capability required by both the merger and the differ.
pub trait Identity: Send + Sync {
    /// The stable key of a node, if it carries one.
    fn id_of(&self, node: &Node) -> Option<String>;

    /// Find the node with the given key in a snapshot.
    fn find_by_identity<'a>(&self, snapshot: &'a [Node], id: &str) -> Option<&'a Node> {
        snapshot
            .iter()
            .find(|node| self.id_of(node).as_deref() == Some(id))
    }

    /// Key every identified node of a snapshot in one pass. The first node
    /// holding a key wins, matching [`find_by_identity`](Self::find_by_identity).
    fn index_by_identity<'a>(&self, snapshot: &'a [Node]) -> HashMap<String, &'a Node> {
        let mut index = HashMap::with_capacity(snapshot.len());
        for node in snapshot {
            if let Some(id) = self.id_of(node) {
                index.entry(id).or_insert(node);
            }
        }
        index
    }

    /// Whether two copies of a record carry the same content.
    fn structurally_equal(&self, a: &Node, b: &Node) -> bool {
        a.structurally_equal(b)
    }
}

/// Identity keyed on an ordered list of attribute names; the first attribute
/// present on a node with a non-empty value supplies its key.
#[derive(Debug, Clone)]
pub struct AttributeIdentity {
    attributes: Vec<String>,
}

impl AttributeIdentity {
    pub fn new<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }
}

impl Default for AttributeIdentity {
    fn default() -> Self {
        Self::new(["guid", "id"])
    }
}

impl Identity for AttributeIdentity {
    fn id_of(&self, node: &Node) -> Option<String> {
        self.attributes
            .iter()
            .find_map(|name| node.attr(name).filter(|value| !value.is_empty()))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_present_attribute_wins() {
        let identity = AttributeIdentity::default();
        let node = Node::new("entry").with_attr("id", "x").with_attr("guid", "g");
        assert_eq!(identity.id_of(&node), Some("g".to_string()));

        let node = Node::new("entry").with_attr("id", "x");
        assert_eq!(identity.id_of(&node), Some("x".to_string()));
    }

    #[test]
    fn empty_key_is_no_identity() {
        let identity = AttributeIdentity::new(["guid"]);
        assert_eq!(identity.id_of(&Node::new("entry").with_attr("guid", "")), None);
        assert_eq!(identity.id_of(&Node::new("entry")), None);
    }

    #[test]
    fn empty_key_falls_through_to_next_attribute() {
        let identity = AttributeIdentity::default();
        let node = Node::new("entry").with_attr("guid", "").with_attr("id", "x");
        assert_eq!(identity.id_of(&node), Some("x".to_string()));
    }

    #[test]
    fn index_keeps_first_holder_of_a_key() {
        let identity = AttributeIdentity::new(["guid"]);
        let snapshot = vec![
            Node::new("entry").with_attr("guid", "1").with_text("first"),
            Node::new("entry"),
            Node::new("entry").with_attr("guid", "1").with_text("second"),
        ];
        let index = identity.index_by_identity(&snapshot);
        assert_eq!(index.len(), 1);
        assert_eq!(index["1"].trimmed_text(), "first");
    }

    #[test]
    fn find_by_identity_scans_snapshot() {
        let identity = AttributeIdentity::new(["guid"]);
        let snapshot = vec![
            Node::new("entry").with_attr("guid", "1"),
            Node::new("entry").with_attr("guid", "2").with_text("two"),
        ];
        let found = identity.find_by_identity(&snapshot, "2");
        assert_eq!(found.map(Node::trimmed_text), Some("two"));
        assert!(identity.find_by_identity(&snapshot, "3").is_none());
    }
}
