//! Three-way merge of XML documents.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use recmerge_core::Settings;
use recmerge_engine::{
    ChangeAndConflictAccumulator, ChangeReport, Conflict, ContextDescriptor, DispatchingListener,
    Identity, MergeEventListener, MergePolicy, Node, NodeMerger,
};

use crate::error::XmlResult;
use crate::parse::parse_document;

/// A merged document and the conflicts decided while producing it.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub merged: Node,
    pub conflicts: Vec<Conflict>,
}

/// Parses the three sides of a merge and hands their roots to a
/// [`NodeMerger`].
pub struct XmlMerger {
    merger: NodeMerger,
}

impl XmlMerger {
    pub fn new(identity: Arc<dyn Identity>, policy: Arc<dyn MergePolicy>) -> Self {
        Self {
            merger: NodeMerger::new(identity, policy),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(settings.records.identity()),
            settings.merge.policy(),
        )
    }

    /// Merge parsed roots; `ours` becomes the merged document.
    pub fn merge_nodes(
        &self,
        mut ours: Node,
        theirs: &Node,
        ancestor: Option<&Node>,
        listener: &mut dyn MergeEventListener,
    ) -> Node {
        self.merger.merge(&mut ours, theirs, ancestor, Some(listener));
        ours
    }

    /// Merge three documents held in memory. An empty or whitespace-only
    /// ancestor means the sides share no history.
    pub fn merge_strings(&self, ours: &str, theirs: &str, ancestor: &str) -> XmlResult<MergeOutcome> {
        let mut acc = ChangeAndConflictAccumulator::new();
        let merged = self.merge_strings_into(ours, theirs, ancestor, &mut acc)?;
        Ok(MergeOutcome {
            merged,
            conflicts: acc.conflicts,
        })
    }

    pub fn merge_strings_into(
        &self,
        ours: &str,
        theirs: &str,
        ancestor: &str,
        listener: &mut dyn MergeEventListener,
    ) -> XmlResult<Node> {
        let ours = parse_document(ours)?;
        let theirs = parse_document(theirs)?;
        let ancestor = if ancestor.trim().is_empty() {
            None
        } else {
            Some(parse_document(ancestor)?)
        };
        Ok(self.merge_nodes(ours, &theirs, ancestor.as_ref(), listener))
    }

    pub fn merge_files(&self, ours: &Path, theirs: &Path, ancestor: &Path) -> XmlResult<MergeOutcome> {
        let mut acc = ChangeAndConflictAccumulator::new();
        let merged = self.merge_files_into(ours, theirs, ancestor, &mut acc)?;
        Ok(MergeOutcome {
            merged,
            conflicts: acc.conflicts,
        })
    }

    /// Like [`merge_files`](Self::merge_files), streaming events to
    /// `listener` as well as counting conflicts for the log line.
    pub fn merge_files_into(
        &self,
        ours: &Path,
        theirs: &Path,
        ancestor: &Path,
        listener: &mut dyn MergeEventListener,
    ) -> XmlResult<Node> {
        let ours_text = std::fs::read_to_string(ours)?;
        let theirs_text = std::fs::read_to_string(theirs)?;
        // A missing ancestor file is an add/add merge.
        let ancestor_text = if ancestor.exists() {
            std::fs::read_to_string(ancestor)?
        } else {
            String::new()
        };

        let mut counter = ConflictCounter::default();
        let mut dispatcher = DispatchingListener::new();
        dispatcher.add_listener(listener);
        dispatcher.add_listener(&mut counter);
        let merged = self.merge_strings_into(&ours_text, &theirs_text, &ancestor_text, &mut dispatcher)?;
        drop(dispatcher);

        info!(
            ours = %ours.display(),
            conflicts = counter.conflicts,
            "merged document"
        );
        Ok(merged)
    }
}

#[derive(Default)]
struct ConflictCounter {
    conflicts: usize,
}

impl MergeEventListener for ConflictCounter {
    fn conflict_occurred(&mut self, _conflict: &Conflict) {
        self.conflicts += 1;
    }

    fn change_occurred(&mut self, _change: &ChangeReport) {}

    fn entering_context(&mut self, _context: &ContextDescriptor) {}
}

impl Default for XmlMerger {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::write_document;
    use recmerge_engine::{ConflictKind, PreferSide, Winner};

    const ANCESTOR: &str = r#"<lift>
  <entry guid="e1" pos="noun"><gloss>dog</gloss></entry>
  <entry guid="e2" pos="verb"/>
</lift>"#;

    #[test]
    fn non_overlapping_edits_combine() {
        let ours = r#"<lift>
  <entry guid="e1" pos="noun"><gloss>hound</gloss></entry>
  <entry guid="e2" pos="verb"/>
</lift>"#;
        let theirs = r#"<lift>
  <entry guid="e1" pos="noun"><gloss>dog</gloss></entry>
  <entry guid="e2" pos="adj"/>
  <entry guid="e3"/>
</lift>"#;
        let outcome = XmlMerger::default().merge_strings(ours, theirs, ANCESTOR).unwrap();

        assert!(outcome.conflicts.is_empty());
        let merged = outcome.merged;
        assert_eq!(merged.children.len(), 3);
        assert_eq!(merged.children[0].children[0].text.as_deref(), Some("hound"));
        assert_eq!(merged.children[1].attr("pos"), Some("adj"));
        assert_eq!(merged.children[2].attr("guid"), Some("e3"));
    }

    #[test]
    fn conflicting_edits_follow_the_policy() {
        let ours = r#"<lift><entry guid="e2" pos="noun"/></lift>"#;
        let theirs = r#"<lift><entry guid="e2" pos="adj"/></lift>"#;
        let ancestor = r#"<lift><entry guid="e2" pos="verb"/></lift>"#;

        let outcome = XmlMerger::default().merge_strings(ours, theirs, ancestor).unwrap();
        assert_eq!(outcome.merged.children[0].attr("pos"), Some("noun"));
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].kind, ConflictKind::BothEditedAttribute);

        let theirs_wins = XmlMerger::new(
            Arc::new(recmerge_engine::AttributeIdentity::default()),
            Arc::new(PreferSide(Winner::Theirs)),
        );
        let outcome = theirs_wins.merge_strings(ours, theirs, ancestor).unwrap();
        assert_eq!(outcome.merged.children[0].attr("pos"), Some("adj"));
        assert_eq!(outcome.conflicts[0].winner, Winner::Theirs);
    }

    #[test]
    fn blank_ancestor_means_no_history() {
        let ours = r#"<lift><entry guid="a"/></lift>"#;
        let theirs = r#"<lift><entry guid="b"/></lift>"#;
        let outcome = XmlMerger::default().merge_strings(ours, theirs, "  \n").unwrap();
        assert_eq!(outcome.merged.children.len(), 2);
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn identical_mixed_content_document_is_unchanged() {
        let xml = r#"<lift><entry guid="e1"><text>hello <span lang="fr">monde</span> world</text></entry></lift>"#;
        let outcome = XmlMerger::default().merge_strings(xml, xml, xml).unwrap();
        assert!(outcome.conflicts.is_empty());

        let written = write_document(&outcome.merged).unwrap();
        assert!(written.contains(r#"<text>hello <span lang="fr">monde</span> world</text>"#));
        assert_eq!(parse_document(&written).unwrap(), parse_document(xml).unwrap());
    }

    #[test]
    fn conflict_count_does_not_disturb_listener() {
        let mut counter = ConflictCounter::default();
        let mut acc = ChangeAndConflictAccumulator::new();
        let mut dispatcher = DispatchingListener::new();
        dispatcher.add_listener(&mut acc);
        dispatcher.add_listener(&mut counter);
        XmlMerger::default()
            .merge_strings_into(
                r#"<lift><entry guid="e1" pos="a"/><entry guid="e2" pos="c"/></lift>"#,
                r#"<lift><entry guid="e1" pos="b"/><entry guid="e2" pos="d"/></lift>"#,
                r#"<lift><entry guid="e1" pos="x"/><entry guid="e2" pos="y"/></lift>"#,
                &mut dispatcher,
            )
            .unwrap();
        drop(dispatcher);
        assert_eq!(counter.conflicts, 2);
        assert_eq!(acc.conflicts.len(), 2);
    }

    #[test]
    fn malformed_side_is_an_error() {
        assert!(XmlMerger::default()
            .merge_strings("<lift>", "<lift/>", "")
            .is_err());
    }

    #[test]
    fn merges_files_and_streams_to_listener() {
        let dir = tempfile::tempdir().unwrap();
        let ours = dir.path().join("ours.lift");
        let theirs = dir.path().join("theirs.lift");
        let ancestor = dir.path().join("ancestor.lift");
        std::fs::write(&ours, r#"<lift><entry guid="e1" pos="a"/></lift>"#).unwrap();
        std::fs::write(&theirs, r#"<lift><entry guid="e1" pos="b"/></lift>"#).unwrap();
        std::fs::write(&ancestor, r#"<lift><entry guid="e1" pos="x"/></lift>"#).unwrap();

        let mut acc = ChangeAndConflictAccumulator::new();
        let merged = XmlMerger::default()
            .merge_files_into(&ours, &theirs, &ancestor, &mut acc)
            .unwrap();
        assert_eq!(merged.children[0].attr("pos"), Some("a"));
        assert_eq!(acc.conflicts.len(), 1);
        assert!(!acc.contexts.is_empty());
    }

    #[test]
    fn missing_ancestor_file_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let ours = dir.path().join("ours.lift");
        let theirs = dir.path().join("theirs.lift");
        std::fs::write(&ours, r#"<lift><entry guid="a"/></lift>"#).unwrap();
        std::fs::write(&theirs, r#"<lift><entry guid="b"/></lift>"#).unwrap();

        let outcome = XmlMerger::default()
            .merge_files(&ours, &theirs, &dir.path().join("absent.lift"))
            .unwrap();
        assert_eq!(outcome.merged.children.len(), 2);
    }
}
