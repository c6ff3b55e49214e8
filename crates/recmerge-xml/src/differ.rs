//! Record-level diff of two XML snapshots.

use std::path::Path;
use std::sync::Arc;

use recmerge_core::Settings;
use recmerge_engine::{
    ChangeAndConflictAccumulator, ChangeReport, FileInRevision, Identity, MergeEventListener,
    Node, Repository, TwoWayDiffer,
};

use crate::error::XmlResult;
use crate::parse::parse_document;

/// Diffs the records directly under each document's root. Records are
/// the root's children named `record_element`.
pub struct RecordDiffer {
    identity: Arc<dyn Identity>,
    record_element: String,
    tombstone_attribute: String,
}

impl RecordDiffer {
    pub fn new(
        identity: Arc<dyn Identity>,
        record_element: impl Into<String>,
        tombstone_attribute: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            record_element: record_element.into(),
            tombstone_attribute: tombstone_attribute.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(settings.records.identity()),
            settings.records.record_element.clone(),
            settings.records.tombstone_attribute.clone(),
        )
    }

    pub fn records(&self, document: &Node) -> Vec<Node> {
        document
            .children_named(&self.record_element)
            .cloned()
            .collect()
    }

    pub fn diff_strings(
        &self,
        parent: &str,
        child: &str,
        listener: &mut dyn MergeEventListener,
    ) -> XmlResult<()> {
        self.diff_with(parent, child, self.differ(), listener)
    }

    pub fn diff_files(
        &self,
        parent: &Path,
        child: &Path,
        listener: &mut dyn MergeEventListener,
    ) -> XmlResult<()> {
        let parent = std::fs::read_to_string(parent)?;
        let child = std::fs::read_to_string(child)?;
        self.diff_strings(&parent, &child, listener)
    }

    /// Diff two revisions fetched from `repository`. Reports carry the
    /// revisions as provenance.
    pub fn diff_revisions(
        &self,
        parent: &FileInRevision,
        child: &FileInRevision,
        repository: &dyn Repository,
        listener: &mut dyn MergeEventListener,
    ) -> XmlResult<()> {
        let parent_text = parent.get_contents(repository)?;
        let child_text = child.get_contents(repository)?;
        let differ = self
            .differ()
            .with_revisions(parent.clone(), child.clone());
        self.diff_with(&parent_text, &child_text, differ, listener)
    }

    /// Convenience wrapper returning the reports in order.
    pub fn collect_strings(&self, parent: &str, child: &str) -> XmlResult<Vec<ChangeReport>> {
        let mut acc = ChangeAndConflictAccumulator::new();
        self.diff_strings(parent, child, &mut acc)?;
        Ok(acc.changes)
    }

    fn differ(&self) -> TwoWayDiffer {
        TwoWayDiffer::new(self.identity.clone(), self.tombstone_attribute.clone())
    }

    fn diff_with(
        &self,
        parent: &str,
        child: &str,
        differ: TwoWayDiffer,
        listener: &mut dyn MergeEventListener,
    ) -> XmlResult<()> {
        let parent = self.records(&parse_document(parent)?);
        let child = self.records(&parse_document(child)?);
        tracing::debug!(
            parent = parent.len(),
            child = child.len(),
            element = %self.record_element,
            "diffing records"
        );
        differ.report_differences(&parent, &child, listener);
        Ok(())
    }
}

impl Default for RecordDiffer {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recmerge_engine::{ChangeKind, FileAction, InMemoryRepository};

    const PARENT: &str = r#"<lift>
  <header/>
  <entry guid="e1"><gloss>dog</gloss></entry>
  <entry guid="e2"><gloss>cat</gloss></entry>
  <entry guid="e4"/>
</lift>"#;

    const CHILD: &str = r#"<lift>
  <header><note>ignored</note></header>
  <entry guid="e1"><gloss>hound</gloss></entry>
  <entry guid="e3"/>
  <entry guid="e4" dateDeleted="2024-03-01"/>
</lift>"#;

    #[test]
    fn only_record_elements_are_compared() {
        let differ = RecordDiffer::default();
        let doc = parse_document(PARENT).unwrap();
        assert_eq!(differ.records(&doc).len(), 3);

        let reports = differ.collect_strings(PARENT, CHILD).unwrap();
        let labels: Vec<_> = reports.iter().map(|r| r.action_label()).collect();
        assert_eq!(labels, vec!["Changed", "Added", "Deleted", "Deleted"]);
        assert!(matches!(
            &reports[2].kind,
            ChangeKind::Deletion { child: Some(_), .. }
        ));
        assert!(matches!(
            &reports[3].kind,
            ChangeKind::Deletion { child: None, .. }
        ));
    }

    #[test]
    fn diffs_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("parent.lift");
        let child = dir.path().join("child.lift");
        std::fs::write(&parent, PARENT).unwrap();
        std::fs::write(&child, PARENT).unwrap();

        let mut acc = ChangeAndConflictAccumulator::new();
        RecordDiffer::default()
            .diff_files(&parent, &child, &mut acc)
            .unwrap();
        assert!(acc.changes.is_empty());
    }

    #[test]
    fn revision_diff_carries_provenance() {
        let mut repo = InMemoryRepository::new();
        repo.insert("dict.lift", "r1", PARENT);
        repo.insert("dict.lift", "r2", CHILD);
        let parent = FileInRevision::new("dict.lift", "r1", FileAction::Modified);
        let child = FileInRevision::new("dict.lift", "r2", FileAction::Modified);

        let mut acc = ChangeAndConflictAccumulator::new();
        RecordDiffer::default()
            .diff_revisions(&parent, &child, &repo, &mut acc)
            .unwrap();
        assert_eq!(acc.changes.len(), 4);
        assert_eq!(acc.changes[0].child_revision.as_ref(), Some(&child));
        assert_eq!(acc.changes[0].parent_revision.as_ref(), Some(&parent));
    }

    #[test]
    fn unknown_revision_is_an_error() {
        let repo = InMemoryRepository::new();
        let parent = FileInRevision::unknown("dict.lift", FileAction::Modified);
        let child = FileInRevision::new("dict.lift", "r2", FileAction::Modified);
        let mut acc = ChangeAndConflictAccumulator::new();
        let result = RecordDiffer::default().diff_revisions(&parent, &child, &repo, &mut acc);
        assert!(matches!(result, Err(crate::XmlError::Revision(_))));
    }
}
