//! File type handler for record documents.

use std::path::Path;

use anyhow::Context;
use similar::TextDiff;

use recmerge_core::{FileTypeHandler, MergeOrder, Settings};
use recmerge_engine::{ChangeKind, ChangeReport, MergeEventListener};

use crate::differ::RecordDiffer;
use crate::merger::XmlMerger;
use crate::write::{write_document, write_fragment};

/// Merges, diffs and presents XML files whose extension is listed in
/// the record settings.
pub struct RecordFileHandler {
    settings: Settings,
    merger: XmlMerger,
    differ: RecordDiffer,
}

impl RecordFileHandler {
    pub fn new(settings: Settings) -> Self {
        let merger = XmlMerger::from_settings(&settings);
        let differ = RecordDiffer::from_settings(&settings);
        Self {
            settings,
            merger,
            differ,
        }
    }

    fn claims(&self, path: &Path) -> bool {
        self.settings.records.claims_extension(path)
    }
}

impl Default for RecordFileHandler {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl FileTypeHandler for RecordFileHandler {
    fn name(&self) -> &str {
        "records"
    }

    fn can_merge_file(&self, path: &Path) -> bool {
        self.claims(path)
    }

    fn can_diff_file(&self, path: &Path) -> bool {
        self.claims(path)
    }

    fn can_present_file(&self, path: &Path) -> bool {
        self.claims(path)
    }

    fn do_merge(
        &self,
        order: &MergeOrder,
        listener: &mut dyn MergeEventListener,
    ) -> anyhow::Result<()> {
        let merged = self
            .merger
            .merge_files_into(
                &order.ours_path,
                &order.theirs_path,
                &order.ancestor_path,
                listener,
            )
            .with_context(|| format!("merging {}", order.ours_path.display()))?;
        let xml = write_document(&merged)?;
        std::fs::write(&order.ours_path, xml)
            .with_context(|| format!("writing {}", order.ours_path.display()))?;
        Ok(())
    }

    fn diff(
        &self,
        parent: &Path,
        child: &Path,
        listener: &mut dyn MergeEventListener,
    ) -> anyhow::Result<()> {
        self.differ
            .diff_files(parent, child, listener)
            .with_context(|| format!("diffing {} against {}", child.display(), parent.display()))
    }

    fn present(&self, report: &ChangeReport) -> anyhow::Result<String> {
        match &report.kind {
            ChangeKind::Addition { child } => Ok(format!(
                "{}\n{}",
                report.description(),
                write_fragment(child)?
            )),
            ChangeKind::Deletion { .. } => Ok(report.description()),
            ChangeKind::ChangedRecord { parent, child } => {
                let before = write_fragment(parent)? + "\n";
                let after = write_fragment(child)? + "\n";
                let diff = TextDiff::from_lines(&before, &after)
                    .unified_diff()
                    .header("parent", "child")
                    .to_string();
                Ok(format!("{}\n{}", report.description(), diff))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recmerge_core::HandlerRegistry;
    use recmerge_engine::{ChangeAndConflictAccumulator, Node};

    #[test]
    fn claims_configured_extensions_only() {
        let registry = HandlerRegistry::new().with_handler(Box::new(RecordFileHandler::default()));
        assert_eq!(registry.handler_for_merging(Path::new("a/dict.lift")).name(), "records");
        assert_eq!(registry.handler_for_diff(Path::new("a/readme.md")).name(), "default");
    }

    #[test]
    fn merge_overwrites_ours() {
        let dir = tempfile::tempdir().unwrap();
        let order = MergeOrder::new(
            dir.path().join("ours.lift"),
            dir.path().join("theirs.lift"),
            dir.path().join("base.lift"),
        );
        std::fs::write(&order.ours_path, r#"<lift><entry guid="a"/></lift>"#).unwrap();
        std::fs::write(&order.theirs_path, r#"<lift><entry guid="a"/><entry guid="b"/></lift>"#).unwrap();
        std::fs::write(&order.ancestor_path, r#"<lift><entry guid="a"/></lift>"#).unwrap();

        let mut acc = ChangeAndConflictAccumulator::new();
        RecordFileHandler::default().do_merge(&order, &mut acc).unwrap();

        let written = std::fs::read_to_string(&order.ours_path).unwrap();
        assert!(written.starts_with("<?xml"));
        assert!(written.contains("guid=\"b\""));
        assert!(acc.conflicts.is_empty());
    }

    #[test]
    fn merge_of_malformed_input_leaves_ours_alone() {
        let dir = tempfile::tempdir().unwrap();
        let order = MergeOrder::new(
            dir.path().join("ours.lift"),
            dir.path().join("theirs.lift"),
            dir.path().join("base.lift"),
        );
        std::fs::write(&order.ours_path, "<lift/>").unwrap();
        std::fs::write(&order.theirs_path, "<lift>").unwrap();

        let mut acc = ChangeAndConflictAccumulator::new();
        let err = RecordFileHandler::default().do_merge(&order, &mut acc).unwrap_err();
        assert!(err.to_string().contains("merging"));
        assert_eq!(std::fs::read_to_string(&order.ours_path).unwrap(), "<lift/>");
    }

    #[test]
    fn presents_each_kind() {
        let handler = RecordFileHandler::default();
        let parent = Node::new("entry").with_attr("guid", "e1").with_text("dog");
        let child = Node::new("entry").with_attr("guid", "e1").with_text("hound");

        let added = handler
            .present(&ChangeReport::addition(None, child.clone()))
            .unwrap();
        assert!(added.contains("<entry guid=\"e1\">hound</entry>"));

        let changed = handler
            .present(&ChangeReport::changed_record(None, None, parent.clone(), child))
            .unwrap();
        assert!(changed.contains("--- parent"));
        assert!(changed.contains("-<entry guid=\"e1\">dog</entry>"));
        assert!(changed.contains("+<entry guid=\"e1\">hound</entry>"));

        let deleted = handler
            .present(&ChangeReport::deletion(None, None, parent, None))
            .unwrap();
        assert!(deleted.starts_with("Deleted"));
    }
}
