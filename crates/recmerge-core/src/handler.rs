use recmerge_engine::{ChangeReport, MergeEventListener};
use std::path::{Path, PathBuf};

/// The three files of a merge, as handed over by a VCS merge driver.
/// The merged result is written back to `ours_path`.
#[derive(Debug, Clone)]
pub struct MergeOrder {
    pub ours_path: PathBuf,
    pub theirs_path: PathBuf,
    pub ancestor_path: PathBuf,
}

impl MergeOrder {
    pub fn new(
        ours_path: impl Into<PathBuf>,
        theirs_path: impl Into<PathBuf>,
        ancestor_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ours_path: ours_path.into(),
            theirs_path: theirs_path.into(),
            ancestor_path: ancestor_path.into(),
        }
    }
}

/// Trait that every file type handler must satisfy.
pub trait FileTypeHandler: Send + Sync {
    /// Human-readable handler name
    fn name(&self) -> &str;

    fn can_merge_file(&self, path: &Path) -> bool;

    fn can_diff_file(&self, path: &Path) -> bool;

    fn can_present_file(&self, path: &Path) -> bool;

    /// Three-way merge the order's files, writing the result over
    /// `ours_path` and reporting conflicts to `listener`.
    fn do_merge(
        &self,
        order: &MergeOrder,
        listener: &mut dyn MergeEventListener,
    ) -> anyhow::Result<()>;

    /// Report what changed between a parent and child copy of a file.
    fn diff(
        &self,
        parent: &Path,
        child: &Path,
        listener: &mut dyn MergeEventListener,
    ) -> anyhow::Result<()>;

    /// Render a change for display.
    fn present(&self, report: &ChangeReport) -> anyhow::Result<String>;
}

/// Fallback used when no registered handler claims a file. It claims
/// nothing, leaves `ours` untouched on merge and reports no changes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFileTypeHandler;

impl FileTypeHandler for DefaultFileTypeHandler {
    fn name(&self) -> &str {
        "default"
    }

    fn can_merge_file(&self, _path: &Path) -> bool {
        false
    }

    fn can_diff_file(&self, _path: &Path) -> bool {
        false
    }

    fn can_present_file(&self, _path: &Path) -> bool {
        false
    }

    fn do_merge(
        &self,
        order: &MergeOrder,
        _listener: &mut dyn MergeEventListener,
    ) -> anyhow::Result<()> {
        tracing::info!(path = %order.ours_path.display(), "no handler for file, keeping ours");
        Ok(())
    }

    fn diff(
        &self,
        _parent: &Path,
        _child: &Path,
        _listener: &mut dyn MergeEventListener,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn present(&self, report: &ChangeReport) -> anyhow::Result<String> {
        Ok(report.description())
    }
}

/// Explicit, statically registered set of handlers. Lookups return the
/// first registered handler that claims a path, else the default handler.
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn FileTypeHandler>>,
    fallback: DefaultFileTypeHandler,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            fallback: DefaultFileTypeHandler,
        }
    }

    pub fn register(&mut self, handler: Box<dyn FileTypeHandler>) {
        self.handlers.push(handler);
    }

    pub fn with_handler(mut self, handler: Box<dyn FileTypeHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn handler_for_merging(&self, path: &Path) -> &dyn FileTypeHandler {
        self.find(|h| h.can_merge_file(path))
    }

    pub fn handler_for_diff(&self, path: &Path) -> &dyn FileTypeHandler {
        self.find(|h| h.can_diff_file(path))
    }

    pub fn handler_for_presentation(&self, path: &Path) -> &dyn FileTypeHandler {
        self.find(|h| h.can_present_file(path))
    }

    fn find(&self, claims: impl Fn(&dyn FileTypeHandler) -> bool) -> &dyn FileTypeHandler {
        self.handlers
            .iter()
            .map(|h| h.as_ref())
            .find(|h| claims(*h))
            .unwrap_or(&self.fallback)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
