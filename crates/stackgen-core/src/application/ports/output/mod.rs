//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `stackgen-adapters` crate provides implementations.

use std::path::{Path, PathBuf};

use crate::application::composer::Step;
use crate::domain::{Framework, Language, RenderContext, TemplateCategory};
use crate::error::StackgenResult;

#[cfg(test)]
use mockall::automock;

/// Port for filesystem operations.
///
/// Implemented by:
/// - `stackgen_adapters::filesystem::LocalFilesystem` (production)
/// - `stackgen_adapters::filesystem::MemoryFilesystem` (testing)
///
/// Generated sources are UTF-8 text and go through [`Filesystem::write_file`].
/// Template assets are copied as raw bytes through [`Filesystem::write_bytes`].
#[cfg_attr(test, automock)]
pub trait Filesystem: Send + Sync {
    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> StackgenResult<()>;

    /// Write content to a file, replacing it if present. The parent
    /// directory must exist.
    fn write_file(&self, path: &Path, content: &str) -> StackgenResult<()>;

    /// Write raw bytes to a file, replacing it if present. The parent
    /// directory must exist.
    fn write_bytes(&self, path: &Path, content: &[u8]) -> StackgenResult<()>;

    /// Read a file as UTF-8 text.
    fn read_file(&self, path: &Path) -> StackgenResult<String>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    fn remove_file(&self, path: &Path) -> StackgenResult<()>;

    /// Remove a directory and all contents.
    fn remove_dir_all(&self, path: &Path) -> StackgenResult<()>;

    /// Every file below `root`, recursively, as full paths in sorted order.
    fn list_files(&self, root: &Path) -> StackgenResult<Vec<PathBuf>>;
}

/// A template tree located on the search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub category: TemplateCategory,
    pub framework: Framework,
    pub language: Language,
    /// Root directory of the tree. Adapters without a real directory use
    /// a synthetic path.
    pub root: PathBuf,
    pub name: String,
    pub description: String,
}

/// One file of a template tree.
///
/// Content is opaque bytes. Only files the renderer processes are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Path relative to the template root.
    pub relative_path: PathBuf,
    pub content: Vec<u8>,
}

/// Port for locating template trees.
///
/// Implemented by:
/// - `stackgen_adapters::resolver::FilesystemTemplateResolver` (production)
/// - `stackgen_adapters::resolver::MemoryTemplateResolver` (testing)
pub trait TemplateResolver: Send + Sync {
    /// Locate the tree for a stack.
    ///
    /// # Errors
    ///
    /// `ApplicationError::TemplateNotFound` when nothing on the search path
    /// matches.
    fn resolve(
        &self,
        category: TemplateCategory,
        language: Language,
        framework: Framework,
    ) -> StackgenResult<ResolvedTemplate>;

    /// Every file of a resolved tree, recursively, sorted by path.
    ///
    /// Metadata files that belong to the template rather than to the
    /// generated project are excluded.
    fn walk(&self, template: &ResolvedTemplate) -> StackgenResult<Vec<TemplateFile>>;

    /// All templates on the search path.
    fn list(&self) -> StackgenResult<Vec<ResolvedTemplate>>;
}

/// Port for template rendering.
///
/// Implemented by:
/// - `stackgen_adapters::renderer::PlaceholderRenderer` (`{{NAME}}` substitution)
#[cfg_attr(test, automock)]
pub trait TemplateRenderer: Send + Sync {
    /// Whether `path` carries the template marker extension.
    fn is_template(&self, path: &Path) -> bool;

    /// `path` with the marker extension dropped.
    fn output_path(&self, path: &Path) -> PathBuf;

    /// Render `text` against `context`. Must be deterministic.
    fn render(&self, text: &str, context: &RenderContext) -> StackgenResult<String>;
}

/// Port for progress reporting.
///
/// Every method defaults to doing nothing.
pub trait GenerationObserver: Send + Sync {
    fn step_started(&self, _step: Step, _subproject: &str) {}

    fn step_finished(&self, _step: Step, _subproject: &str) {}

    fn step_skipped(&self, _step: Step, _subproject: &str) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl GenerationObserver for NoopObserver {}
