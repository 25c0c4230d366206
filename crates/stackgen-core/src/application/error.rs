//! Application layer errors.
//!
//! These errors represent failures in orchestration, not business logic.
//! Business logic errors are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::{ErrorCategory, StackgenError};

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// No template tree exists for the requested stack.
    #[error("No {category} template for {framework}-{language} (searched: {searched})")]
    TemplateNotFound {
        category: String,
        framework: String,
        language: String,
        searched: String,
    },

    /// A step's required prior output is absent.
    #[error("Step '{step}' requires {requirement}")]
    MissingPrerequisite { step: String, requirement: String },

    /// The generator registry is not in dependency order.
    #[error("Invalid pipeline at step '{step}': {reason}")]
    PipelineOrder { step: String, reason: String },

    /// A pipeline step failed; generation stopped there.
    #[error("generation failed at step '{step}' in {}: {source}", subproject.display())]
    StepFailed {
        step: String,
        subproject: PathBuf,
        #[source]
        source: Box<StackgenError>,
    },

    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// Project already exists at target location.
    #[error("Project already exists at {path}")]
    ProjectExists { path: PathBuf },

    /// In-memory store access failed (lock poisoned).
    #[error("Template store error")]
    StoreLockError,

    /// A generated `package.json` could not be read back.
    #[error("Cannot read package manifest {path}: {reason}")]
    ManifestUnreadable { path: PathBuf, reason: String },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::TemplateNotFound {
                category,
                framework,
                language,
                ..
            } => vec![
                format!("Expected a directory templates/{category}/{framework}-{language}"),
                "Try: stackgen list to see available templates".into(),
                "Or point --templates / STACKGEN_TEMPLATES_DIR at a template directory".into(),
            ],
            Self::MissingPrerequisite { step, .. } => vec![
                format!("'{step}' patches output of an earlier step that was not generated"),
                "Check that the chosen framework has a template for this feature".into(),
            ],
            Self::PipelineOrder { .. } => vec![
                "Generators must be registered after their prerequisites".into(),
            ],
            Self::StepFailed { subproject, source, .. } => {
                let mut out = source.suggestions();
                out.push(format!(
                    "The partially generated tree at {} may be inspected or deleted",
                    subproject.display()
                ));
                out
            }
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
                "Ensure the parent directory exists".into(),
            ],
            Self::ProjectExists { path } => vec![
                format!("Directory already exists: {}", path.display()),
                "Use --force to overwrite (destructive)".into(),
                "Choose a different project name".into(),
            ],
            Self::StoreLockError => vec![
                "The template store is locked".into(),
                "Try again in a moment".into(),
            ],
            Self::ManifestUnreadable { path, .. } => vec![
                format!("Check that {} is valid JSON", path.display()),
            ],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TemplateNotFound { .. } => ErrorCategory::NotFound,
            Self::MissingPrerequisite { .. } => ErrorCategory::Compatibility,
            Self::StepFailed { source, .. } => source.category(),
            Self::ProjectExists { .. } => ErrorCategory::Validation,
            Self::PipelineOrder { .. }
            | Self::FilesystemError { .. }
            | Self::StoreLockError
            | Self::ManifestUnreadable { .. } => ErrorCategory::Internal,
        }
    }
}
