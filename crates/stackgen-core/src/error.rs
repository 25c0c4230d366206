//! Unified error handling for stackgen-core.
//!
//! This module provides a unified error type that wraps domain and application
//! errors, with rich context and user-actionable suggestions.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// Root error type for stackgen-core operations.
#[derive(Debug, Error, Clone)]
pub enum StackgenError {
    /// Errors from the domain layer (validation, rendering, patching).
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Errors from the application layer (orchestration failures).
    #[error("{0}")]
    Application(#[from] ApplicationError),

    /// Configuration or setup errors.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl StackgenError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Configuration { message } => vec![
                format!("Configuration issue: {}", message),
                "Check your setup and try again".into(),
            ],
            Self::Internal { .. } => vec![
                "This appears to be a bug in stackgen".into(),
                "Run again with -vvv and include the log in a bug report".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::Compatibility => ErrorCategory::Compatibility,
                crate::domain::ErrorCategory::NotFound => ErrorCategory::NotFound,
                crate::domain::ErrorCategory::Internal => ErrorCategory::Internal,
            },
            Self::Application(e) => e.category(),
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// The error underneath any `StepFailed` wrappers.
    pub fn root_cause(&self) -> &StackgenError {
        match self {
            Self::Application(ApplicationError::StepFailed { source, .. }) => source.root_cause(),
            other => other,
        }
    }

    /// Name of the failing pipeline step, when the error came from one.
    ///
    /// Nested failures (a microservice step inside the `microservices`
    /// step) report the outermost step.
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            Self::Application(ApplicationError::StepFailed { step, .. }) => Some(step),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Application(ApplicationError::StoreLockError))
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Compatibility,
    NotFound,
    Configuration,
    Internal,
}

/// Convenient result type alias.
pub type StackgenResult<T> = Result<T, StackgenError>;

/// Extension trait for turning foreign errors into filesystem errors.
pub trait IoContext<T> {
    fn at_path(self, path: &std::path::Path) -> StackgenResult<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at_path(self, path: &std::path::Path) -> StackgenResult<T> {
        self.map_err(|e| {
            ApplicationError::FilesystemError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn root_cause_sees_through_nested_step_failures() {
        let inner: StackgenError = DomainError::AnchorNotFound {
            point: "imports".into(),
        }
        .into();
        let step: StackgenError = ApplicationError::StepFailed {
            step: "graphql".into(),
            subproject: PathBuf::from("demo/apps/billing"),
            source: Box::new(inner),
        }
        .into();
        let outer: StackgenError = ApplicationError::StepFailed {
            step: "microservices".into(),
            subproject: PathBuf::from("demo"),
            source: Box::new(step),
        }
        .into();

        assert!(matches!(
            outer.root_cause(),
            StackgenError::Domain(DomainError::AnchorNotFound { .. })
        ));
        assert_eq!(outer.failed_step(), Some("microservices"));
        assert_eq!(outer.category(), ErrorCategory::Internal);
    }

    #[test]
    fn step_failure_message_names_step_and_path() {
        let err: StackgenError = ApplicationError::StepFailed {
            step: "auth".into(),
            subproject: PathBuf::from("demo/apps/backend"),
            source: Box::new(
                ApplicationError::MissingPrerequisite {
                    step: "auth".into(),
                    requirement: "src/app.ts".into(),
                }
                .into(),
            ),
        }
        .into();
        let text = err.to_string();
        assert!(text.contains("'auth'"));
        assert!(text.contains("demo/apps/backend"));
        assert!(text.contains("src/app.ts"));
    }

    #[test]
    fn io_errors_carry_their_path() {
        let res: std::io::Result<()> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = res.at_path(std::path::Path::new("x/y")).unwrap_err();
        assert!(err.to_string().contains("x/y"));
    }
}
