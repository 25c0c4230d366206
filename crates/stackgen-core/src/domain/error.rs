// ============================================================================
// domain/error.rs - DOMAIN ERROR TAXONOMY
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (they travel inside pipeline step failures)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    // ========================================================================
    // Validation Errors (400-level equivalent)
    // ========================================================================
    #[error("Invalid project name '{name}': {reason}")]
    InvalidProjectName { name: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown {kind} '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    #[error("Duplicate microservice name '{name}'")]
    DuplicateService { name: String },

    #[error("Microservice name '{name}' is reserved")]
    ReservedServiceName { name: String },

    #[error("Port {port} is used by both {first} and {second}")]
    PortConflict {
        port: u16,
        first: String,
        second: String,
    },

    // ========================================================================
    // Compatibility Errors (409-level equivalent)
    // ========================================================================
    #[error("framework '{framework}' does not support language '{language}': {reason}")]
    IncompatibleLanguage {
        framework: String,
        language: String,
        reason: String,
    },

    #[error("framework '{framework}' cannot be used as a {expected} framework")]
    WrongCategory {
        framework: String,
        expected: &'static str,
    },

    #[error("feature '{feature}' is not supported by framework '{framework}'")]
    UnsupportedFeature { feature: String, framework: String },

    #[error("'{option}' is incompatible with framework '{framework}'")]
    IncompatibleOption { option: String, framework: String },

    // ========================================================================
    // Rendering and patching
    // ========================================================================
    #[error("Unresolved placeholder '{{{{{name}}}}}' on line {line}")]
    UnresolvedPlaceholder { name: String, line: usize },

    #[error("Malformed placeholder on line {line}: {reason}")]
    MalformedPlaceholder { line: usize, reason: String },

    #[error("Extension point '{point}' not found")]
    AnchorNotFound { point: String },

    #[error("Invalid package manifest: {0}")]
    InvalidManifest(String),
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidProjectName { .. } => vec![
                "Use lowercase letters, digits and single hyphens".into(),
                "Start with a letter, e.g. my-app or shop2".into(),
            ],
            Self::IncompatibleLanguage { framework, .. } => vec![
                format!("'{framework}' requires a statically typed language"),
                "Try: --backend-lang typescript".into(),
            ],
            Self::WrongCategory { expected, .. } => vec![
                format!("Pick a {expected} framework"),
                "Try: stackgen list to see available templates".into(),
            ],
            Self::UnsupportedFeature { framework, .. } => vec![
                format!("Drop the feature or choose a framework other than '{framework}'"),
                "express and nestjs support every authentication strategy".into(),
            ],
            Self::DuplicateService { .. } | Self::ReservedServiceName { .. } => vec![
                "Every microservice needs a unique name".into(),
                "'backend', 'frontend' and 'gateway' are reserved".into(),
            ],
            Self::PortConflict { .. } => vec![
                "Microservice i listens on backend port + 1 + i".into(),
                "Move --frontend-port outside that range".into(),
            ],
            Self::UnresolvedPlaceholder { name, .. } => vec![
                format!("The template references '{name}', which is not a known variable"),
                "Fix the template or escape literal braces as \\{{".into(),
            ],
            Self::AnchorNotFound { point } => vec![
                format!("The target file lacks the '// @stackgen:{point}' marker"),
                "Templates must keep every extension-point marker".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidProjectName { .. }
            | Self::InvalidConfiguration(_)
            | Self::UnknownValue { .. }
            | Self::DuplicateService { .. }
            | Self::ReservedServiceName { .. }
            | Self::PortConflict { .. } => ErrorCategory::Validation,
            Self::IncompatibleLanguage { .. }
            | Self::WrongCategory { .. }
            | Self::UnsupportedFeature { .. }
            | Self::IncompatibleOption { .. } => ErrorCategory::Compatibility,
            Self::UnresolvedPlaceholder { .. }
            | Self::MalformedPlaceholder { .. }
            | Self::AnchorNotFound { .. }
            | Self::InvalidManifest(_) => ErrorCategory::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Compatibility,
    NotFound,
    Internal,
}
