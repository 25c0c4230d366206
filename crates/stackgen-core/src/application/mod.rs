//! Application layer for stackgen.
//!
//! This layer contains:
//! - **Composer**: the ordered step pipeline and the context steps run in
//! - **Generators**: one per step, assembled into registries
//! - **Services**: use case orchestration (ProjectAssembler, TemplateCatalog)
//! - **Ports**: interface definitions (traits) for external dependencies
//! - **Errors**: application-specific error types
//!
//! Rules about configurations, placeholders and extension points live in
//! `crate::domain`; this layer decides what to write and in which order.

pub mod composer;
pub mod error;
pub mod generators;
pub mod ports;
pub mod services;

// Re-export main services
pub use services::{
    GenerationReport, ProjectAssembler,
    TemplateCatalog,
    TemplateInfo, // DTO for template metadata
};

pub use composer::{ComposeReport, Composer, GenerationContext, Generator, PlannedStep, Scope, Step};

// Re-export port traits (for adapter implementation)
pub use ports::{
    Filesystem, GenerationObserver, NoopObserver, ResolvedTemplate, TemplateFile,
    TemplateRenderer, TemplateResolver,
};

pub use error::ApplicationError;
