//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports to accomplish
//! high-level use cases like "generate a project" or "list templates".

pub mod assembler;
pub mod template_catalog;

pub use assembler::{GenerationReport, ProjectAssembler};
pub use template_catalog::{TemplateCatalog, TemplateInfo};
