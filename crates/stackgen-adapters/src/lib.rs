//! Infrastructure adapters for stackgen.
//!
//! This crate implements the ports defined in `stackgen-core::application::ports`.
//! It contains all external dependencies and I/O operations.

pub mod filesystem;
pub mod renderer;
pub mod resolver;

// Re-export commonly used adapters
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use renderer::PlaceholderRenderer;
pub use resolver::{FilesystemTemplateResolver, MemoryTemplateResolver, TemplateManifest};
