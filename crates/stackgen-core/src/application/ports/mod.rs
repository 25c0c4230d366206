//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `stackgen-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `Filesystem`: File operations
//!   - `TemplateResolver`: Template lookup and enumeration
//!   - `TemplateRenderer`: Placeholder expansion
//!   - `GenerationObserver`: Progress notifications

pub mod output;

pub use output::{
    Filesystem, GenerationObserver, NoopObserver, ResolvedTemplate, TemplateFile,
    TemplateRenderer, TemplateResolver,
};

#[cfg(test)]
pub use output::{MockFilesystem, MockTemplateRenderer};
