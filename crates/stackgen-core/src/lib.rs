//! Stackgen Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for the stackgen
//! full-stack monorepo generator, following hexagonal (ports and adapters)
//! architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           stackgen-cli (CLI)            │
//! │     (Builds configs, drives services)   │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │  (ProjectAssembler, TemplateCatalog)    │
//! │   Composer + generator registry         │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │ (Filesystem, Resolver, Renderer, Obs.)  │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │   stackgen-adapters (Infrastructure)    │
//! │ (LocalFilesystem, FilesystemResolver)   │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Logic)       │
//! │ (ProjectConfig, RenderContext, Patcher) │
//! │         No I/O                          │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stackgen_core::{
//!     application::ProjectAssembler,
//!     domain::{Feature, Framework, Language, ProjectConfig},
//! };
//!
//! // 1. Describe the project
//! let config = ProjectConfig::builder("shop")
//!     .backend(Language::TypeScript, Framework::Express)
//!     .feature(Feature::Auth)
//!     .build()
//!     .unwrap();
//!
//! // 2. Use application service (with injected adapters)
//! let assembler = ProjectAssembler::new(filesystem, templates, renderer);
//! assembler.generate(&config, "./output").unwrap();
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        GenerationObserver, GenerationReport, ProjectAssembler, Step, TemplateCatalog,
        TemplateInfo,
        ports::{Filesystem, TemplateRenderer, TemplateResolver},
    };
    pub use crate::domain::{
        Communication, CssSolution, Database, DeployTarget, Feature, Framework, Language,
        MicroserviceSpec, ProjectConfig, ProjectConfigBuilder, RenderContext, StackChoice,
        StateManagement, TemplateCategory,
    };
    pub use crate::error::{StackgenError, StackgenResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
