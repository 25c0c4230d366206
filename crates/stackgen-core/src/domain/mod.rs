//! Core domain layer for stackgen.
//!
//! Pure logic over in-memory values: the configuration model and its
//! validation, the framework capability registry, template variable
//! substitution, extension-point patching, manifest editing and stage
//! descriptors. Nothing here touches the filesystem; all I/O goes through
//! the ports in `crate::application`.

pub mod capabilities;
pub mod config;
pub mod environment;
pub mod error;
pub mod extension_point;
pub mod manifest;
pub mod render_context;
pub mod value_objects;

mod validation;

pub use capabilities::{
    Dialect, FRAMEWORK_REGISTRY, FrameworkDef, ModuleStyle, framework_def, frameworks_for,
    import_specifier,
};
pub use config::{
    BackendTarget, ConfigDocument, DEFAULT_BACKEND_PORT, DEFAULT_FRONTEND_PORT, MicroserviceSpec,
    ProjectConfig, ProjectConfigBuilder, ProjectName, RESERVED_SERVICE_NAMES, StackChoice,
    close_implications,
};
pub use environment::{
    GRPC_BASE_PORT, Stage, StageDescriptor, grpc_port, service_env_prefix,
    service_grpc_port_key, service_port_key, service_url_key,
};
pub use error::{DomainError, ErrorCategory};
pub use extension_point::{ExtensionPoint, MARKER_PREFIX, SourcePatcher, insert_at};
pub use manifest::PackageManifest;
pub use render_context::RenderContext;
pub use validation::ConfigValidator;
pub use value_objects::{
    Communication, CssSolution, Database, DeployTarget, Feature, Framework, Language,
    StateManagement, TemplateCategory,
};
