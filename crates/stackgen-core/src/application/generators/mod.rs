//! The generator registry.
//!
//! Two pipelines are assembled from the same generator types:
//!
//! - [`workspace_registry`] runs once per generation, top to bottom.
//! - [`service_registry`] is re-entered by the `microservices` step for
//!   every service, against that service's effective configuration.
//!
//! Registration order is execution order. [`Composer::new`] rejects a
//! registry whose prerequisites are out of order.
//!
//! [`Composer::new`]: crate::application::composer::Composer::new

mod auth;
mod database;
mod environments;
mod graphql;
mod hardening;
mod infrastructure;
mod microservices;
mod subproject;
mod testing;
mod workspace;

pub use auth::AuthGenerator;
pub use database::DatabaseGenerator;
pub use environments::EnvironmentsGenerator;
pub use graphql::GraphqlGenerator;
pub use hardening::{
    CodeQualityGenerator, FrontendOptimizationGenerator, ObservabilityGenerator,
    SecurityGenerator,
};
pub use infrastructure::{CiGenerator, DeployTargetsGenerator, DockerGenerator};
pub use microservices::MicroservicesGenerator;
pub use subproject::{BackendGenerator, FrontendGenerator, install_template};
pub use testing::TestingGenerator;
pub use workspace::{ReadmeGenerator, SharedPackagesGenerator, WorkspaceGenerator};

use std::path::Path;

use tracing::debug;

use crate::application::composer::{GenerationContext, Generator, Scope, Step};
use crate::domain::{ExtensionPoint, Language, PackageManifest, import_specifier};
use crate::error::StackgenResult;

/// Full pipeline for one generation run.
pub fn workspace_registry() -> Vec<Box<dyn Generator>> {
    vec![
        Box::new(WorkspaceGenerator),
        Box::new(BackendGenerator),
        Box::new(FrontendGenerator),
        Box::new(DatabaseGenerator),
        Box::new(SharedPackagesGenerator),
        Box::new(DockerGenerator::new(Scope::Workspace)),
        Box::new(CiGenerator),
        Box::new(TestingGenerator::new(Scope::Workspace)),
        Box::new(GraphqlGenerator),
        Box::new(AuthGenerator),
        Box::new(EnvironmentsGenerator),
        Box::new(MicroservicesGenerator),
        Box::new(CodeQualityGenerator),
        Box::new(ObservabilityGenerator),
        Box::new(FrontendOptimizationGenerator),
        Box::new(SecurityGenerator),
        Box::new(DeployTargetsGenerator),
        Box::new(ReadmeGenerator),
    ]
}

/// Backend path re-entered for each microservice.
pub fn service_registry() -> Vec<Box<dyn Generator>> {
    vec![
        Box::new(BackendGenerator),
        Box::new(DatabaseGenerator),
        Box::new(SharedPackagesGenerator),
        Box::new(DockerGenerator::new(Scope::Service)),
        Box::new(TestingGenerator::new(Scope::Service)),
        Box::new(GraphqlGenerator),
        Box::new(AuthGenerator),
    ]
}

// ── Pass helpers ─────────────────────────────────────────────────────────────

/// Run `pass` once per backend sub-project: the main backend, then every
/// service, each with its own effective configuration.
pub(crate) fn each_backend(
    ctx: &GenerationContext<'_>,
    mut pass: impl FnMut(&GenerationContext<'_>) -> StackgenResult<()>,
) -> StackgenResult<()> {
    for target in ctx.config.backend_targets() {
        pass(&ctx.for_service(&target))?;
    }
    Ok(())
}

/// Patch unless `insertion` is already present.
///
/// Hardening passes may be re-run over a finished tree; they use this
/// instead of [`GenerationContext::patch`] so a second run changes nothing.
pub(crate) fn patch_once(
    ctx: &GenerationContext<'_>,
    step: Step,
    path: &Path,
    point: ExtensionPoint,
    insertion: &str,
) -> StackgenResult<()> {
    let text = ctx.require(step, path)?;
    if text.contains(insertion) {
        debug!(file = %ctx.display_path(path), %point, "already wired");
        return Ok(());
    }
    ctx.patch(step, path, point, insertion)
}

// ── Snippet helpers ──────────────────────────────────────────────────────────

/// `import <clause> from '<module>';` spelled for the backend's module style.
pub(crate) fn backend_import(ctx: &GenerationContext<'_>, clause: &str, module: &str) -> String {
    format!(
        "import {clause} from '{}';",
        import_specifier(ctx.config.backend().framework, module)
    )
}

/// Type annotation emitted only for TypeScript, e.g. `: any`.
pub(crate) fn annotation(language: Language, text: &'static str) -> &'static str {
    if language.is_statically_typed() { text } else { "" }
}

/// Add runtime dependencies.
pub(crate) fn add_dependencies(manifest: &mut PackageManifest, packages: &[(&str, &str)]) {
    for (name, version) in packages {
        manifest.add_dependency(name, version);
    }
}

/// Add dev dependencies.
pub(crate) fn add_dev_dependencies(manifest: &mut PackageManifest, packages: &[(&str, &str)]) {
    for (name, version) in packages {
        manifest.add_dev_dependency(name, version);
    }
}

/// Add `@types/*` packages, only for TypeScript projects.
pub(crate) fn add_type_packages(
    manifest: &mut PackageManifest,
    language: Language,
    packages: &[(&str, &str)],
) {
    if language.is_statically_typed() {
        add_dev_dependencies(manifest, packages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::composer::{Composer, Step};

    #[test]
    fn workspace_registry_is_well_ordered() {
        let composer = Composer::new(workspace_registry()).unwrap();
        let steps = composer.steps();
        assert_eq!(steps.first(), Some(&Step::Workspace));
        assert_eq!(steps.last(), Some(&Step::Readme));
        assert_eq!(steps.len(), 18);
    }

    #[test]
    fn service_registry_is_well_ordered() {
        let composer = Composer::new(service_registry()).unwrap();
        assert_eq!(
            composer.steps(),
            vec![
                Step::Backend,
                Step::Database,
                Step::SharedPackages,
                Step::Docker,
                Step::Testing,
                Step::Graphql,
                Step::Auth,
            ]
        );
    }

    #[test]
    fn workspace_order_follows_the_documented_stages() {
        let steps = Composer::new(workspace_registry()).unwrap().steps();
        let position = |s: Step| steps.iter().position(|x| *x == s).unwrap();
        assert!(position(Step::Backend) < position(Step::Graphql));
        assert!(position(Step::Graphql) < position(Step::Auth));
        assert!(position(Step::Auth) < position(Step::Environments));
        assert!(position(Step::Environments) < position(Step::Microservices));
        assert!(position(Step::Microservices) < position(Step::CodeQuality));
    }
}
