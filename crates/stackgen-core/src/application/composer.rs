//! The Feature Composer: a generic executor over a registry of generators.
//!
//! ```text
//! ┌──────────────┐   plan()   ┌──────────────────────────────────────┐
//! │ ProjectConfig│ ─────────▶ │ [workspace ✓] [backend ✓] [graphql ✗]│
//! └──────────────┘            └──────────────────────────────────────┘
//!                                 run(): in order, each at most once
//! ```
//!
//! Each [`Generator`] declares its [`Step`], the steps it depends on, and a
//! trigger predicate. The registry order IS the execution order; building a
//! [`Composer`] checks that every prerequisite is registered earlier, so a
//! misordered registry is rejected before anything touches disk.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::application::error::ApplicationError;
use crate::application::ports::{
    Filesystem, GenerationObserver, TemplateRenderer, TemplateResolver,
};
use crate::domain::{
    BackendTarget, DomainError, ExtensionPoint, PackageManifest, ProjectConfig, SourcePatcher,
    framework_def,
};
use crate::error::{StackgenError, StackgenResult};

// ── Step ─────────────────────────────────────────────────────────────────────

/// Identifier of one pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Workspace,
    Backend,
    Frontend,
    Database,
    SharedPackages,
    Docker,
    Ci,
    Testing,
    Graphql,
    Auth,
    Environments,
    Microservices,
    CodeQuality,
    Observability,
    FrontendOptimization,
    Security,
    DeployTargets,
    Readme,
}

impl Step {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Backend => "backend",
            Self::Frontend => "frontend",
            Self::Database => "database",
            Self::SharedPackages => "shared-packages",
            Self::Docker => "docker",
            Self::Ci => "ci",
            Self::Testing => "testing",
            Self::Graphql => "graphql",
            Self::Auth => "auth",
            Self::Environments => "environments",
            Self::Microservices => "microservices",
            Self::CodeQuality => "code-quality",
            Self::Observability => "observability",
            Self::FrontendOptimization => "frontend-optimization",
            Self::Security => "security",
            Self::DeployTargets => "deploy-targets",
            Self::Readme => "readme",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Generator ────────────────────────────────────────────────────────────────

/// Which pipeline a generator instance belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The whole workspace, run once per generation.
    Workspace,
    /// One microservice, re-entered per service.
    Service,
}

/// One unit of the composition pipeline.
pub trait Generator: Send + Sync {
    fn step(&self) -> Step;

    /// Steps that must have completed before this one runs.
    fn prerequisites(&self) -> &'static [Step] {
        &[]
    }

    /// Whether the configuration asks for this step at all.
    fn is_triggered(&self, _config: &ProjectConfig) -> bool {
        true
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()>;

    /// Directory reported when this step fails.
    fn subproject(&self, ctx: &GenerationContext<'_>) -> PathBuf {
        ctx.root.clone()
    }
}

/// A sub-project directory under `apps/` and the port it listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubProject {
    pub name: String,
    pub port: u16,
}

impl SubProject {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }
}

// ── GenerationContext ────────────────────────────────────────────────────────

/// Everything a generator may read or write.
///
/// `config` is the effective configuration of the pipeline being run: the
/// workspace configuration at the top level, a service's overridden one
/// inside the service pipeline. `backend` names the backend sub-project
/// that backend-scoped steps operate on.
pub struct GenerationContext<'a> {
    pub fs: &'a dyn Filesystem,
    pub templates: &'a dyn TemplateResolver,
    pub renderer: &'a dyn TemplateRenderer,
    pub observer: &'a dyn GenerationObserver,
    pub root: PathBuf,
    pub config: &'a ProjectConfig,
    pub backend: SubProject,
    pub scope: Scope,
}

impl<'a> GenerationContext<'a> {
    /// Workspace-level context targeting the main backend.
    pub fn new(
        fs: &'a dyn Filesystem,
        templates: &'a dyn TemplateResolver,
        renderer: &'a dyn TemplateRenderer,
        observer: &'a dyn GenerationObserver,
        root: impl Into<PathBuf>,
        config: &'a ProjectConfig,
    ) -> Self {
        Self {
            fs,
            templates,
            renderer,
            observer,
            root: root.into(),
            config,
            backend: SubProject::new("backend", config.backend_port()),
            scope: Scope::Workspace,
        }
    }

    /// Context for one microservice, sharing this context's ports and root.
    pub fn for_service<'b>(&'b self, target: &'b BackendTarget) -> GenerationContext<'b> {
        GenerationContext {
            fs: self.fs,
            templates: self.templates,
            renderer: self.renderer,
            observer: self.observer,
            root: self.root.clone(),
            config: &target.config,
            backend: SubProject::new(target.name.clone(), target.port),
            scope: Scope::Service,
        }
    }

    // ── Paths ────────────────────────────────────────────────────────────────

    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn subproject_dir(&self, name: &str) -> PathBuf {
        self.root.join("apps").join(name)
    }

    pub fn backend_dir(&self) -> PathBuf {
        self.subproject_dir(&self.backend.name)
    }

    pub fn frontend_dir(&self) -> PathBuf {
        self.subproject_dir("frontend")
    }

    /// Source file of the backend, e.g. `src/auth.ts`.
    pub fn backend_source(&self, stem: &str) -> PathBuf {
        self.backend_dir()
            .join(format!("{stem}.{}", self.config.backend().language.file_extension()))
    }

    /// The backend's entry module (`src/app.*` or `src/main.ts`).
    pub fn backend_entry(&self) -> PathBuf {
        self.backend_source(framework_def(self.config.backend().framework).entry_stem)
    }

    /// The backend's root module, for frameworks that have one.
    pub fn backend_module(&self) -> Option<PathBuf> {
        framework_def(self.config.backend().framework)
            .module_stem
            .map(|stem| self.backend_source(stem))
    }

    /// Source file of the frontend, e.g. `build/optimization.ts`.
    pub fn frontend_source(&self, stem: &str) -> PathBuf {
        self.frontend_dir()
            .join(format!("{stem}.{}", self.config.frontend().language.file_extension()))
    }

    // ── File operations ──────────────────────────────────────────────────────

    /// Write a file, creating its parent directories.
    pub fn write(&self, path: &Path, content: &str) -> StackgenResult<()> {
        if let Some(parent) = path.parent() {
            self.fs.create_dir_all(parent)?;
        }
        self.fs.write_file(path, content)?;
        debug!(path = %path.display(), bytes = content.len(), "wrote file");
        Ok(())
    }

    /// Write raw bytes, creating parent directories.
    pub fn write_bytes(&self, path: &Path, content: &[u8]) -> StackgenResult<()> {
        if let Some(parent) = path.parent() {
            self.fs.create_dir_all(parent)?;
        }
        self.fs.write_bytes(path, content)?;
        debug!(path = %path.display(), bytes = content.len(), "copied file");
        Ok(())
    }

    pub fn read(&self, path: &Path) -> StackgenResult<String> {
        self.fs.read_file(path)
    }

    /// Read a file an earlier step must have produced.
    ///
    /// # Errors
    ///
    /// `MissingPrerequisite` naming `step` when the file is absent.
    pub fn require(&self, step: Step, path: &Path) -> StackgenResult<String> {
        if !self.fs.exists(path) {
            return Err(ApplicationError::MissingPrerequisite {
                step: step.to_string(),
                requirement: format!("{} to exist", self.display_path(path)),
            }
            .into());
        }
        self.fs.read_file(path)
    }

    /// Insert `insertion` at `point` of an existing file.
    pub fn patch(
        &self,
        step: Step,
        path: &Path,
        point: ExtensionPoint,
        insertion: &str,
    ) -> StackgenResult<()> {
        let text = self.require(step, path)?;
        let patched = SourcePatcher::patch(&text, point, insertion).map_err(|e| {
            warn!(file = %path.display(), point = %point, "extension point missing");
            StackgenError::from(e)
        })?;
        self.fs.write_file(path, &patched)?;
        debug!(file = %path.display(), point = %point, "patched");
        Ok(())
    }

    /// Read, edit and rewrite `<dir>/package.json`.
    pub fn update_manifest(
        &self,
        step: Step,
        dir: &Path,
        edit: impl FnOnce(&mut PackageManifest),
    ) -> StackgenResult<()> {
        let path = dir.join("package.json");
        let raw = self.require(step, &path)?;
        let mut manifest = PackageManifest::parse(&raw).map_err(|e| match e {
            DomainError::InvalidManifest(reason) => ApplicationError::ManifestUnreadable {
                path: path.clone(),
                reason,
            },
            other => ApplicationError::ManifestUnreadable {
                path: path.clone(),
                reason: other.to_string(),
            },
        })?;
        edit(&mut manifest);
        self.fs.write_file(&path, &manifest.to_string_pretty())
    }

    /// `path` relative to the project root, for messages.
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

// ── Composer ─────────────────────────────────────────────────────────────────

/// One row of a dry-run plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub step: Step,
    pub triggered: bool,
    pub prerequisites: Vec<Step>,
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeReport {
    pub executed: Vec<Step>,
    pub skipped: Vec<Step>,
}

pub struct Composer {
    generators: Vec<Box<dyn Generator>>,
}

impl Composer {
    /// Build an executor over `generators`, in the given order.
    ///
    /// # Errors
    ///
    /// `PipelineOrder` when a step is registered twice or a prerequisite is
    /// not registered before the step that needs it.
    pub fn new(generators: Vec<Box<dyn Generator>>) -> StackgenResult<Self> {
        let mut seen: HashSet<Step> = HashSet::new();
        for generator in &generators {
            let step = generator.step();
            for prerequisite in generator.prerequisites() {
                if !seen.contains(prerequisite) {
                    return Err(ApplicationError::PipelineOrder {
                        step: step.to_string(),
                        reason: format!("prerequisite '{prerequisite}' is not registered before it"),
                    }
                    .into());
                }
            }
            if !seen.insert(step) {
                return Err(ApplicationError::PipelineOrder {
                    step: step.to_string(),
                    reason: "registered more than once".into(),
                }
                .into());
            }
        }
        Ok(Self { generators })
    }

    pub fn steps(&self) -> Vec<Step> {
        self.generators.iter().map(|g| g.step()).collect()
    }

    pub fn plan(&self, config: &ProjectConfig) -> Vec<PlannedStep> {
        self.generators
            .iter()
            .map(|g| PlannedStep {
                step: g.step(),
                triggered: g.is_triggered(config),
                prerequisites: g.prerequisites().to_vec(),
            })
            .collect()
    }

    /// Run every triggered step once, in registry order.
    ///
    /// The first failure aborts the run. Files already written stay on disk.
    pub fn run(&self, ctx: &GenerationContext<'_>) -> StackgenResult<ComposeReport> {
        let mut report = ComposeReport::default();
        let mut completed: HashSet<Step> = HashSet::new();
        let label = ctx.backend.name.as_str();

        for generator in &self.generators {
            let step = generator.step();
            if !generator.is_triggered(ctx.config) {
                debug!(%step, subproject = label, "step not triggered");
                ctx.observer.step_skipped(step, label);
                report.skipped.push(step);
                continue;
            }

            let outcome: StackgenResult<()> = match generator
                .prerequisites()
                .iter()
                .find(|p| !completed.contains(*p))
            {
                Some(missing) => Err(ApplicationError::MissingPrerequisite {
                    step: step.to_string(),
                    requirement: format!("step '{missing}' to have run"),
                }
                .into()),
                None => {
                    ctx.observer.step_started(step, label);
                    info!(%step, subproject = label, "running step");
                    generator.generate(ctx)
                }
            };

            if let Err(source) = outcome {
                return Err(ApplicationError::StepFailed {
                    step: step.to_string(),
                    subproject: generator.subproject(ctx),
                    source: Box::new(source),
                }
                .into());
            }

            ctx.observer.step_finished(step, label);
            completed.insert(step);
            report.executed.push(step);
        }

        Ok(report)
    }
}

impl fmt::Debug for Composer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composer")
            .field("steps", &self.steps())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockFilesystem, MockTemplateRenderer, NoopObserver};
    use crate::application::ports::{ResolvedTemplate, TemplateFile};
    use crate::domain::{Feature, Framework, Language, TemplateCategory};
    use std::sync::Mutex;

    struct NoTemplates;

    impl TemplateResolver for NoTemplates {
        fn resolve(
            &self,
            category: TemplateCategory,
            language: Language,
            framework: Framework,
        ) -> StackgenResult<ResolvedTemplate> {
            Err(ApplicationError::TemplateNotFound {
                category: category.to_string(),
                framework: framework.to_string(),
                language: language.to_string(),
                searched: String::new(),
            }
            .into())
        }

        fn walk(&self, _template: &ResolvedTemplate) -> StackgenResult<Vec<TemplateFile>> {
            Ok(Vec::new())
        }

        fn list(&self) -> StackgenResult<Vec<ResolvedTemplate>> {
            Ok(Vec::new())
        }
    }

    /// Records its step into a shared log; optionally fails or is gated.
    struct Fake {
        step: Step,
        prerequisites: &'static [Step],
        gate: Option<Feature>,
        fail: bool,
        log: &'static Mutex<Vec<Step>>,
    }

    impl Generator for Fake {
        fn step(&self) -> Step {
            self.step
        }

        fn prerequisites(&self) -> &'static [Step] {
            self.prerequisites
        }

        fn is_triggered(&self, config: &ProjectConfig) -> bool {
            self.gate.is_none_or(|f| config.has_feature(f))
        }

        fn generate(&self, _ctx: &GenerationContext<'_>) -> StackgenResult<()> {
            if self.fail {
                return Err(DomainError::AnchorNotFound {
                    point: "imports".into(),
                }
                .into());
            }
            self.log.lock().unwrap().push(self.step);
            Ok(())
        }
    }

    fn fake(step: Step, prerequisites: &'static [Step], log: &'static Mutex<Vec<Step>>) -> Box<dyn Generator> {
        Box::new(Fake {
            step,
            prerequisites,
            gate: None,
            fail: false,
            log,
        })
    }

    fn leak_log() -> &'static Mutex<Vec<Step>> {
        Box::leak(Box::new(Mutex::new(Vec::new())))
    }

    fn with_ctx<R>(config: &ProjectConfig, f: impl FnOnce(&GenerationContext<'_>) -> R) -> R {
        let fs = MockFilesystem::new();
        let renderer = MockTemplateRenderer::new();
        let ctx = GenerationContext::new(&fs, &NoTemplates, &renderer, &NoopObserver, "/out/demo", config);
        f(&ctx)
    }

    #[test]
    fn prerequisite_registered_later_is_rejected() {
        let log = leak_log();
        let err = Composer::new(vec![
            fake(Step::Graphql, &[Step::Backend], log),
            fake(Step::Backend, &[], log),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            StackgenError::Application(ApplicationError::PipelineOrder { .. })
        ));
    }

    #[test]
    fn duplicate_step_is_rejected() {
        let log = leak_log();
        let err = Composer::new(vec![fake(Step::Backend, &[], log), fake(Step::Backend, &[], log)])
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn runs_in_registry_order_and_skips_untriggered() {
        let log = leak_log();
        let composer = Composer::new(vec![
            fake(Step::Workspace, &[], log),
            fake(Step::Backend, &[], log),
            Box::new(Fake {
                step: Step::Graphql,
                prerequisites: &[Step::Backend],
                gate: Some(Feature::GraphQl),
                fail: false,
                log,
            }),
            fake(Step::Readme, &[Step::Workspace], log),
        ])
        .unwrap();

        let config = ProjectConfig::builder("demo").build().unwrap();
        let report = with_ctx(&config, |ctx| composer.run(ctx)).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![Step::Workspace, Step::Backend, Step::Readme]
        );
        assert_eq!(report.skipped, vec![Step::Graphql]);
        assert_eq!(report.executed.len(), 3);
    }

    #[test]
    fn triggered_step_with_untriggered_prerequisite_fails_fast() {
        let log = leak_log();
        let composer = Composer::new(vec![
            Box::new(Fake {
                step: Step::Backend,
                prerequisites: &[],
                gate: Some(Feature::Docker),
                fail: false,
                log,
            }),
            fake(Step::Auth, &[Step::Backend], log),
        ])
        .unwrap();

        let config = ProjectConfig::builder("demo").build().unwrap();
        let err = with_ctx(&config, |ctx| composer.run(ctx)).unwrap_err();

        assert_eq!(err.failed_step(), Some("auth"));
        assert!(matches!(
            err.root_cause(),
            StackgenError::Application(ApplicationError::MissingPrerequisite { .. })
        ));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn failure_aborts_remaining_steps() {
        let log = leak_log();
        let composer = Composer::new(vec![
            fake(Step::Workspace, &[], log),
            Box::new(Fake {
                step: Step::Backend,
                prerequisites: &[],
                gate: None,
                fail: true,
                log,
            }),
            fake(Step::Readme, &[], log),
        ])
        .unwrap();

        let config = ProjectConfig::builder("demo").build().unwrap();
        let err = with_ctx(&config, |ctx| composer.run(ctx)).unwrap_err();

        assert_eq!(*log.lock().unwrap(), vec![Step::Workspace]);
        match err {
            StackgenError::Application(ApplicationError::StepFailed { step, subproject, .. }) => {
                assert_eq!(step, "backend");
                assert_eq!(subproject, PathBuf::from("/out/demo"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn plan_reports_triggers_without_running() {
        let log = leak_log();
        let composer = Composer::new(vec![
            fake(Step::Backend, &[], log),
            Box::new(Fake {
                step: Step::Auth,
                prerequisites: &[Step::Backend],
                gate: Some(Feature::Auth),
                fail: false,
                log,
            }),
        ])
        .unwrap();
        let config = ProjectConfig::builder("demo").feature(Feature::Auth).build().unwrap();
        let plan = composer.plan(&config);
        assert!(plan.iter().all(|p| p.triggered));
        assert_eq!(plan[1].prerequisites, vec![Step::Backend]);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn require_reports_missing_file_as_prerequisite() {
        let config = ProjectConfig::builder("demo").build().unwrap();
        let mut fs = MockFilesystem::new();
        fs.expect_exists().return_const(false);
        let renderer = MockTemplateRenderer::new();
        let ctx = GenerationContext::new(&fs, &NoTemplates, &renderer, &NoopObserver, "/out/demo", &config);

        let err = ctx
            .require(Step::Graphql, &ctx.backend_entry())
            .unwrap_err();
        assert!(err.to_string().contains("apps/backend/src/app.ts"));
    }
}
