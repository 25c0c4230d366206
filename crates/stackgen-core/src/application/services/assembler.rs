//! Project Assembler - top-level generation driver.
//!
//! ```text
//! validate ──▶ reserve <parent>/<name> ──▶ workspace pipeline ──▶ stackgen.json
//! ```
//!
//! Validation happens before anything touches disk. Once the pipeline has
//! started, a failure stops it where it is: the partially generated tree is
//! left in place for inspection and is never rolled back.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    application::{
        ApplicationError,
        composer::{Composer, GenerationContext, PlannedStep, Step},
        generators::workspace_registry,
        ports::{Filesystem, GenerationObserver, NoopObserver, TemplateRenderer, TemplateResolver},
    },
    domain::ProjectConfig,
    error::{StackgenError, StackgenResult},
};

/// Name of the configuration document written at the project root.
pub const CONFIG_DOCUMENT: &str = "stackgen.json";

/// Outcome of a successful generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// The project directory, `<parent>/<projectName>`.
    pub root: PathBuf,
    /// Directories created under `apps/`.
    pub subprojects: Vec<String>,
    pub executed: Vec<Step>,
    pub skipped: Vec<Step>,
}

impl GenerationReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Main generation service.
pub struct ProjectAssembler {
    filesystem: Box<dyn Filesystem>,
    templates: Box<dyn TemplateResolver>,
    renderer: Box<dyn TemplateRenderer>,
    observer: Box<dyn GenerationObserver>,
    overwrite: bool,
}

impl ProjectAssembler {
    /// Create an assembler with the given adapters.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use stackgen_core::application::ProjectAssembler;
    ///
    /// let assembler = ProjectAssembler::new(
    ///     filesystem, // impl Filesystem
    ///     templates,  // impl TemplateResolver
    ///     renderer,   // impl TemplateRenderer
    /// );
    /// ```
    pub fn new(
        filesystem: Box<dyn Filesystem>,
        templates: Box<dyn TemplateResolver>,
        renderer: Box<dyn TemplateRenderer>,
    ) -> Self {
        Self {
            filesystem,
            templates,
            renderer,
            observer: Box::new(NoopObserver),
            overwrite: false,
        }
    }

    /// Report step progress to `observer`.
    pub fn with_observer(mut self, observer: Box<dyn GenerationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Delete an existing project directory instead of refusing to run.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// The steps a run would execute for `config`, without touching disk.
    pub fn plan(&self, config: &ProjectConfig) -> StackgenResult<Vec<PlannedStep>> {
        config.validate()?;
        Ok(Composer::new(workspace_registry())?.plan(config))
    }

    /// Generate the project for `config` under `parent`.
    ///
    /// # Errors
    ///
    /// - `DomainError` when the configuration is invalid; nothing is written.
    /// - `ProjectExists` when `<parent>/<projectName>` exists and overwrite
    ///   is off; nothing is written.
    /// - `StepFailed` when a pipeline step fails; files written by earlier
    ///   steps stay on disk.
    #[instrument(
        skip_all,
        fields(
            project = %config.project_name(),
            parent = %parent.as_ref().display()
        )
    )]
    pub fn generate(
        &self,
        config: &ProjectConfig,
        parent: impl AsRef<Path>,
    ) -> StackgenResult<GenerationReport> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        info!(%run_id, "Generating {} project", config.project_name());

        // 1. Validate before any filesystem mutation
        config.validate()?;
        let composer = Composer::new(workspace_registry())?;

        // 2. Reserve the target directory
        let root = parent.as_ref().join(config.project_name().as_str());
        self.reserve(&root)?;

        // 3. Run the workspace pipeline
        let ctx = GenerationContext::new(
            self.filesystem.as_ref(),
            self.templates.as_ref(),
            self.renderer.as_ref(),
            self.observer.as_ref(),
            root.clone(),
            config,
        );
        let report = composer
            .run(&ctx)
            .inspect_err(|e| self.report_failure(e, &root))?;

        // 4. Persist the configuration next to the output
        let document = config.to_json()?;
        ctx.write(&root.join(CONFIG_DOCUMENT), &format!("{document}\n"))
            .inspect_err(|e| self.report_failure(e, &root))?;

        let finished_at = Utc::now();
        info!(
            %run_id,
            executed = report.executed.len(),
            skipped = report.skipped.len(),
            "Generation completed successfully"
        );

        Ok(GenerationReport {
            run_id,
            started_at,
            finished_at,
            root,
            subprojects: config.subproject_names(),
            executed: report.executed,
            skipped: report.skipped,
        })
    }

    // -------------------------------------------------------------------------
    // Internal Helpers
    // -------------------------------------------------------------------------

    fn reserve(&self, root: &Path) -> StackgenResult<()> {
        if !self.filesystem.exists(root) {
            return Ok(());
        }
        if !self.overwrite {
            return Err(ApplicationError::ProjectExists {
                path: root.to_path_buf(),
            }
            .into());
        }
        warn!(path = %root.display(), "Removing existing project directory");
        self.filesystem.remove_dir_all(root)
    }

    fn report_failure(&self, err: &StackgenError, root: &Path) {
        let step = err.failed_step().unwrap_or("finalize");
        error!(
            error = %err.root_cause(),
            "generation failed at step {step}; the partially generated tree at {} may be inspected or deleted",
            root.display()
        );
    }
}
