//! Implementation of the `stackgen new` command.
//!
//! Responsibility: translate CLI arguments into a `ProjectConfig`, call the
//! core assembler, and display results. No business logic lives here.

use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::{debug, info, instrument};

use stackgen_adapters::{FilesystemTemplateResolver, LocalFilesystem, PlaceholderRenderer};
use stackgen_core::{
    application::{GenerationReport, PlannedStep, ProjectAssembler, TemplateCatalog},
    domain::{Language, ProjectConfig, StackChoice},
    error::StackgenError,
};

use crate::{
    cli::{NewArgs, OutputFormat},
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
    progress::SpinnerObserver,
};

/// Execute the `stackgen new` command.
///
/// Dispatch sequence:
/// 1. Split the NAME argument into project name and parent directory
/// 2. Build and validate the `ProjectConfig` (document, defaults, flags)
/// 3. Early-exit with the step plan if `--dry-run`
/// 4. Check every needed template exists before writing anything
/// 5. Run the assembler with a spinner attached
/// 6. Print the summary and next steps
#[instrument(skip_all, fields(project = %args.name))]
pub fn execute(args: NewArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    // 1. Resolve project path
    let (project_name, parent) = resolve_project_path(&args.name, args.output.as_deref())?;

    // 2. Build the configuration (validation happens in the builder)
    let project = build_project_config(&args, &project_name, &config)?;
    debug!(
        backend = %project.backend(),
        frontend = %project.frontend(),
        services = project.microservices().len(),
        "Configuration resolved"
    );

    let templates = FilesystemTemplateResolver::with_defaults(
        args.templates
            .clone()
            .or_else(|| config.templates.local_path.clone()),
    );
    let assembler = ProjectAssembler::new(
        Box::new(LocalFilesystem::new()),
        Box::new(templates.clone()),
        Box::new(PlaceholderRenderer::new()),
    )
    .with_overwrite(args.force);

    // 3. Dry run: describe but do not write.
    if args.dry_run {
        let plan = assembler.plan(&project).with_cli_context(|| "planning")?;
        let missing = TemplateCatalog::new(Box::new(templates)).missing_templates(&project);
        return show_plan(&project, &parent, &plan, &missing, &output);
    }

    // 4. Pre-flight template check
    preflight(&templates, &project)?;

    // 5. Generate
    let observer = SpinnerObserver::new(output.is_interactive());
    let spinner = observer.handle();
    let assembler = assembler.with_observer(Box::new(observer));

    if output.format() != OutputFormat::Json {
        output.header(&format!("Generating '{project_name}'..."))?;
    }
    info!(project = %project_name, parent = %parent.display(), "Generation started");

    let result = assembler.generate(&project, &parent);
    spinner.finish_and_clear();
    let report = result?;

    // 6. Summary
    show_report(&report, &output)
}

// ── Path resolution ───────────────────────────────────────────────────────────

/// Split `name` into the project name and the directory it is created in.
///
/// `--output` replaces the current directory as the base that any leading
/// path in `name` is resolved against.
pub fn resolve_project_path(name: &str, output: Option<&Path>) -> CliResult<(String, PathBuf)> {
    let path = Path::new(name);

    let project_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CliError::InvalidInput {
            message: format!("cannot extract a project name from '{name}'"),
            source: None,
        })?
        .to_string();

    let leading = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf);

    let parent = match (output, leading) {
        (Some(base), Some(rel)) => base.join(rel),
        (Some(base), None) => base.to_path_buf(),
        (None, Some(rel)) => rel,
        (None, None) => PathBuf::from("."),
    };

    Ok((project_name, parent))
}

// ── Configuration construction ────────────────────────────────────────────────

/// Layer the `--from` document (or the configured defaults) under the
/// command-line flags.
fn build_project_config(
    args: &NewArgs,
    project_name: &str,
    config: &AppConfig,
) -> CliResult<ProjectConfig> {
    let document = args.from.as_deref().map(read_document).transpose()?;

    let (mut builder, backend, frontend) = match &document {
        Some(doc) => {
            let mut builder = doc.to_builder().project_name(project_name);
            // A prefix that only mirrored the old name follows the new one.
            if doc.docker_prefix() == doc.project_name().as_str() {
                builder = builder.docker_prefix("");
            }
            (builder, doc.backend(), doc.frontend())
        }
        None => {
            let defaults = &config.defaults;
            let builder = ProjectConfig::builder(project_name)
                .backend_port(defaults.backend_port)
                .frontend_port(defaults.frontend_port);
            let backend = StackChoice::new(
                parse_default(&defaults.backend_language, "defaults.backend_language")?,
                parse_default(&defaults.backend_framework, "defaults.backend_framework")?,
            );
            let frontend = StackChoice::new(
                parse_default(&defaults.frontend_language, "defaults.frontend_language")?,
                parse_default(&defaults.frontend_framework, "defaults.frontend_framework")?,
            );
            (builder, backend, frontend)
        }
    };

    builder = builder
        .backend(
            args.backend_language
                .map(Language::from)
                .unwrap_or(backend.language),
            args.backend.unwrap_or(backend.framework),
        )
        .frontend(
            args.frontend_language
                .map(Language::from)
                .unwrap_or(frontend.language),
            args.frontend.unwrap_or(frontend.framework),
        )
        .databases(args.databases.iter().copied())
        .features(args.features.iter().copied());

    for target in &args.deploy {
        builder = builder.deploy_target(*target);
    }
    for service in &args.services {
        builder = builder.microservice(service.clone());
    }
    if let Some(state) = args.state {
        builder = builder.state_management(state);
    }
    if let Some(css) = args.css {
        builder = builder.css_solution(css);
    }
    if let Some(port) = args.backend_port {
        builder = builder.backend_port(port);
    }
    if let Some(port) = args.frontend_port {
        builder = builder.frontend_port(port);
    }

    builder
        .build()
        .map_err(|e| CliError::Core(StackgenError::from(e)))
}

fn read_document(path: &Path) -> CliResult<ProjectConfig> {
    let raw = std::fs::read_to_string(path)
        .with_cli_context(|| format!("Failed to read configuration document {}", path.display()))?;
    ProjectConfig::from_json(&raw).map_err(|e| CliError::Core(e.into()))
}

fn parse_default<T>(raw: &str, key: &str) -> CliResult<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e: T::Err| CliError::ConfigError {
        message: format!("{key} = '{raw}': {e}"),
        source: Some(Box::new(e)),
    })
}

// ── Pre-flight ────────────────────────────────────────────────────────────────

fn preflight(templates: &FilesystemTemplateResolver, project: &ProjectConfig) -> CliResult<()> {
    let missing = TemplateCatalog::new(Box::new(templates.clone())).missing_templates(project);
    if missing.is_empty() {
        return Ok(());
    }
    Err(CliError::TemplatesMissing {
        stacks: missing.iter().map(StackChoice::to_string).collect(),
        searched: templates.search_path().to_vec(),
    })
}

// ── UI helpers ────────────────────────────────────────────────────────────────

fn show_plan(
    project: &ProjectConfig,
    parent: &Path,
    plan: &[PlannedStep],
    missing: &[StackChoice],
    out: &OutputManager,
) -> CliResult<()> {
    let root = parent.join(project.project_name().as_str());

    if out.format() == OutputFormat::Json {
        let steps: Vec<_> = plan
            .iter()
            .map(|p| json!({ "step": p.step.as_str(), "triggered": p.triggered }))
            .collect();
        let config = serde_json::to_value(project).map_err(|e| CliError::InvalidInput {
            message: format!("cannot serialise configuration: {e}"),
            source: Some(Box::new(e)),
        })?;
        out.json(&json!({
            "dryRun": true,
            "root": root.display().to_string(),
            "config": config,
            "steps": steps,
            "missingTemplates": missing.iter().map(StackChoice::to_string).collect::<Vec<_>>(),
        }))?;
        return Ok(());
    }

    out.info(&format!(
        "Dry run: would generate '{}' at {}",
        project.project_name(),
        root.display()
    ))?;
    out.print(&format!("  Backend:       {}", project.backend()))?;
    out.print(&format!("  Frontend:      {}", project.frontend()))?;
    out.print(&format!("  Sub-projects:  {}", project.subproject_names().join(", ")))?;
    if !project.databases().is_empty() {
        out.print(&format!("  Databases:     {}", join(project.databases())))?;
    }
    if !project.features().is_empty() {
        out.print(&format!("  Features:      {}", join(project.features())))?;
    }
    if !project.deploy().is_empty() {
        out.print(&format!("  Deploy:        {}", join(project.deploy())))?;
    }
    out.print("")?;
    out.header("Pipeline")?;
    for planned in plan {
        if planned.triggered {
            out.print(&format!("  \u{2713} {}", planned.step))?;
        } else {
            out.muted(&format!("  - {} (skipped)", planned.step))?;
        }
    }
    for stack in missing {
        out.warning(&format!("No template found for {stack}"))?;
    }
    Ok(())
}

fn show_report(report: &GenerationReport, out: &OutputManager) -> CliResult<()> {
    info!(run_id = %report.run_id, "Generation completed");

    if out.format() == OutputFormat::Json {
        out.json(&json!({
            "runId": report.run_id.to_string(),
            "root": report.root.display().to_string(),
            "subprojects": report.subprojects,
            "executed": report.executed.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            "skipped": report.skipped.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            "durationMs": report.duration().num_milliseconds(),
        }))?;
        return Ok(());
    }

    out.success(&format!("Project generated at {}", report.root.display()))?;
    out.print(&format!(
        "  {} steps in {} ms; sub-projects: {}",
        report.executed.len(),
        report.duration().num_milliseconds(),
        report.subprojects.join(", ")
    ))?;

    if !out.is_quiet() {
        out.print("")?;
        out.print("Next steps:")?;
        out.print(&format!("  cd {}", report.root.display()))?;
        out.print("  pnpm install")?;
        out.print("  pnpm dev")?;
    }

    Ok(())
}

fn join<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use stackgen_core::domain::{Communication, Database, Feature, Framework};
    use tempfile::TempDir;

    fn new_args(extra: &[&str]) -> NewArgs {
        let mut argv = vec!["stackgen", "new"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::New(args) => args,
            other => panic!("expected New command, got {other:?}"),
        }
    }

    // ── resolve_project_path ──────────────────────────────────────────────────

    #[test]
    fn simple_name_resolves_to_cwd() {
        let (name, dir) = resolve_project_path("my-app", None).unwrap();
        assert_eq!(name, "my-app");
        assert_eq!(dir, PathBuf::from("."));
    }

    #[test]
    fn relative_path_splits_leaf_and_parent() {
        let (name, dir) = resolve_project_path("../my-app", None).unwrap();
        assert_eq!(name, "my-app");
        assert_eq!(dir, PathBuf::from(".."));
    }

    #[test]
    fn output_is_the_base_for_leading_components() {
        let (name, dir) = resolve_project_path("nested/my-app", Some(Path::new("/srv"))).unwrap();
        assert_eq!(name, "my-app");
        assert_eq!(dir, PathBuf::from("/srv").join("nested"));

        let (_, dir) = resolve_project_path("my-app", Some(Path::new("/srv"))).unwrap();
        assert_eq!(dir, PathBuf::from("/srv"));
    }

    #[test]
    fn name_without_leaf_is_rejected() {
        assert!(matches!(
            resolve_project_path("..", None),
            Err(CliError::InvalidInput { .. })
        ));
    }

    // ── build_project_config ──────────────────────────────────────────────────

    #[test]
    fn no_flags_uses_configured_defaults() {
        let mut config = AppConfig::default();
        config.defaults.backend_framework = "koa".into();
        config.defaults.backend_port = 5000;

        let project = build_project_config(&new_args(&["demo"]), "demo", &config).unwrap();
        assert_eq!(project.backend().framework, Framework::Koa);
        assert_eq!(project.backend_port(), 5000);
        assert_eq!(project.frontend().framework, Framework::React);
    }

    #[test]
    fn flags_select_the_stack() {
        let args = new_args(&[
            "demo",
            "--backend",
            "nestjs",
            "--frontend",
            "vue",
            "--frontend-lang",
            "js",
            "--db",
            "mongo",
            "--feature",
            "auth-oauth",
            "--service",
            "billing:grpc",
        ]);
        let project = build_project_config(&args, "demo", &AppConfig::default()).unwrap();

        assert_eq!(project.backend().framework, Framework::NestJs);
        assert_eq!(project.frontend().language, Language::JavaScript);
        assert!(project.has_database(Database::Mongo));
        // Implications are closed by the builder.
        assert!(project.has_feature(Feature::Auth));
        assert!(project.has_feature(Feature::AuthPassport));
        assert_eq!(project.microservices()[0].communication, Communication::Grpc);
    }

    #[test]
    fn invalid_combination_is_a_user_error() {
        let args = new_args(&["demo", "--backend", "nestjs", "--backend-lang", "js"]);
        let err = build_project_config(&args, "demo", &AppConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn bad_default_is_a_configuration_error() {
        let mut config = AppConfig::default();
        config.defaults.frontend_framework = "svelte".into();
        let err = build_project_config(&new_args(&["demo"]), "demo", &config).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn document_values_are_overridden_by_flags() {
        let dir = TempDir::new().unwrap();
        let doc = ProjectConfig::builder("original")
            .database(Database::Postgres)
            .feature(Feature::Docker)
            .build()
            .unwrap();
        let path = dir.path().join("stackgen.json");
        std::fs::write(&path, doc.to_json().unwrap()).unwrap();

        let args = new_args(&[
            "renamed",
            "--from",
            path.to_str().unwrap(),
            "--backend",
            "koa",
        ]);
        let project = build_project_config(&args, "renamed", &AppConfig::default()).unwrap();

        assert_eq!(project.project_name().as_str(), "renamed");
        assert_eq!(project.docker_prefix(), "renamed");
        assert_eq!(project.backend().framework, Framework::Koa);
        assert!(project.has_database(Database::Postgres));
        assert!(project.has_feature(Feature::Docker));
    }

    #[test]
    fn unreadable_document_is_reported() {
        let args = new_args(&["demo", "--from", "/definitely/not/here.json"]);
        assert!(matches!(
            build_project_config(&args, "demo", &AppConfig::default()),
            Err(CliError::IoError { .. })
        ));
    }

    // ── preflight ─────────────────────────────────────────────────────────────

    #[test]
    fn preflight_names_every_missing_stack() {
        let empty = TempDir::new().unwrap();
        let templates = FilesystemTemplateResolver::new([empty.path().to_path_buf()]);
        let project = ProjectConfig::builder("demo").build().unwrap();

        match preflight(&templates, &project) {
            Err(CliError::TemplatesMissing { stacks, searched }) => {
                assert_eq!(stacks, vec!["express-typescript", "react-typescript"]);
                assert_eq!(searched, vec![empty.path().to_path_buf()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
