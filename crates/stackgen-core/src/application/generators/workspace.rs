//! Workspace-level files: root manifests first, the README last.

use serde_json::json;
use tracing::{debug, instrument};

use crate::application::composer::{GenerationContext, Generator, Step};
use crate::domain::{
    Communication, Feature, PackageManifest, ProjectConfig, Stage, framework_def,
};
use crate::error::StackgenResult;

// ── Workspace ────────────────────────────────────────────────────────────────

/// Root `package.json`, pnpm workspace membership and the turbo pipeline.
pub struct WorkspaceGenerator;

impl Generator for WorkspaceGenerator {
    fn step(&self) -> Step {
        Step::Workspace
    }

    #[instrument(skip_all, fields(root = %ctx.root.display()))]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        ctx.fs.create_dir_all(&ctx.root)?;
        ctx.fs.create_dir_all(&ctx.path("apps"))?;
        ctx.write(&ctx.path("packages/.gitkeep"), "")?;

        let mut manifest = PackageManifest::new(ctx.config.project_name().as_str());
        manifest
            .set_field("private", json!(true))
            .set_field("packageManager", json!("pnpm@8.15.0"))
            .set_script("dev", "turbo run dev")
            .set_script("build", "turbo run build")
            .set_script("test", "turbo run test")
            .set_script("lint", "turbo run lint")
            .add_dev_dependency("turbo", "^2.0.0");
        ctx.write(&ctx.path("package.json"), &manifest.to_string_pretty())?;

        ctx.write(&ctx.path("pnpm-workspace.yaml"), PNPM_WORKSPACE)?;
        ctx.write(&ctx.path("turbo.json"), &turbo_pipeline())?;
        ctx.write(&ctx.path(".gitignore"), GITIGNORE)?;
        Ok(())
    }
}

fn turbo_pipeline() -> String {
    let pipeline = json!({
        "$schema": "https://turbo.build/schema.json",
        "tasks": {
            "build": { "dependsOn": ["^build"], "outputs": ["dist/**"] },
            "dev": { "cache": false, "persistent": true },
            "lint": {},
            "test": { "dependsOn": ["^build"] }
        }
    });
    let mut out = serde_json::to_string_pretty(&pipeline).unwrap_or_default();
    out.push('\n');
    out
}

const PNPM_WORKSPACE: &str = "packages:
  - 'apps/*'
  - 'packages/*'
";

const GITIGNORE: &str = "node_modules/
dist/
build/
coverage/
.turbo/
*.log
.env
.env.local
";

// ── Shared packages ──────────────────────────────────────────────────────────

/// Placeholder step for code shared between sub-projects.
///
/// Registered so later generators can declare it as a prerequisite; it
/// writes nothing today.
pub struct SharedPackagesGenerator;

impl Generator for SharedPackagesGenerator {
    fn step(&self) -> Step {
        Step::SharedPackages
    }

    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        debug!(subproject = %ctx.backend.name, "no shared packages to generate");
        Ok(())
    }
}

// ── README ───────────────────────────────────────────────────────────────────

/// Root README describing exactly what was generated.
pub struct ReadmeGenerator;

impl Generator for ReadmeGenerator {
    fn step(&self) -> Step {
        Step::Readme
    }

    fn prerequisites(&self) -> &'static [Step] {
        &[Step::Workspace]
    }

    #[instrument(skip_all)]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        ctx.write(&ctx.path("README.md"), &readme(ctx.config))
    }
}

fn readme(config: &ProjectConfig) -> String {
    let backend = config.backend();
    let frontend = config.frontend();
    let mut out = format!("# {}\n\n", config.project_name());
    out.push_str("Monorepo managed with pnpm workspaces and Turborepo.\n\n");

    out.push_str("## Stack\n\n");
    out.push_str(&format!(
        "- Backend: {} ({}), port {}\n",
        framework_def(backend.framework).label,
        backend.language,
        config.backend_port()
    ));
    out.push_str(&format!(
        "- Frontend: {} ({}), port {}\n",
        framework_def(frontend.framework).label,
        frontend.language,
        config.frontend_port()
    ));
    if !config.databases().is_empty() {
        let names: Vec<&str> = config.databases().iter().map(|d| d.as_str()).collect();
        out.push_str(&format!("- Databases: {}\n", names.join(", ")));
    }
    if !config.features().is_empty() {
        let names: Vec<&str> = config.features().iter().map(|f| f.as_str()).collect();
        out.push_str(&format!("- Features: {}\n", names.join(", ")));
    }

    out.push_str("\n## Layout\n\n```\n");
    for name in config.subproject_names() {
        out.push_str(&format!("apps/{name}/\n"));
    }
    out.push_str("packages/\nenvironments/\n");
    if !config.microservices().is_empty() {
        out.push_str("infrastructure/\n");
    }
    if !config.deploy().is_empty() {
        out.push_str("deploy/\n");
    }
    out.push_str("```\n");

    if !config.microservices().is_empty() {
        out.push_str("\n## Services\n\n");
        for target in config.backend_targets().iter().skip(1) {
            let transport = match target.communication {
                Communication::Grpc => " over gRPC",
                Communication::MessageQueue => " over a message queue",
                Communication::None => "",
            };
            out.push_str(&format!(
                "- `{}` on port {}{}\n",
                target.name, target.port, transport
            ));
        }
    }

    out.push_str("\n## Getting started\n\n```bash\npnpm install\npnpm dev\n```\n");
    if config.has_feature(Feature::Docker) {
        out.push_str("\nOr run everything in containers:\n\n```bash\ndocker compose up --build\n```\n");
    }

    out.push_str("\n## Environments\n\n");
    for stage in Stage::ALL {
        out.push_str(&format!("- `environments/{}`\n", stage.file_name()));
    }

    if config.has_feature(Feature::Auth) {
        out.push_str("\n## Authentication\n\n");
        out.push_str("`POST /api/auth/register`, `POST /api/auth/login` and `GET /api/auth/me` issue and check JWTs.\n");
    }
    if config.has_feature(Feature::GraphQl) {
        out.push_str("\n## GraphQL\n\nThe schema lives in `apps/backend/src/schema.graphql` and is served at `/graphql`.\n");
    }
    out
}
