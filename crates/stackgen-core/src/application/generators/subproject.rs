//! Template copy and render for the backend and frontend sub-projects.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::application::composer::{GenerationContext, Generator, Step};
use crate::application::generators::{add_dependencies, add_dev_dependencies};
use crate::domain::{CssSolution, RenderContext, StackChoice, TemplateCategory};
use crate::error::StackgenResult;

/// Copy the template for `stack` into `dest`, then render it in place.
///
/// Every file is copied byte for byte first, so binary assets pass through
/// untouched. Files carrying the template marker are then read back as
/// text, rendered to their final name and the marked original is removed,
/// so the destination ends up with runnable file names only.
/// Returns the number of rendered files.
pub fn install_template(
    ctx: &GenerationContext<'_>,
    category: TemplateCategory,
    stack: StackChoice,
    dest: &Path,
    render_ctx: &RenderContext,
) -> StackgenResult<usize> {
    let template = ctx
        .templates
        .resolve(category, stack.language, stack.framework)?;
    info!(
        template = %template.name,
        dest = %ctx.display_path(dest),
        "installing template"
    );

    let files = ctx.templates.walk(&template)?;
    ctx.fs.create_dir_all(dest)?;
    for file in &files {
        ctx.write_bytes(&dest.join(&file.relative_path), &file.content)?;
    }

    let mut rendered = 0;
    for path in ctx.fs.list_files(dest)? {
        if !ctx.renderer.is_template(&path) {
            continue;
        }
        let text = ctx.fs.read_file(&path)?;
        let output = ctx.renderer.render(&text, render_ctx).inspect_err(|e| {
            warn!(file = %ctx.display_path(&path), error = %e, "rendering failed");
        })?;
        ctx.fs.write_file(&ctx.renderer.output_path(&path), &output)?;
        ctx.fs.remove_file(&path)?;
        rendered += 1;
    }

    debug!(files = files.len(), rendered, "template installed");
    Ok(rendered)
}

/// Copies the backend template into `apps/<backend>`.
///
/// Inside the service pipeline `ctx.backend` is the microservice, so the
/// same generator produces every backend sub-project.
pub struct BackendGenerator;

impl Generator for BackendGenerator {
    fn step(&self) -> Step {
        Step::Backend
    }

    #[instrument(skip_all, fields(subproject = %ctx.backend.name))]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        let dir = ctx.backend_dir();
        let render_ctx = RenderContext::for_subproject(
            ctx.config,
            TemplateCategory::Backend,
            &ctx.backend.name,
            ctx.backend.port,
        );
        install_template(
            ctx,
            TemplateCategory::Backend,
            ctx.config.backend(),
            &dir,
            &render_ctx,
        )?;

        let package = format!("@{}/{}", ctx.config.project_name(), ctx.backend.name);
        ctx.update_manifest(self.step(), &dir, |m| {
            m.set_name(package);
        })
    }

    fn subproject(&self, ctx: &GenerationContext<'_>) -> PathBuf {
        ctx.backend_dir()
    }
}

/// Copies the frontend template into `apps/frontend` and adds the state
/// management and styling packages.
pub struct FrontendGenerator;

impl Generator for FrontendGenerator {
    fn step(&self) -> Step {
        Step::Frontend
    }

    #[instrument(skip_all)]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        let dir = ctx.frontend_dir();
        let render_ctx = RenderContext::for_subproject(
            ctx.config,
            TemplateCategory::Frontend,
            "frontend",
            ctx.config.frontend_port(),
        );
        install_template(
            ctx,
            TemplateCategory::Frontend,
            ctx.config.frontend(),
            &dir,
            &render_ctx,
        )?;

        let state = ctx.config.state_management();
        let css = ctx.config.css_solution();
        let package = format!("@{}/frontend", ctx.config.project_name());
        ctx.update_manifest(self.step(), &dir, |m| {
            m.set_name(package);
            add_dependencies(m, state.packages());
            add_dev_dependencies(m, css.dev_packages());
        })?;

        if css == CssSolution::Tailwind {
            ctx.write(&dir.join("tailwind.config.js"), TAILWIND_CONFIG)?;
            ctx.write(&dir.join("postcss.config.js"), POSTCSS_CONFIG)?;
        }
        Ok(())
    }

    fn subproject(&self, ctx: &GenerationContext<'_>) -> PathBuf {
        ctx.frontend_dir()
    }
}

const TAILWIND_CONFIG: &str = "/** @type {import('tailwindcss').Config} */
export default {
  content: ['./index.html', './src/**/*.{js,jsx,ts,tsx,vue}'],
  theme: {
    extend: {},
  },
  plugins: [],
};
";

const POSTCSS_CONFIG: &str = "export default {
  plugins: {
    tailwindcss: {},
    autoprefixer: {},
  },
};
";
