//! Per-stage dotenv files and the backend's config loader.

use std::path::PathBuf;

use tracing::{debug, instrument};

use crate::application::composer::{GenerationContext, Generator, Step};
use crate::application::generators::add_dependencies;
use crate::domain::{ModuleStyle, StageDescriptor, framework_def};
use crate::error::StackgenResult;

const DOTENV: &[(&str, &str)] = &[("dotenv", "^16.4.5")];

/// Writes `environments/.env.<stage>` for every stage and points the
/// backend's `src/config` at them.
pub struct EnvironmentsGenerator;

impl Generator for EnvironmentsGenerator {
    fn step(&self) -> Step {
        Step::Environments
    }

    fn prerequisites(&self) -> &'static [Step] {
        &[Step::Backend]
    }

    #[instrument(skip_all)]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        for descriptor in StageDescriptor::all(ctx.config) {
            let path = ctx.path("environments").join(descriptor.stage().file_name());
            ctx.write(&path, &descriptor.render())?;
            debug!(stage = %descriptor.stage(), keys = descriptor.vars().len(), "wrote stage");
        }

        ctx.write(
            &ctx.backend_source("src/config"),
            &config_loader(ctx, "PORT", ctx.backend.port),
        )?;
        ctx.update_manifest(self.step(), &ctx.backend_dir(), |m| {
            add_dependencies(m, DOTENV);
        })
    }

    fn subproject(&self, ctx: &GenerationContext<'_>) -> PathBuf {
        ctx.backend_dir()
    }
}

/// `src/config` module loading `environments/.env.<NODE_ENV>`.
///
/// `port_key` names the variable holding this sub-project's port, so a
/// service can read its own port from the shared stage file.
pub(crate) fn config_loader(ctx: &GenerationContext<'_>, port_key: &str, port: u16) -> String {
    let (dotenv_import, path_import) = match framework_def(ctx.config.backend().framework).module_style
    {
        ModuleStyle::Esm => ("import dotenv from 'dotenv';", "import path from 'node:path';"),
        ModuleStyle::CommonJs => ("import * as dotenv from 'dotenv';", "import * as path from 'path';"),
    };
    format!(
        "{dotenv_import}
{path_import}

const stage = process.env.NODE_ENV || 'development';

dotenv.config({{ path: path.resolve(process.cwd(), '../../environments', `.env.${{stage}}`) }});

export const appConfig = {{
  name: '{name}',
  stage,
  port: Number(process.env.{port_key}) || {port},
  logLevel: process.env.LOG_LEVEL || 'info',
  apiBaseUrl: process.env.API_BASE_URL || '',
  frontendUrl: process.env.FRONTEND_URL || 'http://localhost:{frontend_port}',
}};
",
        name = ctx.backend.name,
        frontend_port = ctx.config.frontend_port(),
    )
}
