//! Cross-cutting passes over the assembled tree.
//!
//! Every pass here overwrites whole files and sets manifest keys, or
//! patches through [`patch_once`], so running it again over a finished tree
//! leaves the tree unchanged.

use tracing::{debug, instrument};

use crate::application::composer::{GenerationContext, Generator, Step};
use crate::application::generators::{
    add_dependencies, add_dev_dependencies, add_type_packages, backend_import, each_backend,
    patch_once,
};
use crate::domain::{Dialect, ExtensionPoint, Feature, Language, ProjectConfig, framework_def};
use crate::error::StackgenResult;

// ── Code quality ─────────────────────────────────────────────────────────────

const LINT_PACKAGES: &[(&str, &str)] = &[
    ("eslint", "^8.57.0"),
    ("prettier", "^3.2.5"),
    ("eslint-config-prettier", "^9.1.0"),
];
const TS_LINT_PACKAGES: &[(&str, &str)] = &[
    ("@typescript-eslint/parser", "^7.1.0"),
    ("@typescript-eslint/eslint-plugin", "^7.1.0"),
];

/// Shared lint and format configuration at the workspace root.
pub struct CodeQualityGenerator;

impl Generator for CodeQualityGenerator {
    fn step(&self) -> Step {
        Step::CodeQuality
    }

    fn prerequisites(&self) -> &'static [Step] {
        &[Step::Backend, Step::Frontend]
    }

    #[instrument(skip_all)]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        let typed = uses_typescript(ctx.config);
        ctx.write(&ctx.path(".eslintrc.json"), &eslint_config(typed))?;
        ctx.write(&ctx.path(".prettierrc"), PRETTIER_CONFIG)?;
        ctx.write(&ctx.path(".editorconfig"), EDITOR_CONFIG)?;

        ctx.update_manifest(self.step(), &ctx.root, |m| {
            add_dev_dependencies(m, LINT_PACKAGES);
            if typed {
                add_dev_dependencies(m, TS_LINT_PACKAGES);
            }
            m.set_script("format", "prettier --write .");
        })?;

        for target in ctx.config.backend_targets() {
            let extensions = lint_extensions(target.config.backend().language, false);
            ctx.update_manifest(self.step(), &ctx.subproject_dir(&target.name), |m| {
                m.set_script("lint", &format!("eslint src --ext {extensions}"));
            })?;
        }
        let extensions = lint_extensions(ctx.config.frontend().language, true);
        ctx.update_manifest(self.step(), &ctx.frontend_dir(), |m| {
            m.set_script("lint", &format!("eslint src --ext {extensions}"));
        })
    }
}

fn uses_typescript(config: &ProjectConfig) -> bool {
    config.frontend().language.is_statically_typed()
        || config
            .backend_targets()
            .iter()
            .any(|t| t.config.backend().language.is_statically_typed())
}

fn lint_extensions(language: Language, components: bool) -> String {
    let mut exts = vec![language.file_extension()];
    if components {
        exts.push(language.component_extension());
    }
    if language == Language::TypeScript {
        exts.push(Language::JavaScript.file_extension());
    }
    exts.iter()
        .map(|e| format!(".{e}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn eslint_config(typed: bool) -> String {
    let mut config = serde_json::json!({
        "root": true,
        "env": { "node": true, "browser": true, "es2022": true },
        "extends": ["eslint:recommended", "prettier"],
        "parserOptions": { "ecmaVersion": "latest", "sourceType": "module" },
        "ignorePatterns": ["dist", "build", "node_modules"]
    });
    if typed {
        config["parser"] = "@typescript-eslint/parser".into();
        config["plugins"] = serde_json::json!(["@typescript-eslint"]);
        config["extends"] = serde_json::json!([
            "eslint:recommended",
            "plugin:@typescript-eslint/recommended",
            "prettier"
        ]);
    }
    let mut out = serde_json::to_string_pretty(&config).unwrap_or_default();
    out.push('\n');
    out
}

const PRETTIER_CONFIG: &str = "{
  \"semi\": true,
  \"singleQuote\": true,
  \"trailingComma\": \"all\",
  \"printWidth\": 100
}
";

const EDITOR_CONFIG: &str = "root = true

[*]
charset = utf-8
end_of_line = lf
indent_style = space
indent_size = 2
insert_final_newline = true
trim_trailing_whitespace = true

[*.md]
trim_trailing_whitespace = false
";

// ── Observability ────────────────────────────────────────────────────────────

const PINO: &[(&str, &str)] = &[("pino", "^8.19.0")];
const PINO_DEV: &[(&str, &str)] = &[("pino-pretty", "^10.3.1")];
const SENTRY: &[(&str, &str)] = &[("@sentry/node", "^7.100.0")];

/// Structured logging in every backend, error tracking where selected.
pub struct ObservabilityGenerator;

impl Generator for ObservabilityGenerator {
    fn step(&self) -> Step {
        Step::Observability
    }

    fn prerequisites(&self) -> &'static [Step] {
        &[Step::Backend]
    }

    #[instrument(skip_all)]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        each_backend(ctx, |backend| {
            backend.write(
                &backend.backend_source("src/logger"),
                &pino_logger(&backend.backend.name),
            )?;

            let tracked = backend.config.has_feature(Feature::ErrorTracking);
            if tracked {
                self.wire_sentry(backend)?;
            }

            backend.update_manifest(self.step(), &backend.backend_dir(), |m| {
                add_dependencies(m, PINO);
                add_dev_dependencies(m, PINO_DEV);
                if tracked {
                    add_dependencies(m, SENTRY);
                }
            })
        })
    }
}

impl ObservabilityGenerator {
    fn wire_sentry(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        let entry = ctx.backend_entry();
        let logger = backend_import(ctx, "{ logger }", "./logger");
        ctx.write(
            &ctx.backend_source("src/sentry"),
            &format!(
                "import * as Sentry from '@sentry/node';
{logger}

export function initSentry() {{
  if (!process.env.SENTRY_DSN) {{
    logger.debug('SENTRY_DSN is not set, error tracking disabled');
    return;
  }}
  Sentry.init({{
    dsn: process.env.SENTRY_DSN,
    environment: process.env.NODE_ENV || 'development',
    serverName: '{name}',
    tracesSampleRate: 0.1,
  }});
}}
",
                name = ctx.backend.name
            ),
        )?;
        patch_once(
            ctx,
            self.step(),
            &entry,
            ExtensionPoint::Imports,
            &backend_import(ctx, "{ initSentry }", "./sentry"),
        )?;
        patch_once(ctx, self.step(), &entry, ExtensionPoint::Startup, "initSentry();")
    }
}

fn pino_logger(service: &str) -> String {
    format!(
        "import pino from 'pino';

export const logger = pino({{
  name: '{service}',
  level: process.env.LOG_LEVEL || 'info',
  transport: process.env.NODE_ENV === 'development' ? {{ target: 'pino-pretty' }} : undefined,
}});
"
    )
}

// ── Frontend optimization ────────────────────────────────────────────────────

/// One Vite plugin: import line, call expression and dev dependencies.
struct VitePlugin {
    feature: Feature,
    import: &'static str,
    call: &'static str,
    packages: &'static [(&'static str, &'static str)],
}

const VITE_PLUGINS: &[VitePlugin] = &[
    VitePlugin {
        feature: Feature::Compression,
        import: "import viteCompression from 'vite-plugin-compression';",
        call: "viteCompression({ algorithm: 'brotliCompress' })",
        packages: &[("vite-plugin-compression", "^0.5.1")],
    },
    VitePlugin {
        feature: Feature::ImageOptimization,
        import: "import { ViteImageOptimizer } from 'vite-plugin-image-optimizer';",
        call: "ViteImageOptimizer()",
        packages: &[("vite-plugin-image-optimizer", "^1.1.7"), ("sharp", "^0.33.2")],
    },
    VitePlugin {
        feature: Feature::BundleAnalyze,
        import: "import { visualizer } from 'rollup-plugin-visualizer';",
        call: "visualizer({ filename: 'dist/stats.html', gzipSize: true })",
        packages: &[("rollup-plugin-visualizer", "^5.12.0")],
    },
    VitePlugin {
        feature: Feature::Pwa,
        import: "import { VitePWA } from 'vite-plugin-pwa';",
        call: "VitePWA({ registerType: 'autoUpdate' })",
        packages: &[("vite-plugin-pwa", "^0.19.0")],
    },
];

/// Replaces the frontend's empty Vite plugin list with the selected plugins.
pub struct FrontendOptimizationGenerator;

impl Generator for FrontendOptimizationGenerator {
    fn step(&self) -> Step {
        Step::FrontendOptimization
    }

    fn prerequisites(&self) -> &'static [Step] {
        &[Step::Frontend]
    }

    fn is_triggered(&self, config: &ProjectConfig) -> bool {
        config
            .features()
            .iter()
            .any(|f| f.is_frontend_optimization())
    }

    #[instrument(skip_all)]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        let selected: Vec<&VitePlugin> = VITE_PLUGINS
            .iter()
            .filter(|p| ctx.config.has_feature(p.feature))
            .collect();
        debug!(plugins = selected.len(), "selected vite plugins");

        ctx.write(
            &ctx.frontend_source("build/optimization"),
            &optimization_module(&selected),
        )?;
        ctx.update_manifest(self.step(), &ctx.frontend_dir(), |m| {
            for plugin in &selected {
                add_dev_dependencies(m, plugin.packages);
            }
        })
    }

    fn subproject(&self, ctx: &GenerationContext<'_>) -> std::path::PathBuf {
        ctx.frontend_dir()
    }
}

fn optimization_module(plugins: &[&VitePlugin]) -> String {
    let mut out = String::new();
    for plugin in plugins {
        out.push_str(plugin.import);
        out.push('\n');
    }
    out.push_str("\nexport const optimizationPlugins = [\n");
    for plugin in plugins {
        out.push_str(&format!("  {},\n", plugin.call));
    }
    out.push_str("];\n");
    out
}

// ── Security ─────────────────────────────────────────────────────────────────

const EXPRESS_SECURITY: &[(&str, &str)] = &[
    ("helmet", "^7.1.0"),
    ("cors", "^2.8.5"),
    ("express-rate-limit", "^7.1.5"),
];
const EXPRESS_SECURITY_TYPES: &[(&str, &str)] = &[("@types/cors", "^2.8.17")];
const KOA_SECURITY: &[(&str, &str)] = &[("koa-helmet", "^7.0.2"), ("@koa/cors", "^5.0.0")];
const KOA_SECURITY_TYPES: &[(&str, &str)] = &[("@types/koa__cors", "^5.0.0")];

/// Hardened `src/security` for every backend and a root `SECURITY.md`.
pub struct SecurityGenerator;

impl Generator for SecurityGenerator {
    fn step(&self) -> Step {
        Step::Security
    }

    fn prerequisites(&self) -> &'static [Step] {
        &[Step::Backend]
    }

    #[instrument(skip_all)]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        let frontend_url = format!("http://localhost:{}", ctx.config.frontend_port());
        each_backend(ctx, |backend| {
            let stack = backend.config.backend();
            let dialect = framework_def(stack.framework).dialect;
            backend.write(
                &backend.backend_source("src/security"),
                &security_module(dialect, &frontend_url),
            )?;
            backend.update_manifest(self.step(), &backend.backend_dir(), |m| match dialect {
                Dialect::Koa => {
                    add_dependencies(m, KOA_SECURITY);
                    add_type_packages(m, stack.language, KOA_SECURITY_TYPES);
                }
                _ => {
                    add_dependencies(m, EXPRESS_SECURITY);
                    add_type_packages(m, stack.language, EXPRESS_SECURITY_TYPES);
                }
            })
        })?;
        ctx.write(&ctx.path("SECURITY.md"), &security_policy(ctx.config))
    }
}

fn security_module(dialect: Dialect, frontend_url: &str) -> String {
    match dialect {
        Dialect::Koa => format!(
            "import helmet from 'koa-helmet';
import cors from '@koa/cors';

export function applySecurity(app) {{
  app.use(helmet());
  app.use(cors({{ origin: process.env.FRONTEND_URL || '{frontend_url}', credentials: true }}));
}}
"
        ),
        _ => format!(
            "import helmet from 'helmet';
import cors from 'cors';
import rateLimit from 'express-rate-limit';

export function applySecurity(app) {{
  app.use(helmet());
  app.use(cors({{ origin: process.env.FRONTEND_URL || '{frontend_url}', credentials: true }}));
  app.use(
    rateLimit({{
      windowMs: 15 * 60 * 1000,
      max: 100,
      standardHeaders: true,
      legacyHeaders: false,
    }}),
  );
}}
"
        ),
    }
}

fn security_policy(config: &ProjectConfig) -> String {
    let mut out = format!("# Security policy for {}\n\n", config.project_name());
    out.push_str("## Defaults\n\n");
    out.push_str("- HTTP security headers are set on every backend.\n");
    out.push_str("- CORS only admits the frontend origin from `FRONTEND_URL`.\n");
    out.push_str("- Express based backends rate limit to 100 requests per 15 minutes per client.\n");
    if config
        .backend_targets()
        .iter()
        .any(|t| t.config.has_feature(Feature::Auth))
    {
        out.push_str("- Passwords are hashed with bcrypt; set a strong `JWT_SECRET` per stage.\n");
    }
    out.push_str("\n## Reporting a vulnerability\n\n");
    out.push_str("Please report vulnerabilities privately to the maintainers instead of opening a public issue.\n");
    out
}
