//! Database drivers and the connection module.

use std::path::PathBuf;

use tracing::instrument;

use crate::application::composer::{GenerationContext, Generator, Step};
use crate::application::generators::{
    add_dependencies, add_type_packages, annotation, backend_import,
};
use crate::domain::{Database, ExtensionPoint, ProjectConfig, Stage, StageDescriptor};
use crate::error::StackgenResult;

const POSTGRES_PACKAGES: &[(&str, &str)] = &[
    ("pg", "^8.11.3"),
    ("typeorm", "^0.3.20"),
    ("reflect-metadata", "^0.2.1"),
];
const POSTGRES_TYPES: &[(&str, &str)] = &[("@types/pg", "^8.11.0")];
const MONGO_PACKAGES: &[(&str, &str)] = &[("mongoose", "^8.2.0")];

/// Writes `src/database.<ext>` and calls it from the entry's startup.
pub struct DatabaseGenerator;

impl Generator for DatabaseGenerator {
    fn step(&self) -> Step {
        Step::Database
    }

    fn prerequisites(&self) -> &'static [Step] {
        &[Step::Backend]
    }

    fn is_triggered(&self, config: &ProjectConfig) -> bool {
        !config.databases().is_empty()
    }

    #[instrument(skip_all, fields(subproject = %ctx.backend.name))]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        let entry = ctx.backend_entry();
        ctx.require(self.step(), &entry)?;

        ctx.write(&ctx.backend_source("src/database"), &database_module(ctx))?;

        ctx.patch(
            self.step(),
            &entry,
            ExtensionPoint::Imports,
            &backend_import(ctx, "{ connectDatabases }", "./database"),
        )?;
        ctx.patch(
            self.step(),
            &entry,
            ExtensionPoint::Startup,
            "await connectDatabases();",
        )?;

        let language = ctx.config.backend().language;
        let postgres = ctx.config.has_database(Database::Postgres);
        let mongo = ctx.config.has_database(Database::Mongo);
        ctx.update_manifest(self.step(), &ctx.backend_dir(), |m| {
            if postgres {
                add_dependencies(m, POSTGRES_PACKAGES);
                add_type_packages(m, language, POSTGRES_TYPES);
            }
            if mongo {
                add_dependencies(m, MONGO_PACKAGES);
            }
        })
    }

    fn subproject(&self, ctx: &GenerationContext<'_>) -> PathBuf {
        ctx.backend_dir()
    }
}

fn database_module(ctx: &GenerationContext<'_>) -> String {
    let language = ctx.config.backend().language;
    let dev = StageDescriptor::for_stage(Stage::Development, ctx.config);
    let postgres = ctx.config.has_database(Database::Postgres);
    let mongo = ctx.config.has_database(Database::Mongo);

    let mut out = String::new();
    if postgres {
        out.push_str("import 'reflect-metadata';\n");
        out.push_str("import { DataSource } from 'typeorm';\n");
    }
    if mongo {
        out.push_str("import mongoose from 'mongoose';\n");
    }
    out.push_str(&backend_import(ctx, "{ logger }", "./logger"));
    out.push_str("\n\n");

    if postgres {
        out.push_str(&format!(
            "export let dataSource{} = null;\n\n",
            annotation(language, ": DataSource | null")
        ));
        out.push_str(&format!(
            "export function createDataSource() {{
  return new DataSource({{
    type: 'postgres',
    host: process.env.DB_HOST || '{host}',
    port: Number(process.env.DB_PORT) || {port},
    username: process.env.DB_USER || '{user}',
    password: process.env.DB_PASSWORD || '{password}',
    database: process.env.DB_NAME || '{name}',
    entities: [],
    synchronize: process.env.NODE_ENV !== 'production',
  }});
}}

",
            host = dev.get("DB_HOST").unwrap_or("localhost"),
            port = Database::Postgres.default_port(),
            user = dev.get("DB_USER").unwrap_or_default(),
            password = dev.get("DB_PASSWORD").unwrap_or_default(),
            name = dev.get("DB_NAME").unwrap_or_default(),
        ));
    }

    out.push_str("export async function connectDatabases() {\n");
    if postgres {
        out.push_str("  dataSource = createDataSource();\n");
        out.push_str("  await dataSource.initialize();\n");
        out.push_str("  logger.info('Connected to postgres');\n");
    }
    if mongo {
        out.push_str(&format!(
            "  await mongoose.connect(process.env.MONGO_URI || '{}');\n",
            dev.get("MONGO_URI").unwrap_or_default()
        ));
        out.push_str("  logger.info('Connected to mongodb');\n");
    }
    out.push_str("}\n");
    out
}
