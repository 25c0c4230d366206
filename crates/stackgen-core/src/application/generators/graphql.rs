//! GraphQL endpoint: schema, server module and its mount.

use std::path::PathBuf;

use tracing::instrument;

use crate::application::composer::{GenerationContext, Generator, Step};
use crate::application::generators::{add_dependencies, backend_import};
use crate::domain::{Dialect, ExtensionPoint, Feature, ProjectConfig, framework_def};
use crate::error::StackgenResult;

/// Served path of the GraphQL endpoint.
pub const GRAPHQL_ENDPOINT: &str = "/graphql";

const APOLLO_PACKAGES: &[(&str, &str)] = &[("@apollo/server", "^4.10.0"), ("graphql", "^16.8.1")];
const KOA_PACKAGES: &[(&str, &str)] = &[("@as-integrations/koa", "^1.1.1")];
const NEST_PACKAGES: &[(&str, &str)] =
    &[("@nestjs/graphql", "^12.1.1"), ("@nestjs/apollo", "^12.1.0")];

pub struct GraphqlGenerator;

impl Generator for GraphqlGenerator {
    fn step(&self) -> Step {
        Step::Graphql
    }

    fn prerequisites(&self) -> &'static [Step] {
        &[Step::Backend]
    }

    fn is_triggered(&self, config: &ProjectConfig) -> bool {
        config.has_feature(Feature::GraphQl)
    }

    #[instrument(skip_all, fields(subproject = %ctx.backend.name))]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        let entry = ctx.backend_entry();
        ctx.require(self.step(), &entry)?;

        let dir = ctx.backend_dir();
        ctx.write(&dir.join("src/schema.graphql"), &schema(&ctx.backend.name))?;

        let dialect = framework_def(ctx.config.backend().framework).dialect;
        match dialect {
            Dialect::Nest => self.wire_nest(ctx)?,
            _ => self.wire_middleware(ctx, dialect, &entry)?,
        }

        ctx.update_manifest(self.step(), &dir, |m| {
            add_dependencies(m, APOLLO_PACKAGES);
            match dialect {
                Dialect::Koa => add_dependencies(m, KOA_PACKAGES),
                Dialect::Nest => add_dependencies(m, NEST_PACKAGES),
                _ => {}
            }
        })
    }

    fn subproject(&self, ctx: &GenerationContext<'_>) -> PathBuf {
        ctx.backend_dir()
    }
}

impl GraphqlGenerator {
    /// Express and Koa: an Apollo server mounted from the entry's startup.
    fn wire_middleware(
        &self,
        ctx: &GenerationContext<'_>,
        dialect: Dialect,
        entry: &std::path::Path,
    ) -> StackgenResult<()> {
        ctx.write(
            &ctx.backend_source("src/graphql"),
            &server_module(&ctx.backend.name, dialect),
        )?;
        ctx.patch(
            self.step(),
            entry,
            ExtensionPoint::Imports,
            &backend_import(ctx, "{ mountGraphQL }", "./graphql"),
        )?;
        ctx.patch(
            self.step(),
            entry,
            ExtensionPoint::Startup,
            &format!("await mountGraphQL(app, '{GRAPHQL_ENDPOINT}');"),
        )
    }

    /// NestJS: a resolver plus `GraphQLModule` registered in the root module.
    fn wire_nest(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        let module = ctx
            .backend_module()
            .unwrap_or_else(|| ctx.backend_source("src/app.module"));
        ctx.require(self.step(), &module)?;

        ctx.write(
            &ctx.backend_source("src/app.resolver"),
            &nest_resolver(&ctx.backend.name),
        )?;

        let imports = [
            "import { GraphQLModule } from '@nestjs/graphql';".to_string(),
            "import { ApolloDriver, ApolloDriverConfig } from '@nestjs/apollo';".to_string(),
            backend_import(ctx, "{ AppResolver }", "./app.resolver"),
        ]
        .join("\n");
        ctx.patch(self.step(), &module, ExtensionPoint::Imports, &imports)?;
        ctx.patch(
            self.step(),
            &module,
            ExtensionPoint::ModuleImports,
            &format!(
                "GraphQLModule.forRoot<ApolloDriverConfig>({{
  driver: ApolloDriver,
  typePaths: ['./src/schema.graphql'],
  path: '{GRAPHQL_ENDPOINT}',
}}),"
            ),
        )?;
        ctx.patch(
            self.step(),
            &module,
            ExtensionPoint::ModuleProviders,
            "AppResolver,",
        )
    }
}

fn schema(service: &str) -> String {
    format!(
        "# Schema for the {service} service.\n\ntype Query {{\n  health: String!\n  service: String!\n}}\n"
    )
}

fn server_module(service: &str, dialect: Dialect) -> String {
    let (framework_imports, mount) = match dialect {
        Dialect::Koa => (
            "import { koaMiddleware } from '@as-integrations/koa';\nimport Router from '@koa/router';",
            "  const router = new Router();
  router.all(endpoint, koaMiddleware(server));
  app.use(router.routes());
  app.use(router.allowedMethods());",
        ),
        _ => (
            "import express from 'express';\nimport { expressMiddleware } from '@apollo/server/express4';",
            "  app.use(endpoint, express.json(), expressMiddleware(server));",
        ),
    };

    format!(
        "import {{ readFileSync }} from 'node:fs';
import path from 'node:path';
import {{ ApolloServer }} from '@apollo/server';
{framework_imports}

const typeDefs = readFileSync(path.resolve(process.cwd(), 'src/schema.graphql'), 'utf8');

const resolvers = {{
  Query: {{
    health: () => 'ok',
    service: () => '{service}',
  }},
}};

export async function mountGraphQL(app, endpoint = '{GRAPHQL_ENDPOINT}') {{
  const server = new ApolloServer({{ typeDefs, resolvers }});
  await server.start();
{mount}
}}
"
    )
}

fn nest_resolver(service: &str) -> String {
    format!(
        "import {{ Query, Resolver }} from '@nestjs/graphql';

@Resolver()
export class AppResolver {{
  @Query()
  health(): string {{
    return 'ok';
  }}

  @Query()
  service(): string {{
    return '{service}';
  }}
}}
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn koa_module_mounts_through_a_router() {
        let text = server_module("backend", Dialect::Koa);
        assert!(text.contains("koaMiddleware(server)"));
        assert!(!text.contains("expressMiddleware"));
    }

    #[test]
    fn express_module_defaults_to_graphql_endpoint() {
        let text = server_module("billing", Dialect::Express);
        assert!(text.contains("endpoint = '/graphql'"));
        assert!(text.contains("service: () => 'billing'"));
    }

    #[test]
    fn schema_declares_query_type() {
        assert!(schema("backend").contains("type Query {"));
    }
}
