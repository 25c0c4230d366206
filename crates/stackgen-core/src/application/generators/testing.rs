//! Test scaffolds: jest + supertest for backends, vitest for the frontend.

use std::path::PathBuf;

use tracing::instrument;

use crate::application::composer::{GenerationContext, Generator, Scope, Step};
use crate::application::generators::{add_dev_dependencies, add_type_packages};
use crate::domain::{Dialect, Feature, Language, ModuleStyle, ProjectConfig, framework_def};
use crate::error::StackgenResult;

const JEST: &[(&str, &str)] = &[("jest", "^29.7.0"), ("supertest", "^6.3.4")];
const JEST_TS: &[(&str, &str)] = &[
    ("ts-jest", "^29.1.2"),
    ("@types/jest", "^29.5.12"),
    ("@types/supertest", "^6.0.2"),
];
const JEST_JS: &[(&str, &str)] = &[("@jest/globals", "^29.7.0")];
const NEST_TESTING: &[(&str, &str)] = &[("@nestjs/testing", "^10.3.0")];
const VITEST: &[(&str, &str)] = &[("vitest", "^1.3.1")];

pub struct TestingGenerator {
    scope: Scope,
}

impl TestingGenerator {
    pub fn new(scope: Scope) -> Self {
        Self { scope }
    }
}

impl Generator for TestingGenerator {
    fn step(&self) -> Step {
        Step::Testing
    }

    fn prerequisites(&self) -> &'static [Step] {
        match self.scope {
            Scope::Workspace => &[Step::Backend, Step::Frontend],
            Scope::Service => &[Step::Backend],
        }
    }

    fn is_triggered(&self, config: &ProjectConfig) -> bool {
        config.has_feature(Feature::Testing)
    }

    #[instrument(skip_all, fields(scope = ?self.scope, subproject = %ctx.backend.name))]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        self.backend_scaffold(ctx)?;
        if self.scope == Scope::Workspace {
            self.frontend_scaffold(ctx)?;
        }
        Ok(())
    }

    fn subproject(&self, ctx: &GenerationContext<'_>) -> PathBuf {
        ctx.backend_dir()
    }
}

impl TestingGenerator {
    fn backend_scaffold(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        let stack = ctx.config.backend();
        let def = framework_def(stack.framework);
        let dir = ctx.backend_dir();
        let ext = stack.language.file_extension();

        ctx.write(
            &dir.join("jest.config.js"),
            &jest_config(stack.language, def.module_style),
        )?;
        ctx.write(
            &dir.join(format!("tests/health.test.{ext}")),
            &health_test(def.dialect, stack.language, &ctx.backend.name),
        )?;

        let script = match def.module_style {
            ModuleStyle::Esm => "node --experimental-vm-modules node_modules/jest/bin/jest.js",
            ModuleStyle::CommonJs => "jest",
        };
        let nest = def.dialect == Dialect::Nest;
        ctx.update_manifest(self.step(), &dir, |m| {
            m.set_script("test", script);
            add_dev_dependencies(m, JEST);
            add_type_packages(m, stack.language, JEST_TS);
            if !stack.language.is_statically_typed() {
                add_dev_dependencies(m, JEST_JS);
            }
            if nest {
                add_dev_dependencies(m, NEST_TESTING);
            }
        })
    }

    fn frontend_scaffold(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        let language = ctx.config.frontend().language;
        ctx.write(
            &ctx.frontend_dir()
                .join(format!("src/api.test.{}", language.file_extension())),
            FRONTEND_TEST,
        )?;
        ctx.update_manifest(self.step(), &ctx.frontend_dir(), |m| {
            m.set_script("test", "vitest run");
            add_dev_dependencies(m, VITEST);
        })
    }
}

fn jest_config(language: Language, style: ModuleStyle) -> String {
    match (style, language) {
        (ModuleStyle::CommonJs, _) => "module.exports = {
  preset: 'ts-jest',
  testEnvironment: 'node',
  testMatch: ['**/tests/**/*.test.ts'],
};
"
        .to_string(),
        (ModuleStyle::Esm, Language::TypeScript) => "export default {
  preset: 'ts-jest/presets/default-esm',
  testEnvironment: 'node',
  extensionsToTreatAsEsm: ['.ts'],
  testMatch: ['**/tests/**/*.test.ts'],
  moduleNameMapper: {
    '^(\\\\.{1,2}/.*)\\\\.js$': '$1',
  },
  transform: {
    '^.+\\\\.ts$': ['ts-jest', { useESM: true, tsconfig: { rootDir: '.' } }],
  },
};
"
        .to_string(),
        (ModuleStyle::Esm, Language::JavaScript) => "export default {
  testEnvironment: 'node',
  testMatch: ['**/tests/**/*.test.js'],
  transform: {},
};
"
        .to_string(),
    }
}

fn health_test(dialect: Dialect, language: Language, service: &str) -> String {
    let check = format!(
        "    expect(res.status).toBe(200);
    expect(res.body.status).toBe('ok');
    expect(res.body.service).toBe('{service}');"
    );
    match dialect {
        Dialect::Nest => format!(
            "import {{ Test }} from '@nestjs/testing';
import {{ INestApplication }} from '@nestjs/common';
import request from 'supertest';
import {{ AppModule }} from '../src/app.module';

describe('GET /health', () => {{
  let app: INestApplication;

  beforeAll(async () => {{
    const moduleRef = await Test.createTestingModule({{ imports: [AppModule] }}).compile();
    app = moduleRef.createNestApplication();
    await app.init();
  }});

  afterAll(async () => {{
    await app.close();
  }});

  it('reports the service as healthy', async () => {{
    const res = await request(app.getHttpServer()).get('/health');
{check}
  }});
}});
"
        ),
        _ => {
            let server = if dialect == Dialect::Koa {
                "app.callback()"
            } else {
                "app"
            };
            let jest_import = if language.is_statically_typed() {
                ""
            } else {
                "import { describe, expect, it } from '@jest/globals';\n"
            };
            format!(
                "{jest_import}import request from 'supertest';
import app from '../src/app.js';

describe('GET /health', () => {{
  it('reports the service as healthy', async () => {{
    const res = await request({server}).get('/health');
{check}
  }});
}});
"
            )
        }
    }
}

const FRONTEND_TEST: &str = "import { describe, expect, it } from 'vitest';
import { API_URL } from './api';

describe('api client', () => {
  it('targets an http backend', () => {
    expect(API_URL.startsWith('http')).toBe(true);
  });
});
";
