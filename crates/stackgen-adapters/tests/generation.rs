//! End-to-end generation against the bundled `templates/` directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use stackgen_adapters::{
    FilesystemTemplateResolver, LocalFilesystem, MemoryFilesystem, MemoryTemplateResolver,
    PlaceholderRenderer,
};
use stackgen_core::application::generators::{AuthGenerator, DatabaseGenerator, GraphqlGenerator};
use stackgen_core::application::{
    GenerationContext, Generator, NoopObserver, ProjectAssembler, Step,
};
use stackgen_core::domain::{
    Communication, Database, DomainError, Feature, Framework, Language, MicroserviceSpec,
    ProjectConfig, TemplateCategory,
};
use stackgen_core::error::StackgenError;
use tempfile::TempDir;

fn templates_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../templates")
}

fn assembler() -> ProjectAssembler {
    ProjectAssembler::new(
        Box::new(LocalFilesystem::new()),
        Box::new(FilesystemTemplateResolver::new([templates_dir()])),
        Box::new(PlaceholderRenderer::new()),
    )
}

fn demo_config() -> ProjectConfig {
    ProjectConfig::builder("demo")
        .backend(Language::TypeScript, Framework::Express)
        .frontend(Language::TypeScript, Framework::React)
        .database(Database::Postgres)
        .features([Feature::Auth, Feature::GraphQl])
        .build()
        .unwrap()
}

/// Every file under `root` keyed by its `/`-separated relative path.
fn snapshot(root: &Path) -> BTreeMap<String, String> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            (relative, fs::read_to_string(e.path()).unwrap())
        })
        .collect()
}

/// Copy the bundled templates into `dest` so a test can add files to them.
fn copy_templates(dest: &Path) {
    let source = templates_dir();
    for entry in walkdir::WalkDir::new(&source) {
        let entry = entry.unwrap();
        let target = dest.join(entry.path().strip_prefix(&source).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

/// In-memory stacks for the default express/react TypeScript config.
fn memory_templates(backend_entry: (&str, &str)) -> MemoryTemplateResolver {
    let templates = MemoryTemplateResolver::new();
    templates
        .insert(
            TemplateCategory::Backend,
            Framework::Express,
            Language::TypeScript,
            [("package.json", "{}"), backend_entry],
        )
        .unwrap();
    templates
        .insert(
            TemplateCategory::Frontend,
            Framework::React,
            Language::TypeScript,
            [("package.json", "{}")],
        )
        .unwrap();
    templates
}

fn memory_assembler(templates: MemoryTemplateResolver) -> ProjectAssembler {
    ProjectAssembler::new(
        Box::new(MemoryFilesystem::new()),
        Box::new(templates),
        Box::new(PlaceholderRenderer::new()),
    )
}

fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path.as_ref())
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.as_ref().display()))
}

fn apps(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root.join("apps"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ── Demo project ────────────────────────────────────────────────────────────

#[test]
fn demo_project_wires_database_auth_and_graphql() {
    let out = TempDir::new().unwrap();
    let report = assembler().generate(&demo_config(), out.path()).unwrap();
    let backend = out.path().join("demo/apps/backend");

    assert_eq!(report.root, out.path().join("demo"));
    assert!(read(backend.join("src/database.ts")).contains("type: 'postgres'"));
    assert!(backend.join("src/auth.ts").is_file());
    assert!(backend.join("src/routes/auth.ts").is_file());
    assert!(backend.join("src/schema.graphql").is_file());

    let entry = read(backend.join("src/app.ts"));
    assert!(entry.contains("app.use('/api/auth', authRoutes);"));
    assert!(entry.contains("await mountGraphQL(app, '/graphql');"));
    assert!(entry.contains("await connectDatabases();"));

    let manifest: serde_json::Value =
        serde_json::from_str(&read(backend.join("package.json"))).unwrap();
    assert_eq!(manifest["name"], "@demo/backend");
    assert!(manifest["dependencies"]["typeorm"].is_string());
    assert!(manifest["dependencies"]["jsonwebtoken"].is_string());

    let saved = ProjectConfig::from_json(&read(out.path().join("demo/stackgen.json"))).unwrap();
    assert_eq!(saved, demo_config());
    assert!(report.executed.contains(&Step::Graphql));
    assert!(report.skipped.contains(&Step::Microservices));
}

#[test]
fn binary_template_assets_are_copied_byte_for_byte() {
    let templates = TempDir::new().unwrap();
    copy_templates(templates.path());
    let icon = [0u8, 0, 1, 0, 0xff, 0xfe, 0x80];
    let public = templates.path().join("frontend/react-typescript/public");
    fs::create_dir_all(&public).unwrap();
    fs::write(public.join("favicon.ico"), icon).unwrap();

    let out = TempDir::new().unwrap();
    let config = ProjectConfig::builder("demo").build().unwrap();
    ProjectAssembler::new(
        Box::new(LocalFilesystem::new()),
        Box::new(FilesystemTemplateResolver::new([templates.path().to_path_buf()])),
        Box::new(PlaceholderRenderer::new()),
    )
    .generate(&config, out.path())
    .unwrap();

    let copied = fs::read(out.path().join("demo/apps/frontend/public/favicon.ico")).unwrap();
    assert_eq!(copied, icon);
    assert!(out.path().join("demo/apps/frontend/package.json").is_file());
}

#[test]
fn rendered_templates_leave_no_marker_files() {
    let out = TempDir::new().unwrap();
    assembler().generate(&demo_config(), out.path()).unwrap();
    let files = snapshot(&out.path().join("demo"));

    assert!(files.keys().all(|p| !p.ends_with(".tmpl")));
    assert!(files.keys().all(|p| !p.ends_with("template.toml")));
    assert!(files.contains_key("apps/frontend/vite.config.ts"));
    assert!(
        files["apps/frontend/src/api.ts"].contains("'http://localhost:4000'"),
        "API_URL placeholder not rendered"
    );
}

// ── Properties ──────────────────────────────────────────────────────────────

#[test]
fn one_subproject_per_backend_frontend_and_service() {
    let out = TempDir::new().unwrap();
    let config = ProjectConfig::builder("shop")
        .microservice(MicroserviceSpec::new("billing").with_communication(Communication::Grpc))
        .microservice(
            MicroserviceSpec::new("mailer").with_communication(Communication::MessageQueue),
        )
        .build()
        .unwrap();
    let report = assembler().generate(&config, out.path()).unwrap();
    let root = out.path().join("shop");

    assert_eq!(apps(&root), vec!["backend", "billing", "frontend", "mailer"]);
    assert_eq!(report.subprojects.len(), 4);

    let billing = read(root.join("apps/billing/src/app.ts"));
    assert!(billing.contains("startGrpcServer(Number(process.env.BILLING_GRPC_PORT) || 50051);"));
    assert!(root.join("apps/billing/proto/billing.proto").is_file());
    for stage in ["development", "staging", "production"] {
        let env = read(root.join(format!("environments/.env.{stage}")));
        assert!(env.contains("BILLING_GRPC_PORT=50051\n"), "{stage}");
    }
    assert!(read(root.join("apps/mailer/src/app.ts")).contains("await connectQueue();"));
    assert!(read(root.join("infrastructure/gateway/nginx.conf")).contains("location /mailer/ {"));
}

#[test]
fn generation_is_deterministic() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let config = demo_config();

    assembler().generate(&config, first.path()).unwrap();
    assembler().generate(&config, second.path()).unwrap();

    assert_eq!(
        snapshot(&first.path().join("demo")),
        snapshot(&second.path().join("demo"))
    );
}

#[test]
fn graphql_leaves_no_trace_when_not_selected() {
    let out = TempDir::new().unwrap();
    let config = ProjectConfig::builder("plain")
        .backend(Language::TypeScript, Framework::NestJs)
        .database(Database::Mongo)
        .features([Feature::Auth, Feature::Testing, Feature::Docker])
        .microservice(MicroserviceSpec::new("audit").with_framework(Framework::Koa))
        .build()
        .unwrap();
    assembler().generate(&config, out.path()).unwrap();

    for (path, content) in snapshot(&out.path().join("plain")) {
        assert!(!path.to_lowercase().contains("graphql"), "{path}");
        assert!(!content.to_lowercase().contains("graphql"), "{path}");
        assert!(!content.contains("apollo"), "{path}");
    }
}

#[test]
fn auth_and_graphql_insertions_appear_exactly_once() {
    let out = TempDir::new().unwrap();
    assembler().generate(&demo_config(), out.path()).unwrap();
    let entry = read(out.path().join("demo/apps/backend/src/app.ts"));

    for needle in [
        "import authRoutes from './routes/auth.js';",
        "app.use('/api/auth', authRoutes);",
        "import { mountGraphQL } from './graphql.js';",
        "await mountGraphQL(app, '/graphql');",
        "// @stackgen:imports",
        "// @stackgen:middleware",
        "// @stackgen:startup",
    ] {
        assert_eq!(entry.matches(needle).count(), 1, "{needle}");
    }
}

#[test]
fn auth_then_graphql_each_insert_once() {
    let out = TempDir::new().unwrap();
    let plain = ProjectConfig::builder("demo").build().unwrap();
    assembler().generate(&plain, out.path()).unwrap();

    let config = ProjectConfig::builder("demo")
        .features([Feature::Auth, Feature::GraphQl])
        .build()
        .unwrap();
    let fs = LocalFilesystem::new();
    let templates = FilesystemTemplateResolver::new([templates_dir()]);
    let renderer = PlaceholderRenderer::new();
    let observer = NoopObserver;
    let ctx = GenerationContext::new(
        &fs,
        &templates,
        &renderer,
        &observer,
        out.path().join("demo"),
        &config,
    );
    AuthGenerator.generate(&ctx).unwrap();
    GraphqlGenerator.generate(&ctx).unwrap();

    let entry = read(out.path().join("demo/apps/backend/src/app.ts"));
    let auth_import = "import authRoutes from './routes/auth.js';";
    let graphql_import = "import { mountGraphQL } from './graphql.js';";
    for needle in [
        auth_import,
        graphql_import,
        "app.use('/api/auth', authRoutes);",
        "await mountGraphQL(app, '/graphql');",
        "// @stackgen:imports",
        "// @stackgen:middleware",
        "// @stackgen:startup",
    ] {
        assert_eq!(entry.matches(needle).count(), 1, "{needle}");
    }
    // Insertions keep their application order ahead of the marker.
    let auth_at = entry.find(auth_import).unwrap();
    let graphql_at = entry.find(graphql_import).unwrap();
    let marker_at = entry.find("// @stackgen:imports").unwrap();
    assert!(auth_at < graphql_at && graphql_at < marker_at);
}

#[test]
fn microservice_features_replace_workspace_features() {
    let out = TempDir::new().unwrap();
    let config = ProjectConfig::builder("split")
        .feature(Feature::Auth)
        .microservice(MicroserviceSpec::new("catalog").with_features([Feature::GraphQl]))
        .build()
        .unwrap();
    assembler().generate(&config, out.path()).unwrap();
    let root = out.path().join("split/apps");

    assert!(root.join("backend/src/auth.ts").is_file());
    assert!(!root.join("backend/src/schema.graphql").exists());

    assert!(root.join("catalog/src/schema.graphql").is_file());
    assert!(!root.join("catalog/src/auth.ts").exists());
    let entry = read(root.join("catalog/src/app.ts"));
    assert!(entry.contains("mountGraphQL"));
    assert!(!entry.contains("authRoutes"));
}

#[test]
fn rerunning_a_step_duplicates_its_insertion() {
    let out = TempDir::new().unwrap();
    let config = demo_config();
    assembler().generate(&config, out.path()).unwrap();

    let fs = LocalFilesystem::new();
    let templates = FilesystemTemplateResolver::new([templates_dir()]);
    let renderer = PlaceholderRenderer::new();
    let observer = NoopObserver;
    let ctx = GenerationContext::new(
        &fs,
        &templates,
        &renderer,
        &observer,
        out.path().join("demo"),
        &config,
    );
    DatabaseGenerator.generate(&ctx).unwrap();

    let entry = read(out.path().join("demo/apps/backend/src/app.ts"));
    assert_eq!(entry.matches("await connectDatabases();").count(), 2);
    assert_eq!(entry.matches("// @stackgen:startup").count(), 1);
}

// ── Failure modes ───────────────────────────────────────────────────────────

#[test]
fn existing_project_is_refused_without_force() {
    let out = TempDir::new().unwrap();
    fs::create_dir_all(out.path().join("demo/keep")).unwrap();
    fs::write(out.path().join("demo/keep/file.txt"), "mine").unwrap();

    assert!(assembler().generate(&demo_config(), out.path()).is_err());
    assert_eq!(read(out.path().join("demo/keep/file.txt")), "mine");

    assembler()
        .with_overwrite(true)
        .generate(&demo_config(), out.path())
        .unwrap();
    assert!(!out.path().join("demo/keep").exists());
}

#[test]
fn missing_extension_point_aborts_at_graphql() {
    let templates = memory_templates(("src/app.ts", "const app = express();\n"));
    let config = ProjectConfig::builder("demo")
        .feature(Feature::GraphQl)
        .build()
        .unwrap();

    let err = memory_assembler(templates)
        .generate(&config, "/out")
        .unwrap_err();
    assert_eq!(err.failed_step(), Some("graphql"));
    match err.root_cause() {
        StackgenError::Domain(DomainError::AnchorNotFound { point }) => {
            assert_eq!(point, "imports");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unresolved_placeholder_aborts_at_backend() {
    let templates = memory_templates(("src/app.ts.tmpl", "{{NOPE}}\n"));
    let fs = MemoryFilesystem::new();
    let config = ProjectConfig::builder("demo").build().unwrap();

    let err = ProjectAssembler::new(
        Box::new(fs.clone()),
        Box::new(templates),
        Box::new(PlaceholderRenderer::new()),
    )
    .generate(&config, "/out")
    .unwrap_err();

    assert_eq!(err.failed_step(), Some("backend"));
    match err.root_cause() {
        StackgenError::Domain(DomainError::UnresolvedPlaceholder { name, line }) => {
            assert_eq!(name, "NOPE");
            assert_eq!(*line, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Nothing is rendered past the failure and nothing is rolled back.
    assert!(fs.content("/out/demo/apps/backend/src/app.ts").is_none());
    assert!(fs.content("/out/demo/apps/backend/src/app.ts.tmpl").is_some());
    assert!(fs.content("/out/demo/stackgen.json").is_none());
}

#[test]
fn missing_template_stops_at_the_backend_step() {
    let out = TempDir::new().unwrap();
    let empty = TempDir::new().unwrap();
    let assembler = ProjectAssembler::new(
        Box::new(LocalFilesystem::new()),
        Box::new(FilesystemTemplateResolver::new([empty.path().to_path_buf()])),
        Box::new(PlaceholderRenderer::new()),
    );

    let err = assembler.generate(&demo_config(), out.path()).unwrap_err();
    assert_eq!(err.failed_step(), Some("backend"));
    // The partial tree stays for inspection.
    assert!(out.path().join("demo/package.json").is_file());
    assert!(!out.path().join("demo/stackgen.json").exists());
}
