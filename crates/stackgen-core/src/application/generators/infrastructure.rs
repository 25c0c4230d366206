//! Containers, CI and deployment manifests.

use std::path::PathBuf;

use serde_json::json;
use tracing::{debug, instrument};

use crate::application::composer::{GenerationContext, Generator, Scope, Step};
use crate::domain::{
    BackendTarget, Communication, Database, DeployTarget, Feature, Language, ProjectConfig,
    Stage, StageDescriptor, framework_def,
};
use crate::error::StackgenResult;

const NODE_IMAGE: &str = "node:20-alpine";

// ── Docker ───────────────────────────────────────────────────────────────────

/// Dockerfiles, and at workspace scope the compose file.
pub struct DockerGenerator {
    scope: Scope,
}

impl DockerGenerator {
    pub fn new(scope: Scope) -> Self {
        Self { scope }
    }
}

impl Generator for DockerGenerator {
    fn step(&self) -> Step {
        Step::Docker
    }

    fn prerequisites(&self) -> &'static [Step] {
        match self.scope {
            Scope::Workspace => &[Step::Backend, Step::Frontend],
            Scope::Service => &[Step::Backend],
        }
    }

    fn is_triggered(&self, config: &ProjectConfig) -> bool {
        config.has_feature(Feature::Docker)
    }

    #[instrument(skip_all, fields(scope = ?self.scope, subproject = %ctx.backend.name))]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        let backend = ctx.config.backend();
        let entry = framework_def(backend.framework).entry_stem;
        ctx.write(
            &ctx.backend_dir().join("Dockerfile"),
            &backend_dockerfile(backend.language, entry, ctx.backend.port),
        )?;
        ctx.write(&ctx.backend_dir().join(".dockerignore"), DOCKERIGNORE)?;

        if self.scope == Scope::Service {
            return Ok(());
        }

        ctx.write(&ctx.frontend_dir().join("Dockerfile"), FRONTEND_DOCKERFILE)?;
        ctx.write(&ctx.frontend_dir().join(".dockerignore"), DOCKERIGNORE)?;
        ctx.write(&ctx.path("docker-compose.yml"), &compose_file(ctx.config))?;
        ctx.write(&ctx.path(".dockerignore"), DOCKERIGNORE)
    }

    fn subproject(&self, ctx: &GenerationContext<'_>) -> PathBuf {
        match self.scope {
            Scope::Workspace => ctx.root.clone(),
            Scope::Service => ctx.backend_dir(),
        }
    }
}

fn backend_dockerfile(language: Language, entry_stem: &str, port: u16) -> String {
    match language {
        Language::TypeScript => {
            let compiled = entry_stem.trim_start_matches("src/");
            format!(
                "FROM {NODE_IMAGE} AS build
WORKDIR /app
COPY package.json ./
RUN npm install
COPY . .
RUN npm run build

FROM {NODE_IMAGE}
WORKDIR /app
ENV NODE_ENV=production
COPY --from=build /app/package.json ./
COPY --from=build /app/node_modules ./node_modules
COPY --from=build /app/dist ./dist
EXPOSE {port}
CMD [\"node\", \"dist/{compiled}.js\"]
"
            )
        }
        Language::JavaScript => format!(
            "FROM {NODE_IMAGE}
WORKDIR /app
ENV NODE_ENV=production
COPY package.json ./
RUN npm install --omit=dev
COPY . .
EXPOSE {port}
CMD [\"node\", \"{entry_stem}.js\"]
"
        ),
    }
}

const FRONTEND_DOCKERFILE: &str = "FROM node:20-alpine AS build
WORKDIR /app
COPY package.json ./
RUN npm install
COPY . .
RUN npm run build

FROM nginx:alpine
COPY --from=build /app/dist /usr/share/nginx/html
EXPOSE 80
CMD [\"nginx\", \"-g\", \"daemon off;\"]
";

const DOCKERIGNORE: &str = "node_modules
dist
coverage
.env
*.log
";

/// Root compose file: every dockerised backend, the frontend, and one
/// container per selected backing service.
fn compose_file(config: &ProjectConfig) -> String {
    let prefix = config.docker_prefix();
    let dev = StageDescriptor::for_stage(Stage::Development, config);
    let targets = config.backend_targets();
    let queue = targets
        .iter()
        .any(|t| t.communication == Communication::MessageQueue);

    let mut backing = Vec::new();
    if config.has_database(Database::Postgres) {
        backing.push("postgres");
    }
    if config.has_database(Database::Mongo) {
        backing.push("mongodb");
    }
    if queue {
        backing.push("rabbitmq");
    }

    let mut out = String::from("services:\n");
    for target in targets
        .iter()
        .filter(|t| t.config.has_feature(Feature::Docker))
    {
        out.push_str(&compose_backend(prefix, target, &backing, &dev));
    }

    out.push_str(&format!(
        "  frontend:
    build: ./apps/frontend
    container_name: {prefix}-frontend
    ports:
      - \"{port}:80\"
    depends_on:
      - backend
",
        port = config.frontend_port()
    ));

    if config.has_database(Database::Postgres) {
        out.push_str(&format!(
            "  postgres:
    image: postgres:16-alpine
    container_name: {prefix}-postgres
    environment:
      POSTGRES_USER: {user}
      POSTGRES_PASSWORD: {password}
      POSTGRES_DB: {db}
    ports:
      - \"5432:5432\"
    volumes:
      - postgres-data:/var/lib/postgresql/data
",
            user = dev.get("DB_USER").unwrap_or_default(),
            password = dev.get("DB_PASSWORD").unwrap_or_default(),
            db = dev.get("DB_NAME").unwrap_or_default(),
        ));
    }
    if config.has_database(Database::Mongo) {
        out.push_str(&format!(
            "  mongodb:
    image: mongo:7
    container_name: {prefix}-mongodb
    ports:
      - \"27017:27017\"
    volumes:
      - mongo-data:/data/db
"
        ));
    }
    if queue {
        out.push_str(&format!(
            "  rabbitmq:
    image: rabbitmq:3-management-alpine
    container_name: {prefix}-rabbitmq
    ports:
      - \"5672:5672\"
      - \"15672:15672\"
"
        ));
    }

    let volumes: Vec<&str> = [
        (config.has_database(Database::Postgres), "postgres-data"),
        (config.has_database(Database::Mongo), "mongo-data"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();
    if !volumes.is_empty() {
        out.push_str("\nvolumes:\n");
        for volume in volumes {
            out.push_str(&format!("  {volume}:\n"));
        }
    }
    out
}

fn compose_backend(
    prefix: &str,
    target: &BackendTarget,
    backing: &[&str],
    dev: &StageDescriptor,
) -> String {
    let mut out = format!(
        "  {name}:
    build: ./apps/{name}
    container_name: {prefix}-{name}
    ports:
      - \"{port}:{port}\"
    env_file:
      - ./environments/.env.development
",
        name = target.name,
        port = target.port,
    );

    // Inside the compose network services are reached by container name.
    let mut overrides = Vec::new();
    if dev.get("DB_HOST").is_some() {
        overrides.push(format!("DB_HOST={prefix}-postgres"));
    }
    if let Some(uri) = dev.get("MONGO_URI") {
        overrides.push(format!("MONGO_URI={}", uri.replace("localhost", &format!("{prefix}-mongodb"))));
    }
    if dev.get("AMQP_URL").is_some() {
        overrides.push(format!("AMQP_URL=amqp://{prefix}-rabbitmq:5672"));
    }
    if !overrides.is_empty() {
        out.push_str("    environment:\n");
        for entry in overrides {
            out.push_str(&format!("      - {entry}\n"));
        }
    }
    if !backing.is_empty() {
        out.push_str("    depends_on:\n");
        for service in backing {
            out.push_str(&format!("      - {service}\n"));
        }
    }
    out
}

// ── CI ───────────────────────────────────────────────────────────────────────

/// GitHub Actions workflow running the turbo tasks.
pub struct CiGenerator;

impl Generator for CiGenerator {
    fn step(&self) -> Step {
        Step::Ci
    }

    fn prerequisites(&self) -> &'static [Step] {
        &[Step::Workspace]
    }

    fn is_triggered(&self, config: &ProjectConfig) -> bool {
        config.has_feature(Feature::CiCd)
    }

    #[instrument(skip_all)]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        ctx.write(
            &ctx.path(".github/workflows/ci.yml"),
            &ci_workflow(ctx.config),
        )
    }
}

fn ci_workflow(config: &ProjectConfig) -> String {
    let mut out = String::from(
        "name: CI

on:
  push:
    branches: [main]
  pull_request:

jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - uses: pnpm/action-setup@v3
        with:
          version: 8
      - uses: actions/setup-node@v4
        with:
          node-version: 20
          cache: pnpm
      - run: pnpm install
      - run: pnpm lint
      - run: pnpm build
",
    );
    if config.has_feature(Feature::Testing) {
        out.push_str("      - run: pnpm test\n");
    }
    if config.has_feature(Feature::Docker) {
        out.push_str("      - run: docker compose build\n");
    }
    out
}

// ── Deploy targets ───────────────────────────────────────────────────────────

/// One manifest set per selected deploy target under `deploy/<target>/`.
pub struct DeployTargetsGenerator;

impl Generator for DeployTargetsGenerator {
    fn step(&self) -> Step {
        Step::DeployTargets
    }

    fn prerequisites(&self) -> &'static [Step] {
        &[Step::Backend, Step::Frontend]
    }

    fn is_triggered(&self, config: &ProjectConfig) -> bool {
        !config.deploy().is_empty()
    }

    #[instrument(skip_all)]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        let config = ctx.config;
        let prefix = config.docker_prefix();
        let mut apps: Vec<(String, u16)> = config
            .backend_targets()
            .into_iter()
            .map(|t| (t.name, t.port))
            .collect();
        apps.push(("frontend".to_string(), 80));

        for target in config.deploy() {
            let dir = ctx.path("deploy").join(target.as_str());
            debug!(deploy = %target, "writing deploy manifests");
            match target {
                DeployTarget::Docker => {
                    ctx.write(&dir.join("docker-compose.prod.yml"), &prod_compose(prefix, &apps))?
                }
                DeployTarget::Kubernetes => {
                    for (name, port) in &apps {
                        ctx.write(
                            &dir.join(format!("{name}.yaml")),
                            &kubernetes_manifest(prefix, name, *port),
                        )?;
                    }
                }
                DeployTarget::Aws => ctx.write(
                    &dir.join("ecs-task-definition.json"),
                    &ecs_task_definition(prefix, &apps),
                )?,
                DeployTarget::Azure => {
                    for (name, port) in &apps {
                        ctx.write(
                            &dir.join(format!("{name}.containerapp.yaml")),
                            &azure_container_app(prefix, name, *port),
                        )?;
                    }
                }
                DeployTarget::Gcp => {
                    for (name, port) in &apps {
                        ctx.write(
                            &dir.join(format!("{name}.service.yaml")),
                            &cloud_run_service(prefix, name, *port),
                        )?;
                    }
                }
                DeployTarget::Serverless => ctx.write(
                    &dir.join("serverless.yml"),
                    &serverless_config(config.project_name().as_str(), &apps),
                )?,
            }
        }
        Ok(())
    }
}

fn image(prefix: &str, name: &str) -> String {
    format!("{prefix}/{name}:latest")
}

fn prod_compose(prefix: &str, apps: &[(String, u16)]) -> String {
    let mut out = String::from("services:\n");
    for (name, port) in apps {
        out.push_str(&format!(
            "  {name}:
    image: {image}
    restart: unless-stopped
    env_file:
      - ../../environments/.env.production
    ports:
      - \"{port}:{port}\"
",
            image = image(prefix, name)
        ));
    }
    out
}

fn kubernetes_manifest(prefix: &str, name: &str, port: u16) -> String {
    format!(
        "apiVersion: apps/v1
kind: Deployment
metadata:
  name: {name}
  labels:
    app: {name}
spec:
  replicas: 2
  selector:
    matchLabels:
      app: {name}
  template:
    metadata:
      labels:
        app: {name}
    spec:
      containers:
        - name: {name}
          image: {image}
          ports:
            - containerPort: {port}
---
apiVersion: v1
kind: Service
metadata:
  name: {name}
spec:
  selector:
    app: {name}
  ports:
    - port: {port}
      targetPort: {port}
",
        image = image(prefix, name)
    )
}

fn ecs_task_definition(prefix: &str, apps: &[(String, u16)]) -> String {
    let containers: Vec<_> = apps
        .iter()
        .map(|(name, port)| {
            json!({
                "name": name,
                "image": image(prefix, name),
                "essential": true,
                "portMappings": [{ "containerPort": port, "protocol": "tcp" }],
            })
        })
        .collect();
    let doc = json!({
        "family": prefix,
        "networkMode": "awsvpc",
        "requiresCompatibilities": ["FARGATE"],
        "cpu": "512",
        "memory": "1024",
        "containerDefinitions": containers,
    });
    let mut out = serde_json::to_string_pretty(&doc).unwrap_or_default();
    out.push('\n');
    out
}

fn azure_container_app(prefix: &str, name: &str, port: u16) -> String {
    format!(
        "name: {prefix}-{name}
type: Microsoft.App/containerApps
properties:
  configuration:
    ingress:
      external: true
      targetPort: {port}
  template:
    containers:
      - name: {name}
        image: {image}
        resources:
          cpu: 0.5
          memory: 1Gi
    scale:
      minReplicas: 1
      maxReplicas: 3
",
        image = image(prefix, name)
    )
}

fn cloud_run_service(prefix: &str, name: &str, port: u16) -> String {
    format!(
        "apiVersion: serving.knative.dev/v1
kind: Service
metadata:
  name: {prefix}-{name}
spec:
  template:
    spec:
      containers:
        - image: {image}
          ports:
            - containerPort: {port}
",
        image = image(prefix, name)
    )
}

fn serverless_config(project: &str, apps: &[(String, u16)]) -> String {
    let mut out = format!(
        "service: {project}

provider:
  name: aws
  runtime: nodejs20.x
  stage: ${{opt:stage, 'production'}}

functions:
"
    );
    for (name, _) in apps.iter().filter(|(name, _)| name != "frontend") {
        out.push_str(&format!(
            "  {fn_name}:
    handler: apps/{name}/dist/lambda.handler
    events:
      - httpApi: '*'
",
            fn_name = name.replace('-', "_")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MicroserviceSpec;

    #[test]
    fn compose_includes_selected_backing_services_only() {
        let config = ProjectConfig::builder("demo")
            .database(Database::Postgres)
            .feature(Feature::Docker)
            .build()
            .unwrap();
        let text = compose_file(&config);
        assert!(text.contains("container_name: demo-postgres"));
        assert!(text.contains("POSTGRES_DB: demo_dev"));
        assert!(text.contains("DB_HOST=demo-postgres"));
        assert!(!text.contains("mongodb"));
        assert!(!text.contains("rabbitmq"));
    }

    #[test]
    fn compose_skips_services_that_dropped_docker() {
        let config = ProjectConfig::builder("demo")
            .feature(Feature::Docker)
            .microservice(MicroserviceSpec::new("billing").with_features([Feature::Auth]))
            .microservice(
                MicroserviceSpec::new("mailer")
                    .with_features([Feature::Docker])
                    .with_communication(Communication::MessageQueue),
            )
            .build()
            .unwrap();
        let text = compose_file(&config);
        assert!(!text.contains("demo-billing"));
        assert!(text.contains("container_name: demo-mailer"));
        assert!(text.contains("container_name: demo-rabbitmq"));
    }

    #[test]
    fn typescript_dockerfile_runs_compiled_entry() {
        let text = backend_dockerfile(Language::TypeScript, "src/main", 4000);
        assert!(text.contains("CMD [\"node\", \"dist/main.js\"]"));
        let text = backend_dockerfile(Language::JavaScript, "src/app", 4001);
        assert!(text.contains("CMD [\"node\", \"src/app.js\"]"));
        assert!(text.contains("EXPOSE 4001"));
    }

    #[test]
    fn ci_runs_tests_only_when_selected() {
        let config = ProjectConfig::builder("demo").feature(Feature::CiCd).build().unwrap();
        assert!(!ci_workflow(&config).contains("pnpm test"));
        let config = ProjectConfig::builder("demo")
            .features([Feature::CiCd, Feature::Testing])
            .build()
            .unwrap();
        assert!(ci_workflow(&config).contains("pnpm test"));
    }

    #[test]
    fn serverless_skips_the_frontend() {
        let apps = vec![("backend".to_string(), 4000), ("frontend".to_string(), 80)];
        let text = serverless_config("demo", &apps);
        assert!(text.contains("  backend:"));
        assert!(!text.contains("frontend"));
        assert!(text.contains("${opt:stage, 'production'}"));
    }
}
