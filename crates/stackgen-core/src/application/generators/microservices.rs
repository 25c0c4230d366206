//! Microservice sub-projects, their transports and the gateway.
//!
//! Each service re-enters the service pipeline with its own effective
//! configuration, so a service's feature override decides what its
//! sub-project contains. Services are generated one after another because
//! they all contribute to the shared gateway and registry files.

use serde_json::json;
use tracing::{info, instrument};

use crate::application::composer::{Composer, GenerationContext, Generator, Step};
use crate::application::generators::environments::config_loader;
use crate::application::generators::{
    add_dependencies, add_type_packages, annotation, backend_import, service_registry,
};
use crate::domain::{
    BackendTarget, Communication, ExtensionPoint, ProjectConfig, grpc_port,
    service_grpc_port_key, service_port_key,
};
use crate::domain::render_context::to_pascal_case;
use crate::error::StackgenResult;

const GRPC_PACKAGES: &[(&str, &str)] = &[
    ("@grpc/grpc-js", "^1.10.0"),
    ("@grpc/proto-loader", "^0.7.10"),
];
const QUEUE_PACKAGES: &[(&str, &str)] = &[("amqplib", "^0.10.3")];
const QUEUE_TYPES: &[(&str, &str)] = &[("@types/amqplib", "^0.10.4")];
const DOTENV: &[(&str, &str)] = &[("dotenv", "^16.4.5")];

pub struct MicroservicesGenerator;

impl Generator for MicroservicesGenerator {
    fn step(&self) -> Step {
        Step::Microservices
    }

    fn prerequisites(&self) -> &'static [Step] {
        &[Step::Workspace]
    }

    fn is_triggered(&self, config: &ProjectConfig) -> bool {
        !config.microservices().is_empty()
    }

    #[instrument(skip_all, fields(services = ctx.config.microservices().len()))]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        let composer = Composer::new(service_registry())?;
        let targets = ctx.config.backend_targets();

        for (index, target) in targets.iter().skip(1).enumerate() {
            info!(
                service = %target.name,
                port = target.port,
                communication = %target.communication,
                "generating microservice"
            );
            let service = ctx.for_service(target);
            composer.run(&service)?;

            service.write(
                &service.backend_source("src/config"),
                &config_loader(&service, &service_port_key(&target.name), target.port),
            )?;
            service.update_manifest(self.step(), &service.backend_dir(), |m| {
                add_dependencies(m, DOTENV);
            })?;

            match target.communication {
                Communication::Grpc => self.wire_grpc(&service, target, index)?,
                Communication::MessageQueue => self.wire_queue(&service, target)?,
                Communication::None => {}
            }
        }

        ctx.write(
            &ctx.path("infrastructure/gateway/nginx.conf"),
            &gateway_config(ctx.config.docker_prefix(), &targets),
        )?;
        ctx.write(
            &ctx.path("infrastructure/service-registry.json"),
            &service_registry_document(ctx.config.docker_prefix(), &targets),
        )
    }
}

impl MicroservicesGenerator {
    fn wire_grpc(
        &self,
        ctx: &GenerationContext<'_>,
        target: &BackendTarget,
        index: usize,
    ) -> StackgenResult<()> {
        let dir = ctx.backend_dir();
        let entry = ctx.backend_entry();
        let language = ctx.config.backend().language;
        let package = target.name.replace('-', "_");
        let service = format!("{}Service", to_pascal_case(&target.name));

        ctx.write(
            &dir.join(format!("proto/{}.proto", target.name)),
            &proto_contract(&package, &service),
        )?;

        let logger = backend_import(ctx, "{ logger }", "./logger");
        ctx.write(
            &ctx.backend_source("src/grpc-server"),
            &format!(
                "import path from 'node:path';
import * as grpc from '@grpc/grpc-js';
import * as protoLoader from '@grpc/proto-loader';
{logger}

const PROTO_PATH = path.resolve(process.cwd(), 'proto/{name}.proto');

export function startGrpcServer(port) {{
  const definition = protoLoader.loadSync(PROTO_PATH, {{
    keepCase: true,
    longs: String,
    enums: String,
    defaults: true,
    oneofs: true,
  }});
  const proto{any} = grpc.loadPackageDefinition(definition).{package};
  const server = new grpc.Server();
  server.addService(proto.{service}.service, {{
    GetStatus: (_call, callback) => callback(null, {{ service: '{name}', status: 'ok' }}),
  }});
  server.bindAsync(`0.0.0.0:${{port}}`, grpc.ServerCredentials.createInsecure(), (err, bound) => {{
    if (err) {{
      logger.error(err);
      return;
    }}
    logger.info(`gRPC server listening on port ${{bound}}`);
  }});
  return server;
}}
",
                name = target.name,
                any = annotation(language, ": any"),
            ),
        )?;

        let default_port = grpc_port(index);
        ctx.patch(
            self.step(),
            &entry,
            ExtensionPoint::Imports,
            &backend_import(ctx, "{ startGrpcServer }", "./grpc-server"),
        )?;
        ctx.patch(
            self.step(),
            &entry,
            ExtensionPoint::Startup,
            &format!(
                "startGrpcServer(Number(process.env.{}) || {default_port});",
                service_grpc_port_key(&target.name)
            ),
        )?;
        ctx.update_manifest(self.step(), &dir, |m| {
            add_dependencies(m, GRPC_PACKAGES);
        })
    }

    fn wire_queue(&self, ctx: &GenerationContext<'_>, target: &BackendTarget) -> StackgenResult<()> {
        let entry = ctx.backend_entry();
        let language = ctx.config.backend().language;
        let logger = backend_import(ctx, "{ logger }", "./logger");

        ctx.write(
            &ctx.backend_source("src/queue"),
            &format!(
                "import amqp from 'amqplib';
{logger}

const QUEUE = '{name}.events';

let channel{any} = null;

export async function connectQueue() {{
  const connection = await amqp.connect(process.env.AMQP_URL || 'amqp://localhost:5672');
  channel = await connection.createChannel();
  await channel.assertQueue(QUEUE, {{ durable: true }});
  logger.info(`Connected to message queue ${{QUEUE}}`);
}}

export function publish(message) {{
  if (!channel) {{
    throw new Error('Message queue is not connected');
  }}
  channel.sendToQueue(QUEUE, Buffer.from(JSON.stringify(message)), {{ persistent: true }});
}}
",
                name = target.name,
                any = annotation(language, ": any"),
            ),
        )?;

        ctx.patch(
            self.step(),
            &entry,
            ExtensionPoint::Imports,
            &backend_import(ctx, "{ connectQueue }", "./queue"),
        )?;
        ctx.patch(self.step(), &entry, ExtensionPoint::Startup, "await connectQueue();")?;
        ctx.update_manifest(self.step(), &ctx.backend_dir(), |m| {
            add_dependencies(m, QUEUE_PACKAGES);
            add_type_packages(m, language, QUEUE_TYPES);
        })
    }
}

fn proto_contract(package: &str, service: &str) -> String {
    format!(
        "syntax = \"proto3\";

package {package};

service {service} {{
  rpc GetStatus (StatusRequest) returns (StatusReply);
}}

message StatusRequest {{}}

message StatusReply {{
  string service = 1;
  string status = 2;
}}
"
    )
}

/// Reverse proxy routing `/api/` to the main backend and `/<service>/` to
/// each service.
fn gateway_config(prefix: &str, targets: &[BackendTarget]) -> String {
    let mut out = String::from("events {}\n\nhttp {\n");
    for target in targets {
        out.push_str(&format!(
            "  upstream {name} {{\n    server {prefix}-{name}:{port};\n  }}\n\n",
            name = target.name,
            port = target.port
        ));
    }
    out.push_str("  server {\n    listen 80;\n");
    for (index, target) in targets.iter().enumerate() {
        let location = if index == 0 {
            "/api/".to_string()
        } else {
            format!("/{}/", target.name)
        };
        out.push_str(&format!(
            "\n    location {location} {{\n      proxy_pass http://{}/;\n      proxy_set_header Host $host;\n    }}\n",
            target.name
        ));
    }
    out.push_str("  }\n}\n");
    out
}

fn service_registry_document(prefix: &str, targets: &[BackendTarget]) -> String {
    let services: Vec<_> = targets
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "framework": t.config.backend().framework.as_str(),
                "port": t.port,
                "url": format!("http://{prefix}-{}:{}", t.name, t.port),
                "communication": t.communication.as_str(),
            })
        })
        .collect();
    let mut out = serde_json::to_string_pretty(&json!({ "services": services }))
        .unwrap_or_else(|_| "{}".into());
    out.push('\n');
    out
}
