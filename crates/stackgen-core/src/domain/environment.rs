//! Deployment stages and their environment variable sets.
//!
//! Every stage is produced by the same function from a [`StageProfile`],
//! so all stages carry exactly the same keys in the same order. Only the
//! values differ: host names, database names and public URLs.

use std::fmt;
use std::str::FromStr;

use crate::domain::config::ProjectConfig;
use crate::domain::error::DomainError;
use crate::domain::value_objects::{Communication, Database, Feature};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Development,
    Staging,
    Production,
}

impl Stage {
    pub const ALL: &'static [Stage] = &[Self::Development, Self::Staging, Self::Production];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    /// File name under `environments/`.
    pub fn file_name(&self) -> String {
        format!(".env.{}", self.as_str())
    }

    const fn profile(&self) -> StageProfile {
        match self {
            Self::Development => StageProfile {
                log_level: "debug",
                db_suffix: "dev",
                local: true,
                public_prefix: "",
            },
            Self::Staging => StageProfile {
                log_level: "debug",
                db_suffix: "staging",
                local: false,
                public_prefix: "staging.",
            },
            Self::Production => StageProfile {
                log_level: "info",
                db_suffix: "prod",
                local: false,
                public_prefix: "",
            },
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" | "stage" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(DomainError::UnknownValue {
                kind: "stage",
                value: other.to_string(),
            }),
        }
    }
}

/// The only stage-specific inputs.
#[derive(Debug, Clone, Copy)]
struct StageProfile {
    log_level: &'static str,
    db_suffix: &'static str,
    /// Services reachable on localhost rather than by container name.
    local: bool,
    /// Prepended to the public domain, e.g. `staging.`.
    public_prefix: &'static str,
}

/// First port handed to gRPC servers; service `i` binds `GRPC_BASE_PORT + i`.
pub const GRPC_BASE_PORT: u16 = 50051;

/// Default gRPC port of the `index`-th microservice (0-based).
pub fn grpc_port(index: usize) -> u16 {
    GRPC_BASE_PORT.saturating_add(u16::try_from(index).unwrap_or(u16::MAX))
}

/// Ordered variable set for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDescriptor {
    stage: Stage,
    vars: Vec<(String, String)>,
}

impl StageDescriptor {
    pub fn for_stage(stage: Stage, config: &ProjectConfig) -> Self {
        let profile = stage.profile();
        let project = config.project_name().as_str();
        let prefix = config.docker_prefix();
        let db_name = format!("{}_{}", project.replace('-', "_"), profile.db_suffix);

        let host = |service: &str| {
            if profile.local {
                "localhost".to_string()
            } else {
                format!("{prefix}-{service}")
            }
        };
        let api_url = if profile.local {
            format!("http://localhost:{}", config.backend_port())
        } else {
            format!("https://{}api.{project}.com", profile.public_prefix.replace('.', "-"))
        };
        let frontend_url = if profile.local {
            format!("http://localhost:{}", config.frontend_port())
        } else {
            format!("https://{}{project}.com", profile.public_prefix)
        };

        let targets = config.backend_targets();
        let any_target = |feature: Feature| targets.iter().any(|t| t.config.has_feature(feature));

        let mut vars = Vec::new();
        let mut set = |key: &str, value: String| vars.push((key.to_string(), value));

        set("NODE_ENV", stage.as_str().to_string());
        set("LOG_LEVEL", profile.log_level.to_string());
        set("PORT", config.backend_port().to_string());
        set("API_BASE_URL", api_url.clone());
        set("FRONTEND_URL", frontend_url);

        if config.has_database(Database::Postgres) {
            set("DB_HOST", host("postgres"));
            set("DB_PORT", Database::Postgres.default_port().to_string());
            set("DB_USER", "app_user".to_string());
            set("DB_PASSWORD", "app_password".to_string());
            set("DB_NAME", db_name.clone());
        }
        if config.has_database(Database::Mongo) {
            set(
                "MONGO_URI",
                format!(
                    "mongodb://{}:{}/{db_name}",
                    host("mongodb"),
                    Database::Mongo.default_port()
                ),
            );
        }
        if any_target(Feature::Auth) {
            set("JWT_SECRET", format!("change-me-{}", stage.as_str()));
        }
        if any_target(Feature::AuthOAuth) {
            set("GOOGLE_CLIENT_ID", String::new());
            set("GOOGLE_CLIENT_SECRET", String::new());
            set(
                "GOOGLE_CALLBACK_URL",
                format!("{api_url}/api/auth/google/callback"),
            );
        }
        if any_target(Feature::ErrorTracking) {
            set("SENTRY_DSN", String::new());
        }
        if targets
            .iter()
            .any(|t| t.communication == Communication::MessageQueue)
        {
            set("AMQP_URL", format!("amqp://{}:5672", host("rabbitmq")));
        }
        for (index, target) in targets.iter().skip(1).enumerate() {
            set(&service_port_key(&target.name), target.port.to_string());
            set(
                &service_url_key(&target.name),
                format!("http://{}:{}", host(&target.name), target.port),
            );
            if target.communication == Communication::Grpc {
                set(&service_grpc_port_key(&target.name), grpc_port(index).to_string());
            }
        }

        Self { stage, vars }
    }

    /// Descriptors for every stage, in [`Stage::ALL`] order.
    pub fn all(config: &ProjectConfig) -> Vec<Self> {
        Stage::ALL
            .iter()
            .map(|stage| Self::for_stage(*stage, config))
            .collect()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|(k, _)| k.as_str())
    }

    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    /// Dotenv file body.
    pub fn render(&self) -> String {
        let mut out = format!(
            "# {} environment variables\n\n",
            self.stage.as_str().to_ascii_uppercase()
        );
        for (key, value) in &self.vars {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}

/// `billing-api` -> `BILLING_API_URL`.
pub fn service_url_key(service: &str) -> String {
    format!("{}_URL", service_env_prefix(service))
}

/// `billing-api` -> `BILLING_API_PORT`.
pub fn service_port_key(service: &str) -> String {
    format!("{}_PORT", service_env_prefix(service))
}

/// `billing-api` -> `BILLING_API_GRPC_PORT`.
pub fn service_grpc_port_key(service: &str) -> String {
    format!("{}_GRPC_PORT", service_env_prefix(service))
}

/// `billing-api` -> `BILLING_API`.
pub fn service_env_prefix(service: &str) -> String {
    service.replace('-', "_").to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::MicroserviceSpec;

    fn config() -> ProjectConfig {
        ProjectConfig::builder("demo-shop")
            .database(Database::Postgres)
            .database(Database::Mongo)
            .feature(Feature::AuthOAuth)
            .microservice(
                MicroserviceSpec::new("billing").with_communication(Communication::MessageQueue),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn every_stage_has_the_same_keys_in_the_same_order() {
        let stages = StageDescriptor::all(&config());
        let first: Vec<_> = stages[0].keys().collect();
        for descriptor in &stages[1..] {
            assert_eq!(descriptor.keys().collect::<Vec<_>>(), first);
        }
        assert!(first.contains(&"BILLING_URL"));
        assert!(first.contains(&"BILLING_PORT"));
        assert!(first.contains(&"AMQP_URL"));
        assert!(first.contains(&"GOOGLE_CLIENT_ID"));
    }

    #[test]
    fn stage_values_differ_where_expected() {
        let config = config();
        let dev = StageDescriptor::for_stage(Stage::Development, &config);
        let staging = StageDescriptor::for_stage(Stage::Staging, &config);
        let prod = StageDescriptor::for_stage(Stage::Production, &config);

        assert_eq!(dev.get("DB_HOST"), Some("localhost"));
        assert_eq!(staging.get("DB_HOST"), Some("demo-shop-postgres"));
        assert_eq!(staging.get("NODE_ENV"), Some("staging"));
        assert_eq!(staging.get("DB_NAME"), Some("demo_shop_staging"));
        assert_eq!(
            staging.get("API_BASE_URL"),
            Some("https://staging-api.demo-shop.com")
        );
        assert_eq!(staging.get("FRONTEND_URL"), Some("https://staging.demo-shop.com"));
        assert_eq!(prod.get("API_BASE_URL"), Some("https://api.demo-shop.com"));
        assert_eq!(prod.get("LOG_LEVEL"), Some("info"));
        assert_eq!(
            prod.get("MONGO_URI"),
            Some("mongodb://demo-shop-mongodb:27017/demo_shop_prod")
        );
    }

    #[test]
    fn grpc_services_get_their_port_in_every_stage() {
        let config = ProjectConfig::builder("demo")
            .microservice(MicroserviceSpec::new("mailer"))
            .microservice(MicroserviceSpec::new("billing").with_communication(Communication::Grpc))
            .build()
            .unwrap();
        for descriptor in StageDescriptor::all(&config) {
            assert_eq!(descriptor.get("BILLING_GRPC_PORT"), Some("50052"));
            assert_eq!(descriptor.get("MAILER_GRPC_PORT"), None);
        }
    }

    #[test]
    fn unselected_features_contribute_no_keys() {
        let config = ProjectConfig::builder("demo").build().unwrap();
        let dev = StageDescriptor::for_stage(Stage::Development, &config);
        let keys: Vec<_> = dev.keys().collect();
        assert_eq!(
            keys,
            vec!["NODE_ENV", "LOG_LEVEL", "PORT", "API_BASE_URL", "FRONTEND_URL"]
        );
    }

    #[test]
    fn render_is_one_assignment_per_line() {
        let config = ProjectConfig::builder("demo").build().unwrap();
        let text = StageDescriptor::for_stage(Stage::Staging, &config).render();
        assert!(text.starts_with("# STAGING environment variables\n\n"));
        assert!(text.contains("NODE_ENV=staging\n"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn service_keys_are_screaming_snake() {
        assert_eq!(service_url_key("billing-api"), "BILLING_API_URL");
        assert_eq!(service_port_key("billing-api"), "BILLING_API_PORT");
        assert_eq!(service_grpc_port_key("billing-api"), "BILLING_API_GRPC_PORT");
    }
}
