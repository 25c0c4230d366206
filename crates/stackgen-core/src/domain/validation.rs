//! Invariant checks for [`ProjectConfig`].
//!
//! Validation stops at the first violation. Order matters for error quality:
//! structural problems (names, categories) are reported before semantic
//! ones (features, ports).

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::capabilities::framework_def;
use crate::domain::config::{ProjectConfig, RESERVED_SERVICE_NAMES, duplicate_names, ProjectName};
use crate::domain::error::DomainError;
use crate::domain::value_objects::{
    CssSolution, Feature, Framework, Language, StateManagement, TemplateCategory,
};

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &ProjectConfig) -> Result<(), DomainError> {
        let backend = config.backend();
        let frontend = config.frontend();

        Self::check_stack(backend.framework, backend.language, TemplateCategory::Backend)?;
        Self::check_stack(frontend.framework, frontend.language, TemplateCategory::Frontend)?;
        Self::check_features(backend.framework, config.features().iter().copied())?;
        Self::check_frontend_options(config)?;
        Self::check_services(config)?;
        Self::check_ports(config)?;

        if config.docker_prefix().chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidConfiguration(
                "dockerPrefix cannot contain whitespace".into(),
            ));
        }

        debug!(project = %config.project_name(), "configuration validated");
        Ok(())
    }

    fn check_stack(
        framework: Framework,
        language: Language,
        expected: TemplateCategory,
    ) -> Result<(), DomainError> {
        let def = framework_def(framework);
        if def.category != expected {
            return Err(DomainError::WrongCategory {
                framework: framework.to_string(),
                expected: expected.as_str(),
            });
        }
        if !def.supports_language(language) {
            let reason = if def.requires_static_typing() {
                "requires static typing".to_string()
            } else {
                format!("no {language} template is available")
            };
            return Err(DomainError::IncompatibleLanguage {
                framework: framework.to_string(),
                language: language.to_string(),
                reason,
            });
        }
        Ok(())
    }

    fn check_features(
        framework: Framework,
        features: impl IntoIterator<Item = Feature>,
    ) -> Result<(), DomainError> {
        let def = framework_def(framework);
        for feature in features {
            if !def.supports_feature(feature) {
                return Err(DomainError::UnsupportedFeature {
                    feature: feature.to_string(),
                    framework: framework.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_frontend_options(config: &ProjectConfig) -> Result<(), DomainError> {
        let framework = config.frontend().framework;
        let state_ok = match config.state_management() {
            StateManagement::Vuex => framework == Framework::Vue,
            StateManagement::Redux | StateManagement::Recoil => framework == Framework::React,
            StateManagement::Zustand | StateManagement::None => true,
        };
        if !state_ok {
            return Err(DomainError::IncompatibleOption {
                option: config.state_management().to_string(),
                framework: framework.to_string(),
            });
        }
        if config.css_solution() == CssSolution::Styled && framework != Framework::React {
            return Err(DomainError::IncompatibleOption {
                option: CssSolution::Styled.to_string(),
                framework: framework.to_string(),
            });
        }
        Ok(())
    }

    fn check_services(config: &ProjectConfig) -> Result<(), DomainError> {
        let backend_language = config.backend().language;
        for service in config.microservices() {
            ProjectName::parse(service.name.as_str())?;
            if RESERVED_SERVICE_NAMES.contains(&service.name.as_str()) {
                return Err(DomainError::ReservedServiceName {
                    name: service.name.clone(),
                });
            }
            let framework = service.framework.unwrap_or(config.backend().framework);
            Self::check_stack(framework, backend_language, TemplateCategory::Backend)?;

            let features = service
                .features
                .as_ref()
                .unwrap_or(config.features())
                .iter()
                .copied();
            Self::check_features(framework, features)?;
        }

        if let Some(name) =
            duplicate_names(config.microservices().iter().map(|s| s.name.as_str())).first()
        {
            return Err(DomainError::DuplicateService {
                name: (*name).to_string(),
            });
        }
        Ok(())
    }

    fn check_ports(config: &ProjectConfig) -> Result<(), DomainError> {
        let mut owners: BTreeMap<u16, String> = BTreeMap::new();
        let mut claim = |port: u16, owner: String| -> Result<(), DomainError> {
            if port == 0 {
                return Err(DomainError::InvalidConfiguration(format!(
                    "{owner} port cannot be 0"
                )));
            }
            if let Some(first) = owners.get(&port) {
                return Err(DomainError::PortConflict {
                    port,
                    first: first.clone(),
                    second: owner,
                });
            }
            owners.insert(port, owner);
            Ok(())
        };

        claim(config.backend_port(), "backend".into())?;
        claim(config.frontend_port(), "frontend".into())?;
        for (index, service) in config.microservices().iter().enumerate() {
            if usize::from(config.backend_port()) + index + 1 > usize::from(u16::MAX) {
                return Err(DomainError::InvalidConfiguration(format!(
                    "no port left for microservice '{}'",
                    service.name
                )));
            }
            claim(config.service_port(index), service.name.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::MicroserviceSpec;
    use crate::domain::value_objects::Database;

    #[test]
    fn nest_with_javascript_is_rejected() {
        let err = ProjectConfig::builder("demo")
            .backend(Language::JavaScript, Framework::NestJs)
            .build()
            .unwrap_err();
        assert!(matches!(err, DomainError::IncompatibleLanguage { .. }));
        assert!(err.to_string().contains("static typing"));
    }

    #[test]
    fn frontend_framework_as_backend_is_rejected() {
        let err = ProjectConfig::builder("demo")
            .backend(Language::TypeScript, Framework::React)
            .build()
            .unwrap_err();
        assert!(matches!(err, DomainError::WrongCategory { .. }));
    }

    #[test]
    fn koa_rejects_passport() {
        let err = ProjectConfig::builder("demo")
            .backend(Language::TypeScript, Framework::Koa)
            .feature(Feature::AuthPassport)
            .build()
            .unwrap_err();
        assert!(matches!(err, DomainError::UnsupportedFeature { .. }));
    }

    #[test]
    fn koa_service_inheriting_oauth_is_rejected() {
        let err = ProjectConfig::builder("demo")
            .feature(Feature::AuthOAuth)
            .microservice(MicroserviceSpec::new("mail").with_framework(Framework::Koa))
            .build()
            .unwrap_err();
        assert!(matches!(err, DomainError::UnsupportedFeature { .. }));
    }

    #[test]
    fn koa_service_with_own_features_is_accepted() {
        let config = ProjectConfig::builder("demo")
            .feature(Feature::AuthOAuth)
            .microservice(
                MicroserviceSpec::new("mail")
                    .with_framework(Framework::Koa)
                    .with_features([Feature::Auth]),
            )
            .build();
        assert!(config.is_ok());
    }

    #[test]
    fn reserved_and_duplicate_service_names() {
        let reserved = ProjectConfig::builder("demo")
            .microservice(MicroserviceSpec::new("frontend"))
            .build()
            .unwrap_err();
        assert!(matches!(reserved, DomainError::ReservedServiceName { .. }));

        let duplicate = ProjectConfig::builder("demo")
            .microservice(MicroserviceSpec::new("mail"))
            .microservice(MicroserviceSpec::new("mail"))
            .build()
            .unwrap_err();
        assert!(matches!(duplicate, DomainError::DuplicateService { .. }));
    }

    #[test]
    fn service_port_colliding_with_frontend_is_rejected() {
        let err = ProjectConfig::builder("demo")
            .backend_port(2999)
            .frontend_port(3000)
            .microservice(MicroserviceSpec::new("mail"))
            .build()
            .unwrap_err();
        assert!(matches!(err, DomainError::PortConflict { port: 3000, .. }));
    }

    #[test]
    fn vuex_requires_vue() {
        let err = ProjectConfig::builder("demo")
            .state_management(StateManagement::Vuex)
            .build()
            .unwrap_err();
        assert!(matches!(err, DomainError::IncompatibleOption { .. }));

        let ok = ProjectConfig::builder("demo")
            .frontend(Language::TypeScript, Framework::Vue)
            .state_management(StateManagement::Vuex)
            .database(Database::Mongo)
            .build();
        assert!(ok.is_ok());
    }
}
