//! The Configuration Model: a validated description of what to generate.
//!
//! A [`ProjectConfig`] can only be obtained through [`ProjectConfigBuilder`]
//! or by deserialising a JSON document, and both paths run the same
//! validation. Once built it is read-only.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::validation::ConfigValidator;
use crate::domain::value_objects::{
    Communication, CssSolution, Database, DeployTarget, Feature, Framework, Language,
    StateManagement,
};

pub const DEFAULT_BACKEND_PORT: u16 = 4000;
pub const DEFAULT_FRONTEND_PORT: u16 = 3000;

/// Names the workspace already uses for its own directories.
pub const RESERVED_SERVICE_NAMES: &[&str] = &["backend", "frontend", "gateway"];

// ── ProjectName ──────────────────────────────────────────────────────────────

/// Lowercase-with-hyphens identifier, safe as a directory and npm scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectName(String);

impl ProjectName {
    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let name = raw.into();
        let invalid = |reason: &str| DomainError::InvalidProjectName {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        if name.len() > 214 {
            return Err(invalid("name is longer than 214 characters"));
        }
        if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(invalid("name must start with a lowercase letter"));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(invalid(&format!("character '{bad}' is not allowed")));
        }
        if name.ends_with('-') || name.contains("--") {
            return Err(invalid("hyphens must separate words"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProjectName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ProjectName> for String {
    fn from(value: ProjectName) -> Self {
        value.0
    }
}

// ── StackChoice ──────────────────────────────────────────────────────────────

/// A (language, framework) pair for one side of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StackChoice {
    pub language: Language,
    pub framework: Framework,
}

impl StackChoice {
    pub const fn new(language: Language, framework: Framework) -> Self {
        Self {
            language,
            framework,
        }
    }
}

impl fmt::Display for StackChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.framework, self.language)
    }
}

// ── MicroserviceSpec ─────────────────────────────────────────────────────────

/// One extra backend sub-project.
///
/// `framework` and `features` are overrides. A present `features` set
/// REPLACES the workspace features for this service; it is never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroserviceSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<Framework>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<BTreeSet<Feature>>,
    #[serde(default)]
    pub communication: Communication,
}

impl MicroserviceSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            framework: None,
            features: None,
            communication: Communication::None,
        }
    }

    pub fn with_framework(mut self, framework: Framework) -> Self {
        self.framework = Some(framework);
        self
    }

    pub fn with_features(mut self, features: impl IntoIterator<Item = Feature>) -> Self {
        self.features = Some(features.into_iter().collect());
        self
    }

    pub fn with_communication(mut self, communication: Communication) -> Self {
        self.communication = communication;
        self
    }
}

// ── ProjectConfig ────────────────────────────────────────────────────────────

/// Validated, fully-resolved generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ConfigDocument")]
pub struct ProjectConfig {
    project_name: ProjectName,
    backend: StackChoice,
    frontend: StackChoice,
    databases: BTreeSet<Database>,
    features: BTreeSet<Feature>,
    microservices: Vec<MicroserviceSpec>,
    state_management: StateManagement,
    css_solution: CssSolution,
    deploy: BTreeSet<DeployTarget>,
    backend_port: u16,
    frontend_port: u16,
    docker_prefix: String,
}

impl ProjectConfig {
    pub fn builder(project_name: impl Into<String>) -> ProjectConfigBuilder {
        ProjectConfigBuilder::new(project_name)
    }

    /// Start a builder pre-filled with this configuration.
    pub fn to_builder(&self) -> ProjectConfigBuilder {
        ProjectConfigBuilder {
            project_name: self.project_name.as_str().to_string(),
            backend: self.backend,
            frontend: self.frontend,
            databases: self.databases.clone(),
            features: self.features.clone(),
            microservices: self.microservices.clone(),
            state_management: self.state_management,
            css_solution: self.css_solution,
            deploy: self.deploy.clone(),
            backend_port: self.backend_port,
            frontend_port: self.frontend_port,
            docker_prefix: Some(self.docker_prefix.clone()),
        }
    }

    pub fn project_name(&self) -> &ProjectName {
        &self.project_name
    }

    pub fn backend(&self) -> StackChoice {
        self.backend
    }

    pub fn frontend(&self) -> StackChoice {
        self.frontend
    }

    pub fn databases(&self) -> &BTreeSet<Database> {
        &self.databases
    }

    pub fn features(&self) -> &BTreeSet<Feature> {
        &self.features
    }

    pub fn microservices(&self) -> &[MicroserviceSpec] {
        &self.microservices
    }

    pub fn state_management(&self) -> StateManagement {
        self.state_management
    }

    pub fn css_solution(&self) -> CssSolution {
        self.css_solution
    }

    pub fn deploy(&self) -> &BTreeSet<DeployTarget> {
        &self.deploy
    }

    pub fn backend_port(&self) -> u16 {
        self.backend_port
    }

    pub fn frontend_port(&self) -> u16 {
        self.frontend_port
    }

    pub fn docker_prefix(&self) -> &str {
        &self.docker_prefix
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn has_database(&self, database: Database) -> bool {
        self.databases.contains(&database)
    }

    /// Port microservice `index` listens on.
    pub fn service_port(&self, index: usize) -> u16 {
        let offset = u16::try_from(index + 1).unwrap_or(u16::MAX);
        self.backend_port.saturating_add(offset)
    }

    /// Re-check every invariant. The assembler calls this before touching disk.
    pub fn validate(&self) -> Result<(), DomainError> {
        ConfigValidator::validate(self)
    }

    /// Effective configuration for one microservice.
    ///
    /// The workspace identity, ports and databases carry over. The backend
    /// framework is swapped when the service overrides it, and the feature
    /// set is replaced wholesale when the service declares its own.
    pub fn for_microservice(&self, service: &MicroserviceSpec) -> ProjectConfig {
        let mut effective = self.clone();
        if let Some(framework) = service.framework {
            effective.backend.framework = framework;
        }
        if let Some(features) = &service.features {
            effective.features = close_implications(features.iter().copied());
        }
        effective.microservices = Vec::new();
        effective
    }

    /// Every backend sub-project: the main backend first, then services in
    /// declaration order.
    pub fn backend_targets(&self) -> Vec<BackendTarget> {
        let mut targets = vec![BackendTarget {
            name: "backend".to_string(),
            port: self.backend_port,
            communication: Communication::None,
            config: self.clone(),
        }];
        targets.extend(
            self.microservices
                .iter()
                .enumerate()
                .map(|(index, service)| BackendTarget {
                    name: service.name.clone(),
                    port: self.service_port(index),
                    communication: service.communication,
                    config: self.for_microservice(service),
                }),
        );
        targets
    }

    /// Names of every sub-project directory under `apps/`.
    pub fn subproject_names(&self) -> Vec<String> {
        let mut names = vec!["backend".to_string(), "frontend".to_string()];
        names.extend(self.microservices.iter().map(|s| s.name.clone()));
        names
    }

    /// Pretty JSON document, the format the assembler persists.
    pub fn to_json(&self) -> Result<String, DomainError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DomainError::InvalidConfiguration(format!("cannot serialise: {e}")))
    }

    /// Parse and validate a JSON document.
    pub fn from_json(raw: &str) -> Result<Self, DomainError> {
        let document: ConfigDocument = serde_json::from_str(raw)
            .map_err(|e| DomainError::InvalidConfiguration(e.to_string()))?;
        Self::try_from(document)
    }
}

/// One backend sub-project together with the configuration it is generated
/// from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub name: String,
    pub port: u16,
    pub communication: Communication,
    pub config: ProjectConfig,
}

/// Add every implied feature until the set stops growing.
pub fn close_implications(features: impl IntoIterator<Item = Feature>) -> BTreeSet<Feature> {
    let mut closed: BTreeSet<Feature> = features.into_iter().collect();
    loop {
        let implied: Vec<Feature> = closed
            .iter()
            .flat_map(|f| f.implies().iter().copied())
            .filter(|f| !closed.contains(f))
            .collect();
        if implied.is_empty() {
            return closed;
        }
        closed.extend(implied);
    }
}

// ── Builder ──────────────────────────────────────────────────────────────────

/// Fluent construction of a [`ProjectConfig`].
///
/// Nothing is checked until [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ProjectConfigBuilder {
    project_name: String,
    backend: StackChoice,
    frontend: StackChoice,
    databases: BTreeSet<Database>,
    features: BTreeSet<Feature>,
    microservices: Vec<MicroserviceSpec>,
    state_management: StateManagement,
    css_solution: CssSolution,
    deploy: BTreeSet<DeployTarget>,
    backend_port: u16,
    frontend_port: u16,
    docker_prefix: Option<String>,
}

impl ProjectConfigBuilder {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            backend: StackChoice::new(Language::TypeScript, Framework::Express),
            frontend: StackChoice::new(Language::TypeScript, Framework::React),
            databases: BTreeSet::new(),
            features: BTreeSet::new(),
            microservices: Vec::new(),
            state_management: StateManagement::default(),
            css_solution: CssSolution::default(),
            deploy: BTreeSet::new(),
            backend_port: DEFAULT_BACKEND_PORT,
            frontend_port: DEFAULT_FRONTEND_PORT,
            docker_prefix: None,
        }
    }

    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = name.into();
        self
    }

    pub fn backend(mut self, language: Language, framework: Framework) -> Self {
        self.backend = StackChoice::new(language, framework);
        self
    }

    pub fn frontend(mut self, language: Language, framework: Framework) -> Self {
        self.frontend = StackChoice::new(language, framework);
        self
    }

    pub fn database(mut self, database: Database) -> Self {
        self.databases.insert(database);
        self
    }

    pub fn databases(mut self, databases: impl IntoIterator<Item = Database>) -> Self {
        self.databases.extend(databases);
        self
    }

    pub fn feature(mut self, feature: Feature) -> Self {
        self.features.insert(feature);
        self
    }

    pub fn features(mut self, features: impl IntoIterator<Item = Feature>) -> Self {
        self.features.extend(features);
        self
    }

    pub fn microservice(mut self, service: MicroserviceSpec) -> Self {
        self.microservices.push(service);
        self
    }

    pub fn state_management(mut self, state: StateManagement) -> Self {
        self.state_management = state;
        self
    }

    pub fn css_solution(mut self, css: CssSolution) -> Self {
        self.css_solution = css;
        self
    }

    pub fn deploy_target(mut self, target: DeployTarget) -> Self {
        self.deploy.insert(target);
        self
    }

    pub fn backend_port(mut self, port: u16) -> Self {
        self.backend_port = port;
        self
    }

    pub fn frontend_port(mut self, port: u16) -> Self {
        self.frontend_port = port;
        self
    }

    pub fn docker_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.docker_prefix = Some(prefix.into());
        self
    }

    /// Close feature implications, apply defaults and validate.
    pub fn build(self) -> Result<ProjectConfig, DomainError> {
        let project_name = ProjectName::parse(self.project_name)?;
        let docker_prefix = self
            .docker_prefix
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| project_name.as_str().to_string());

        let microservices = self
            .microservices
            .into_iter()
            .map(|mut service| {
                service.features = service.features.map(close_implications);
                service
            })
            .collect();

        let config = ProjectConfig {
            project_name,
            backend: self.backend,
            frontend: self.frontend,
            databases: self.databases,
            features: close_implications(self.features),
            microservices,
            state_management: self.state_management,
            css_solution: self.css_solution,
            deploy: self.deploy,
            backend_port: self.backend_port,
            frontend_port: self.frontend_port,
            docker_prefix,
        };
        config.validate()?;
        Ok(config)
    }
}

// ── JSON document ────────────────────────────────────────────────────────────

/// Raw, unvalidated shape of the configuration document.
///
/// Arrays are accepted with duplicates and collapse into sets. The legacy
/// `additionalFeatures` list is merged into `features`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    pub project_name: String,
    pub backend: StackChoice,
    pub frontend: StackChoice,
    #[serde(default)]
    pub databases: Vec<Database>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub additional_features: Vec<Feature>,
    #[serde(default)]
    pub microservices: Vec<MicroserviceSpec>,
    #[serde(default)]
    pub state_management: Option<StateManagement>,
    #[serde(default)]
    pub css_solution: Option<CssSolution>,
    #[serde(default)]
    pub deploy: Vec<DeployTarget>,
    #[serde(default)]
    pub backend_port: Option<u16>,
    #[serde(default)]
    pub frontend_port: Option<u16>,
    #[serde(default)]
    pub docker_prefix: Option<String>,
}

impl TryFrom<ConfigDocument> for ProjectConfig {
    type Error = DomainError;

    fn try_from(doc: ConfigDocument) -> Result<Self, Self::Error> {
        let mut builder = ProjectConfigBuilder::new(doc.project_name)
            .backend(doc.backend.language, doc.backend.framework)
            .frontend(doc.frontend.language, doc.frontend.framework)
            .databases(doc.databases)
            .features(doc.features)
            .features(doc.additional_features)
            .state_management(doc.state_management.unwrap_or_default())
            .css_solution(doc.css_solution.unwrap_or_default())
            .backend_port(doc.backend_port.unwrap_or(DEFAULT_BACKEND_PORT))
            .frontend_port(doc.frontend_port.unwrap_or(DEFAULT_FRONTEND_PORT));

        for service in doc.microservices {
            builder = builder.microservice(service);
        }
        for target in doc.deploy {
            builder = builder.deploy_target(target);
        }
        if let Some(prefix) = doc.docker_prefix {
            builder = builder.docker_prefix(prefix);
        }
        builder.build()
    }
}

/// Service names that appear more than once, in first-seen order.
pub(crate) fn duplicate_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut dups = Vec::new();
    for name in names {
        if !seen.insert(name) && !dups.contains(&name) {
            dups.push(name);
        }
    }
    dups
}
