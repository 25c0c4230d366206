//! Domain value objects: languages, frameworks, databases and feature flags.
//!
//! # Design
//!
//! These are pure value types: `Copy`, equality-by-value, no identity.
//! They hold NO capability logic. Framework compatibility lives in
//! `capabilities.rs`. This file defines the types, their string
//! representations, and their `FromStr` parsers.
//!
//! The serde names match the JSON configuration document, so a value
//! always serialises to the same string `as_str` returns.

use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn unknown(kind: &'static str, value: &str) -> DomainError {
    DomainError::UnknownValue {
        kind,
        value: value.to_string(),
    }
}

// ── Language ─────────────────────────────────────────────────────────────────

/// Source language of a generated sub-project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
}

impl Language {
    pub const ALL: &'static [Language] = &[Self::TypeScript, Self::JavaScript];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
        }
    }

    /// Extension for plain modules (`ts` / `js`).
    pub const fn file_extension(&self) -> &'static str {
        match self {
            Self::TypeScript => "ts",
            Self::JavaScript => "js",
        }
    }

    /// Extension for component modules (`tsx` / `jsx`).
    pub const fn component_extension(&self) -> &'static str {
        match self {
            Self::TypeScript => "tsx",
            Self::JavaScript => "jsx",
        }
    }

    pub const fn is_statically_typed(&self) -> bool {
        matches!(self, Self::TypeScript)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "typescript" | "ts" => Ok(Self::TypeScript),
            "javascript" | "js" => Ok(Self::JavaScript),
            other => Err(unknown("language", other)),
        }
    }
}

// ── TemplateCategory ─────────────────────────────────────────────────────────

/// Which side of the stack a template belongs to.
///
/// Doubles as the first path segment under the templates directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateCategory {
    Backend,
    Frontend,
}

impl TemplateCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Frontend => "frontend",
        }
    }
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "backend" | "server" | "api" => Ok(Self::Backend),
            "frontend" | "client" | "web" => Ok(Self::Frontend),
            other => Err(unknown("template category", other)),
        }
    }
}

// ── Framework ────────────────────────────────────────────────────────────────

/// A web framework. Its category and language support are registered in
/// `capabilities.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Express,
    Koa,
    NestJs,
    React,
    Vue,
}

impl Framework {
    pub const ALL: &'static [Framework] =
        &[Self::Express, Self::Koa, Self::NestJs, Self::React, Self::Vue];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Express => "express",
            Self::Koa => "koa",
            Self::NestJs => "nestjs",
            Self::React => "react",
            Self::Vue => "vue",
        }
    }

    /// Category this framework scaffolds. Delegates to the registry.
    pub fn category(self) -> TemplateCategory {
        crate::domain::capabilities::framework_def(self).category
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "express" | "expressjs" => Ok(Self::Express),
            "koa" | "koajs" => Ok(Self::Koa),
            "nestjs" | "nest" => Ok(Self::NestJs),
            "react" | "reactjs" => Ok(Self::React),
            "vue" | "vuejs" => Ok(Self::Vue),
            other => Err(unknown("framework", other)),
        }
    }
}

// ── Database ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Postgres,
    Mongo,
}

impl Database {
    pub const ALL: &'static [Database] = &[Self::Postgres, Self::Mongo];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mongo => "mongo",
        }
    }

    pub const fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::Mongo => 27017,
        }
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Database {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mongo" | "mongodb" => Ok(Self::Mongo),
            other => Err(unknown("database", other)),
        }
    }
}

// ── Feature ──────────────────────────────────────────────────────────────────

/// Optional capability flag.
///
/// Some flags imply others; see [`Feature::implies`]. Implications are
/// closed when a configuration is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    #[serde(rename = "docker")]
    Docker,
    #[serde(rename = "auth")]
    Auth,
    #[serde(rename = "testing")]
    Testing,
    #[serde(rename = "ci-cd")]
    CiCd,
    #[serde(rename = "graphql")]
    GraphQl,
    #[serde(rename = "auth-passport")]
    AuthPassport,
    #[serde(rename = "auth-oauth")]
    AuthOAuth,
    #[serde(rename = "i18n")]
    I18n,
    #[serde(rename = "theming")]
    Theming,
    #[serde(rename = "analytics")]
    Analytics,
    #[serde(rename = "errorTracking")]
    ErrorTracking,
    #[serde(rename = "seo")]
    Seo,
    #[serde(rename = "pwa")]
    Pwa,
    #[serde(rename = "compression")]
    Compression,
    #[serde(rename = "image-optimization")]
    ImageOptimization,
    #[serde(rename = "bundle-analyze")]
    BundleAnalyze,
}

impl Feature {
    pub const ALL: &'static [Feature] = &[
        Self::Docker,
        Self::Auth,
        Self::Testing,
        Self::CiCd,
        Self::GraphQl,
        Self::AuthPassport,
        Self::AuthOAuth,
        Self::I18n,
        Self::Theming,
        Self::Analytics,
        Self::ErrorTracking,
        Self::Seo,
        Self::Pwa,
        Self::Compression,
        Self::ImageOptimization,
        Self::BundleAnalyze,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Auth => "auth",
            Self::Testing => "testing",
            Self::CiCd => "ci-cd",
            Self::GraphQl => "graphql",
            Self::AuthPassport => "auth-passport",
            Self::AuthOAuth => "auth-oauth",
            Self::I18n => "i18n",
            Self::Theming => "theming",
            Self::Analytics => "analytics",
            Self::ErrorTracking => "errorTracking",
            Self::Seo => "seo",
            Self::Pwa => "pwa",
            Self::Compression => "compression",
            Self::ImageOptimization => "image-optimization",
            Self::BundleAnalyze => "bundle-analyze",
        }
    }

    /// Name of the render-context flag, e.g. `FEATURE_AUTH_OAUTH`.
    pub fn variable_name(&self) -> String {
        let snake: String = self
            .as_str()
            .chars()
            .flat_map(|c| {
                if c == '-' {
                    vec!['_']
                } else if c.is_ascii_uppercase() {
                    vec!['_', c]
                } else {
                    vec![c.to_ascii_uppercase()]
                }
            })
            .collect();
        format!("FEATURE_{snake}")
    }

    /// Flags this one cannot work without.
    pub const fn implies(&self) -> &'static [Feature] {
        match self {
            Self::AuthOAuth => &[Self::AuthPassport, Self::Auth],
            Self::AuthPassport => &[Self::Auth],
            _ => &[],
        }
    }

    /// Flags that only affect the frontend build.
    pub const fn is_frontend_optimization(&self) -> bool {
        matches!(
            self,
            Self::Compression | Self::ImageOptimization | Self::BundleAnalyze | Self::Pwa
        )
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        let feature = match lowered.as_str() {
            "docker" => Self::Docker,
            "auth" => Self::Auth,
            "testing" | "tests" => Self::Testing,
            "ci-cd" | "cicd" | "ci" => Self::CiCd,
            "graphql" => Self::GraphQl,
            "auth-passport" | "passport" => Self::AuthPassport,
            "auth-oauth" | "oauth" => Self::AuthOAuth,
            "i18n" => Self::I18n,
            "theming" => Self::Theming,
            "analytics" => Self::Analytics,
            "errortracking" | "error-tracking" => Self::ErrorTracking,
            "seo" => Self::Seo,
            "pwa" => Self::Pwa,
            "compression" => Self::Compression,
            "image-optimization" => Self::ImageOptimization,
            "bundle-analyze" => Self::BundleAnalyze,
            _ => return Err(unknown("feature", s)),
        };
        Ok(feature)
    }
}

// ── Communication ────────────────────────────────────────────────────────────

/// How a microservice talks to its peers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Communication {
    Grpc,
    MessageQueue,
    #[default]
    None,
}

impl Communication {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Grpc => "grpc",
            Self::MessageQueue => "message-queue",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Communication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Communication {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grpc" | "rpc" => Ok(Self::Grpc),
            "message-queue" | "mq" | "queue" => Ok(Self::MessageQueue),
            "none" | "" => Ok(Self::None),
            other => Err(unknown("communication mode", other)),
        }
    }
}

// ── StateManagement ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateManagement {
    Redux,
    Vuex,
    Zustand,
    Recoil,
    #[default]
    None,
}

impl StateManagement {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Redux => "redux",
            Self::Vuex => "vuex",
            Self::Zustand => "zustand",
            Self::Recoil => "recoil",
            Self::None => "none",
        }
    }

    /// npm packages the frontend needs for this choice.
    pub const fn packages(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Redux => &[("@reduxjs/toolkit", "^2.2.0"), ("react-redux", "^9.1.0")],
            Self::Vuex => &[("vuex", "^4.1.0")],
            Self::Zustand => &[("zustand", "^4.5.0")],
            Self::Recoil => &[("recoil", "^0.7.7")],
            Self::None => &[],
        }
    }
}

impl fmt::Display for StateManagement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateManagement {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redux" => Ok(Self::Redux),
            "vuex" => Ok(Self::Vuex),
            "zustand" => Ok(Self::Zustand),
            "recoil" => Ok(Self::Recoil),
            "none" => Ok(Self::None),
            other => Err(unknown("state management", other)),
        }
    }
}

// ── CssSolution ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CssSolution {
    #[default]
    Modules,
    Styled,
    Tailwind,
    Sass,
    Emotion,
}

impl CssSolution {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Modules => "modules",
            Self::Styled => "styled",
            Self::Tailwind => "tailwind",
            Self::Sass => "sass",
            Self::Emotion => "emotion",
        }
    }

    pub const fn dev_packages(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Modules => &[],
            Self::Styled => &[("styled-components", "^6.1.0")],
            Self::Tailwind => &[
                ("tailwindcss", "^3.4.0"),
                ("postcss", "^8.4.0"),
                ("autoprefixer", "^10.4.0"),
            ],
            Self::Sass => &[("sass", "^1.71.0")],
            Self::Emotion => &[("@emotion/react", "^11.11.0"), ("@emotion/styled", "^11.11.0")],
        }
    }
}

impl fmt::Display for CssSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CssSolution {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "modules" | "css-modules" => Ok(Self::Modules),
            "styled" | "styled-components" => Ok(Self::Styled),
            "tailwind" | "tailwindcss" => Ok(Self::Tailwind),
            "sass" | "scss" => Ok(Self::Sass),
            "emotion" => Ok(Self::Emotion),
            other => Err(unknown("css solution", other)),
        }
    }
}

// ── DeployTarget ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployTarget {
    Docker,
    Kubernetes,
    Aws,
    Azure,
    Gcp,
    Serverless,
}

impl DeployTarget {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Kubernetes => "kubernetes",
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Gcp => "gcp",
            Self::Serverless => "serverless",
        }
    }
}

impl fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeployTarget {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "kubernetes" | "k8s" => Ok(Self::Kubernetes),
            "aws" => Ok(Self::Aws),
            "azure" => Ok(Self::Azure),
            "gcp" | "google" => Ok(Self::Gcp),
            "serverless" => Ok(Self::Serverless),
            other => Err(unknown("deploy target", other)),
        }
    }
}
