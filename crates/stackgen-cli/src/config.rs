//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value. The
//! CLI layer owns config; the core crate never sees it.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. `STACKGEN_*` environment variables, `__` between sections
//!    (`STACKGEN_DEFAULTS__BACKEND_PORT=5000`)
//! 3. The TOML config file (`--config` or the platform default path)
//! 4. Built-in defaults (always present)

use std::path::{Path, PathBuf};

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use stackgen_core::domain::{DEFAULT_BACKEND_PORT, DEFAULT_FRONTEND_PORT};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "STACKGEN";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Stack used when `stackgen new` is given no flags.
    pub defaults: Defaults,
    pub templates: TemplateConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub backend_framework: String,
    pub backend_language: String,
    pub frontend_framework: String,
    pub frontend_language: String,
    pub backend_port: u16,
    pub frontend_port: u16,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            backend_framework: "express".into(),
            backend_language: "typescript".into(),
            frontend_framework: "react".into(),
            frontend_language: "typescript".into(),
            backend_port: DEFAULT_BACKEND_PORT,
            frontend_port: DEFAULT_FRONTEND_PORT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Searched before the built-in template locations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            no_color: false,
            format: "human".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write logs to this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the
    /// environment.
    ///
    /// An explicit `config_file` must exist; the default location is
    /// optional.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        let path = Self::config_path(config_file.map(PathBuf::as_path));
        let defaults = Config::try_from(&Self::default())
            .context("Failed to serialise built-in defaults")?;

        let settings = Config::builder()
            .add_source(defaults)
            .add_source(
                File::from(path.clone())
                    .format(FileFormat::Toml)
                    .required(config_file.is_some()),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Read only the config file, ignoring environment overrides.
    ///
    /// Used by commands that write the file back, so overrides are never
    /// persisted. A missing file yields the defaults.
    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Path of the configuration file: `explicit` when given, else the
    /// platform config directory, falling back to `.stackgen.toml` in the
    /// current directory.
    pub fn config_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        directories::ProjectDirs::from("dev", "stackgen", "stackgen")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".stackgen.toml"))
    }
}
