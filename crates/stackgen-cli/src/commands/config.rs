//! `stackgen config`: read and write configuration values.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use stackgen_core::domain::{Framework, Language};

use crate::{
    cli::ConfigCommands,
    commands::init::write_config,
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

/// Every key `get` and `set` understand.
pub const KEYS: &[&str] = &[
    "defaults.backend_framework",
    "defaults.backend_language",
    "defaults.frontend_framework",
    "defaults.frontend_language",
    "defaults.backend_port",
    "defaults.frontend_port",
    "templates.local_path",
    "output.no_color",
    "output.format",
    "logging.file",
];

/// Dispatch to the correct config subcommand.
pub fn execute(
    cmd: ConfigCommands,
    config: AppConfig,
    explicit: Option<&Path>,
    output: OutputManager,
) -> CliResult<()> {
    match cmd {
        ConfigCommands::Get { key } => {
            let value = get_config_value(&config, &key)?;
            output.print(&format!("{key} = {value}"))?;
        }

        ConfigCommands::Set { key, value } => {
            // Edit the file alone so environment overrides are not persisted.
            let path = AppConfig::config_path(explicit);
            let mut on_disk =
                AppConfig::load_file(&path).with_cli_context(|| "reading configuration file")?;
            set_config_value(&mut on_disk, &key, &value)?;
            write_config(&path, &on_disk)?;
            output.success(&format!("{key} = {value} ({})", path.display()))?;
        }

        ConfigCommands::List => {
            output.header("Current Configuration:")?;
            let serialised =
                toml::to_string_pretty(&config).map_err(|e| CliError::ConfigError {
                    message: format!("Failed to serialise config: {e}"),
                    source: Some(Box::new(e)),
                })?;
            output.print(&serialised)?;
        }

        ConfigCommands::Path => {
            output.print(&AppConfig::config_path(explicit).display().to_string())?;
        }
    }

    Ok(())
}

// ── helpers ───────────────────────────────────────────────────────────────────

fn get_config_value(config: &AppConfig, key: &str) -> CliResult<String> {
    let d = &config.defaults;
    let value = match key {
        "defaults.backend_framework" => d.backend_framework.clone(),
        "defaults.backend_language" => d.backend_language.clone(),
        "defaults.frontend_framework" => d.frontend_framework.clone(),
        "defaults.frontend_language" => d.frontend_language.clone(),
        "defaults.backend_port" => d.backend_port.to_string(),
        "defaults.frontend_port" => d.frontend_port.to_string(),
        "templates.local_path" => display_path(config.templates.local_path.as_ref()),
        "output.no_color" => config.output.no_color.to_string(),
        "output.format" => config.output.format.clone(),
        "logging.file" => display_path(config.logging.file.as_ref()),
        _ => return Err(CliError::UnknownConfigKey { key: key.into() }),
    };
    Ok(value)
}

/// Update one key, validating the value against the domain vocabulary.
///
/// An empty value clears the optional path keys.
fn set_config_value(config: &mut AppConfig, key: &str, value: &str) -> CliResult<()> {
    let d = &mut config.defaults;
    match key {
        "defaults.backend_framework" => d.backend_framework = checked::<Framework>(key, value)?,
        "defaults.backend_language" => d.backend_language = checked::<Language>(key, value)?,
        "defaults.frontend_framework" => d.frontend_framework = checked::<Framework>(key, value)?,
        "defaults.frontend_language" => d.frontend_language = checked::<Language>(key, value)?,
        "defaults.backend_port" => d.backend_port = parse(key, value)?,
        "defaults.frontend_port" => d.frontend_port = parse(key, value)?,
        "templates.local_path" => config.templates.local_path = optional_path(value),
        "output.no_color" => config.output.no_color = parse(key, value)?,
        "output.format" => {
            if !matches!(value, "auto" | "human" | "plain" | "json") {
                return Err(invalid(key, value, "expected auto, human, plain or json"));
            }
            config.output.format = value.into();
        }
        "logging.file" => config.logging.file = optional_path(value),
        _ => return Err(CliError::UnknownConfigKey { key: key.into() }),
    }
    Ok(())
}

/// Parse as `T` and store the canonical spelling.
fn checked<T>(key: &str, value: &str) -> CliResult<String>
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    T::from_str(value)
        .map(|v| v.to_string())
        .map_err(|e| invalid(key, value, &e.to_string()))
}

fn parse<T>(key: &str, value: &str) -> CliResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

fn invalid(key: &str, value: &str, reason: &str) -> CliError {
    CliError::ConfigError {
        message: format!("invalid value '{value}' for {key}: {reason}"),
        source: None,
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.trim().is_empty()).then(|| PathBuf::from(value))
}

fn display_path(path: Option<&PathBuf>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}

// ── tests ─────────────────────────────────────────────────────────────────────
