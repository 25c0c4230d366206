//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums. No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use stackgen_core::domain::{
    Communication, CssSolution, Database, DeployTarget, Feature, Framework, Language as CoreLanguage,
    MicroserviceSpec, StateManagement, TemplateCategory,
};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "stackgen",
    bin_name = "stackgen",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "\u{26a1} Full-stack monorepo generation",
    long_about = "Stackgen generates a pnpm/turbo monorepo with a backend, a frontend \
                  and optional microservices, wired for the features you select.",
    after_help = "EXAMPLES:\n\
        \x20 stackgen new shop --db postgres --feature auth --feature graphql\n\
        \x20 stackgen new shop --backend nestjs --frontend vue --service billing:grpc\n\
        \x20 stackgen new shop --from stackgen.json --dry-run\n\
        \x20 stackgen list --category backend\n\
        \x20 stackgen completions bash > /usr/share/bash-completion/completions/stackgen",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a new monorepo.
    #[command(
        visible_alias = "n",
        about = "Generate a new project",
        after_help = "EXAMPLES:\n\
            \x20 stackgen new demo\n\
            \x20 stackgen new demo --backend koa --backend-lang js --db mongo\n\
            \x20 stackgen new demo --feature auth-oauth --deploy kubernetes\n\
            \x20 stackgen new demo --service billing:grpc --service mailer:mq:koa"
    )]
    New(NewArgs),

    /// List available templates.
    #[command(
        visible_alias = "ls",
        about = "List available templates",
        after_help = "EXAMPLES:\n\
            \x20 stackgen list\n\
            \x20 stackgen list --category frontend\n\
            \x20 stackgen list --format json"
    )]
    List(ListArgs),

    /// Write a default configuration file.
    #[command(
        about = "Initialise configuration",
        after_help = "EXAMPLES:\n\
            \x20 stackgen init\n\
            \x20 stackgen init --force\n\
            \x20 stackgen --config ./stackgen.toml init"
    )]
    Init(InitArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 stackgen completions bash > ~/.local/share/bash-completion/completions/stackgen\n\
            \x20 stackgen completions zsh  > ~/.zfunc/_stackgen\n\
            \x20 stackgen completions fish > ~/.config/fish/completions/stackgen.fish"
    )]
    Completions(CompletionsArgs),

    /// Manage the stackgen configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 stackgen config get defaults.backend_framework\n\
            \x20 stackgen config set defaults.backend_framework koa\n\
            \x20 stackgen config list"
    )]
    Config(ConfigCommands),
}

// ── new ───────────────────────────────────────────────────────────────────────

/// Arguments for `stackgen new`.
#[derive(Debug, Args)]
pub struct NewArgs {
    /// Project name or path. A plain name creates `./name`; a path like
    /// `../foo` places the project one level up.
    #[arg(value_name = "NAME", help = "Project name or path")]
    pub name: String,

    /// Start from a JSON configuration document.
    #[arg(
        long = "from",
        value_name = "FILE",
        help = "Load the configuration from a stackgen.json document"
    )]
    pub from: Option<PathBuf>,

    #[arg(
        short = 'b',
        long = "backend",
        value_name = "FRAMEWORK",
        help = "Backend framework (express, koa, nestjs)"
    )]
    pub backend: Option<Framework>,

    #[arg(
        long = "backend-lang",
        value_name = "LANGUAGE",
        value_enum,
        help = "Backend language"
    )]
    pub backend_language: Option<Language>,

    #[arg(
        short = 'f',
        long = "frontend",
        value_name = "FRAMEWORK",
        help = "Frontend framework (react, vue)"
    )]
    pub frontend: Option<Framework>,

    #[arg(
        long = "frontend-lang",
        value_name = "LANGUAGE",
        value_enum,
        help = "Frontend language"
    )]
    pub frontend_language: Option<Language>,

    /// Databases; repeat for more than one.
    #[arg(
        long = "db",
        value_name = "DATABASE",
        help = "Database to wire (postgres, mongo)"
    )]
    pub databases: Vec<Database>,

    /// Features; repeat for more than one.
    #[arg(
        long = "feature",
        value_name = "FEATURE",
        help = "Feature to enable (auth, graphql, docker, testing, ...)"
    )]
    pub features: Vec<Feature>,

    #[arg(
        long = "deploy",
        value_name = "TARGET",
        help = "Deployment target (docker, kubernetes, aws, azure, gcp, serverless)"
    )]
    pub deploy: Vec<DeployTarget>,

    #[arg(long = "state", value_name = "LIBRARY", help = "Frontend state management")]
    pub state: Option<StateManagement>,

    #[arg(long = "css", value_name = "SOLUTION", help = "Frontend CSS solution")]
    pub css: Option<CssSolution>,

    #[arg(long = "backend-port", value_name = "PORT", help = "Backend port")]
    pub backend_port: Option<u16>,

    #[arg(long = "frontend-port", value_name = "PORT", help = "Frontend port")]
    pub frontend_port: Option<u16>,

    /// Microservices as `NAME[:COMMUNICATION[:FRAMEWORK]]`.
    #[arg(
        short = 's',
        long = "service",
        value_name = "SPEC",
        value_parser = parse_service,
        help = "Microservice, e.g. billing:grpc or mailer:mq:koa"
    )]
    pub services: Vec<MicroserviceSpec>,

    #[arg(
        long = "templates",
        value_name = "DIR",
        help = "Directory searched first for templates"
    )]
    pub templates: Option<PathBuf>,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        help = "Parent directory (default: current directory)"
    )]
    pub output: Option<PathBuf>,

    /// Overwrite an existing directory (destructive).
    #[arg(long = "force", help = "Delete an existing project directory and generate afresh")]
    pub force: bool,

    /// Preview the pipeline without writing any files.
    #[arg(long = "dry-run", help = "Show what would be generated without generating")]
    pub dry_run: bool,
}

/// Parse `NAME[:COMMUNICATION[:FRAMEWORK]]`.
pub fn parse_service(raw: &str) -> Result<MicroserviceSpec, String> {
    let mut parts = raw.split(':');
    let name = parts.next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err("service name cannot be empty".into());
    }

    let mut spec = MicroserviceSpec::new(name);
    if let Some(mode) = parts.next() {
        let mode: Communication = mode.parse().map_err(|e| format!("{e}"))?;
        spec = spec.with_communication(mode);
    }
    if let Some(framework) = parts.next() {
        let framework: Framework = framework.parse().map_err(|e| format!("{e}"))?;
        spec = spec.with_framework(framework);
    }
    if parts.next().is_some() {
        return Err(format!(
            "'{raw}' has too many parts; expected NAME[:COMMUNICATION[:FRAMEWORK]]"
        ));
    }
    Ok(spec)
}

// ── list ──────────────────────────────────────────────────────────────────────

/// Arguments for `stackgen list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Filter by category.
    #[arg(
        short = 'k',
        long = "category",
        value_enum,
        help = "Filter by category"
    )]
    pub category: Option<Category>,

    #[arg(
        long = "templates",
        value_name = "DIR",
        help = "Directory searched first for templates"
    )]
    pub templates: Option<PathBuf>,

    /// Output format.
    #[arg(
        long = "format",
        value_enum,
        default_value = "table",
        help = "Output format"
    )]
    pub format: ListFormat,
}

/// Output format for the `list` command.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListFormat {
    /// Human-readable table.
    Table,
    /// One name per line.
    List,
    /// JSON array.
    Json,
    /// CSV rows.
    Csv,
}

// ── init ──────────────────────────────────────────────────────────────────────

/// Arguments for `stackgen init`.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(short = 'f', long = "force", help = "Overwrite existing configuration")]
    pub force: bool,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `stackgen completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `stackgen config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `defaults.backend_framework`.
        key: String,
    },
    /// Set a configuration key to a value.
    Set {
        /// Dotted key path.
        key: String,
        /// New value.
        value: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the active configuration file.
    Path,
}

// ── value enums ───────────────────────────────────────────────────────────────

/// Source languages a sub-project can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum Language {
    /// Also accepted as `ts`.
    #[value(alias = "ts")]
    TypeScript,
    /// Also accepted as `js`.
    #[value(alias = "js")]
    JavaScript,
}

impl From<Language> for CoreLanguage {
    fn from(lang: Language) -> Self {
        match lang {
            Language::TypeScript => CoreLanguage::TypeScript,
            Language::JavaScript => CoreLanguage::JavaScript,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(CoreLanguage::from(*self).as_str())
    }
}

/// Template categories accepted by `list --category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum Category {
    Backend,
    Frontend,
}

impl From<Category> for TemplateCategory {
    fn from(category: Category) -> Self {
        match category {
            Category::Backend => TemplateCategory::Backend,
            Category::Frontend => TemplateCategory::Frontend,
        }
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
