//! Variable context for template rendering.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  RenderContext (Value Object)                               │
//! │  └── Strict substitution: {{PROJECT_NAME}} -> "demo"        │
//! │      unknown names fail, `\{{` emits literal braces         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use crate::domain::config::ProjectConfig;
use crate::domain::error::DomainError;
use crate::domain::value_objects::{Database, Feature, TemplateCategory};

/// Variables available to one sub-project's templates.
///
/// Keys are SCREAMING_SNAKE_CASE. A `BTreeMap` keeps iteration order stable,
/// so anything derived from the context is reproducible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    variables: BTreeMap<String, String>,
}

impl RenderContext {
    /// Context with only the project-name variables.
    ///
    /// The project name is expanded into the casing variants templates
    /// commonly need:
    ///
    /// - **PROJECT_NAME:** "my-shop" (as given)
    /// - **PROJECT_NAME_SNAKE:** "my_shop"
    /// - **PROJECT_NAME_KEBAB:** "my-shop"
    /// - **PROJECT_NAME_PASCAL:** "MyShop"
    pub fn new(project_name: impl Into<String>) -> Self {
        let name = project_name.into();
        let mut variables = BTreeMap::new();
        variables.insert("PROJECT_NAME_SNAKE".to_string(), to_snake_case(&name));
        variables.insert("PROJECT_NAME_KEBAB".to_string(), to_kebab_case(&name));
        variables.insert("PROJECT_NAME_PASCAL".to_string(), to_pascal_case(&name));
        variables.insert("PROJECT_NAME".to_string(), name);
        Self { variables }
    }

    /// Full context for one sub-project of `config`.
    pub fn for_subproject(
        config: &ProjectConfig,
        category: TemplateCategory,
        subproject: &str,
        port: u16,
    ) -> Self {
        let project = config.project_name().as_str();
        let stack = match category {
            TemplateCategory::Backend => config.backend(),
            TemplateCategory::Frontend => config.frontend(),
        };
        let databases: Vec<&str> = config.databases().iter().map(|d| d.as_str()).collect();

        let mut ctx = Self::new(project)
            .with_variable("SUBPROJECT_NAME", subproject)
            .with_variable("PACKAGE_NAME", format!("@{project}/{subproject}"))
            .with_variable("LANGUAGE", stack.language.as_str())
            .with_variable("FRAMEWORK", stack.framework.as_str())
            .with_variable("FILE_EXT", stack.language.file_extension())
            .with_variable("COMPONENT_EXT", stack.language.component_extension())
            .with_variable("PORT", port.to_string())
            .with_variable("BACKEND_PORT", config.backend_port().to_string())
            .with_variable("FRONTEND_PORT", config.frontend_port().to_string())
            .with_variable(
                "API_URL",
                format!("http://localhost:{}", config.backend_port()),
            )
            .with_variable("DOCKER_PREFIX", config.docker_prefix())
            .with_variable("STATE_MANAGEMENT", config.state_management().as_str())
            .with_variable("CSS_SOLUTION", config.css_solution().as_str())
            .with_variable("DATABASES", databases.join(","));

        for feature in Feature::ALL {
            ctx = ctx.with_flag(feature.variable_name(), config.has_feature(*feature));
        }
        for database in Database::ALL {
            ctx = ctx.with_flag(
                format!("DB_{}", database.as_str().to_ascii_uppercase()),
                config.has_database(*database),
            );
        }
        ctx
    }

    /// Add a custom variable, consuming self and returning a new context.
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    fn with_flag(self, key: String, on: bool) -> Self {
        self.with_variable(key, if on { "true" } else { "false" })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(|s| s.as_str())
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render `template` by replacing every `{{NAME}}` placeholder.
    ///
    /// # Rules
    ///
    /// - Whitespace inside the braces is ignored: `{{ NAME }}`.
    /// - A name not in the context fails with
    ///   [`DomainError::UnresolvedPlaceholder`]; nothing is ever replaced
    ///   by an empty string.
    /// - `\{{` emits a literal `{{` and is not parsed.
    /// - Text without `{{` comes back unchanged.
    pub fn render(&self, template: &str) -> Result<String, DomainError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        let mut line = 1;

        while let Some(open) = rest.find("{{") {
            let (before, after_open) = rest.split_at(open);

            if let Some(stripped) = before.strip_suffix('\\') {
                out.push_str(stripped);
                out.push_str("{{");
                line += before.matches('\n').count();
                rest = &after_open[2..];
                continue;
            }

            out.push_str(before);
            line += before.matches('\n').count();

            let inner_start = &after_open[2..];
            let close = inner_start
                .find("}}")
                .ok_or_else(|| DomainError::MalformedPlaceholder {
                    line,
                    reason: "missing closing '}}'".into(),
                })?;
            let raw_name = &inner_start[..close];
            let name = raw_name.trim();

            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(DomainError::MalformedPlaceholder {
                    line,
                    reason: format!("'{raw_name}' is not a variable name"),
                });
            }

            let value = self
                .get(name)
                .ok_or_else(|| DomainError::UnresolvedPlaceholder {
                    name: name.to_string(),
                    line,
                })?;
            out.push_str(value);
            rest = &inner_start[close + 2..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

// ============================================================================
// String Case Conversion Helpers
// ============================================================================

fn to_snake_case(s: &str) -> String {
    split_words(s).join("_")
}

fn to_kebab_case(s: &str) -> String {
    split_words(s).join("-")
}

/// Convert a string to PascalCase.
///
/// | Input | Output |
/// |-------|--------|
/// | "my-app" | "MyApp" |
/// | "HTTPRequest" | "HttpRequest" |
pub(crate) fn to_pascal_case(s: &str) -> String {
    split_words(s)
        .into_iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => {
                    let mut out = String::new();
                    out.extend(first.to_uppercase());
                    out.push_str(chars.as_str());
                    out
                }
                None => String::new(),
            }
        })
        .collect()
}

/// Split a string into lowercase words.
///
/// Boundaries: explicit separators (`_`, `-`, whitespace), a lower-to-upper
/// transition (`myApp`), and the end of an acronym (`HTTPServer`).
fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(current.to_lowercase());
                current.clear();
            }
            continue;
        }

        if let Some(next) = chars.peek() {
            if c.is_lowercase() && next.is_uppercase() {
                current.push(c);
                words.push(current.to_lowercase());
                current.clear();
                continue;
            }

            if c.is_uppercase()
                && next.is_uppercase()
                && chars.clone().nth(1).is_some_and(|n| n.is_lowercase())
            {
                current.push(c);
                words.push(current.to_lowercase());
                current.clear();
                continue;
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        words.push(current.to_lowercase());
    }

    words
}
