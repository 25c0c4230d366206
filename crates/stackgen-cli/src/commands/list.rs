//! Implementation of the `stackgen list` command.

use serde_json::json;

use stackgen_adapters::FilesystemTemplateResolver;
use stackgen_core::application::{TemplateCatalog, TemplateInfo};

use crate::{
    cli::{ListArgs, ListFormat},
    config::AppConfig,
    error::{CliResult, IntoCli},
    output::OutputManager,
};

pub fn execute(args: ListArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let resolver = FilesystemTemplateResolver::with_defaults(
        args.templates.or_else(|| config.templates.local_path.clone()),
    );
    let search_path = resolver.search_path().to_vec();

    let catalog = TemplateCatalog::new(Box::new(resolver));
    let templates = catalog
        .list(args.category.map(Into::into))
        .with_cli_context(|| "listing templates")?;

    match args.format {
        ListFormat::Table => {
            if templates.is_empty() {
                output.warning("No templates found. Searched:")?;
                for dir in &search_path {
                    output.print(&format!("  {}", dir.display()))?;
                }
                return Ok(());
            }
            output.header("Available Templates:")?;
            let width = templates.iter().map(|t| id(t).len()).max().unwrap_or(0);
            for template in &templates {
                output.print(&format!(
                    "  {:<width$}  {:<8}  {}",
                    id(template),
                    template.category.as_str(),
                    template.description,
                    width = width
                ))?;
            }
        }

        // JSON must stay parseable when piped, so it bypasses quiet mode.
        ListFormat::Json => {
            let rows: Vec<_> = templates.iter().map(to_json).collect();
            output.json(&serde_json::Value::Array(rows))?;
        }

        ListFormat::List => {
            for t in &templates {
                println!("{}", id(t));
            }
        }

        ListFormat::Csv => {
            println!("id,name,category,framework,language,description");
            for t in &templates {
                println!(
                    "{},{},{},{},{},{}",
                    id(t),
                    csv_field(&t.name),
                    t.category,
                    t.framework,
                    t.language,
                    csv_field(&t.description)
                );
            }
        }
    }

    Ok(())
}

/// The `<framework>-<language>` identifier a template is selected by.
fn id(t: &TemplateInfo) -> String {
    format!("{}-{}", t.framework, t.language)
}

fn to_json(t: &TemplateInfo) -> serde_json::Value {
    json!({
        "id": id(t),
        "name": t.name,
        "category": t.category.as_str(),
        "framework": t.framework.as_str(),
        "language": t.language.as_str(),
        "description": t.description,
        "path": t.path.display().to_string(),
    })
}

/// Quote a field when it contains a delimiter, a quote or a newline.
fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
