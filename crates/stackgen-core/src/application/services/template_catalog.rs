//! Template Catalog - queries over the templates on the search path.
//!
//! Separated from ProjectAssembler so listing never needs a filesystem.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::{
    application::ports::{ResolvedTemplate, TemplateResolver},
    domain::{Framework, Language, ProjectConfig, StackChoice, TemplateCategory},
    error::StackgenResult,
};

/// Service for template lookups.
pub struct TemplateCatalog {
    templates: Box<dyn TemplateResolver>,
}

impl TemplateCatalog {
    pub fn new(templates: Box<dyn TemplateResolver>) -> Self {
        Self { templates }
    }

    /// Templates on the search path, optionally restricted to one category,
    /// sorted by category, framework and language.
    pub fn list(&self, category: Option<TemplateCategory>) -> StackgenResult<Vec<TemplateInfo>> {
        let mut infos: Vec<TemplateInfo> = self
            .templates
            .list()?
            .into_iter()
            .filter(|t| category.is_none_or(|c| t.category == c))
            .map(TemplateInfo::from)
            .collect();
        infos.sort_by(|a, b| {
            (a.category.as_str(), a.framework.as_str(), a.language.as_str()).cmp(&(
                b.category.as_str(),
                b.framework.as_str(),
                b.language.as_str(),
            ))
        });
        Ok(infos)
    }

    /// Stacks `config` needs that no template provides.
    ///
    /// Covers the main backend, the frontend and every microservice's
    /// framework. Each stack is reported once.
    pub fn missing_templates(&self, config: &ProjectConfig) -> Vec<StackChoice> {
        let mut needed: BTreeSet<(TemplateCategory, StackChoice)> = BTreeSet::new();
        for target in config.backend_targets() {
            needed.insert((TemplateCategory::Backend, target.config.backend()));
        }
        needed.insert((TemplateCategory::Frontend, config.frontend()));

        needed
            .into_iter()
            .filter(|(category, stack)| {
                self.templates
                    .resolve(*category, stack.language, stack.framework)
                    .is_err()
            })
            .map(|(_, stack)| stack)
            .collect()
    }
}

/// Template metadata for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInfo {
    pub name: String,
    pub category: TemplateCategory,
    pub framework: Framework,
    pub language: Language,
    pub description: String,
    pub path: PathBuf,
}

impl From<ResolvedTemplate> for TemplateInfo {
    fn from(t: ResolvedTemplate) -> Self {
        Self {
            name: t.name,
            category: t.category,
            framework: t.framework,
            language: t.language,
            description: t.description,
            path: t.root,
        }
    }
}
