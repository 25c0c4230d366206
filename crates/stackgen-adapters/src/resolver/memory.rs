//! In-memory template resolver for testing.

use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{Arc, RwLock},
};

use stackgen_core::{
    application::{
        ApplicationError,
        ports::{ResolvedTemplate, TemplateFile, TemplateResolver},
    },
    domain::{Framework, Language, TemplateCategory},
    error::StackgenResult,
};

use super::tree_name;

type Key = (TemplateCategory, Framework, Language);

/// Template trees held in memory, keyed by stack.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateResolver {
    trees: Arc<RwLock<BTreeMap<Key, Vec<TemplateFile>>>>,
}

impl MemoryTemplateResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tree of `(relative path, content)` pairs. Content may be
    /// text or raw bytes.
    pub fn insert<'a, C: AsRef<[u8]>>(
        &self,
        category: TemplateCategory,
        framework: Framework,
        language: Language,
        files: impl IntoIterator<Item = (&'a str, C)>,
    ) -> StackgenResult<()> {
        let mut trees = self
            .trees
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;
        let mut files: Vec<TemplateFile> = files
            .into_iter()
            .map(|(path, content)| TemplateFile {
                relative_path: PathBuf::from(path),
                content: content.as_ref().to_vec(),
            })
            .collect();
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        trees.insert((category, framework, language), files);
        Ok(())
    }

    fn describe((category, framework, language): Key) -> ResolvedTemplate {
        let name = tree_name(framework, language);
        ResolvedTemplate {
            category,
            framework,
            language,
            root: PathBuf::from(format!("memory:/{category}/{name}")),
            name,
            description: String::new(),
        }
    }
}

impl TemplateResolver for MemoryTemplateResolver {
    fn resolve(
        &self,
        category: TemplateCategory,
        language: Language,
        framework: Framework,
    ) -> StackgenResult<ResolvedTemplate> {
        let trees = self
            .trees
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        let key = (category, framework, language);
        if trees.contains_key(&key) {
            Ok(Self::describe(key))
        } else {
            Err(ApplicationError::TemplateNotFound {
                category: category.to_string(),
                framework: framework.to_string(),
                language: language.to_string(),
                searched: "<memory>".into(),
            }
            .into())
        }
    }

    fn walk(&self, template: &ResolvedTemplate) -> StackgenResult<Vec<TemplateFile>> {
        let trees = self
            .trees
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        Ok(trees
            .get(&(template.category, template.framework, template.language))
            .cloned()
            .unwrap_or_default())
    }

    fn list(&self) -> StackgenResult<Vec<ResolvedTemplate>> {
        let trees = self
            .trees
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        Ok(trees.keys().copied().map(Self::describe).collect())
    }
}
