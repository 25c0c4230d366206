//! Filesystem-based template resolver.
//!
//! Searches an ordered list of template roots; the first root holding
//! `<category>/<framework>-<language>/` wins.
//!
//! # `template.toml` format
//!
//! ```toml
//! [template]
//! name        = "Express (TypeScript)"
//! description = "Express 4 API with health route"   # optional
//! version     = "1.0.0"                              # optional
//! ```

use std::{
    collections::BTreeSet,
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use stackgen_core::{
    application::{
        ApplicationError,
        ports::{ResolvedTemplate, TemplateFile, TemplateResolver},
    },
    domain::{Framework, Language, TemplateCategory},
    error::{StackgenError, StackgenResult},
};

use super::{parse_tree_name, tree_name};

/// Environment variable that prepends a directory to the search path.
pub const TEMPLATES_DIR_ENV: &str = "STACKGEN_TEMPLATES_DIR";

const MANIFEST_FILE: &str = "template.toml";

// ── Manifest types ────────────────────────────────────────────────────────────

/// Deserialised `template.toml`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TemplateManifest {
    #[serde(default)]
    pub template: TemplateSection,
}

/// `[template]` section.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TemplateSection {
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Resolves template trees from directories on disk.
#[derive(Debug, Clone)]
pub struct FilesystemTemplateResolver {
    search_path: Vec<PathBuf>,
}

impl FilesystemTemplateResolver {
    /// Resolver over exactly `search_path`, in order.
    pub fn new(search_path: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            search_path: search_path.into_iter().collect(),
        }
    }

    /// The default search path, optionally led by `preferred`:
    ///
    /// 1. `preferred` (from `--templates` or the config file)
    /// 2. `$STACKGEN_TEMPLATES_DIR`
    /// 3. `./templates`
    /// 4. `templates/` next to the executable and one level up
    pub fn with_defaults(preferred: Option<PathBuf>) -> Self {
        let mut roots = Vec::new();
        roots.extend(preferred);
        if let Some(dir) = std::env::var_os(TEMPLATES_DIR_ENV) {
            roots.push(PathBuf::from(dir));
        }
        roots.push(PathBuf::from("templates"));
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            roots.push(exe_dir.join("templates"));
            if let Some(parent) = exe_dir.parent() {
                roots.push(parent.join("templates"));
            }
        }

        let mut seen = BTreeSet::new();
        roots.retain(|r| seen.insert(r.clone()));
        Self { search_path: roots }
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    fn searched(&self) -> String {
        self.search_path
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn load(
        &self,
        dir: &Path,
        category: TemplateCategory,
        framework: Framework,
        language: Language,
    ) -> ResolvedTemplate {
        let manifest = read_manifest(&dir.join(MANIFEST_FILE));
        let fallback = tree_name(framework, language);
        ResolvedTemplate {
            category,
            framework,
            language,
            root: dir.to_path_buf(),
            name: manifest.template.name.unwrap_or(fallback),
            description: manifest.template.description.unwrap_or_default(),
        }
    }
}

impl TemplateResolver for FilesystemTemplateResolver {
    #[instrument(skip(self), fields(search_path = self.search_path.len()))]
    fn resolve(
        &self,
        category: TemplateCategory,
        language: Language,
        framework: Framework,
    ) -> StackgenResult<ResolvedTemplate> {
        let name = tree_name(framework, language);
        for root in &self.search_path {
            let dir = root.join(category.as_str()).join(&name);
            if dir.is_dir() {
                debug!(template = %dir.display(), "resolved template");
                return Ok(self.load(&dir, category, framework, language));
            }
        }
        Err(ApplicationError::TemplateNotFound {
            category: category.to_string(),
            framework: framework.to_string(),
            language: language.to_string(),
            searched: self.searched(),
        }
        .into())
    }

    fn walk(&self, template: &ResolvedTemplate) -> StackgenResult<Vec<TemplateFile>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&template.root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                StackgenError::from(ApplicationError::FilesystemError {
                    path: e.path().unwrap_or(&template.root).to_path_buf(),
                    reason: format!("Failed to walk template: {e}"),
                })
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&template.root)
                .map_err(|_| StackgenError::Internal {
                    message: format!(
                        "walked path {} escapes template root",
                        entry.path().display()
                    ),
                })?;
            // template.toml is resolver metadata, not a project file.
            if relative == Path::new(MANIFEST_FILE) {
                continue;
            }
            let content = fs::read(entry.path()).map_err(|e| {
                StackgenError::from(ApplicationError::FilesystemError {
                    path: entry.path().to_path_buf(),
                    reason: format!("Failed to read template file: {e}"),
                })
            })?;
            files.push(TemplateFile {
                relative_path: relative.to_path_buf(),
                content,
            });
        }
        debug!(template = %template.name, files = files.len(), "walked template");
        Ok(files)
    }

    fn list(&self) -> StackgenResult<Vec<ResolvedTemplate>> {
        let mut found = Vec::new();
        let mut seen = BTreeSet::new();

        for root in &self.search_path {
            for category in [TemplateCategory::Backend, TemplateCategory::Frontend] {
                let Ok(entries) = fs::read_dir(root.join(category.as_str())) else {
                    continue;
                };
                for entry in entries.flatten() {
                    let path = entry.path();
                    if !path.is_dir() {
                        continue;
                    }
                    let Some((framework, language)) = path
                        .file_name()
                        .and_then(OsStr::to_str)
                        .and_then(parse_tree_name)
                    else {
                        warn!(dir = %path.display(), "skipping directory that does not name a template");
                        continue;
                    };
                    // Earlier roots shadow later ones.
                    if seen.insert((category, framework, language)) {
                        found.push(self.load(&path, category, framework, language));
                    }
                }
            }
        }
        Ok(found)
    }
}

fn read_manifest(path: &Path) -> TemplateManifest {
    let Ok(raw) = fs::read_to_string(path) else {
        return TemplateManifest::default();
    };
    toml::from_str(&raw).unwrap_or_else(|e| {
        warn!(manifest = %path.display(), error = %e, "ignoring unreadable template manifest");
        TemplateManifest::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn resolve_prefers_earlier_roots() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write(first.path(), "backend/koa-javascript/a.js", "");
        write(second.path(), "backend/koa-javascript/b.js", "");
        write(
            second.path(),
            "backend/express-typescript/template.toml",
            "[template]\nname = \"Express API\"\ndescription = \"health route\"\n",
        );

        let resolver = FilesystemTemplateResolver::new([
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);

        let koa = resolver
            .resolve(TemplateCategory::Backend, Language::JavaScript, Framework::Koa)
            .unwrap();
        assert_eq!(koa.root, first.path().join("backend/koa-javascript"));
        assert_eq!(koa.name, "koa-javascript");

        let express = resolver
            .resolve(TemplateCategory::Backend, Language::TypeScript, Framework::Express)
            .unwrap();
        assert_eq!(express.name, "Express API");
        assert_eq!(express.description, "health route");
    }

    #[test]
    fn missing_template_lists_the_search_path() {
        let root = TempDir::new().unwrap();
        let resolver = FilesystemTemplateResolver::new([root.path().to_path_buf()]);
        let err = resolver
            .resolve(TemplateCategory::Frontend, Language::TypeScript, Framework::Vue)
            .unwrap_err();
        match err {
            StackgenError::Application(ApplicationError::TemplateNotFound { searched, .. }) => {
                assert!(searched.contains(&root.path().display().to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn walk_is_recursive_sorted_and_skips_metadata() {
        let root = TempDir::new().unwrap();
        write(root.path(), "frontend/react-typescript/template.toml", "[template]\n");
        write(root.path(), "frontend/react-typescript/src/main.tsx", "main");
        write(root.path(), "frontend/react-typescript/package.json.tmpl", "{}");

        let resolver = FilesystemTemplateResolver::new([root.path().to_path_buf()]);
        let template = resolver
            .resolve(TemplateCategory::Frontend, Language::TypeScript, Framework::React)
            .unwrap();
        let files = resolver.walk(&template).unwrap();
        let paths: Vec<_> = files
            .iter()
            .map(|f| f.relative_path.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(paths, vec!["package.json.tmpl", "src/main.tsx"]);
        assert_eq!(files[1].content, b"main");
    }

    #[test]
    fn walk_carries_binary_assets_untouched() {
        let root = TempDir::new().unwrap();
        let icon = [0u8, 0, 1, 0, 0xff, 0xfe, 0x80];
        let dir = root.path().join("frontend/vue-typescript/public");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("favicon.ico"), icon).unwrap();

        let resolver = FilesystemTemplateResolver::new([root.path().to_path_buf()]);
        let template = resolver
            .resolve(TemplateCategory::Frontend, Language::TypeScript, Framework::Vue)
            .unwrap();
        let files = resolver.walk(&template).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, icon);
    }

    #[test]
    fn list_skips_foreign_directories() {
        let root = TempDir::new().unwrap();
        write(root.path(), "backend/nestjs-typescript/x", "");
        write(root.path(), "backend/shared/x", "");
        let resolver = FilesystemTemplateResolver::new([root.path().to_path_buf()]);
        let all = resolver.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].framework, Framework::NestJs);
    }
}
