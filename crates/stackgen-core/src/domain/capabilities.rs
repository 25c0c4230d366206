//! Framework capability registry.
//!
//! Each framework is described exactly once by its [`FrameworkDef`]. Every
//! compatibility check and every "where is the entry file" question is a
//! table lookup against [`FRAMEWORK_REGISTRY`].
//!
//! # Adding a New Framework
//!
//! 1. Add a variant to [`Framework`] in `value_objects.rs`
//! 2. Add one [`FrameworkDef`] entry to [`FRAMEWORK_REGISTRY`]
//! 3. Ship `templates/<category>/<framework>-<language>/` for each language

use crate::domain::value_objects::{Feature, Framework, Language, TemplateCategory};

/// How generated server code plugs into the framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `app.use(path, router)` middleware chains.
    Express,
    /// `app.use(router.routes())` with a prefixed router.
    Koa,
    /// Express under the hood, plus a root module with decorators.
    Nest,
    /// Browser bundle built with Vite.
    Spa,
}

/// How relative imports are spelled inside generated modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStyle {
    /// Native ES modules: relative specifiers carry a `.js` suffix.
    Esm,
    /// Compiled to CommonJS: bare relative specifiers.
    CommonJs,
}

/// Everything the engine needs to know about one framework.
#[derive(Debug, Clone, Copy)]
pub struct FrameworkDef {
    pub framework: Framework,
    pub category: TemplateCategory,
    /// Languages a template exists for. The first entry is the default.
    pub languages: &'static [Language],
    /// Entry module, without extension, relative to the sub-project root.
    pub entry_stem: &'static str,
    /// Root module for frameworks with one (NestJS).
    pub module_stem: Option<&'static str>,
    pub dialect: Dialect,
    pub module_style: ModuleStyle,
    /// Features the generators cannot wire into this framework.
    pub unsupported_features: &'static [Feature],
    /// Human readable name for listings.
    pub label: &'static str,
}

impl FrameworkDef {
    pub fn supports_language(&self, language: Language) -> bool {
        self.languages.contains(&language)
    }

    pub fn supports_feature(&self, feature: Feature) -> bool {
        !self.unsupported_features.contains(&feature)
    }

    /// Whether the framework refuses dynamically typed code.
    pub fn requires_static_typing(&self) -> bool {
        self.languages.iter().all(|l| l.is_statically_typed())
    }
}

/// Single source of truth for all framework capabilities.
pub static FRAMEWORK_REGISTRY: &[FrameworkDef] = &[
    // ── Backend ──────────────────────────────────────────────────────────────
    FrameworkDef {
        framework: Framework::Express,
        category: TemplateCategory::Backend,
        languages: &[Language::TypeScript, Language::JavaScript],
        entry_stem: "src/app",
        module_stem: None,
        dialect: Dialect::Express,
        module_style: ModuleStyle::Esm,
        unsupported_features: &[],
        label: "Express",
    },
    FrameworkDef {
        framework: Framework::Koa,
        category: TemplateCategory::Backend,
        languages: &[Language::TypeScript, Language::JavaScript],
        entry_stem: "src/app",
        module_stem: None,
        dialect: Dialect::Koa,
        module_style: ModuleStyle::Esm,
        unsupported_features: &[Feature::AuthPassport, Feature::AuthOAuth],
        label: "Koa",
    },
    FrameworkDef {
        framework: Framework::NestJs,
        category: TemplateCategory::Backend,
        languages: &[Language::TypeScript],
        entry_stem: "src/main",
        module_stem: Some("src/app.module"),
        dialect: Dialect::Nest,
        module_style: ModuleStyle::CommonJs,
        unsupported_features: &[],
        label: "NestJS",
    },
    // ── Frontend ─────────────────────────────────────────────────────────────
    FrameworkDef {
        framework: Framework::React,
        category: TemplateCategory::Frontend,
        languages: &[Language::TypeScript, Language::JavaScript],
        entry_stem: "src/main",
        module_stem: None,
        dialect: Dialect::Spa,
        module_style: ModuleStyle::Esm,
        unsupported_features: &[],
        label: "React",
    },
    FrameworkDef {
        framework: Framework::Vue,
        category: TemplateCategory::Frontend,
        languages: &[Language::TypeScript, Language::JavaScript],
        entry_stem: "src/main",
        module_stem: None,
        dialect: Dialect::Spa,
        module_style: ModuleStyle::Esm,
        unsupported_features: &[],
        label: "Vue",
    },
];

/// Look up a framework's definition.
///
/// Every [`Framework`] variant has an entry; `registry_covers_every_framework`
/// enforces it.
pub fn framework_def(framework: Framework) -> &'static FrameworkDef {
    FRAMEWORK_REGISTRY
        .iter()
        .find(|d| d.framework == framework)
        .unwrap_or(&FRAMEWORK_REGISTRY[0])
}

/// Frameworks of one category, in registry order.
pub fn frameworks_for(category: TemplateCategory) -> impl Iterator<Item = &'static FrameworkDef> {
    FRAMEWORK_REGISTRY
        .iter()
        .filter(move |d| d.category == category)
}

/// Relative import specifier for a sibling module, e.g. `./auth` or `./auth.js`.
pub fn import_specifier(framework: Framework, module: &str) -> String {
    match framework_def(framework).module_style {
        ModuleStyle::Esm => format!("{module}.js"),
        ModuleStyle::CommonJs => module.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_every_framework() {
        for fw in Framework::ALL {
            assert!(
                FRAMEWORK_REGISTRY.iter().any(|d| d.framework == *fw),
                "missing registry entry for {fw}"
            );
        }
    }

    #[test]
    fn nest_requires_static_typing() {
        assert!(framework_def(Framework::NestJs).requires_static_typing());
        assert!(!framework_def(Framework::Express).requires_static_typing());
    }

    #[test]
    fn koa_cannot_wire_passport() {
        let koa = framework_def(Framework::Koa);
        assert!(!koa.supports_feature(Feature::AuthPassport));
        assert!(koa.supports_feature(Feature::Auth));
    }

    #[test]
    fn categories_partition_frameworks() {
        let backends: Vec<_> = frameworks_for(TemplateCategory::Backend)
            .map(|d| d.framework)
            .collect();
        assert_eq!(
            backends,
            vec![Framework::Express, Framework::Koa, Framework::NestJs]
        );
        assert_eq!(Framework::Vue.category(), TemplateCategory::Frontend);
    }

    #[test]
    fn import_specifiers_follow_module_style() {
        assert_eq!(import_specifier(Framework::Express, "./auth"), "./auth.js");
        assert_eq!(import_specifier(Framework::NestJs, "./auth"), "./auth");
    }
}
