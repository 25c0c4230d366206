//! Template resolver adapters.
//!
//! # Directory layout expected
//!
//! ```text
//! templates/
//! ├── backend/
//! │   ├── express-typescript/
//! │   │   ├── template.toml        ← display metadata (optional)
//! │   │   ├── package.json.tmpl    ← rendered, then renamed
//! │   │   └── src/
//! │   │       └── app.ts.tmpl
//! │   └── koa-javascript/
//! └── frontend/
//!     └── react-typescript/
//! ```

mod filesystem;
mod memory;

pub use filesystem::{FilesystemTemplateResolver, TEMPLATES_DIR_ENV, TemplateManifest};
pub use memory::MemoryTemplateResolver;

use stackgen_core::domain::{Framework, Language};

/// Directory name of a template tree, e.g. `express-typescript`.
pub fn tree_name(framework: Framework, language: Language) -> String {
    format!("{}-{}", framework.as_str(), language.as_str())
}

/// Inverse of [`tree_name`]. `None` for directories that are not templates.
pub fn parse_tree_name(name: &str) -> Option<(Framework, Language)> {
    let (framework, language) = name.rsplit_once('-')?;
    Some((framework.parse().ok()?, language.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_names_round_trip() {
        let name = tree_name(Framework::NestJs, Language::TypeScript);
        assert_eq!(name, "nestjs-typescript");
        assert_eq!(
            parse_tree_name(&name),
            Some((Framework::NestJs, Language::TypeScript))
        );
        assert_eq!(parse_tree_name("shared"), None);
        assert_eq!(parse_tree_name("express-cobol"), None);
    }
}
