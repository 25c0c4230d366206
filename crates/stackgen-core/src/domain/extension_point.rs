//! Named insertion points inside generated source files.
//!
//! Templates declare where code may be injected with a marker comment on a
//! line of its own:
//!
//! ```text
//! import express from 'express';
//! // @stackgen:imports
//!
//! app.use(express.json());
//! // @stackgen:middleware
//! ```
//!
//! [`SourcePatcher::patch`] inserts a block immediately above the marker,
//! indented like the marker. The marker itself is never consumed, so every
//! point stays locatable no matter how many patches ran before, and blocks
//! inserted at the same point keep their application order.
//!
//! Patching is append-only. Applying the same patch twice inserts the block
//! twice; preventing that is the pipeline's job, not the patcher's.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;

/// Marker prefix shared by every extension point.
pub const MARKER_PREFIX: &str = "// @stackgen:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionPoint {
    /// Module-level import statements.
    Imports,
    /// Middleware registration and route mounts, in request order.
    Middleware,
    /// Side effects run once the app is configured, before it listens.
    Startup,
    /// Entries of a NestJS `@Module({ imports: [...] })` array.
    ModuleImports,
    /// Entries of a NestJS `@Module({ providers: [...] })` array.
    ModuleProviders,
    /// Strategy registrations inside the generated auth module.
    AuthStrategies,
    /// Extra routes inside the generated auth router.
    AuthRoutes,
}

impl ExtensionPoint {
    pub const ALL: &'static [ExtensionPoint] = &[
        Self::Imports,
        Self::Middleware,
        Self::Startup,
        Self::ModuleImports,
        Self::ModuleProviders,
        Self::AuthStrategies,
        Self::AuthRoutes,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Imports => "imports",
            Self::Middleware => "middleware",
            Self::Startup => "startup",
            Self::ModuleImports => "module-imports",
            Self::ModuleProviders => "module-providers",
            Self::AuthStrategies => "auth-strategies",
            Self::AuthRoutes => "auth-routes",
        }
    }

    /// The full marker comment, e.g. `// @stackgen:imports`.
    pub fn marker(&self) -> String {
        format!("{MARKER_PREFIX}{}", self.as_str())
    }
}

impl fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtensionPoint {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| DomainError::UnknownValue {
                kind: "extension point",
                value: s.to_string(),
            })
    }
}

/// Text-level insertion at extension points.
pub struct SourcePatcher;

impl SourcePatcher {
    /// Insert `insertion` above the first line whose trimmed content is the
    /// marker for `point`.
    ///
    /// Each inserted line is prefixed with the marker's indentation; blank
    /// lines stay blank. Line endings of the original text are preserved.
    ///
    /// # Errors
    ///
    /// [`DomainError::AnchorNotFound`] when the marker is absent.
    pub fn patch(text: &str, point: ExtensionPoint, insertion: &str) -> Result<String, DomainError> {
        let marker = point.marker();
        let mut offset = 0;

        for line in text.split_inclusive('\n') {
            let content = line.trim_end_matches(['\n', '\r']);
            if content.trim() == marker {
                let indent = &content[..content.len() - content.trim_start().len()];
                let newline = if line.ends_with("\r\n") { "\r\n" } else { "\n" };

                let mut block = String::new();
                for inserted in insertion.trim_end_matches('\n').lines() {
                    if !inserted.trim().is_empty() {
                        block.push_str(indent);
                        block.push_str(inserted);
                    }
                    block.push_str(newline);
                }

                let mut out = String::with_capacity(text.len() + block.len());
                out.push_str(&text[..offset]);
                out.push_str(&block);
                out.push_str(&text[offset..]);
                return Ok(out);
            }
            offset += line.len();
        }

        Err(DomainError::AnchorNotFound {
            point: point.as_str().to_string(),
        })
    }

    /// Whether `text` still carries the marker for `point`.
    pub fn has_point(text: &str, point: ExtensionPoint) -> bool {
        let marker = point.marker();
        text.lines().any(|l| l.trim() == marker)
    }
}

/// Shorthand for [`SourcePatcher::patch`].
pub fn insert_at(text: &str, point: ExtensionPoint, insertion: &str) -> Result<String, DomainError> {
    SourcePatcher::patch(text, point, insertion)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: &str = "import express from 'express';\n\
                         // @stackgen:imports\n\
                         \n\
                         const app = express();\n\
                         app.use(express.json());\n\
                         // @stackgen:middleware\n\
                         \n\
                         // @stackgen:startup\n\
                         app.listen(4000);\n";

    #[test]
    fn inserts_above_marker_and_keeps_it() {
        let out = SourcePatcher::patch(ENTRY, ExtensionPoint::Imports, "import a from './a.js';")
            .unwrap();
        assert!(out.contains("import a from './a.js';\n// @stackgen:imports\n"));
        assert!(SourcePatcher::has_point(&out, ExtensionPoint::Imports));
    }

    #[test]
    fn successive_patches_keep_application_order() {
        let once = SourcePatcher::patch(ENTRY, ExtensionPoint::Middleware, "app.use(first);").unwrap();
        let twice = SourcePatcher::patch(&once, ExtensionPoint::Middleware, "app.use(second);").unwrap();
        let first = twice.find("app.use(first);").unwrap();
        let second = twice.find("app.use(second);").unwrap();
        let marker = twice.find("// @stackgen:middleware").unwrap();
        assert!(first < second && second < marker);
    }

    #[test]
    fn indentation_follows_marker() {
        let text = "function boot() {\n    // @stackgen:startup\n}\n";
        let out = SourcePatcher::patch(text, ExtensionPoint::Startup, "a();\n\nb();").unwrap();
        assert_eq!(
            out,
            "function boot() {\n    a();\n\n    b();\n    // @stackgen:startup\n}\n"
        );
    }

    #[test]
    fn missing_marker_is_anchor_not_found() {
        let err = SourcePatcher::patch("const x = 1;\n", ExtensionPoint::AuthRoutes, "y").unwrap_err();
        assert_eq!(
            err,
            DomainError::AnchorNotFound {
                point: "auth-routes".into()
            }
        );
    }

    #[test]
    fn marker_must_stand_alone_on_its_line() {
        let text = "foo(); // @stackgen:imports\n";
        assert!(SourcePatcher::patch(text, ExtensionPoint::Imports, "x").is_err());
    }

    #[test]
    fn applying_twice_duplicates_the_block() {
        let once = SourcePatcher::patch(ENTRY, ExtensionPoint::Startup, "connect();").unwrap();
        let twice = SourcePatcher::patch(&once, ExtensionPoint::Startup, "connect();").unwrap();
        assert_eq!(twice.matches("connect();").count(), 2);
    }

    #[test]
    fn crlf_line_endings_are_preserved() {
        let text = "a\r\n// @stackgen:imports\r\nb\r\n";
        let out = SourcePatcher::patch(text, ExtensionPoint::Imports, "x").unwrap();
        assert_eq!(out, "a\r\nx\r\n// @stackgen:imports\r\nb\r\n");
    }

    #[test]
    fn points_parse_from_marker_names() {
        for point in ExtensionPoint::ALL {
            assert_eq!(point.as_str().parse::<ExtensionPoint>().unwrap(), *point);
        }
    }
}
