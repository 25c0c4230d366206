//! Strict `{{NAME}}` substitution renderer.

use std::path::{Path, PathBuf};

use stackgen_core::{
    application::ports::TemplateRenderer, domain::RenderContext, error::StackgenResult,
};
use tracing::instrument;

/// Extension that marks a file for rendering (`app.ts.tmpl` -> `app.ts`).
pub const TEMPLATE_EXTENSION: &str = "tmpl";

/// Renderer delegating to [`RenderContext::render`].
///
/// Unknown placeholders are errors, never empty strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRenderer;

impl PlaceholderRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateRenderer for PlaceholderRenderer {
    fn is_template(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == TEMPLATE_EXTENSION)
    }

    fn output_path(&self, path: &Path) -> PathBuf {
        if self.is_template(path) {
            path.with_extension("")
        } else {
            path.to_path_buf()
        }
    }

    #[instrument(skip_all, fields(bytes = text.len()))]
    fn render(&self, text: &str, context: &RenderContext) -> StackgenResult<String> {
        Ok(context.render(text)?)
    }
}
