//! Template renderer adapters.

mod placeholder;

pub use placeholder::{PlaceholderRenderer, TEMPLATE_EXTENSION};
