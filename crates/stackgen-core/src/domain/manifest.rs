//! Structural editing of `package.json` manifests.
//!
//! Generators never patch manifests as text. They parse the document, set
//! keys, and serialise it back. Key order is preserved, so a manifest that
//! was only touched in one section diffs cleanly against the template.

use serde_json::{Map, Value};

use crate::domain::error::DomainError;

#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    root: Map<String, Value>,
}

impl PackageManifest {
    /// Empty manifest with only a name and version.
    pub fn new(name: impl Into<String>) -> Self {
        let mut root = Map::new();
        root.insert("name".into(), Value::String(name.into()));
        root.insert("version".into(), Value::String("0.1.0".into()));
        Self { root }
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(root)) => Ok(Self { root }),
            Ok(_) => Err(DomainError::InvalidManifest(
                "top-level value must be an object".into(),
            )),
            Err(e) => Err(DomainError::InvalidManifest(e.to_string())),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.root.get("name").and_then(Value::as_str)
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.root.insert("name".into(), Value::String(name.into()));
        self
    }

    pub fn add_dependency(&mut self, package: &str, version: &str) -> &mut Self {
        self.insert_into("dependencies", package, Value::String(version.into()))
    }

    pub fn add_dev_dependency(&mut self, package: &str, version: &str) -> &mut Self {
        self.insert_into("devDependencies", package, Value::String(version.into()))
    }

    pub fn set_script(&mut self, name: &str, command: &str) -> &mut Self {
        self.insert_into("scripts", name, Value::String(command.into()))
    }

    /// Set an arbitrary top-level key.
    pub fn set_field(&mut self, key: &str, value: Value) -> &mut Self {
        self.root.insert(key.into(), value);
        self
    }

    pub fn dependency(&self, package: &str) -> Option<&str> {
        self.section_value("dependencies", package)
    }

    pub fn dev_dependency(&self, package: &str) -> Option<&str> {
        self.section_value("devDependencies", package)
    }

    pub fn script(&self, name: &str) -> Option<&str> {
        self.section_value("scripts", name)
    }

    /// Two-space indented JSON with a trailing newline.
    pub fn to_string_pretty(&self) -> String {
        let mut out = serde_json::to_string_pretty(&self.root).unwrap_or_else(|_| "{}".into());
        out.push('\n');
        out
    }

    fn insert_into(&mut self, section: &str, key: &str, value: Value) -> &mut Self {
        let entry = self
            .root
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), value);
        }
        self
    }

    fn section_value(&self, section: &str, key: &str) -> Option<&str> {
        self.root
            .get(section)
            .and_then(Value::as_object)
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = r#"{
  "name": "placeholder",
  "version": "0.1.0",
  "scripts": { "dev": "tsx watch src/app.ts" },
  "dependencies": { "express": "^4.19.2" }
}"#;

    #[test]
    fn edits_sections_in_place() {
        let mut manifest = PackageManifest::parse(RAW).unwrap();
        manifest
            .set_name("@demo/backend")
            .add_dependency("pg", "^8.11.3")
            .add_dev_dependency("jest", "^29.7.0")
            .set_script("test", "jest");

        assert_eq!(manifest.name(), Some("@demo/backend"));
        assert_eq!(manifest.dependency("express"), Some("^4.19.2"));
        assert_eq!(manifest.dependency("pg"), Some("^8.11.3"));
        assert_eq!(manifest.dev_dependency("jest"), Some("^29.7.0"));
        assert_eq!(manifest.script("dev"), Some("tsx watch src/app.ts"));
    }

    #[test]
    fn key_order_is_preserved() {
        let mut manifest = PackageManifest::parse(RAW).unwrap();
        manifest.add_dependency("pg", "^8.11.3");
        let out = manifest.to_string_pretty();
        let name = out.find("\"name\"").unwrap();
        let scripts = out.find("\"scripts\"").unwrap();
        let deps = out.find("\"dependencies\"").unwrap();
        assert!(name < scripts && scripts < deps);
        assert!(out.ends_with("}\n"));
    }

    #[test]
    fn setting_a_dependency_twice_keeps_one_entry() {
        let mut manifest = PackageManifest::new("x");
        manifest.add_dependency("pg", "^8.0.0").add_dependency("pg", "^8.11.3");
        assert_eq!(manifest.to_string_pretty().matches("\"pg\"").count(), 1);
        assert_eq!(manifest.dependency("pg"), Some("^8.11.3"));
    }

    #[test]
    fn rejects_non_object_documents() {
        assert!(matches!(
            PackageManifest::parse("[1, 2]"),
            Err(DomainError::InvalidManifest(_))
        ));
        assert!(PackageManifest::parse("{ nope").is_err());
    }
}
