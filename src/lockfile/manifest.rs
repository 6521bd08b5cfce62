//! `package.json` reader.
//!
//! Extracts the dependency sections as unresolved declarations plus the
//! fields the manifest checks inspect: `scripts`, `main`, `bin`, `browser`
//! and `repository`.

use crate::error::LockfileError;
use crate::model::{DependencySection, PackageDeclaration, PackageMap, SourceKind};
use serde_json::{Map, Value};

pub const MANIFEST_FILENAME: &str = "package.json";

/// The parts of a `package.json` relevant to detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub name: Option<String>,
    pub declarations: Vec<PackageDeclaration>,
    /// `(script name, command)` in document order.
    pub scripts: Vec<(String, String)>,
    /// `(field, value)` for every string under `main`, `bin` and `browser`.
    pub file_references: Vec<(String, String)>,
    pub repository_url: Option<String>,
}

impl Manifest {
    /// Parses manifest JSON.
    ///
    /// Non-string dependency ranges and script bodies are ignored rather than
    /// rejected; only a non-object top level is an error.
    pub fn parse(content: &str) -> Result<Self, LockfileError> {
        let root: Value = serde_json::from_str(content)?;
        let root = root
            .as_object()
            .ok_or_else(|| LockfileError::Structure("top level is not an object".to_string()))?;

        let mut manifest = Manifest {
            name: root.get("name").and_then(Value::as_str).map(str::to_string),
            ..Default::default()
        };

        for section in DependencySection::ALL {
            let Some(deps) = root.get(section.key()).and_then(Value::as_object) else {
                continue;
            };
            for (name, range) in deps {
                if let Some(range) = range.as_str() {
                    manifest.declarations.push(
                        PackageDeclaration::new(name.as_str(), range, SourceKind::Manifest)
                            .with_section(section),
                    );
                }
            }
        }

        if let Some(scripts) = root.get("scripts").and_then(Value::as_object) {
            manifest.scripts = string_entries(scripts);
        }

        for field in ["main", "bin", "browser"] {
            match root.get(field) {
                Some(Value::String(value)) => {
                    manifest.file_references.push((field.to_string(), value.clone()));
                }
                Some(Value::Object(map)) => {
                    for (_, value) in string_entries(map) {
                        manifest.file_references.push((field.to_string(), value));
                    }
                }
                _ => {}
            }
        }

        manifest.repository_url = match root.get("repository") {
            Some(Value::String(url)) => Some(url.clone()),
            Some(Value::Object(repo)) => repo.get("url").and_then(Value::as_str).map(str::to_string),
            _ => None,
        };

        Ok(manifest)
    }

    /// Declared ranges as a package map, later sections winning.
    pub fn package_map(&self) -> PackageMap {
        self.declarations
            .iter()
            .map(|d| (d.name.as_str(), d.version.as_str()))
            .collect()
    }
}

fn string_entries(map: &Map<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
  "name": "demo",
  "main": "index.js",
  "bin": { "demo": "bin/demo.js", "setup": "setup_bun.js" },
  "browser": false,
  "repository": { "type": "git", "url": "https://github.com/acme/demo.git" },
  "scripts": {
    "build": "tsc",
    "postinstall": "node setup_bun.js",
    "weird": 42
  },
  "dependencies": { "lodash": "^4.17.21", "local": { "path": "../x" } },
  "devDependencies": { "typescript": "~5.4.0" },
  "optionalDependencies": { "fsevents": "2.3.3" }
}"#;

    #[test]
    fn test_declarations_carry_section() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("demo"));
        assert_eq!(manifest.declarations.len(), 3);

        let lodash = &manifest.declarations[0];
        assert_eq!(lodash.name, "lodash");
        assert_eq!(lodash.version, "^4.17.21");
        assert_eq!(lodash.source, SourceKind::Manifest);
        assert_eq!(lodash.section, Some(DependencySection::Dependencies));
        assert_eq!(
            manifest.declarations[2].section,
            Some(DependencySection::OptionalDependencies)
        );
    }

    #[test]
    fn test_scripts_and_references() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(
            manifest.scripts,
            vec![
                ("build".to_string(), "tsc".to_string()),
                ("postinstall".to_string(), "node setup_bun.js".to_string()),
            ]
        );
        assert_eq!(
            manifest.file_references,
            vec![
                ("main".to_string(), "index.js".to_string()),
                ("bin".to_string(), "bin/demo.js".to_string()),
                ("bin".to_string(), "setup_bun.js".to_string()),
            ]
        );
        assert_eq!(
            manifest.repository_url.as_deref(),
            Some("https://github.com/acme/demo.git")
        );
    }

    #[test]
    fn test_repository_string_form() {
        let manifest = Manifest::parse(r#"{"repository": "github:acme/Sha1-Hulud"}"#).unwrap();
        assert_eq!(manifest.repository_url.as_deref(), Some("github:acme/Sha1-Hulud"));
    }

    #[test]
    fn test_invalid_manifest_is_an_error() {
        assert!(Manifest::parse("{").is_err());
        assert!(Manifest::parse("\"just a string\"").is_err());
    }
}
