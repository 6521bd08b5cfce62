use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;

/// The file a package declaration was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// `package.json`
    Manifest,
    /// `package-lock.json` / `npm-shrinkwrap.json`
    NpmLock,
    /// `yarn.lock`
    YarnLock,
    /// `pnpm-lock.yaml`
    PnpmLock,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Manifest => "manifest",
            SourceKind::NpmLock => "npm-lock",
            SourceKind::YarnLock => "yarn-lock",
            SourceKind::PnpmLock => "pnpm-lock",
        }
    }

    /// Lockfile entries carry resolved versions; manifest entries carry ranges.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, SourceKind::Manifest)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Manifest section a declaration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencySection {
    #[serde(rename = "dependencies")]
    Dependencies,
    #[serde(rename = "devDependencies")]
    DevDependencies,
    #[serde(rename = "optionalDependencies")]
    OptionalDependencies,
}

impl DependencySection {
    pub const ALL: [DependencySection; 3] = [
        DependencySection::Dependencies,
        DependencySection::DevDependencies,
        DependencySection::OptionalDependencies,
    ];

    /// The manifest key for this section.
    pub fn key(&self) -> &'static str {
        match self {
            DependencySection::Dependencies => "dependencies",
            DependencySection::DevDependencies => "devDependencies",
            DependencySection::OptionalDependencies => "optionalDependencies",
        }
    }
}

/// One `name → version` pair read from a manifest or lockfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDeclaration {
    pub name: String,
    /// Declared range (manifest) or resolved literal (lockfile).
    pub version: String,
    pub source: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<DependencySection>,
}

impl PackageDeclaration {
    pub fn new(name: impl Into<String>, version: impl Into<String>, source: SourceKind) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            source,
            section: None,
        }
    }

    pub fn with_section(mut self, section: DependencySection) -> Self {
        self.section = Some(section);
        self
    }
}

/// Insertion-ordered `name → version` mapping.
///
/// Re-inserting a name replaces its version but keeps the position of the
/// first insertion, so iteration order is the order names were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl PackageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces; returns the previous version if any.
    pub fn insert(&mut self, name: impl Into<String>, version: impl Into<String>) -> Option<String> {
        let name = name.into();
        let version = version.into();
        match self.index.get(&name) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, version)),
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, version));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Copies every entry of `other` into `self`, later values winning.
    pub fn merge(&mut self, other: &PackageMap) {
        for (name, version) in other.iter() {
            self.insert(name, version);
        }
    }

    /// Tags every entry with `source`, producing matcher input.
    pub fn declarations(&self, source: SourceKind) -> Vec<PackageDeclaration> {
        self.iter()
            .map(|(name, version)| PackageDeclaration::new(name, version, source))
            .collect()
    }
}

impl Serialize for PackageMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, version) in &self.entries {
            map.serialize_entry(name, version)?;
        }
        map.end()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for PackageMap {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut map = PackageMap::new();
        for (name, version) in iter {
            map.insert(name, version);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reinsert_keeps_first_position_and_last_value() {
        let mut map = PackageMap::new();
        map.insert("a", "1.0.0");
        map.insert("b", "2.0.0");
        assert_eq!(map.insert("a", "1.0.1"), Some("1.0.0".to_string()));

        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries, vec![("a", "1.0.1"), ("b", "2.0.0")]);
    }

    #[test]
    fn test_serializes_as_ordered_object() {
        let map: PackageMap = [("zeta", "1.0.0"), ("alpha", "2.0.0")].into_iter().collect();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"zeta":"1.0.0","alpha":"2.0.0"}"#);
    }

    #[test]
    fn test_source_kind_resolution() {
        assert!(!SourceKind::Manifest.is_resolved());
        assert!(SourceKind::NpmLock.is_resolved());
        assert!(SourceKind::PnpmLock.is_resolved());
    }
}
