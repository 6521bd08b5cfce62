//! Indicator-of-compromise database.
//!
//! Maps a package name to the exact version literals known to be
//! compromised. The database is loaded once per process and shared
//! read-only by every project scan.
//!
//! # CSV format
//!
//! ```text
//! package_name,package_versions
//! posthog-node,"4.2.1, 4.2.2"
//! @asyncapi/specs,7.6.4
//! ```
//!
//! Additional columns are ignored.

pub mod remote;

use crate::error::ScanError;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Package → compromised version literals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IocDatabase {
    packages: HashMap<String, BTreeSet<String>>,
}

#[derive(Deserialize)]
struct IocRow {
    package_name: String,
    package_versions: String,
}

impl IocDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a database from `(package, versions)` pairs.
    pub fn from_entries<I, N, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, Vec<V>)>,
        N: Into<String>,
        V: Into<String>,
    {
        let mut db = Self::new();
        for (name, versions) in entries {
            let name = name.into();
            for version in versions {
                db.insert(name.clone(), version);
            }
        }
        db
    }

    /// Built-in list used when no IOC file is available.
    pub fn fallback() -> Self {
        Self::from_entries([
            ("zapier-platform-core", vec!["0.15.0", "0.15.1"]),
            ("zapier-platform-cli", vec!["18.0.0", "18.0.1"]),
            ("zapier-sdk", vec!["1.0.0"]),
            ("@asyncapi/specs", vec!["7.6.4"]),
            ("@asyncapi/parser", vec!["3.3.1"]),
            ("@asyncapi/modelina", vec!["4.3.0"]),
            ("posthog-node", vec!["4.2.1"]),
            ("posthog-js", vec!["1.165.0"]),
            ("@postman/postman-mcp-cli", vec!["0.1.0"]),
            ("@ensdomains/ensjs", vec!["4.1.0"]),
            ("@browserbasehq/sdk", vec!["1.5.0"]),
        ])
    }

    /// Parses CSV with `package_name` and `package_versions` columns.
    ///
    /// Versions are split on `,` and trimmed; rows for the same package are
    /// merged.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut db = Self::new();

        for row in csv.deserialize::<IocRow>() {
            let row = row?;
            let name = row.package_name.trim();
            if name.is_empty() {
                continue;
            }
            for version in row.package_versions.split(',').map(str::trim) {
                if !version.is_empty() {
                    db.insert(name, version);
                }
            }
        }

        Ok(db)
    }

    /// Loads a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not valid CSV
    /// with the required columns.
    pub fn load(path: &Path) -> Result<Self, ScanError> {
        let file = File::open(path)?;
        Self::from_csv_reader(file).map_err(|source| ScanError::IocLoad {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` if given and readable, otherwise returns [`Self::fallback`].
    pub fn load_or_fallback(path: Option<&Path>) -> Self {
        let Some(path) = path.filter(|p| p.exists()) else {
            let db = Self::fallback();
            warn!(packages = db.len(), "IOC database not found, using built-in fallback list");
            return db;
        };

        match Self::load(path) {
            Ok(db) if !db.is_empty() => {
                info!(path = %path.display(), packages = db.len(), "loaded IOC database");
                db
            }
            Ok(_) => {
                warn!(path = %path.display(), "IOC database is empty, using built-in fallback list");
                Self::fallback()
            }
            Err(e) => {
                warn!("{}; using built-in fallback list", e);
                Self::fallback()
            }
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, version: impl Into<String>) {
        self.packages
            .entry(name.into())
            .or_default()
            .insert(version.into());
    }

    /// Compromised versions of `name`, if it is listed.
    pub fn versions(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.packages.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Number of listed packages.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
