//! Manifest and lockfile parsers.
//!
//! Every lockfile format is handled by a [`LockfileParser`] that turns file
//! content into a [`PackageMap`] of `name → resolved version`. Parsing never
//! aborts a scan: [`parse_lockfile`] converts I/O and format errors into a
//! [`ParseOutcome::Degraded`] carrying a [`Diagnostic`].
//!
//! | Parser | File | Layout |
//! |--------|------|--------|
//! | [`NpmLockParser`] | `package-lock.json`, `npm-shrinkwrap.json` | nested tree + flat install paths |
//! | [`YarnLockParser`] | `yarn.lock` | header/indented-body blocks |
//! | [`PnpmLockParser`] | `pnpm-lock.yaml` | `packages:` section lines |
//!
//! `bun.lockb` is binary and listed in [`UNSUPPORTED_LOCKFILES`]; it is
//! recognised by name and skipped.

mod manifest;
mod npm;
mod pnpm;
mod yarn;

pub use manifest::{Manifest, MANIFEST_FILENAME};
pub use npm::{package_name_from_install_path, NpmLockParser};
pub use pnpm::PnpmLockParser;
pub use yarn::YarnLockParser;

use crate::error::{Diagnostic, LockfileError};
use crate::model::{PackageMap, SourceKind};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Lockfiles recognised by name but never parsed.
pub const UNSUPPORTED_LOCKFILES: &[&str] = &["bun.lockb"];

/// Parser for one lockfile format.
pub trait LockfileParser: Send + Sync {
    /// Human-readable name of the format.
    fn name(&self) -> &'static str;

    /// Source tag attached to every declaration this parser produces.
    fn source(&self) -> SourceKind;

    /// File names this parser handles.
    fn filenames(&self) -> &'static [&'static str];

    /// Returns true if `path` has one of [`filenames`](Self::filenames).
    fn can_parse(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.filenames().contains(&name))
    }

    /// Parses lockfile content.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is structurally unusable. Callers are
    /// expected to degrade rather than propagate; see [`parse_lockfile`].
    fn parse(&self, content: &str) -> Result<PackageMap, LockfileError>;
}

/// Returns every supported lockfile parser.
pub fn all_parsers() -> Vec<Box<dyn LockfileParser>> {
    vec![
        Box::new(NpmLockParser),
        Box::new(YarnLockParser),
        Box::new(PnpmLockParser),
    ]
}

/// Result of reading and parsing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed(PackageMap),
    Degraded(Diagnostic),
}

impl ParseOutcome {
    /// Parsed packages, or an empty map when degraded.
    pub fn into_packages(self) -> PackageMap {
        match self {
            ParseOutcome::Parsed(packages) => packages,
            ParseOutcome::Degraded(_) => PackageMap::new(),
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ParseOutcome::Parsed(_) => None,
            ParseOutcome::Degraded(d) => Some(d),
        }
    }
}

/// Reads `path` with lossy UTF-8 decoding.
///
/// `rel` is the path used in the diagnostic when the read fails.
pub(crate) fn read_lossy(path: &Path, rel: &Path) -> Result<String, Diagnostic> {
    fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|e| Diagnostic::new(rel, format!("failed to read file: {}", e)))
}

/// Reads and parses a lockfile, degrading on any failure.
///
/// `rel` is the project-relative path recorded in diagnostics.
pub fn parse_lockfile(parser: &dyn LockfileParser, path: &Path, rel: &Path) -> ParseOutcome {
    let content = match read_lossy(path, rel) {
        Ok(content) => content,
        Err(diagnostic) => {
            warn!(file = %rel.display(), "{}", diagnostic.message);
            return ParseOutcome::Degraded(diagnostic);
        }
    };

    match parser.parse(&content) {
        Ok(packages) => {
            debug!(
                file = %rel.display(),
                parser = parser.name(),
                packages = packages.len(),
                "parsed lockfile"
            );
            ParseOutcome::Parsed(packages)
        }
        Err(e) => {
            warn!(file = %rel.display(), parser = parser.name(), "lockfile parse failed: {}", e);
            ParseOutcome::Degraded(Diagnostic::new(
                rel,
                format!("{} parse failed: {}", parser.name(), e),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parsers_recognise_their_files() {
        let parsers = all_parsers();
        let find = |name: &str| {
            parsers
                .iter()
                .find(|p| p.can_parse(&PathBuf::from("/project").join(name)))
                .map(|p| p.source())
        };

        assert_eq!(find("package-lock.json"), Some(SourceKind::NpmLock));
        assert_eq!(find("npm-shrinkwrap.json"), Some(SourceKind::NpmLock));
        assert_eq!(find("yarn.lock"), Some(SourceKind::YarnLock));
        assert_eq!(find("pnpm-lock.yaml"), Some(SourceKind::PnpmLock));
        assert_eq!(find("bun.lockb"), None);
        assert_eq!(find("package.json"), None);
    }

    #[test]
    fn test_missing_file_degrades() {
        let outcome = parse_lockfile(
            &NpmLockParser,
            Path::new("/definitely/not/here/package-lock.json"),
            Path::new("package-lock.json"),
        );
        let diagnostic = outcome.diagnostic().cloned().unwrap();
        assert_eq!(diagnostic.file, PathBuf::from("package-lock.json"));
        assert!(outcome.into_packages().is_empty());
    }

    #[test]
    fn test_malformed_content_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package-lock.json");
        fs::write(&path, "{ not json").unwrap();

        let outcome = parse_lockfile(&NpmLockParser, &path, Path::new("package-lock.json"));
        assert!(matches!(outcome, ParseOutcome::Degraded(_)));
    }
}
