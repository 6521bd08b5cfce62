use crate::config::IgnoreConfig;
use crate::ioc::IocDatabase;
use crate::model::{Category, Finding, Location, PackageDeclaration, Severity};
use std::path::Path;
use tracing::debug;

/// Strips leading range-operator characters (`^`, `~`, `>=`, `=`, spaces, ...).
///
/// Everything before the first ASCII digit is dropped; the rest is returned
/// untouched.
///
/// ```
/// use hulud_scan::checker::normalize_version;
///
/// assert_eq!(normalize_version("^4.2.1"), "4.2.1");
/// assert_eq!(normalize_version("~=4.2.1"), "4.2.1");
/// assert_eq!(normalize_version("4.2.1"), "4.2.1");
/// ```
pub fn normalize_version(version: &str) -> &str {
    version.trim_start_matches(|c: char| !c.is_ascii_digit())
}

/// Matches package declarations against the IOC database.
pub struct PackageMatcher<'a> {
    db: &'a IocDatabase,
    ignore: &'a IgnoreConfig,
}

impl<'a> PackageMatcher<'a> {
    pub fn new(db: &'a IocDatabase, ignore: &'a IgnoreConfig) -> Self {
        Self { db, ignore }
    }

    /// Checks every declaration read from `file`.
    ///
    /// Emits at most one finding per declaration, in input order.
    pub fn check(&self, declarations: &[PackageDeclaration], file: &Path) -> Vec<Finding> {
        declarations
            .iter()
            .filter_map(|decl| self.check_one(decl, file))
            .collect()
    }

    fn check_one(&self, decl: &PackageDeclaration, file: &Path) -> Option<Finding> {
        let compromised = self.db.versions(&decl.name)?;
        if self.ignore.should_ignore_package(&decl.name) {
            debug!(package = %decl.name, "package is on the ignore list");
            return None;
        }

        let normalized = normalize_version(&decl.version);
        if compromised.contains(normalized) {
            return Some(
                self.finding(Severity::Critical, decl, file, "exact")
                    .with_context("matched_version", normalized),
            );
        }

        // Ranges that embed a listed version without normalizing to it.
        if decl.source.is_resolved() {
            return None;
        }
        let embedded = compromised.iter().find(|v| decl.version.contains(v.as_str()))?;
        Some(
            self.finding(Severity::High, decl, file, "range-substring")
                .with_context("matched_version", embedded.as_str()),
        )
    }

    fn finding(
        &self,
        severity: Severity,
        decl: &PackageDeclaration,
        file: &Path,
        match_kind: &str,
    ) -> Finding {
        let message = match severity {
            Severity::Critical => format!(
                "[{}] Compromised package: {}@{}",
                file.display(),
                decl.name,
                decl.version
            ),
            _ => format!(
                "[{}] Range for {} may include a compromised version: {}",
                file.display(),
                decl.name,
                decl.version
            ),
        };

        let mut finding = Finding::new(
            severity,
            Category::CompromisedPackage,
            Location::file(file),
            message,
        )
        .with_context("package", decl.name.as_str())
        .with_context("version", decl.version.as_str())
        .with_context("source", decl.source.as_str())
        .with_context("match", match_kind);

        if let Some(section) = decl.section {
            finding = finding.with_context("section", section.key());
        }
        finding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DependencySection, SourceKind};

    fn db() -> IocDatabase {
        IocDatabase::from_entries([("pkg", vec!["1.0.0"]), ("posthog-node", vec!["4.2.1"])])
    }

    fn lock(name: &str, version: &str) -> PackageDeclaration {
        PackageDeclaration::new(name, version, SourceKind::NpmLock)
    }

    #[test]
    fn test_normalize_version() {
        assert_eq!(normalize_version("^4.2.1"), "4.2.1");
        assert_eq!(normalize_version("~=4.2.1"), "4.2.1");
        assert_eq!(normalize_version(">= 4.2.1"), "4.2.1");
        assert_eq!(normalize_version("4.2.1"), "4.2.1");
        assert_eq!(normalize_version("latest"), "");
    }

    #[test]
    fn test_exact_lockfile_match() {
        let db = db();
        let ignore = IgnoreConfig::default();
        let matcher = PackageMatcher::new(&db, &ignore);

        let findings = matcher.check(&[lock("pkg", "1.0.0")], Path::new("package-lock.json"));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].category, Category::CompromisedPackage);
        assert_eq!(findings[0].context["package"], "pkg");
        assert_eq!(findings[0].location.file, Path::new("package-lock.json"));

        let clean = matcher.check(&[lock("pkg", "1.0.1")], Path::new("package-lock.json"));
        assert!(clean.is_empty());
    }

    #[test]
    fn test_unlisted_package_is_ignored() {
        let db = db();
        let ignore = IgnoreConfig::default();
        let matcher = PackageMatcher::new(&db, &ignore);
        assert!(matcher
            .check(&[lock("left-pad", "1.0.0")], Path::new("yarn.lock"))
            .is_empty());
    }

    #[test]
    fn test_manifest_range_normalizes_to_exact() {
        let db = db();
        let ignore = IgnoreConfig::default();
        let matcher = PackageMatcher::new(&db, &ignore);
        let decl = PackageDeclaration::new("posthog-node", "^4.2.1", SourceKind::Manifest)
            .with_section(DependencySection::Dependencies);

        let findings = matcher.check(&[decl], Path::new("package.json"));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].context["section"], "dependencies");
        assert_eq!(findings[0].context["match"], "exact");
    }

    #[test]
    fn test_manifest_range_substring_is_high() {
        let db = db();
        let ignore = IgnoreConfig::default();
        let matcher = PackageMatcher::new(&db, &ignore);
        let decl = PackageDeclaration::new("pkg", ">=0.9.0 <1.0.0 || 1.0.0-rc", SourceKind::Manifest);

        let findings = matcher.check(&[decl], Path::new("package.json"));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].context["match"], "range-substring");
        assert_eq!(findings[0].context["matched_version"], "1.0.0");
    }

    #[test]
    fn test_lockfile_never_uses_substring_heuristic() {
        let db = db();
        let ignore = IgnoreConfig::default();
        let matcher = PackageMatcher::new(&db, &ignore);
        assert!(matcher
            .check(&[lock("pkg", "11.0.0")], Path::new("pnpm-lock.yaml"))
            .is_empty());
    }

    #[test]
    fn test_ignored_package() {
        let db = db();
        let ignore = IgnoreConfig {
            packages: vec!["pkg".to_string()],
            paths: Vec::new(),
        };
        let matcher = PackageMatcher::new(&db, &ignore);
        assert!(matcher
            .check(&[lock("pkg", "1.0.0")], Path::new("package-lock.json"))
            .is_empty());
    }
}
