//! Project scan orchestration.
//!
//! An [`Engine`] holds everything that is shared read-only between project
//! scans: the IOC database, compiled patterns and lockfile parsers. Each call
//! to [`Engine::scan_project`] gets its own [`FindingsAggregator`].
//!
//! # Example
//!
//! ```no_run
//! use hulud_scan::engine::{Engine, ScanOptions};
//! use hulud_scan::ioc::IocDatabase;
//! use hulud_scan::signatures::Signatures;
//! use std::path::Path;
//!
//! let engine = Engine::new(IocDatabase::fallback(), Signatures::default(), ScanOptions::default())?;
//! let result = engine.scan_project(Path::new("."))?;
//! println!("{} findings, clean: {}", result.findings.len(), result.verdict());
//! # Ok::<(), hulud_scan::ScanError>(())
//! ```

use crate::aggregate::FindingsAggregator;
use crate::checker::{ManifestChecker, PackageMatcher};
use crate::config::IgnoreConfig;
use crate::error::{Diagnostic, ScanError};
use crate::ioc::IocDatabase;
use crate::lockfile::{
    all_parsers, parse_lockfile, read_lossy, LockfileParser, Manifest, ParseOutcome,
    MANIFEST_FILENAME, UNSUPPORTED_LOCKFILES,
};
use crate::model::ScanResult;
use crate::scanner::{read_text, walk, PatternScanner};
use crate::signatures::Signatures;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Knobs that change what a project scan covers.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Scan source files, workflows and payload filenames, not just dependencies.
    pub deep_scan: bool,
    pub ignore: IgnoreConfig,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            deep_scan: true,
            ignore: IgnoreConfig::default(),
        }
    }
}

pub struct Engine {
    db: IocDatabase,
    options: ScanOptions,
    manifest_checker: ManifestChecker,
    scanner: PatternScanner,
    parsers: Vec<Box<dyn LockfileParser>>,
}

impl Engine {
    /// Compiles every pattern once.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Pattern`] if a signature or catalog regex is invalid.
    pub fn new(db: IocDatabase, signatures: Signatures, options: ScanOptions) -> Result<Self, ScanError> {
        Ok(Self {
            manifest_checker: ManifestChecker::new(&signatures)?,
            scanner: PatternScanner::new(&signatures)?,
            parsers: all_parsers(),
            db,
            options,
        })
    }

    /// Scans one project.
    ///
    /// A file target is scanned as the project in its parent directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::TargetNotFound`] if `target` does not exist. Any
    /// problem with an individual file is recorded as a diagnostic instead.
    pub fn scan_project(&self, target: &Path) -> Result<ScanResult, ScanError> {
        if !target.exists() {
            return Err(ScanError::TargetNotFound(target.to_path_buf()));
        }
        let root = project_root(target);
        info!(project = %root.display(), "scanning project");

        let mut agg = FindingsAggregator::new(&root, self.db.len());
        self.scan_dependencies(&root, &mut agg);
        if self.options.deep_scan {
            self.scan_sources(&root, &mut agg);
            self.scan_workflows(&root, &mut agg);
            self.scan_known_files(&root, &mut agg);
        }

        let result = agg.finish();
        debug!(
            project = %root.display(),
            findings = result.findings.len(),
            files = result.scanned_files,
            packages = result.scanned_packages(),
            "project scan finished"
        );
        Ok(result)
    }

    /// Scans every project found under `root`, one at a time.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::TargetNotFound`] if `root` does not exist.
    pub fn scan_all(&self, root: &Path) -> Result<Vec<ScanResult>, ScanError> {
        discover_projects(root)?
            .iter()
            .map(|project| self.scan_project(project))
            .collect()
    }

    fn scan_dependencies(&self, root: &Path, agg: &mut FindingsAggregator) {
        let matcher = PackageMatcher::new(&self.db, &self.options.ignore);

        let manifest_path = root.join(MANIFEST_FILENAME);
        if manifest_path.is_file() {
            let display = Path::new(MANIFEST_FILENAME);
            match read_lossy(&manifest_path, display) {
                Ok(content) => {
                    agg.file_scanned();
                    match Manifest::parse(&content) {
                        Ok(manifest) => {
                            agg.add_packages(&manifest.package_map());
                            agg.add_dependency_findings(matcher.check(&manifest.declarations, display));
                            agg.add_dependency_findings(self.manifest_checker.check(&manifest, display));
                        }
                        Err(e) => {
                            warn!(file = %manifest_path.display(), "manifest parse failed: {}", e);
                            agg.add_diagnostic(Diagnostic::new(
                                display,
                                format!("manifest parse failed: {}", e),
                            ));
                        }
                    }
                }
                Err(diagnostic) => {
                    warn!("{}", diagnostic);
                    agg.add_diagnostic(diagnostic);
                }
            }
        }

        for parser in &self.parsers {
            for &filename in parser.filenames() {
                let path = root.join(filename);
                if !path.is_file() {
                    continue;
                }
                info!(file = %path.display(), parser = parser.name(), "found lockfile");

                let display = Path::new(filename);
                match parse_lockfile(parser.as_ref(), &path, display) {
                    ParseOutcome::Parsed(packages) => {
                        agg.file_scanned();
                        agg.add_packages(&packages);
                        agg.add_dependency_findings(
                            matcher.check(&packages.declarations(parser.source()), display),
                        );
                    }
                    ParseOutcome::Degraded(diagnostic) => agg.add_diagnostic(diagnostic),
                }
            }
        }

        for &filename in UNSUPPORTED_LOCKFILES {
            if root.join(filename).is_file() {
                info!(file = filename, "binary lockfile format is not supported, skipping");
                agg.add_diagnostic(Diagnostic::new(
                    filename,
                    "binary lockfile format is not supported; skipped",
                ));
            }
        }
    }

    fn scan_sources(&self, root: &Path, agg: &mut FindingsAggregator) {
        let found = walk::source_files(root, &self.options.ignore);
        debug!(count = found.paths.len(), "source files to scan");
        record_walk_errors(agg, found.errors);

        for path in found.paths {
            let display = walk::relative_to(root, &path);
            match read_text(&path, &display) {
                Ok(content) => {
                    agg.file_scanned();
                    agg.add_scan_findings(self.scanner.scan_source(&display, &content));
                }
                Err(diagnostic) => {
                    warn!("{}", diagnostic);
                    agg.add_diagnostic(diagnostic);
                }
            }
        }
    }

    fn scan_workflows(&self, root: &Path, agg: &mut FindingsAggregator) {
        let found = walk::workflow_files(root, &self.options.ignore);
        record_walk_errors(agg, found.errors);

        for path in found.paths {
            let display = walk::relative_to(root, &path);
            match read_text(&path, &display) {
                Ok(content) => {
                    agg.file_scanned();
                    agg.add_scan_findings(self.scanner.scan_workflow(&display, &content));
                }
                Err(diagnostic) => {
                    // The filename alone is still evidence.
                    agg.add_scan_findings(self.scanner.workflow_name_findings(&display));
                    warn!("{}", diagnostic);
                    agg.add_diagnostic(diagnostic);
                }
            }
        }
    }

    fn scan_known_files(&self, root: &Path, agg: &mut FindingsAggregator) {
        let found = walk::files_named(root, &self.options.ignore, |name| {
            self.scanner.is_known_malicious_name(name)
        });
        record_walk_errors(agg, found.errors);

        for path in found.paths {
            let display = walk::relative_to(root, &path);
            if let Some(finding) = self.scanner.known_file_finding(&display) {
                agg.add_scan_findings([finding]);
            }
        }
    }
}

/// Walk errors are already logged by the walker.
fn record_walk_errors(agg: &mut FindingsAggregator, errors: Vec<Diagnostic>) {
    for diagnostic in errors {
        agg.add_diagnostic(diagnostic);
    }
}

fn project_root(target: &Path) -> PathBuf {
    if target.is_file() {
        match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    } else {
        target.to_path_buf()
    }
}

/// Directories under `root` containing a `package.json`, excluding `node_modules`.
///
/// # Errors
///
/// Returns [`ScanError::TargetNotFound`] if `root` does not exist.
pub fn discover_projects(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    if !root.exists() {
        return Err(ScanError::TargetNotFound(root.to_path_buf()));
    }
    let found = walk::project_roots(&project_root(root));
    info!(
        count = found.paths.len(),
        unreadable = found.errors.len(),
        root = %root.display(),
        "discovered projects"
    );
    Ok(found.paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use std::fs;

    fn engine(db: IocDatabase) -> Engine {
        Engine::new(db, Signatures::default(), ScanOptions::default()).unwrap()
    }

    #[test]
    fn test_missing_target_is_fatal() {
        let result = engine(IocDatabase::new()).scan_project(Path::new("/no/such/project"));
        assert!(matches!(result, Err(ScanError::TargetNotFound(_))));
    }

    #[test]
    fn test_file_target_scans_parent() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("package.json");
        fs::write(&manifest, r#"{"dependencies": {"pkg": "1.0.0"}}"#).unwrap();

        let db = IocDatabase::from_entries([("pkg", vec!["1.0.0"])]);
        let result = engine(db).scan_project(&manifest).unwrap();
        assert_eq!(result.target, dir.path());
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].category, Category::CompromisedPackage);
    }

    #[test]
    fn test_malformed_manifest_degrades() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{ broken").unwrap();

        let result = engine(IocDatabase::fallback()).scan_project(dir.path()).unwrap();
        assert!(result.findings.is_empty());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].file, PathBuf::from("package.json"));
        assert!(result.verdict());
    }

    #[test]
    fn test_bun_lockb_is_skipped_with_notice() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bun.lockb"), [0u8, 159, 146, 150]).unwrap();

        let result = engine(IocDatabase::fallback()).scan_project(dir.path()).unwrap();
        assert_eq!(result.scanned_files, 0);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].file, PathBuf::from("bun.lockb"));
    }

    #[test]
    fn test_quick_scan_skips_sources() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.js"), "// Shai-Hulud").unwrap();

        let options = ScanOptions {
            deep_scan: false,
            ..ScanOptions::default()
        };
        let engine = Engine::new(IocDatabase::fallback(), Signatures::default(), options).unwrap();
        let result = engine.scan_project(dir.path()).unwrap();
        assert!(result.findings.is_empty());
        assert_eq!(result.scanned_files, 0);
    }

    #[test]
    fn test_lockfile_overrides_manifest_range() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies": {"left-pad": "^1.3.0"}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("package-lock.json"),
            r#"{"lockfileVersion": 3, "packages": {"": {}, "node_modules/left-pad": {"version": "1.3.0"}}}"#,
        )
        .unwrap();

        let result = engine(IocDatabase::fallback()).scan_project(dir.path()).unwrap();
        assert_eq!(result.packages_checked.get("left-pad"), Some("1.3.0"));
        assert_eq!(result.scanned_files, 2);
    }

    #[test]
    fn test_scan_all_isolates_projects() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("package.json"), r#"{"dependencies": {"pkg": "1.0.0"}}"#).unwrap();
        fs::write(b.join("package.json"), r#"{"dependencies": {"other": "2.0.0"}}"#).unwrap();

        let db = IocDatabase::from_entries([("pkg", vec!["1.0.0"])]);
        let results = engine(db).scan_all(dir.path()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].counts.critical, 1);
        assert_eq!(results[1].counts.critical, 0);
        assert!(!results[1].packages_checked.contains("pkg"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_a_diagnostic() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("src/secret");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("payload.js"), "// Shai-Hulud\n").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not apply to root.
        let readable = fs::read_dir(&locked).is_ok();
        let result = engine(IocDatabase::fallback()).scan_project(dir.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }

        let result = result.unwrap();
        assert!(result.findings.is_empty());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].file, Path::new("src").join("secret"));
    }
}
