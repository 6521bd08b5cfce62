//! Per-project accumulation of findings.
//!
//! Dependency findings (matcher and manifest checks) always precede
//! pattern-scanner findings in the final result, each group keeping the order
//! it was recorded in.

use crate::error::Diagnostic;
use crate::model::{Finding, PackageMap, ScanResult, SeverityCounts};
use chrono::Utc;
use std::path::PathBuf;
use std::time::Instant;

pub struct FindingsAggregator {
    target: PathBuf,
    started: Instant,
    dependency_findings: Vec<Finding>,
    scan_findings: Vec<Finding>,
    diagnostics: Vec<Diagnostic>,
    packages: PackageMap,
    scanned_files: usize,
    ioc_database_size: usize,
}

impl FindingsAggregator {
    pub fn new(target: impl Into<PathBuf>, ioc_database_size: usize) -> Self {
        Self {
            target: target.into(),
            started: Instant::now(),
            dependency_findings: Vec::new(),
            scan_findings: Vec::new(),
            diagnostics: Vec::new(),
            packages: PackageMap::new(),
            scanned_files: 0,
            ioc_database_size,
        }
    }

    pub fn add_dependency_findings(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.dependency_findings.extend(findings);
    }

    pub fn add_scan_findings(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.scan_findings.extend(findings);
    }

    /// Records a diagnostic; an identical one already recorded is not repeated.
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        if !self.diagnostics.contains(&diagnostic) {
            self.diagnostics.push(diagnostic);
        }
    }

    /// Records packages seen in one source; later calls override earlier versions.
    pub fn add_packages(&mut self, packages: &PackageMap) {
        self.packages.merge(packages);
    }

    pub fn file_scanned(&mut self) {
        self.scanned_files += 1;
    }

    pub fn finish(self) -> ScanResult {
        let mut findings = self.dependency_findings;
        findings.extend(self.scan_findings);
        let counts = SeverityCounts::from_findings(&findings);

        ScanResult {
            target: self.target,
            scan_time: Utc::now(),
            elapsed: self.started.elapsed(),
            findings,
            counts,
            scanned_files: self.scanned_files,
            packages_checked: self.packages,
            ioc_database_size: self.ioc_database_size,
            diagnostics: self.diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Location, Severity};

    fn finding(severity: Severity, file: &str) -> Finding {
        Finding::new(severity, Category::MaliciousIndicator, Location::file(file), file)
    }

    #[test]
    fn test_dependency_findings_come_first() {
        let mut agg = FindingsAggregator::new("/project", 3);
        agg.add_scan_findings([finding(Severity::Warning, "a.js")]);
        agg.add_dependency_findings([finding(Severity::Critical, "package-lock.json")]);
        agg.add_scan_findings([finding(Severity::High, "b.js")]);

        let result = agg.finish();
        let files: Vec<_> = result.findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(files, vec!["package-lock.json", "a.js", "b.js"]);
        assert_eq!(result.counts.critical, 1);
        assert_eq!(result.counts.high, 1);
        assert_eq!(result.counts.warning, 1);
        assert!(!result.verdict());
        assert_eq!(result.ioc_database_size, 3);
    }

    #[test]
    fn test_empty_aggregate_is_clean() {
        let result = FindingsAggregator::new("/project", 0).finish();
        assert!(result.findings.is_empty());
        assert!(result.verdict());
        assert_eq!(result.scanned_files, 0);
        assert_eq!(result.scanned_packages(), 0);
    }

    #[test]
    fn test_packages_later_sources_override() {
        let mut agg = FindingsAggregator::new("/project", 0);
        agg.add_packages(&[("a", "^1.0.0"), ("b", "2.0.0")].into_iter().collect());
        agg.add_packages(&[("a", "1.0.3")].into_iter().collect());

        let result = agg.finish();
        assert_eq!(result.packages_checked.get("a"), Some("1.0.3"));
        assert_eq!(result.scanned_packages(), 2);
    }

    #[test]
    fn test_identical_diagnostics_are_recorded_once() {
        let mut agg = FindingsAggregator::new("/project", 0);
        agg.add_diagnostic(Diagnostic::new("src/secret", "failed to read directory entry"));
        agg.add_diagnostic(Diagnostic::new("src/secret", "failed to read directory entry"));
        agg.add_diagnostic(Diagnostic::new("yarn.lock", "failed to read file"));

        assert_eq!(agg.finish().diagnostics.len(), 2);
    }
}
