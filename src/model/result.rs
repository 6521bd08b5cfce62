use crate::error::Diagnostic;
use crate::model::{Finding, PackageMap, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Number of findings per severity tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub warning: usize,
}

impl SeverityCounts {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let count = |severity: Severity| findings.iter().filter(|f| f.severity == severity).count();
        Self {
            critical: count(Severity::Critical),
            high: count(Severity::High),
            warning: count(Severity::Warning),
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.warning
    }
}

/// Complete outcome of one project scan.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Project root that was scanned.
    pub target: PathBuf,
    pub scan_time: DateTime<Utc>,
    pub elapsed: Duration,
    /// Matcher findings first, then pattern scanner findings, each in emission order.
    pub findings: Vec<Finding>,
    pub counts: SeverityCounts,
    pub scanned_files: usize,
    pub packages_checked: PackageMap,
    pub ioc_database_size: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ScanResult {
    /// `true` iff no CRITICAL finding exists.
    pub fn verdict(&self) -> bool {
        self.counts.critical == 0
    }

    pub fn scanned_packages(&self) -> usize {
        self.packages_checked.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Location};

    fn finding(severity: Severity) -> Finding {
        Finding::new(severity, Category::SuspiciousScript, Location::file("package.json"), "x")
    }

    #[test]
    fn test_counts_from_findings() {
        let findings = vec![
            finding(Severity::Critical),
            finding(Severity::Warning),
            finding(Severity::Warning),
            finding(Severity::High),
        ];
        let counts = SeverityCounts::from_findings(&findings);
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.high, 1);
        assert_eq!(counts.warning, 2);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_verdict_ignores_high_and_warning() {
        let findings = vec![finding(Severity::High), finding(Severity::Warning)];
        let result = ScanResult {
            target: PathBuf::from("."),
            scan_time: Utc::now(),
            elapsed: Duration::from_millis(5),
            counts: SeverityCounts::from_findings(&findings),
            findings,
            scanned_files: 1,
            packages_checked: PackageMap::new(),
            ioc_database_size: 0,
            diagnostics: Vec::new(),
        };
        assert!(result.verdict());
        assert_eq!(result.counts.high, 1);
    }
}
