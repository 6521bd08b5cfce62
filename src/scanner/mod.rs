//! Content and filename scanning.
//!
//! The [`PatternScanner`] runs the two [`PatternCatalog`]s and the literal
//! token list from [`Signatures`] over raw file text:
//!
//! | Input | Checks |
//! |-------|--------|
//! | `*.js`, `*.ts`, `*.jsx`, `*.tsx` | source catalog, literal tokens |
//! | `.github/workflows/*.{yml,yaml}` | filename, workflow catalog, literal tokens |
//! | any file | known malicious filename |
//!
//! Every regex match and every token occurrence is its own finding; nothing
//! is deduplicated.
//!
//! # Example
//!
//! ```
//! use hulud_scan::scanner::PatternScanner;
//! use hulud_scan::signatures::Signatures;
//! use std::path::Path;
//!
//! let scanner = PatternScanner::new(&Signatures::default()).unwrap();
//! let findings = scanner.scan_source(Path::new("src/index.js"), "fetch(x); // Shai-Hulud");
//! assert_eq!(findings.len(), 1);
//! assert!(findings[0].is_critical());
//! ```

mod catalog;
pub mod walk;

pub use catalog::{
    CatalogKind, PatternCatalog, PatternEntry, SeverityTable, SOURCE_PATTERNS, SOURCE_SEVERITIES,
    WORKFLOW_PATTERNS, WORKFLOW_SEVERITIES,
};

use crate::error::{Diagnostic, ScanError};
use crate::model::{Category, Finding, Location, Severity};
use crate::signatures::Signatures;
use regex::Regex;
use std::path::Path;

/// Worm workflows are named `formatter_<digits>.yml`.
const FORMATTER_WORKFLOW_NAME: &str = r"^formatter_\d+\.ya?ml$";

/// Byte offsets of every line start, for offset → line lookups.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    /// 1-based line containing byte `offset`.
    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }
}

pub struct PatternScanner {
    signatures: Signatures,
    source: PatternCatalog,
    workflows: PatternCatalog,
    formatter_name: Regex,
}

impl PatternScanner {
    /// Compiles both built-in catalogs.
    pub fn new(signatures: &Signatures) -> Result<Self, ScanError> {
        Self::with_catalogs(
            signatures,
            PatternCatalog::source_files()?,
            PatternCatalog::workflows()?,
        )
    }

    pub fn with_catalogs(
        signatures: &Signatures,
        source: PatternCatalog,
        workflows: PatternCatalog,
    ) -> Result<Self, ScanError> {
        let formatter_name = Regex::new(FORMATTER_WORKFLOW_NAME).map_err(|e| ScanError::Pattern {
            id: "formatter-workflow-name".to_string(),
            source: e,
        })?;
        Ok(Self {
            signatures: signatures.clone(),
            source,
            workflows,
            formatter_name,
        })
    }

    /// Scans source text; `file` is the project-relative path.
    pub fn scan_source(&self, file: &Path, content: &str) -> Vec<Finding> {
        let lines = LineIndex::new(content);
        let mut findings = self.token_findings(file, content, &lines);
        findings.extend(self.catalog_findings(&self.source, file, content, &lines));
        findings
    }

    /// Scans a workflow definition; `file` is the project-relative path.
    pub fn scan_workflow(&self, file: &Path, content: &str) -> Vec<Finding> {
        let lines = LineIndex::new(content);
        let mut findings = self.workflow_name_findings(file);
        findings.extend(self.token_findings(file, content, &lines));
        findings.extend(self.catalog_findings(&self.workflows, file, content, &lines));
        findings
    }

    /// Filename-only checks for workflow files.
    pub fn workflow_name_findings(&self, file: &Path) -> Vec<Finding> {
        let Some(name) = file.file_name().map(|n| n.to_string_lossy()) else {
            return Vec::new();
        };

        let mut findings = Vec::new();
        if self.signatures.is_malicious_workflow_filename(&name) || self.formatter_name.is_match(&name)
        {
            findings.push(
                Finding::new(
                    Severity::Critical,
                    Category::MaliciousWorkflowFile,
                    Location::file(file),
                    format!("Suspicious workflow: {}", name),
                )
                .with_context("filename", name.to_string()),
            );
        }
        findings
    }

    /// A finding if `file` carries a known payload filename.
    pub fn known_file_finding(&self, file: &Path) -> Option<Finding> {
        let name = file.file_name()?.to_string_lossy();
        if !self.signatures.is_malicious_filename(&name) {
            return None;
        }
        Some(
            Finding::new(
                Severity::Critical,
                Category::KnownMaliciousFile,
                Location::file(file),
                format!("Known malicious file: {}", name),
            )
            .with_context("filename", name.to_string()),
        )
    }

    pub fn is_known_malicious_name(&self, name: &str) -> bool {
        self.signatures.is_malicious_filename(name)
    }

    fn token_findings(&self, file: &Path, content: &str, lines: &LineIndex) -> Vec<Finding> {
        let mut findings = Vec::new();
        for token in &self.signatures.malicious_tokens {
            for (offset, _) in content.match_indices(token.as_str()) {
                let line = lines.line_of(offset);
                findings.push(
                    Finding::new(
                        Severity::Critical,
                        Category::MaliciousIndicator,
                        Location::at_line(file, line),
                        format!("Shai-Hulud indicator: {} (line {})", token, line),
                    )
                    .with_context("indicator", token.as_str()),
                );
            }
        }
        findings
    }

    fn catalog_findings(
        &self,
        catalog: &PatternCatalog,
        file: &Path,
        content: &str,
        lines: &LineIndex,
    ) -> Vec<Finding> {
        let mut findings = Vec::new();
        for entry in catalog.entries() {
            for m in entry.regex.find_iter(content) {
                let line = lines.line_of(m.start());
                findings.push(
                    Finding::new(
                        entry.severity,
                        catalog.category(&entry.id),
                        Location::at_line(file, line),
                        format!("Pattern {} detected (line {})", entry.id, line),
                    )
                    .with_context("pattern", entry.id.as_str()),
                );
            }
        }
        findings
    }
}

/// Reads a file for scanning, replacing invalid UTF-8.
pub fn read_text(path: &Path, display: &Path) -> Result<String, Diagnostic> {
    crate::lockfile::read_lossy(path, display)
}
