//! Rules applied to the non-dependency parts of a `package.json`.
//!
//! - `scripts`: malicious tokens, suspicious command patterns, and
//!   install-time hooks that fetch or run remote code
//! - `main` / `bin` / `browser`: references to worm payload files
//! - `repository`: URLs of repositories created by the worm

use crate::error::ScanError;
use crate::lockfile::Manifest;
use crate::model::{Category, Finding, Location, Severity};
use crate::signatures::Signatures;
use regex::Regex;
use std::path::Path;

pub struct ManifestChecker {
    signatures: Signatures,
    script_patterns: Vec<(String, Regex)>,
}

impl ManifestChecker {
    /// Compiles the suspicious-script patterns from `signatures`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Pattern`] if a pattern is not a valid regex.
    pub fn new(signatures: &Signatures) -> Result<Self, ScanError> {
        let script_patterns = signatures
            .suspicious_script_patterns
            .iter()
            .map(|source| {
                Regex::new(source)
                    .map(|regex| (source.clone(), regex))
                    .map_err(|e| ScanError::Pattern {
                        id: source.clone(),
                        source: e,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            signatures: signatures.clone(),
            script_patterns,
        })
    }

    /// Runs every rule against `manifest`; `file` is its project-relative path.
    pub fn check(&self, manifest: &Manifest, file: &Path) -> Vec<Finding> {
        let mut findings = Vec::new();
        self.check_scripts(manifest, file, &mut findings);
        self.check_file_references(manifest, file, &mut findings);
        self.check_repository(manifest, file, &mut findings);
        findings
    }

    fn check_scripts(&self, manifest: &Manifest, file: &Path, findings: &mut Vec<Finding>) {
        for (name, body) in &manifest.scripts {
            for token in self.signatures.tokens_in(body) {
                findings.push(
                    Finding::new(
                        Severity::Critical,
                        Category::MaliciousIndicator,
                        Location::file(file),
                        format!("Shai-Hulud indicator in script `{}`: {}", name, token),
                    )
                    .with_context("script", name.as_str())
                    .with_context("indicator", token),
                );
            }

            for (source, regex) in &self.script_patterns {
                if regex.is_match(body) {
                    findings.push(
                        Finding::new(
                            Severity::Warning,
                            Category::SuspiciousScript,
                            Location::file(file),
                            format!("Suspicious script `{}`: {}", name, body),
                        )
                        .with_context("script", name.as_str())
                        .with_context("pattern", source.as_str()),
                    );
                }
            }

            if self.signatures.is_lifecycle_script(name) {
                let lowered = body.to_lowercase();
                if let Some(keyword) = self
                    .signatures
                    .lifecycle_keywords
                    .iter()
                    .find(|k| lowered.contains(k.as_str()))
                {
                    findings.push(
                        Finding::new(
                            Severity::High,
                            Category::SuspiciousLifecycleScript,
                            Location::file(file),
                            format!("Suspicious `{}` hook: {}", name, body),
                        )
                        .with_context("script", name.as_str())
                        .with_context("keyword", keyword.as_str()),
                    );
                }
            }
        }
    }

    fn check_file_references(&self, manifest: &Manifest, file: &Path, findings: &mut Vec<Finding>) {
        for (field, value) in &manifest.file_references {
            for token in self.signatures.tokens_in(value) {
                findings.push(
                    Finding::new(
                        Severity::Critical,
                        Category::MaliciousFileReference,
                        Location::file(file),
                        format!("Suspicious file in \"{}\": {}", field, value),
                    )
                    .with_context("field", field.as_str())
                    .with_context("value", value.as_str())
                    .with_context("indicator", token),
                );
            }
        }
    }

    fn check_repository(&self, manifest: &Manifest, file: &Path, findings: &mut Vec<Finding>) {
        let Some(url) = manifest.repository_url.as_deref() else {
            return;
        };
        if let Some(marker) = self
            .signatures
            .repository_markers
            .iter()
            .find(|m| url.contains(m.as_str()))
        {
            findings.push(
                Finding::new(
                    Severity::Critical,
                    Category::MaliciousRepository,
                    Location::file(file),
                    format!("Repository points at a Shai-Hulud repo: {}", url),
                )
                .with_context("url", url)
                .with_context("indicator", marker.as_str()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(json: &str) -> Vec<Finding> {
        let signatures = Signatures::default();
        let checker = ManifestChecker::new(&signatures).unwrap();
        let manifest = Manifest::parse(json).unwrap();
        checker.check(&manifest, Path::new("package.json"))
    }

    #[test]
    fn test_clean_manifest() {
        let findings = check(r#"{"scripts": {"build": "tsc", "test": "jest"}, "main": "index.js"}"#);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_worm_postinstall() {
        let findings = check(r#"{"scripts": {"postinstall": "node setup_bun.js"}}"#);
        let categories: Vec<_> = findings.iter().map(|f| f.category.to_string()).collect();
        assert_eq!(
            categories,
            vec![
                "malicious-indicator",
                "suspicious-script",
                "suspicious-lifecycle-script"
            ]
        );
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].context["indicator"], "setup_bun.js");
        assert_eq!(findings[1].severity, Severity::Warning);
        assert_eq!(findings[2].severity, Severity::High);
        assert_eq!(findings[2].context["keyword"], "bun");
    }

    #[test]
    fn test_lifecycle_keyword_is_case_insensitive() {
        let findings = check(r#"{"scripts": {"preinstall": "WGET example.org/x"}}"#);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::SuspiciousLifecycleScript);
    }

    #[test]
    fn test_non_lifecycle_script_keywords_ignored() {
        let findings = check(r#"{"scripts": {"docs": "open github pages"}}"#);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_bin_object_reference() {
        let findings = check(r#"{"bin": {"tool": "bin/tool.js", "setup": "./bun_environment.js"}}"#);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::MaliciousFileReference);
        assert_eq!(findings[0].context["field"], "bin");
    }

    #[test]
    fn test_repository_marker() {
        let findings = check(r#"{"repository": {"url": "https://github.com/victim/Sha1-Hulud"}}"#);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::MaliciousRepository);
        assert!(findings[0].is_critical());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let signatures = Signatures {
            suspicious_script_patterns: vec!["(unclosed".to_string()],
            ..Signatures::default()
        };
        assert!(matches!(
            ManifestChecker::new(&signatures),
            Err(ScanError::Pattern { .. })
        ));
    }
}
