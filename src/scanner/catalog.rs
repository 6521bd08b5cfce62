//! Static regex catalogs for source files and CI workflows.
//!
//! A catalog entry is `(identifier, pattern)`. Severity is not part of the
//! pattern: it comes from a [`SeverityTable`] resolved once when the catalog
//! is compiled.

use crate::error::ScanError;
use crate::model::{Category, Severity};
use regex::{Regex, RegexBuilder};

/// Identifier → severity lookup. Identifiers not listed are WARNING.
#[derive(Debug, Clone, Copy)]
pub struct SeverityTable {
    pub critical: &'static [&'static str],
    pub high: &'static [&'static str],
}

impl SeverityTable {
    pub fn resolve(&self, id: &str) -> Severity {
        if self.critical.iter().any(|c| *c == id) {
            Severity::Critical
        } else if self.high.iter().any(|h| *h == id) {
            Severity::High
        } else {
            Severity::Warning
        }
    }
}

pub const SOURCE_PATTERNS: &[(&str, &str)] = &[
    (
        "credential-theft-git",
        r#"(?:fs\.read(?:File)?Sync\([^)]*['"]\.git(?:config|credentials)|\.git(?:config|credentials)['"])"#,
    ),
    (
        "credential-theft-npm",
        r#"(?:fs\.read(?:File)?Sync\([^)]*['"]\.npmrc|\.npmrc['"])"#,
    ),
    (
        "credential-theft-aws",
        r#"(?:fs\.read(?:File)?Sync\([^)]*['"]\.aws[/\\]credentials|\.aws[/\\]credentials['"])"#,
    ),
    (
        "credential-theft-gcp",
        r#"(?:fs\.read(?:File)?Sync\([^)]*['"]\.config[/\\]gcloud|\.config[/\\]gcloud)"#,
    ),
    (
        "credential-theft-azure",
        r#"(?:fs\.read(?:File)?Sync\([^)]*['"]\.azure|\.azure[/\\])"#,
    ),
    ("trufflehog-usage", r#"(?:spawn|exec|execSync)\(['"]trufflehog"#),
    (
        "github-exfiltration",
        r#"(?:fetch|axios\.(?:post|get))\(['"]https://api\.github\.com"#,
    ),
    (
        "metadata-service",
        r#"(?:fetch|axios\.get)\(['"]https?://(?:169\.254\.169\.254|metadata\.google\.internal)"#,
    ),
    (
        "ioc-files",
        r#"fs\.writeFileSync\([^)]*['"](?:cloud|contents|environment|truffleSecrets|actionsSecrets)\.json"#,
    ),
    (
        "double-base64",
        r#"Buffer\.from\(Buffer\.from\([^)]+,\s*['"]base64['"]\)\.toString\(\)"#,
    ),
    ("env-scraping", r"JSON\.stringify\(process\.env\)"),
    (
        "ci-detection",
        r"process\.env\.(?:GITHUB_ACTIONS|CI|BUILDKITE|CODEBUILD_BUILD_NUMBER|CIRCLE_SHA1|PROJECT_ID)",
    ),
    ("home-destruction", r"fs\.(?:rm|rmdir)Sync\([^)]*(?:HOME|home|~)"),
    (
        "bun-install",
        r#"(?:exec|execSync)\(['"]curl\s+https://bun\.sh/install"#,
    ),
    (
        "runner-registration",
        r"(?:fetch|axios\.post)\([^\)]*actions/runners/registration-token",
    ),
    (
        "datadog-credentials",
        r"process\.env\.(?:DD_API_KEY|DATADOG_API_KEY|DD_APP_KEY)",
    ),
];

pub const SOURCE_SEVERITIES: SeverityTable = SeverityTable {
    critical: &[
        "credential-theft-git",
        "credential-theft-npm",
        "credential-theft-aws",
        "trufflehog-usage",
        "ioc-files",
        "home-destruction",
        "runner-registration",
    ],
    high: &["github-exfiltration", "metadata-service", "bun-install"],
};

pub const WORKFLOW_PATTERNS: &[(&str, &str)] = &[
    (
        "discussion-injection",
        r"on:\s*discussion:.*\$\{\{\s*github\.event\.discussion\.body\s*\}\}",
    ),
    ("self-hosted-runner", r"runs-on:\s*self-hosted"),
    ("formatter-workflow", r"formatter_\d+\.yml"),
    (
        "secrets-artifact",
        r"(?:secrets|credentials|cloud|environment|truffle).*\.(?:json|txt)",
    ),
];

pub const WORKFLOW_SEVERITIES: SeverityTable = SeverityTable {
    critical: &[
        "discussion-injection",
        "self-hosted-runner",
        "formatter-workflow",
        "secrets-artifact",
    ],
    high: &[],
};

/// Which kind of file a catalog applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Source,
    Workflow,
}

/// One compiled catalog entry.
#[derive(Debug, Clone)]
pub struct PatternEntry {
    pub id: String,
    pub regex: Regex,
    pub severity: Severity,
}

/// A compiled set of patterns with resolved severities.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    kind: CatalogKind,
    entries: Vec<PatternEntry>,
}

impl PatternCatalog {
    /// Compiles `patterns` in multi-line mode with `.` matching newlines.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Pattern`] naming the first entry that fails to compile.
    pub fn compile(
        kind: CatalogKind,
        patterns: &[(&str, &str)],
        severities: &SeverityTable,
    ) -> Result<Self, ScanError> {
        let entries = patterns
            .iter()
            .map(|&(id, source)| {
                let regex = RegexBuilder::new(source)
                    .multi_line(true)
                    .dot_matches_new_line(true)
                    .build()
                    .map_err(|e| ScanError::Pattern {
                        id: id.to_string(),
                        source: e,
                    })?;
                Ok(PatternEntry {
                    id: id.to_string(),
                    regex,
                    severity: severities.resolve(id),
                })
            })
            .collect::<Result<Vec<_>, ScanError>>()?;

        Ok(Self { kind, entries })
    }

    /// The built-in JavaScript/TypeScript catalog.
    pub fn source_files() -> Result<Self, ScanError> {
        Self::compile(CatalogKind::Source, SOURCE_PATTERNS, &SOURCE_SEVERITIES)
    }

    /// The built-in GitHub Actions catalog.
    pub fn workflows() -> Result<Self, ScanError> {
        Self::compile(CatalogKind::Workflow, WORKFLOW_PATTERNS, &WORKFLOW_SEVERITIES)
    }

    pub fn kind(&self) -> CatalogKind {
        self.kind
    }

    pub fn entries(&self) -> &[PatternEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finding category for a match of entry `id`.
    pub fn category(&self, id: &str) -> Category {
        match self.kind {
            CatalogKind::Source => Category::JsPattern(id.to_string()),
            CatalogKind::Workflow => Category::WorkflowPattern(id.to_string()),
        }
    }
}
