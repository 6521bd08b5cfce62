use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Severity tier of a finding.
///
/// Only [`Severity::Critical`] affects the scan verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Warning => "WARNING",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What kind of evidence a finding represents.
///
/// Pattern categories carry the identifier of the catalog entry that matched
/// and render as `js-pattern-<id>` / `workflow-pattern-<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Category {
    CompromisedPackage,
    MaliciousIndicator,
    SuspiciousScript,
    SuspiciousLifecycleScript,
    MaliciousFileReference,
    MaliciousRepository,
    JsPattern(String),
    WorkflowPattern(String),
    MaliciousWorkflowFile,
    KnownMaliciousFile,
}

const JS_PATTERN_PREFIX: &str = "js-pattern-";
const WORKFLOW_PATTERN_PREFIX: &str = "workflow-pattern-";

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::CompromisedPackage => f.write_str("compromised-package"),
            Category::MaliciousIndicator => f.write_str("malicious-indicator"),
            Category::SuspiciousScript => f.write_str("suspicious-script"),
            Category::SuspiciousLifecycleScript => f.write_str("suspicious-lifecycle-script"),
            Category::MaliciousFileReference => f.write_str("malicious-file-reference"),
            Category::MaliciousRepository => f.write_str("malicious-repository"),
            Category::JsPattern(id) => write!(f, "{}{}", JS_PATTERN_PREFIX, id),
            Category::WorkflowPattern(id) => write!(f, "{}{}", WORKFLOW_PATTERN_PREFIX, id),
            Category::MaliciousWorkflowFile => f.write_str("malicious-workflow-file"),
            Category::KnownMaliciousFile => f.write_str("known-malicious-file"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let category = match s {
            "compromised-package" => Category::CompromisedPackage,
            "malicious-indicator" => Category::MaliciousIndicator,
            "suspicious-script" => Category::SuspiciousScript,
            "suspicious-lifecycle-script" => Category::SuspiciousLifecycleScript,
            "malicious-file-reference" => Category::MaliciousFileReference,
            "malicious-repository" => Category::MaliciousRepository,
            "malicious-workflow-file" => Category::MaliciousWorkflowFile,
            "known-malicious-file" => Category::KnownMaliciousFile,
            other => {
                if let Some(id) = other.strip_prefix(JS_PATTERN_PREFIX) {
                    Category::JsPattern(id.to_string())
                } else if let Some(id) = other.strip_prefix(WORKFLOW_PATTERN_PREFIX) {
                    Category::WorkflowPattern(id.to_string())
                } else {
                    return Err(format!("Unknown finding category: {}", other));
                }
            }
        };
        Ok(category)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.to_string()
    }
}

impl TryFrom<String> for Category {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Where a finding was observed, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Location {
    pub fn file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            line: None,
        }
    }

    pub fn at_line(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file.display(), line),
            None => write!(f, "{}", self.file.display()),
        }
    }
}

/// A single detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub category: Category,
    pub location: Location,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl Finding {
    pub fn new(
        severity: Severity,
        category: Category,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            location,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_string_forms() {
        assert_eq!(Category::CompromisedPackage.to_string(), "compromised-package");
        assert_eq!(
            Category::JsPattern("env-scraping".into()).to_string(),
            "js-pattern-env-scraping"
        );
        assert_eq!(
            "workflow-pattern-self-hosted-runner".parse::<Category>(),
            Ok(Category::WorkflowPattern("self-hosted-runner".into()))
        );
        assert!("not-a-category".parse::<Category>().is_err());
    }

    #[test]
    fn test_finding_serializes_flat_category_and_severity() {
        let finding = Finding::new(
            Severity::Critical,
            Category::KnownMaliciousFile,
            Location::file("setup_bun.js"),
            "Known malicious file",
        )
        .with_context("filename", "setup_bun.js");

        let value = serde_json::to_value(&finding).unwrap();
        assert_eq!(value["severity"], "CRITICAL");
        assert_eq!(value["category"], "known-malicious-file");
        assert_eq!(value["location"]["file"], "setup_bun.js");
        assert!(value["location"].get("line").is_none());
        assert_eq!(value["context"]["filename"], "setup_bun.js");

        let back: Finding = serde_json::from_value(value).unwrap();
        assert_eq!(back, finding);
    }

    #[test]
    fn test_location_display() {
        assert_eq!(Location::at_line("src/a.js", 3).to_string(), "src/a.js:3");
        assert_eq!(Location::file("package.json").to_string(), "package.json");
    }
}
