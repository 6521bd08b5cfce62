//! Error and diagnostic types.
//!
//! Only [`ScanError::TargetNotFound`] aborts a run. Everything that goes
//! wrong while reading a single manifest, lockfile or source file is
//! recorded as a [`Diagnostic`] and the scan continues.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("target path does not exist: {}", .0.display())]
    TargetNotFound(PathBuf),

    #[error("invalid pattern `{id}`: {source}")]
    Pattern {
        id: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to load IOC database {}: {source}", .path.display())]
    IocLoad {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reasons a lockfile or manifest could not be turned into package data.
#[derive(Debug, thiserror::Error)]
pub enum LockfileError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected structure: {0}")]
    Structure(String),
}

/// A non-fatal problem encountered during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub message: String,
}

impl Diagnostic {
    pub fn new(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.message)
    }
}
