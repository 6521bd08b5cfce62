//! Core data types for package declarations, findings, and scan results.
//!
//! - [`PackageDeclaration`] - A `name → version` pair read from a manifest or lockfile
//! - [`PackageMap`] - Insertion-ordered package mapping produced by the parsers
//! - [`Finding`] - A single detection with [`Severity`], [`Category`] and [`Location`]
//! - [`ScanResult`] - Aggregated outcome of one project scan
//!
//! # Example
//!
//! ```
//! use hulud_scan::model::{Category, Finding, Location, Severity, SeverityCounts};
//!
//! let finding = Finding::new(
//!     Severity::Critical,
//!     Category::KnownMaliciousFile,
//!     Location::file("setup_bun.js"),
//!     "Known malicious file: setup_bun.js",
//! );
//! let counts = SeverityCounts::from_findings(&[finding]);
//! assert_eq!(counts.critical, 1);
//! ```

mod finding;
mod package;
mod result;

pub use finding::*;
pub use package::*;
pub use result::*;
