//! Dependency and manifest checks.
//!
//! - [`PackageMatcher`] - compares declared or resolved versions with the IOC database
//! - [`ManifestChecker`] - inspects `scripts`, file references and `repository`

mod manifest;
mod package;

pub use manifest::ManifestChecker;
pub use package::{normalize_version, PackageMatcher};
