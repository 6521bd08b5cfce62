//! `yarn.lock` parser.
//!
//! A block starts with an unindented header listing one or more
//! comma-separated `name@range` specifiers and ending in `:`; its indented
//! body holds a `version "x.y.z"` line:
//!
//! ```text
//! "@babel/code-frame@^7.0.0", "@babel/code-frame@^7.10.4":
//!   version "7.12.13"
//!   resolved "https://registry.yarnpkg.com/..."
//! ```
//!
//! Only the name of the first specifier is registered for each block. Berry
//! lockfiles (`version: 1.2.3`, `__metadata:` header) are read the same way.

use crate::error::LockfileError;
use crate::lockfile::LockfileParser;
use crate::model::{PackageMap, SourceKind};

const METADATA_HEADER: &str = "__metadata";

pub struct YarnLockParser;

impl LockfileParser for YarnLockParser {
    fn name(&self) -> &'static str {
        "yarn lockfile"
    }

    fn source(&self) -> SourceKind {
        SourceKind::YarnLock
    }

    fn filenames(&self) -> &'static [&'static str] {
        &["yarn.lock"]
    }

    fn parse(&self, content: &str) -> Result<PackageMap, LockfileError> {
        let mut packages = PackageMap::new();
        let mut block: Option<String> = None;

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if !line.starts_with([' ', '\t']) {
                block = header_name(trimmed);
                continue;
            }

            if let Some(name) = block.as_deref() {
                if let Some(version) = version_value(trimmed) {
                    packages.insert(name, version);
                    block = None;
                }
            }
        }

        Ok(packages)
    }
}

/// Package name of the first specifier in a block header.
fn header_name(header: &str) -> Option<String> {
    let specifiers = header.strip_suffix(':')?;
    let first = specifiers.split(',').next()?.trim().trim_matches('"');
    let name = alias_name(first);
    if name.is_empty() || name == METADATA_HEADER {
        return None;
    }
    Some(name.to_string())
}

/// `lodash@^4.17.21` → `lodash`, `@scope/pkg@npm:^1.0.0` → `@scope/pkg`.
fn alias_name(specifier: &str) -> &str {
    // Skip a leading scope `@` when looking for the name/range separator.
    match specifier.get(1..).and_then(|rest| rest.find('@')) {
        Some(pos) => &specifier[..pos + 1],
        None => specifier,
    }
}

/// Value of a `version "x"` / `version: x` body line.
fn version_value(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("version")?;
    if !rest.starts_with([' ', '\t', ':']) {
        return None;
    }
    let rest = rest.trim_start_matches(':').trim();

    let value = match rest.strip_prefix('"') {
        Some(quoted) => &quoted[..quoted.find('"')?],
        None => rest,
    };
    (!value.is_empty()).then_some(value)
}
