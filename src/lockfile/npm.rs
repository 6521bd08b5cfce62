//! `package-lock.json` parser.
//!
//! A lockfile may carry either or both of two layouts:
//!
//! - `dependencies` (lockfileVersion 1/2): a tree where every entry can hold
//!   its own nested `dependencies` object.
//! - `packages` (lockfileVersion 2/3): a flat object keyed by install path,
//!   e.g. `node_modules/express/node_modules/debug`. The empty key is the
//!   project root.
//!
//! The tree is read first, then the flat map; later entries replace earlier
//! ones for the same name.
//!
//! The tree walk itself has no depth limit, but `serde_json` refuses input
//! nested deeper than 128 levels. A tree nested past that (about 60
//! dependency levels) fails with [`LockfileError::Json`] and the file
//! degrades to an empty map.

use crate::error::LockfileError;
use crate::lockfile::LockfileParser;
use crate::model::{PackageMap, SourceKind};
use serde_json::{Map, Value};

const NODE_MODULES_PREFIX: &str = "node_modules/";

pub struct NpmLockParser;

impl LockfileParser for NpmLockParser {
    fn name(&self) -> &'static str {
        "npm lockfile"
    }

    fn source(&self) -> SourceKind {
        SourceKind::NpmLock
    }

    fn filenames(&self) -> &'static [&'static str] {
        &["package-lock.json", "npm-shrinkwrap.json"]
    }

    fn parse(&self, content: &str) -> Result<PackageMap, LockfileError> {
        let root: Value = serde_json::from_str(content)?;
        let root = root
            .as_object()
            .ok_or_else(|| LockfileError::Structure("top level is not an object".to_string()))?;

        let mut packages = PackageMap::new();

        if let Some(deps) = root.get("dependencies").and_then(Value::as_object) {
            collect_dependency_tree(deps, &mut packages);
        }

        if let Some(flat) = root.get("packages").and_then(Value::as_object) {
            collect_install_paths(flat, &mut packages);
        }

        Ok(packages)
    }
}

/// Walks a nested `dependencies` tree in document order.
///
/// A stack of sibling iterators reproduces depth-first pre-order without
/// recursion: an entry is recorded, then its children, then its next sibling.
/// Entries without a `version` are skipped together with their subtree.
fn collect_dependency_tree(deps: &Map<String, Value>, packages: &mut PackageMap) {
    let mut stack = vec![deps.iter()];

    while let Some(siblings) = stack.last_mut() {
        let Some((name, entry)) = siblings.next() else {
            stack.pop();
            continue;
        };

        let Some(entry) = entry.as_object() else {
            continue;
        };
        let Some(version) = entry.get("version").and_then(Value::as_str) else {
            continue;
        };

        packages.insert(name.as_str(), version);

        if let Some(nested) = entry.get("dependencies").and_then(Value::as_object) {
            stack.push(nested.iter());
        }
    }
}

fn collect_install_paths(flat: &Map<String, Value>, packages: &mut PackageMap) {
    for (path, entry) in flat {
        if path.is_empty() {
            continue;
        }
        let Some(version) = entry.get("version").and_then(Value::as_str) else {
            continue;
        };
        let name = package_name_from_install_path(path);
        if name.is_empty() {
            continue;
        }
        packages.insert(name, version);
    }
}

/// Derives a package name from an install path by removing every
/// occurrence of the text `node_modules/`.
///
/// `node_modules/@types/node` → `@types/node`;
/// `node_modules/express/node_modules/debug` → `express/debug`.
///
/// The removal is textual: a trailing `node_modules` without a slash is
/// kept, and a name ending in `node_modules` loses the slash after it.
pub fn package_name_from_install_path(path: &str) -> String {
    path.replace(NODE_MODULES_PREFIX, "")
}
