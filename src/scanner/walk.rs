//! Project tree traversal.
//!
//! All walks are sorted by file name so findings come out in a stable
//! order across runs and platforms.

use crate::config::IgnoreConfig;
use crate::error::Diagnostic;
use crate::lockfile::MANIFEST_FILENAME;
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

pub const SOURCE_EXTENSIONS: &[&str] = &["js", "ts", "jsx", "tsx"];
pub const WORKFLOW_EXTENSIONS: &[&str] = &["yml", "yaml"];
pub const WORKFLOW_DIR: &str = ".github/workflows";
pub const DEPENDENCY_DIR: &str = "node_modules";

fn is_dependency_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name() == DEPENDENCY_DIR
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().starts_with('.')
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.contains(&e))
}

/// `path` relative to `root`, unchanged if it is not under `root`.
pub fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

/// `/`-separated form of a relative path, used for ignore matching.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn keep(root: &Path, path: &Path, ignore: &IgnoreConfig) -> bool {
    !ignore.should_ignore_path(&slash_path(&relative_to(root, path)))
}

/// Paths found by a walk plus one diagnostic per entry that could not be read.
#[derive(Debug, Default)]
pub struct Walk {
    pub paths: Vec<PathBuf>,
    pub errors: Vec<Diagnostic>,
}

fn walk_diagnostic(root: &Path, err: &walkdir::Error) -> Diagnostic {
    let file = match err.path().map(|p| relative_to(root, p)) {
        Some(rel) if !rel.as_os_str().is_empty() => rel,
        _ => PathBuf::from("."),
    };
    let reason = match err.io_error() {
        Some(io) => io.to_string(),
        None => err.to_string(),
    };
    Diagnostic::new(file, format!("failed to read directory entry: {}", reason))
}

/// Splits walk results into accepted files and diagnostics.
fn collect<I, F>(root: &Path, entries: I, mut accept: F) -> Walk
where
    I: Iterator<Item = walkdir::Result<DirEntry>>,
    F: FnMut(&DirEntry) -> bool,
{
    let mut walk = Walk::default();
    for entry in entries {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && accept(&entry) {
                    walk.paths.push(entry.into_path());
                }
            }
            Err(err) => {
                let diagnostic = walk_diagnostic(root, &err);
                warn!("{}", diagnostic);
                walk.errors.push(diagnostic);
            }
        }
    }
    walk
}

/// JavaScript/TypeScript files under `root`.
///
/// `node_modules` and every dot-prefixed directory are pruned.
pub fn source_files(root: &Path, ignore: &IgnoreConfig) -> Walk {
    let entries = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_dependency_dir(e) && !is_hidden_dir(e));
    collect(root, entries, |e| {
        has_extension(e.path(), SOURCE_EXTENSIONS) && keep(root, e.path(), ignore)
    })
}

/// YAML files directly inside `.github/workflows`.
pub fn workflow_files(root: &Path, ignore: &IgnoreConfig) -> Walk {
    let dir = root.join(WORKFLOW_DIR);
    if !dir.is_dir() {
        return Walk::default();
    }

    let entries = WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter();
    collect(root, entries, |e| {
        has_extension(e.path(), WORKFLOW_EXTENSIONS) && keep(root, e.path(), ignore)
    })
}

/// Files anywhere under `root` whose name satisfies `matches`.
///
/// Only `node_modules` is pruned; payloads hidden in dot directories are
/// still found.
pub fn files_named<F>(root: &Path, ignore: &IgnoreConfig, matches: F) -> Walk
where
    F: Fn(&str) -> bool,
{
    let entries = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_dependency_dir(e));
    collect(root, entries, |e| {
        matches(&e.file_name().to_string_lossy()) && keep(root, e.path(), ignore)
    })
}

/// Every directory under `root` that contains a `package.json`, sorted.
pub fn project_roots(root: &Path) -> Walk {
    let entries = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_dependency_dir(e));
    let mut walk = collect(root, entries, |e| e.file_name() == MANIFEST_FILENAME);

    walk.paths = walk
        .paths
        .iter()
        .filter_map(|p| p.parent().map(Path::to_path_buf))
        .collect();
    walk.paths.sort();
    walk.paths.dedup();
    walk
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn rel(root: &Path, walk: Walk) -> Vec<String> {
        assert!(walk.errors.is_empty(), "unexpected walk errors: {:?}", walk.errors);
        walk.paths.iter().map(|p| slash_path(&relative_to(root, p))).collect()
    }

    #[test]
    fn test_source_files_prune_dependency_and_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "index.js");
        touch(root, "src/app.tsx");
        touch(root, "src/readme.md");
        touch(root, "node_modules/lib/index.js");
        touch(root, ".cache/bundle.js");
        touch(root, "lib/types.d.ts");

        let files = rel(root, source_files(root, &IgnoreConfig::default()));
        assert_eq!(files, vec!["index.js", "lib/types.d.ts", "src/app.tsx"]);
    }

    #[test]
    fn test_source_files_respect_ignore_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "dist/bundle.js");
        touch(root, "src/index.ts");

        let ignore = IgnoreConfig {
            packages: Vec::new(),
            paths: vec!["dist/*".to_string()],
        };
        assert_eq!(rel(root, source_files(root, &ignore)), vec!["src/index.ts"]);
    }

    #[test]
    fn test_workflow_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, ".github/workflows/ci.yml");
        touch(root, ".github/workflows/release.yaml");
        touch(root, ".github/workflows/notes.txt");
        touch(root, ".github/workflows/nested/deep.yml");

        let files = rel(root, workflow_files(root, &IgnoreConfig::default()));
        assert_eq!(
            files,
            vec![".github/workflows/ci.yml", ".github/workflows/release.yaml"]
        );
    }

    #[test]
    fn test_files_named_skips_only_node_modules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, ".hidden/setup_bun.js");
        touch(root, "node_modules/x/setup_bun.js");
        touch(root, "setup_bun.js");

        let files = rel(
            root,
            files_named(root, &IgnoreConfig::default(), |n| n == "setup_bun.js"),
        );
        assert_eq!(files, vec![".hidden/setup_bun.js", "setup_bun.js"]);
    }

    #[test]
    fn test_project_roots() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "package.json");
        touch(root, "packages/b/package.json");
        touch(root, "packages/a/package.json");
        touch(root, "node_modules/dep/package.json");

        let roots = rel(root, project_roots(root));
        assert_eq!(roots, vec!["", "packages/a", "packages/b"]);
    }

    #[test]
    fn test_missing_root_is_reported_not_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");

        let walk = source_files(&missing, &IgnoreConfig::default());
        assert!(walk.paths.is_empty());
        assert_eq!(walk.errors.len(), 1);
        assert_eq!(walk.errors[0].file, PathBuf::from("."));
        assert!(walk.errors[0].message.starts_with("failed to read directory entry"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_becomes_diagnostic() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "src/index.js");
        touch(root, "src/secret/payload.js");
        let locked = root.join("src/secret");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not apply to root.
        let readable = fs::read_dir(&locked).is_ok();
        let walk = source_files(root, &IgnoreConfig::default());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }

        let files: Vec<_> = walk.paths.iter().map(|p| slash_path(&relative_to(root, p))).collect();
        assert_eq!(files, vec!["src/index.js"]);
        assert_eq!(walk.errors.len(), 1);
        assert_eq!(walk.errors[0].file, Path::new("src").join("secret"));
    }
}
