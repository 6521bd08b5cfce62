//! `pnpm-lock.yaml` parser.
//!
//! This is a two-state line scanner, not a YAML parser. A zero-indentation
//! `packages:` line enters the section and the next zero-indentation line
//! leaves it. Inside, keys of the forms
//!
//! ```text
//!   /lodash/4.17.21:            (lockfile v5)
//!   /@babel/core@7.24.0:        (lockfile v6)
//!   '@babel/core@7.24.0':       (lockfile v9)
//!   react-dom@18.2.0(react@18.2.0):
//! ```
//!
//! register `name → version` when the version starts with a strict
//! `digits.digits.digits` triple. Anchors, multi-document streams and
//! folded scalars are not supported.

use crate::error::LockfileError;
use crate::lockfile::LockfileParser;
use crate::model::{PackageMap, SourceKind};

const SECTION_HEADER: &str = "packages:";

pub struct PnpmLockParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    InPackages,
}

impl LockfileParser for PnpmLockParser {
    fn name(&self) -> &'static str {
        "pnpm lockfile"
    }

    fn source(&self) -> SourceKind {
        SourceKind::PnpmLock
    }

    fn filenames(&self) -> &'static [&'static str] {
        &["pnpm-lock.yaml"]
    }

    fn parse(&self, content: &str) -> Result<PackageMap, LockfileError> {
        let mut packages = PackageMap::new();
        let mut state = State::Outside;

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let indented = line.starts_with([' ', '\t']);

            match state {
                State::Outside => {
                    if !indented && line.trim_end() == SECTION_HEADER {
                        state = State::InPackages;
                    }
                }
                State::InPackages if !indented => {
                    state = if line.trim_end() == SECTION_HEADER {
                        State::InPackages
                    } else {
                        State::Outside
                    };
                }
                State::InPackages => {
                    if let Some((name, version)) = package_key(line) {
                        packages.insert(name, version);
                    }
                }
            }
        }

        Ok(packages)
    }
}

/// Splits an indented package key line into `(name, version)`.
///
/// The name is the shortest prefix followed by `@` or `/` and a strict
/// version; the version must be followed by `:`, a quote or `(`.
fn package_key(line: &str) -> Option<(&str, &str)> {
    let key = line.trim_start();
    let key = key.strip_prefix(['\'', '"']).unwrap_or(key);
    let key = key.strip_prefix('/').unwrap_or(key);

    for (pos, c) in key.char_indices().skip(1) {
        if c != '@' && c != '/' {
            continue;
        }
        let rest = &key[pos + 1..];
        if let Some(len) = strict_version_len(rest) {
            if rest[len..].starts_with([':', '\'', '"', '(']) {
                return Some((&key[..pos], &rest[..len]));
            }
        }
    }
    None
}

/// Length of a `N.N.N[suffix]` prefix of `s`, if present.
fn strict_version_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut pos = 0;

    for part in 0..3 {
        let start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == start {
            return None;
        }
        if part < 2 {
            if bytes.get(pos) != Some(&b'.') {
                return None;
            }
            pos += 1;
        }
    }

    // Pre-release / build suffix up to the key terminator.
    while let Some(&b) = bytes.get(pos) {
        if matches!(b, b':' | b'\'' | b'"' | b'(') || b.is_ascii_whitespace() {
            break;
        }
        pos += 1;
    }
    Some(pos)
}
