//! Architectural Enforcement Integration Tests
//!
//! Shared scanning helpers for the tests in `tests/`. Each test walks the
//! production sources of the workspace and reports lines that break a rule:
//! - no blocking I/O or sleeps on the async path
//! - no panicking shortcuts (`unwrap`, `expect`, `panic!`) outside tests
//! - no `std::sync` locks held by shared registries

use std::fs;
use std::path::{Path, PathBuf};

/// Source directories holding production code, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["hotwire/core/src", "hotwire/daemon/src"];

/// One line of production code
#[derive(Debug, Clone)]
pub struct SourceLine {
    /// File path relative to the workspace root
    pub path: PathBuf,
    /// 1-based line number
    pub number: usize,
    /// The line with any trailing `//` comment removed
    pub code: String,
}

impl std::fmt::Display for SourceLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.number, self.code.trim())
    }
}

/// The workspace root, two levels above this crate
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Every production line in [`PRODUCTION_DIRS`]
///
/// A file's lines stop at its `#[cfg(test)] mod tests` block; test modules
/// sit at the bottom of each file.
#[must_use]
pub fn production_lines() -> Vec<SourceLine> {
    let root = workspace_root();
    let mut lines = Vec::new();

    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        assert!(path.exists(), "missing source directory {}", path.display());

        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            let Ok(content) = fs::read_to_string(entry.path()) else {
                continue;
            };
            let relative = entry
                .path()
                .strip_prefix(&root)
                .unwrap_or(entry.path())
                .to_path_buf();

            let file_lines: Vec<&str> = content.lines().collect();
            for (idx, line) in file_lines.iter().enumerate() {
                if is_test_module_start(&file_lines, idx) {
                    break;
                }
                let code = strip_comment(line);
                if code.trim().is_empty() {
                    continue;
                }
                lines.push(SourceLine {
                    path: relative.clone(),
                    number: idx + 1,
                    code: code.to_string(),
                });
            }
        }
    }
    lines
}

/// Whether line `idx` opens the `#[cfg(test)] mod ...` block of a file
fn is_test_module_start(lines: &[&str], idx: usize) -> bool {
    lines[idx].trim_start().starts_with("#[cfg(test)]")
        && lines
            .get(idx + 1)
            .is_some_and(|next| next.trim_start().starts_with("mod "))
}

/// Code before a `//` comment, ignoring `//` inside URLs such as `ws://`
#[must_use]
pub fn strip_comment(line: &str) -> &str {
    let mut search_from = 0;
    while let Some(pos) = line[search_from..].find("//") {
        let at = search_from + pos;
        if at > 0 && line.as_bytes()[at - 1] == b':' {
            search_from = at + 2;
            continue;
        }
        return &line[..at];
    }
    line
}

/// Whether a file is listed in an allowlist of workspace-relative paths
#[must_use]
pub fn is_allowed(line: &SourceLine, allowlist: &[(&str, &str)]) -> bool {
    allowlist
        .iter()
        .any(|(path, _reason)| line.path == Path::new(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment("let x = 1; // one"), "let x = 1; ");
        assert_eq!(strip_comment("/// docs"), "");
        assert_eq!(
            strip_comment("connect(\"ws://host/wire\")"),
            "connect(\"ws://host/wire\")"
        );
    }

    #[test]
    fn test_production_lines_skip_tests() {
        let lines = production_lines();
        assert!(!lines.is_empty());
        assert!(lines.iter().all(|l| !l.code.contains("#[tokio::test]")));
    }
}
