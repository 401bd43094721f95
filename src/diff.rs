//! Unified-diff line attribution.
//!
//! Line numbers are new-file numbers. Removed lines are recorded at the
//! new-file cursor where the deletion occurs rather than at their old-file
//! position, so they mark *where* something was deleted, not what line it
//! used to be.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::detect::Finding;
use crate::paths;

const DEV_NULL: &str = "/dev/null";

/// Lines touched in one file of a unified diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffFile {
    pub path: String,
    pub added_lines: BTreeSet<usize>,
    pub removed_lines: BTreeSet<usize>,
}

impl DiffFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// Path from a `---`/`+++` header, without the marker, `a/`/`b/` prefix or
/// trailing timestamp.
fn header_path(rest: &str) -> String {
    let raw = rest.split('\t').next().unwrap_or(rest).trim_end();
    let stripped = raw
        .strip_prefix("a/")
        .or_else(|| raw.strip_prefix("b/"))
        .unwrap_or(raw);
    paths::normalize(stripped)
}

/// New-file start line from a hunk header such as `@@ -32,7 +32,9 @@`.
/// Unparsable headers start at 0.
fn hunk_start(header: &str) -> usize {
    header
        .find('+')
        .and_then(|at| header[at + 1..].split_whitespace().next())
        .and_then(|token| token.split(',').next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// Parse unified diff text into per-file line sets, in first-appearance order.
///
/// Text before the first file header is ignored. Each hunk header resets
/// the new-file cursor.
pub fn parse(text: &str) -> Vec<DiffFile> {
    let mut files: Vec<DiffFile> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut current: Option<usize> = None;
    let mut old_path: Option<String> = None;
    let mut cursor: usize = 0;

    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        // An old-file header is only a header when the new-file header follows.
        if let Some(rest) = line.strip_prefix("--- ") {
            if lines.peek().is_some_and(|next| next.starts_with("+++ ")) {
                old_path = Some(header_path(rest));
                continue;
            }
        }

        if let Some(rest) = line.strip_prefix("+++ ") {
            let mut path = header_path(rest);
            if path == DEV_NULL {
                if let Some(old) = old_path.take().filter(|p| p != DEV_NULL) {
                    path = old;
                }
            }
            old_path = None;
            let slot = *index.entry(path.clone()).or_insert_with(|| {
                files.push(DiffFile::new(path));
                files.len() - 1
            });
            current = Some(slot);
            cursor = 0;
            continue;
        }

        if line.starts_with("@@") {
            cursor = hunk_start(line);
            continue;
        }

        let Some(slot) = current else {
            continue;
        };
        let file = &mut files[slot];
        match line.as_bytes().first() {
            Some(b'+') => {
                file.added_lines.insert(cursor);
                cursor += 1;
            }
            Some(b' ') => cursor += 1,
            Some(b'-') => {
                file.removed_lines.insert(cursor);
            }
            _ => {}
        }
    }

    files
}

/// Read and parse a diff file.
pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<DiffFile>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read diff: {}", path.display()))?;
    Ok(parse(&text))
}

/// Added lines for `file_path` in `diff`; empty when there is no diff or
/// the file is not part of it.
pub fn changed_lines(file_path: &str, diff: Option<&[DiffFile]>) -> BTreeSet<usize> {
    let Some(files) = diff else {
        return BTreeSet::new();
    };
    let wanted = paths::normalize(file_path);
    files
        .iter()
        .find(|f| paths::normalize(&f.path) == wanted)
        .map(|f| f.added_lines.clone())
        .unwrap_or_default()
}

/// Path-keyed lookup over a parsed diff.
#[derive(Debug, Clone, Default)]
pub struct DiffIndex {
    files: HashMap<String, DiffFile>,
}

impl DiffIndex {
    pub fn new(files: Vec<DiffFile>) -> Self {
        let files = files
            .into_iter()
            .map(|f| (paths::normalize(&f.path), f))
            .collect();
        Self { files }
    }

    pub fn get(&self, file_path: &str) -> Option<&DiffFile> {
        self.files.get(&paths::normalize(file_path))
    }

    /// Whether `line` of `file_path` was added by the diff. Removed lines
    /// do not count.
    pub fn is_changed(&self, file_path: &str, line: usize) -> bool {
        self.get(file_path)
            .is_some_and(|f| f.added_lines.contains(&line))
    }

    /// Whether any of `file_paths` appears in the diff.
    pub fn matches_any<'a>(&self, file_paths: impl IntoIterator<Item = &'a str>) -> bool {
        file_paths.into_iter().any(|p| self.get(p).is_some())
    }

    /// Keep only findings that sit on added lines.
    pub fn filter_findings(&self, findings: Vec<Finding>) -> Vec<Finding> {
        findings
            .into_iter()
            .filter(|f| self.is_changed(f.file(), f.line()))
            .collect()
    }
}
