//! Path normalization shared by the scanner, findings, and diff lookup.

use std::path::Path;

/// Normalize a path string for comparison: forward slashes, no leading
/// `./`, no repeated separators.
pub fn normalize(path: &str) -> String {
    let mut p = path.replace('\\', "/");
    while p.contains("//") {
        p = p.replace("//", "/");
    }
    while let Some(rest) = p.strip_prefix("./") {
        p = rest.to_string();
    }
    p
}

/// Display path of `path` relative to `root`, falling back to the full path.
pub fn relativize(path: &Path, root: &Path) -> String {
    if path == root {
        return path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
    }

    match path.strip_prefix(root) {
        Ok(rel) => normalize(&rel.to_string_lossy()),
        Err(_) => normalize(&path.to_string_lossy()),
    }
}
