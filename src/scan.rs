//! Source tree enumeration.
//!
//! Both the file list handed to the runner and the project detectors'
//! own walks go through [`SourceFilter`], so every detector sees the same
//! set of files.

use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::{DirEntry, WalkDir};

use crate::config::ScanConfig;
use crate::paths;

/// Build and dependency directories never scanned.
pub const SKIP_DIRS: &[&str] = &[".build", "DerivedData", "Pods", "Carthage", "node_modules"];

/// Which files under a source root belong to the scan.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    extensions: Vec<String>,
    excludes: GlobSet,
}

impl SourceFilter {
    pub fn new(scan: &ScanConfig) -> anyhow::Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &scan.exclude {
            builder.add(
                Glob::new(pattern).with_context(|| format!("invalid exclude pattern {:?}", pattern))?,
            );
        }
        Ok(Self {
            extensions: scan.extensions.clone(),
            excludes: builder.build()?,
        })
    }

    /// Hidden and build/dependency directories below the root.
    fn is_skipped_dir(entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || SKIP_DIRS.contains(&name.as_ref())
    }

    /// Whether `rel`, a root-relative path, is a scanned source file.
    pub fn accepts(&self, rel: &str) -> bool {
        let ext = Path::new(rel).extension().and_then(|e| e.to_str()).unwrap_or("");
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) && !self.excludes.is_match(rel)
    }

    /// Files under `root`, sorted by path. Symlinks are not followed.
    pub fn walk(&self, root: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !Self::is_skipped_dir(e))
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if self.accepts(&paths::relativize(path, root)) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }
}

/// Enumerate the source files under `root` selected by `scan`.
pub fn collect_files(root: &Path, scan: &ScanConfig) -> anyhow::Result<Vec<PathBuf>> {
    SourceFilter::new(scan)?.walk(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "// swift\n").unwrap();
    }

    #[test]
    fn test_collect_files_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "Sources/B.swift");
        touch(temp.path(), "Sources/A.swift");
        touch(temp.path(), "Sources/Generated/Api.swift");
        touch(temp.path(), "Sources/readme.md");
        touch(temp.path(), ".build/checkouts/Dep.swift");
        touch(temp.path(), "Pods/Lib/Lib.swift");
        touch(temp.path(), ".git/hooks/x.swift");

        let scan = ScanConfig {
            exclude: vec!["Sources/Generated/**".to_string()],
            ..Default::default()
        };
        let files = collect_files(temp.path(), &scan).unwrap();
        let rel: Vec<String> = files
            .iter()
            .map(|f| paths::relativize(f, temp.path()))
            .collect();
        assert_eq!(rel, vec!["Sources/A.swift", "Sources/B.swift"]);
    }

    #[test]
    fn test_accepts() {
        let filter = SourceFilter::new(&ScanConfig {
            exclude: vec!["Vendor/**".to_string()],
            ..Default::default()
        })
        .unwrap();
        assert!(filter.accepts("Sources/App.swift"));
        assert!(filter.accepts("Sources/App.SWIFT"));
        assert!(!filter.accepts("Sources/App.m"));
        assert!(!filter.accepts("Vendor/Lib.swift"));
    }

    #[test]
    fn test_invalid_exclude_is_error() {
        let scan = ScanConfig {
            exclude: vec!["[".to_string()],
            ..Default::default()
        };
        assert!(SourceFilter::new(&scan).is_err());
    }
}
