//! Resource file discovery.
//!
//! Walks a directory tree once at startup and classifies files by the
//! `<kind>.<name>.<ext>` naming convention. File contents are never read;
//! a discovered file only selects a compiled-in implementation.

use super::{ResourceDescriptor, ResourceKind};
use crate::error::Result;
use std::path::Path;
use walkdir::WalkDir;

pub struct ResourceScanner;

impl ResourceScanner {
    /// Recursively enumerates `root` and returns a descriptor for every
    /// file whose name splits into exactly three segments with a known
    /// kind. Everything else is silently skipped. Traversal order is
    /// unspecified; a missing or unreadable root is an error.
    pub fn scan(root: &Path) -> Result<Vec<ResourceDescriptor>> {
        let mut descriptors = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str() else {
                continue;
            };
            if let Some(descriptor) = Self::classify(file_name, entry.path()) {
                descriptors.push(descriptor);
            }
        }
        Ok(descriptors)
    }

    fn classify(file_name: &str, path: &Path) -> Option<ResourceDescriptor> {
        let segments: Vec<&str> = file_name.split('.').collect();
        let [kind, name, _ext] = segments.as_slice() else {
            return None;
        };
        Some(ResourceDescriptor {
            kind: ResourceKind::from_segment(kind)?,
            name: (*name).to_string(),
            source: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::File::create(path).unwrap();
    }

    #[test]
    fn test_scan_classifies_known_kinds() {
        let temp = tempfile::tempdir().unwrap();
        touch(&temp.path().join("command.sum.txt"));
        touch(&temp.path().join("hook-source.on_start.txt"));
        touch(&temp.path().join("plugin.hit_counter.txt"));

        let mut descriptors = ResourceScanner::scan(temp.path()).unwrap();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));

        let found: Vec<_> = descriptors
            .iter()
            .map(|d| (d.kind, d.name.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (ResourceKind::Plugin, "hit_counter"),
                (ResourceKind::Hook, "on_start"),
                (ResourceKind::Command, "sum"),
            ]
        );
    }

    #[test]
    fn test_scan_recurses_into_subdirectories() {
        let temp = tempfile::tempdir().unwrap();
        touch(&temp.path().join("nested/deeper/command.square.res"));

        let descriptors = ResourceScanner::scan(temp.path()).unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "square");
        assert_eq!(
            descriptors[0].source,
            temp.path().join("nested/deeper/command.square.res")
        );
    }

    #[test]
    fn test_scan_skips_non_matching_files() {
        let temp = tempfile::tempdir().unwrap();
        // wrong segment count
        touch(&temp.path().join("README.md"));
        touch(&temp.path().join("command.txt"));
        touch(&temp.path().join("command.too.many.dots"));
        // unknown kind segment
        touch(&temp.path().join("widget.sum.txt"));
        touch(&temp.path().join("Command.sum.txt"));

        let descriptors = ResourceScanner::scan(temp.path()).unwrap();
        assert!(descriptors.is_empty());
    }

    #[test]
    fn test_scan_accepts_any_extension() {
        let temp = tempfile::tempdir().unwrap();
        touch(&temp.path().join("command.alpha.js"));
        touch(&temp.path().join("command.beta.rs"));
        touch(&temp.path().join("command.gamma.resource"));

        let descriptors = ResourceScanner::scan(temp.path()).unwrap();
        assert_eq!(descriptors.len(), 3);
    }

    #[test]
    fn test_scan_missing_root_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("does-not-exist");
        assert!(ResourceScanner::scan(&missing).is_err());
    }
}
