// tests/common/mod.rs

//! Shared fixture harness for directory-level tests.
//!
//! Builds a temp directory from a declarative file list, runs an operation
//! over it, then checks which files survived and with what content. Files
//! are created empty unless `content_before` says otherwise, and expected
//! to be empty after unless `content_after` does.

use std::fs;
use std::path::Path;
use walkdir::WalkDir;

pub struct FixtureFile {
    pub rel_path: &'static str,
    pub should_stay: bool,
    pub content_before: Option<&'static str>,
    pub content_after: Option<&'static str>,
}

impl FixtureFile {
    pub fn stays(rel_path: &'static str) -> Self {
        Self {
            rel_path,
            should_stay: true,
            content_before: None,
            content_after: None,
        }
    }

    pub fn goes(rel_path: &'static str) -> Self {
        Self {
            rel_path,
            should_stay: false,
            content_before: None,
            content_after: None,
        }
    }

    pub fn with_before(mut self, content: &'static str) -> Self {
        self.content_before = Some(content);
        self
    }

    pub fn with_after(mut self, content: &'static str) -> Self {
        self.content_after = Some(content);
        self
    }
}

/// Create the fixture files, run `op`, assert the expected layout
pub fn run_file_fixture<F>(files: &[FixtureFile], op: F)
where
    F: FnOnce(&Path) -> renew::Result<()>,
{
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    for file in files {
        let path = root.join(file.rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, file.content_before.unwrap_or("")).unwrap();
    }

    op(root).expect("fixture operation failed");

    for file in files {
        let path = root.join(file.rel_path);
        if !path.exists() {
            assert!(
                !file.should_stay,
                "file should not have been deleted: {}",
                file.rel_path
            );
            continue;
        }
        assert!(
            file.should_stay,
            "file should have been deleted: {}",
            file.rel_path
        );
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            file.content_after.unwrap_or(""),
            "unexpected content in {}",
            file.rel_path
        );
    }

    // nothing unexpected may appear
    for entry in WalkDir::new(root) {
        let entry = entry.unwrap();
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap();
        let known = files
            .iter()
            .any(|f| Path::new(f.rel_path) == rel);
        assert!(known, "unexpected file appeared: {}", rel.display());
    }
}
