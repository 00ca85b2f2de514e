//! Package metadata and session records.

use std::path::PathBuf;
use std::sync::Arc;

use crate::compile::Archive;

/// Suffix of every source file.
pub const SOURCE_SUFFIX: &str = ".src";

/// Suffix of in-package and external test files.
pub const TEST_SUFFIX: &str = "_test.src";

/// Import path and package name of the synthetic command package.
pub const MAIN_PACKAGE: &str = "main";

/// One source file and its header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,

    /// Name from the package clause.
    pub package: String,

    /// Import paths, in source order.
    pub imports: Vec<String>,
}

/// Resolved package: where it lives and which files belong to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    pub import_path: String,

    /// Package name from the package clauses.
    pub name: String,

    pub dir: PathBuf,

    /// Files compiled into the package. Test files are appended here when testing.
    pub files: Vec<SourceFile>,

    /// `*_test.src` files in the same package.
    pub test_files: Vec<SourceFile>,

    /// `*_test.src` files declaring the external `<name>_test` package.
    pub xtest_files: Vec<SourceFile>,

    /// Canonical install location, when the package has one.
    pub artifact_path: Option<PathBuf>,
}

impl PackageMetadata {
    /// Whether this package builds a runnable program.
    pub fn is_command(&self) -> bool {
        self.name == MAIN_PACKAGE
    }

    /// Whether the package has any tests at all.
    pub fn has_tests(&self) -> bool {
        !self.test_files.is_empty() || !self.xtest_files.is_empty()
    }

    /// Imports of the files in [`files`](Self::files), first occurrence first.
    pub fn imports(&self) -> Vec<String> {
        let mut imports: Vec<String> = Vec::new();
        for import in self.files.iter().flat_map(|f| f.imports.iter()) {
            if !imports.contains(import) {
                imports.push(import.clone());
            }
        }
        imports
    }

    /// The package compiled with its in-package tests, ready for a test build.
    pub fn with_tests_included(&self) -> Self {
        let mut package = self.clone();
        package.files.extend(self.test_files.iter().cloned());
        package.artifact_path = None;
        package
    }

    /// The external test package (`<import path>_test`), if there is one.
    pub fn external_tests(&self) -> Option<Self> {
        if self.xtest_files.is_empty() {
            return None;
        }
        Some(Self {
            import_path: format!("{}_test", self.import_path),
            name: self.xtest_files[0].package.clone(),
            dir: self.dir.clone(),
            files: self.xtest_files.clone(),
            ..Self::default()
        })
    }
}

/// A package known to a session, compiled or not.
#[derive(Debug, Clone)]
pub struct PackageRecord {
    pub metadata: PackageMetadata,

    /// Set once the package has been compiled in this session.
    pub archive: Option<Arc<Archive>>,
}

impl PackageRecord {
    pub fn new(metadata: PackageMetadata) -> Self {
        Self {
            metadata,
            archive: None,
        }
    }

    pub fn import_path(&self) -> &str {
        &self.metadata.import_path
    }
}
