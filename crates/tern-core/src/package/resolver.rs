//! Import path → package metadata, using the source-root convention.

use std::fs;
use std::path::{Path, PathBuf};

use crate::compile::Diagnostic;
use crate::error::{Error, Result};
use crate::paths::{ARTIFACT_EXT, Environment};

use super::header::parse_header;
use super::metadata::{MAIN_PACKAGE, PackageMetadata, SOURCE_SUFFIX, SourceFile, TEST_SUFFIX};

/// Finds packages under the toolchain's `lib/` and the source root's `src/`.
#[derive(Debug, Clone)]
pub struct Resolver {
    env: Environment,
}

impl Resolver {
    pub fn new(env: &Environment) -> Self {
        Self { env: env.clone() }
    }

    /// Resolve a package by import path.
    ///
    /// Paths starting with `.` or `/` name a directory relative to the
    /// working directory instead.
    pub fn import(&self, import_path: &str) -> Result<PackageMetadata> {
        if is_local(import_path) {
            let dir = self.env.absolute(import_path);
            if !dir.is_dir() {
                return Err(Error::Resolution(format!(
                    "cannot find package {:?} in {}",
                    import_path,
                    dir.display()
                )));
            }
            let dir = fs::canonicalize(&dir)?;
            let import_path = match self.env.import_path_of(&dir) {
                Ok(Some(path)) => path,
                _ => local_import_path(&dir),
            };
            return self.import_dir(&dir, &import_path);
        }

        validate_import_path(import_path)?;

        let candidates = [
            (self.env.lib_dir().join(import_path), "toolchain"),
            (self.env.src_dir().join(import_path), "source root"),
        ];
        for (dir, _) in &candidates {
            if dir.is_dir() {
                return self.import_dir(dir, import_path);
            }
        }

        let searched = candidates
            .iter()
            .map(|(dir, origin)| format!("\t{} (from {})", dir.display(), origin))
            .collect::<Vec<_>>()
            .join("\n");
        Err(Error::Resolution(format!(
            "cannot find package {import_path:?} in any of:\n{searched}"
        )))
    }

    /// Directories [`import`](Self::import) looks in for `import_path`, in
    /// search order. None of them has to exist.
    pub fn candidates(&self, import_path: &str) -> Vec<PathBuf> {
        if is_local(import_path) {
            let dir = self.env.absolute(import_path);
            return vec![fs::canonicalize(&dir).unwrap_or(dir)];
        }
        if validate_import_path(import_path).is_err() {
            return Vec::new();
        }
        vec![
            self.env.lib_dir().join(import_path),
            self.env.src_dir().join(import_path),
        ]
    }

    /// Read the package in `dir` and give it `import_path`.
    pub fn import_dir(&self, dir: &Path, import_path: &str) -> Result<PackageMetadata> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| Error::Resolution(format!("cannot read {}: {}", dir.display(), e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_source_suffix(path))
            .collect();
        paths.sort();

        let mut pkg = PackageMetadata {
            import_path: import_path.to_string(),
            dir: dir.to_path_buf(),
            ..PackageMetadata::default()
        };

        for path in paths {
            let file = read_source_file(&path)?;
            let is_test = file_name(&path).ends_with(TEST_SUFFIX);
            if is_test && file.package.ends_with("_test") {
                pkg.xtest_files.push(file);
            } else if is_test {
                pkg.test_files.push(file);
            } else {
                pkg.files.push(file);
            }
        }

        pkg.name = package_name(&pkg)?;
        pkg.artifact_path = self.artifact_path(&pkg);

        tracing::debug!(
            "resolved {} in {} ({} files, {} test, {} external test)",
            pkg.import_path,
            pkg.dir.display(),
            pkg.files.len(),
            pkg.test_files.len(),
            pkg.xtest_files.len()
        );
        Ok(pkg)
    }

    /// Treat an explicit list of source files as the `main` package.
    ///
    /// Every path must carry the source suffix; this is checked before any
    /// file is read.
    pub fn files(&self, paths: &[PathBuf], work_dir: &Path) -> Result<PackageMetadata> {
        if paths.is_empty() || !paths.iter().all(|p| has_source_suffix(p)) {
            return Err(Error::Usage(format!(
                "named files must be {SOURCE_SUFFIX} files"
            )));
        }

        let mut pkg = PackageMetadata {
            import_path: MAIN_PACKAGE.to_string(),
            dir: work_dir.to_path_buf(),
            ..PackageMetadata::default()
        };
        for path in paths {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                work_dir.join(path)
            };
            pkg.files.push(read_source_file(&path)?);
        }
        pkg.name = package_name(&pkg)?;
        Ok(pkg)
    }

    /// Where `install` puts the package: commands under `bin/`, libraries
    /// under `pkg/`. Toolchain and local packages have no install location.
    fn artifact_path(&self, pkg: &PackageMetadata) -> Option<PathBuf> {
        if pkg.import_path.starts_with('_') || !pkg.dir.starts_with(self.env.src_dir()) {
            return None;
        }
        if pkg.is_command() {
            let base = pkg.import_path.rsplit('/').next().unwrap_or(&pkg.import_path);
            Some(self.env.bin_dir().join(format!("{base}.{ARTIFACT_EXT}")))
        } else {
            Some(self.env.pkg_dir().join(format!("{}.a", pkg.import_path)))
        }
    }
}

/// Import path given to a package outside the source root.
pub fn local_import_path(dir: &Path) -> String {
    format!("_{}", dir.display())
}

pub fn has_source_suffix(path: &Path) -> bool {
    file_name(path).ends_with(SOURCE_SUFFIX)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_local(import_path: &str) -> bool {
    import_path == "."
        || import_path == ".."
        || import_path.starts_with("./")
        || import_path.starts_with("../")
        || Path::new(import_path).is_absolute()
}

fn validate_import_path(import_path: &str) -> Result<()> {
    let valid = !import_path.is_empty()
        && import_path
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..");
    if valid {
        Ok(())
    } else {
        Err(Error::Resolution(format!("invalid import path {import_path:?}")))
    }
}

fn read_source_file(path: &Path) -> Result<SourceFile> {
    let source = fs::read_to_string(path)
        .map_err(|e| Error::Resolution(format!("cannot read {}: {}", path.display(), e)))?;
    let header = parse_header(&source).map_err(|e| {
        let diagnostic = match e.line {
            Some(line) => Diagnostic::new(path, line, 1, e.message),
            None => Diagnostic::bare(format!("{}: {}", path.display(), e.message)),
        };
        Error::Compile(vec![diagnostic])
    })?;
    Ok(SourceFile {
        path: path.to_path_buf(),
        package: header.package,
        imports: header.imports,
    })
}

/// Name shared by the package's files; mixing names is an error.
fn package_name(pkg: &PackageMetadata) -> Result<String> {
    let mut chosen: Option<&SourceFile> = None;
    for file in pkg.files.iter().chain(pkg.test_files.iter()) {
        match chosen {
            None => chosen = Some(file),
            Some(first) if first.package != file.package => {
                return Err(Error::Resolution(format!(
                    "found packages {} ({}) and {} ({}) in {}",
                    first.package,
                    file_name(&first.path),
                    file.package,
                    file_name(&file.path),
                    pkg.dir.display()
                )));
            }
            Some(_) => {}
        }
    }

    if let Some(file) = chosen {
        return Ok(file.package.clone());
    }
    if let Some(xtest) = pkg.xtest_files.first() {
        return Ok(xtest.package.trim_end_matches("_test").to_string());
    }
    Err(Error::Resolution(format!(
        "no buildable source files in {}",
        pkg.dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, source: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), source).unwrap();
    }

    fn workspace() -> (TempDir, Environment) {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = fs::canonicalize(temp.path()).unwrap();
        let env = Environment::new(&root, &root).with_toolchain_root(root.join("toolchain"));
        fs::create_dir_all(env.src_dir()).unwrap();
        (temp, env)
    }

    #[test]
    fn test_classifies_files_in_scan_order() {
        let (_temp, env) = workspace();
        let dir = env.src_dir().join("example.com/strs");
        write(&dir, "b.src", "package strs\n");
        write(&dir, "a.src", "package strs\nimport \"unicode\"\n");
        write(&dir, "a_test.src", "package strs\nimport \"testing\"\n");
        write(&dir, "z_test.src", "package strs_test\nimport \"example.com/strs\"\n");
        write(&dir, "notes.txt", "not source");

        let pkg = Resolver::new(&env).import("example.com/strs").unwrap();

        let names: Vec<String> = pkg.files.iter().map(|f| file_name(&f.path)).collect();
        assert_eq!(names, vec!["a.src", "b.src"]);
        assert_eq!(pkg.test_files.len(), 1);
        assert_eq!(pkg.xtest_files.len(), 1);
        assert_eq!(pkg.name, "strs");
        assert_eq!(pkg.imports(), vec!["unicode"]);
        assert_eq!(
            pkg.artifact_path,
            Some(env.pkg_dir().join("example.com/strs.a"))
        );
    }

    #[test]
    fn test_toolchain_lib_wins() {
        let (_temp, env) = workspace();
        write(&env.lib_dir().join("testing"), "testing.src", "package testing\n");
        write(&env.src_dir().join("testing"), "fake.src", "package fake\n");

        let pkg = Resolver::new(&env).import("testing").unwrap();
        assert_eq!(pkg.name, "testing");
        assert_eq!(pkg.artifact_path, None);
    }

    #[test]
    fn test_command_installs_to_bin() {
        let (_temp, env) = workspace();
        write(&env.src_dir().join("example.com/hello"), "main.src", "package main\n");

        let pkg = Resolver::new(&env).import("example.com/hello").unwrap();
        assert!(pkg.is_command());
        assert_eq!(pkg.artifact_path, Some(env.bin_dir().join("hello.js")));
    }

    #[test]
    fn test_unknown_package() {
        let (_temp, env) = workspace();
        let err = Resolver::new(&env).import("nope/missing").unwrap_err();
        assert!(matches!(err, Error::Resolution(ref msg) if msg.contains("cannot find package")));
    }

    #[test]
    fn test_mixed_packages_rejected() {
        let (_temp, env) = workspace();
        let dir = env.src_dir().join("mixed");
        write(&dir, "a.src", "package a\n");
        write(&dir, "b.src", "package b\n");

        let err = Resolver::new(&env).import("mixed").unwrap_err();
        assert!(matches!(err, Error::Resolution(ref msg) if msg.contains("found packages a (a.src) and b (b.src)")));
    }

    #[test]
    fn test_empty_dir_rejected() {
        let (_temp, env) = workspace();
        fs::create_dir_all(env.src_dir().join("empty")).unwrap();
        let err = Resolver::new(&env).import("empty").unwrap_err();
        assert!(matches!(err, Error::Resolution(ref msg) if msg.contains("no buildable source files")));
    }

    #[test]
    fn test_files_requires_suffix() {
        let (_temp, env) = workspace();
        write(&env.current_dir, "main.src", "package main\n");

        let err = Resolver::new(&env)
            .files(&[PathBuf::from("main.src"), PathBuf::from("README.md")], &env.current_dir)
            .unwrap_err();
        assert!(matches!(err, Error::Usage(ref msg) if msg == "named files must be .src files"));

        let pkg = Resolver::new(&env)
            .files(&[PathBuf::from("main.src")], &env.current_dir)
            .unwrap();
        assert_eq!(pkg.import_path, "main");
        assert!(pkg.is_command());
    }

    #[test]
    fn test_header_error_is_positioned() {
        let (_temp, env) = workspace();
        write(&env.current_dir, "bad.src", "\nfunc main() {}\n");

        let err = Resolver::new(&env)
            .files(&[PathBuf::from("bad.src")], &env.current_dir)
            .unwrap_err();
        match err {
            Error::Compile(diags) => {
                let pos = diags[0].position.as_ref().unwrap();
                assert_eq!(pos.line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_candidates_follow_search_order() {
        let (_temp, env) = workspace();
        let resolver = Resolver::new(&env);

        assert_eq!(
            resolver.candidates("example.com/notyet"),
            vec![
                env.lib_dir().join("example.com/notyet"),
                env.src_dir().join("example.com/notyet"),
            ]
        );
        assert_eq!(resolver.candidates("./scratch"), vec![env.current_dir.join("scratch")]);
        assert!(resolver.candidates("a/../b").is_empty());
    }

    #[test]
    fn test_local_import_outside_source_root() {
        let (_temp, env) = workspace();
        let outside = env.current_dir.join("scratch");
        write(&outside, "x.src", "package x\n");

        let pkg = Resolver::new(&env).import("./scratch").unwrap();
        assert_eq!(pkg.import_path, local_import_path(&outside));
        assert_eq!(pkg.artifact_path, None);
    }
}
