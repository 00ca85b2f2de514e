//! Compilation sessions.
//!
//! A [`Session`] is one live handle to the compiler backend plus a registry
//! of the packages it has compiled. It lives for one command invocation, or
//! for one pass of the watch loop: a rebuild always starts from a new
//! session so no stale archive survives.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::compile::{Archive, BuildOptions, CompileRequest, Compiler, link};
use crate::error::{Error, Result};
use crate::package::{PackageMetadata, PackageRecord, Resolver, local_import_path};
use crate::paths::{ARTIFACT_EXT, Environment};
use crate::watch::WatchSet;

/// Stateful build session.
pub struct Session {
    options: BuildOptions,
    env: Environment,
    resolver: Resolver,
    compiler: Arc<dyn Compiler>,
    /// Registry: import path → package record.
    packages: FxHashMap<String, PackageRecord>,
    /// Import stack, for cycle detection.
    importing: Vec<String>,
    watched: WatchSet,
}

impl Session {
    pub fn new(options: BuildOptions, env: &Environment, compiler: Arc<dyn Compiler>) -> Self {
        Self {
            options,
            env: env.clone(),
            resolver: Resolver::new(env),
            compiler,
            packages: FxHashMap::default(),
            importing: Vec::new(),
            watched: WatchSet::new(),
        }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Look up a package registered in this session.
    pub fn package(&self, import_path: &str) -> Option<&PackageRecord> {
        self.packages.get(import_path)
    }

    /// Paths registered for watching so far.
    pub fn watched(&self) -> &WatchSet {
        &self.watched
    }

    pub fn into_watched(self) -> WatchSet {
        self.watched
    }

    /// Register a path with the watch set; ignored unless watching.
    ///
    /// Paths are registered before they are read, so a build that fails
    /// still leaves something to wait on.
    pub fn watch(&mut self, path: impl Into<PathBuf>) {
        if self.options.watch {
            self.watched.add(path);
        }
    }

    /// Compile the package in `src_dir` with its imports and write it to
    /// `output` (default `<work_dir>/<base of src_dir>.js`).
    pub fn build_dir(&mut self, src_dir: &Path, work_dir: &Path, output: Option<&Path>) -> Result<()> {
        self.watch(src_dir);

        let import_path = match self.env.import_path_of(src_dir) {
            Ok(Some(path)) => path,
            _ => local_import_path(src_dir),
        };
        let metadata = self.resolver.import_dir(src_dir, &import_path)?;
        self.build_package(metadata)?;

        let output = match output {
            Some(path) => path.to_path_buf(),
            None => {
                let base = src_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "main".to_string());
                work_dir.join(format!("{base}.{ARTIFACT_EXT}"))
            }
        };
        self.write_registered(&import_path, &output)
    }

    /// Compile an explicit file list as the `main` package and write it to `output`.
    ///
    /// Fails before compiling anything if a path lacks the source suffix.
    pub fn build_files(&mut self, paths: &[PathBuf], output: &Path, work_dir: &Path) -> Result<()> {
        for path in paths {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                work_dir.join(path)
            };
            self.watch(path);
        }
        let metadata = self.resolver.files(paths, work_dir)?;

        let import_path = metadata.import_path.clone();
        self.build_package(metadata)?;
        self.write_registered(&import_path, output)
    }

    /// Resolve and compile a package by import path, reusing this session's
    /// archive if it was already compiled.
    pub fn import_package(&mut self, import_path: &str) -> Result<Arc<Archive>> {
        if let Some(archive) = self
            .packages
            .get(import_path)
            .and_then(|record| record.archive.clone())
        {
            return Ok(archive);
        }
        self.check_cycle(import_path)?;

        for dir in self.resolver.candidates(import_path) {
            self.watch(dir);
        }
        let metadata = self.resolver.import(import_path)?;
        self.build_package(metadata)
    }

    /// Compile a package whose file list the caller has already assembled.
    ///
    /// Imports are compiled first. The result replaces any record already
    /// registered under the same import path.
    pub fn build_package(&mut self, metadata: PackageMetadata) -> Result<Arc<Archive>> {
        self.check_cycle(&metadata.import_path)?;
        self.watch(metadata.dir.clone());

        self.importing.push(metadata.import_path.clone());
        let imported = self.import_all(&metadata.imports());
        self.importing.pop();
        let imported = imported?;

        let mut closure = Archive::synthetic(&metadata.import_path, &metadata.name, self.options.minify);
        for dep in &imported {
            closure.add_dependencies_of(dep);
        }

        let dependencies: Vec<&Archive> = closure
            .dependencies
            .iter()
            .filter_map(|path| self.packages.get(path)?.archive.as_deref())
            .collect();

        tracing::debug!(
            "compiling {} ({} files, {} dependencies)",
            metadata.import_path,
            metadata.files.len(),
            dependencies.len()
        );
        let mut archive = self.compiler.compile(CompileRequest {
            package: &metadata,
            dependencies,
            minify: self.options.minify,
        })?;

        archive.import_path = metadata.import_path.clone();
        archive.name = metadata.name.clone();
        archive.imports = metadata.imports();
        archive.dependencies = closure.dependencies;
        archive.minified = self.options.minify;

        if self.options.verbose {
            println!("{}", metadata.import_path);
        }

        let archive = Arc::new(archive);
        self.packages.insert(
            metadata.import_path.clone(),
            PackageRecord {
                metadata,
                archive: Some(Arc::clone(&archive)),
            },
        );
        Ok(archive)
    }

    /// Link a compiled `main` package and everything it depends on into `output`.
    ///
    /// Does nothing for library packages. Dead declarations are dropped.
    pub fn write_command_package(&self, record: &PackageRecord, output: &Path) -> Result<()> {
        if !record.metadata.is_command() {
            tracing::debug!("{} is not a command, nothing to write", record.import_path());
            return Ok(());
        }
        let archive = record.archive.as_deref().ok_or_else(|| {
            Error::Resolution(format!("package {} has not been compiled", record.import_path()))
        })?;

        let mut archives: Vec<&Archive> = Vec::with_capacity(archive.dependencies.len() + 1);
        for dep in &archive.dependencies {
            if dep == &archive.import_path {
                continue;
            }
            let dep_archive = self
                .packages
                .get(dep)
                .and_then(|r| r.archive.as_deref())
                .ok_or_else(|| {
                    Error::Resolution(format!(
                        "missing archive for {} (needed by {})",
                        dep,
                        record.import_path()
                    ))
                })?;
            archives.push(dep_archive);
        }
        archives.push(archive);

        let prelude = self.compiler.prelude()?;
        let linked = link(&prelude, &archives, &archive.import_path);

        create_parent(output)?;
        fs::write(output, &linked.code).map_err(|e| Error::write(output, e))?;

        if self.options.create_map_file {
            let map_path = map_path(output);
            let map = serde_json::to_vec_pretty(&linked.map)?;
            fs::write(&map_path, map).map_err(|e| Error::write(&map_path, e))?;
        }

        tracing::debug!(
            "wrote {} ({} packages, {} bytes)",
            output.display(),
            archives.len(),
            linked.code.len()
        );
        Ok(())
    }

    /// Store a compiled library's archive at `output`.
    pub fn write_archive(&self, record: &PackageRecord, output: &Path) -> Result<()> {
        let archive = record.archive.as_deref().ok_or_else(|| {
            Error::Resolution(format!("package {} has not been compiled", record.import_path()))
        })?;
        create_parent(output)?;
        let json = serde_json::to_vec(archive)?;
        fs::write(output, json).map_err(|e| Error::write(output, e))
    }

    fn write_registered(&self, import_path: &str, output: &Path) -> Result<()> {
        let record = self.packages.get(import_path).ok_or_else(|| {
            Error::Resolution(format!("package {import_path} is not part of this session"))
        })?;
        self.write_command_package(record, output)
    }

    fn import_all(&mut self, imports: &[String]) -> Result<Vec<Arc<Archive>>> {
        imports.iter().map(|path| self.import_package(path)).collect()
    }

    fn check_cycle(&self, import_path: &str) -> Result<()> {
        let Some(start) = self.importing.iter().position(|p| p == import_path) else {
            return Ok(());
        };
        let mut cycle: Vec<&str> = self.importing[start..].iter().map(String::as_str).collect();
        cycle.push(import_path);
        Err(Error::Resolution(format!(
            "import cycle not allowed: {}",
            cycle.join(" -> ")
        )))
    }
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent).map_err(|e| Error::write(parent, e))
        }
        _ => Ok(()),
    }
}

fn map_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".map");
    PathBuf::from(name)
}
