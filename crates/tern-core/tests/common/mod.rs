//! Shared fixtures: a scratch source root and an in-process compiler.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tern_core::compile::{CompileRequest, Compiler};
use tern_core::{Archive, BuildOptions, Decl, DepId, Diagnostic, Environment, Error, Result, Session};

pub const PRELUDE: &str = "var $packages = {};";

/// Temporary source root with `src/` and a toolchain `lib/`.
pub struct Workspace {
    pub temp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let ws = Self {
            temp: TempDir::new().unwrap(),
        };
        ws.write("lib/testing/testing.src", "package testing\n\nfunc Main2() {}\n");
        ws.write("lib/flag/flag.src", "package flag\n\nfunc Parse() {}\n");
        ws
    }

    pub fn root(&self) -> PathBuf {
        fs::canonicalize(self.temp.path()).unwrap()
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.temp.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        fs::canonicalize(path).unwrap()
    }

    pub fn dir(&self, rel: &str) -> PathBuf {
        fs::canonicalize(self.temp.path().join(rel)).unwrap()
    }

    pub fn env(&self, cwd: &Path) -> Environment {
        Environment::new(cwd, self.root())
    }
}

/// Compiles by scanning for `func Name` lines. A line reading `error`
/// produces a diagnostic at that line.
#[derive(Default)]
pub struct FakeCompiler {
    pub compiled: Mutex<Vec<String>>,
}

impl FakeCompiler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn compiled(&self) -> Vec<String> {
        self.compiled.lock().unwrap().clone()
    }
}

impl Compiler for FakeCompiler {
    fn compile(&self, request: CompileRequest<'_>) -> Result<Archive> {
        let package = request.package;
        self.compiled.lock().unwrap().push(package.import_path.clone());

        let mut archive = Archive::synthetic(&package.import_path, &package.name, request.minify);
        for file in &package.files {
            let source = fs::read_to_string(&file.path)?;
            for (i, line) in source.lines().enumerate() {
                let line = line.trim();
                if line == "error" {
                    return Err(Error::Compile(vec![Diagnostic::new(
                        &file.path,
                        i + 1,
                        1,
                        "syntax error",
                    )]));
                }
                let Some(rest) = line.strip_prefix("func ") else {
                    continue;
                };
                let name = rest.split('(').next().unwrap_or(rest).trim();
                let calls: Vec<DepId> = rest
                    .split("calls ")
                    .skip(1)
                    .map(|callee| DepId::from(callee.trim()))
                    .collect();
                archive.declarations.push(Decl {
                    id: Some(DepId::new(&package.import_path, name)),
                    deps: calls,
                    body: format!("$pkg.{name} = function() {{}};"),
                });
                if name.starts_with("Test") {
                    archive.tests.push(name.to_string());
                }
            }
        }
        if package.is_command() {
            archive.declarations.push(Decl {
                id: None,
                deps: vec![DepId::new(&package.import_path, "main")],
                body: String::new(),
            });
        }
        Ok(archive)
    }

    fn prelude(&self) -> Result<String> {
        Ok(PRELUDE.to_string())
    }
}

pub fn session(ws: &Workspace, cwd: &Path, compiler: &Arc<FakeCompiler>) -> Session {
    session_with(ws, cwd, compiler, BuildOptions::default())
}

pub fn session_with(
    ws: &Workspace,
    cwd: &Path,
    compiler: &Arc<FakeCompiler>,
    options: BuildOptions,
) -> Session {
    let compiler: Arc<dyn Compiler> = compiler.clone();
    Session::new(options, &ws.env(cwd), compiler)
}
