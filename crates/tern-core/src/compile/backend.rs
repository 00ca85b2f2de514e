//! Compiler backend facade.
//!
//! Source-to-target compilation is done by an external backend program. The
//! session only sees the [`Compiler`] trait: hand over a package with its
//! dependency archives, get back an [`Archive`] or a list of diagnostics.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::paths::Environment;

use super::archive::Archive;
use super::diagnostics::{BackendDiagnostic, Diagnostic};
use super::types::CompileRequest;

/// Compiles one package at a time into an [`Archive`].
pub trait Compiler {
    /// Compile the files of `request.package`.
    ///
    /// Parse and type errors are returned as [`Error::Compile`].
    fn compile(&self, request: CompileRequest<'_>) -> Result<Archive>;

    /// Runtime support code placed at the top of every linked artifact.
    fn prelude(&self) -> Result<String>;
}

/// Wire format of a `compile` request.
#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    import_path: &'a str,
    name: &'a str,
    dir: &'a std::path::Path,
    files: Vec<&'a std::path::Path>,
    minify: bool,
    dependencies: &'a [&'a Archive],
}

/// Wire format of a `compile` response.
#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    archive: Option<Archive>,
    #[serde(default)]
    diagnostics: Vec<BackendDiagnostic>,
}

/// [`Compiler`] backed by an external program speaking JSON over stdio.
///
/// `<backend> compile` reads a request on stdin and prints either
/// `{"archive": ..}` or `{"diagnostics": [..]}`; `<backend> prelude` prints
/// the runtime prelude.
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    /// Path to the backend executable
    program: PathBuf,
}

impl ProcessCompiler {
    /// Use the backend configured in `env`. It is looked up on first use.
    pub fn new(env: &Environment) -> Self {
        Self {
            program: env.backend.clone(),
        }
    }

    /// Use an explicit backend executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn invoke(&self, subcommand: &str, input: Option<Vec<u8>>) -> Result<std::process::Output> {
        let program = which::which(&self.program).map_err(|_| {
            Error::Backend(format!("{} not found in PATH", self.program.display()))
        })?;
        tracing::debug!("{} {}", program.display(), subcommand);

        let mut child = Command::new(&program)
            .arg(subcommand)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::Backend(format!("failed to start {}: {}", self.program.display(), e))
            })?;

        // Feed stdin from another thread so a chatty backend cannot deadlock on a full pipe.
        let writer = match (input, child.stdin.take()) {
            (Some(bytes), Some(mut stdin)) => {
                Some(thread::spawn(move || stdin.write_all(&bytes)))
            }
            _ => None,
        };

        let output = child.wait_with_output()?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!("backend closed stdin early: {}", e),
                Err(_) => return Err(Error::Backend("stdin writer panicked".to_string())),
            }
        }

        Ok(output)
    }
}

impl Compiler for ProcessCompiler {
    fn compile(&self, request: CompileRequest<'_>) -> Result<Archive> {
        let package = request.package;
        let wire = WireRequest {
            import_path: &package.import_path,
            name: &package.name,
            dir: &package.dir,
            files: package.files.iter().map(|f| f.path.as_path()).collect(),
            minify: request.minify,
            dependencies: &request.dependencies,
        };
        let output = self.invoke("compile", Some(serde_json::to_vec(&wire)?))?;

        match serde_json::from_slice::<WireResponse>(&output.stdout) {
            Ok(response) if !response.diagnostics.is_empty() => Err(Error::Compile(
                response.diagnostics.into_iter().map(Diagnostic::from).collect(),
            )),
            Ok(WireResponse {
                archive: Some(archive),
                ..
            }) if output.status.success() => Ok(archive),
            Ok(_) | Err(_) => Err(Error::Backend(format!(
                "compiling {} failed ({}): {}",
                package.import_path,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }

    fn prelude(&self) -> Result<String> {
        let output = self.invoke("prelude", None)?;
        if !output.status.success() {
            return Err(Error::Backend(format!(
                "failed to get prelude: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|_| Error::Backend("prelude is not valid UTF-8".to_string()))
    }
}
