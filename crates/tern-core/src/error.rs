//! Error types for tern-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::compile::Diagnostic;

/// Result type for tern-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, linking or running packages.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more source files failed to parse or type-check.
    #[error("{}", format_diagnostics(.0))]
    Compile(Vec<Diagnostic>),

    /// Unknown import path, missing directory or malformed package.
    #[error("{0}")]
    Resolution(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to write an artifact or archive.
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external runtime exited with a non-zero status.
    #[error("{program} exited with status {status}")]
    ProcessExit { program: String, status: i32 },

    /// The external runtime could not be located or started.
    #[error("could not run {program}: {message}")]
    Launch { program: String, message: String },

    /// Invalid command-line input detected before any work started.
    #[error("{0}")]
    Usage(String),

    /// The compiler backend misbehaved (crashed, bad protocol output).
    #[error("compiler backend error: {0}")]
    Backend(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File watching failed.
    #[error("file watch error: {0}")]
    Watch(String),
}

/// Coarse classification of an [`Error`], used to pick an exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Compile,
    Resolution,
    Io,
    ProcessExit,
    Launch,
    Other,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Compile(_) => ErrorKind::Compile,
            Error::Resolution(_) => ErrorKind::Resolution,
            Error::Io(_) | Error::Write { .. } => ErrorKind::Io,
            Error::ProcessExit { .. } => ErrorKind::ProcessExit,
            Error::Launch { .. } => ErrorKind::Launch,
            Error::Usage(_) | Error::Backend(_) | Error::Json(_) | Error::Watch(_) => {
                ErrorKind::Other
            }
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Write {
            path: path.into(),
            source,
        }
    }
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
