//! Positioned compiler diagnostics.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A location in source code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Source file path, as reported by the backend
    pub file: PathBuf,

    /// Line number (1-indexed)
    pub line: usize,

    /// Column number (1-indexed)
    pub column: usize,
}

/// A single parse or type-check failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Where the problem is, when the backend knows.
    pub position: Option<Position>,

    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            position: Some(Position {
                file: file.into(),
                line,
                column,
            }),
            message: message.into(),
        }
    }

    /// A diagnostic without position information.
    pub fn bare(message: impl Into<String>) -> Self {
        Self {
            position: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.position {
            Some(pos) => write!(
                f,
                "{}:{}:{}: {}",
                pos.file.display(),
                pos.line,
                pos.column,
                self.message
            ),
            None => f.write_str(&self.message),
        }
    }
}

/// Backend JSON diagnostic format.
#[derive(Debug, Serialize, Deserialize)]
pub struct BackendDiagnostic {
    pub message: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<usize>,
    #[serde(default)]
    pub column: Option<usize>,
}

impl From<BackendDiagnostic> for Diagnostic {
    fn from(raw: BackendDiagnostic) -> Self {
        match (raw.file, raw.line) {
            (Some(file), Some(line)) if !file.is_empty() => {
                Diagnostic::new(file, line, raw.column.unwrap_or(0), raw.message)
            }
            _ => Diagnostic::bare(raw.message),
        }
    }
}
