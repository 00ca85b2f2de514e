//! Source file header scanning.
//!
//! Only the package clause and the import declarations at the top of a file
//! are read; everything after the first other declaration is left to the
//! compiler backend.
//!
//! # Format
//!
//! ```text
//! // comments and blank lines are skipped
//! package strings_test
//!
//! import "testing"
//! import (
//!     "fmt"
//!     s "example.com/strings"
//! )
//! ```

/// Package clause and imports of one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub package: String,
    pub imports: Vec<String>,
}

/// Why a header could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderError {
    /// 1-indexed line, when the problem is on a specific line.
    pub line: Option<usize>,
    pub message: String,
}

impl HeaderError {
    fn at(line: usize, message: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            message: message.into(),
        }
    }

    fn eof(message: impl Into<String>) -> Self {
        Self {
            line: None,
            message: message.into(),
        }
    }
}

/// Scan the header of a source file.
pub fn parse_header(source: &str) -> Result<Header, HeaderError> {
    let mut lines = source
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with("//"));

    let package = match lines.next() {
        Some((n, line)) if line.starts_with("package ") => {
            let name = line["package ".len()..].trim();
            if !is_identifier(name) {
                return Err(HeaderError::at(n, format!("invalid package name {name:?}")));
            }
            name.to_string()
        }
        Some((n, _)) => return Err(HeaderError::at(n, "expected 'package' clause")),
        None => return Err(HeaderError::eof("expected 'package' clause, found EOF")),
    };

    let mut imports = Vec::new();
    let mut in_block = false;

    for (n, line) in lines {
        if in_block {
            if line == ")" {
                in_block = false;
                continue;
            }
            imports.push(
                import_spec(line)
                    .ok_or_else(|| HeaderError::at(n, format!("malformed import {line:?}")))?,
            );
            continue;
        }

        let Some(rest) = line
            .strip_prefix("import")
            .filter(|rest| rest.starts_with([' ', '\t', '(', '"']))
        else {
            break;
        };
        let rest = rest.trim();
        if rest == "(" {
            in_block = true;
        } else {
            imports.push(
                import_spec(rest)
                    .ok_or_else(|| HeaderError::at(n, format!("malformed import {line:?}")))?,
            );
        }
    }

    if in_block {
        return Err(HeaderError::eof("unterminated import block"));
    }

    Ok(Header { package, imports })
}

/// `"path"` or `alias "path"`.
fn import_spec(spec: &str) -> Option<String> {
    let quoted = match spec.split_once(char::is_whitespace) {
        Some((alias, rest)) if !alias.starts_with('"') => rest.trim(),
        _ => spec,
    };
    let path = quoted.strip_prefix('"')?.strip_suffix('"')?;
    (!path.is_empty() && !path.contains('"')).then(|| path.to_string())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
}
