//! Turns the outcome of a command into an exit status and stderr text.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::compile::Diagnostic;
use crate::error::{Error, ErrorKind, Result};
use crate::paths::Environment;

const RED: &str = "\x1b[31m";
const RESET_FG: &str = "\x1b[39m";

/// Diagnostic normalizer.
#[derive(Debug, Clone)]
pub struct Reporter {
    current_dir: PathBuf,
}

impl Reporter {
    pub fn new(env: &Environment) -> Self {
        Self::in_dir(env.current_dir.clone())
    }

    /// Reporter for when no [`Environment`] could be detected.
    pub fn in_dir(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            current_dir: current_dir.into(),
        }
    }

    /// Report `result` on stderr and return the exit status.
    pub fn report(&self, result: Result<()>) -> i32 {
        let stderr = io::stderr();
        let mut out = stderr.lock();
        self.report_to(&mut out, result)
    }

    /// Like [`report`](Self::report), writing to `out`.
    pub fn report_to(&self, out: &mut impl Write, result: Result<()>) -> i32 {
        let Err(err) = result else {
            return 0;
        };

        let written = match err.kind() {
            ErrorKind::ProcessExit => {
                if let Error::ProcessExit { status, .. } = err {
                    return status;
                }
                Ok(())
            }
            ErrorKind::Compile => match &err {
                Error::Compile(diagnostics) => diagnostics
                    .iter()
                    .try_for_each(|d| red_line(out, &self.format_diagnostic(d))),
                other => red_line(out, &other.to_string()),
            },
            ErrorKind::Resolution | ErrorKind::Io | ErrorKind::Launch | ErrorKind::Other => {
                red_line(out, &err.to_string())
            }
        };
        if let Err(e) = written {
            tracing::warn!("could not write diagnostics: {}", e);
        }
        1
    }

    fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        let Some(pos) = &diagnostic.position else {
            return diagnostic.message.clone();
        };
        format!(
            "{}:{}:{}: {}",
            self.display_path(&pos.file),
            pos.line,
            pos.column,
            diagnostic.message
        )
    }

    /// `file` relative to the working directory, marked with `./` unless it
    /// already starts with a dot. Unchanged when no relative path exists.
    fn display_path(&self, file: &Path) -> String {
        match crate::paths::relative_path(&self.current_dir, file) {
            Some(rel) => {
                let rel = rel.to_string_lossy().into_owned();
                if rel.starts_with('.') {
                    rel
                } else {
                    format!("./{rel}")
                }
            }
            None => file.display().to_string(),
        }
    }
}

fn red_line(out: &mut impl Write, text: &str) -> io::Result<()> {
    writeln!(out, "{RED}{text}{RESET_FG}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reporter() -> Reporter {
        Reporter::new(&Environment::new("/ws/src/p", "/ws"))
    }

    fn report(result: Result<()>) -> (i32, String) {
        let mut out = Vec::new();
        let code = reporter().report_to(&mut out, result);
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_ok_is_silent() {
        assert_eq!(report(Ok(())), (0, String::new()));
    }

    #[test]
    fn test_process_exit_status_is_literal() {
        for status in [2, 7, 130, 255] {
            let (code, text) = report(Err(Error::ProcessExit {
                program: "node".into(),
                status,
            }));
            assert_eq!(code, status);
            assert!(text.is_empty());
        }
    }

    #[test]
    fn test_compile_paths_are_relativized() {
        let (code, text) = report(Err(Error::Compile(vec![
            Diagnostic::new("/ws/src/p/a.src", 3, 7, "undefined: x"),
            Diagnostic::new("/ws/src/q/b.src", 1, 1, "bad"),
            Diagnostic::new("rel.src", 2, 2, "odd"),
            Diagnostic::bare("too many errors"),
        ])));

        assert_eq!(code, 1);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "\x1b[31m./a.src:3:7: undefined: x\x1b[39m");
        assert_eq!(lines[1], "\x1b[31m../q/b.src:1:1: bad\x1b[39m");
        assert_eq!(lines[2], "\x1b[31mrel.src:2:2: odd\x1b[39m");
        assert_eq!(lines[3], "\x1b[31mtoo many errors\x1b[39m");
    }

    #[test]
    fn test_environment_failure_is_red() {
        let err = Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            "cannot determine the working directory: gone",
        ));
        let mut out = Vec::new();
        let code = Reporter::in_dir("").report_to(&mut out, Err(err));

        assert_eq!(code, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\x1b[31mIO error: cannot determine the working directory: gone\x1b[39m\n"
        );
    }

    #[test]
    fn test_other_errors_print_once() {
        let (code, text) = report(Err(Error::Resolution("cannot find package \"nope\"".into())));
        assert_eq!(code, 1);
        assert_eq!(text, "\x1b[31mcannot find package \"nope\"\x1b[39m\n");

        let (code, text) = report(Err(Error::Launch {
            program: "node".into(),
            message: "not found".into(),
        }));
        assert_eq!(code, 1);
        assert_eq!(text.lines().count(), 1);
    }
}
