//! External runtime invocation.
//!
//! Linked artifacts are executed by a separate runtime process whose
//! standard streams are the tool's own. Its exit status is carried back
//! unchanged so test-framework exit codes propagate.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use crate::error::{Error, Result};
use crate::paths::Environment;

/// Runs artifacts with the configured runtime program.
#[derive(Debug, Clone)]
pub struct RuntimeInvoker {
    program: PathBuf,
}

impl RuntimeInvoker {
    pub fn new(env: &Environment) -> Self {
        Self {
            program: env.runtime.clone(),
        }
    }

    /// Display name of the runtime, as used in error messages.
    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Execute `artifact` with `args`, blocking until the runtime exits.
    ///
    /// # Errors
    /// [`Error::Launch`] if the runtime cannot be found or started,
    /// [`Error::ProcessExit`] if it exits unsuccessfully.
    pub fn run(&self, artifact: &Path, args: &[String], dir: Option<&Path>) -> Result<()> {
        let name = self.program_name();
        let program = which::which(&self.program).map_err(|e| Error::Launch {
            program: name.clone(),
            message: e.to_string(),
        })?;

        let mut command = Command::new(&program);
        command
            .arg(artifact)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        tracing::debug!("running {} {} {:?}", program.display(), artifact.display(), args);
        let status = command.status().map_err(|e| Error::Launch {
            program: name.clone(),
            message: e.to_string(),
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::ProcessExit {
                program: name,
                status: exit_status(status),
            })
        }
    }
}

/// Numeric status of a finished process. Signals map to `128 + signal` on Unix.
fn exit_status(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
