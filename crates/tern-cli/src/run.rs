//! `tern run`: compile source files to a temporary artifact and execute it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tern_core::compile::{Compiler, ProcessCompiler};
use tern_core::{BuildOptions, Environment, Error, RuntimeInvoker, Session, TempArtifact};

use crate::dispatch::RunArgs;
use crate::watch;

/// Execute the run command.
pub async fn execute(args: RunArgs, env: &Environment) -> i32 {
    let owned = env.clone();
    watch::run_interruptible(env, move || run(&args, &owned)).await
}

fn run(args: &RunArgs, env: &Environment) -> tern_core::Result<()> {
    let (files, program_args) = args.split();
    let Some(first) = files.first() else {
        return Err(Error::Usage("tern run: no source files listed".to_string()));
    };

    let base = Path::new(first)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let artifact = TempArtifact::new(&format!("{base}."))?;

    let compiler: Arc<dyn Compiler> = Arc::new(ProcessCompiler::new(env));
    let mut session = Session::new(BuildOptions::default(), env, compiler);
    let files: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();
    session.build_files(&files, artifact.path(), &env.current_dir)?;

    RuntimeInvoker::new(env).run(artifact.path(), program_args, None)
}
